//! Tokenizer-backed dataset of SFT records.

use crate::prompts::PromptStyle;
use crate::tokenizer::TextEncoder;
use instructkit_core::{
    Error, FormattedRecord, Result, DEFAULT_IGNORE_INDEX, UNBOUNDED_SEQ_LENGTH,
};
use rand::seq::SliceRandom;
use rand::SeedableRng;
use std::fmt;
use std::sync::Arc;

/// A tokenized training sample.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sample {
    /// Prompt followed by response token ids.
    pub input_ids: Vec<u32>,
    /// Labels for the loss. Masked positions hold the ignore index.
    pub labels: Vec<i64>,
    /// Attention mask.
    pub attention_mask: Vec<u32>,
}

impl Sample {
    /// Create a sample with labels equal to the inputs.
    pub fn new(input_ids: Vec<u32>) -> Self {
        let labels = input_ids.iter().map(|&id| i64::from(id)).collect();
        Self::with_labels(input_ids, labels)
    }

    /// Create a sample with explicit labels.
    pub fn with_labels(input_ids: Vec<u32>, labels: Vec<i64>) -> Self {
        let len = input_ids.len();
        Self {
            input_ids,
            labels,
            attention_mask: vec![1; len],
        }
    }

    /// Number of tokens.
    pub fn len(&self) -> usize {
        self.input_ids.len()
    }

    /// Whether the sample has no tokens.
    pub fn is_empty(&self) -> bool {
        self.input_ids.is_empty()
    }
}

/// Single-turn SFT records plus everything needed to tokenize them.
///
/// Records are tokenized on access, so building a dataset is cheap and the
/// tokenizer may be attached after the records were formatted. Records are
/// shared between clones.
#[derive(Clone)]
pub struct SftDataset {
    records: Arc<[FormattedRecord]>,
    tokenizer: Option<Arc<dyn TextEncoder>>,
    prompt_style: PromptStyle,
    max_seq_length: i64,
    mask_prompt: bool,
    ignore_index: i64,
}

impl SftDataset {
    /// Create a dataset with no tokenizer, no truncation and no prompt masking.
    pub fn new(records: Vec<FormattedRecord>, prompt_style: PromptStyle) -> Self {
        Self {
            records: records.into(),
            tokenizer: None,
            prompt_style,
            max_seq_length: UNBOUNDED_SEQ_LENGTH,
            mask_prompt: false,
            ignore_index: DEFAULT_IGNORE_INDEX,
        }
    }

    /// Attach the tokenizer used by [`get`](Self::get).
    pub fn with_tokenizer(mut self, tokenizer: Option<Arc<dyn TextEncoder>>) -> Self {
        self.tokenizer = tokenizer;
        self
    }

    /// Truncate samples to this many tokens. Zero or negative disables truncation.
    pub fn with_max_seq_length(mut self, max_seq_length: i64) -> Self {
        self.max_seq_length = max_seq_length;
        self
    }

    /// Mask prompt labels with `ignore_index`.
    pub fn with_prompt_masking(mut self, mask_prompt: bool, ignore_index: i64) -> Self {
        self.mask_prompt = mask_prompt;
        self.ignore_index = ignore_index;
        self
    }

    /// Get the number of records.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Check if the dataset is empty.
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Get all records.
    pub fn records(&self) -> &[FormattedRecord] {
        &self.records
    }

    /// Get a record by index.
    pub fn record(&self, index: usize) -> Option<&FormattedRecord> {
        self.records.get(index)
    }

    /// Prompt style used to render records.
    pub fn prompt_style(&self) -> PromptStyle {
        self.prompt_style
    }

    /// Truncation length, or a non-positive value when unbounded.
    pub fn max_seq_length(&self) -> i64 {
        self.max_seq_length
    }

    /// Whether prompt labels are masked.
    pub fn mask_prompt(&self) -> bool {
        self.mask_prompt
    }

    /// Label value used for masked positions.
    pub fn ignore_index(&self) -> i64 {
        self.ignore_index
    }

    /// Whether a tokenizer is attached.
    pub fn has_tokenizer(&self) -> bool {
        self.tokenizer.is_some()
    }

    /// Tokenize the record at `index`.
    ///
    /// The prompt is rendered with the prompt style and encoded (after a BOS
    /// token when the tokenizer has one); the response is encoded and
    /// followed by EOS. The concatenation is truncated to `max_seq_length`
    /// when that is positive.
    pub fn get(&self, index: usize) -> Result<Sample> {
        let record = self.records.get(index).ok_or_else(|| {
            Error::Dataset(format!(
                "Index {} out of range for dataset of {} records",
                index,
                self.records.len()
            ))
        })?;
        let tokenizer = self.tokenizer.as_deref().ok_or_else(|| {
            Error::Tokenizer("no tokenizer connected to the data module".to_string())
        })?;

        let prompt = self.prompt_style.apply(&record.instruction, &record.input);

        let mut prompt_ids: Vec<u32> = tokenizer.bos_token_id().into_iter().collect();
        prompt_ids.extend(tokenizer.encode(&prompt)?);
        let prompt_len = prompt_ids.len();

        let mut input_ids = prompt_ids;
        input_ids.extend(tokenizer.encode(&record.output)?);
        input_ids.extend(tokenizer.eos_token_id());

        if self.max_seq_length > 0 {
            input_ids.truncate(self.max_seq_length as usize);
        }

        let mut labels: Vec<i64> = input_ids.iter().map(|&id| i64::from(id)).collect();
        if self.mask_prompt {
            for label in labels.iter_mut().take(prompt_len) {
                *label = self.ignore_index;
            }
        }

        Ok(Sample::with_labels(input_ids, labels))
    }

    /// Tokenize every record in order.
    pub fn iter_samples(&self) -> impl Iterator<Item = Result<Sample>> + '_ {
        (0..self.records.len()).map(move |i| self.get(i))
    }
}

/// Shuffle `records` and split off a held-out set of `ratio` of them.
///
/// Returns `(train, held_out)`. The same seed always yields the same split.
/// The held-out set is capped so at least one training record remains; a
/// split that would leave no training records fails with [`Error::Dataset`].
pub fn train_val_split(
    mut records: Vec<FormattedRecord>,
    ratio: f32,
    seed: u64,
) -> Result<(Vec<FormattedRecord>, Vec<FormattedRecord>)> {
    let len = records.len();
    let mut val_size = (len as f32 * ratio).round() as usize;
    if val_size > 0 && val_size >= len {
        if len < 2 {
            return Err(Error::Dataset(format!(
                "val_ratio {ratio} leaves no training records out of {len}"
            )));
        }
        val_size = len - 1;
    }

    let mut rng = rand::rngs::StdRng::seed_from_u64(seed);
    records.shuffle(&mut rng);
    let held_out = records.split_off(len - val_size);
    Ok((records, held_out))
}

impl fmt::Debug for SftDataset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SftDataset")
            .field("records", &self.records.len())
            .field("has_tokenizer", &self.tokenizer.is_some())
            .field("prompt_style", &self.prompt_style)
            .field("max_seq_length", &self.max_seq_length)
            .field("mask_prompt", &self.mask_prompt)
            .field("ignore_index", &self.ignore_index)
            .finish()
    }
}
