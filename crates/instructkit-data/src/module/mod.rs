//! Data modules: fetch a published dataset and turn it into an [`SftDataset`].
//!
//! A data module is driven through three calls:
//!
//! 1. [`connect`](DataModule::connect) attaches the tokenizer and length limits
//! 2. [`prepare_data`](DataModule::prepare_data) fetches the raw splits
//! 3. [`setup`](DataModule::setup) formats the first split and wraps it
//!
//! `setup` may be called repeatedly. Each call fetches again (a cache hit for
//! the Hub source) and rebuilds `train_dataset` from scratch.

mod meta_math;
mod wizardlm;

pub use meta_math::MetaMathQa;
pub use wizardlm::WizardLmEvolInstructV2;

use crate::prompts::PromptStyle;
use crate::sft::{train_val_split, SftDataset};
use crate::tokenizer::TextEncoder;
use instructkit_core::{
    DataModuleConfig, DatasetSource, Error, FormattedRecord, RawSplit, Result,
    UNBOUNDED_SEQ_LENGTH,
};
use instructkit_hub::HubDatasetSource;
use std::sync::Arc;

/// Lifecycle of an SFT data module.
pub trait DataModule {
    /// Attach the tokenizer and batching limits used by later `setup` calls.
    ///
    /// `max_seq_length` of `None` means no truncation. `batch_size` is
    /// recorded for downstream loaders only.
    fn connect(
        &mut self,
        tokenizer: Option<Arc<dyn TextEncoder>>,
        batch_size: usize,
        max_seq_length: Option<i64>,
    );

    /// Fetch the configured splits.
    fn prepare_data(&self) -> Result<Vec<RawSplit>>;

    /// Build the datasets for `stage`.
    fn setup(&mut self, stage: &str) -> Result<PreparedDatasets>;

    /// Configuration the module was built with.
    fn config(&self) -> &DataModuleConfig;
}

/// Datasets produced by [`DataModule::setup`].
///
/// Cloning is cheap: the datasets share their records.
#[derive(Debug, Clone, Default)]
pub struct PreparedDatasets {
    /// Training data.
    pub train_dataset: Option<SftDataset>,
    /// Held-out data, present when `val_ratio` is configured.
    pub val_dataset: Option<SftDataset>,
    /// Test data. Shares the held-out records with `val_dataset`.
    pub test_dataset: Option<SftDataset>,
}

impl PreparedDatasets {
    /// Names accepted by [`get`](Self::get).
    pub const KEYS: [&'static str; 3] = ["train_dataset", "val_dataset", "test_dataset"];

    /// Look a dataset up by its field name.
    pub fn get(&self, name: &str) -> Option<&SftDataset> {
        match name {
            "train_dataset" => self.train_dataset.as_ref(),
            "val_dataset" => self.val_dataset.as_ref(),
            "test_dataset" => self.test_dataset.as_ref(),
            _ => None,
        }
    }

    /// Iterate over the datasets that are present, with their names.
    pub fn iter(&self) -> impl Iterator<Item = (&'static str, &SftDataset)> {
        Self::KEYS
            .into_iter()
            .filter_map(move |name| self.get(name).map(|ds| (name, ds)))
    }
}

/// State shared by every data module.
pub(crate) struct ModuleState {
    pub(crate) config: DataModuleConfig,
    pub(crate) source: Box<dyn DatasetSource>,
    pub(crate) prompt_style: PromptStyle,
    pub(crate) tokenizer: Option<Arc<dyn TextEncoder>>,
    pub(crate) batch_size: usize,
    pub(crate) max_seq_length: i64,
    pub(crate) prepared: PreparedDatasets,
}

impl ModuleState {
    pub(crate) fn new(config: DataModuleConfig, source: Box<dyn DatasetSource>) -> Result<Self> {
        config.validate()?;
        let prompt_style = PromptStyle::from_name(&config.prompt_style)?;
        Ok(Self {
            config,
            source,
            prompt_style,
            tokenizer: None,
            batch_size: 1,
            max_seq_length: UNBOUNDED_SEQ_LENGTH,
            prepared: PreparedDatasets::default(),
        })
    }

    /// Hub-backed state with the given prompt style and worker override.
    pub(crate) fn hub(
        mut config: DataModuleConfig,
        prompt_style: &str,
        num_workers: Option<usize>,
    ) -> Result<Self> {
        config.prompt_style = prompt_style.to_string();
        if num_workers.is_some() {
            config.num_workers = num_workers;
        }
        let source = HubDatasetSource::new()
            .with_token(config.hf_token.clone())
            .with_revision(config.revision.clone());
        Self::new(config, Box::new(source))
    }

    pub(crate) fn connect(
        &mut self,
        tokenizer: Option<Arc<dyn TextEncoder>>,
        batch_size: usize,
        max_seq_length: Option<i64>,
    ) {
        self.tokenizer = tokenizer;
        self.batch_size = batch_size;
        self.max_seq_length = max_seq_length.unwrap_or(UNBOUNDED_SEQ_LENGTH);
    }

    pub(crate) fn prepare_data(&self) -> Result<Vec<RawSplit>> {
        tracing::info!(
            dataset = %self.config.repo_id,
            cache = %self.config.download_dir.display(),
            "Preparing dataset"
        );
        self.source.fetch(
            &self.config.repo_id,
            &self.config.splits,
            &self.config.download_dir,
        )
    }

    /// Fetch, take the first split, format it with `format` and wrap the records.
    pub(crate) fn setup<F>(&mut self, stage: &str, format: F) -> Result<PreparedDatasets>
    where
        F: FnOnce(&RawSplit) -> Result<Vec<FormattedRecord>>,
    {
        let splits = self.prepare_data()?;
        let train_split = splits.first().ok_or_else(|| {
            Error::Dataset(format!(
                "Source returned no splits for {}",
                self.config.repo_id
            ))
        })?;

        let records = format(train_split)?;
        tracing::info!(
            stage,
            split = %train_split.name,
            records = records.len(),
            prompt_style = %self.prompt_style,
            "Formatted dataset"
        );

        let build = |records: Vec<FormattedRecord>| {
            SftDataset::new(records, self.prompt_style)
                .with_tokenizer(self.tokenizer.clone())
                .with_max_seq_length(self.max_seq_length)
                .with_prompt_masking(self.config.mask_prompt, self.config.ignore_index)
        };

        // The bundle kept in `prepared` shares records with the one returned.
        let prepared = match self.config.val_ratio {
            Some(ratio) if ratio > 0.0 => {
                let (train, held_out) = train_val_split(records, ratio, self.config.seed)?;
                let val = build(held_out);
                PreparedDatasets {
                    train_dataset: Some(build(train)),
                    test_dataset: Some(val.clone()),
                    val_dataset: Some(val),
                }
            }
            _ => PreparedDatasets {
                train_dataset: Some(build(records)),
                ..Default::default()
            },
        };
        self.prepared = prepared;

        Ok(self.prepared.clone())
    }
}
