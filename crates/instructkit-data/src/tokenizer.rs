//! Tokenizer integration.

use instructkit_core::{Error, Result};
use std::path::Path;

/// Converts text to token ids.
///
/// This is all an [`SftDataset`](crate::SftDataset) needs from a tokenizer.
pub trait TextEncoder: Send + Sync {
    /// Encode text to token ids, without special tokens.
    fn encode(&self, text: &str) -> Result<Vec<u32>>;

    /// Beginning-of-sequence token, if the vocabulary has one.
    fn bos_token_id(&self) -> Option<u32> {
        None
    }

    /// End-of-sequence token, if the vocabulary has one.
    fn eos_token_id(&self) -> Option<u32> {
        None
    }
}

/// Wrapper around the tokenizers library.
pub struct Tokenizer {
    inner: tokenizers::Tokenizer,
}

impl Tokenizer {
    /// Load a tokenizer from a local `tokenizer.json`.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let inner = tokenizers::Tokenizer::from_file(path)
            .map_err(|e| Error::Tokenizer(e.to_string()))?;
        Ok(Self { inner })
    }

    /// Load a tokenizer from bytes.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let inner = tokenizers::Tokenizer::from_bytes(bytes)
            .map_err(|e| Error::Tokenizer(e.to_string()))?;
        Ok(Self { inner })
    }

    /// Decode token ids to text.
    pub fn decode(&self, ids: &[u32]) -> Result<String> {
        self.inner
            .decode(ids, true)
            .map_err(|e| Error::Tokenizer(e.to_string()))
    }

    /// Get vocabulary size.
    pub fn vocab_size(&self) -> usize {
        self.inner.get_vocab_size(true)
    }

    /// Get the underlying tokenizer.
    pub fn inner(&self) -> &tokenizers::Tokenizer {
        &self.inner
    }
}

impl TextEncoder for Tokenizer {
    fn encode(&self, text: &str) -> Result<Vec<u32>> {
        let encoding = self
            .inner
            .encode(text, false)
            .map_err(|e| Error::Tokenizer(e.to_string()))?;
        Ok(encoding.get_ids().to_vec())
    }

    fn bos_token_id(&self) -> Option<u32> {
        self.inner
            .token_to_id("<s>")
            .or_else(|| self.inner.token_to_id("<|begin_of_text|>"))
            .or_else(|| self.inner.token_to_id("<bos>"))
    }

    fn eos_token_id(&self) -> Option<u32> {
        self.inner
            .token_to_id("</s>")
            .or_else(|| self.inner.token_to_id("<|endoftext|>"))
            .or_else(|| self.inner.token_to_id("<|end_of_text|>"))
            .or_else(|| self.inner.token_to_id("<|im_end|>"))
            .or_else(|| self.inner.token_to_id("<eos>"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const WORD_LEVEL_TOKENIZER: &str = r#"{
        "version": "1.0",
        "truncation": null,
        "padding": null,
        "added_tokens": [],
        "normalizer": null,
        "pre_tokenizer": {"type": "Whitespace"},
        "post_processor": null,
        "decoder": null,
        "model": {
            "type": "WordLevel",
            "vocab": {"<unk>": 0, "</s>": 1, "hello": 2, "world": 3},
            "unk_token": "<unk>"
        }
    }"#;

    #[test]
    fn test_word_level_encode() {
        let tokenizer = Tokenizer::from_bytes(WORD_LEVEL_TOKENIZER.as_bytes()).unwrap();
        assert_eq!(tokenizer.encode("hello world").unwrap(), vec![2, 3]);
        assert_eq!(tokenizer.encode("hello there").unwrap(), vec![2, 0]);
        assert_eq!(tokenizer.eos_token_id(), Some(1));
        assert_eq!(tokenizer.bos_token_id(), None);
        assert_eq!(tokenizer.vocab_size(), 4);
    }

    #[test]
    fn test_invalid_tokenizer_bytes() {
        assert!(matches!(
            Tokenizer::from_bytes(b"not a tokenizer"),
            Err(Error::Tokenizer(_))
        ));
    }
}
