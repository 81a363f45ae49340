//! Error types for instructkit.

use thiserror::Error;

/// Result type alias for instructkit operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for dataset preparation.
#[derive(Error, Debug)]
pub enum Error {
    /// I/O errors.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON (de)serialization errors.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// YAML parsing errors.
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// HuggingFace Hub errors.
    #[error("Hub error: {0}")]
    Hub(String),

    /// Tokenizer errors.
    #[error("Tokenizer error: {0}")]
    Tokenizer(String),

    /// Configuration errors.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Dataset file or split errors.
    #[error("Dataset error: {0}")]
    Dataset(String),

    /// A raw row did not match the expected schema.
    #[error("Failed to decode row {row} of split '{split}': {source}")]
    RowDecode {
        /// Split the row came from.
        split: String,
        /// Zero-based row position within the split.
        row: usize,
        /// Underlying decode failure.
        #[source]
        source: serde_json::Error,
    },

    /// A conversation is shorter than the turns the formatter reads.
    #[error("Row [{idx}] has no turn at position {position} (conversation has {len} turn(s))")]
    MissingTurn {
        /// Row identifier.
        idx: String,
        /// Turn position that was requested.
        position: usize,
        /// Number of turns actually present.
        len: usize,
    },
}
