//! Row and record types shared by every crate.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Speaker role of a conversation turn.
///
/// Serialized with the ShareGPT labels (`human` / `gpt`). The OpenAI labels
/// `user` and `assistant` are accepted as aliases; anything else is rejected
/// when the row is decoded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Role {
    /// The person asking.
    #[serde(rename = "human", alias = "user")]
    Human,
    /// The model answering.
    #[serde(rename = "gpt", alias = "assistant")]
    Assistant,
}

impl Role {
    /// Wire label of the role.
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Human => "human",
            Self::Assistant => "gpt",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single message of a conversation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Turn {
    /// Who said it.
    pub from: Role,
    /// What was said.
    pub value: String,
}

impl Turn {
    /// Create a human turn.
    pub fn human(value: impl Into<String>) -> Self {
        Self {
            from: Role::Human,
            value: value.into(),
        }
    }

    /// Create an assistant turn.
    pub fn assistant(value: impl Into<String>) -> Self {
        Self {
            from: Role::Assistant,
            value: value.into(),
        }
    }
}

/// ShareGPT-style conversation row, as published by WizardLM evol-instruct.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversationRow {
    /// Ordered turns. Expected to start with a human turn followed by a
    /// model turn, but this is only checked (and logged) by the formatter.
    pub conversations: Vec<Turn>,
    /// Row identifier.
    pub idx: String,
}

/// MetaMathQA question/answer row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetaMathRow {
    /// Augmented question.
    pub query: String,
    /// Worked answer.
    pub response: String,
    /// Augmentation type (e.g. `MATH_AnsAug`).
    #[serde(default, rename = "type")]
    pub kind: String,
    /// Question the augmentation was derived from.
    #[serde(default)]
    pub original_question: String,
}

/// Single-turn SFT record in Alpaca layout.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FormattedRecord {
    /// Prompt text.
    pub instruction: String,
    /// Extra context. Always empty for conversation sources.
    #[serde(default)]
    pub input: String,
    /// Target response.
    pub output: String,
}

impl FormattedRecord {
    /// Create a record with an empty `input`.
    pub fn new(instruction: impl Into<String>, output: impl Into<String>) -> Self {
        Self {
            instruction: instruction.into(),
            input: String::new(),
            output: output.into(),
        }
    }
}

/// Untyped rows of one dataset split, as handed over by a [`DatasetSource`].
///
/// [`DatasetSource`]: crate::DatasetSource
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawSplit {
    /// Split name (e.g. `train`).
    pub name: String,
    /// One JSON object per row.
    pub rows: Vec<serde_json::Value>,
}

impl RawSplit {
    /// Create a split from rows.
    pub fn new(name: impl Into<String>, rows: Vec<serde_json::Value>) -> Self {
        Self {
            name: name.into(),
            rows,
        }
    }

    /// Number of rows.
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Whether the split has no rows.
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Decode every row into `T`, naming the first row that fails.
    pub fn decode<T: serde::de::DeserializeOwned>(&self) -> crate::Result<Vec<T>> {
        self.rows
            .iter()
            .enumerate()
            .map(|(row, value)| {
                T::deserialize(value).map_err(|source| crate::Error::RowDecode {
                    split: self.name.clone(),
                    row,
                    source,
                })
            })
            .collect()
    }
}
