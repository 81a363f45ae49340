//! Data module configuration.

use crate::{Error, Result, SecretString};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// HuggingFace repository of WizardLM evol-instruct V2.
pub const WIZARDLM_REPO_ID: &str = "WizardLM/WizardLM_evol_instruct_V2_196k";
/// Default cache directory for WizardLM evol-instruct V2.
pub const WIZARDLM_DOWNLOAD_DIR: &str = "./data/sft/wizardlm-evol-instruct-v2";
/// HuggingFace repository of MetaMathQA.
pub const META_MATH_REPO_ID: &str = "meta-math/MetaMathQA";
/// Default cache directory for MetaMathQA.
pub const META_MATH_DOWNLOAD_DIR: &str = "./data/sft/meta-math-qa";
/// Splits fetched when none are configured.
pub const DEFAULT_SPLITS: &[&str] = &["train"];
/// Prompt style used when none is configured.
pub const DEFAULT_PROMPT_STYLE: &str = "chatml";
/// Label value ignored by the loss.
pub const DEFAULT_IGNORE_INDEX: i64 = -100;
/// `max_seq_length` sentinel meaning "no truncation".
pub const UNBOUNDED_SEQ_LENGTH: i64 = -1;

/// Configuration of an SFT data module.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DataModuleConfig {
    /// Repository the data is downloaded from.
    #[serde(default = "default_repo_id")]
    pub repo_id: String,

    /// Directory the downloaded dataset is cached in.
    #[serde(default = "default_download_dir")]
    pub download_dir: PathBuf,

    /// Splits to fetch. The first one becomes the training split.
    #[serde(default = "default_splits")]
    pub splits: Vec<String>,

    /// Whether to include multi-turn conversations.
    ///
    /// Accepted for compatibility with existing callers; currently a no-op.
    /// Only the first human/assistant pair of each conversation is used.
    #[serde(default)]
    pub include_multiturn_conversations: bool,

    /// Prompt style name (see `PromptStyle::from_name`).
    #[serde(default = "default_prompt_style")]
    pub prompt_style: String,

    /// Worker count override for downstream loaders.
    #[serde(default)]
    pub num_workers: Option<usize>,

    /// Replace prompt labels with `ignore_index`.
    #[serde(default)]
    pub mask_prompt: bool,

    /// Label value ignored by the loss.
    #[serde(default = "default_ignore_index")]
    pub ignore_index: i64,

    /// Fraction of the training split held out for validation.
    ///
    /// `None` keeps `val_dataset` and `test_dataset` empty.
    #[serde(default)]
    pub val_ratio: Option<f32>,

    /// Seed for the held-out shuffle.
    #[serde(default = "default_seed")]
    pub seed: u64,

    /// Repository revision/branch.
    #[serde(default)]
    pub revision: Option<String>,

    /// HuggingFace token for gated datasets.
    #[serde(default, skip_serializing)]
    pub hf_token: Option<SecretString>,
}

impl Default for DataModuleConfig {
    fn default() -> Self {
        Self {
            repo_id: default_repo_id(),
            download_dir: default_download_dir(),
            splits: default_splits(),
            include_multiturn_conversations: false,
            prompt_style: default_prompt_style(),
            num_workers: None,
            mask_prompt: false,
            ignore_index: default_ignore_index(),
            val_ratio: None,
            seed: default_seed(),
            revision: None,
            hf_token: None,
        }
    }
}

impl DataModuleConfig {
    /// Defaults for WizardLM evol-instruct V2.
    pub fn wizardlm() -> Self {
        Self::default()
    }

    /// Defaults for MetaMathQA.
    pub fn meta_math() -> Self {
        Self {
            repo_id: META_MATH_REPO_ID.to_string(),
            download_dir: PathBuf::from(META_MATH_DOWNLOAD_DIR),
            ..Self::default()
        }
    }

    /// Load configuration from a YAML file.
    pub fn from_yaml_file(path: impl AsRef<Path>) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml(&content)
    }

    /// Parse configuration from a YAML string.
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        Ok(serde_yaml::from_str(yaml)?)
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<()> {
        if self.repo_id.trim().is_empty() {
            return Err(Error::Config("repo_id must not be empty".to_string()));
        }
        if self.splits.is_empty() {
            return Err(Error::Config("at least one split is required".to_string()));
        }
        if let Some(ratio) = self.val_ratio {
            if !(0.0..1.0).contains(&ratio) {
                return Err(Error::Config(format!(
                    "val_ratio must be in [0, 1), got {ratio}"
                )));
            }
        }
        Ok(())
    }
}

fn default_repo_id() -> String {
    WIZARDLM_REPO_ID.to_string()
}
fn default_download_dir() -> PathBuf {
    PathBuf::from(WIZARDLM_DOWNLOAD_DIR)
}
fn default_splits() -> Vec<String> {
    DEFAULT_SPLITS.iter().map(|s| s.to_string()).collect()
}
fn default_prompt_style() -> String {
    DEFAULT_PROMPT_STYLE.to_string()
}
fn default_ignore_index() -> i64 {
    DEFAULT_IGNORE_INDEX
}
fn default_seed() -> u64 {
    42
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = DataModuleConfig::default();
        assert_eq!(config.repo_id, WIZARDLM_REPO_ID);
        assert_eq!(config.download_dir, PathBuf::from(WIZARDLM_DOWNLOAD_DIR));
        assert_eq!(config.splits, vec!["train".to_string()]);
        assert_eq!(config.prompt_style, "chatml");
        assert_eq!(config.ignore_index, -100);
        assert!(!config.include_multiturn_conversations);
        assert!(config.val_ratio.is_none());
    }

    #[test]
    fn test_from_yaml_partial() {
        let yaml = r#"
repo_id: meta-math/MetaMathQA
download_dir: /tmp/metamath
prompt_style: alpaca
mask_prompt: true
hf_token: hf_abc
"#;
        let config = DataModuleConfig::from_yaml(yaml).unwrap();
        assert_eq!(config.repo_id, META_MATH_REPO_ID);
        assert_eq!(config.download_dir, PathBuf::from("/tmp/metamath"));
        assert_eq!(config.prompt_style, "alpaca");
        assert!(config.mask_prompt);
        assert_eq!(config.splits, vec!["train".to_string()]);
        assert_eq!(
            config.hf_token.as_ref().map(|t| t.expose_secret()),
            Some("hf_abc")
        );
    }

    #[test]
    fn test_token_not_serialized() {
        let config = DataModuleConfig {
            hf_token: Some(SecretString::new("hf_secret")),
            ..Default::default()
        };
        let yaml = serde_yaml::to_string(&config).unwrap();
        assert!(!yaml.contains("hf_secret"));
    }

    #[test]
    fn test_validate() {
        assert!(DataModuleConfig::default().validate().is_ok());

        let no_splits = DataModuleConfig {
            splits: Vec::new(),
            ..Default::default()
        };
        assert!(matches!(no_splits.validate(), Err(Error::Config(_))));

        let bad_ratio = DataModuleConfig {
            val_ratio: Some(1.5),
            ..Default::default()
        };
        assert!(bad_ratio.validate().is_err());
    }
}
