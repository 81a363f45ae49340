//! WizardLM evol-instruct V2 (196k ShareGPT conversations).

use super::{DataModule, ModuleState, PreparedDatasets};
use crate::format::format_dataset;
use crate::prompts::PromptStyle;
use crate::tokenizer::TextEncoder;
use instructkit_core::{
    ConversationRow, DataModuleConfig, DatasetSource, FormattedRecord, RawSplit, Result,
};
use std::sync::Arc;

/// Data module for `WizardLM/WizardLM_evol_instruct_V2_196k`.
///
/// Each conversation becomes one record: the first human turn is the
/// instruction and the first model turn is the output.
pub struct WizardLmEvolInstructV2 {
    state: ModuleState,
}

impl WizardLmEvolInstructV2 {
    /// Hub-backed module with default settings.
    ///
    /// Fails with [`Error::Config`](instructkit_core::Error::Config) when
    /// `prompt_style` is not a known style.
    pub fn new(prompt_style: &str, num_workers: Option<usize>) -> Result<Self> {
        let state = ModuleState::hub(DataModuleConfig::wizardlm(), prompt_style, num_workers)?;
        Ok(Self { state })
    }

    /// Module with an explicit configuration and source.
    pub fn with_config(config: DataModuleConfig, source: Box<dyn DatasetSource>) -> Result<Self> {
        Ok(Self {
            state: ModuleState::new(config, source)?,
        })
    }

    /// Resolved prompt style.
    pub fn prompt_style(&self) -> PromptStyle {
        self.state.prompt_style
    }

    /// Batch size recorded by the last `connect`.
    pub fn batch_size(&self) -> usize {
        self.state.batch_size
    }

    /// Truncation length recorded by the last `connect`.
    pub fn max_seq_length(&self) -> i64 {
        self.state.max_seq_length
    }

    /// Datasets built by the last `setup`.
    pub fn prepared(&self) -> &PreparedDatasets {
        &self.state.prepared
    }

    fn format_split(
        split: &RawSplit,
        include_multiturn_conversations: bool,
    ) -> Result<Vec<FormattedRecord>> {
        let rows: Vec<ConversationRow> = split.decode()?;
        format_dataset(&rows, include_multiturn_conversations)
    }
}

impl DataModule for WizardLmEvolInstructV2 {
    fn connect(
        &mut self,
        tokenizer: Option<Arc<dyn TextEncoder>>,
        batch_size: usize,
        max_seq_length: Option<i64>,
    ) {
        self.state.connect(tokenizer, batch_size, max_seq_length);
    }

    fn prepare_data(&self) -> Result<Vec<RawSplit>> {
        self.state.prepare_data()
    }

    fn setup(&mut self, stage: &str) -> Result<PreparedDatasets> {
        let multiturn = self.state.config.include_multiturn_conversations;
        self.state.setup(stage, |split| Self::format_split(split, multiturn))
    }

    fn config(&self) -> &DataModuleConfig {
        &self.state.config
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use instructkit_core::{Error, UNBOUNDED_SEQ_LENGTH, WIZARDLM_REPO_ID};

    #[test]
    fn test_new_resolves_prompt_style() {
        let module = WizardLmEvolInstructV2::new("alpaca", Some(4)).unwrap();
        assert_eq!(module.prompt_style(), PromptStyle::Alpaca);
        assert_eq!(module.config().num_workers, Some(4));
        assert_eq!(module.config().repo_id, WIZARDLM_REPO_ID);
        assert_eq!(module.max_seq_length(), UNBOUNDED_SEQ_LENGTH);
    }

    #[test]
    fn test_new_keeps_default_workers() {
        let module = WizardLmEvolInstructV2::new("chatml", None).unwrap();
        assert_eq!(module.config().num_workers, None);
    }

    #[test]
    fn test_new_rejects_unknown_style() {
        assert!(matches!(
            WizardLmEvolInstructV2::new("nonexistent", None),
            Err(Error::Config(_))
        ));
    }
}
