//! MetaMathQA (augmented GSM8K and MATH questions).

use super::{DataModule, ModuleState, PreparedDatasets};
use crate::format::format_meta_math;
use crate::prompts::PromptStyle;
use crate::tokenizer::TextEncoder;
use instructkit_core::{DataModuleConfig, DatasetSource, MetaMathRow, RawSplit, Result};
use std::sync::Arc;

/// Data module for `meta-math/MetaMathQA`.
pub struct MetaMathQa {
    state: ModuleState,
}

impl MetaMathQa {
    /// Hub-backed module with default settings.
    pub fn new(prompt_style: &str, num_workers: Option<usize>) -> Result<Self> {
        let state = ModuleState::hub(DataModuleConfig::meta_math(), prompt_style, num_workers)?;
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

    /// Datasets built by the last `setup`.
    pub fn prepared(&self) -> &PreparedDatasets {
        &self.state.prepared
    }
}

impl DataModule for MetaMathQa {
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
        self.state.setup(stage, |split| {
            let rows: Vec<MetaMathRow> = split.decode()?;
            Ok(format_meta_math(&rows))
        })
    }

    fn config(&self) -> &DataModuleConfig {
        &self.state.config
    }
}
