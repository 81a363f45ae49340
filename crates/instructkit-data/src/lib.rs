//! Supervised fine-tuning datasets for instructkit.
//!
//! This crate provides:
//! - Formatting of ShareGPT conversations and MetaMathQA rows into
//!   instruction/input/output records
//! - Data modules that fetch, format and wrap a published dataset
//! - Prompt styles and tokenizer integration
//! - A lazily tokenized SFT dataset with prompt masking
//! - A local JSON Lines dataset source

#![warn(missing_docs)]

pub mod format;
pub mod module;
pub mod prompts;
pub mod sft;
pub mod source;
pub mod tokenizer;

pub use format::*;
pub use module::*;
pub use prompts::*;
pub use sft::*;
pub use source::*;
pub use tokenizer::*;
