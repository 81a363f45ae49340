//! HuggingFace Hub integration for instructkit.
//!
//! This crate provides:
//! - Dataset split discovery and downloading from HuggingFace Hub
//! - Decoding of Parquet, JSON and JSON Lines data files into rows
//! - Local cache management

#![warn(missing_docs)]

mod cache;
mod decode;
mod download;

pub use cache::*;
pub use decode::*;
pub use download::*;
