//! Core types, configuration and errors for instructkit.
//!
//! This crate provides the pieces shared by the hub, data and CLI crates:
//!
//! - Conversation rows, roles and formatted SFT records
//! - Data module configuration and its defaults
//! - The [`DatasetSource`] seam used to fetch raw rows
//! - Error handling infrastructure
//! - Redacted storage of access tokens

#![warn(missing_docs)]

mod config;
mod error;
mod secrets;
mod traits;
mod types;

pub use config::*;
pub use error::*;
pub use secrets::SecretString;
pub use traits::*;
pub use types::*;

/// Prelude module for convenient imports.
pub mod prelude {
    pub use crate::config::*;
    pub use crate::error::{Error, Result};
    pub use crate::secrets::SecretString;
    pub use crate::traits::*;
    pub use crate::types::*;
}
