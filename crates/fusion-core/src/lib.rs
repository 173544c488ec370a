//! fusion-core - Core types and traits for document splitting
//!
//! This crate provides the document record, configuration model, capability
//! traits and error handling shared by the splitters and the CLI.

pub mod config;
pub mod error;
pub mod traits;
pub mod types;

pub use config::*;
pub use error::{FusionError, Result};
pub use traits::*;
pub use types::*;
