//! Core types and utilities for the Sentinel satellite-reconstruction cGAN.
//!
//! This crate provides the shapes, loss records, configuration and error
//! types shared by the data, training and tooling crates.

pub mod error;
pub mod types;
pub mod config;
pub mod metrics;
pub mod cli;

pub use error::{Error, Result};
pub use types::*;
pub use config::*;
pub use metrics::*;
pub use cli::*;

/// Re-export commonly used types
pub mod prelude {
    pub use crate::config::*;
    pub use crate::error::{Error, Result};
    pub use crate::metrics::*;
    pub use crate::types::*;
}
