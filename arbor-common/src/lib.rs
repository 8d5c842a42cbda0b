//! # Arbor Common Library
//!
//! Shared code for the Arbor services:
//! - Error types
//! - Configuration loading and data folder resolution

pub mod config;
pub mod error;

pub use error::{Error, Result};
