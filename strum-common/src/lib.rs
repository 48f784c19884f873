//! # StrumSense Common Library
//!
//! Shared code for StrumSense services including:
//! - Common error type
//! - TOML configuration loading and API key resolution
//! - Tracing subscriber setup

pub mod config;
pub mod error;
pub mod logging;

pub use error::{Error, Result};
