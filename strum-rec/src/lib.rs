//! strum-rec library interface
//!
//! Identification-and-ranking core for StrumSense: turns a performance's feature vector
//! (and optional fingerprint) into a ranked, explained list of songs to learn.
//!
//! Entry point: [`RecommendationEngine::recommend`].

pub mod config;
pub mod engine;
pub mod error;
pub mod providers;
pub mod services;
pub mod types;
pub mod workflow;

pub use crate::config::EngineConfig;
pub use crate::engine::RecommendationEngine;
pub use crate::error::{RecommendError, RecommendResult};
pub use crate::providers::ProviderSet;
