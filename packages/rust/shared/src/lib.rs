//! Shared types, error model, and configuration for InternScout.
//!
//! This crate is the foundation depended on by all other InternScout crates.
//! It provides:
//! - [`InternScoutError`] — the unified error type
//! - Domain types ([`Posting`], [`ProgressRecord`])
//! - Configuration ([`AppConfig`], [`ScrapeConfig`], config loading)

pub mod config;
pub mod error;
pub mod types;

// Re-export public API at crate root for ergonomic imports.
pub use config::{
    AppConfig, FeedConfig, FilterConfig, KeywordsConfig, ScrapeConfig, ScrapeSettings,
    StorageConfig, config_dir, config_file_path, init_config, load_config, load_config_from,
};
pub use error::{InternScoutError, Result};
pub use types::{Posting, ProgressRecord};
