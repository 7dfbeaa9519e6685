//! Shared types, error model, and configuration for SiteSignal.
//!
//! This crate is the foundation depended on by all other SiteSignal crates.
//! It provides:
//! - [`SiteSignalError`]: the unified error type
//! - Domain types ([`SiteAnalysis`], [`LinkSet`], [`ContactInfo`], [`BatchResult`], ...)
//! - Configuration ([`AppConfig`], [`FetchOptions`], config loading)

pub mod config;
pub mod error;
pub mod types;

// Re-export public API at crate root for ergonomic imports.
pub use config::{
    AppConfig, BatchConfig, FetchConfig, FetchOptions, OpenRouterConfig, RenderConfig,
    ValidatorConfig, config_dir, config_file_path, init_config, load_config, load_config_from,
    validate_api_key,
};
pub use error::{Result, SiteSignalError};
pub use types::{
    AboutInfo, BatchAggregate, BatchEntry, BatchResult, ContactInfo, ContentType, FetchFailure,
    FetchResult, LinkSet, RunId, ScoredSummary, SignalBucket, SignalCategory, Signals,
    SiteAnalysis, UNKNOWN_COMPANY,
};
