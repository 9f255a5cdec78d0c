//! Shared types, error model, and configuration for reportgen.
//!
//! This crate is the foundation depended on by all other reportgen crates.
//! It provides:
//! - [`ReportError`] and [`ErrorKind`]: the unified error type and its taxonomy
//! - Domain types ([`Topic`], [`ReportKind`], [`Outline`], [`SectionOutput`],
//!   [`ChartRequest`], [`ReportPayload`])
//! - Configuration ([`AppConfig`], [`BackendConfig`], config loading)

pub mod config;
pub mod error;
pub mod types;

// Re-export public API at crate root for ergonomic imports.
pub use config::{
    AppConfig, BackendConfig, DefaultsConfig, GenerationConfig, StagesConfig, config_dir,
    config_file_path, init_config, load_config, load_config_from, validate_api_key,
};
pub use error::{ErrorKind, ReportError, Result};
pub use types::{
    ChartKind, ChartRequest, ExportFormat, ExportedFile, Outline, RenderedChart, ReportKind,
    ReportPayload, RunId, Section, SectionOutput, Topic,
};
