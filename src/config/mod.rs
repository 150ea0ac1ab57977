//! Configuration module for the filter pipeline.
//!
//! Provides `PipelineConfig` (filter order plus per-filter settings),
//! `AppPaths` for cross-platform config directories, and TOML persistence
//! via `PipelineConfig::load` / `PipelineConfig::save`.

pub mod paths;
pub mod settings;

pub use paths::AppPaths;
pub use settings::{FilterEntry, FilterKind, PipelineConfig, ReplacerSettings};
