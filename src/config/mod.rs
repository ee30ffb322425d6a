//! Configuration module for the TOPIK data-preparation tools.
//!
//! Provides `AppConfig` (top-level settings), sub-configs for each pipeline,
//! `AppPaths` for the platform config directory, and TOML persistence via
//! `AppConfig::load_from` / `AppConfig::save_to`.

pub mod paths;
pub mod settings;

pub use paths::AppPaths;
pub use settings::{AppConfig, PathsConfig, TtsConfig};
