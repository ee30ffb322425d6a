//! Text-to-speech audio cache for the normalised vocabulary.
//!
//! This module provides:
//! * [`TtsEngine`] — async trait implemented by all synthesis backends.
//! * [`ApiSynthesizer`] — OpenAI-compatible `/v1/audio/speech` backend.
//! * [`Manifest`] — persisted `word → audio file` map.
//! * [`AudioCacheBuilder`] — batch generation with per-batch manifest saves.
//! * [`TtsError`] / [`ManifestError`] / [`AudioBuildError`] — error variants.
//!
//! # Quick start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use topik_prep::config::AppConfig;
//! use topik_prep::tts::{ApiSynthesizer, AudioCacheBuilder};
//!
//! #[tokio::main]
//! async fn main() {
//!     let config = AppConfig::default();
//!     let engine = Arc::new(ApiSynthesizer::from_config(&config.tts));
//!     let report = AudioCacheBuilder::new(&config, engine).run().await.unwrap();
//!     println!("{} files generated", report.generated);
//! }
//! ```

pub mod builder;
pub mod engine;
pub mod manifest;

// ---------------------------------------------------------------------------
// Public re-exports
// ---------------------------------------------------------------------------

pub use builder::{
    collect_headwords, plan, AudioBuildError, AudioCacheBuilder, AudioReport, CachePlan,
};
pub use engine::{ApiSynthesizer, TtsEngine, TtsError};
pub use manifest::{audio_filename, fingerprint, Manifest, ManifestError, AUDIO_EXTENSION};

// test-only re-export so the builder tests can reach the mock engine
#[cfg(test)]
pub use engine::MockTtsEngine;
