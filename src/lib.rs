//! Offline data preparation for the TOPIK vocabulary web app.
//!
//! * [`vocab`] — converts the per-level TOPIK CSV tables into `topik{N}.json`.
//! * [`tts`] — pre-generates pronunciation audio for every headword.
//! * [`config`] — settings shared by both pipelines.

pub mod config;
mod json;
pub mod tts;
pub mod vocab;
