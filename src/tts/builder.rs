//! Audio cache builder — pre-generates pronunciation audio for every
//! headword in the normalised vocabulary documents.
//!
//! # Flow
//!
//! ```text
//! manifest.json ──Manifest::load──────────┐
//! topik{1..6}.json ──collect_headwords──▶ plan ──▶ pending words
//!                                                    │ chunks(batch_size)
//!                                                    ▼
//!                  register tentatively ─▶ synthesise concurrently
//!                                                    │
//!                  keep entry / roll back ◀──────────┘
//!                                                    │
//!                                        Manifest::save (every batch)
//! ```
//!
//! A word is *cached* when it has a manifest entry **and** the referenced
//! file exists; an entry whose file was deleted is regenerated.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use futures::future::join_all;
use serde::Deserialize;
use thiserror::Error;

use crate::config::{AppConfig, PathsConfig, TtsConfig};
use crate::vocab::Level;

use super::engine::{TtsEngine, TtsError};
use super::manifest::{audio_filename, Manifest, ManifestError, AUDIO_EXTENSION};

/// Synthesis errors logged individually per run; later ones are only counted.
const MAX_REPORTED_ERRORS: usize = 5;

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Errors that abort an audio cache run.
#[derive(Debug, Error)]
pub enum AudioBuildError {
    #[error(transparent)]
    Manifest(#[from] ManifestError),

    #[error("failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A vocabulary document exists but is not a list of entries.
    #[error("malformed vocabulary document {}: {source}", path.display())]
    Document {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// Why a single word ended up without audio.
#[derive(Debug, Error)]
enum WordFailure {
    #[error(transparent)]
    Tts(#[from] TtsError),

    #[error("failed to write {}: {source}", path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

// ---------------------------------------------------------------------------
// Planning
// ---------------------------------------------------------------------------

/// Only the headword is needed from each vocabulary entry.
#[derive(Deserialize)]
struct Headword {
    kr: String,
}

/// Distinct headwords across every `topik{N}.json` in `data_dir`.
///
/// Absent level documents are skipped.
pub fn collect_headwords(data_dir: &Path) -> Result<BTreeSet<String>, AudioBuildError> {
    let mut words = BTreeSet::new();

    for level in Level::ALL {
        let path = data_dir.join(level.output_file_name());
        if !path.exists() {
            log::debug!("level {level}: no vocabulary document at {}", path.display());
            continue;
        }
        let data = std::fs::read_to_string(&path).map_err(|source| AudioBuildError::Io {
            path: path.clone(),
            source,
        })?;
        let entries: Vec<Headword> =
            serde_json::from_str(&data).map_err(|source| AudioBuildError::Document {
                path: path.clone(),
                source,
            })?;
        words.extend(entries.into_iter().map(|e| e.kr));
    }

    Ok(words)
}

/// Split of the unique headwords into cached and pending work.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CachePlan {
    /// Words whose manifest entry points at an existing file.
    pub cached: usize,
    /// Words to synthesise, in codepoint order.
    pub pending: Vec<String>,
}

/// Partition `words` against `manifest` and the files in `audio_dir`.
pub fn plan(words: &BTreeSet<String>, manifest: &Manifest, audio_dir: &Path) -> CachePlan {
    let mut cached = 0;
    let mut pending = Vec::new();

    for word in words {
        let has_audio = manifest
            .get(word)
            .is_some_and(|file| audio_dir.join(file).exists());
        if has_audio {
            cached += 1;
        } else {
            pending.push(word.clone());
        }
    }

    CachePlan { cached, pending }
}

// ---------------------------------------------------------------------------
// AudioReport
// ---------------------------------------------------------------------------

/// Counters reported at the end of a run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AudioReport {
    pub total_unique: usize,
    pub cached: usize,
    pub pending: usize,
    pub generated: usize,
    pub errors: usize,
    pub manifest_entries: usize,
    /// Combined size of every audio file in the audio directory.
    pub total_audio_bytes: u64,
}

// ---------------------------------------------------------------------------
// AudioCacheBuilder
// ---------------------------------------------------------------------------

/// Drives one audio cache run.
///
/// ```rust,no_run
/// use std::sync::Arc;
/// use topik_prep::config::AppConfig;
/// use topik_prep::tts::{ApiSynthesizer, AudioCacheBuilder};
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let config = AppConfig::default();
/// let engine = Arc::new(ApiSynthesizer::from_config(&config.tts));
/// let report = AudioCacheBuilder::new(&config, engine).run().await?;
/// println!("{} generated, {} errors", report.generated, report.errors);
/// # Ok(())
/// # }
/// ```
pub struct AudioCacheBuilder {
    paths: PathsConfig,
    tts: TtsConfig,
    engine: Arc<dyn TtsEngine>,
}

impl AudioCacheBuilder {
    pub fn new(config: &AppConfig, engine: Arc<dyn TtsEngine>) -> Self {
        Self {
            paths: config.paths.clone(),
            tts: config.tts.clone(),
            engine,
        }
    }

    /// Generate audio for every headword that is not cached yet.
    ///
    /// The manifest is saved after each batch. When nothing is pending the
    /// manifest file is not written at all.
    pub async fn run(&self) -> Result<AudioReport, AudioBuildError> {
        let audio_dir = &self.paths.audio_dir;
        std::fs::create_dir_all(audio_dir).map_err(|source| AudioBuildError::Io {
            path: audio_dir.clone(),
            source,
        })?;

        let mut manifest = Manifest::load(self.paths.manifest_file())?;
        let words = collect_headwords(&self.paths.data_dir)?;
        let plan = plan(&words, &manifest, audio_dir);

        let mut report = AudioReport {
            total_unique: words.len(),
            cached: plan.cached,
            pending: plan.pending.len(),
            ..AudioReport::default()
        };

        log::info!("Total unique words: {}", report.total_unique);
        log::info!("Need to generate: {} files", report.pending);
        log::info!("Already cached: {} files", report.cached);

        if plan.pending.is_empty() {
            log::info!("Nothing to generate");
            report.manifest_entries = manifest.len();
            report.total_audio_bytes = audio_dir_size(audio_dir)?;
            return Ok(report);
        }

        let batch_size = self.tts.batch_size.max(1);
        let mut processed = 0;

        for batch in plan.pending.chunks(batch_size) {
            self.run_batch(batch, &mut manifest, &mut report).await;
            manifest.save()?;

            processed += batch.len();
            log::info!(
                "  Progress: {}% ({} generated, {} errors)",
                progress_percent(processed, report.pending),
                report.generated,
                report.errors
            );
        }

        report.manifest_entries = manifest.len();
        report.total_audio_bytes = audio_dir_size(audio_dir)?;

        log::info!(
            "Done! Generated {} files, {} errors",
            report.generated,
            report.errors
        );
        log::info!("Manifest entries: {}", report.manifest_entries);
        log::info!(
            "Total audio size: {:.1} MB",
            report.total_audio_bytes as f64 / 1024.0 / 1024.0
        );

        Ok(report)
    }

    /// Synthesise one batch and settle every word's manifest entry.
    ///
    /// Requests run concurrently; bookkeeping happens here once all of them
    /// have completed.
    async fn run_batch(
        &self,
        batch: &[String],
        manifest: &mut Manifest,
        report: &mut AudioReport,
    ) {
        // The index reads the manifest as it grows with each tentative entry,
        // so new words in one batch step by two: 0000, 0002, 0004.
        let mut jobs: Vec<(&str, String)> = Vec::with_capacity(batch.len());
        for word in batch {
            let filename = audio_filename(manifest.len() + jobs.len(), word);
            manifest.insert(word.as_str(), filename.clone());
            jobs.push((word.as_str(), filename));
        }

        let voice = self.tts.voice.as_str();
        let results = join_all(
            jobs.iter().map(|(word, _)| self.engine.synthesize(word, voice)),
        )
        .await;

        for ((word, filename), result) in jobs.iter().zip(results) {
            let path = self.paths.audio_dir.join(filename);
            let outcome = result
                .map_err(WordFailure::from)
                .and_then(|audio| {
                    std::fs::write(&path, audio).map_err(|source| WordFailure::Write {
                        path: path.clone(),
                        source,
                    })
                });

            match outcome {
                Ok(()) => report.generated += 1,
                Err(e) => {
                    manifest.remove(word);
                    if path.exists() {
                        let _ = std::fs::remove_file(&path);
                    }
                    report.errors += 1;
                    if report.errors <= MAX_REPORTED_ERRORS {
                        log::warn!("  Error: {word}: {e}");
                    }
                }
            }
        }
    }
}

/// `processed / total` as a whole percentage, capped at 100.
///
/// Halves round to even.
fn progress_percent(processed: usize, total: usize) -> usize {
    if total == 0 {
        return 100;
    }
    let pct = (processed as f64 / total as f64 * 100.0).round_ties_even();
    (pct as usize).min(100)
}

/// Combined size of the audio files directly inside `dir`.
fn audio_dir_size(dir: &Path) -> Result<u64, AudioBuildError> {
    let io_err = |source| AudioBuildError::Io {
        path: dir.to_path_buf(),
        source,
    };

    let mut total = 0;
    for entry in std::fs::read_dir(dir).map_err(io_err)? {
        let entry = entry.map_err(io_err)?;
        let path = entry.path();
        if path.extension().is_some_and(|ext| ext == AUDIO_EXTENSION) {
            total += entry.metadata().map_err(io_err)?.len();
        }
    }
    Ok(total)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tts::MockTtsEngine;
    use tempfile::{tempdir, TempDir};

    fn config_in(dir: &TempDir, batch_size: usize) -> AppConfig {
        let mut config = AppConfig::default();
        config.paths.data_dir = dir.path().join("data");
        config.paths.audio_dir = dir.path().join("audio").join("tts");
        config.tts.batch_size = batch_size;
        std::fs::create_dir_all(&config.paths.data_dir).unwrap();
        config
    }

    fn write_level(config: &AppConfig, level: u8, words: &[&str]) {
        let entries: Vec<serde_json::Value> = words
            .iter()
            .map(|w| {
                serde_json::json!({
                    "kr": w, "en": "", "pos": "Noun",
                    "category": "Daily", "ex_kr": "", "ex_en": ""
                })
            })
            .collect();
        let path = config.paths.data_dir.join(format!("topik{level}.json"));
        std::fs::write(path, serde_json::to_string(&entries).unwrap()).unwrap();
    }

    async fn run(config: &AppConfig, engine: &Arc<MockTtsEngine>) -> AudioReport {
        let engine: Arc<dyn TtsEngine> = engine.clone();
        AudioCacheBuilder::new(config, engine).run().await.unwrap()
    }

    fn load_manifest(config: &AppConfig) -> Manifest {
        Manifest::load(config.paths.manifest_file()).unwrap()
    }

    // --- collect_headwords / plan ---

    #[test]
    fn headwords_collapse_across_levels() {
        let dir = tempdir().unwrap();
        let config = config_in(&dir, 50);
        write_level(&config, 1, &["사람", "가다"]);
        write_level(&config, 3, &["가다", "하다"]);

        let words = collect_headwords(&config.paths.data_dir).unwrap();
        let words: Vec<&str> = words.iter().map(String::as_str).collect();
        assert_eq!(words, vec!["가다", "사람", "하다"]);
    }

    #[test]
    fn malformed_document_is_an_error() {
        let dir = tempdir().unwrap();
        let config = config_in(&dir, 50);
        std::fs::write(config.paths.data_dir.join("topik2.json"), "{not json").unwrap();

        let err = collect_headwords(&config.paths.data_dir).unwrap_err();
        assert!(matches!(err, AudioBuildError::Document { .. }));
    }

    #[test]
    fn plan_treats_missing_files_as_pending() {
        let dir = tempdir().unwrap();
        let audio_dir = dir.path().to_path_buf();
        std::fs::write(audio_dir.join("0000_efb0dbba.mp3"), b"ID3").unwrap();

        let mut manifest = Manifest::load(audio_dir.join("manifest.json")).unwrap();
        manifest.insert("가다", "0000_efb0dbba.mp3");
        manifest.insert("사람", "0001_61738cb6.mp3");

        let words: BTreeSet<String> = ["하다", "사람", "가다"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        let plan = plan(&words, &manifest, &audio_dir);

        assert_eq!(plan.cached, 1);
        assert_eq!(plan.pending, vec!["사람".to_string(), "하다".to_string()]);
    }

    // --- progress_percent ---

    #[test]
    fn progress_rounds_half_to_even_and_caps() {
        assert_eq!(progress_percent(1, 8), 12);
        assert_eq!(progress_percent(3, 8), 38);
        assert_eq!(progress_percent(50, 120), 42);
        assert_eq!(progress_percent(120, 120), 100);
        assert_eq!(progress_percent(5, 0), 100);
    }

    // --- AudioCacheBuilder::run ---

    #[tokio::test]
    async fn generates_audio_and_manifest() {
        let dir = tempdir().unwrap();
        let config = config_in(&dir, 2);
        write_level(&config, 1, &["하다", "사람", "가다"]);
        let engine = Arc::new(MockTtsEngine::ok());

        let report = run(&config, &engine).await;

        assert_eq!(report.total_unique, 3);
        assert_eq!(report.pending, 3);
        assert_eq!(report.generated, 3);
        assert_eq!(report.errors, 0);
        assert_eq!(report.manifest_entries, 3);
        assert_eq!(engine.calls(), vec!["가다", "사람", "하다"]);

        let manifest = load_manifest(&config);
        assert_eq!(manifest.get("가다"), Some("0000_efb0dbba.mp3"));
        assert_eq!(manifest.get("사람"), Some("0002_61738cb6.mp3"));
        // second batch starts from the saved manifest size
        assert_eq!(manifest.get("하다"), Some("0002_d8ff41ad.mp3"));

        let audio = std::fs::read(config.paths.audio_dir.join("0000_efb0dbba.mp3")).unwrap();
        assert_eq!(audio, "ID3가다".as_bytes());
        let expected_bytes: u64 = ["가다", "사람", "하다"]
            .iter()
            .map(|w| format!("ID3{w}").len() as u64)
            .sum();
        assert_eq!(report.total_audio_bytes, expected_bytes);
    }

    #[tokio::test]
    async fn second_run_makes_no_requests() {
        let dir = tempdir().unwrap();
        let config = config_in(&dir, 50);
        write_level(&config, 1, &["사람", "가다"]);
        write_level(&config, 2, &["가다"]);

        let first = Arc::new(MockTtsEngine::ok());
        run(&config, &first).await;
        let manifest_before = std::fs::read(config.paths.manifest_file()).unwrap();

        let second = Arc::new(MockTtsEngine::ok());
        let report = run(&config, &second).await;

        assert!(second.calls().is_empty());
        assert_eq!(report.cached, 2);
        assert_eq!(report.pending, 0);
        assert_eq!(report.generated, 0);
        assert_eq!(
            std::fs::read(config.paths.manifest_file()).unwrap(),
            manifest_before
        );
    }

    #[tokio::test]
    async fn nothing_pending_leaves_manifest_untouched() {
        let dir = tempdir().unwrap();
        let config = config_in(&dir, 50);
        let engine = Arc::new(MockTtsEngine::ok());

        let report = run(&config, &engine).await;

        assert_eq!(report.total_unique, 0);
        assert!(!config.paths.manifest_file().exists());
    }

    #[tokio::test]
    async fn failed_word_is_rolled_back() {
        let dir = tempdir().unwrap();
        let config = config_in(&dir, 50);
        write_level(&config, 1, &["사람", "가다", "하다"]);
        let engine = Arc::new(MockTtsEngine::failing_on(&["사람"]));

        let report = run(&config, &engine).await;

        assert_eq!(report.generated, 2);
        assert_eq!(report.errors, 1);
        assert_eq!(report.manifest_entries, 2);

        let manifest = load_manifest(&config);
        assert!(manifest.get("사람").is_none());
        assert!(!config.paths.audio_dir.join("0002_61738cb6.mp3").exists());
        assert_eq!(manifest.get("하다"), Some("0004_d8ff41ad.mp3"));
    }

    #[tokio::test]
    async fn indices_follow_growing_manifest_within_batch() {
        let dir = tempdir().unwrap();
        let config = config_in(&dir, 50);
        write_level(&config, 1, &["하다", "사람", "가다"]);

        run(&config, &Arc::new(MockTtsEngine::ok())).await;

        let manifest = load_manifest(&config);
        assert_eq!(manifest.get("가다"), Some("0000_efb0dbba.mp3"));
        assert_eq!(manifest.get("사람"), Some("0002_61738cb6.mp3"));
        assert_eq!(manifest.get("하다"), Some("0004_d8ff41ad.mp3"));
        for name in ["0000_efb0dbba.mp3", "0002_61738cb6.mp3", "0004_d8ff41ad.mp3"] {
            assert!(config.paths.audio_dir.join(name).exists(), "{name} missing");
        }
    }

    #[tokio::test]
    async fn every_failure_is_counted_past_the_log_cap() {
        let dir = tempdir().unwrap();
        let config = config_in(&dir, 50);
        let failing = ["가", "나", "다", "라", "마", "바", "사"];
        assert!(failing.len() > MAX_REPORTED_ERRORS);

        let mut words = failing.to_vec();
        words.push("하다");
        write_level(&config, 1, &words);
        let engine = Arc::new(MockTtsEngine::failing_on(&failing));

        let report = run(&config, &engine).await;

        assert_eq!(engine.calls().len(), failing.len() + 1);
        assert_eq!(report.errors, failing.len());
        assert_eq!(report.generated, 1);
        assert_eq!(report.manifest_entries, 1);

        let manifest = load_manifest(&config);
        assert_eq!(manifest.len(), 1);
        assert!(manifest.get("하다").is_some());
        for word in failing {
            assert!(manifest.get(word).is_none(), "{word} left in manifest");
        }

        let audio_files = std::fs::read_dir(&config.paths.audio_dir)
            .unwrap()
            .filter_map(|e| e.ok())
            .filter(|e| e.path().extension().is_some_and(|ext| ext == AUDIO_EXTENSION))
            .count();
        assert_eq!(audio_files, 1);
    }

    #[tokio::test]
    async fn failed_word_is_retried_next_run() {
        let dir = tempdir().unwrap();
        let config = config_in(&dir, 50);
        write_level(&config, 1, &["사람", "가다"]);

        run(&config, &Arc::new(MockTtsEngine::failing_on(&["사람"]))).await;

        let retry = Arc::new(MockTtsEngine::ok());
        let report = run(&config, &retry).await;

        assert_eq!(retry.calls(), vec!["사람"]);
        assert_eq!(report.generated, 1);
        let manifest = load_manifest(&config);
        assert_eq!(manifest.get("사람"), Some("0001_61738cb6.mp3"));
    }

    #[tokio::test]
    async fn deleted_audio_file_is_regenerated() {
        let dir = tempdir().unwrap();
        let config = config_in(&dir, 50);
        write_level(&config, 1, &["사람", "가다"]);
        run(&config, &Arc::new(MockTtsEngine::ok())).await;

        let manifest = load_manifest(&config);
        let stale = manifest.get("사람").unwrap().to_string();
        std::fs::remove_file(config.paths.audio_dir.join(&stale)).unwrap();

        let engine = Arc::new(MockTtsEngine::ok());
        let report = run(&config, &engine).await;

        assert_eq!(engine.calls(), vec!["사람"]);
        assert_eq!(report.cached, 1);
        assert_eq!(report.generated, 1);

        let manifest = load_manifest(&config);
        let healed = manifest.get("사람").unwrap();
        assert!(config.paths.audio_dir.join(healed).exists());
        assert_eq!(manifest.len(), 2);
    }

    #[tokio::test]
    async fn corrupt_manifest_aborts_before_synthesis() {
        let dir = tempdir().unwrap();
        let config = config_in(&dir, 50);
        write_level(&config, 1, &["사람"]);
        std::fs::create_dir_all(&config.paths.audio_dir).unwrap();
        std::fs::write(config.paths.manifest_file(), "not a manifest").unwrap();

        let engine = Arc::new(MockTtsEngine::ok());
        let dyn_engine: Arc<dyn TtsEngine> = engine.clone();
        let err = AudioCacheBuilder::new(&config, dyn_engine)
            .run()
            .await
            .unwrap_err();

        assert!(matches!(err, AudioBuildError::Manifest(ManifestError::Corrupt { .. })));
        assert!(engine.calls().is_empty());
        assert_eq!(
            std::fs::read_to_string(config.paths.manifest_file()).unwrap(),
            "not a manifest"
        );
    }

    #[tokio::test]
    async fn manifest_is_saved_after_each_batch() {
        let dir = tempdir().unwrap();
        let config = config_in(&dir, 1);
        write_level(&config, 1, &["가다", "나"]);

        // The second word fails; the first batch's save must still hold it.
        let engine = Arc::new(MockTtsEngine::failing_on(&["나"]));
        let report = run(&config, &engine).await;

        assert_eq!(report.generated, 1);
        assert_eq!(report.errors, 1);
        let manifest = load_manifest(&config);
        assert_eq!(manifest.len(), 1);
        assert_eq!(manifest.get("가다"), Some("0000_efb0dbba.mp3"));
    }
}
