//! Application settings structs, defaults and TOML persistence.
//!
//! All structs implement `Serialize`, `Deserialize`, `Default` and `Clone`
//! so they can be round-tripped through TOML files and handed to each
//! pipeline entry point.

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// PathsConfig
// ---------------------------------------------------------------------------

/// Where the pipelines read their inputs and write their artifacts.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PathsConfig {
    /// Directory holding the raw TOPIK CSV tables (main level tables and
    /// per-topic category tables).
    pub source_root: PathBuf,
    /// Output directory for `topik{N}.json`; also the input of the audio
    /// cache builder.
    pub data_dir: PathBuf,
    /// Directory holding generated audio files and `manifest.json`.
    pub audio_dir: PathBuf,
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            source_root: PathBuf::from("TOPIK_Vocabulary"),
            data_dir: PathBuf::from("data"),
            audio_dir: PathBuf::from("audio").join("tts"),
        }
    }
}

impl PathsConfig {
    /// Full path to the audio manifest.
    pub fn manifest_file(&self) -> PathBuf {
        self.audio_dir.join("manifest.json")
    }
}

// ---------------------------------------------------------------------------
// TtsConfig
// ---------------------------------------------------------------------------

/// Settings for the text-to-speech service used by the audio cache builder.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TtsConfig {
    /// Voice identity sent with every synthesis request.
    pub voice: String,
    /// Words synthesised per batch; the manifest is saved after each batch.
    pub batch_size: usize,
    /// Base URL of an OpenAI-compatible speech endpoint.
    ///
    /// - edge-tts proxy default: `http://localhost:5050`
    /// - OpenAI: `https://api.openai.com`
    pub base_url: String,
    /// API key — `None` for local proxies that need no authentication.
    pub api_key: Option<String>,
    /// Model identifier sent to the API.
    pub model: String,
    /// Maximum seconds to wait for a single synthesis response.
    pub timeout_secs: u64,
}

impl Default for TtsConfig {
    fn default() -> Self {
        Self {
            voice: "ko-KR-SunHiNeural".into(),
            batch_size: 50,
            base_url: "http://localhost:5050".into(),
            api_key: None,
            model: "tts-1".into(),
            timeout_secs: 30,
        }
    }
}

// ---------------------------------------------------------------------------
// AppConfig  (top-level)
// ---------------------------------------------------------------------------

/// Top-level configuration, serialised as `settings.toml`.
///
/// ```rust,no_run
/// use std::path::Path;
/// use topik_prep::config::AppConfig;
///
/// // Load (returns Default when file is missing)
/// let config = AppConfig::load_from(Path::new("settings.toml")).unwrap();
/// assert!(config.tts.batch_size > 0);
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Input and output locations.
    pub paths: PathsConfig,
    /// Text-to-speech settings.
    pub tts: TtsConfig,
}

impl AppConfig {
    /// Load configuration from `path`, usually
    /// [`AppPaths::settings_file`](super::AppPaths).
    ///
    /// Returns `Ok(AppConfig::default())` when the file does not exist yet.
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("reading {}", path.display()))?;
        let config: Self =
            toml::from_str(&content).with_context(|| format!("parsing {}", path.display()))?;
        Ok(config)
    }

    /// Save configuration to `path`, creating parent directories as needed.
    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Reject settings the pipelines cannot run with.
    pub fn validate(&self) -> Result<()> {
        if self.tts.batch_size == 0 {
            bail!("tts.batch_size must be at least 1");
        }
        if self.tts.voice.trim().is_empty() {
            bail!("tts.voice must not be empty");
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
