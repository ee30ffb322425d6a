//! Command-line entry point — TOPIK data preparation.
//!
//! # Subcommands
//!
//! * `convert` — CSV tables → `topik{N}.json` for every level.
//! * `audio`   — pre-generate pronunciation audio for every headword.
//! * `all`     — `convert`, then `audio`.
//! * `init`    — write the default `settings.toml`.
//!
//! # Startup sequence
//!
//! 1. Initialise logging (`RUST_LOG` overrides the `info` default).
//! 2. Load [`AppConfig`] from `--config` or the platform config dir.
//! 3. Apply command-line overrides and validate.
//! 4. Run the selected pipeline; the audio pipeline gets a tokio runtime.

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use topik_prep::{
    config::{AppConfig, AppPaths},
    tts::{ApiSynthesizer, AudioCacheBuilder, TtsEngine},
    vocab::convert_all,
};

// ---------------------------------------------------------------------------
// CLI
// ---------------------------------------------------------------------------

/// Prepares TOPIK vocabulary data and audio for the web app.
#[derive(Parser, Debug)]
#[command(name = "topik-prep")]
#[command(version, about, long_about = None)]
struct Cli {
    /// Settings file (defaults to the platform config directory)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(flatten)]
    overrides: Overrides,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Convert the TOPIK CSV tables to JSON
    Convert,
    /// Generate missing TTS audio for all converted levels
    Audio,
    /// Convert, then generate audio
    All,
    /// Write the default settings file
    Init {
        /// Overwrite an existing settings file
        #[arg(short, long)]
        force: bool,
    },
}

/// Per-run overrides of settings-file values.
#[derive(Args, Debug, Default)]
struct Overrides {
    /// Directory holding the TOPIK CSV tables
    #[arg(long, global = true)]
    source_root: Option<PathBuf>,

    /// Output directory for topik{N}.json
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    /// Directory for audio files and manifest.json
    #[arg(long, global = true)]
    audio_dir: Option<PathBuf>,

    /// TTS voice identity
    #[arg(long, global = true)]
    voice: Option<String>,

    /// Words synthesised per batch
    #[arg(long, global = true)]
    batch_size: Option<usize>,

    /// Base URL of the OpenAI-compatible speech endpoint
    #[arg(long, global = true, env = "TOPIK_TTS_URL")]
    tts_url: Option<String>,

    /// API key for the speech endpoint
    #[arg(long, global = true, env = "TOPIK_TTS_API_KEY", hide_env_values = true)]
    tts_api_key: Option<String>,
}

impl Overrides {
    fn apply(self, config: &mut AppConfig) {
        if let Some(v) = self.source_root {
            config.paths.source_root = v;
        }
        if let Some(v) = self.data_dir {
            config.paths.data_dir = v;
        }
        if let Some(v) = self.audio_dir {
            config.paths.audio_dir = v;
        }
        if let Some(v) = self.voice {
            config.tts.voice = v;
        }
        if let Some(v) = self.batch_size {
            config.tts.batch_size = v;
        }
        if let Some(v) = self.tts_url {
            config.tts.base_url = v;
        }
        if let Some(v) = self.tts_api_key {
            config.tts.api_key = Some(v);
        }
    }
}

// ---------------------------------------------------------------------------
// Pipelines
// ---------------------------------------------------------------------------

/// Returns `false` when any level failed to convert.
fn run_convert(config: &AppConfig) -> bool {
    let report = convert_all(config);
    for (level, err) in report.failures() {
        log::error!("Level {level} was not converted: {err}");
    }
    report.is_success()
}

fn run_audio(config: &AppConfig) -> Result<()> {
    let rt = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("failed to create tokio runtime")?;

    let engine: Arc<dyn TtsEngine> = Arc::new(ApiSynthesizer::from_config(&config.tts));
    log::info!(
        "Synthesising with voice {} via {}",
        config.tts.voice,
        config.tts.base_url
    );

    rt.block_on(AudioCacheBuilder::new(config, engine).run())?;
    Ok(())
}

fn run(cli: Cli) -> Result<bool> {
    let settings_file = cli
        .config
        .unwrap_or_else(|| AppPaths::new().settings_file);

    if let Command::Init { force } = cli.command {
        if settings_file.exists() && !force {
            bail!(
                "{} already exists (use --force to overwrite)",
                settings_file.display()
            );
        }
        let mut config = AppConfig::default();
        cli.overrides.apply(&mut config);
        config.save_to(&settings_file)?;
        log::info!("Wrote {}", settings_file.display());
        return Ok(true);
    }

    let mut config = AppConfig::load_from(&settings_file)?;
    cli.overrides.apply(&mut config);
    config.validate()?;

    match cli.command {
        Command::Convert => Ok(run_convert(&config)),
        Command::Audio => run_audio(&config).map(|()| true),
        Command::All => {
            let converted = run_convert(&config);
            run_audio(&config)?;
            Ok(converted)
        }
        Command::Init { .. } => Ok(true),
    }
}

// ---------------------------------------------------------------------------
// main
// ---------------------------------------------------------------------------

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();
    match run(cli) {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(e) => {
            log::error!("{e:#}");
            ExitCode::FAILURE
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
