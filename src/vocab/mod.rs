//! TOPIK vocabulary normalisation.
//!
//! This module provides:
//! * [`VocabEntry`] — one normalised vocabulary item, as written to `topik{N}.json`.
//! * [`Level`] — a TOPIK proficiency level and its file-naming conventions.
//! * [`clean_word`] — strips homograph subscript markers from headwords.
//! * [`load_category_mapping`] / [`classify_by_pos`] — topic assignment.
//! * [`convert_level`] / [`convert_all`] — CSV → JSON conversion.
//! * [`ConvertError`] — error variants for the conversion.
//!
//! # Quick start
//!
//! ```rust,no_run
//! use topik_prep::config::AppConfig;
//! use topik_prep::vocab::convert_all;
//!
//! let config = AppConfig::default();
//! let report = convert_all(&config);
//! println!("{} words converted", report.total());
//! ```

pub mod category;
pub mod clean;
pub mod normalizer;

use std::fmt;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use thiserror::Error;

// ---------------------------------------------------------------------------
// Public re-exports
// ---------------------------------------------------------------------------

pub use category::{classify_by_pos, load_category_mapping, CategoryMapping, TOPICS};
pub use clean::clean_word;
pub use normalizer::{convert_all, convert_level, normalize_records, ConvertReport};

// ---------------------------------------------------------------------------
// VocabEntry
// ---------------------------------------------------------------------------

/// A single normalised vocabulary item.
///
/// Field order is the serialised key order of `topik{N}.json`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VocabEntry {
    /// Cleaned Korean headword; unique within a level.
    pub kr: String,
    /// English gloss.
    pub en: String,
    /// Word class / part of speech as given in the source table.
    pub pos: String,
    /// Topic label, or the part-of-speech fallback bucket.
    pub category: String,
    /// Korean example sentence.
    pub ex_kr: String,
    /// English translation of the example sentence.
    pub ex_en: String,
}

// ---------------------------------------------------------------------------
// Level
// ---------------------------------------------------------------------------

/// A TOPIK proficiency level (1 through 6).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Level(u8);

impl Level {
    /// Every known level, in processing order.
    pub const ALL: [Level; 6] = [Level(1), Level(2), Level(3), Level(4), Level(5), Level(6)];

    /// Returns `None` for numbers outside 1..=6.
    pub fn new(n: u8) -> Option<Self> {
        (1..=6).contains(&n).then_some(Self(n))
    }

    pub fn number(self) -> u8 {
        self.0
    }

    /// Main vocabulary table, e.g. `TOPIK_VOCAB - TOPIK 1급.csv`.
    pub fn source_file_name(self) -> String {
        format!("TOPIK_VOCAB - TOPIK {}급.csv", self.0)
    }

    /// Per-topic category table, e.g. `TOPIK1_Food.csv`.
    pub fn topic_file_name(self, topic: &str) -> String {
        format!("TOPIK{}_{}.csv", self.0, topic)
    }

    /// Normalised output document, e.g. `topik1.json`.
    pub fn output_file_name(self) -> String {
        format!("topik{}.json", self.0)
    }
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ---------------------------------------------------------------------------
// ConvertError
// ---------------------------------------------------------------------------

/// Errors that abort the conversion of a single level.
#[derive(Debug, Error)]
pub enum ConvertError {
    /// The main vocabulary table for the level does not exist.
    #[error("level {level}: source table not found: {}", path.display())]
    MissingSource { level: Level, path: PathBuf },

    /// A present CSV table could not be read or decoded.
    #[error("failed to read {}: {source}", path.display())]
    Csv {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },

    /// Creating the output directory or writing the JSON document failed.
    #[error("failed to write {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to serialise vocabulary: {0}")]
    Json(#[from] serde_json::Error),
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
