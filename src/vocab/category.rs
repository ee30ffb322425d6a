//! Topic assignment for vocabulary words.
//!
//! Two sources, in priority order:
//!
//! 1. [`load_category_mapping`] — optional per-topic CSV tables
//!    (`TOPIK{N}_{Topic}.csv`) listing the words of each topic.
//! 2. [`classify_by_pos`] — a part-of-speech fallback used when a word is not
//!    listed in any topic table for its level.

use std::collections::HashMap;
use std::path::Path;

use csv::StringRecord;

use super::{ConvertError, Level};

/// Cleaned Korean word → topic label, for one level.
pub type CategoryMapping = HashMap<String, String>;

/// Topic tables in load order; later topics win when a word is listed twice.
pub const TOPICS: [&str; 13] = [
    "Food",
    "Actions",
    "People",
    "Places",
    "Nature",
    "Describe",
    "Transport",
    "Daily",
    "Numbers",
    "Connect",
    "Emotions",
    "Body",
    "Time",
];

/// Word column used when no header cell mentions `Korean`.
const FALLBACK_WORD_COLUMN: usize = 2;

/// Catch-all bucket for word classes the fallback does not recognise.
pub const OTHER_CATEGORY: &str = "Other";

// ---------------------------------------------------------------------------
// Category tables
// ---------------------------------------------------------------------------

/// Build the word → topic mapping for `level` from the topic tables under
/// `source_root`.
///
/// Absent topic tables are skipped. A table that exists but cannot be parsed
/// is an error.
pub fn load_category_mapping(
    source_root: &Path,
    level: Level,
) -> Result<CategoryMapping, ConvertError> {
    let mut mapping = CategoryMapping::new();

    for topic in TOPICS {
        let path = source_root.join(level.topic_file_name(topic));
        if !path.exists() {
            log::debug!("level {level}: no {topic} table at {}", path.display());
            continue;
        }

        let mut reader = open_table(&path)?;
        let mut records = reader.records();

        let header = match records.next() {
            Some(record) => record.map_err(|source| ConvertError::Csv {
                path: path.clone(),
                source,
            })?,
            None => continue,
        };
        let column = word_column(&header);

        let before = mapping.len();
        for record in records {
            let record = record.map_err(|source| ConvertError::Csv {
                path: path.clone(),
                source,
            })?;
            let Some(cell) = record.get(column) else {
                continue;
            };
            let word = cell.trim();
            if !word.is_empty() {
                mapping.insert(word.to_string(), topic.to_string());
            }
        }
        log::debug!(
            "level {level}: {topic} table added {} new words",
            mapping.len() - before
        );
    }

    Ok(mapping)
}

/// Open a headerless, ragged-row CSV reader; header handling is up to the
/// caller.
pub(crate) fn open_table(path: &Path) -> Result<csv::Reader<std::fs::File>, ConvertError> {
    csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_path(path)
        .map_err(|source| ConvertError::Csv {
            path: path.to_path_buf(),
            source,
        })
}

/// Index of the first header cell containing `Korean`, else the fallback.
fn word_column(header: &StringRecord) -> usize {
    header
        .iter()
        .position(|h| h.contains("Korean"))
        .unwrap_or(FALLBACK_WORD_COLUMN)
}

// ---------------------------------------------------------------------------
// Part-of-speech fallback
// ---------------------------------------------------------------------------

/// Classify a word by its word class.
///
/// Checks run in a fixed order, so `"verb, noun"` is an action.
///
/// | Contains    | Category   |
/// |-------------|------------|
/// | `verb`      | `Actions`  |
/// | `adjective` | `Describe` |
/// | `adverb`    | `Connect`  |
/// | `noun`      | `Daily`    |
/// | otherwise   | `Other`    |
pub fn classify_by_pos(word_class: &str) -> &'static str {
    let wc = word_class.to_lowercase();
    if wc.contains("verb") {
        "Actions"
    } else if wc.contains("adjective") {
        "Describe"
    } else if wc.contains("adverb") {
        "Connect"
    } else if wc.contains("noun") {
        "Daily"
    } else {
        OTHER_CATEGORY
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
