//! CSV → JSON conversion of the per-level vocabulary tables.
//!
//! # Flow (per level)
//!
//! ```text
//! TOPIK{N}_{Topic}.csv ──load_category_mapping──┐
//!                                               ▼
//! TOPIK_VOCAB - TOPIK {N}급.csv ──normalize_records──▶ sorted Vec<VocabEntry>
//!                                               │
//!                                               ▼
//!                                   {data_dir}/topik{N}.json
//! ```
//!
//! [`normalize_records`] is pure; [`convert_level`] adds the file I/O and
//! [`convert_all`] runs every level, containing per-level failures.

use std::collections::HashSet;
use std::path::Path;

use crate::config::AppConfig;
use crate::json::to_pretty_bytes;

use super::category::{classify_by_pos, load_category_mapping, open_table, CategoryMapping};
use super::clean::clean_word;
use super::{ConvertError, Level, VocabEntry};

/// Rows with fewer fields than this are skipped.
const MIN_FIELDS: usize = 5;

// ---------------------------------------------------------------------------
// Pure core
// ---------------------------------------------------------------------------

/// Normalise the data rows of a level table (header already removed).
///
/// Column layout: headword, word class, English gloss, Korean example,
/// English translation. Extra columns are ignored.
///
/// * Rows with fewer than five fields are skipped.
/// * The headword is cleaned with [`clean_word`]; empty results are skipped.
/// * The first row for a cleaned headword wins; later rows for the same
///   headword are discarded entirely.
/// * The category is the topic from `mapping`, else [`classify_by_pos`].
/// * The result is sorted by headword in codepoint order.
pub fn normalize_records<I, R, S>(rows: I, mapping: &CategoryMapping) -> Vec<VocabEntry>
where
    I: IntoIterator<Item = R>,
    R: AsRef<[S]>,
    S: AsRef<str>,
{
    let mut seen: HashSet<String> = HashSet::new();
    let mut entries = Vec::new();

    for row in rows {
        let row = row.as_ref();
        if row.len() < MIN_FIELDS {
            continue;
        }
        let field = |i: usize| row[i].as_ref().trim().to_string();

        let kr = clean_word(row[0].as_ref());
        if kr.is_empty() || seen.contains(&kr) {
            continue;
        }
        seen.insert(kr.clone());

        let pos = field(1);
        let category = match mapping.get(&kr) {
            Some(topic) => topic.clone(),
            None => classify_by_pos(&pos).to_string(),
        };

        entries.push(VocabEntry {
            en: field(2),
            ex_kr: field(3),
            ex_en: field(4),
            kr,
            pos,
            category,
        });
    }

    // `str` ordering is UTF-8 byte order, which equals codepoint order.
    entries.sort_by(|a, b| a.kr.cmp(&b.kr));
    entries
}

// ---------------------------------------------------------------------------
// File I/O
// ---------------------------------------------------------------------------

/// Read a level's main table, skipping the header row.
fn read_level_rows(path: &Path) -> Result<Vec<Vec<String>>, ConvertError> {
    let mut reader = open_table(path)?;
    let mut rows = Vec::new();
    for record in reader.records().skip(1) {
        let record = record.map_err(|source| ConvertError::Csv {
            path: path.to_path_buf(),
            source,
        })?;
        rows.push(record.iter().map(str::to_owned).collect());
    }
    Ok(rows)
}

/// Convert one level and write `{data_dir}/topik{N}.json`.
///
/// Returns the number of entries written.
///
/// # Errors
///
/// - [`ConvertError::MissingSource`] — the main table for `level` is absent;
///   no output file is written.
/// - [`ConvertError::Csv`] — a present table could not be parsed.
/// - [`ConvertError::Io`] — the output could not be written.
pub fn convert_level(config: &AppConfig, level: Level) -> Result<usize, ConvertError> {
    let source_root = &config.paths.source_root;
    let source = source_root.join(level.source_file_name());
    if !source.exists() {
        return Err(ConvertError::MissingSource {
            level,
            path: source,
        });
    }

    let mapping = load_category_mapping(source_root, level)?;
    log::debug!("level {level}: {} words mapped to topics", mapping.len());

    let rows = read_level_rows(&source)?;
    let entries = normalize_records(&rows, &mapping);

    let data_dir = &config.paths.data_dir;
    std::fs::create_dir_all(data_dir).map_err(|source| ConvertError::Io {
        path: data_dir.clone(),
        source,
    })?;

    let out_path = data_dir.join(level.output_file_name());
    let bytes = to_pretty_bytes(&entries)?;
    std::fs::write(&out_path, bytes).map_err(|source| ConvertError::Io {
        path: out_path.clone(),
        source,
    })?;

    Ok(entries.len())
}

// ---------------------------------------------------------------------------
// ConvertReport
// ---------------------------------------------------------------------------

/// Outcome of [`convert_all`]: one result per level, in level order.
#[derive(Debug)]
pub struct ConvertReport {
    pub levels: Vec<(Level, Result<usize, ConvertError>)>,
}

impl ConvertReport {
    /// Total entries written across all successful levels.
    pub fn total(&self) -> usize {
        self.levels
            .iter()
            .filter_map(|(_, r)| r.as_ref().ok())
            .sum()
    }

    /// Levels whose conversion failed, with the reason.
    pub fn failures(&self) -> impl Iterator<Item = (Level, &ConvertError)> + '_ {
        self.levels
            .iter()
            .filter_map(|(level, r)| r.as_ref().err().map(|e| (*level, e)))
    }

    pub fn is_success(&self) -> bool {
        self.failures().next().is_none()
    }
}

/// Convert every level, logging per-level counts and the aggregate total.
///
/// A failing level is reported and skipped; the remaining levels still run.
pub fn convert_all(config: &AppConfig) -> ConvertReport {
    log::info!("=== TOPIK CSV → JSON conversion ===");

    let mut levels = Vec::with_capacity(Level::ALL.len());
    for level in Level::ALL {
        let result = convert_level(config, level);
        match &result {
            Ok(count) => log::info!(
                "Level {level}: {count} words → {}",
                config.paths.data_dir.join(level.output_file_name()).display()
            ),
            Err(e) => log::error!("Level {level}: conversion failed: {e}"),
        }
        levels.push((level, result));
    }

    let report = ConvertReport { levels };
    log::info!("Total: {} words converted", report.total());
    report
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
