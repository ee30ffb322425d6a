//! Audio manifest: which words already have audio, and under which file.
//!
//! [`Manifest`] persists a `word → filename` map as `manifest.json` in the
//! audio directory. Filenames are `{index:04}_{fingerprint}.mp3`, where the
//! fingerprint is the first eight hex digits of the MD5 of the word's UTF-8
//! bytes.

use std::collections::BTreeMap;
use std::io::Write;
use std::path::{Path, PathBuf};

use md5::{Digest, Md5};
use tempfile::NamedTempFile;
use thiserror::Error;

use crate::json::to_pretty_bytes;

/// Extension of every generated audio file.
pub const AUDIO_EXTENSION: &str = "mp3";

// ---------------------------------------------------------------------------
// ManifestError
// ---------------------------------------------------------------------------

#[derive(Debug, Error)]
pub enum ManifestError {
    #[error("failed to read manifest {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The file exists but is not a JSON object of strings. Cached work is
    /// never discarded silently; the operator has to repair or remove it.
    #[error("manifest {} is corrupt ({source}); repair or delete it to continue", path.display())]
    Corrupt {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("failed to write manifest {}: {source}", path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to serialise manifest: {0}")]
    Json(#[from] serde_json::Error),
}

// ---------------------------------------------------------------------------
// Filenames
// ---------------------------------------------------------------------------

/// First eight lowercase hex digits of the MD5 of `text`.
pub fn fingerprint(text: &str) -> String {
    let digest = Md5::digest(text.as_bytes());
    let mut hex = format!("{digest:x}");
    hex.truncate(8);
    hex
}

/// Audio filename for `text` at manifest position `index`.
///
/// ```
/// use topik_prep::tts::audio_filename;
///
/// assert_eq!(audio_filename(7, "사람"), "0007_61738cb6.mp3");
/// ```
pub fn audio_filename(index: usize, text: &str) -> String {
    format!("{index:04}_{}.{AUDIO_EXTENSION}", fingerprint(text))
}

// ---------------------------------------------------------------------------
// Manifest
// ---------------------------------------------------------------------------

/// Persisted `word → audio filename` map.
///
/// Keys are kept in codepoint order so repeated saves of the same content
/// are byte-identical.
#[derive(Debug)]
pub struct Manifest {
    entries: BTreeMap<String, String>,
    path: PathBuf,
}

impl Manifest {
    /// Load the manifest at `path`, or start empty when the file is absent.
    pub fn load(path: impl Into<PathBuf>) -> Result<Self, ManifestError> {
        let path = path.into();
        if !path.exists() {
            return Ok(Self {
                entries: BTreeMap::new(),
                path,
            });
        }

        let data = std::fs::read_to_string(&path).map_err(|source| ManifestError::Read {
            path: path.clone(),
            source,
        })?;
        let entries = serde_json::from_str(&data).map_err(|source| ManifestError::Corrupt {
            path: path.clone(),
            source,
        })?;
        Ok(Self { entries, path })
    }

    /// Write the manifest to disk.
    ///
    /// The content goes to a temporary file in the same directory which is
    /// then renamed over the old manifest, so an interrupted save leaves the
    /// previous version intact.
    pub fn save(&self) -> Result<(), ManifestError> {
        let write_err = |source| ManifestError::Write {
            path: self.path.clone(),
            source,
        };

        let dir = match self.path.parent() {
            Some(p) if !p.as_os_str().is_empty() => p,
            _ => Path::new("."),
        };
        std::fs::create_dir_all(dir).map_err(write_err)?;

        let bytes = to_pretty_bytes(&self.entries)?;
        let mut tmp = NamedTempFile::new_in(dir).map_err(write_err)?;
        tmp.write_all(&bytes).map_err(write_err)?;
        tmp.persist(&self.path).map_err(|e| write_err(e.error))?;
        Ok(())
    }

    pub fn get(&self, word: &str) -> Option<&str> {
        self.entries.get(word).map(String::as_str)
    }

    /// Register (or replace) the audio file for `word`.
    pub fn insert(&mut self, word: impl Into<String>, filename: impl Into<String>) {
        self.entries.insert(word.into(), filename.into());
    }

    /// Drop the entry for `word`, returning its filename if there was one.
    pub fn remove(&mut self, word: &str) -> Option<String> {
        self.entries.remove(word)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn fingerprint_is_md5_prefix() {
        assert_eq!(fingerprint("사람"), "61738cb6");
        assert_eq!(fingerprint("가다"), "efb0dbba");
        assert_eq!(fingerprint("가다").len(), 8);
    }

    #[test]
    fn filename_is_zero_padded() {
        assert_eq!(audio_filename(0, "나"), "0000_4b709453.mp3");
        assert_eq!(audio_filename(12345, "하다"), "12345_d8ff41ad.mp3");
    }

    #[test]
    fn missing_file_loads_empty() {
        let dir = tempdir().expect("temp dir");
        let manifest = Manifest::load(dir.path().join("manifest.json")).unwrap();
        assert!(manifest.is_empty());
    }

    #[test]
    fn corrupt_file_is_an_error() {
        let dir = tempdir().expect("temp dir");
        let path = dir.path().join("manifest.json");
        std::fs::write(&path, "{\"사람\": ").unwrap();

        let err = Manifest::load(&path).unwrap_err();
        assert!(matches!(err, ManifestError::Corrupt { .. }));
        assert!(err.to_string().contains("corrupt"));
    }

    #[test]
    fn wrong_shape_is_an_error() {
        let dir = tempdir().expect("temp dir");
        let path = dir.path().join("manifest.json");
        std::fs::write(&path, "[\"사람\"]").unwrap();

        assert!(matches!(
            Manifest::load(&path),
            Err(ManifestError::Corrupt { .. })
        ));
    }

    #[test]
    fn save_and_reload() {
        let dir = tempdir().expect("temp dir");
        let path = dir.path().join("tts").join("manifest.json");

        let mut manifest = Manifest::load(&path).unwrap();
        manifest.insert("하다", "0001_d8ff41ad.mp3");
        manifest.insert("가다", "0000_efb0dbba.mp3");
        manifest.save().unwrap();

        let text = std::fs::read_to_string(&path).unwrap();
        assert_eq!(
            text,
            "{\n \"가다\": \"0000_efb0dbba.mp3\",\n \"하다\": \"0001_d8ff41ad.mp3\"\n}"
        );

        let reloaded = Manifest::load(&path).unwrap();
        assert_eq!(reloaded.len(), 2);
        assert_eq!(reloaded.get("하다"), Some("0001_d8ff41ad.mp3"));
    }

    #[test]
    fn remove_drops_entry() {
        let dir = tempdir().expect("temp dir");
        let mut manifest = Manifest::load(dir.path().join("manifest.json")).unwrap();
        manifest.insert("나", "0000_4b709453.mp3");

        assert_eq!(manifest.remove("나").as_deref(), Some("0000_4b709453.mp3"));
        assert!(manifest.get("나").is_none());
        assert!(manifest.remove("나").is_none());
    }
}
