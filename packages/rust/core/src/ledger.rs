//! Processed-units ledger (opt-in).
//!
//! The mosaic append protocol has no transactional wrapping, so re-running a
//! batch duplicates records. When enabled, this ledger records each fully
//! accumulated unit in a JSON file under the root; a later run skips units
//! already recorded. A unit with a partial accumulation is deliberately not
//! recorded, so it is retried (and its successful target duplicated) on the
//! next run.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use parcelmosaic_shared::{MosaicError, Result, RunId};

/// One fully accumulated unit.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LedgerEntry {
    /// `subdivision/name` key of the unit.
    pub unit: String,
    /// Run that accumulated it.
    pub run_id: RunId,
    /// When accumulation completed.
    pub accumulated_at: DateTime<Utc>,
}

/// On-disk shape of the ledger file.
#[derive(Debug, Default, Serialize, Deserialize)]
struct LedgerFile {
    entries: Vec<LedgerEntry>,
}

/// The processed-units ledger, held in memory and rewritten on each record.
#[derive(Debug)]
pub struct Ledger {
    path: PathBuf,
    entries: Vec<LedgerEntry>,
    keys: HashSet<String>,
}

impl Ledger {
    /// Load the ledger at `path`, or start empty if the file does not exist.
    /// A malformed ledger is a validation error: silently ignoring it would
    /// turn re-run protection off without notice.
    pub fn load(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();

        let file: LedgerFile = if path.exists() {
            let content =
                std::fs::read_to_string(&path).map_err(|e| MosaicError::io(&path, e))?;
            serde_json::from_str(&content).map_err(|e| {
                MosaicError::validation(format!(
                    "malformed ledger at {}: {e}",
                    path.display()
                ))
            })?
        } else {
            debug!(path = %path.display(), "no ledger file, starting empty");
            LedgerFile::default()
        };

        let keys = file.entries.iter().map(|e| e.unit.clone()).collect();
        Ok(Self {
            path,
            entries: file.entries,
            keys,
        })
    }

    /// Whether `unit_key` was already accumulated.
    pub fn contains(&self, unit_key: &str) -> bool {
        self.keys.contains(unit_key)
    }

    /// Number of recorded units.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Record a unit and rewrite the ledger file.
    pub fn record(&mut self, entry: LedgerEntry) -> Result<()> {
        info!(unit = %entry.unit, "recording unit in ledger");
        self.keys.insert(entry.unit.clone());
        self.entries.push(entry);
        self.save()
    }

    fn save(&self) -> Result<()> {
        let file = LedgerFile {
            entries: self.entries.clone(),
        };
        let content = serde_json::to_string_pretty(&file)
            .map_err(|e| MosaicError::validation(format!("ledger serialization: {e}")))?;
        std::fs::write(&self.path, content).map_err(|e| MosaicError::io(&self.path, e))
    }

    /// Path of the backing file.
    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(unit: &str) -> LedgerEntry {
        LedgerEntry {
            unit: unit.into(),
            run_id: RunId::new(),
            accumulated_at: Utc::now(),
        }
    }

    #[test]
    fn missing_file_starts_empty() {
        let dir = tempfile::tempdir().unwrap();
        let ledger = Ledger::load(dir.path().join("processed_units.json")).expect("load");
        assert!(ledger.is_empty());
        assert!(!ledger.contains("T5S_R10E/T5S_R10E_01"));
    }

    #[test]
    fn record_persists_across_loads() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("processed_units.json");

        let mut ledger = Ledger::load(&path).unwrap();
        ledger.record(entry("T5S_R10E/T5S_R10E_01")).expect("record");
        ledger.record(entry("T5S_R10E/T5S_R10E_02")).expect("record");

        let reloaded = Ledger::load(&path).expect("reload");
        assert_eq!(reloaded.len(), 2);
        assert!(reloaded.contains("T5S_R10E/T5S_R10E_01"));
        assert!(!reloaded.contains("T6S_R10E/T6S_R10E_01"));
    }

    #[test]
    fn malformed_ledger_is_a_validation_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("processed_units.json");
        std::fs::write(&path, b"not json").unwrap();

        let err = Ledger::load(&path).unwrap_err();
        assert!(matches!(err, MosaicError::Validation { .. }));
    }
}
