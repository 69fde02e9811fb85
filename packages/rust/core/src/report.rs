//! Run reporting: the batch's primary observable output besides the mosaics.

use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::Serialize;

use parcelmosaic_pipeline::LayerReport;
use parcelmosaic_shared::{MosaicError, Result, RunId};

use crate::accumulator::MosaicWrite;

/// Outcome of writing one mosaic target for one unit.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "snake_case", tag = "result")]
pub enum WriteStatus {
    Initialized,
    Appended,
    Failed { error: String },
}

impl From<&Result<MosaicWrite>> for WriteStatus {
    fn from(result: &Result<MosaicWrite>) -> Self {
        match result {
            Ok(MosaicWrite::Initialized) => Self::Initialized,
            Ok(MosaicWrite::Appended) => Self::Appended,
            Err(e) => Self::Failed {
                error: e.to_string(),
            },
        }
    }
}

/// Terminal state of one map unit.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum UnitStatus {
    /// Converted and folded into the mosaics. Partial if one target failed.
    Accumulated {
        polygons: WriteStatus,
        lines: WriteStatus,
    },
    /// Contributed nothing to either mosaic (no boundary lines, or already
    /// recorded in the ledger).
    Skipped { reason: String },
    /// Pipeline failed for this unit, or both mosaic targets failed.
    Failed { error: String },
}

impl UnitStatus {
    pub fn failed(err: &MosaicError) -> Self {
        Self::Failed {
            error: err.to_string(),
        }
    }

    /// Short label for log lines and summary tables.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Accumulated { .. } => "accumulated",
            Self::Skipped { .. } => "skipped",
            Self::Failed { .. } => "failed",
        }
    }
}

/// Per-unit entry of the run report.
#[derive(Debug, Clone, Serialize)]
pub struct UnitReport {
    /// `subdivision/name` key of the unit.
    pub unit: String,
    /// Terminal state.
    pub status: UnitStatus,
    /// One entry per configured layer request (empty for ledger skips and
    /// import failures).
    pub layers: Vec<LayerReport>,
}

/// Full report for one batch run.
#[derive(Debug, Serialize)]
pub struct RunReport {
    pub run_id: RunId,
    pub root: PathBuf,
    pub started_at: DateTime<Utc>,
    pub elapsed_ms: u64,
    pub accumulated: usize,
    pub skipped: usize,
    pub failed: usize,
    pub units: Vec<UnitReport>,
}

impl RunReport {
    pub fn new(run_id: RunId, root: PathBuf, started_at: DateTime<Utc>) -> Self {
        Self {
            run_id,
            root,
            started_at,
            elapsed_ms: 0,
            accumulated: 0,
            skipped: 0,
            failed: 0,
            units: Vec::new(),
        }
    }

    /// Record one unit's report and update the aggregate counters.
    pub fn push(&mut self, unit: UnitReport) {
        match unit.status {
            UnitStatus::Accumulated { .. } => self.accumulated += 1,
            UnitStatus::Skipped { .. } => self.skipped += 1,
            UnitStatus::Failed { .. } => self.failed += 1,
        }
        self.units.push(unit);
    }

    /// Whether every unit accumulated fully (no failures, no skips).
    pub fn is_clean(&self) -> bool {
        self.skipped == 0 && self.failed == 0
    }
}
