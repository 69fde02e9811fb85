//! Core domain types for ParcelMosaic batch runs.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::naming;

// ---------------------------------------------------------------------------
// RunId
// ---------------------------------------------------------------------------

/// A UUID v7 wrapper for batch run identifiers (time-sortable).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RunId(pub Uuid);

impl RunId {
    /// Generate a new time-sortable run identifier.
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }
}

impl Default for RunId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for RunId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for RunId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Ok(Self(Uuid::parse_str(s)?))
    }
}

// ---------------------------------------------------------------------------
// MapUnit
// ---------------------------------------------------------------------------

/// One unit of work: a map directory under a subdivision, owning exactly one
/// CAD source whose base name equals the directory name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MapUnit {
    /// Name of the subdivision directory this unit lives under.
    pub subdivision: String,
    /// Map unit name (the directory name, and the CAD source base name).
    pub name: String,
    /// Full path to the map unit directory.
    pub dir: PathBuf,
}

impl MapUnit {
    /// Path to the unit's CAD source drawing (`<dir>/<name>.DWG`).
    pub fn cad_source_path(&self) -> PathBuf {
        self.dir.join(naming::cad_source_name(&self.name))
    }

    /// Path to the unit's conversion container (`<dir>/<name>.gdb`),
    /// persisted alongside the source.
    pub fn container_path(&self) -> PathBuf {
        self.dir.join(naming::container_name(&self.name))
    }

    /// Stable `subdivision/name` key used by reports and the ledger.
    pub fn key(&self) -> String {
        format!("{}/{}", self.subdivision, self.name)
    }
}

impl std::fmt::Display for MapUnit {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.subdivision, self.name)
    }
}
