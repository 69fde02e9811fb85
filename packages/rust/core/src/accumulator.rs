//! Mosaic accumulation: fold one unit's output into the county-wide mosaics.
//!
//! This module is the only mutator of the two persistent mosaic feature
//! classes. The protocol per target is create-if-absent, else append with
//! schema checking disabled. Targets accumulate independently: a polygon
//! mosaic failure never blocks the line mosaic, and vice versa. Re-runs are
//! not deduplicated here; duplicate records on re-run are expected unless the
//! mosaic is reset externally or ledger skipping is enabled.

use std::path::{Path, PathBuf};

use serde::Serialize;
use tracing::{debug, info};

use parcelmosaic_engine::GeoEngine;
use parcelmosaic_pipeline::UnitOutput;
use parcelmosaic_shared::{MosaicError, MosaicNames, Result};

/// Resolved paths of the root-level mosaic container and the two mosaic
/// feature classes inside it.
#[derive(Debug, Clone)]
pub struct MosaicTargets {
    pub container: PathBuf,
    pub polygons: PathBuf,
    pub lines: PathBuf,
}

impl MosaicTargets {
    /// Resolve target paths under `root` from configured names.
    pub fn resolve(root: &Path, names: &MosaicNames) -> Self {
        let container = root.join(&names.container);
        Self {
            polygons: container.join(&names.polygons),
            lines: container.join(&names.lines),
            container,
        }
    }
}

/// How a mosaic target was written for one unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MosaicWrite {
    /// Target did not exist; the unit's class was copied verbatim and its
    /// schema becomes the mosaic's schema going forward.
    Initialized,
    /// Target existed; the unit's records were appended.
    Appended,
}

/// Per-target accumulation results for one unit.
#[derive(Debug)]
pub struct AccumulateOutcome {
    pub polygons: Result<MosaicWrite>,
    pub lines: Result<MosaicWrite>,
}

impl AccumulateOutcome {
    /// Both targets written.
    pub fn fully_succeeded(&self) -> bool {
        self.polygons.is_ok() && self.lines.is_ok()
    }

    /// At least one target written.
    pub fn any_succeeded(&self) -> bool {
        self.polygons.is_ok() || self.lines.is_ok()
    }
}

/// Fold one unit's output into both mosaics.
///
/// Never returns early between targets; each target's result is captured
/// independently in the outcome. A container-creation failure fails both.
pub fn accumulate(
    engine: &dyn GeoEngine,
    output: &UnitOutput,
    targets: &MosaicTargets,
) -> AccumulateOutcome {
    if let Err(e) = ensure_container(engine, targets) {
        let fail = |target: &Path| {
            Err(MosaicError::accumulation(
                target.display().to_string(),
                e.to_string(),
            ))
        };
        return AccumulateOutcome {
            polygons: fail(&targets.polygons),
            lines: fail(&targets.lines),
        };
    }

    AccumulateOutcome {
        polygons: write_target(engine, &output.polygons.path, &targets.polygons),
        lines: write_target(engine, &output.lines.path, &targets.lines),
    }
}

/// Create the root mosaic container if it does not exist. Idempotent: the
/// existence check gates creation, so re-runs and repeated calls are no-ops.
pub fn ensure_container(engine: &dyn GeoEngine, targets: &MosaicTargets) -> Result<()> {
    if engine.exists(&targets.container) {
        debug!(container = %targets.container.display(), "mosaic container present");
        return Ok(());
    }

    let parent = targets.container.parent().ok_or_else(|| {
        MosaicError::validation(format!(
            "mosaic container has no parent directory: {}",
            targets.container.display()
        ))
    })?;
    let name = targets
        .container
        .file_name()
        .and_then(|n| n.to_str())
        .ok_or_else(|| {
            MosaicError::validation(format!(
                "mosaic container has no valid name: {}",
                targets.container.display()
            ))
        })?;

    info!(container = %targets.container.display(), "creating mosaic container");
    engine.create_container(parent, name)
}

/// Write one unit class into one mosaic target.
fn write_target(engine: &dyn GeoEngine, src: &Path, dest: &Path) -> Result<MosaicWrite> {
    let result = if engine.exists(dest) {
        engine.append(src, dest).map(|()| MosaicWrite::Appended)
    } else {
        engine.copy_class(src, dest).map(|()| MosaicWrite::Initialized)
    };

    result.map_err(|e| MosaicError::accumulation(dest.display().to_string(), e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use parcelmosaic_engine::{AttributeFilter, CadEntity, MemoryEngine};

    fn names() -> MosaicNames {
        MosaicNames {
            container: "ParcelMosaic.gdb".into(),
            polygons: "Parcels".into(),
            lines: "ParcelLines".into(),
        }
    }

    /// Produce a unit output with the given polygon/line record counts.
    fn unit_output(engine: &MemoryEngine, tag: &str, polygons: usize, lines: usize) -> UnitOutput {
        let source = PathBuf::from(format!("/maps/{tag}/{tag}.DWG"));
        let mut entities = Vec::new();
        for i in 0..polygons {
            entities.push(CadEntity::point("PARCEL_ID").attr("PIN", &format!("{tag}-{i}")));
        }
        for _ in 0..lines {
            entities.push(CadEntity::polyline("PARCELS"));
        }
        engine.seed_cad_source(&source, entities);

        let container = PathBuf::from(format!("/maps/{tag}/{tag}.gdb"));
        let ds = engine
            .import_cad(&source, &container, "conversion", "frame", 1000)
            .unwrap();

        let line_dest = ds.class("Line_PARCELS").path;
        let view = engine
            .filter_by_attribute(&ds.polyline_class(), &AttributeFilter::layer("PARCELS"))
            .unwrap();
        let line_class = engine.copy_features(&view, &line_dest).unwrap();
        engine.release_view(view);

        let poly_class = engine
            .build_polygons(
                &ds.polyline_class(),
                &ds.point_class(),
                &ds.class("Poly_PARCELS").path,
            )
            .unwrap();

        UnitOutput {
            polygons: poly_class,
            lines: line_class,
        }
    }

    #[test]
    fn first_unit_initializes_second_appends() {
        let engine = MemoryEngine::new();
        let targets = MosaicTargets::resolve(Path::new("/root"), &names());

        let first = unit_output(&engine, "A", 5, 7);
        let outcome = accumulate(&engine, &first, &targets);
        assert_eq!(outcome.polygons.unwrap(), MosaicWrite::Initialized);
        assert_eq!(outcome.lines.unwrap(), MosaicWrite::Initialized);
        assert_eq!(engine.record_count(&targets.polygons), Some(5));

        let second = unit_output(&engine, "B", 3, 2);
        let outcome = accumulate(&engine, &second, &targets);
        assert_eq!(outcome.polygons.unwrap(), MosaicWrite::Appended);
        assert_eq!(outcome.lines.unwrap(), MosaicWrite::Appended);
        assert_eq!(engine.record_count(&targets.polygons), Some(8));
        assert_eq!(engine.record_count(&targets.lines), Some(9));
    }

    #[test]
    fn container_creation_is_idempotent() {
        let engine = MemoryEngine::new();
        let targets = MosaicTargets::resolve(Path::new("/root"), &names());

        ensure_container(&engine, &targets).expect("first create");
        // Seed a class inside, then ensure again: the existing container must
        // be left alone, not re-created.
        let output = unit_output(&engine, "A", 2, 2);
        accumulate(&engine, &output, &targets);
        ensure_container(&engine, &targets).expect("second call is a no-op");
        assert_eq!(engine.record_count(&targets.polygons), Some(2));
    }

    #[test]
    fn one_target_failing_leaves_the_other_independent() {
        let engine = MemoryEngine::new();
        let targets = MosaicTargets::resolve(Path::new("/root"), &names());

        let first = unit_output(&engine, "A", 4, 4);
        accumulate(&engine, &first, &targets);

        engine.fail_append_to(&targets.polygons);
        let second = unit_output(&engine, "B", 3, 3);
        let outcome = accumulate(&engine, &second, &targets);

        assert!(outcome.polygons.is_err());
        assert_eq!(*outcome.lines.as_ref().unwrap(), MosaicWrite::Appended);
        assert!(outcome.any_succeeded());
        assert!(!outcome.fully_succeeded());

        // Polygon mosaic untouched by the failed append; line mosaic grew.
        assert_eq!(engine.record_count(&targets.polygons), Some(4));
        assert_eq!(engine.record_count(&targets.lines), Some(7));
    }

    #[test]
    fn resolve_places_classes_inside_container() {
        let targets = MosaicTargets::resolve(Path::new("/data/county"), &names());
        assert_eq!(
            targets.container,
            PathBuf::from("/data/county/ParcelMosaic.gdb")
        );
        assert_eq!(
            targets.polygons,
            PathBuf::from("/data/county/ParcelMosaic.gdb/Parcels")
        );
        assert_eq!(
            targets.lines,
            PathBuf::from("/data/county/ParcelMosaic.gdb/ParcelLines")
        );
    }
}
