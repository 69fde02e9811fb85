//! Batch run orchestration: discovery → (convert → accumulate) per unit.
//!
//! Units are processed strictly one at a time, each fully accumulated before
//! the next begins, which keeps mosaic mutation single-writer. Any per-unit
//! or per-layer failure is recorded and the batch continues; only a
//! discovery failure aborts the run.

use std::time::Instant;

use chrono::Utc;
use tracing::{info, instrument, warn};

use parcelmosaic_discovery::discover_units;
use parcelmosaic_engine::GeoEngine;
use parcelmosaic_pipeline::{UnitOutcome, convert_unit};
use parcelmosaic_shared::{
    ConversionSettings, LedgerConfig, MapUnit, MosaicNames, Result, RunId,
};

use crate::accumulator::{MosaicTargets, accumulate};
use crate::ledger::{Ledger, LedgerEntry};
use crate::report::{RunReport, UnitReport, UnitStatus};

/// Configuration for one batch run.
#[derive(Debug, Clone)]
pub struct RunOptions {
    /// Root of the `Root/Subdivision/MapUnit` hierarchy. Must already exist.
    pub root: std::path::PathBuf,
    /// Conversion settings, uniform across the run.
    pub settings: ConversionSettings,
    /// Names of the mosaic container and feature classes under the root.
    pub mosaic: MosaicNames,
    /// Processed-units ledger settings.
    pub ledger: LedgerConfig,
}

/// Progress callback for reporting batch status.
pub trait ProgressReporter: Send + Sync {
    /// Called when entering a new phase.
    fn phase(&self, name: &str);
    /// Called when a unit starts processing.
    fn unit_started(&self, unit: &MapUnit, current: usize, total: usize);
    /// Called when a unit reaches a terminal state.
    fn unit_finished(&self, report: &UnitReport);
    /// Called when the run completes.
    fn done(&self, report: &RunReport);
}

/// No-op progress reporter for headless/test usage.
pub struct SilentProgress;

impl ProgressReporter for SilentProgress {
    fn phase(&self, _name: &str) {}
    fn unit_started(&self, _unit: &MapUnit, _current: usize, _total: usize) {}
    fn unit_finished(&self, _report: &UnitReport) {}
    fn done(&self, _report: &RunReport) {}
}

/// Run the full batch.
///
/// 1. Discover map units under the root
/// 2. Per unit: convert, then fold into both mosaics
/// 3. Collect per-unit and per-layer results into the run report
#[instrument(skip_all, fields(root = %opts.root.display()))]
pub async fn run(
    engine: &dyn GeoEngine,
    opts: &RunOptions,
    progress: &dyn ProgressReporter,
) -> Result<RunReport> {
    let start = Instant::now();
    let run_id = RunId::new();
    let mut report = RunReport::new(run_id.clone(), opts.root.clone(), Utc::now());

    info!(%run_id, "starting batch run");

    progress.phase("Discovering map units");
    let units = discover_units(&opts.root)?;

    let targets = MosaicTargets::resolve(&opts.root, &opts.mosaic);
    let mut ledger = if opts.ledger.enabled {
        Some(Ledger::load(opts.root.join(&opts.ledger.file))?)
    } else {
        None
    };

    let total = units.len();
    for (i, unit) in units.iter().enumerate() {
        progress.unit_started(unit, i + 1, total);

        let (status, layers) = if ledger.as_ref().is_some_and(|l| l.contains(&unit.key())) {
            info!(unit = %unit, "unit already accumulated, skipping");
            (
                UnitStatus::Skipped {
                    reason: "already accumulated (ledger)".into(),
                },
                Vec::new(),
            )
        } else {
            match convert_unit(engine, unit, &opts.settings) {
                Err(e) => {
                    warn!(unit = %unit, error = %e, "unit failed, continuing batch");
                    (UnitStatus::failed(&e), Vec::new())
                }
                Ok((UnitOutcome::Skipped { reason }, layers)) => {
                    (UnitStatus::Skipped { reason }, layers)
                }
                Ok((UnitOutcome::Converted(output), layers)) => {
                    let outcome = accumulate(engine, &output, &targets);

                    if outcome.fully_succeeded() {
                        if let Some(l) = ledger.as_mut() {
                            let entry = LedgerEntry {
                                unit: unit.key(),
                                run_id: run_id.clone(),
                                accumulated_at: Utc::now(),
                            };
                            // A ledger write failure must not fail the unit:
                            // the mosaics already hold its records.
                            if let Err(e) = l.record(entry) {
                                warn!(unit = %unit, error = %e, "ledger update failed");
                            }
                        }
                    }

                    let status = if outcome.any_succeeded() {
                        UnitStatus::Accumulated {
                            polygons: (&outcome.polygons).into(),
                            lines: (&outcome.lines).into(),
                        }
                    } else {
                        let errors: Vec<String> = [&outcome.polygons, &outcome.lines]
                            .into_iter()
                            .filter_map(|r| r.as_ref().err())
                            .map(|e| e.to_string())
                            .collect();
                        warn!(unit = %unit, "both mosaic targets failed");
                        UnitStatus::Failed {
                            error: errors.join("; "),
                        }
                    };
                    (status, layers)
                }
            }
        };

        info!(unit = %unit, status = status.label(), "unit finished");
        let unit_report = UnitReport {
            unit: unit.key(),
            status,
            layers,
        };
        progress.unit_finished(&unit_report);
        report.push(unit_report);
    }

    report.elapsed_ms = start.elapsed().as_millis() as u64;

    info!(
        %run_id,
        units = total,
        accumulated = report.accumulated,
        skipped = report.skipped,
        failed = report.failed,
        elapsed_ms = report.elapsed_ms,
        "batch run complete"
    );

    progress.done(&report);
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::report::WriteStatus;
    use parcelmosaic_engine::{CadEntity, MemoryEngine};
    use parcelmosaic_shared::AppConfig;
    use std::path::Path;

    /// Build a `Root/Subdivision/MapUnit` tree and seed the engine with one
    /// CAD source per unit: `parcels` identifier points and `lines` boundary
    /// polylines.
    fn setup(units: &[(&str, &str, usize, usize)]) -> (tempfile::TempDir, MemoryEngine) {
        let root = tempfile::tempdir().expect("temp root");
        let engine = MemoryEngine::new();

        for (subdivision, name, parcels, lines) in units {
            let dir = root.path().join(subdivision).join(name);
            std::fs::create_dir_all(&dir).unwrap();

            let mut entities = Vec::new();
            for i in 0..*parcels {
                entities.push(CadEntity::point("PARCEL_ID").attr("PIN", &format!("{name}-{i}")));
            }
            for _ in 0..*lines {
                entities.push(CadEntity::polyline("PARCELS"));
            }
            engine.seed_cad_source(dir.join(format!("{name}.DWG")), entities);
        }

        (root, engine)
    }

    fn options(root: &Path) -> RunOptions {
        let config = AppConfig::default();
        RunOptions {
            root: root.to_path_buf(),
            settings: ConversionSettings::from(&config),
            mosaic: config.mosaic,
            ledger: config.ledger,
        }
    }

    fn mosaic_counts(engine: &MemoryEngine, opts: &RunOptions) -> (usize, usize) {
        let targets = MosaicTargets::resolve(&opts.root, &opts.mosaic);
        (
            engine.record_count(&targets.polygons).unwrap_or(0),
            engine.record_count(&targets.lines).unwrap_or(0),
        )
    }

    #[tokio::test]
    async fn accumulates_every_unit_sequentially() {
        let (root, engine) = setup(&[
            ("T5S_R10E", "T5S_R10E_01", 5, 6),
            ("T6S_R10E", "T6S_R10E_01", 3, 2),
        ]);
        let opts = options(root.path());

        let report = run(&engine, &opts, &SilentProgress).await.expect("run");

        assert_eq!(report.accumulated, 2);
        assert_eq!(report.failed, 0);
        assert_eq!(report.skipped, 0);
        assert!(report.is_clean());

        // Mosaic record counts equal the sum of per-unit contributions.
        assert_eq!(mosaic_counts(&engine, &opts), (8, 8));

        // Exactly one unit initialized each target, the other appended.
        let initialized = report
            .units
            .iter()
            .filter(|u| {
                matches!(
                    u.status,
                    UnitStatus::Accumulated {
                        polygons: WriteStatus::Initialized,
                        ..
                    }
                )
            })
            .count();
        assert_eq!(initialized, 1);
    }

    #[tokio::test]
    async fn failed_import_does_not_stop_the_batch() {
        let (root, engine) = setup(&[("T5S_R10E", "T5S_R10E_01", 4, 4)]);
        // Second unit directory exists but its CAD source is unreadable
        // (never seeded).
        std::fs::create_dir_all(root.path().join("T5S_R10E/T5S_R10E_02")).unwrap();
        let opts = options(root.path());

        let report = run(&engine, &opts, &SilentProgress).await.expect("run");

        assert_eq!(report.accumulated, 1);
        assert_eq!(report.failed, 1);
        let failed = report
            .units
            .iter()
            .find(|u| matches!(u.status, UnitStatus::Failed { .. }))
            .expect("one failed unit");
        assert_eq!(failed.unit, "T5S_R10E/T5S_R10E_02");

        // Only the good unit contributed.
        assert_eq!(mosaic_counts(&engine, &opts), (4, 4));
    }

    #[tokio::test]
    async fn layer_failure_in_one_unit_leaves_others_intact() {
        let (root, engine) = setup(&[
            ("T5S_R10E", "T5S_R10E_01", 2, 3),
            ("T6S_R10E", "T6S_R10E_01", 4, 5),
        ]);
        // Unit A's boundary-line extraction fails: it must appear in neither
        // mosaic, and unit B must be unaffected.
        engine.fail_copy_to(
            root.path()
                .join("T5S_R10E/T5S_R10E_01/T5S_R10E_01.gdb/conversion/Line_PARCELS"),
        );
        let opts = options(root.path());

        let report = run(&engine, &opts, &SilentProgress).await.expect("run");

        assert_eq!(report.skipped, 1);
        assert_eq!(report.accumulated, 1);
        let skipped = report
            .units
            .iter()
            .find(|u| u.unit == "T5S_R10E/T5S_R10E_01")
            .unwrap();
        assert!(matches!(skipped.status, UnitStatus::Skipped { .. }));
        assert!(!skipped.layers[0].succeeded());

        assert_eq!(mosaic_counts(&engine, &opts), (4, 5));
    }

    #[tokio::test]
    async fn rerun_without_ledger_duplicates_records() {
        let (root, engine) = setup(&[("T5S_R10E", "T5S_R10E_01", 5, 5)]);
        let opts = options(root.path());

        run(&engine, &opts, &SilentProgress).await.expect("first run");
        run(&engine, &opts, &SilentProgress).await.expect("second run");

        // Append-only, no dedup: re-runs double the records.
        assert_eq!(mosaic_counts(&engine, &opts), (10, 10));
    }

    #[tokio::test]
    async fn ledger_skips_already_accumulated_units() {
        let (root, engine) = setup(&[
            ("T5S_R10E", "T5S_R10E_01", 5, 5),
            ("T6S_R10E", "T6S_R10E_01", 3, 3),
        ]);
        let mut opts = options(root.path());
        opts.ledger.enabled = true;

        let first = run(&engine, &opts, &SilentProgress).await.expect("first run");
        assert_eq!(first.accumulated, 2);
        assert!(root.path().join("processed_units.json").exists());

        let second = run(&engine, &opts, &SilentProgress).await.expect("second run");
        assert_eq!(second.accumulated, 0);
        assert_eq!(second.skipped, 2);

        // No duplicates.
        assert_eq!(mosaic_counts(&engine, &opts), (8, 8));
    }

    #[tokio::test]
    async fn discovery_failure_aborts_the_run() {
        let engine = MemoryEngine::new();
        let opts = options(Path::new("/nonexistent/parcel/root"));
        let err = run(&engine, &opts, &SilentProgress).await.unwrap_err();
        assert!(matches!(
            err,
            parcelmosaic_shared::MosaicError::Discovery { .. }
        ));
    }

    #[tokio::test]
    async fn partial_accumulation_is_reported_per_target() {
        let (root, engine) = setup(&[
            ("T5S_R10E", "T5S_R10E_01", 4, 4),
            ("T6S_R10E", "T6S_R10E_01", 4, 4),
        ]);
        let opts = options(root.path());

        // The second unit's polygon append fails; its line append succeeds.
        let targets = MosaicTargets::resolve(&opts.root, &opts.mosaic);
        engine.fail_append_to(&targets.polygons);

        let report = run(&engine, &opts, &SilentProgress).await.expect("run");

        assert_eq!(report.accumulated, 2);
        let partial = report
            .units
            .iter()
            .filter(|u| {
                matches!(
                    u.status,
                    UnitStatus::Accumulated {
                        polygons: WriteStatus::Failed { .. },
                        lines: WriteStatus::Appended,
                    }
                )
            })
            .count();
        assert_eq!(partial, 1);

        // Polygon mosaic kept only the first unit; line mosaic has both.
        assert_eq!(mosaic_counts(&engine, &opts), (4, 8));
    }
}
