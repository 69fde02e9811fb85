//! Core orchestration for ParcelMosaic: mosaic accumulation, the batch run
//! loop, run reporting, and the processed-units ledger.

pub mod accumulator;
pub mod ledger;
pub mod orchestrator;
pub mod report;

pub use accumulator::{AccumulateOutcome, MosaicTargets, MosaicWrite, accumulate};
pub use ledger::{Ledger, LedgerEntry};
pub use orchestrator::{ProgressReporter, RunOptions, SilentProgress, run};
pub use report::{RunReport, UnitReport, UnitStatus, WriteStatus};
