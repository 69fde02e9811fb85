//! Map conversion pipeline: one CAD drawing → parcel polygon and line
//! feature classes.
//!
//! For one map unit the pipeline drives the engine through container
//! creation, CAD import, identifier-point extraction, per-layer line
//! extraction, and polygon reconstruction. Layer requests are fault-isolated:
//! one request failing is captured in its [`LayerReport`] and the rest still
//! run. Container creation, CAD import, point extraction, and polygon build
//! failures are fatal to the unit only; the batch continues.

use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument, warn};

use parcelmosaic_engine::{AttributeFilter, DatasetRef, FeatureClassRef, GeoEngine};
use parcelmosaic_shared::{ConversionSettings, MapUnit, MosaicError, Result, naming};

// ---------------------------------------------------------------------------
// Pipeline results
// ---------------------------------------------------------------------------

/// The per-unit output feature classes, consumed by the mosaic accumulator.
#[derive(Debug, Clone)]
pub struct UnitOutput {
    /// Reconstructed parcel polygons (`Poly_PARCELS`).
    pub polygons: FeatureClassRef,
    /// Extracted parcel boundary lines (`Line_PARCELS`).
    pub lines: FeatureClassRef,
}

/// Terminal pipeline outcome for one unit.
#[derive(Debug, Clone)]
pub enum UnitOutcome {
    /// Both output classes produced; ready for accumulation.
    Converted(UnitOutput),
    /// No boundary-line class was produced; the unit contributes nothing to
    /// either mosaic. Reported, not an error.
    Skipped { reason: String },
}

/// Per-layer-request extraction result, collected into the unit report.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LayerReport {
    /// The requested `Layer` attribute value.
    pub layer: String,
    /// Name of the produced feature class, on success.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub class: Option<String>,
    /// Failure message, on failure.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl LayerReport {
    fn ok(layer: &str, class: &FeatureClassRef) -> Self {
        Self {
            layer: layer.to_string(),
            class: Some(class.name().to_string()),
            error: None,
        }
    }

    fn failed(layer: &str, err: &MosaicError) -> Self {
        Self {
            layer: layer.to_string(),
            class: None,
            error: Some(err.to_string()),
        }
    }

    /// Whether this request produced a feature class.
    pub fn succeeded(&self) -> bool {
        self.class.is_some()
    }
}

// ---------------------------------------------------------------------------
// Pipeline
// ---------------------------------------------------------------------------

/// Convert one map unit.
///
/// Steps run in strict sequence; each depends on the previous step's output.
/// Returns the unit outcome plus one [`LayerReport`] per configured layer
/// request. An `Err` means the unit failed outright (container, import,
/// identifier points, or polygon build); the caller continues with the next
/// unit.
#[instrument(skip_all, fields(unit = %unit))]
pub fn convert_unit(
    engine: &dyn GeoEngine,
    unit: &MapUnit,
    settings: &ConversionSettings,
) -> Result<(UnitOutcome, Vec<LayerReport>)> {
    let source = unit.cad_source_path();
    let container = unit.container_path();

    info!(source = %source.display(), "converting map unit");

    // Always (re-)created per unit; collision with a stale container from a
    // prior run is engine-defined.
    engine
        .create_container(&unit.dir, &naming::container_name(&unit.name))
        .map_err(|e| MosaicError::conversion(unit.key(), e.to_string()))?;

    let dataset = engine
        .import_cad(
            &source,
            &container,
            naming::DATASET_NAME,
            &settings.reference_frame,
            settings.reference_scale,
        )
        .map_err(|e| MosaicError::conversion(unit.key(), e.to_string()))?;

    // Identifier points label the reconstructed polygons; without them the
    // unit's polygons would be unattributed, so failure here fails the unit.
    let labels = copy_filtered(
        engine,
        &dataset.point_class(),
        &AttributeFilter::layer(naming::ID_POINT_LAYER),
        &dataset,
        naming::ID_POINT_CLASS,
    )
    .map_err(|e| MosaicError::conversion(unit.key(), e.to_string()))?;

    let layer_reports = extract_line_layers(engine, &dataset, &settings.layers);

    let boundary_layer = naming::PARCEL_BOUNDARY_LAYER;
    let boundary_lines = layer_reports
        .iter()
        .find(|r| r.layer == boundary_layer && r.succeeded())
        .map(|_| dataset.class(&naming::line_class_name(boundary_layer)));

    let Some(lines) = boundary_lines else {
        let reason = format!("no {} feature class produced", naming::line_class_name(boundary_layer));
        info!(%reason, "skipping polygon reconstruction");
        return Ok((UnitOutcome::Skipped { reason }, layer_reports));
    };

    let polygons = engine
        .build_polygons(
            &lines,
            &labels,
            &dataset
                .class(&naming::polygon_class_name(boundary_layer))
                .path,
        )
        .map_err(|e| MosaicError::conversion(unit.key(), e.to_string()))?;

    info!(polygons = %polygons, lines = %lines, "map unit converted");
    Ok((
        UnitOutcome::Converted(UnitOutput { polygons, lines }),
        layer_reports,
    ))
}

/// Extract each requested line layer into its own feature class.
///
/// Requests are isolated: a failure is recorded in that request's report and
/// the remaining requests still run.
fn extract_line_layers(
    engine: &dyn GeoEngine,
    dataset: &DatasetRef,
    layers: &[String],
) -> Vec<LayerReport> {
    let polylines = dataset.polyline_class();

    layers
        .iter()
        .map(|layer| {
            match copy_filtered(
                engine,
                &polylines,
                &AttributeFilter::layer(layer.as_str()),
                dataset,
                &naming::line_class_name(layer),
            ) {
                Ok(class) => {
                    debug!(layer, class = %class, "layer extracted");
                    LayerReport::ok(layer, &class)
                }
                Err(e) => {
                    let err = MosaicError::layer(layer.clone(), e.to_string());
                    warn!(layer, error = %err, "layer extraction failed, continuing");
                    LayerReport::failed(layer, &err)
                }
            }
        })
        .collect()
}

/// Filter a collection by attribute and copy the view into a new feature
/// class inside the dataset. The transient view is released whether the copy
/// succeeds or fails.
fn copy_filtered(
    engine: &dyn GeoEngine,
    collection: &FeatureClassRef,
    filter: &AttributeFilter,
    dataset: &DatasetRef,
    dest_name: &str,
) -> Result<FeatureClassRef> {
    let view = engine.filter_by_attribute(collection, filter)?;
    let result = engine.copy_features(&view, &dataset.class(dest_name).path);
    engine.release_view(view);
    result
}
