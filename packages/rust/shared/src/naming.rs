//! Deterministic naming conventions for per-unit artifacts.
//!
//! Every name the batch derives from a map unit or layer request lives here,
//! so the conventions are unit-testable in isolation and nothing else in the
//! workspace does filename slicing.

/// Extension of the CAD source drawing inside each map unit directory.
pub const CAD_EXTENSION: &str = "DWG";

/// Extension of the per-unit conversion container.
pub const CONTAINER_EXTENSION: &str = "gdb";

/// Name of the structured dataset created inside each conversion container.
pub const DATASET_NAME: &str = "conversion";

/// `Layer` attribute value marking parcel identifier points.
pub const ID_POINT_LAYER: &str = "PARCEL_ID";

/// Feature class holding the extracted parcel identifier points.
pub const ID_POINT_CLASS: &str = "ParcelID_pt";

/// The layer request whose line output feeds polygon reconstruction.
pub const PARCEL_BOUNDARY_LAYER: &str = "PARCELS";

/// CAD source file name for a map unit: `<unit>.DWG`.
pub fn cad_source_name(unit: &str) -> String {
    format!("{unit}.{CAD_EXTENSION}")
}

/// Conversion container name for a map unit: `<unit>.gdb`.
pub fn container_name(unit: &str) -> String {
    format!("{unit}.{CONTAINER_EXTENSION}")
}

/// Line feature class name for a layer request: `Line_<layer>`.
pub fn line_class_name(layer: &str) -> String {
    format!("Line_{layer}")
}

/// Polygon feature class name for a layer request: `Poly_<layer>`.
pub fn polygon_class_name(layer: &str) -> String {
    format!("Poly_{layer}")
}
