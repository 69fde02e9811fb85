//! Geospatial conversion engine interface.
//!
//! The actual conversion work — CAD parsing, polygon topology, projections,
//! geodatabase storage — is an external collaborator. This crate defines the
//! capability contract the rest of the workspace depends on ([`GeoEngine`]),
//! plus [`MemoryEngine`], an in-memory implementation used by tests and by
//! structure-only CLI runs.
//!
//! All engine calls are synchronous blocking I/O from the caller's point of
//! view; there are no cancellation or timeout semantics.

pub mod memory;

use std::path::{Path, PathBuf};

use parcelmosaic_shared::Result;

pub use memory::{CadEntity, MemoryEngine};

// ---------------------------------------------------------------------------
// Handle types
// ---------------------------------------------------------------------------

/// Geometry families the engine distinguishes inside an imported dataset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GeometryKind {
    Point,
    Polyline,
    Polygon,
}

impl GeometryKind {
    /// Feature class name the engine gives this geometry family on import.
    pub fn class_name(self) -> &'static str {
        match self {
            Self::Point => "Point",
            Self::Polyline => "Polyline",
            Self::Polygon => "Polygon",
        }
    }
}

/// Reference to a feature class by its full path inside a container.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FeatureClassRef {
    pub path: PathBuf,
}

impl FeatureClassRef {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Last path component, the feature class name.
    pub fn name(&self) -> &str {
        self.path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or_default()
    }
}

impl std::fmt::Display for FeatureClassRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.path.display())
    }
}

/// Reference to a structured dataset produced by CAD import.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DatasetRef {
    /// Container the dataset lives in.
    pub container: PathBuf,
    /// Dataset name inside the container.
    pub name: String,
}

impl DatasetRef {
    /// Full path of the dataset.
    pub fn path(&self) -> PathBuf {
        self.container.join(&self.name)
    }

    /// A feature class inside this dataset by name.
    pub fn class(&self, name: &str) -> FeatureClassRef {
        FeatureClassRef::new(self.path().join(name))
    }

    /// The dataset's imported point geometry collection.
    pub fn point_class(&self) -> FeatureClassRef {
        self.class(GeometryKind::Point.class_name())
    }

    /// The dataset's imported line geometry collection.
    pub fn polyline_class(&self) -> FeatureClassRef {
        self.class(GeometryKind::Polyline.class_name())
    }
}

/// Opaque handle to a transient, attribute-filtered view over a feature
/// class. Not `Clone`: releasing the view consumes the handle, so a view
/// cannot be used after release.
#[derive(Debug, PartialEq, Eq, Hash)]
pub struct ViewHandle(pub(crate) u64);

// ---------------------------------------------------------------------------
// AttributeFilter
// ---------------------------------------------------------------------------

/// Structured equality predicate over one attribute field.
///
/// Renders as the engine's where-clause syntax, e.g. `Layer = 'PARCELS'`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttributeFilter {
    pub field: String,
    pub equals: String,
}

impl AttributeFilter {
    pub fn new(field: impl Into<String>, equals: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            equals: equals.into(),
        }
    }

    /// Filter on the `Layer` attribute, the drawn CAD layer of each feature.
    pub fn layer(value: impl Into<String>) -> Self {
        Self::new("Layer", value)
    }
}

impl std::fmt::Display for AttributeFilter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} = '{}'", self.field, self.equals)
    }
}

// ---------------------------------------------------------------------------
// GeoEngine
// ---------------------------------------------------------------------------

/// Capability contract for the external geospatial conversion engine.
///
/// Every call blocks until completion. Implementations must tolerate
/// re-creation of per-unit containers left over from prior runs; behavior on
/// collision is engine-defined.
pub trait GeoEngine: Send + Sync {
    /// Whether a container or feature class exists at `path`.
    fn exists(&self, path: &Path) -> bool;

    /// Create a feature container named `name` under `parent`.
    fn create_container(&self, parent: &Path, name: &str) -> Result<()>;

    /// Import a CAD source into `container` as a structured dataset at the
    /// given reference frame and scale.
    fn import_cad(
        &self,
        source: &Path,
        container: &Path,
        dataset: &str,
        reference_frame: &str,
        reference_scale: u32,
    ) -> Result<DatasetRef>;

    /// Create a transient view of `class` restricted by `filter`.
    fn filter_by_attribute(
        &self,
        class: &FeatureClassRef,
        filter: &AttributeFilter,
    ) -> Result<ViewHandle>;

    /// Copy a view's records into a new feature class at `dest`.
    fn copy_features(&self, view: &ViewHandle, dest: &Path) -> Result<FeatureClassRef>;

    /// Release a transient view. Infallible; engines drop unknown handles.
    fn release_view(&self, view: ViewHandle);

    /// Build a polygon feature class at `dest` from a boundary-line class,
    /// attributing each polygon from the enclosed label point (or none).
    fn build_polygons(
        &self,
        lines: &FeatureClassRef,
        labels: &FeatureClassRef,
        dest: &Path,
    ) -> Result<FeatureClassRef>;

    /// Copy a feature class verbatim to `dest` (schema included).
    fn copy_class(&self, src: &Path, dest: &Path) -> Result<()>;

    /// Append `src`'s records into the existing class at `dest`, with
    /// schema-compatibility checking disabled by policy.
    fn append(&self, src: &Path, dest: &Path) -> Result<()>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn attribute_filter_renders_where_clause() {
        let f = AttributeFilter::layer("PARCELS");
        assert_eq!(f.to_string(), "Layer = 'PARCELS'");
        assert_eq!(f.field, "Layer");
    }

    #[test]
    fn dataset_ref_paths() {
        let ds = DatasetRef {
            container: PathBuf::from("/maps/T5S_R10E_01.gdb"),
            name: "conversion".into(),
        };
        assert_eq!(ds.path(), PathBuf::from("/maps/T5S_R10E_01.gdb/conversion"));
        assert_eq!(
            ds.polyline_class().path,
            PathBuf::from("/maps/T5S_R10E_01.gdb/conversion/Polyline")
        );
        assert_eq!(ds.class("Line_PARCELS").name(), "Line_PARCELS");
    }
}
