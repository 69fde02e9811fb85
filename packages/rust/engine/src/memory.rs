//! In-memory [`GeoEngine`] implementation.
//!
//! Feature classes are attribute-record tables keyed by path. Tests seed CAD
//! sources with typed entities, inject failures by destination path, and
//! assert on record counts and open-view bookkeeping. In permissive mode a
//! CAD source that exists on the filesystem but was never seeded imports as
//! an empty dataset, which lets the CLI walk a real directory tree without a
//! real conversion engine.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use parcelmosaic_shared::{MosaicError, Result};
use tracing::debug;

use crate::{AttributeFilter, DatasetRef, FeatureClassRef, GeoEngine, GeometryKind, ViewHandle};

/// Attribute record: field name → value. The `Layer` field carries the drawn
/// CAD layer.
pub type Record = BTreeMap<String, String>;

/// One seeded CAD entity: geometry family plus attributes.
#[derive(Debug, Clone)]
pub struct CadEntity {
    pub geometry: GeometryKind,
    pub attrs: Record,
}

impl CadEntity {
    fn with_layer(geometry: GeometryKind, layer: &str) -> Self {
        let mut attrs = Record::new();
        attrs.insert("Layer".into(), layer.into());
        Self { geometry, attrs }
    }

    /// A point on the given layer.
    pub fn point(layer: &str) -> Self {
        Self::with_layer(GeometryKind::Point, layer)
    }

    /// A polyline on the given layer.
    pub fn polyline(layer: &str) -> Self {
        Self::with_layer(GeometryKind::Polyline, layer)
    }

    /// Add an attribute (builder style).
    pub fn attr(mut self, field: &str, value: &str) -> Self {
        self.attrs.insert(field.into(), value.into());
        self
    }
}

#[derive(Debug, Clone)]
struct FeatureClass {
    geometry: GeometryKind,
    records: Vec<Record>,
}

#[derive(Debug)]
struct View {
    geometry: GeometryKind,
    records: Vec<Record>,
}

#[derive(Default)]
struct Inner {
    cad_sources: HashMap<PathBuf, Vec<CadEntity>>,
    containers: HashSet<PathBuf>,
    classes: HashMap<PathBuf, FeatureClass>,
    views: HashMap<u64, View>,
    next_view: u64,
    fail_copy: HashSet<PathBuf>,
    fail_append: HashSet<PathBuf>,
}

/// In-memory engine double. Interior mutability keeps the [`GeoEngine`]
/// methods `&self`, matching the blocking-call contract.
pub struct MemoryEngine {
    inner: Mutex<Inner>,
    permissive: bool,
}

impl Default for MemoryEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryEngine {
    /// Strict engine: only seeded CAD sources import.
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(Inner::default()),
            permissive: false,
        }
    }

    /// Permissive engine: an unseeded CAD source that exists on the
    /// filesystem imports as an empty dataset (structure-only runs).
    pub fn permissive() -> Self {
        Self {
            inner: Mutex::new(Inner::default()),
            permissive: true,
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Inner> {
        // Mutex poisoning only happens if a panic escaped an engine call.
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Seed a CAD source with entities so `import_cad` can consume it.
    pub fn seed_cad_source(&self, path: impl Into<PathBuf>, entities: Vec<CadEntity>) {
        self.lock().cad_sources.insert(path.into(), entities);
    }

    /// Make the next (and every) `copy_features`/`build_polygons`/`copy_class`
    /// targeting `dest` fail.
    pub fn fail_copy_to(&self, dest: impl Into<PathBuf>) {
        self.lock().fail_copy.insert(dest.into());
    }

    /// Make every `append` targeting `dest` fail.
    pub fn fail_append_to(&self, dest: impl Into<PathBuf>) {
        self.lock().fail_append.insert(dest.into());
    }

    /// Record count of the feature class at `path`, if it exists.
    pub fn record_count(&self, path: impl AsRef<Path>) -> Option<usize> {
        self.lock().classes.get(path.as_ref()).map(|c| c.records.len())
    }

    /// Number of transient views not yet released.
    pub fn open_view_count(&self) -> usize {
        self.lock().views.len()
    }
}

impl GeoEngine for MemoryEngine {
    fn exists(&self, path: &Path) -> bool {
        let inner = self.lock();
        inner.containers.contains(path) || inner.classes.contains_key(path)
    }

    fn create_container(&self, parent: &Path, name: &str) -> Result<()> {
        let path = parent.join(name);
        debug!(path = %path.display(), "create container");
        // Re-creation over a stale container is engine-defined; here it resets it.
        let mut inner = self.lock();
        let dataset_prefix = path.clone();
        inner.classes.retain(|p, _| !p.starts_with(&dataset_prefix));
        inner.containers.insert(path);
        Ok(())
    }

    fn import_cad(
        &self,
        source: &Path,
        container: &Path,
        dataset: &str,
        reference_frame: &str,
        reference_scale: u32,
    ) -> Result<DatasetRef> {
        debug!(
            source = %source.display(),
            reference_frame,
            reference_scale,
            "import CAD source"
        );
        let mut inner = self.lock();

        let entities = match inner.cad_sources.get(source) {
            Some(entities) => entities.clone(),
            None if self.permissive && source.exists() => Vec::new(),
            None => {
                return Err(MosaicError::Engine(format!(
                    "CAD source not found or unreadable: {}",
                    source.display()
                )));
            }
        };

        let ds = DatasetRef {
            container: container.to_path_buf(),
            name: dataset.to_string(),
        };

        // Imported geometry lands in one collection per geometry family.
        for kind in [GeometryKind::Point, GeometryKind::Polyline] {
            let records = entities
                .iter()
                .filter(|e| e.geometry == kind)
                .map(|e| e.attrs.clone())
                .collect();
            inner.classes.insert(
                ds.class(kind.class_name()).path,
                FeatureClass {
                    geometry: kind,
                    records,
                },
            );
        }

        Ok(ds)
    }

    fn filter_by_attribute(
        &self,
        class: &FeatureClassRef,
        filter: &AttributeFilter,
    ) -> Result<ViewHandle> {
        let mut inner = self.lock();
        let fc = inner.classes.get(&class.path).ok_or_else(|| {
            MosaicError::Engine(format!("feature class not found: {class}"))
        })?;

        let records: Vec<Record> = fc
            .records
            .iter()
            .filter(|r| r.get(&filter.field).map(String::as_str) == Some(filter.equals.as_str()))
            .cloned()
            .collect();
        let view = View {
            geometry: fc.geometry,
            records,
        };

        let id = inner.next_view;
        inner.next_view += 1;
        inner.views.insert(id, view);
        Ok(ViewHandle(id))
    }

    fn copy_features(&self, view: &ViewHandle, dest: &Path) -> Result<FeatureClassRef> {
        let mut inner = self.lock();
        if inner.fail_copy.contains(dest) {
            return Err(MosaicError::Engine(format!(
                "copy to {} failed",
                dest.display()
            )));
        }

        let v = inner
            .views
            .get(&view.0)
            .ok_or_else(|| MosaicError::Engine("view already released".into()))?;
        let fc = FeatureClass {
            geometry: v.geometry,
            records: v.records.clone(),
        };
        inner.classes.insert(dest.to_path_buf(), fc);
        Ok(FeatureClassRef::new(dest))
    }

    fn release_view(&self, view: ViewHandle) {
        self.lock().views.remove(&view.0);
    }

    fn build_polygons(
        &self,
        lines: &FeatureClassRef,
        labels: &FeatureClassRef,
        dest: &Path,
    ) -> Result<FeatureClassRef> {
        let mut inner = self.lock();
        if inner.fail_copy.contains(dest) {
            return Err(MosaicError::Engine(format!(
                "polygon build at {} failed",
                dest.display()
            )));
        }
        if !inner.classes.contains_key(&lines.path) {
            return Err(MosaicError::Engine(format!(
                "boundary line class not found: {lines}"
            )));
        }
        let label_class = inner.classes.get(&labels.path).ok_or_else(|| {
            MosaicError::Engine(format!("label class not found: {labels}"))
        })?;

        // Stand-in topology: one polygon per label point, carrying its
        // attributes. Real engines close rings from the boundary lines.
        let records = label_class.records.clone();
        inner.classes.insert(
            dest.to_path_buf(),
            FeatureClass {
                geometry: GeometryKind::Polygon,
                records,
            },
        );
        Ok(FeatureClassRef::new(dest))
    }

    fn copy_class(&self, src: &Path, dest: &Path) -> Result<()> {
        let mut inner = self.lock();
        if inner.fail_copy.contains(dest) {
            return Err(MosaicError::Engine(format!(
                "copy to {} failed",
                dest.display()
            )));
        }
        let fc = inner
            .classes
            .get(src)
            .cloned()
            .ok_or_else(|| MosaicError::Engine(format!("source class not found: {}", src.display())))?;
        inner.classes.insert(dest.to_path_buf(), fc);
        Ok(())
    }

    fn append(&self, src: &Path, dest: &Path) -> Result<()> {
        let mut inner = self.lock();
        if inner.fail_append.contains(dest) {
            return Err(MosaicError::Engine(format!(
                "append to {} failed",
                dest.display()
            )));
        }
        let src_records = inner
            .classes
            .get(src)
            .map(|c| c.records.clone())
            .ok_or_else(|| MosaicError::Engine(format!("source class not found: {}", src.display())))?;
        let dest_class = inner.classes.get_mut(dest).ok_or_else(|| {
            MosaicError::Engine(format!("append target not found: {}", dest.display()))
        })?;
        // Schema checking disabled by policy: records keep whatever fields
        // they have, mismatches included.
        dest_class.records.extend(src_records);
        Ok(())
    }
}
