//! Work discovery: enumerate map units under the mosaic root.
//!
//! The directory layout contract is `Root/Subdivision/MapUnit/`, each map
//! unit directory containing a CAD source named after the directory.
//! Discovery is read-only and carries no hidden iteration state; the
//! returned list is in directory-listing order, which the mosaic places no
//! semantic meaning on.

use std::path::Path;

use parcelmosaic_shared::{MapUnit, MosaicError, Result};
use tracing::{debug, info, instrument};

/// Enumerate all map units reachable under `root`.
///
/// A subdivision with zero map units is valid and contributes nothing.
/// Plain files at either level are ignored. Fails with
/// [`MosaicError::Discovery`] if `root` or a subdivision directory cannot be
/// read; this is the only failure that aborts a whole batch.
#[instrument(skip_all, fields(root = %root.display()))]
pub fn discover_units(root: &Path) -> Result<Vec<MapUnit>> {
    if !root.is_dir() {
        return Err(MosaicError::discovery(format!(
            "root is not a readable directory: {}",
            root.display()
        )));
    }

    let mut units = Vec::new();

    for subdivision in list_dirs(root)? {
        let sub_name = dir_name(&subdivision);
        let maps = list_dirs(&subdivision)?;
        if maps.is_empty() {
            debug!(subdivision = %sub_name, "subdivision has no map units");
            continue;
        }

        for map_dir in maps {
            units.push(MapUnit {
                subdivision: sub_name.clone(),
                name: dir_name(&map_dir),
                dir: map_dir,
            });
        }
    }

    info!(unit_count = units.len(), "work discovery complete");
    Ok(units)
}

/// Subdirectories of `dir`, in listing order.
fn list_dirs(dir: &Path) -> Result<Vec<std::path::PathBuf>> {
    let entries = std::fs::read_dir(dir).map_err(|e| {
        MosaicError::discovery(format!("cannot read {}: {e}", dir.display()))
    })?;

    let mut dirs = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|e| {
            MosaicError::discovery(format!("cannot read entry under {}: {e}", dir.display()))
        })?;
        let path = entry.path();
        if path.is_dir() {
            dirs.push(path);
        }
    }
    Ok(dirs)
}

fn dir_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_tree(layout: &[(&str, &[&str])]) -> tempfile::TempDir {
        let root = tempfile::tempdir().expect("create temp root");
        for (subdivision, maps) in layout {
            let sub = root.path().join(subdivision);
            std::fs::create_dir(&sub).unwrap();
            for map in *maps {
                std::fs::create_dir(sub.join(map)).unwrap();
            }
        }
        root
    }

    #[test]
    fn discovers_nested_units() {
        let root = make_tree(&[
            ("T5S_R10E", &["T5S_R10E_01", "T5S_R10E_02"]),
            ("T6S_R10E", &["T6S_R10E_01"]),
        ]);

        let mut units = discover_units(root.path()).expect("discover");
        units.sort_by(|a, b| a.key().cmp(&b.key()));

        assert_eq!(units.len(), 3);
        assert_eq!(units[0].subdivision, "T5S_R10E");
        assert_eq!(units[0].name, "T5S_R10E_01");
        assert_eq!(units[0].dir, root.path().join("T5S_R10E/T5S_R10E_01"));
        assert_eq!(units[2].key(), "T6S_R10E/T6S_R10E_01");
    }

    #[test]
    fn empty_subdivision_is_a_noop() {
        let root = make_tree(&[("T5S_R10E", &["T5S_R10E_01"]), ("T7S_R09E", &[])]);
        let units = discover_units(root.path()).expect("discover");
        assert_eq!(units.len(), 1);
    }

    #[test]
    fn files_at_either_level_are_ignored() {
        let root = make_tree(&[("T5S_R10E", &["T5S_R10E_01"])]);
        std::fs::write(root.path().join("readme.txt"), b"notes").unwrap();
        std::fs::write(root.path().join("T5S_R10E/index.csv"), b"a,b").unwrap();

        let units = discover_units(root.path()).expect("discover");
        assert_eq!(units.len(), 1);
        assert_eq!(units[0].name, "T5S_R10E_01");
    }

    #[test]
    fn missing_root_is_a_discovery_error() {
        let err = discover_units(Path::new("/nonexistent/parcel/root")).unwrap_err();
        assert!(matches!(err, MosaicError::Discovery { .. }));
    }

    #[test]
    fn empty_root_yields_no_units() {
        let root = tempfile::tempdir().unwrap();
        let units = discover_units(root.path()).expect("discover");
        assert!(units.is_empty());
    }
}
