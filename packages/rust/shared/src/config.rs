//! Application configuration for ParcelMosaic.
//!
//! User config lives at `~/.parcelmosaic/parcelmosaic.toml`.
//! CLI flags override config file values, which override defaults.
//! The root path is always supplied at run time, never stored.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{MosaicError, Result};

/// Default configuration file name.
const CONFIG_FILE_NAME: &str = "parcelmosaic.toml";

/// Default config directory name under the user's home.
const CONFIG_DIR_NAME: &str = ".parcelmosaic";

// ---------------------------------------------------------------------------
// Config structs (matching parcelmosaic.toml schema)
// ---------------------------------------------------------------------------

/// Top-level application config, deserialized from TOML.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Conversion defaults.
    #[serde(default)]
    pub run: RunDefaults,

    /// Mosaic output naming.
    #[serde(default)]
    pub mosaic: MosaicNames,

    /// Processed-units ledger settings.
    #[serde(default)]
    pub ledger: LedgerConfig,
}

/// `[run]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunDefaults {
    /// Named reference frame for CAD import.
    #[serde(default = "default_reference_frame")]
    pub reference_frame: String,

    /// Conversion reference scale.
    #[serde(default = "default_reference_scale")]
    pub reference_scale: u32,

    /// Layer requests to extract from each imported dataset. Must include
    /// the parcel boundary layer for polygon reconstruction to run.
    #[serde(default = "default_layers")]
    pub layers: Vec<String>,
}

impl Default for RunDefaults {
    fn default() -> Self {
        Self {
            reference_frame: default_reference_frame(),
            reference_scale: default_reference_scale(),
            layers: default_layers(),
        }
    }
}

fn default_reference_frame() -> String {
    "NAD_1983_StatePlane_Kansas_South_FIPS_1502_Feet".into()
}
fn default_reference_scale() -> u32 {
    1000
}
fn default_layers() -> Vec<String> {
    vec![crate::naming::PARCEL_BOUNDARY_LAYER.to_string()]
}

/// `[mosaic]` section — names of the persistent outputs under the root.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MosaicNames {
    /// Root-level container holding both mosaic feature classes.
    #[serde(default = "default_mosaic_container")]
    pub container: String,

    /// Parcel polygon mosaic feature class name.
    #[serde(default = "default_polygon_mosaic")]
    pub polygons: String,

    /// Parcel line mosaic feature class name.
    #[serde(default = "default_line_mosaic")]
    pub lines: String,
}

impl Default for MosaicNames {
    fn default() -> Self {
        Self {
            container: default_mosaic_container(),
            polygons: default_polygon_mosaic(),
            lines: default_line_mosaic(),
        }
    }
}

fn default_mosaic_container() -> String {
    "ParcelMosaic.gdb".into()
}
fn default_polygon_mosaic() -> String {
    "Parcels".into()
}
fn default_line_mosaic() -> String {
    "ParcelLines".into()
}

/// `[ledger]` section — opt-in processed-units ledger.
///
/// Disabled by default: re-runs then intentionally duplicate records, matching
/// the append-only mosaic contract. Enabled, a re-run skips units the ledger
/// already records as accumulated.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LedgerConfig {
    /// Whether to consult and maintain the ledger.
    #[serde(default)]
    pub enabled: bool,

    /// Ledger file name, stored directly under the root.
    #[serde(default = "default_ledger_file")]
    pub file: String,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            file: default_ledger_file(),
        }
    }
}

fn default_ledger_file() -> String {
    "processed_units.json".into()
}

// ---------------------------------------------------------------------------
// Conversion settings (runtime, merged from config + CLI flags)
// ---------------------------------------------------------------------------

/// Runtime conversion settings — uniform across the whole run.
#[derive(Debug, Clone)]
pub struct ConversionSettings {
    /// Named reference frame for CAD import.
    pub reference_frame: String,
    /// Conversion reference scale.
    pub reference_scale: u32,
    /// Layer requests to extract per unit.
    pub layers: Vec<String>,
}

impl From<&AppConfig> for ConversionSettings {
    fn from(config: &AppConfig) -> Self {
        Self {
            reference_frame: config.run.reference_frame.clone(),
            reference_scale: config.run.reference_scale,
            layers: config.run.layers.clone(),
        }
    }
}

// ---------------------------------------------------------------------------
// Config loading
// ---------------------------------------------------------------------------

/// Get the path to the config directory (`~/.parcelmosaic/`).
pub fn config_dir() -> Result<PathBuf> {
    let home = dirs::home_dir()
        .ok_or_else(|| MosaicError::config("could not determine home directory"))?;
    Ok(home.join(CONFIG_DIR_NAME))
}

/// Get the path to the config file (`~/.parcelmosaic/parcelmosaic.toml`).
pub fn config_file_path() -> Result<PathBuf> {
    Ok(config_dir()?.join(CONFIG_FILE_NAME))
}

/// Load the application config from disk. Returns defaults if the file does not exist.
pub fn load_config() -> Result<AppConfig> {
    let path = config_file_path()?;

    if !path.exists() {
        tracing::debug!(?path, "config file not found, using defaults");
        return Ok(AppConfig::default());
    }

    load_config_from(&path)
}

/// Load the application config from a specific file path.
pub fn load_config_from(path: &Path) -> Result<AppConfig> {
    let content = std::fs::read_to_string(path).map_err(|e| MosaicError::io(path, e))?;

    toml::from_str(&content)
        .map_err(|e| MosaicError::config(format!("failed to parse {}: {e}", path.display())))
}

/// Create the config directory and write a default config file.
/// Returns the path to the created file.
pub fn init_config() -> Result<PathBuf> {
    let dir = config_dir()?;
    std::fs::create_dir_all(&dir).map_err(|e| MosaicError::io(&dir, e))?;

    let path = dir.join(CONFIG_FILE_NAME);
    let config = AppConfig::default();
    let content =
        toml::to_string_pretty(&config).map_err(|e| MosaicError::config(e.to_string()))?;

    std::fs::write(&path, content).map_err(|e| MosaicError::io(&path, e))?;
    tracing::info!(?path, "created default config file");

    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_serializes() {
        let config = AppConfig::default();
        let toml_str = toml::to_string_pretty(&config).expect("serialize default config");
        assert!(toml_str.contains("reference_frame"));
        assert!(toml_str.contains("ParcelMosaic.gdb"));
    }

    #[test]
    fn config_roundtrip() {
        let config = AppConfig::default();
        let toml_str = toml::to_string_pretty(&config).expect("serialize");
        let parsed: AppConfig = toml::from_str(&toml_str).expect("deserialize");
        assert_eq!(parsed.run.reference_scale, 1000);
        assert_eq!(parsed.run.layers, vec!["PARCELS".to_string()]);
        assert_eq!(parsed.mosaic.polygons, "Parcels");
        assert!(!parsed.ledger.enabled);
    }

    #[test]
    fn config_with_extra_layers() {
        let toml_str = r#"
[run]
layers = ["PARCELS", "Landuse", "Soils", "Zoning"]
reference_scale = 500

[mosaic]
container = "FO_ParcelMosaic.gdb"
polygons = "FO_Parcels"
lines = "FO_ParcelLines"
"#;
        let config: AppConfig = toml::from_str(toml_str).expect("parse");
        assert_eq!(config.run.layers.len(), 4);
        assert_eq!(config.run.reference_scale, 500);
        assert_eq!(config.mosaic.container, "FO_ParcelMosaic.gdb");
        // Unspecified sections still default
        assert_eq!(config.ledger.file, "processed_units.json");
    }

    #[test]
    fn settings_from_app_config() {
        let app = AppConfig::default();
        let settings = ConversionSettings::from(&app);
        assert_eq!(settings.reference_scale, 1000);
        assert!(
            settings
                .reference_frame
                .contains("NAD_1983_StatePlane_Kansas_South")
        );
        assert_eq!(settings.layers, vec!["PARCELS".to_string()]);
    }
}
