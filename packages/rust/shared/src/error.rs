//! Error types for ParcelMosaic.
//!
//! Library crates use [`MosaicError`] via `thiserror`.
//! The CLI wraps this with `color-eyre` for rich diagnostics.

use std::path::PathBuf;

/// Top-level error type for all ParcelMosaic operations.
#[derive(Debug, thiserror::Error)]
pub enum MosaicError {
    /// Work discovery failure (root or subdivision unreadable). Fatal to the run.
    #[error("discovery error: {message}")]
    Discovery { message: String },

    /// CAD import or conversion failure. Fatal to the current map unit only.
    #[error("conversion error for unit {unit}: {message}")]
    Conversion { unit: String, message: String },

    /// A single layer request's filter/copy failed. Isolated per request.
    #[error("layer extraction error for layer {layer}: {message}")]
    LayerExtraction { layer: String, message: String },

    /// Mosaic create/append failure for one target.
    #[error("accumulation error for {target}: {message}")]
    Accumulation { target: String, message: String },

    /// Error reported by the geospatial conversion engine.
    #[error("engine error: {0}")]
    Engine(String),

    /// Configuration loading or validation error.
    #[error("config error: {message}")]
    Config { message: String },

    /// Filesystem I/O error.
    #[error("I/O error at {path:?}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Data validation error (bad unit name, malformed ledger, etc.).
    #[error("validation error: {message}")]
    Validation { message: String },
}

/// Convenience alias used throughout the codebase.
pub type Result<T> = std::result::Result<T, MosaicError>;

impl MosaicError {
    /// Create a discovery error from any displayable message.
    pub fn discovery(msg: impl Into<String>) -> Self {
        Self::Discovery {
            message: msg.into(),
        }
    }

    /// Create a conversion error scoped to one map unit.
    pub fn conversion(unit: impl Into<String>, msg: impl Into<String>) -> Self {
        Self::Conversion {
            unit: unit.into(),
            message: msg.into(),
        }
    }

    /// Create a layer extraction error scoped to one layer request.
    pub fn layer(layer: impl Into<String>, msg: impl Into<String>) -> Self {
        Self::LayerExtraction {
            layer: layer.into(),
            message: msg.into(),
        }
    }

    /// Create an accumulation error scoped to one mosaic target.
    pub fn accumulation(target: impl Into<String>, msg: impl Into<String>) -> Self {
        Self::Accumulation {
            target: target.into(),
            message: msg.into(),
        }
    }

    /// Create a config error from any displayable message.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config {
            message: msg.into(),
        }
    }

    /// Create a validation error from any displayable message.
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation {
            message: msg.into(),
        }
    }

    /// Wrap a `std::io::Error` with a path for context.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display_formatting() {
        let err = MosaicError::discovery("root directory not found");
        assert_eq!(err.to_string(), "discovery error: root directory not found");

        let err = MosaicError::conversion("T5S_R10E_01", "CAD source unreadable");
        assert!(err.to_string().contains("T5S_R10E_01"));
        assert!(err.to_string().contains("CAD source unreadable"));

        let err = MosaicError::layer("PARCELS", "filter failed");
        assert_eq!(
            err.to_string(),
            "layer extraction error for layer PARCELS: filter failed"
        );
    }
}
