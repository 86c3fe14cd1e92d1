//! Reader configuration.
//!
//! Every tunable constant used by the extractor, the annotation capture, the
//! margin layout and the viewport tracker lives here. Values are layered with
//! figment: built-in defaults, then an optional TOML file, then environment
//! variables prefixed with `MARGINALIA_` (nested keys split on `__`, e.g.
//! `MARGINALIA_MARGIN__GAP=12`).

use std::path::Path;
use std::time::Duration;

use figment::Figment;
use figment::providers::{Env, Format, Serialized, Toml};
use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Top-level configuration.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ReaderConfig {
    pub archive: ArchiveConfig,
    pub annotations: AnnotationConfig,
    pub margin: MarginConfig,
    pub viewport: ViewportConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ArchiveConfig {
    /// Bound on inflated output, as a multiple of the compressed length,
    /// for entries that declare no uncompressed size. Also caps the buffer
    /// preallocated for any entry.
    pub inflate_fallback_multiple: usize,
}

impl Default for ArchiveConfig {
    fn default() -> Self {
        Self {
            inflate_fallback_multiple: 8,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnnotationConfig {
    /// Characters of plain text captured on each side of a selection.
    pub context_chars: usize,
}

impl Default for AnnotationConfig {
    fn default() -> Self {
        Self { context_chars: 500 }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MarginConfig {
    /// Downward displacement beyond which a note may move to the overflow column.
    pub overflow_threshold: f64,
    /// Vertical gap kept between consecutive notes in one column.
    pub gap: f64,
}

impl Default for MarginConfig {
    fn default() -> Self {
        Self {
            overflow_threshold: 40.0,
            gap: 8.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ViewportConfig {
    pub debounce_ms: u64,
    pub settle_ms: u64,
    /// Lowest top edge (relative to the active zone) still eligible as the current anchor.
    pub top_tolerance: f64,
    /// Scroll fraction in the last chapter past which a book counts as finished.
    pub finished_threshold: f64,
}

impl Default for ViewportConfig {
    fn default() -> Self {
        Self {
            debounce_ms: 100,
            settle_ms: 300,
            top_tolerance: -100.0,
            finished_threshold: 0.9,
        }
    }
}

impl ViewportConfig {
    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }

    pub fn settle(&self) -> Duration {
        Duration::from_millis(self.settle_ms)
    }
}

impl ReaderConfig {
    /// Load configuration from defaults, an optional TOML file and the environment.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut figment = Figment::from(Serialized::defaults(ReaderConfig::default()));
        if let Some(path) = path {
            figment = figment.merge(Toml::file(path));
        }
        let config = figment
            .merge(Env::prefixed("MARGINALIA_").split("__"))
            .extract()?;
        tracing::debug!(?config, "Loaded reader configuration");
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults_match_reference_values() {
        let config = ReaderConfig::default();
        assert_eq!(config.annotations.context_chars, 500);
        assert_eq!(config.margin.overflow_threshold, 40.0);
        assert_eq!(config.margin.gap, 8.0);
        assert_eq!(config.viewport.debounce(), Duration::from_millis(100));
        assert_eq!(config.viewport.settle(), Duration::from_millis(300));
        assert_eq!(config.viewport.top_tolerance, -100.0);
        assert_eq!(config.viewport.finished_threshold, 0.9);
    }

    #[test]
    fn test_toml_file_overrides_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[margin]\ngap = 12.0\n\n[viewport]\nsettle_ms = 500").unwrap();

        let config = ReaderConfig::load(Some(file.path())).unwrap();
        assert_eq!(config.margin.gap, 12.0);
        assert_eq!(config.margin.overflow_threshold, 40.0);
        assert_eq!(config.viewport.settle_ms, 500);
        assert_eq!(config.viewport.debounce_ms, 100);
    }

    #[test]
    fn test_malformed_file_is_config_error() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[margin]\ngap = \"wide\"").unwrap();

        let err = ReaderConfig::load(Some(file.path())).unwrap_err();
        assert!(matches!(err, crate::Error::Config(_)));
    }
}
