//! Writer configuration.

use std::path::Path;

use anyhow::{Context, Result};
use serde::Deserialize;

/// Output layout of a written document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Packing {
    /// Single `.glb` file; the first buffer becomes the BIN chunk.
    #[default]
    Binary,
    /// `.gltf` JSON plus external `.bin` and image files.
    Separate,
    /// `.gltf` JSON with buffers inlined as base64 data URIs.
    Embedded,
}

/// Options for [`write`](crate::io::write).
///
/// Loadable from TOML:
///
/// ```toml
/// packing = "separate"
/// basename = "robot"
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct WriteOptions {
    #[serde(default)]
    pub packing: Packing,

    /// Stem for generated buffer file names (`<basename>.bin`). Required
    /// whenever a buffer without a URI is written as an external file.
    #[serde(default)]
    pub basename: Option<String>,

    /// `asset.generator` used when the document does not set one.
    #[serde(default = "default_generator")]
    pub generator: String,
}

fn default_generator() -> String {
    concat!("nether-scene ", env!("CARGO_PKG_VERSION")).to_string()
}

impl Default for WriteOptions {
    fn default() -> Self {
        Self {
            packing: Packing::default(),
            basename: None,
            generator: default_generator(),
        }
    }
}

impl WriteOptions {
    pub fn binary() -> Self {
        Self::default()
    }

    pub fn separate(basename: impl Into<String>) -> Self {
        Self {
            packing: Packing::Separate,
            basename: Some(basename.into()),
            ..Self::default()
        }
    }

    pub fn embedded() -> Self {
        Self {
            packing: Packing::Embedded,
            ..Self::default()
        }
    }

    pub fn with_basename(mut self, basename: impl Into<String>) -> Self {
        self.basename = Some(basename.into());
        self
    }

    /// Load options from a TOML file
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read write options: {}", path.display()))?;
        Self::parse(&content)
    }

    /// Parse options from a TOML string
    pub fn parse(content: &str) -> Result<Self> {
        toml::from_str(content).context("Failed to parse write options")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_defaults() {
        let options = WriteOptions::parse("").unwrap();
        assert_eq!(options, WriteOptions::default());
        assert_eq!(options.packing, Packing::Binary);
        assert!(options.generator.starts_with("nether-scene"));
    }

    #[test]
    fn test_parse_separate() {
        let options = WriteOptions::parse(
            r#"
packing = "separate"
basename = "robot"
generator = "exporter"
"#,
        )
        .unwrap();

        assert_eq!(options.packing, Packing::Separate);
        assert_eq!(options.basename.as_deref(), Some("robot"));
        assert_eq!(options.generator, "exporter");
    }

    #[test]
    fn test_parse_invalid_packing() {
        let err = WriteOptions::parse(r#"packing = "zip""#).unwrap_err();
        assert!(err.to_string().contains("Failed to parse write options"));
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("write.toml");
        std::fs::write(&path, "packing = \"embedded\"\n").unwrap();

        let options = WriteOptions::load(&path).unwrap();
        assert_eq!(options.packing, Packing::Embedded);

        assert!(WriteOptions::load(&dir.path().join("missing.toml")).is_err());
    }
}
