//! Pack manifest parsing
//!
//! A manifest names the file format and lists the chunks to pack, in table order:
//!
//! ```toml
//! [format]
//! magic = "SCNE"
//! version = 103
//! compatible_version = 100
//!
//! [[chunks]]
//! id = 1
//! path = "meshes.bin"
//!
//! [[chunks]]
//! id = 2
//! text = "level one"
//!
//! [[chunks]]
//! id = 3
//! hex = "deadbeef"
//! ```

use anyhow::{Context, Result};
use nether_chunk::ChunkFormat;
use serde::Deserialize;
use std::collections::HashSet;
use std::path::{Path, PathBuf};

/// Pack manifest structure
#[derive(Debug, Deserialize)]
pub struct PackManifest {
    pub format: ChunkFormat,
    #[serde(default)]
    pub chunks: Vec<ChunkEntry>,
}

/// One chunk to pack
///
/// Exactly one of `path`, `text` or `hex` supplies the payload.
#[derive(Debug, Deserialize)]
pub struct ChunkEntry {
    pub id: u32,
    /// File to copy verbatim, relative to the manifest's directory
    pub path: Option<PathBuf>,
    /// Inline UTF-8 payload
    pub text: Option<String>,
    /// Inline hex-encoded payload
    pub hex: Option<String>,
}

impl ChunkEntry {
    /// Load the payload bytes
    pub fn payload(&self, base_dir: &Path) -> Result<Vec<u8>> {
        match (&self.path, &self.text, &self.hex) {
            (Some(path), None, None) => {
                let full = base_dir.join(path);
                std::fs::read(&full).with_context(|| {
                    format!("Failed to read chunk {} payload: {}", self.id, full.display())
                })
            }
            (None, Some(text), None) => Ok(text.as_bytes().to_vec()),
            (None, None, Some(hex)) => hex::decode(hex.trim())
                .with_context(|| format!("Invalid hex payload for chunk {}", self.id)),
            _ => anyhow::bail!(
                "Chunk {} must set exactly one of path, text or hex",
                self.id
            ),
        }
    }

    fn source_count(&self) -> usize {
        usize::from(self.path.is_some())
            + usize::from(self.text.is_some())
            + usize::from(self.hex.is_some())
    }
}

impl PackManifest {
    /// Load manifest from file
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read manifest: {}", path.display()))?;
        Self::parse(&content)
    }

    /// Parse manifest from string
    pub fn parse(content: &str) -> Result<Self> {
        let manifest: Self = toml::from_str(content).context("Failed to parse pack manifest")?;
        manifest.validate()?;
        Ok(manifest)
    }

    /// Chunk IDs in table order
    pub fn ids(&self) -> Vec<u32> {
        self.chunks.iter().map(|c| c.id).collect()
    }

    /// Validate manifest fields
    pub fn validate(&self) -> Result<()> {
        let mut seen = HashSet::new();
        for chunk in &self.chunks {
            if !seen.insert(chunk.id) {
                anyhow::bail!("Duplicate chunk id {} in manifest", chunk.id);
            }
            if chunk.source_count() != 1 {
                anyhow::bail!(
                    "Chunk {} must set exactly one of path, text or hex",
                    chunk.id
                );
            }
        }

        if self.format.compatible_version > self.format.version {
            tracing::warn!(
                "compatible_version {} is newer than version {}",
                self.format.compatible_version,
                self.format.version
            );
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_manifest_minimal() {
        let manifest = PackManifest::parse(
            r#"
[format]
magic = "TEST"
version = 103
compatible_version = 100
"#,
        )
        .unwrap();

        assert_eq!(manifest.format.magic.as_bytes(), b"TEST");
        assert_eq!(manifest.format.version, 103);
        assert_eq!(manifest.format.compatible_version, 100);
        assert_eq!(manifest.format.flags, 0);
        assert!(manifest.chunks.is_empty());
    }

    #[test]
    fn test_manifest_with_chunks() {
        let manifest = PackManifest::parse(
            r#"
[format]
magic = "SCNE"
version = 2
compatible_version = 1
flags = 7

[[chunks]]
id = 5
text = "hello"

[[chunks]]
id = 1
hex = "00ff10"
"#,
        )
        .unwrap();

        assert_eq!(manifest.format.flags, 7);
        assert_eq!(manifest.ids(), vec![5, 1]);

        let base = Path::new(".");
        assert_eq!(manifest.chunks[0].payload(base).unwrap(), b"hello");
        assert_eq!(manifest.chunks[1].payload(base).unwrap(), vec![0x00, 0xFF, 0x10]);
    }

    #[test]
    fn test_manifest_path_relative_to_base() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("data.bin"), [1u8, 2, 3]).unwrap();

        let manifest = PackManifest::parse(
            r#"
[format]
magic = "TEST"
version = 1
compatible_version = 1

[[chunks]]
id = 9
path = "data.bin"
"#,
        )
        .unwrap();

        assert_eq!(manifest.chunks[0].payload(dir.path()).unwrap(), vec![1, 2, 3]);
        assert!(manifest.chunks[0].payload(Path::new("/nonexistent")).is_err());
    }

    #[test]
    fn test_manifest_bad_magic() {
        let result = PackManifest::parse(
            r#"
[format]
magic = "TOOLONG"
version = 1
compatible_version = 1
"#,
        );
        assert!(result.is_err());
    }

    #[test]
    fn test_manifest_duplicate_ids() {
        let result = PackManifest::parse(
            r#"
[format]
magic = "TEST"
version = 1
compatible_version = 1

[[chunks]]
id = 1
text = "a"

[[chunks]]
id = 1
text = "b"
"#,
        );
        let err = result.unwrap_err();
        assert!(err.to_string().contains("Duplicate chunk id 1"));
    }

    #[test]
    fn test_manifest_payload_sources() {
        let none = r#"
[format]
magic = "TEST"
version = 1
compatible_version = 1

[[chunks]]
id = 1
"#;
        assert!(PackManifest::parse(none).is_err());

        let both = r#"
[format]
magic = "TEST"
version = 1
compatible_version = 1

[[chunks]]
id = 1
text = "a"
hex = "00"
"#;
        assert!(PackManifest::parse(both).is_err());
    }

    #[test]
    fn test_manifest_invalid_hex() {
        let manifest = PackManifest::parse(
            r#"
[format]
magic = "TEST"
version = 1
compatible_version = 1

[[chunks]]
id = 1
hex = "xyz"
"#,
        )
        .unwrap();
        assert!(manifest.chunks[0].payload(Path::new(".")).is_err());
    }
}
