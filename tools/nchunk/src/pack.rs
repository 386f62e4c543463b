//! Pack command - build a chunk file from a TOML manifest

use anyhow::{Context, Result};
use clap::Args;
use nether_chunk::{ChunkDesc, ChunkWriter};
use std::fs::File;
use std::io::{BufWriter, Seek, Write};
use std::path::{Path, PathBuf};

use crate::manifest::PackManifest;

/// Arguments for the pack command
#[derive(Args)]
pub struct PackArgs {
    /// Path to the pack manifest
    pub manifest: PathBuf,

    /// Output file path (defaults to the manifest path with a .chunk extension)
    #[arg(short, long)]
    pub output: Option<PathBuf>,
}

/// Execute the pack command
pub fn execute(args: PackArgs) -> Result<()> {
    let manifest = PackManifest::load(&args.manifest)?;

    // Payload paths are relative to the manifest
    let base_dir = args
        .manifest
        .parent()
        .unwrap_or_else(|| Path::new("."));
    let output = args
        .output
        .unwrap_or_else(|| args.manifest.with_extension("chunk"));

    let file = File::create(&output)
        .with_context(|| format!("Failed to create {}", output.display()))?;
    let descs = pack_chunks(&manifest, base_dir, BufWriter::new(file))
        .with_context(|| format!("Failed to pack {}", output.display()))?;

    let payload: u64 = descs.iter().map(|d| u64::from(d.size)).sum();
    tracing::info!(
        "Packed {} chunk(s), {} payload bytes, format {} v{} -> {}",
        descs.len(),
        payload,
        manifest.format.magic,
        manifest.format.version_string(),
        output.display()
    );

    Ok(())
}

/// Write the header, chunk table and every payload of `manifest` to `stream`
///
/// Returns the final descriptors in table order.
pub fn pack_chunks<W: Write + Seek>(
    manifest: &PackManifest,
    base_dir: &Path,
    stream: W,
) -> Result<Vec<ChunkDesc>> {
    let mut writer = ChunkWriter::new(stream);
    writer.write_format(&manifest.format)?;
    writer.write_chunk_table(&manifest.ids())?;

    let mut descs = Vec::with_capacity(manifest.chunks.len());
    for entry in &manifest.chunks {
        let payload = entry.payload(base_dir)?;

        writer.begin_chunk(entry.id)?;
        writer.write_bytes(&payload)?;
        let desc = writer.end_chunk(entry.id)?;

        tracing::debug!(
            "Chunk {}: {} bytes at 0x{:X}",
            desc.id,
            desc.size,
            desc.offset
        );
        descs.push(desc);
    }

    writer.finish()?;
    Ok(descs)
}

#[cfg(test)]
mod tests {
    use super::*;
    use nether_chunk::ChunkReader;
    use std::io::Cursor;

    #[test]
    fn test_pack_and_read_back() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("mesh.bin"), [9u8; 32]).unwrap();

        let manifest = PackManifest::parse(
            r#"
[format]
magic = "SCNE"
version = 103
compatible_version = 100
flags = 1

[[chunks]]
id = 2
text = "level one"

[[chunks]]
id = 1
path = "mesh.bin"

[[chunks]]
id = 7
hex = "cafe"
"#,
        )
        .unwrap();

        let mut buf = Cursor::new(Vec::new());
        let descs = pack_chunks(&manifest, dir.path(), &mut buf).unwrap();
        assert_eq!(descs.len(), 3);

        // Header + table (4 + 3 * 12) then payloads in manifest order
        let table_end = (12 + 4 + 3 * 12) as u32;
        assert_eq!(descs[0], ChunkDesc::new(2, table_end, 9));
        assert_eq!(descs[1], ChunkDesc::new(1, table_end + 9, 32));
        assert_eq!(descs[2], ChunkDesc::new(7, table_end + 41, 2));

        let mut reader = ChunkReader::new(Cursor::new(buf.into_inner()));
        let header = reader.read_header("SCNE", 100).unwrap();
        assert_eq!(header.flags, 1);
        assert_eq!(reader.read_chunk_table().unwrap(), vec![2, 1, 7]);
        assert_eq!(reader.read_chunk(2).unwrap().unwrap(), b"level one");
        assert_eq!(reader.read_chunk(1).unwrap().unwrap(), vec![9u8; 32]);
        assert_eq!(reader.read_chunk(7).unwrap().unwrap(), vec![0xCA, 0xFE]);
        assert!(reader.read_chunk(3).unwrap().is_none());
    }

    #[test]
    fn test_pack_missing_payload_file() {
        let dir = tempfile::tempdir().unwrap();
        let manifest = PackManifest::parse(
            r#"
[format]
magic = "TEST"
version = 1
compatible_version = 1

[[chunks]]
id = 1
path = "missing.bin"
"#,
        )
        .unwrap();

        let result = pack_chunks(&manifest, dir.path(), Cursor::new(Vec::new()));
        assert!(result.is_err());
    }

    #[test]
    fn test_pack_to_file() {
        let dir = tempfile::tempdir().unwrap();
        let manifest_path = dir.path().join("scene.toml");
        std::fs::write(
            &manifest_path,
            r#"
[format]
magic = "TEST"
version = 1
compatible_version = 1

[[chunks]]
id = 4
text = "abc"
"#,
        )
        .unwrap();

        execute(PackArgs {
            manifest: manifest_path.clone(),
            output: None,
        })
        .unwrap();

        let bytes = std::fs::read(dir.path().join("scene.chunk")).unwrap();
        let mut reader = ChunkReader::new(Cursor::new(bytes));
        reader.read_header("TEST", 1).unwrap();
        reader.read_chunk_table().unwrap();
        assert_eq!(reader.read_chunk(4).unwrap().unwrap(), b"abc");
    }
}
