//! Info command - validate a chunk file and list its chunk table

use anyhow::{Context, Result};
use clap::Args;
use nether_chunk::ChunkReader;
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};

/// Arguments for the info command
#[derive(Args)]
pub struct InfoArgs {
    /// Chunk file to inspect
    pub file: PathBuf,

    /// Expected 4-character file signature (e.g. "SCNE")
    #[arg(long)]
    pub magic: String,

    /// Reader version to request (defaults to accepting any file)
    #[arg(long, default_value_t = u16::MAX)]
    pub version: u16,
}

/// Open a chunk file, validate its header and read its chunk table
pub(crate) fn open_chunk_file(
    path: &Path,
    magic: &str,
    version: u16,
) -> Result<ChunkReader<BufReader<File>>> {
    let file =
        File::open(path).with_context(|| format!("Failed to open {}", path.display()))?;
    let mut reader = ChunkReader::new(BufReader::new(file));

    reader
        .read_header(magic, version)
        .with_context(|| format!("Failed to read header of {}", path.display()))?;
    reader
        .read_chunk_table()
        .with_context(|| format!("Failed to read chunk table of {}", path.display()))?;

    Ok(reader)
}

/// Execute the info command
pub fn execute(args: InfoArgs) -> Result<()> {
    let reader = open_chunk_file(&args.file, &args.magic, args.version)?;
    let file_len = std::fs::metadata(&args.file)
        .with_context(|| format!("Failed to stat {}", args.file.display()))?
        .len();

    // read_header succeeded, so the header is present
    let Some(header) = reader.header() else {
        anyhow::bail!("No header read from {}", args.file.display());
    };

    println!("=== {} ===", args.file.display());
    println!("  Magic:              {}", header.magic());
    println!("  Version:            {}", header.version_string());
    println!(
        "  Compatible version: {}",
        nether_chunk::version_string(header.compatible_version)
    );
    println!("  Flags:              0x{:08X}", header.flags);
    println!("  Chunks:             {}", reader.chunk_ids().len());
    println!();
    println!("  {:>10}  {:>10}  {:>10}", "ID", "OFFSET", "SIZE");

    let mut out_of_bounds = 0;
    for desc in reader.chunks() {
        println!(
            "  {:>10}  0x{:08X}  {:>10}",
            desc.id, desc.offset, desc.size
        );
        if desc.end() > file_len {
            tracing::warn!(
                "Chunk {} ends at 0x{:X}, past the end of the file (0x{:X})",
                desc.id,
                desc.end(),
                file_len
            );
            out_of_bounds += 1;
        }
    }

    if out_of_bounds > 0 {
        anyhow::bail!("{} chunk(s) extend past the end of the file", out_of_bounds);
    }

    Ok(())
}
