//! Extract command - copy one chunk's payload out of a chunk file

use anyhow::{Context, Result};
use clap::Args;
use std::path::PathBuf;

use crate::info::open_chunk_file;

/// Bytes per hex dump line
const DUMP_WIDTH: usize = 16;

/// Arguments for the extract command
#[derive(Args)]
pub struct ExtractArgs {
    /// Chunk file to read
    pub file: PathBuf,

    /// Expected 4-character file signature (e.g. "SCNE")
    #[arg(long)]
    pub magic: String,

    /// Chunk ID to extract
    #[arg(long)]
    pub id: u32,

    /// Reader version to request (defaults to accepting any file)
    #[arg(long, default_value_t = u16::MAX)]
    pub version: u16,

    /// Write the payload to this file instead of dumping it as hex
    #[arg(short, long)]
    pub output: Option<PathBuf>,
}

/// Execute the extract command
pub fn execute(args: ExtractArgs) -> Result<()> {
    let mut reader = open_chunk_file(&args.file, &args.magic, args.version)?;

    let payload = reader
        .read_chunk(args.id)
        .with_context(|| format!("Failed to read chunk {}", args.id))?
        .with_context(|| format!("Chunk {} not found in {}", args.id, args.file.display()))?;

    match args.output {
        Some(path) => {
            std::fs::write(&path, &payload)
                .with_context(|| format!("Failed to write {}", path.display()))?;
            tracing::info!(
                "Extracted chunk {} ({} bytes) to {}",
                args.id,
                payload.len(),
                path.display()
            );
        }
        None => {
            for line in hex_dump(&payload) {
                println!("{line}");
            }
        }
    }

    Ok(())
}

/// Format `data` as `offset  hex bytes` lines
fn hex_dump(data: &[u8]) -> Vec<String> {
    data.chunks(DUMP_WIDTH)
        .enumerate()
        .map(|(i, line)| {
            let bytes: Vec<String> = line.iter().map(|b| hex::encode([*b])).collect();
            format!("{:08X}  {}", i * DUMP_WIDTH, bytes.join(" "))
        })
        .collect()
}
