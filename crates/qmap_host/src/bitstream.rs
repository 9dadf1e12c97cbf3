use crate::output;
use anyhow::Result;
use qmap_core::bitstream::encode_bitstream;
use std::path::Path;
use tracing::info;

/// Re-encodes the arranged section of an existing artifact.
pub fn reencode(artifact_path: &Path, format: &str) -> Result<()> {
    let arranged = output::load_arranged(artifact_path)?;
    let bits = encode_bitstream(&arranged, format)?;
    info!(shots = arranged.len(), bits = bits.len(), "re-encoded with format {}", format);
    println!("{}", bits);
    Ok(())
}
