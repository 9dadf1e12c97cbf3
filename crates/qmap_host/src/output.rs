//! JSON artifact export.
//!
//! The artifact bundles the job configuration, the circuit text, and the
//! measurements at every stage: raw rows, labeled tuples, the arranged
//! result, and the optional bitstream.

use crate::config::Config;
use anyhow::{Context, Result};
use qmap_core::arrange::ArrangedResult;
use qmap_core::demux::LabeledMeasurement;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

#[derive(Serialize)]
pub struct Artifact<'a> {
    pub config: &'a Config,
    pub circuit_text: Option<&'a str>,
    pub measurements: Measurements<'a>,
}

#[derive(Serialize)]
pub struct Measurements<'a> {
    pub raw: &'a [Vec<bool>],
    pub mapped: &'a [Vec<LabeledMeasurement>],
    pub mapped_ordered: &'a ArrangedResult,
    pub bitstream: Option<&'a str>,
}

/// The part of a stored artifact needed to re-encode it.
#[derive(Deserialize)]
struct StoredArtifact {
    measurements: StoredMeasurements,
}

#[derive(Deserialize)]
struct StoredMeasurements {
    mapped_ordered: ArrangedResult,
}

/// Writes the artifact to `path`, pretty-printed if requested.
pub fn write_artifact(path: &Path, artifact: &Artifact<'_>, prettify: bool) -> Result<()> {
    if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
        std::fs::create_dir_all(dir)
            .with_context(|| format!("Failed to create output directory {}", dir.display()))?;
    }

    let file = File::create(path).with_context(|| format!("Failed to create {}", path.display()))?;
    let mut writer = BufWriter::new(file);
    if prettify {
        serde_json::to_writer_pretty(&mut writer, artifact)?;
    } else {
        serde_json::to_writer(&mut writer, artifact)?;
    }
    writer.flush()?;
    Ok(())
}

/// Writes a compact copy next to `path`, named by the first 16 hex digits of
/// SHA-256 over the content followed by `timestamp`.
pub fn write_hashed_copy(path: &Path, artifact: &Artifact<'_>, timestamp: &str) -> Result<PathBuf> {
    let serialized = serde_json::to_vec(artifact)?;
    let name = content_hash(&serialized, timestamp);

    let dir = path
        .parent()
        .filter(|d| !d.as_os_str().is_empty())
        .unwrap_or(Path::new("."));
    let hashed = dir.join(format!("{name}.json"));
    std::fs::write(&hashed, &serialized)
        .with_context(|| format!("Failed to write {}", hashed.display()))?;
    Ok(hashed)
}

fn content_hash(content: &[u8], timestamp: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(content);
    hasher.update(timestamp.as_bytes());
    let digest = format!("{:x}", hasher.finalize());
    digest[..16].to_owned()
}

/// Loads the arranged section of a previously written artifact.
pub fn load_arranged(path: &Path) -> Result<ArrangedResult> {
    let file = File::open(path).with_context(|| format!("Failed to open {}", path.display()))?;
    let stored: StoredArtifact = serde_json::from_reader(BufReader::new(file))
        .with_context(|| format!("{} is not a mapping artifact", path.display()))?;
    Ok(stored.measurements.mapped_ordered)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_content_hash_depends_on_timestamp() {
        let a = content_hash(b"{}", "20260101-000000");
        let b = content_hash(b"{}", "20260101-000001");
        assert_eq!(a.len(), 16);
        assert!(a.chars().all(|c| c.is_ascii_hexdigit()));
        assert_ne!(a, b);
        assert_eq!(a, content_hash(b"{}", "20260101-000000"));
    }

    #[test]
    fn test_write_and_reload() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out").join("result.json");
        let config = Config::default();
        let arranged = ArrangedResult::default();
        let artifact = Artifact {
            config: &config,
            circuit_text: Some("M 0\n"),
            measurements: Measurements {
                raw: &[],
                mapped: &[],
                mapped_ordered: &arranged,
                bitstream: None,
            },
        };

        write_artifact(&path, &artifact, true).unwrap();
        assert!(load_arranged(&path).unwrap().is_empty());

        let hashed = write_hashed_copy(&path, &artifact, "20260101-000000").unwrap();
        assert_eq!(hashed.parent(), path.parent());
        let text = std::fs::read_to_string(hashed).unwrap();
        assert!(text.starts_with(r#"{"config":"#));
        assert!(text.contains(r#""bitstream":null"#));
    }
}
