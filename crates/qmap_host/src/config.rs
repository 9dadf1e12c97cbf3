//! Job configuration loaded from TOML.
//!
//! Every key has a default, so an empty file (or no file at all) is a valid
//! configuration. Command line flags override file values in `main`.

use anyhow::{Context, Result};
use qmap_core::bitstream::SectionFormat;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub parameters: ParametersConfig,

    #[serde(default)]
    pub mapping: MappingConfig,

    #[serde(default)]
    pub bitstream: BitstreamConfig,

    #[serde(default)]
    pub output: OutputConfig,
}

/// Experiment parameters describing the circuit that was sampled.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ParametersConfig {
    /// Free-form circuit family label, e.g. `surface_code:rotated_memory_x`.
    #[serde(default)]
    pub task: Option<String>,

    /// Code distance; enables the surface code width check when set.
    #[serde(default)]
    pub distance: Option<usize>,

    /// Measurement rounds; inferred from the circuit when unset.
    #[serde(default)]
    pub rounds: Option<usize>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MappingConfig {
    /// Log role sets and per-shot summaries at info level.
    #[serde(default)]
    pub console_log: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BitstreamConfig {
    #[serde(default)]
    pub exporting: bool,

    /// Section order over `x`, `z`, `d`.
    #[serde(default = "default_format")]
    pub format: String,

    #[serde(default)]
    pub console_log: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputConfig {
    #[serde(default = "default_output_file")]
    pub file: PathBuf,

    #[serde(default)]
    pub prettify: bool,

    /// Also write a compact copy named after its content hash.
    #[serde(default)]
    pub hashed_copy: bool,
}

fn default_format() -> String {
    SectionFormat::default().to_string()
}

fn default_output_file() -> PathBuf {
    PathBuf::from("output.json")
}

impl Default for BitstreamConfig {
    fn default() -> Self {
        Self {
            exporting: false,
            format: default_format(),
            console_log: false,
        }
    }
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            file: default_output_file(),
            prettify: false,
            hashed_copy: false,
        }
    }
}

impl Config {
    /// Loads a config file, or the defaults when no path is given.
    ///
    /// A path that was given explicitly but cannot be read is an error.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let Some(path) = path else {
            return Ok(Self::default());
        };

        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Config file '{}' not found", path.display()))?;
        let config: Config = toml::from_str(&content).context("Failed to parse config file")?;
        config.validate()?;
        Ok(config)
    }

    /// Rejects a bitstream format before any work is done.
    pub fn validate(&self) -> Result<()> {
        self.bitstream
            .format
            .parse::<SectionFormat>()
            .context("Bad config: bitstream.format")?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults() {
        let config = Config::load(None).unwrap();
        assert_eq!(config.bitstream.format, "zxd");
        assert!(!config.bitstream.exporting);
        assert_eq!(config.output.file, PathBuf::from("output.json"));
        assert!(config.parameters.rounds.is_none());
    }

    #[test]
    fn test_partial_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        let text = r#"
[parameters]
distance = 3
rounds = 2

[bitstream]
exporting = true
format = "xzd"
"#;
        file.write_all(text.as_bytes()).unwrap();

        let config = Config::load(Some(file.path())).unwrap();
        assert_eq!(config.parameters.distance, Some(3));
        assert_eq!(config.parameters.rounds, Some(2));
        assert!(config.bitstream.exporting);
        assert_eq!(config.bitstream.format, "xzd");
        assert!(!config.output.prettify);
    }

    #[test]
    fn test_bad_format_rejected() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[bitstream]\nformat = \"xyz\"").unwrap();
        let err = Config::load(Some(file.path())).unwrap_err();
        assert!(format!("{err:#}").contains("'y'"));
    }

    #[test]
    fn test_missing_file() {
        assert!(Config::load(Some(Path::new("/nonexistent/qmap.toml"))).is_err());
    }
}
