//! Configuration module

use crate::codec::{Algorithm, DEFAULT_LEVEL};
use crate::ignore::IGNORE_FILE_NAME;
use crate::security::DEFAULT_MAX_EXTRACTION_SIZE;
use crate::{Error, Result};
use dirs::config_dir;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Main configuration structure
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Codec settings
    #[serde(default)]
    pub codec: CodecConfig,
    /// Packing and extraction settings
    #[serde(default)]
    pub archive: ArchiveConfig,
}

/// Codec configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CodecConfig {
    /// Compression algorithm used for every entry
    pub algorithm: Algorithm,
    /// Compression level
    pub level: u32,
}

impl Default for CodecConfig {
    fn default() -> Self {
        Self {
            algorithm: Algorithm::default(),
            level: DEFAULT_LEVEL,
        }
    }
}

/// Archive configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ArchiveConfig {
    /// Skip files listed in the ignore file
    pub use_ignore_file: bool,
    /// Name of the ignore file at the root of the input directory
    pub ignore_file_name: String,
    /// Follow symlinks when packing
    pub follow_symlinks: bool,
    /// Total decompressed bytes allowed when extracting
    #[serde(deserialize_with = "deserialize_size")]
    pub max_extraction_size: u64,
}

impl Default for ArchiveConfig {
    fn default() -> Self {
        Self {
            use_ignore_file: true,
            ignore_file_name: IGNORE_FILE_NAME.to_string(),
            follow_symlinks: false,
            max_extraction_size: DEFAULT_MAX_EXTRACTION_SIZE,
        }
    }
}

/// Size given either as a byte count or a string like "512MiB"
#[derive(Deserialize)]
#[serde(untagged)]
enum SizeValue {
    Numeric(u64),
    String(String),
}

fn deserialize_size<'de, D>(deserializer: D) -> std::result::Result<u64, D::Error>
where
    D: serde::Deserializer<'de>,
{
    use serde::de::Error;

    match SizeValue::deserialize(deserializer)? {
        SizeValue::Numeric(bytes) => Ok(bytes),
        SizeValue::String(text) => parse_size(&text)
            .map_err(|e| D::Error::custom(format!("Failed to parse size: {}", e))),
    }
}

/// Parse size string like "100MiB" to bytes
pub fn parse_size(size_str: &str) -> Result<u64> {
    let size_str = size_str.trim();

    // Try to parse as plain number first
    if let Ok(bytes) = size_str.parse::<u64>() {
        return Ok(bytes);
    }

    // Find where the number ends and unit begins
    let split_pos = size_str
        .chars()
        .position(|c| !c.is_ascii_digit() && c != '.')
        .unwrap_or(size_str.len());

    if split_pos == 0 {
        return Err(Error::Config(format!("Invalid size format: {}", size_str)));
    }

    let (number_part, unit_part) = size_str.split_at(split_pos);
    let number: f64 = number_part
        .parse()
        .map_err(|_| Error::Config(format!("Invalid number in size: {}", number_part)))?;

    let multiplier: u64 = match unit_part.trim().to_lowercase().as_str() {
        "" | "b" => 1,
        "k" | "kb" => 1_000,
        "m" | "mb" => 1_000_000,
        "g" | "gb" => 1_000_000_000,
        "t" | "tb" => 1_000_000_000_000,
        "ki" | "kib" => 1_024,
        "mi" | "mib" => 1_048_576,
        "gi" | "gib" => 1_073_741_824,
        "ti" | "tib" => 1_099_511_627_776,
        _ => return Err(Error::Config(format!("Unknown size unit: {}", unit_part))),
    };

    Ok((number * multiplier as f64) as u64)
}

impl Config {
    /// Default configuration file path
    pub fn config_path() -> Result<PathBuf> {
        let config_dir = config_dir()
            .ok_or_else(|| Error::Config("Unable to determine config directory".to_string()))?;
        Ok(config_dir.join("bfs").join("config.toml"))
    }

    /// Get default configuration content with comments
    pub fn default_config_content() -> String {
        r#"# BFS Configuration File

[codec]
# Compression algorithm: store, lz4, zstd, gzip, xz, brotli
# Archives must be extracted with the algorithm they were packed with.
algorithm = "zstd"
# Compression level (ignored by store and lz4)
level = 3

[archive]
# Skip the files listed in the ignore file at the root of the input directory
use_ignore_file = true
# Name of the ignore file; it is never packed while the list is in use
ignore_file_name = "BFS_IGNORE"
# Pack symlink targets instead of skipping links
follow_symlinks = false
# Upper bound on the bytes written by a single extraction
max_extraction_size = "10GiB"
"#
        .to_string()
    }

    /// Parse configuration text
    pub fn from_toml(contents: &str) -> Result<Self> {
        toml::from_str(contents).map_err(|e| Error::Config(format!("Failed to parse config: {}", e)))
    }

    /// Load configuration from a specific file
    pub fn load_from<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path)?;
        debug!(path = ?path, "Loaded configuration");
        Self::from_toml(&contents)
    }

    /// Load configuration from the default location. A missing file yields
    /// the defaults.
    pub fn load() -> Result<Self> {
        let path = Self::config_path()?;
        if !path.exists() {
            debug!(path = ?path, "No configuration file, using defaults");
            return Ok(Self::default());
        }
        Self::load_from(path)
    }

    /// Save configuration to a file
    pub fn save_to<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let contents = toml::to_string_pretty(self)
            .map_err(|e| Error::Config(format!("Failed to serialize config: {}", e)))?;
        fs::write(path, contents)?;
        Ok(())
    }
}
