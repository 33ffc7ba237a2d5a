//! Archive operations module
//!
//! Layout of a BFS archive (all integers little-endian):
//!
//! ```text
//! 'B' 'F' 'S'
//! repeated:
//!   path bytes (UTF-8, '/'-separated)  0x00
//!   u32 compressed length N
//!   N bytes of compressed payload
//! ```
//!
//! There is no entry count and no index; see [`decoder`].

pub mod decoder;
pub mod encoder;
pub mod writer;

use crate::codec::{Algorithm, DEFAULT_LEVEL};
use crate::config::Config;
use crate::ignore::{IgnoreList, IGNORE_FILE_NAME};
use crate::progress::{NoProgress, Operation, ProgressObserver};
use crate::security::DEFAULT_MAX_EXTRACTION_SIZE;
use crate::walker::{relative_path, DirectoryWalker};
use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use tracing::{debug, info};

pub use decoder::{
    decode, inspect, ArchiveDecoder, Cursor, DecodeLimits, DecodeSummary, RawEntry,
};
pub use encoder::{encode, ArchiveEncoder};
pub use writer::{DiskWriter, FileSystemWriter, MemoryWriter};

/// Archive signature
pub const MAGIC: [u8; 3] = *b"BFS";

/// Size of the compressed-length field
pub const LENGTH_FIELD_SIZE: usize = 4;

/// Archive entry information
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArchiveEntry {
    /// Path within the archive
    pub path: String,
    /// Offset of the entry within the archive
    pub offset: u64,
    /// Compressed size in bytes
    pub compressed_size: u64,
    /// Original size in bytes
    pub size: u64,
}

/// Options for packing a directory
#[derive(Debug, Clone)]
pub struct PackOptions {
    /// Codec applied to every file
    pub algorithm: Algorithm,
    /// Compression level
    pub level: u32,
    /// Honour the ignore list at the root of the input directory
    pub use_ignore_file: bool,
    /// Name of the ignore list
    pub ignore_file_name: String,
    /// Follow symlinks (pack link targets instead of skipping links)
    pub follow_symlinks: bool,
}

impl Default for PackOptions {
    fn default() -> Self {
        Self {
            algorithm: Algorithm::default(),
            level: DEFAULT_LEVEL,
            use_ignore_file: true,
            ignore_file_name: IGNORE_FILE_NAME.to_string(),
            follow_symlinks: false,
        }
    }
}

impl PackOptions {
    pub fn from_config(config: &Config) -> Self {
        Self {
            algorithm: config.codec.algorithm,
            level: config.codec.level,
            use_ignore_file: config.archive.use_ignore_file,
            ignore_file_name: config.archive.ignore_file_name.clone(),
            follow_symlinks: config.archive.follow_symlinks,
        }
    }
}

/// Options for extracting an archive
#[derive(Debug, Clone)]
pub struct ExtractOptions {
    /// Codec the archive was written with
    pub algorithm: Algorithm,
    /// Compression level (only relevant for building the codec)
    pub level: u32,
    /// Total decompressed bytes allowed
    pub max_extraction_size: u64,
}

impl Default for ExtractOptions {
    fn default() -> Self {
        Self {
            algorithm: Algorithm::default(),
            level: DEFAULT_LEVEL,
            max_extraction_size: DEFAULT_MAX_EXTRACTION_SIZE,
        }
    }
}

impl ExtractOptions {
    pub fn from_config(config: &Config) -> Self {
        Self {
            algorithm: config.codec.algorithm,
            level: config.codec.level,
            max_extraction_size: config.archive.max_extraction_size,
        }
    }
}

/// Result of a pack operation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PackSummary {
    pub entries: usize,
    pub archive_size: u64,
}

/// Pack a directory into an archive file
pub fn pack<P: AsRef<Path>, Q: AsRef<Path>>(
    input: P,
    output: Q,
    options: &PackOptions,
) -> Result<PackSummary> {
    pack_with_progress(input, output, options, &mut NoProgress)
}

/// Pack a directory into an archive file, reporting progress
pub fn pack_with_progress<P, Q, O>(
    input: P,
    output: Q,
    options: &PackOptions,
    observer: &mut O,
) -> Result<PackSummary>
where
    P: AsRef<Path>,
    Q: AsRef<Path>,
    O: ProgressObserver + ?Sized,
{
    let input = input.as_ref();
    let output = output.as_ref();

    let mut counter = EntryCounter {
        inner: observer,
        entries: 0,
    };
    let archive = pack_to_bytes(input, Some(output), options, &mut counter)?;

    // Create output directory if it doesn't exist
    if let Some(parent) = output.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }
    info!("Writing archive to {:?} ({} bytes)", output, archive.len());
    fs::write(output, &archive)?;

    Ok(PackSummary {
        entries: counter.entries,
        archive_size: archive.len() as u64,
    })
}

/// Forwards to another observer while counting entries
struct EntryCounter<'a, O: ?Sized> {
    inner: &'a mut O,
    entries: usize,
}

impl<O: ProgressObserver + ?Sized> ProgressObserver for EntryCounter<'_, O> {
    fn start(&mut self, operation: Operation, total_bytes: Option<u64>) {
        self.entries = 0;
        self.inner.start(operation, total_bytes);
    }

    fn entry(&mut self, path: &str, raw_size: u64, consumed: u64) {
        self.entries += 1;
        self.inner.entry(path, raw_size, consumed);
    }

    fn finish(&mut self) {
        self.inner.finish();
    }
}

/// Encode a directory into archive bytes.
///
/// When `output` lies inside `input`, that path is left out of the walk.
pub fn pack_to_bytes<O: ProgressObserver + ?Sized>(
    input: &Path,
    output: Option<&Path>,
    options: &PackOptions,
    observer: &mut O,
) -> Result<Vec<u8>> {
    if !input.exists() {
        return Err(Error::NotFound(format!(
            "Input path {:?} does not exist",
            input
        )));
    }
    if !input.is_dir() {
        return Err(Error::Validation(format!(
            "Input path {:?} is not a directory",
            input
        )));
    }
    if let Some(output) = output {
        if output.is_dir() {
            return Err(Error::Validation(format!(
                "Output path {:?} is a directory, expected a file",
                output
            )));
        }
    }

    info!(
        "Packing {:?} with {} (ignore list: {})",
        input, options.algorithm, options.use_ignore_file
    );

    let ignore = if options.use_ignore_file {
        IgnoreList::load_from_root(input, &options.ignore_file_name)?
    } else {
        IgnoreList::new()
    };
    let self_path = output.and_then(|out| archive_inside_root(input, out));
    if let Some(path) = &self_path {
        debug!(path = %path, "Excluding output archive from its own input");
    }

    let sentinel = options.ignore_file_name.as_str();
    let skip_sentinel = options.use_ignore_file;
    let include = |relative: &str| {
        if skip_sentinel && relative == sentinel {
            return false;
        }
        if self_path.as_deref() == Some(relative) {
            return false;
        }
        ignore.should_include(relative)
    };

    let walker = DirectoryWalker::new(input).follow_symlinks(options.follow_symlinks);
    let codec = options.algorithm.codec(options.level);
    encode(&walker, &codec, include, observer)
}

/// Root-relative path of `output` if it would be walked as part of `root`
fn archive_inside_root(root: &Path, output: &Path) -> Option<String> {
    let root = root.canonicalize().ok()?;
    let parent = match output.parent() {
        Some(p) if !p.as_os_str().is_empty() => p.canonicalize().ok()?,
        _ => std::env::current_dir().ok()?.canonicalize().ok()?,
    };
    let candidate = parent.join(output.file_name()?);
    relative_path(&root, &candidate).ok()
}

/// Read an archive file, rejecting missing paths and directories
pub fn read_archive<P: AsRef<Path>>(archive: P) -> Result<Vec<u8>> {
    let archive = archive.as_ref();
    if !archive.exists() {
        return Err(Error::NotFound(format!(
            "Archive {:?} does not exist",
            archive
        )));
    }
    if !archive.is_file() {
        return Err(Error::Validation(format!(
            "Archive path {:?} is not a file",
            archive
        )));
    }
    Ok(fs::read(archive)?)
}

/// Extract an archive file into a directory
pub fn extract<P: AsRef<Path>, Q: AsRef<Path>>(
    archive: P,
    output_dir: Q,
    options: &ExtractOptions,
) -> Result<DecodeSummary> {
    extract_with_progress(archive, output_dir, options, &mut NoProgress)
}

/// Extract an archive file into a directory, reporting progress
pub fn extract_with_progress<P, Q, O>(
    archive: P,
    output_dir: Q,
    options: &ExtractOptions,
    observer: &mut O,
) -> Result<DecodeSummary>
where
    P: AsRef<Path>,
    Q: AsRef<Path>,
    O: ProgressObserver + ?Sized,
{
    let archive_path = archive.as_ref();
    let output_dir = output_dir.as_ref();

    if output_dir.exists() && !output_dir.is_dir() {
        return Err(Error::Validation(format!(
            "Output path {:?} is not a directory",
            output_dir
        )));
    }

    info!("Reading archive {:?}", archive_path);
    let bytes = read_archive(archive_path)?;
    extract_bytes(&bytes, output_dir, options, observer)
}

/// Extract archive bytes into a directory.
///
/// The signature is checked before the output directory is created.
pub fn extract_bytes<O: ProgressObserver + ?Sized>(
    bytes: &[u8],
    output_dir: &Path,
    options: &ExtractOptions,
    observer: &mut O,
) -> Result<DecodeSummary> {
    decoder::verify_signature(bytes)?;

    let mut writer = DiskWriter::create(output_dir)?;
    let codec = options.algorithm.codec(options.level);
    let summary = decode(
        bytes,
        &codec,
        &mut writer,
        observer,
        DecodeLimits {
            max_extraction_size: options.max_extraction_size,
        },
    )?;

    info!(
        "Extracted {} files ({} bytes) to {:?}",
        summary.entries, summary.bytes_written, output_dir
    );
    Ok(summary)
}

/// List the entries of an archive file
pub fn inspect_file<P: AsRef<Path>>(
    archive: P,
    options: &ExtractOptions,
) -> Result<Vec<ArchiveEntry>> {
    let bytes = read_archive(archive)?;
    let codec = options.algorithm.codec(options.level);
    inspect(
        &bytes,
        &codec,
        DecodeLimits {
            max_extraction_size: options.max_extraction_size,
        },
    )
}
