//! BFS - a single-file directory archiver library
//!
//! A directory tree is packed into one sequential blob: a 3-byte `BFS`
//! signature followed by self-delimiting entries, each holding a file's
//! root-relative path and its independently compressed contents. There is
//! no index; entries are found by parsing from the start.

pub mod archive;
pub mod codec;
pub mod config;
pub mod error;
pub mod ignore;
pub mod progress;
pub mod security;
pub mod walker;

pub use error::{Error, ErrorKind, Result};

// Re-export commonly used types
pub use archive::{
    extract, extract_with_progress, inspect_file, pack, pack_with_progress, ArchiveEntry,
    ExtractOptions, PackOptions,
};
pub use codec::{Algorithm, Codec};
