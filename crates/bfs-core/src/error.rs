//! Error types for bfs-core

use thiserror::Error;

/// Core error types for the bfs library
#[derive(Error, Debug)]
pub enum Error {
    /// I/O operation failed
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Input file or directory does not exist
    #[error("Not found: {0}")]
    NotFound(String),

    /// Archive does not start with the expected signature
    #[error(
        "Invalid signature at byte {position}: expected {}, got {}",
        describe_expected(.expected),
        describe_byte(.actual)
    )]
    InvalidSignature {
        position: usize,
        expected: u8,
        actual: Option<u8>,
    },

    /// Entry path is not null-terminated before the end of the archive
    #[error("Missing path terminator for entry starting at offset {offset}")]
    MissingTerminator { offset: usize },

    /// A fixed-size field or payload runs past the end of the archive
    #[error("Truncated {field} at offset {offset}: need {needed} bytes, {available} available")]
    Truncated {
        field: &'static str,
        offset: usize,
        needed: usize,
        available: usize,
    },

    /// Compression or decompression failed
    #[error("Compression error: {0}")]
    Compression(String),

    /// Entry path is malformed or would escape the output directory
    #[error("Invalid path: {0}")]
    InvalidPath(String),

    /// Compressed payload does not fit the 32-bit length field
    #[error("Compressed payload for {path} is {size} bytes, exceeding the {max} byte limit")]
    PayloadTooLarge { path: String, size: u64, max: u64 },

    /// Extraction limit exceeded
    #[error("Security error: {0}")]
    SecurityError(String),

    /// Wrong kind of input or otherwise unusable arguments
    #[error("Validation error: {0}")]
    Validation(String),

    /// Configuration-related error
    #[error("Configuration error: {0}")]
    Config(String),
}

/// Coarse classification used for reporting and exit codes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// The archive bytes are malformed, truncated or malicious
    Format,
    /// A file could not be read or written
    Io,
    /// The caller asked for something that cannot be done
    Validation,
}

impl Error {
    /// Classify this error
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::Io(_) | Error::NotFound(_) => ErrorKind::Io,
            Error::InvalidSignature { .. }
            | Error::MissingTerminator { .. }
            | Error::Truncated { .. }
            | Error::Compression(_)
            | Error::InvalidPath(_)
            | Error::PayloadTooLarge { .. }
            | Error::SecurityError(_) => ErrorKind::Format,
            Error::Validation(_) | Error::Config(_) => ErrorKind::Validation,
        }
    }
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ErrorKind::Format => write!(f, "format error"),
            ErrorKind::Io => write!(f, "IO error"),
            ErrorKind::Validation => write!(f, "validation error"),
        }
    }
}

impl From<walkdir::Error> for Error {
    fn from(err: walkdir::Error) -> Self {
        Error::Io(err.into())
    }
}

fn describe_expected(byte: &u8) -> String {
    describe_byte(&Some(*byte))
}

fn describe_byte(byte: &Option<u8>) -> String {
    match *byte {
        Some(b) if b.is_ascii_graphic() => format!("{:?} (0x{:02X})", char::from(b), b),
        Some(b) => format!("0x{:02X}", b),
        None => "end of data".to_string(),
    }
}

pub type Result<T> = std::result::Result<T, Error>;
