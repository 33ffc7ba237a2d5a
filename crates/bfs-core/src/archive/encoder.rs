//! Single-pass archive writer

use super::{LENGTH_FIELD_SIZE, MAGIC};
use crate::codec::Codec;
use crate::progress::{Operation, ProgressObserver};
use crate::security::safe_components;
use crate::walker::DirectoryWalker;
use crate::{Error, Result};
use std::fs;
use tracing::{debug, info};

/// Appends entries to an in-memory archive buffer
pub struct ArchiveEncoder<'c, C: Codec + ?Sized> {
    buf: Vec<u8>,
    codec: &'c C,
    entries: usize,
}

impl<'c, C: Codec + ?Sized> ArchiveEncoder<'c, C> {
    /// Start a new archive; the signature is written immediately
    pub fn new(codec: &'c C) -> Self {
        Self {
            buf: MAGIC.to_vec(),
            codec,
            entries: 0,
        }
    }

    /// Compress `data` and append it under `path`. Returns the number of
    /// archive bytes the entry occupies.
    pub fn append(&mut self, path: &str, data: &[u8]) -> Result<usize> {
        let path = wire_path(path)?;
        let compressed = self.codec.compress(data)?;
        let length = length_field(&path, compressed.len())?;

        self.buf.reserve(path.len() + 1 + LENGTH_FIELD_SIZE + compressed.len());
        self.buf.extend_from_slice(path.as_bytes());
        self.buf.push(0);
        self.buf.extend_from_slice(&length);
        self.buf.extend_from_slice(&compressed);
        self.entries += 1;

        debug!(
            path = %path,
            size = data.len(),
            compressed = compressed.len(),
            "Encoded entry"
        );
        Ok(path.len() + 1 + LENGTH_FIELD_SIZE + compressed.len())
    }

    /// Entries appended so far
    pub fn entries(&self) -> usize {
        self.entries
    }

    /// Archive bytes written so far, signature included
    pub fn archive_len(&self) -> usize {
        self.buf.len()
    }

    /// Whether any entry has been appended
    pub fn has_entries(&self) -> bool {
        self.entries > 0
    }

    /// Hand over the finished archive
    pub fn finish(self) -> Vec<u8> {
        self.buf
    }
}

/// Encode every file the walker yields and `include` accepts, in walk order.
///
/// `include` receives the `/`-separated root-relative path.
pub fn encode<C, F, O>(
    walker: &DirectoryWalker,
    codec: &C,
    mut include: F,
    observer: &mut O,
) -> Result<Vec<u8>>
where
    C: Codec + ?Sized,
    F: FnMut(&str) -> bool,
    O: ProgressObserver + ?Sized,
{
    let mut encoder = ArchiveEncoder::new(codec);
    observer.start(Operation::Compress, None);

    for entry in walker.walk() {
        let entry = entry?;
        if !include(&entry.relative) {
            debug!(path = %entry.relative, "Skipping ignored file");
            continue;
        }

        let data = fs::read(&entry.path)?;
        let consumed = encoder.append(&entry.relative, &data)?;
        observer.entry(&entry.relative, data.len() as u64, consumed as u64);
    }

    observer.finish();
    info!(
        root = ?walker.root(),
        entries = encoder.entries(),
        bytes = encoder.archive_len(),
        codec = codec.name(),
        "Encoded archive"
    );
    Ok(encoder.finish())
}

/// Canonical on-wire form of an entry path. `path` must already use `/`
/// separators; a backslash would be read back as a separator.
fn wire_path(path: &str) -> Result<String> {
    if path.contains('\0') {
        return Err(Error::InvalidPath(format!(
            "Entry path contains a NUL byte: {:?}",
            path
        )));
    }
    if path.contains('\\') {
        return Err(Error::Validation(format!(
            "Entry path contains a backslash: {:?}",
            path
        )));
    }
    Ok(safe_components(path)?.join("/"))
}

/// Little-endian length field, refusing payloads that do not fit in 32 bits
fn length_field(path: &str, len: usize) -> Result<[u8; LENGTH_FIELD_SIZE]> {
    u32::try_from(len)
        .map(u32::to_le_bytes)
        .map_err(|_| Error::PayloadTooLarge {
            path: path.to_string(),
            size: len as u64,
            max: u32::MAX as u64,
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::{StoreCodec, ZstdCodec};

    #[test]
    fn test_new_archive_is_just_the_signature() {
        let encoder = ArchiveEncoder::new(&StoreCodec);
        assert!(!encoder.has_entries());
        assert_eq!(encoder.finish(), b"BFS");
    }

    #[test]
    fn test_append_layout() {
        let mut encoder = ArchiveEncoder::new(&StoreCodec);
        let consumed = encoder.append("a.txt", b"hello").unwrap();
        assert_eq!(consumed, 5 + 1 + 4 + 5);
        assert!(encoder.has_entries());
        assert_eq!(encoder.archive_len(), 3 + consumed);

        let mut expected = b"BFS".to_vec();
        expected.extend_from_slice(b"a.txt\0");
        expected.extend_from_slice(&[5, 0, 0, 0]);
        expected.extend_from_slice(b"hello");
        assert_eq!(encoder.finish(), expected);
    }

    #[test]
    fn test_append_uses_codec_output() {
        let codec = ZstdCodec::default();
        let mut encoder = ArchiveEncoder::new(&codec);
        encoder.append("x", b"xxxxxxxxxxxxxxxxxxxxxxxx").unwrap();
        let bytes = encoder.finish();

        let compressed = codec.compress(b"xxxxxxxxxxxxxxxxxxxxxxxx").unwrap();
        let len = u32::from_le_bytes(bytes[5..9].try_into().unwrap());
        assert_eq!(len as usize, compressed.len());
        assert_eq!(&bytes[9..], &compressed[..]);
    }

    #[test]
    fn test_paths_are_canonicalized() {
        let mut encoder = ArchiveEncoder::new(&StoreCodec);
        encoder.append("./sub//b.txt", b"").unwrap();
        assert_eq!(&encoder.finish()[3..13], b"sub/b.txt\0");
    }

    #[test]
    fn test_backslash_paths_are_rejected() {
        let mut encoder = ArchiveEncoder::new(&StoreCodec);
        assert!(matches!(
            encoder.append("a\\b.txt", b""),
            Err(Error::Validation(_))
        ));
        assert!(!encoder.has_entries());
    }

    #[test]
    fn test_rejects_unrepresentable_paths() {
        let mut encoder = ArchiveEncoder::new(&StoreCodec);
        assert!(matches!(
            encoder.append("bad\0name", b""),
            Err(Error::InvalidPath(_))
        ));
        assert!(encoder.append("", b"").is_err());
        assert!(encoder.append("../up", b"").is_err());
        assert!(!encoder.has_entries());
        assert_eq!(encoder.archive_len(), 3);
    }

    #[test]
    fn test_length_field_bounds() {
        assert_eq!(length_field("a", 5).unwrap(), [5, 0, 0, 0]);
        assert_eq!(
            length_field("a", u32::MAX as usize).unwrap(),
            [0xFF, 0xFF, 0xFF, 0xFF]
        );
    }

    #[cfg(target_pointer_width = "64")]
    #[test]
    fn test_length_field_overflow_is_format_error() {
        let err = length_field("huge.bin", u32::MAX as usize + 1).unwrap_err();
        match err {
            Error::PayloadTooLarge { path, size, max } => {
                assert_eq!(path, "huge.bin");
                assert_eq!(size, u32::MAX as u64 + 1);
                assert_eq!(max, u32::MAX as u64);
            }
            other => panic!("Expected PayloadTooLarge, got {:?}", other),
        }
    }
}
