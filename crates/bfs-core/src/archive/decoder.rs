//! Sequential archive parser
//!
//! The archive has no index, so entries are discovered by walking a single
//! forward-only [`Cursor`] over the buffer:
//!
//! ```text
//! ReadPath -> ReadLength -> ReadPayload -> (WriteFile) -> ReadPath ...
//! ```
//!
//! Parsing stops cleanly only when the cursor sits exactly at the end of the
//! buffer in the `ReadPath` state. Every other shortfall is a format error.
//! Payloads are handed out as slices borrowed from the archive buffer.

use super::writer::FileSystemWriter;
use super::{ArchiveEntry, LENGTH_FIELD_SIZE, MAGIC};
use crate::codec::Codec;
use crate::progress::{Operation, ProgressObserver};
use crate::security::{safe_components, DEFAULT_MAX_EXTRACTION_SIZE};
use crate::{Error, Result};
use tracing::{debug, info};

const PATH_TERMINATOR: u8 = 0x00;

/// Forward-only read position over a byte slice
#[derive(Debug, Clone)]
pub struct Cursor<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> Cursor<'a> {
    pub fn new(buf: &'a [u8]) -> Self {
        Self { buf, pos: 0 }
    }

    pub fn position(&self) -> usize {
        self.pos
    }

    pub fn remaining(&self) -> usize {
        self.buf.len() - self.pos
    }

    pub fn is_at_end(&self) -> bool {
        self.pos == self.buf.len()
    }

    /// Consume bytes up to `delimiter` and the delimiter itself. Returns the
    /// bytes before it, or `None` (cursor unchanged) if it never occurs.
    pub fn read_until(&mut self, delimiter: u8) -> Option<&'a [u8]> {
        let buf: &'a [u8] = self.buf;
        let rest = &buf[self.pos..];
        let len = rest.iter().position(|&b| b == delimiter)?;
        self.pos += len + 1;
        Some(&rest[..len])
    }

    /// Consume exactly `n` bytes, or nothing if fewer remain
    pub fn take(&mut self, n: usize) -> Option<&'a [u8]> {
        if self.remaining() < n {
            return None;
        }
        let buf: &'a [u8] = self.buf;
        let bytes = &buf[self.pos..self.pos + n];
        self.pos += n;
        Some(bytes)
    }

    /// Consume a little-endian `u32`
    pub fn read_u32_le(&mut self) -> Option<u32> {
        let bytes: [u8; 4] = self.take(4)?.try_into().ok()?;
        Some(u32::from_le_bytes(bytes))
    }
}

/// One framed entry, still compressed
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawEntry<'a> {
    /// Archive path exactly as stored
    pub path: &'a str,
    /// Offset of the first path byte
    pub offset: usize,
    /// Compressed payload
    pub payload: &'a [u8],
}

impl RawEntry<'_> {
    /// Archive bytes occupied by this entry
    pub fn encoded_len(&self) -> usize {
        self.path.len() + 1 + LENGTH_FIELD_SIZE + self.payload.len()
    }
}

#[derive(Debug, Clone, Copy)]
enum State<'a> {
    ReadPath,
    ReadLength { path: &'a str, offset: usize },
    ReadPayload { path: &'a str, offset: usize, len: u32 },
    Done,
}

/// Iterates over the entries of an archive buffer
///
/// The iterator yields at most one error and then stops.
#[derive(Debug, Clone)]
pub struct ArchiveDecoder<'a> {
    cursor: Cursor<'a>,
    state: State<'a>,
}

impl<'a> ArchiveDecoder<'a> {
    /// Verify the signature and position the cursor on the first entry
    pub fn new(archive: &'a [u8]) -> Result<Self> {
        verify_signature(archive)?;
        let mut cursor = Cursor::new(archive);
        cursor.take(MAGIC.len());
        Ok(Self {
            cursor,
            state: State::ReadPath,
        })
    }

    /// Current cursor offset
    pub fn position(&self) -> usize {
        self.cursor.position()
    }

    fn step(&mut self) -> Result<Option<RawEntry<'a>>> {
        loop {
            match self.state {
                State::ReadPath => {
                    if self.cursor.is_at_end() {
                        self.state = State::Done;
                        return Ok(None);
                    }
                    let offset = self.cursor.position();
                    let raw = self
                        .cursor
                        .read_until(PATH_TERMINATOR)
                        .ok_or(Error::MissingTerminator { offset })?;
                    let path = decode_path(raw, offset)?;
                    self.state = State::ReadLength { path, offset };
                }
                State::ReadLength { path, offset } => {
                    let at = self.cursor.position();
                    let available = self.cursor.remaining();
                    let len = self.cursor.read_u32_le().ok_or(Error::Truncated {
                        field: "length field",
                        offset: at,
                        needed: LENGTH_FIELD_SIZE,
                        available,
                    })?;
                    self.state = State::ReadPayload { path, offset, len };
                }
                State::ReadPayload { path, offset, len } => {
                    let at = self.cursor.position();
                    let available = self.cursor.remaining();
                    let needed = len as usize;
                    let payload = self.cursor.take(needed).ok_or(Error::Truncated {
                        field: "payload",
                        offset: at,
                        needed,
                        available,
                    })?;
                    self.state = State::ReadPath;
                    return Ok(Some(RawEntry {
                        path,
                        offset,
                        payload,
                    }));
                }
                State::Done => return Ok(None),
            }
        }
    }
}

impl<'a> Iterator for ArchiveDecoder<'a> {
    type Item = Result<RawEntry<'a>>;

    fn next(&mut self) -> Option<Self::Item> {
        match self.step() {
            Ok(entry) => entry.map(Ok),
            Err(e) => {
                self.state = State::Done;
                Some(Err(e))
            }
        }
    }
}

impl std::iter::FusedIterator for ArchiveDecoder<'_> {}

/// Check the three signature bytes
pub fn verify_signature(archive: &[u8]) -> Result<()> {
    for (position, &expected) in MAGIC.iter().enumerate() {
        let actual = archive.get(position).copied();
        if actual != Some(expected) {
            return Err(Error::InvalidSignature {
                position,
                expected,
                actual,
            });
        }
    }
    Ok(())
}

fn decode_path(raw: &[u8], offset: usize) -> Result<&str> {
    if raw.is_empty() {
        return Err(Error::InvalidPath(format!(
            "Empty entry path at offset {}",
            offset
        )));
    }
    std::str::from_utf8(raw).map_err(|e| {
        Error::InvalidPath(format!(
            "Entry path at offset {} is not valid UTF-8: {}",
            offset, e
        ))
    })
}

fn decompress_entry<C: Codec + ?Sized>(
    codec: &C,
    entry: &RawEntry<'_>,
    limit: u64,
) -> Result<Vec<u8>> {
    codec.decompress_limited(entry.payload, limit).map_err(|e| match e {
        Error::Compression(msg) => Error::Compression(format!(
            "entry {:?} at offset {}: {}",
            entry.path, entry.offset, msg
        )),
        other => other,
    })
}

/// Extraction limits
#[derive(Debug, Clone, Copy)]
pub struct DecodeLimits {
    /// Total decompressed bytes allowed across all entries
    pub max_extraction_size: u64,
}

impl Default for DecodeLimits {
    fn default() -> Self {
        Self {
            max_extraction_size: DEFAULT_MAX_EXTRACTION_SIZE,
        }
    }
}

/// Totals for a finished decode
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DecodeSummary {
    pub entries: usize,
    pub bytes_written: u64,
}

/// Decode every entry of `archive` and hand it to `writer`.
///
/// Each entry is framed, decompressed and path-checked before the writer
/// sees it, so a damaged entry is never partially written. Entries before it
/// have already been written when the error is returned.
pub fn decode<C, W, O>(
    archive: &[u8],
    codec: &C,
    writer: &mut W,
    observer: &mut O,
    limits: DecodeLimits,
) -> Result<DecodeSummary>
where
    C: Codec + ?Sized,
    W: FileSystemWriter + ?Sized,
    O: ProgressObserver + ?Sized,
{
    let decoder = ArchiveDecoder::new(archive)?;
    // Entry `consumed` counts add up to everything after the signature
    let entry_bytes = archive.len().saturating_sub(MAGIC.len()) as u64;
    observer.start(Operation::Extract, Some(entry_bytes));

    let mut summary = DecodeSummary::default();
    for entry in decoder {
        let entry = entry?;
        let budget = limits
            .max_extraction_size
            .saturating_sub(summary.bytes_written);
        let data = decompress_entry(codec, &entry, budget)?;
        safe_components(entry.path)?;

        debug!(
            path = entry.path,
            compressed = entry.payload.len(),
            size = data.len(),
            "Decoded entry"
        );
        writer.write_file(entry.path, &data)?;

        summary.entries += 1;
        summary.bytes_written += data.len() as u64;
        observer.entry(entry.path, data.len() as u64, entry.encoded_len() as u64);
    }

    observer.finish();
    info!(
        entries = summary.entries,
        bytes = summary.bytes_written,
        codec = codec.name(),
        "Decoded archive"
    );
    Ok(summary)
}

/// List the entries of `archive` without writing anything.
///
/// Payloads are decompressed to report their size, which also validates them.
/// Each entry may decompress to at most `limits.max_extraction_size` bytes.
pub fn inspect<C: Codec + ?Sized>(
    archive: &[u8],
    codec: &C,
    limits: DecodeLimits,
) -> Result<Vec<ArchiveEntry>> {
    ArchiveDecoder::new(archive)?
        .map(|entry| {
            let entry = entry?;
            let data = decompress_entry(codec, &entry, limits.max_extraction_size)?;
            Ok(ArchiveEntry {
                path: entry.path.to_string(),
                offset: entry.offset as u64,
                compressed_size: entry.payload.len() as u64,
                size: data.len() as u64,
            })
        })
        .collect()
}
