//! `.lyradb` database container codec.
//!
//! On-disk layout (offsets relative to the start of the payload, i.e. the
//! first byte after the fixed header):
//!
//! ```text
//! header                                     LYRADB magic, version, flags, payload_len
//! uuid(16) gen(u64) created_at(i64)          container identity + generation counter
//! record_count(u32) index_offset(u64)
//! records …                                  key_len u16 | value_len u32 | key | value | crc32
//! footer index                               entry_count u32, then key_len u16 | key | offset u64
//! trailer crc32                              over header + payload up to the trailer
//! ```
//!
//! Building is append-only and single-pass: records are written in insertion
//! order, the index (sorted by key) follows once all records are finalized,
//! and no earlier byte is ever rewritten.  Decoding validates the header and
//! the trailer checksum before exposing a single record.
//!
//! # Example
//!
//! ```
//! use lyradb_formats::container::{Container, ContainerBuilder};
//!
//! let mut builder = ContainerBuilder::new();
//! builder.push("a", "1");
//! builder.push("b", "2");
//! let bytes = builder.finish()?;
//!
//! let db = Container::decode(&bytes)?;
//! assert_eq!(db.get(b"b")?, b"2");
//! # Ok::<(), lyradb_formats::FormatError>(())
//! ```

use std::collections::HashSet;

use chrono::Utc;
use tracing::debug;
use uuid::Uuid;

use crate::checksum::{self, ChecksumKind, CRC32_LEN};
use crate::cursor::{ReadCursor, WriteCursor};
use crate::error::{FormatError, Result};
use crate::header::{FormatHeader, FormatKind, Version};
use crate::iterator::ResumeToken;
use crate::validator;

/// uuid(16) + generation(8) + created_at(8) + record_count(4) + index_offset(8).
pub const SUBHEADER_LEN: usize = 44;

/// Keys are length-prefixed with a u16.
pub const MAX_KEY_LEN: usize = u16::MAX as usize;
/// Values are length-prefixed with a u32.
pub const MAX_VALUE_LEN: usize = u32::MAX as usize;
/// Record count is stored as a u32.
pub const MAX_RECORD_COUNT: usize = u32::MAX as usize;

/// One key/value pair, borrowed from the decoded buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Record<'a> {
    pub key: &'a [u8],
    pub value: &'a [u8],
}

fn corrupt(msg: impl Into<String>) -> FormatError {
    FormatError::CorruptData(msg.into())
}

// ── Builder ──────────────────────────────────────────────────────────────────

/// Append-only builder for a `.lyradb` container.
///
/// Records are encoded in insertion order; the footer index is sorted by key.
/// [`ContainerBuilder::finish`] fails with `DuplicateKey` before writing any
/// output if two records share a key.
#[derive(Debug)]
pub struct ContainerBuilder {
    uuid: Uuid,
    generation: u64,
    records: Vec<(Vec<u8>, Vec<u8>)>,
}

impl ContainerBuilder {
    /// A fresh container identity at generation 0.
    pub fn new() -> Self {
        Self {
            uuid: Uuid::new_v4(),
            generation: 0,
            records: Vec::new(),
        }
    }

    /// Rebuild an existing container: same identity, generation bumped, so
    /// resume tokens issued against `prev` become detectably stale.
    pub fn rewrite(prev: &Container<'_>) -> Self {
        Self {
            uuid: prev.uuid(),
            generation: prev.generation() + 1,
            records: Vec::new(),
        }
    }

    pub fn uuid(&self) -> Uuid {
        self.uuid
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn push(&mut self, key: impl Into<Vec<u8>>, value: impl Into<Vec<u8>>) -> &mut Self {
        self.records.push((key.into(), value.into()));
        self
    }

    /// Encode the container. Produces no partial output on failure.
    pub fn finish(self) -> Result<Vec<u8>> {
        if self.records.len() > MAX_RECORD_COUNT {
            return Err(FormatError::FormatLimitExceeded(format!(
                "{} records exceed the u32 record count field",
                self.records.len()
            )));
        }
        let mut seen: HashSet<&[u8]> = HashSet::with_capacity(self.records.len());
        for (key, value) in &self.records {
            if key.len() > MAX_KEY_LEN {
                return Err(FormatError::FormatLimitExceeded(format!(
                    "key of {} bytes exceeds the u16 key length field",
                    key.len()
                )));
            }
            if value.len() > MAX_VALUE_LEN {
                return Err(FormatError::FormatLimitExceeded(format!(
                    "value of {} bytes exceeds the u32 value length field",
                    value.len()
                )));
            }
            if !seen.insert(key.as_slice()) {
                return Err(FormatError::DuplicateKey(
                    String::from_utf8_lossy(key).into_owned(),
                ));
            }
        }

        let records_len: usize = self
            .records
            .iter()
            .map(|(k, v)| 2 + 4 + k.len() + v.len() + CRC32_LEN)
            .sum();
        let index_len: usize = 4 + self.records.iter().map(|(k, _)| 2 + k.len() + 8).sum::<usize>();
        let payload_len = SUBHEADER_LEN + records_len + index_len + CRC32_LEN;
        let total = FormatKind::Container.header_len() + payload_len;

        let mut w = WriteCursor::new(total);
        FormatHeader::new(FormatKind::Container, payload_len as u64).write(&mut w)?;
        w.write_bytes(self.uuid.as_bytes())?;
        w.write_u64(self.generation)?;
        w.write_i64(Utc::now().timestamp())?;
        w.write_u32(self.records.len() as u32)?;
        w.write_u64((SUBHEADER_LEN + records_len) as u64)?;

        // Records, insertion order. Offsets are payload-relative.
        let mut offsets = Vec::with_capacity(self.records.len());
        for (key, value) in &self.records {
            offsets.push((w.position() - FormatKind::Container.header_len()) as u64);
            w.write_u16(key.len() as u16)?;
            w.write_u32(value.len() as u32)?;
            w.write_bytes(key)?;
            w.write_bytes(value)?;
            w.write_u32(checksum::crc32_parts(&[key, value]))?;
        }

        // Footer index, sorted by key for binary-search lookup.
        let mut order: Vec<usize> = (0..self.records.len()).collect();
        order.sort_by(|&a, &b| self.records[a].0.cmp(&self.records[b].0));
        w.write_u32(self.records.len() as u32)?;
        for i in order {
            let key = &self.records[i].0;
            w.write_u16(key.len() as u16)?;
            w.write_bytes(key)?;
            w.write_u64(offsets[i])?;
        }

        let trailer = checksum::crc32(w.written());
        w.write_u32(trailer)?;
        Ok(w.into_inner())
    }
}

impl Default for ContainerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

// ── Decoded handle ───────────────────────────────────────────────────────────

/// Immutable decoded view over an encoded `.lyradb` buffer.
///
/// Decoding validates the header and the trailer checksum in full before any
/// record is reachable; the handle never mutates the backing buffer, so it
/// can be shared freely across threads.
#[derive(Debug)]
pub struct Container<'a> {
    payload: &'a [u8],
    version: Version,
    uuid: Uuid,
    generation: u64,
    created_at: i64,
    record_count: u32,
    records_end: usize,
    /// Sorted by key; offsets are payload-relative and pre-validated to lie
    /// inside the records region.
    index: Vec<(&'a [u8], usize)>,
}

impl<'a> Container<'a> {
    pub fn decode(bytes: &'a [u8]) -> Result<Container<'a>> {
        let (header, payload) = validator::validate(FormatKind::Container, bytes)?;
        let header_len = FormatKind::Container.header_len();

        // Smallest valid payload: subheader + empty index + trailer.
        if payload.len() < SUBHEADER_LEN + 4 + CRC32_LEN {
            return Err(corrupt(format!(
                "container payload of {} bytes is smaller than the minimum structure",
                payload.len()
            )));
        }

        let kind = ChecksumKind::for_version(header.version).ok_or_else(|| {
            FormatError::FormatMismatch(format!(
                "no checksum routine for container version {}",
                header.version
            ))
        })?;
        let trailer_at = payload.len() - kind.digest_len();
        let stored = {
            let mut cur = ReadCursor::new(payload);
            cur.seek(trailer_at)?;
            cur.read_u32()?
        };
        let computed = checksum::crc32_parts(&[&bytes[..header_len], &payload[..trailer_at]]);
        if computed != stored {
            return Err(corrupt(format!(
                "container checksum mismatch: stored {}, computed {}",
                hex::encode(stored.to_le_bytes()),
                hex::encode(computed.to_le_bytes()),
            )));
        }

        let mut cur = ReadCursor::new(payload);
        let uuid = Uuid::from_bytes(cur.read_array::<16>()?);
        let generation = cur.read_u64()?;
        let created_at = cur.read_i64()?;
        let record_count = cur.read_u32()?;
        let index_offset = usize::try_from(cur.read_u64()?)
            .map_err(|_| corrupt("index offset does not fit in memory"))?;

        if index_offset < SUBHEADER_LEN
            || index_offset.checked_add(4).map_or(true, |end| end > trailer_at)
        {
            return Err(corrupt(format!(
                "index offset {index_offset} outside the container payload"
            )));
        }
        let records_end = index_offset;

        // Footer index: count, then sorted (key, record offset) pairs filling
        // the region up to the trailer exactly.
        cur.seek(index_offset)?;
        let entry_count = cur.read_u32()?;
        if entry_count != record_count {
            return Err(corrupt(format!(
                "index lists {entry_count} entries, header declares {record_count} records"
            )));
        }
        let mut index: Vec<(&'a [u8], usize)> = Vec::with_capacity(entry_count as usize);
        for _ in 0..entry_count {
            let (key, offset) = match read_index_entry(&mut cur) {
                Ok(p) => p,
                Err(FormatError::OutOfBounds { .. }) => {
                    return Err(corrupt("index entry extends past the container payload"))
                }
                Err(e) => return Err(e),
            };
            let offset = usize::try_from(offset)
                .map_err(|_| corrupt("record offset does not fit in memory"))?;
            if offset < SUBHEADER_LEN || offset >= records_end {
                return Err(corrupt(format!(
                    "index points at offset {offset}, outside the records region"
                )));
            }
            if let Some((prev, _)) = index.last() {
                if *prev >= key {
                    return Err(corrupt("footer index keys are not strictly ascending"));
                }
            }
            index.push((key, offset));
        }
        if cur.position() != trailer_at {
            return Err(corrupt("footer index does not fill its declared region"));
        }

        debug!(
            uuid = %uuid,
            generation,
            records = record_count,
            "container decoded"
        );
        Ok(Container {
            payload,
            version: header.version,
            uuid,
            generation,
            created_at,
            record_count,
            records_end,
            index,
        })
    }

    // ── Metadata ─────────────────────────────────────────────────────────────

    pub fn uuid(&self) -> Uuid {
        self.uuid
    }

    /// Bumped on every rewrite; resume tokens bind to this value.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Unix seconds at encode time.
    pub fn created_at(&self) -> i64 {
        self.created_at
    }

    pub fn version(&self) -> Version {
        self.version
    }

    pub fn len(&self) -> usize {
        self.record_count as usize
    }

    pub fn is_empty(&self) -> bool {
        self.record_count == 0
    }

    // ── Lookup ───────────────────────────────────────────────────────────────

    /// Look up a value through the footer index.
    pub fn get(&self, key: &[u8]) -> Result<&'a [u8]> {
        let slot = self
            .index
            .binary_search_by(|&(k, _)| k.cmp(key))
            .map_err(|_| FormatError::NotFound(String::from_utf8_lossy(key).into_owned()))?;
        let (_, offset) = self.index[slot];
        let (record, _) = read_record_at(self.payload, offset, self.records_end)?;
        if record.key != key {
            return Err(corrupt("footer index key does not match its record"));
        }
        Ok(record.value)
    }

    // ── Scan ─────────────────────────────────────────────────────────────────

    /// Iterate records in on-disk (insertion) order.
    ///
    /// The scan is finite and restartable only through a [`ResumeToken`]; a
    /// new `scan()` call always starts from the first record.
    pub fn scan(&self) -> Scan<'a> {
        Scan {
            payload: self.payload,
            records_end: self.records_end,
            offset: SUBHEADER_LEN,
            consumed: 0,
            uuid: self.uuid,
            generation: self.generation,
            done: false,
        }
    }

    /// Continue a scan from a previously captured [`ResumeToken`].
    ///
    /// The token must carry this container's identity (`TokenMismatch`
    /// otherwise) and generation (`StaleToken` if the container has been
    /// rewritten since the token was issued).  The returned scan picks up
    /// immediately after the captured position — no repeats, no gaps.
    pub fn resume(&self, token: &ResumeToken) -> Result<Scan<'a>> {
        if token.container != self.uuid {
            return Err(FormatError::TokenMismatch {
                container: self.uuid,
                token: token.container,
            });
        }
        if self.generation > token.generation {
            return Err(FormatError::StaleToken {
                container: self.generation,
                token: token.generation,
            });
        }
        if token.generation > self.generation {
            // A token from a future generation cannot have been derived from
            // this buffer.
            return Err(FormatError::TokenMismatch {
                container: self.uuid,
                token: token.container,
            });
        }
        let offset = usize::try_from(token.offset)
            .map_err(|_| corrupt("token offset does not fit in memory"))?;
        if offset < SUBHEADER_LEN || offset > self.records_end {
            return Err(corrupt(format!(
                "token offset {offset} outside the records region"
            )));
        }
        if token.consumed > u64::from(self.record_count) {
            return Err(corrupt(
                "token claims more consumed records than the container holds",
            ));
        }
        Ok(Scan {
            payload: self.payload,
            records_end: self.records_end,
            offset,
            consumed: token.consumed,
            uuid: self.uuid,
            generation: self.generation,
            done: false,
        })
    }
}

// ── Scan iterator ────────────────────────────────────────────────────────────

/// Lazy in-order record iterator over a decoded container.
#[derive(Debug)]
pub struct Scan<'a> {
    payload: &'a [u8],
    records_end: usize,
    offset: usize,
    consumed: u64,
    uuid: Uuid,
    generation: u64,
    done: bool,
}

impl<'a> Scan<'a> {
    /// Capture the current position as a resume token. Side-effect free; the
    /// scan continues unaffected.
    pub fn snapshot(&self) -> ResumeToken {
        ResumeToken {
            container: self.uuid,
            generation: self.generation,
            offset: self.offset as u64,
            consumed: self.consumed,
        }
    }

    /// Records yielded so far (or skipped, for a resumed scan).
    pub fn consumed(&self) -> u64 {
        self.consumed
    }
}

impl<'a> Iterator for Scan<'a> {
    type Item = Result<Record<'a>>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done || self.offset >= self.records_end {
            self.done = true;
            return None;
        }
        match read_record_at(self.payload, self.offset, self.records_end) {
            Ok((record, next)) => {
                self.offset = next;
                self.consumed += 1;
                Some(Ok(record))
            }
            Err(e) => {
                self.done = true;
                Some(Err(e))
            }
        }
    }
}

// ── Record parsing ───────────────────────────────────────────────────────────

/// One footer index entry: length-prefixed key, then the record offset.
fn read_index_entry<'a>(cur: &mut ReadCursor<'a>) -> Result<(&'a [u8], u64)> {
    let key_len = cur.read_u16()? as usize;
    let key = cur.read_bytes(key_len)?;
    let offset = cur.read_u64()?;
    Ok((key, offset))
}

/// Raw record fields at `offset` within the records region.
fn read_record_raw<'a>(
    region: &'a [u8],
    offset: usize,
) -> Result<(&'a [u8], &'a [u8], u32, usize)> {
    let mut cur = ReadCursor::new(region);
    cur.seek(offset)?;
    let key_len = cur.read_u16()? as usize;
    let value_len = cur.read_u32()? as usize;
    let key = cur.read_bytes(key_len)?;
    let value = cur.read_bytes(value_len)?;
    let stored = cur.read_u32()?;
    Ok((key, value, stored, cur.position()))
}

/// Parse one record at a payload-relative offset, verifying its checksum.
/// Returns the record and the offset of the next one.
fn read_record_at<'a>(
    payload: &'a [u8],
    offset: usize,
    records_end: usize,
) -> Result<(Record<'a>, usize)> {
    let (key, value, stored, next) = match read_record_raw(&payload[..records_end], offset) {
        Ok(p) => p,
        Err(FormatError::OutOfBounds { .. }) => {
            return Err(corrupt(format!(
                "record at offset {offset} extends past the records region"
            )))
        }
        Err(e) => return Err(e),
    };
    let computed = checksum::crc32_parts(&[key, value]);
    if computed != stored {
        return Err(corrupt(format!(
            "record checksum mismatch at offset {offset}: stored {}, computed {}",
            hex::encode(stored.to_le_bytes()),
            hex::encode(computed.to_le_bytes()),
        )));
    }
    Ok((Record { key, value }, next))
}
