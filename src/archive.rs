//! `.lyra` archive codec — a portable bundle of named entries.
//!
//! Layout (offsets relative to the start of the payload):
//!
//! ```text
//! header                                LYRA magic, version, flags, payload_len
//! entry_count(u32) index_offset(u64) index_len(u64)
//! entry payloads …                      stored (optionally compressed) bytes
//! entry index                           JSON-serialized [`EntryRecord`] list
//! trailer crc32                         over header + subheader + index only
//! ```
//!
//! The trailer checksum deliberately excludes the entry payloads: each entry
//! carries its own BLAKE3 content hash, verified lazily the first time it is
//! extracted.  One corrupt entry therefore never makes the archive's
//! directory listing unusable.
//!
//! # Example
//!
//! ```
//! use lyradb_formats::archive::{Archive, ArchiveBuilder};
//! use lyradb_formats::codec::CodecId;
//!
//! let mut builder = ArchiveBuilder::new();
//! builder.add("db/main.lyradb", vec![1, 2, 3], CodecId::Zstd);
//! builder.add("manifest.txt", "hello".as_bytes().to_vec(), CodecId::None);
//! let bytes = builder.finish()?;
//!
//! let ar = Archive::decode(&bytes)?;
//! assert_eq!(ar.list(), vec!["db/main.lyradb", "manifest.txt"]);
//! assert_eq!(ar.extract("manifest.txt")?, b"hello");
//! # Ok::<(), lyradb_formats::FormatError>(())
//! ```

use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::checksum::{self, CRC32_LEN};
use crate::codec::{get_codec, get_codec_by_id, CodecId, DEFAULT_COMPRESSION_LEVEL};
use crate::cursor::{ReadCursor, WriteCursor};
use crate::error::{FormatError, Result};
use crate::header::{FormatHeader, FormatKind, Version};
use crate::validator;

/// entry_count(4) + index_offset(8) + index_len(8).
pub const SUBHEADER_LEN: usize = 20;

/// Entry count is stored as a u32.
pub const MAX_ENTRY_COUNT: usize = u32::MAX as usize;

fn corrupt(msg: impl Into<String>) -> FormatError {
    FormatError::CorruptData(msg.into())
}

// ── Entry index ──────────────────────────────────────────────────────────────

/// One named entry in the archive's index.
///
/// `content_hash` is BLAKE3 over the *uncompressed* bytes, so `extract`
/// verifies the whole decompress path end to end.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EntryRecord {
    pub name: String,
    /// Payload-relative offset of the stored bytes.
    pub offset: u64,
    /// Length of the stored (possibly compressed) bytes.
    pub stored_len: u64,
    /// Length after decompression.
    pub original_len: u64,
    /// On-disk codec ID; see [`CodecId`].
    pub codec: u8,
    pub content_hash: [u8; 32],
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub metadata: HashMap<String, String>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct EntryIndex {
    entries: Vec<EntryRecord>,
}

// ── Builder ──────────────────────────────────────────────────────────────────

struct PendingEntry {
    name: String,
    data: Vec<u8>,
    codec: CodecId,
    metadata: HashMap<String, String>,
}

/// Builder for a `.lyra` archive.
pub struct ArchiveBuilder {
    entries: Vec<PendingEntry>,
    level: i32,
}

impl ArchiveBuilder {
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
            level: DEFAULT_COMPRESSION_LEVEL,
        }
    }

    pub fn with_level(level: i32) -> Self {
        Self {
            entries: Vec::new(),
            level,
        }
    }

    pub fn add(&mut self, name: impl Into<String>, data: Vec<u8>, codec: CodecId) -> &mut Self {
        self.add_with_metadata(name, data, codec, HashMap::new())
    }

    pub fn add_with_metadata(
        &mut self,
        name: impl Into<String>,
        data: Vec<u8>,
        codec: CodecId,
        metadata: HashMap<String, String>,
    ) -> &mut Self {
        self.entries.push(PendingEntry {
            name: name.into(),
            data,
            codec,
            metadata,
        });
        self
    }

    /// Encode the archive. Produces no partial output on failure.
    pub fn finish(self) -> Result<Vec<u8>> {
        if self.entries.len() > MAX_ENTRY_COUNT {
            return Err(FormatError::FormatLimitExceeded(format!(
                "{} entries exceed the u32 entry count field",
                self.entries.len()
            )));
        }
        let mut seen: HashSet<&str> = HashSet::with_capacity(self.entries.len());
        for entry in &self.entries {
            if !seen.insert(&entry.name) {
                return Err(FormatError::DuplicateKey(entry.name.clone()));
            }
        }

        // Compress everything first; entry offsets depend on stored sizes.
        let mut records = Vec::with_capacity(self.entries.len());
        let mut stored_blobs = Vec::with_capacity(self.entries.len());
        let mut offset = SUBHEADER_LEN as u64;
        for entry in self.entries {
            let stored = get_codec(entry.codec).compress(&entry.data, self.level)?;
            records.push(EntryRecord {
                name: entry.name,
                offset,
                stored_len: stored.len() as u64,
                original_len: entry.data.len() as u64,
                codec: entry.codec as u8,
                content_hash: checksum::content_hash(&entry.data),
                metadata: entry.metadata,
            });
            offset += stored.len() as u64;
            stored_blobs.push(stored);
        }

        let index_bytes = serde_json::to_vec(&EntryIndex { entries: records })?;
        let index_offset = offset;
        let payload_len = index_offset as usize + index_bytes.len() + CRC32_LEN;
        let header_len = FormatKind::Archive.header_len();

        let mut w = WriteCursor::new(header_len + payload_len);
        FormatHeader::new(FormatKind::Archive, payload_len as u64).write(&mut w)?;
        w.write_u32(stored_blobs.len() as u32)?;
        w.write_u64(index_offset)?;
        w.write_u64(index_bytes.len() as u64)?;
        for blob in &stored_blobs {
            w.write_bytes(blob)?;
        }
        w.write_bytes(&index_bytes)?;

        // Header + subheader + index only — entry payloads are covered by
        // their per-entry content hashes.
        let trailer = checksum::crc32_parts(&[
            &w.written()[..header_len + SUBHEADER_LEN],
            &index_bytes,
        ]);
        w.write_u32(trailer)?;
        Ok(w.into_inner())
    }
}

impl Default for ArchiveBuilder {
    fn default() -> Self {
        Self::new()
    }
}

// ── Decoded handle ───────────────────────────────────────────────────────────

/// Immutable decoded view over an encoded `.lyra` buffer.
///
/// Decoding validates the header, structural bounds, and the index checksum.
/// Entry payload integrity is checked lazily by [`Archive::extract`].
#[derive(Debug)]
pub struct Archive<'a> {
    payload: &'a [u8],
    version: Version,
    entries: Vec<EntryRecord>,
}

impl<'a> Archive<'a> {
    pub fn decode(bytes: &'a [u8]) -> Result<Archive<'a>> {
        let (header, payload) = validator::validate(FormatKind::Archive, bytes)?;
        let header_len = FormatKind::Archive.header_len();

        if payload.len() < SUBHEADER_LEN + CRC32_LEN {
            return Err(corrupt(format!(
                "archive payload of {} bytes is smaller than the minimum structure",
                payload.len()
            )));
        }

        let mut cur = ReadCursor::new(payload);
        let entry_count = cur.read_u32()?;
        let index_offset = usize::try_from(cur.read_u64()?)
            .map_err(|_| corrupt("index offset does not fit in memory"))?;
        let index_len = usize::try_from(cur.read_u64()?)
            .map_err(|_| corrupt("index length does not fit in memory"))?;

        let trailer_at = payload.len() - CRC32_LEN;
        if index_offset < SUBHEADER_LEN
            || index_offset
                .checked_add(index_len)
                .map_or(true, |end| end != trailer_at)
        {
            return Err(corrupt(format!(
                "index region {index_offset}+{index_len} does not fill the archive payload"
            )));
        }
        let index_bytes = &payload[index_offset..trailer_at];

        let stored = {
            let mut c = ReadCursor::new(payload);
            c.seek(trailer_at)?;
            c.read_u32()?
        };
        let computed =
            checksum::crc32_parts(&[&bytes[..header_len + SUBHEADER_LEN], index_bytes]);
        if computed != stored {
            return Err(corrupt(format!(
                "archive index checksum mismatch: stored {}, computed {}",
                hex::encode(stored.to_le_bytes()),
                hex::encode(computed.to_le_bytes()),
            )));
        }

        let index: EntryIndex = serde_json::from_slice(index_bytes)
            .map_err(|e| corrupt(format!("archive index is not decodable: {e}")))?;
        if index.entries.len() != entry_count as usize {
            return Err(corrupt(format!(
                "index lists {} entries, header declares {entry_count}",
                index.entries.len()
            )));
        }

        // Every entry span must lie inside the payload region before the
        // index; names must be unique.
        let mut names: HashSet<&str> = HashSet::with_capacity(index.entries.len());
        for entry in &index.entries {
            let start = usize::try_from(entry.offset)
                .map_err(|_| corrupt("entry offset does not fit in memory"))?;
            let len = usize::try_from(entry.stored_len)
                .map_err(|_| corrupt("entry length does not fit in memory"))?;
            if start < SUBHEADER_LEN
                || start.checked_add(len).map_or(true, |end| end > index_offset)
            {
                return Err(corrupt(format!(
                    "entry '{}' spans {start}+{len}, outside the entry region",
                    entry.name
                )));
            }
            if !names.insert(&entry.name) {
                return Err(FormatError::DuplicateKey(entry.name.clone()));
            }
        }

        debug!(entries = entry_count, "archive decoded");
        Ok(Archive {
            payload,
            version: header.version,
            entries: index.entries,
        })
    }

    // ── Listing ──────────────────────────────────────────────────────────────

    pub fn version(&self) -> Version {
        self.version
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entry names in archive order. Never touches entry payloads.
    pub fn list(&self) -> Vec<&str> {
        self.entries.iter().map(|e| e.name.as_str()).collect()
    }

    pub fn entries(&self) -> &[EntryRecord] {
        &self.entries
    }

    pub fn stat(&self, name: &str) -> Option<&EntryRecord> {
        self.entries.iter().find(|e| e.name == name)
    }

    // ── Extraction ───────────────────────────────────────────────────────────

    /// Decompress (if flagged) and verify one entry.
    ///
    /// Integrity is checked here, not at decode time: a corrupt entry fails
    /// its own extraction with `CorruptData` while every other entry stays
    /// extractable.
    pub fn extract(&self, name: &str) -> Result<Vec<u8>> {
        let entry = self
            .stat(name)
            .ok_or_else(|| FormatError::NotFound(name.to_owned()))?;

        // Spans were validated at decode; the casts cannot fail after that.
        let start = entry.offset as usize;
        let end = start + entry.stored_len as usize;
        let stored = &self.payload[start..end];

        let codec = get_codec_by_id(entry.codec)?;
        let data = codec.decompress(stored).map_err(|e| {
            corrupt(format!("entry '{}' failed to decode: {e}", entry.name))
        })?;
        if data.len() as u64 != entry.original_len {
            return Err(corrupt(format!(
                "entry '{}' decoded to {} bytes, index declares {}",
                entry.name,
                data.len(),
                entry.original_len
            )));
        }
        if !checksum::verify_content_hash(&data, &entry.content_hash) {
            return Err(corrupt(format!(
                "entry '{}' content hash mismatch: expected {}",
                entry.name,
                hex::encode(entry.content_hash)
            )));
        }
        Ok(data)
    }
}
