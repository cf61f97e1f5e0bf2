//! `.lyradbite` iterator resume-token codec.
//!
//! A resume token is a plain value capturing a scan position within one
//! specific container generation.  It holds no lock and does not prevent the
//! source container from being replaced — staleness is detected at
//! [`Container::resume`](crate::container::Container::resume), not prevented.
//!
//! Layout:
//!
//! ```text
//! header | container uuid(16) | generation u64 | offset u64 | consumed u64 | crc32
//! ```
//!
//! `offset` is the payload-relative byte offset of the next unread record;
//! `consumed` is the number of records already yielded.  The trailer CRC32
//! covers the header and all token fields.

use uuid::Uuid;

use crate::checksum::{self, ChecksumKind, CRC32_LEN};
use crate::cursor::{ReadCursor, WriteCursor};
use crate::error::{FormatError, Result};
use crate::header::{FormatHeader, FormatKind};
use crate::validator;

/// uuid(16) + generation(8) + offset(8) + consumed(8).
const TOKEN_FIELDS_LEN: usize = 40;
const TOKEN_PAYLOAD_LEN: usize = TOKEN_FIELDS_LEN + CRC32_LEN;

/// Snapshot of a scan position, valid only against the exact container
/// (identity and generation) it was captured from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResumeToken {
    pub(crate) container: Uuid,
    pub(crate) generation: u64,
    pub(crate) offset: u64,
    pub(crate) consumed: u64,
}

impl ResumeToken {
    /// Identity of the container this token was captured from.
    pub fn container(&self) -> Uuid {
        self.container
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Payload-relative byte offset of the next unread record.
    pub fn offset(&self) -> u64 {
        self.offset
    }

    /// Records consumed before the capture point.
    pub fn consumed(&self) -> u64 {
        self.consumed
    }

    /// Encode as a `.lyradbite` buffer.
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        let total = FormatKind::Iterator.header_len() + TOKEN_PAYLOAD_LEN;
        let mut w = WriteCursor::new(total);
        FormatHeader::new(FormatKind::Iterator, TOKEN_PAYLOAD_LEN as u64).write(&mut w)?;
        w.write_bytes(self.container.as_bytes())?;
        w.write_u64(self.generation)?;
        w.write_u64(self.offset)?;
        w.write_u64(self.consumed)?;
        let trailer = checksum::crc32(w.written());
        w.write_u32(trailer)?;
        Ok(w.into_inner())
    }

    /// Decode a `.lyradbite` buffer, validating header and checksum.
    pub fn from_bytes(bytes: &[u8]) -> Result<ResumeToken> {
        let (header, payload) = validator::validate(FormatKind::Iterator, bytes)?;
        if payload.len() != TOKEN_PAYLOAD_LEN {
            return Err(FormatError::CorruptData(format!(
                "iterator token payload is {} bytes, expected {TOKEN_PAYLOAD_LEN}",
                payload.len()
            )));
        }
        let kind = ChecksumKind::for_version(header.version).ok_or_else(|| {
            FormatError::FormatMismatch(format!(
                "no checksum routine for iterator token version {}",
                header.version
            ))
        })?;
        debug_assert_eq!(kind.digest_len(), CRC32_LEN);

        let header_len = FormatKind::Iterator.header_len();
        let mut cur = ReadCursor::new(payload);
        let container = Uuid::from_bytes(cur.read_array::<16>()?);
        let generation = cur.read_u64()?;
        let offset = cur.read_u64()?;
        let consumed = cur.read_u64()?;
        let stored = cur.read_u32()?;
        let computed =
            checksum::crc32_parts(&[&bytes[..header_len], &payload[..TOKEN_FIELDS_LEN]]);
        if computed != stored {
            return Err(FormatError::CorruptData(format!(
                "iterator token checksum mismatch: stored {}, computed {}",
                hex::encode(stored.to_le_bytes()),
                hex::encode(computed.to_le_bytes()),
            )));
        }
        Ok(ResumeToken {
            container,
            generation,
            offset,
            consumed,
        })
    }
}
