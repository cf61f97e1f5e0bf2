//! Common fixed header shared by the three LyraDB formats.
//!
//! Layout (all integers little-endian):
//!
//! ```text
//! [magic tag][version_major: u16][version_minor: u16][flags: u8][payload_len: u64]
//! ```
//!
//! The magic tag is the exact per-format ASCII constant (`LYRADB`,
//! `LYRADBITE`, `LYRA`), so the header size is a per-format constant.
//! `payload_len` counts every byte after the fixed header, trailer checksum
//! included.  No payload byte is interpreted before the magic and version are
//! recognised.

use std::fmt;

use crate::cursor::{ReadCursor, WriteCursor};
use crate::error::{FormatError, Result};

/// Magic tag of a `.lyradb` database container.
pub const LYRADB_MAGIC: &[u8] = b"LYRADB";
/// Magic tag of a `.lyradbite` resume token.
pub const LYRADBITE_MAGIC: &[u8] = b"LYRADBITE";
/// Magic tag of a `.lyra` archive.
pub const LYRA_MAGIC: &[u8] = b"LYRA";

/// Bit 0 of the flags byte: multi-byte integers are little-endian.
/// Always set by v1 encoders; v1 decoders reject buffers without it.
pub const FLAG_LITTLE_ENDIAN: u8 = 0b0000_0001;

/// Flag bits a v1 decoder understands. Strict validation rejects the rest.
pub const KNOWN_FLAGS: u8 = FLAG_LITTLE_ENDIAN;

// ── Version ──────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Version {
    pub major: u16,
    pub minor: u16,
}

/// Newest format version this build encodes and decodes.
pub const CURRENT_VERSION: Version = Version { major: 1, minor: 0 };

impl Version {
    /// A buffer is decodable when its major version matches ours and its
    /// minor version is not newer than ours.
    pub fn is_supported(self) -> bool {
        self.major == CURRENT_VERSION.major && self.minor <= CURRENT_VERSION.minor
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.major, self.minor)
    }
}

// ── FormatKind ───────────────────────────────────────────────────────────────

/// Which of the three on-disk formats a buffer claims to be.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormatKind {
    /// `.lyradb` database container.
    Container,
    /// `.lyradbite` iterator resume token.
    Iterator,
    /// `.lyra` archive bundle.
    Archive,
}

impl FormatKind {
    pub fn magic(self) -> &'static [u8] {
        match self {
            FormatKind::Container => LYRADB_MAGIC,
            FormatKind::Iterator => LYRADBITE_MAGIC,
            FormatKind::Archive => LYRA_MAGIC,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            FormatKind::Container => "database container",
            FormatKind::Iterator => "iterator token",
            FormatKind::Archive => "archive",
        }
    }

    pub fn extension(self) -> &'static str {
        match self {
            FormatKind::Container => ".lyradb",
            FormatKind::Iterator => ".lyradbite",
            FormatKind::Archive => ".lyra",
        }
    }

    /// Size of the fixed header for this format: magic + 2 + 2 + 1 + 8.
    pub fn header_len(self) -> usize {
        self.magic().len() + 13
    }

    /// Sniff the magic tag at the start of `bytes`.
    ///
    /// `LYRADB` and `LYRADBITE` both start with `LYRA`, so the longest tag
    /// is matched first.
    pub fn detect(bytes: &[u8]) -> Option<FormatKind> {
        for kind in [
            FormatKind::Iterator,
            FormatKind::Container,
            FormatKind::Archive,
        ] {
            if bytes.starts_with(kind.magic()) {
                return Some(kind);
            }
        }
        None
    }
}

// ── FormatHeader ─────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy)]
pub struct FormatHeader {
    pub kind: FormatKind,
    pub version: Version,
    pub flags: u8,
    pub payload_len: u64,
}

impl FormatHeader {
    /// Header for a freshly encoded buffer: current version, LE flag set.
    pub fn new(kind: FormatKind, payload_len: u64) -> Self {
        Self {
            kind,
            version: CURRENT_VERSION,
            flags: FLAG_LITTLE_ENDIAN,
            payload_len,
        }
    }

    pub fn write(&self, w: &mut WriteCursor) -> Result<()> {
        w.write_bytes(self.kind.magic())?;
        w.write_u16(self.version.major)?;
        w.write_u16(self.version.minor)?;
        w.write_u8(self.flags)?;
        w.write_u64(self.payload_len)?;
        Ok(())
    }

    /// Read a header, checking only the magic tag.  Version, flag, and
    /// length consistency checks belong to the validator.
    pub fn read(kind: FormatKind, r: &mut ReadCursor<'_>) -> Result<Self> {
        let magic = r.read_bytes(kind.magic().len()).map_err(|_| {
            FormatError::TruncatedInput {
                declared: kind.header_len() as u64,
                actual: r.remaining() as u64,
            }
        })?;
        if magic != kind.magic() {
            return Err(FormatError::FormatMismatch(format!(
                "bad magic for {}: expected {:?}, found {:?}",
                kind.name(),
                String::from_utf8_lossy(kind.magic()),
                String::from_utf8_lossy(magic),
            )));
        }
        let major = r.read_u16()?;
        let minor = r.read_u16()?;
        let flags = r.read_u8()?;
        let payload_len = r.read_u64()?;
        Ok(Self {
            kind,
            version: Version { major, minor },
            flags,
            payload_len,
        })
    }
}
