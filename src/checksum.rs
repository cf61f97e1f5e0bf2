//! Integrity digests used by all three formats.
//!
//! Two digest families are in play:
//!
//! - **CRC32** (IEEE) — record checksums and whole-buffer trailer checksums.
//! - **BLAKE3-256** — archive entry content hashes, computed over the
//!   *uncompressed* entry bytes so extraction verifies end to end.
//!
//! The digest algorithm is fixed per format version.  Decoders read the
//! header version first and select the matching routine through
//! [`ChecksumKind::for_version`]; the current algorithm is never assumed when
//! decoding an older buffer.

use crc32fast::Hasher;

use crate::header::Version;

/// Width of a CRC32 trailer/record digest in bytes.
pub const CRC32_LEN: usize = 4;

/// Width of a BLAKE3 content hash in bytes.
pub const CONTENT_HASH_LEN: usize = 32;

/// Trailer digest algorithm, keyed by format version.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChecksumKind {
    Crc32,
}

impl ChecksumKind {
    /// Select the trailer digest routine for a header version.
    /// Returns `None` for versions this build cannot checksum.
    pub fn for_version(version: Version) -> Option<Self> {
        match version.major {
            1 => Some(ChecksumKind::Crc32),
            _ => None,
        }
    }

    pub fn digest_len(self) -> usize {
        match self {
            ChecksumKind::Crc32 => CRC32_LEN,
        }
    }
}

pub fn crc32(bytes: &[u8]) -> u32 {
    let mut hasher = Hasher::new();
    hasher.update(bytes);
    hasher.finalize()
}

/// CRC32 over the concatenation of `parts`, without materializing it.
/// Order-sensitive, like the digest itself.
pub fn crc32_parts(parts: &[&[u8]]) -> u32 {
    let mut hasher = Hasher::new();
    for part in parts {
        hasher.update(part);
    }
    hasher.finalize()
}

pub fn verify_crc32(bytes: &[u8], expected: u32) -> bool {
    crc32(bytes) == expected
}

pub fn content_hash(bytes: &[u8]) -> [u8; CONTENT_HASH_LEN] {
    blake3::hash(bytes).into()
}

pub fn verify_content_hash(bytes: &[u8], expected: &[u8; CONTENT_HASH_LEN]) -> bool {
    // Not constant-time; these are integrity checks, not authentication.
    content_hash(bytes) == *expected
}
