//! Shared pre-decode validation pass.
//!
//! Every decode entry point calls [`validate`] before interpreting a single
//! payload byte: magic tag, version compatibility, endianness flag, and
//! declared-length-vs-buffer consistency are all checked up front, so a
//! malformed buffer can never cause attacker-controlled lengths to be walked
//! as valid offsets.
//!
//! With the `strict-validation` feature (default on, the Rust rendition of
//! the `LYRADB_ENABLE_FORMAT_VALIDATION` build switch) the pass additionally
//! rejects unknown flag bits and trailing bytes past the declared payload.
//! Without it those are tolerated; magic, version, and length floor checks
//! always run.

use tracing::trace;

use crate::cursor::ReadCursor;
use crate::error::{FormatError, Result};
use crate::header::{FormatHeader, FormatKind, FLAG_LITTLE_ENDIAN};
#[cfg(feature = "strict-validation")]
use crate::header::KNOWN_FLAGS;

/// Validate the fixed header of `bytes` as format `kind` and return the
/// header together with the declared payload slice.
///
/// On success the returned slice is exactly `payload_len` bytes long and
/// starts right after the fixed header.
pub fn validate<'a>(kind: FormatKind, bytes: &'a [u8]) -> Result<(FormatHeader, &'a [u8])> {
    let header_len = kind.header_len();
    if bytes.len() < header_len {
        return Err(FormatError::TruncatedInput {
            declared: header_len as u64,
            actual: bytes.len() as u64,
        });
    }

    let mut cur = ReadCursor::new(bytes);
    let header = FormatHeader::read(kind, &mut cur)?;

    if !header.version.is_supported() {
        return Err(FormatError::FormatMismatch(format!(
            "unsupported {} version {}",
            kind.name(),
            header.version,
        )));
    }
    if header.flags & FLAG_LITTLE_ENDIAN == 0 {
        return Err(FormatError::FormatMismatch(format!(
            "{} header does not carry the little-endian flag",
            kind.name(),
        )));
    }
    #[cfg(feature = "strict-validation")]
    if header.flags & !KNOWN_FLAGS != 0 {
        return Err(FormatError::FormatMismatch(format!(
            "unknown flag bits 0b{:08b} in {} header",
            header.flags & !KNOWN_FLAGS,
            kind.name(),
        )));
    }

    let available = (bytes.len() - header_len) as u64;
    if header.payload_len > available {
        return Err(FormatError::TruncatedInput {
            declared: header.payload_len,
            actual: available,
        });
    }
    #[cfg(feature = "strict-validation")]
    if available > header.payload_len {
        return Err(FormatError::CorruptData(format!(
            "{} trailing bytes past the declared {} payload",
            available - header.payload_len,
            kind.name(),
        )));
    }

    // payload_len <= available <= usize::MAX, so the cast is lossless.
    let payload = &bytes[header_len..header_len + header.payload_len as usize];

    trace!(
        format = kind.name(),
        version = %header.version,
        payload_len = header.payload_len,
        "header validated"
    );
    Ok((header, payload))
}
