//! External compression capability used by the `.lyra` archive format.
//!
//! No compression algorithm lives in this crate; entries are passed through
//! a [`Codec`] backed by the `zstd` or `lz4_flex` crates (or stored verbatim
//! with [`CodecId::None`]).
//!
//! # Identity rules
//! The one-byte codec ID is written into every archive entry's index record.
//! IDs are permanent: a value is never reused, even if a codec is retired.
//! A reader that encounters an ID it cannot resolve MUST fail the extract —
//! there is no fallback codec and no negotiation.

use thiserror::Error;

/// Default Zstd compression level for archive entries.
pub const DEFAULT_COMPRESSION_LEVEL: i32 = 3;

#[derive(Error, Debug)]
pub enum CodecError {
    #[error("compression failed: {0}")]
    Compression(String),
    #[error("decompression failed: {0}")]
    Decompression(String),
    /// The entry names a codec ID this build cannot supply. Extraction must
    /// not continue.
    #[error("unknown codec id {0} — cannot decode without it")]
    UnknownCodec(u8),
}

// ── CodecId ──────────────────────────────────────────────────────────────────

/// On-disk codec discriminant for archive entries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum CodecId {
    /// Payload stored verbatim.
    None = 0,
    /// Zstandard — balanced speed/ratio (default).
    Zstd = 1,
    /// LZ4 — maximum throughput, lower ratio.
    Lz4 = 2,
}

impl CodecId {
    pub fn from_u8(v: u8) -> Option<Self> {
        match v {
            0 => Some(CodecId::None),
            1 => Some(CodecId::Zstd),
            2 => Some(CodecId::Lz4),
            _ => None,
        }
    }

    /// Human-readable name (diagnostics only — never parsed off disk).
    pub fn name(self) -> &'static str {
        match self {
            CodecId::None => "none",
            CodecId::Zstd => "zstd",
            CodecId::Lz4 => "lz4",
        }
    }

    pub fn from_name(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "none" => Some(CodecId::None),
            "zstd" => Some(CodecId::Zstd),
            "lz4" => Some(CodecId::Lz4),
            _ => None,
        }
    }
}

// ── Codec trait ──────────────────────────────────────────────────────────────

pub trait Codec: Send + Sync {
    fn codec_id(&self) -> CodecId;
    fn compress(&self, data: &[u8], level: i32) -> Result<Vec<u8>, CodecError>;
    fn decompress(&self, data: &[u8]) -> Result<Vec<u8>, CodecError>;
}

pub struct NoneCodec;
impl Codec for NoneCodec {
    fn codec_id(&self) -> CodecId {
        CodecId::None
    }
    fn compress(&self, data: &[u8], _: i32) -> Result<Vec<u8>, CodecError> {
        Ok(data.to_vec())
    }
    fn decompress(&self, data: &[u8]) -> Result<Vec<u8>, CodecError> {
        Ok(data.to_vec())
    }
}

pub struct ZstdCodec;
impl Codec for ZstdCodec {
    fn codec_id(&self) -> CodecId {
        CodecId::Zstd
    }
    fn compress(&self, data: &[u8], level: i32) -> Result<Vec<u8>, CodecError> {
        zstd::encode_all(data, level).map_err(|e| CodecError::Compression(e.to_string()))
    }
    fn decompress(&self, data: &[u8]) -> Result<Vec<u8>, CodecError> {
        zstd::decode_all(data).map_err(|e| CodecError::Decompression(e.to_string()))
    }
}

pub struct Lz4Codec;
impl Codec for Lz4Codec {
    fn codec_id(&self) -> CodecId {
        CodecId::Lz4
    }
    fn compress(&self, data: &[u8], _: i32) -> Result<Vec<u8>, CodecError> {
        Ok(lz4_flex::compress_prepend_size(data))
    }
    fn decompress(&self, data: &[u8]) -> Result<Vec<u8>, CodecError> {
        lz4_flex::decompress_size_prepended(data)
            .map_err(|e| CodecError::Decompression(e.to_string()))
    }
}

// ── Factory ──────────────────────────────────────────────────────────────────

/// Resolve a CodecId to a built-in codec.
pub fn get_codec(id: CodecId) -> Box<dyn Codec> {
    match id {
        CodecId::None => Box::new(NoneCodec),
        CodecId::Zstd => Box::new(ZstdCodec),
        CodecId::Lz4 => Box::new(Lz4Codec),
    }
}

/// Resolve an on-disk codec byte.  Fails hard on unknown IDs — the caller
/// MUST NOT fall back to any other codec.
pub fn get_codec_by_id(id: u8) -> Result<Box<dyn Codec>, CodecError> {
    match CodecId::from_u8(id) {
        Some(id) => Ok(get_codec(id)),
        None => Err(CodecError::UnknownCodec(id)),
    }
}
