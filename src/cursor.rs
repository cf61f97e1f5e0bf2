//! Bounds-checked little-endian cursors over fixed memory regions.
//!
//! Every other module performs its binary I/O through these two types; no
//! format code indexes raw slices directly.  All multi-byte integers are
//! little-endian — there is no runtime endianness negotiation.

use byteorder::{ByteOrder, LittleEndian};

use crate::error::{FormatError, Result};

// ── ReadCursor ───────────────────────────────────────────────────────────────

/// Forward-only reader over an immutable byte region.
///
/// Reads return slices borrowed from the underlying region (`'a`), so decoded
/// views stay zero-copy.  `seek` may reposition anywhere within the region
/// but never past its end.
#[derive(Debug, Clone)]
pub struct ReadCursor<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> ReadCursor<'a> {
    pub fn new(buf: &'a [u8]) -> Self {
        Self { buf, pos: 0 }
    }

    #[inline]
    pub fn position(&self) -> usize {
        self.pos
    }

    #[inline]
    pub fn remaining(&self) -> usize {
        self.buf.len() - self.pos
    }

    /// Reposition within the valid region. `offset == len` is allowed (EOF).
    pub fn seek(&mut self, offset: usize) -> Result<()> {
        if offset > self.buf.len() {
            return Err(FormatError::OutOfBounds {
                offset,
                requested: 0,
                len: self.buf.len(),
            });
        }
        self.pos = offset;
        Ok(())
    }

    /// Return the next `n` bytes and advance past them.
    pub fn read_bytes(&mut self, n: usize) -> Result<&'a [u8]> {
        if n > self.remaining() {
            return Err(FormatError::OutOfBounds {
                offset: self.pos,
                requested: n,
                len: self.buf.len(),
            });
        }
        let out = &self.buf[self.pos..self.pos + n];
        self.pos += n;
        Ok(out)
    }

    pub fn read_array<const N: usize>(&mut self) -> Result<[u8; N]> {
        let bytes = self.read_bytes(N)?;
        let mut out = [0u8; N];
        out.copy_from_slice(bytes);
        Ok(out)
    }

    pub fn read_u8(&mut self) -> Result<u8> {
        Ok(self.read_bytes(1)?[0])
    }

    pub fn read_u16(&mut self) -> Result<u16> {
        Ok(LittleEndian::read_u16(self.read_bytes(2)?))
    }

    pub fn read_u32(&mut self) -> Result<u32> {
        Ok(LittleEndian::read_u32(self.read_bytes(4)?))
    }

    pub fn read_u64(&mut self) -> Result<u64> {
        Ok(LittleEndian::read_u64(self.read_bytes(8)?))
    }

    pub fn read_i64(&mut self) -> Result<i64> {
        Ok(LittleEndian::read_i64(self.read_bytes(8)?))
    }
}

// ── WriteCursor ──────────────────────────────────────────────────────────────

/// Append-only writer with a fixed capacity.
///
/// Writing past `capacity` fails with [`FormatError::Overflow`] rather than
/// growing the region — encoders compute the exact output size up front and
/// treat an overflow as a logic error in the size computation.
#[derive(Debug)]
pub struct WriteCursor {
    buf: Vec<u8>,
    capacity: usize,
}

impl WriteCursor {
    pub fn new(capacity: usize) -> Self {
        Self {
            buf: Vec::with_capacity(capacity),
            capacity,
        }
    }

    #[inline]
    pub fn position(&self) -> usize {
        self.buf.len()
    }

    #[inline]
    pub fn remaining(&self) -> usize {
        self.capacity - self.buf.len()
    }

    /// Bytes written so far. Used to checksum a prefix before the trailer
    /// digest is appended.
    #[inline]
    pub fn written(&self) -> &[u8] {
        &self.buf
    }

    pub fn write_bytes(&mut self, bytes: &[u8]) -> Result<()> {
        if bytes.len() > self.remaining() {
            return Err(FormatError::Overflow {
                requested: bytes.len(),
                remaining: self.remaining(),
            });
        }
        self.buf.extend_from_slice(bytes);
        Ok(())
    }

    pub fn write_u8(&mut self, v: u8) -> Result<()> {
        self.write_bytes(&[v])
    }

    pub fn write_u16(&mut self, v: u16) -> Result<()> {
        let mut b = [0u8; 2];
        LittleEndian::write_u16(&mut b, v);
        self.write_bytes(&b)
    }

    pub fn write_u32(&mut self, v: u32) -> Result<()> {
        let mut b = [0u8; 4];
        LittleEndian::write_u32(&mut b, v);
        self.write_bytes(&b)
    }

    pub fn write_u64(&mut self, v: u64) -> Result<()> {
        let mut b = [0u8; 8];
        LittleEndian::write_u64(&mut b, v);
        self.write_bytes(&b)
    }

    pub fn write_i64(&mut self, v: i64) -> Result<()> {
        let mut b = [0u8; 8];
        LittleEndian::write_i64(&mut b, v);
        self.write_bytes(&b)
    }

    pub fn into_inner(self) -> Vec<u8> {
        self.buf
    }
}
