//! Bounds-checked cursor over debug section bytes.
//!
//! Every read checks the remaining length first, so adversarial or truncated
//! input surfaces as a [`MalformedEntry`] instead of a panic.

use gimli::{Endianity, RunTimeEndian};
use thiserror::Error;

/// A record that could not be decoded.
///
/// This never crosses the public API: the decoder logs it and skips the
/// offending record. `resumable` tells the caller whether the cursor still
/// sits on a record boundary (the value was bad but its size was known).
#[derive(Debug, Clone, Copy, Error, PartialEq, Eq)]
#[error("malformed entry at offset 0x{offset:x}: {reason}")]
pub(crate) struct MalformedEntry
{
    pub offset: usize,
    pub reason: &'static str,
    pub resumable: bool,
}

pub(crate) type DecodeResult<T> = std::result::Result<T, MalformedEntry>;

#[derive(Clone, Copy)]
pub(crate) struct Reader<'a>
{
    data: &'a [u8],
    pos: usize,
    /// Offset of `data[0]` inside its section.
    base: usize,
    endian: RunTimeEndian,
}

impl<'a> Reader<'a>
{
    pub fn new(data: &'a [u8], endian: RunTimeEndian) -> Self
    {
        Self {
            data,
            pos: 0,
            base: 0,
            endian,
        }
    }

    /// Cursor over `section[offset..]`, reporting offsets relative to the
    /// whole section.
    pub fn at(section: &'a [u8], offset: usize, endian: RunTimeEndian) -> DecodeResult<Self>
    {
        let data = section.get(offset..).ok_or(MalformedEntry {
            offset,
            reason: "offset beyond end of section",
            resumable: false,
        })?;
        Ok(Self {
            data,
            pos: 0,
            base: offset,
            endian,
        })
    }

    pub fn is_empty(&self) -> bool
    {
        self.pos >= self.data.len()
    }

    pub fn remaining_len(&self) -> usize
    {
        self.data.len().saturating_sub(self.pos)
    }

    /// Position of the cursor inside the enclosing section.
    pub fn section_offset(&self) -> usize
    {
        self.base + self.pos
    }

    pub fn malformed(&self, reason: &'static str) -> MalformedEntry
    {
        MalformedEntry {
            offset: self.section_offset(),
            reason,
            resumable: false,
        }
    }

    /// Detach the next `len` bytes as an independent reader and advance past
    /// them. Fails if `len` exceeds what is left.
    pub fn split(&mut self, len: usize) -> DecodeResult<Reader<'a>>
    {
        let base = self.section_offset();
        let bytes = self.read_bytes(len)?;
        Ok(Reader {
            data: bytes,
            pos: 0,
            base,
            endian: self.endian,
        })
    }

    pub fn skip(&mut self, len: usize) -> DecodeResult<()>
    {
        self.read_bytes(len).map(|_| ())
    }

    pub fn read_bytes(&mut self, len: usize) -> DecodeResult<&'a [u8]>
    {
        if len > self.remaining_len() {
            return Err(self.malformed("length exceeds remaining bytes"));
        }
        let start = self.pos;
        self.pos += len;
        Ok(&self.data[start..self.pos])
    }

    pub fn read_u8(&mut self) -> DecodeResult<u8>
    {
        let byte = *self
            .data
            .get(self.pos)
            .ok_or_else(|| self.malformed("unexpected end of data"))?;
        self.pos += 1;
        Ok(byte)
    }

    pub fn read_i8(&mut self) -> DecodeResult<i8>
    {
        Ok(i8::from_ne_bytes([self.read_u8()?]))
    }

    pub fn read_u16(&mut self) -> DecodeResult<u16>
    {
        let bytes = self.read_bytes(2)?;
        Ok(self.endian.read_u16(bytes))
    }

    pub fn read_u32(&mut self) -> DecodeResult<u32>
    {
        let bytes = self.read_bytes(4)?;
        Ok(self.endian.read_u32(bytes))
    }

    pub fn read_u64(&mut self) -> DecodeResult<u64>
    {
        let bytes = self.read_bytes(8)?;
        Ok(self.endian.read_u64(bytes))
    }

    /// Fixed-width unsigned integer of `size` bytes (1, 2, 3, 4 or 8).
    pub fn read_uint(&mut self, size: u8) -> DecodeResult<u64>
    {
        match size {
            1 => self.read_u8().map(u64::from),
            2 => self.read_u16().map(u64::from),
            3 => {
                let bytes = self.read_bytes(3)?;
                let (lo, hi) = if self.endian.is_big_endian() {
                    (u64::from(bytes[2]), u64::from(bytes[0]))
                } else {
                    (u64::from(bytes[0]), u64::from(bytes[2]))
                };
                Ok(lo | (u64::from(bytes[1]) << 8) | (hi << 16))
            }
            4 => self.read_u32().map(u64::from),
            8 => self.read_u64(),
            _ => Err(self.malformed("unsupported integer width")),
        }
    }

    /// Section offset of `offset_size` bytes (4 for 32-bit DWARF, 8 for 64-bit).
    pub fn read_offset(&mut self, offset_size: u8) -> DecodeResult<u64>
    {
        self.read_uint(offset_size)
    }

    pub fn read_uleb128(&mut self) -> DecodeResult<u64>
    {
        let mut result = 0u64;
        let mut shift = 0u32;
        loop {
            let byte = self.read_u8()?;
            if shift < 64 {
                result |= u64::from(byte & 0x7f) << shift;
            } else if byte & 0x7f != 0 {
                return Err(self.malformed("LEB128 value overflows 64 bits"));
            }
            if byte & 0x80 == 0 {
                return Ok(result);
            }
            shift += 7;
        }
    }

    pub fn read_sleb128(&mut self) -> DecodeResult<i64>
    {
        let mut result = 0i64;
        let mut shift = 0u32;
        let mut byte;
        loop {
            byte = self.read_u8()?;
            if shift < 64 {
                result |= i64::from(byte & 0x7f) << shift;
            }
            shift += 7;
            if byte & 0x80 == 0 {
                break;
            }
        }
        if shift < 64 && byte & 0x40 != 0 {
            result |= !0i64 << shift;
        }
        Ok(result)
    }

    /// LEB128 value that must fit in a `u32`, as used by WASM section headers.
    pub fn read_var_u32(&mut self) -> DecodeResult<u32>
    {
        let value = self.read_uleb128()?;
        u32::try_from(value).map_err(|_| self.malformed("LEB128 value exceeds u32"))
    }

    /// LEB128 length that must fit in `usize`.
    pub fn read_uleb_len(&mut self) -> DecodeResult<usize>
    {
        let value = self.read_uleb128()?;
        usize::try_from(value).map_err(|_| self.malformed("length exceeds address space"))
    }

    /// NUL-terminated string, without the terminator.
    pub fn read_cstr(&mut self) -> DecodeResult<&'a [u8]>
    {
        let rest = &self.data[self.pos.min(self.data.len())..];
        let len = rest
            .iter()
            .position(|&b| b == 0)
            .ok_or_else(|| self.malformed("unterminated string"))?;
        let bytes = &rest[..len];
        self.pos += len + 1;
        Ok(bytes)
    }
}

/// NUL-terminated string starting at `offset` in a string section.
///
/// The cursor that produced `offset` is unaffected by a bad lookup, so the
/// failure is marked resumable.
pub(crate) fn string_at(section: &[u8], offset: u64) -> DecodeResult<String>
{
    let resumable = |reason| MalformedEntry {
        offset: usize::try_from(offset).unwrap_or(usize::MAX),
        reason,
        resumable: true,
    };
    let start = usize::try_from(offset).map_err(|_| resumable("string offset out of range"))?;
    let rest = section
        .get(start..)
        .ok_or_else(|| resumable("string offset out of range"))?;
    let len = rest
        .iter()
        .position(|&b| b == 0)
        .ok_or_else(|| resumable("unterminated string"))?;
    Ok(String::from_utf8_lossy(&rest[..len]).into_owned())
}
