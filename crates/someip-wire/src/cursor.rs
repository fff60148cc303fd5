//! Big-endian byte codec (§4.1).
//!
//! `Writer` and `Reader` are lazy cursors over caller-owned buffers. Every
//! operation is bounds-checked; a failed write leaves the cursor position
//! unchanged so a caller can retry with more capacity or abandon the frame.

use crate::error::{Result, WireError};

/// Cursor over a mutable byte slice, writing big-endian primitives.
pub struct Writer<'a> {
    buf: &'a mut [u8],
    pos: usize,
}

impl<'a> Writer<'a> {
    /// Wraps `buf` for writing, starting at offset 0.
    pub fn new(buf: &'a mut [u8]) -> Self {
        Self { buf, pos: 0 }
    }

    /// Number of bytes written so far.
    pub fn position(&self) -> usize {
        self.pos
    }

    /// Bytes remaining before the destination is exhausted.
    pub fn remaining(&self) -> usize {
        self.buf.len() - self.pos
    }

    fn require(&self, needed: usize) -> Result<()> {
        let available = self.remaining();
        if needed > available {
            return Err(WireError::BufferOverflow { needed, available });
        }
        Ok(())
    }

    /// Writes a raw byte slice.
    pub fn write_bytes(&mut self, bytes: &[u8]) -> Result<()> {
        self.require(bytes.len())?;
        let end = self.pos + bytes.len();
        self.buf[self.pos..end].copy_from_slice(bytes);
        self.pos = end;
        Ok(())
    }

    /// Writes a single byte.
    pub fn write_u8(&mut self, value: u8) -> Result<()> {
        self.write_bytes(&[value])
    }

    /// Writes a big-endian `u16`.
    pub fn write_u16(&mut self, value: u16) -> Result<()> {
        self.write_bytes(&value.to_be_bytes())
    }

    /// Writes a big-endian `u32`.
    pub fn write_u32(&mut self, value: u32) -> Result<()> {
        self.write_bytes(&value.to_be_bytes())
    }

    /// Writes a big-endian `u64`.
    pub fn write_u64(&mut self, value: u64) -> Result<()> {
        self.write_bytes(&value.to_be_bytes())
    }

    /// Writes a signed byte.
    pub fn write_i8(&mut self, value: i8) -> Result<()> {
        self.write_u8(value as u8)
    }

    /// Writes a big-endian `i16`.
    pub fn write_i16(&mut self, value: i16) -> Result<()> {
        self.write_bytes(&value.to_be_bytes())
    }

    /// Writes a big-endian `i32`.
    pub fn write_i32(&mut self, value: i32) -> Result<()> {
        self.write_bytes(&value.to_be_bytes())
    }

    /// Writes a big-endian `i64`.
    pub fn write_i64(&mut self, value: i64) -> Result<()> {
        self.write_bytes(&value.to_be_bytes())
    }

    /// Writes an IEEE-754 `f32`, bit pattern preserved including NaN/±∞.
    pub fn write_f32(&mut self, value: f32) -> Result<()> {
        self.write_u32(value.to_bits())
    }

    /// Writes an IEEE-754 `f64`, bit pattern preserved including NaN/±∞.
    pub fn write_f64(&mut self, value: f64) -> Result<()> {
        self.write_u64(value.to_bits())
    }

    /// Writes a SOME/IP bool: `0x00` for false, `0x01` for true.
    pub fn write_bool(&mut self, value: bool) -> Result<()> {
        self.write_u8(u8::from(value))
    }

    /// Writes a UTF-8 string with a 4-byte big-endian byte-count prefix,
    /// padded with zero bytes to a 4-byte boundary.
    pub fn write_string(&mut self, value: &str) -> Result<()> {
        let bytes = value.as_bytes();
        self.write_u32(bytes.len() as u32)?;
        self.write_bytes(bytes)?;
        let pad = (4 - (bytes.len() % 4)) % 4;
        self.write_bytes(&[0u8; 4][..pad])
    }

    /// Writes a fixed-size array of raw elements, no length prefix.
    pub fn write_fixed_array(&mut self, elements: &[u8]) -> Result<()> {
        self.write_bytes(elements)
    }

    /// Writes a dynamic array with a 4-byte big-endian byte-count prefix.
    pub fn write_dynamic_array(&mut self, elements: &[u8]) -> Result<()> {
        self.write_u32(elements.len() as u32)?;
        self.write_bytes(elements)
    }
}

/// Cursor over an immutable byte slice, reading big-endian primitives.
pub struct Reader<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> Reader<'a> {
    /// Wraps `buf` for reading, starting at offset 0.
    pub fn new(buf: &'a [u8]) -> Self {
        Self { buf, pos: 0 }
    }

    /// Number of bytes consumed so far.
    pub fn position(&self) -> usize {
        self.pos
    }

    /// Bytes remaining before the source is exhausted.
    pub fn remaining(&self) -> usize {
        self.buf.len() - self.pos
    }

    fn require(&self, needed: usize) -> Result<()> {
        let available = self.remaining();
        if needed > available {
            return Err(WireError::InsufficientData { needed, available });
        }
        Ok(())
    }

    /// Reads `len` raw bytes.
    pub fn read_bytes(&mut self, len: usize) -> Result<&'a [u8]> {
        self.require(len)?;
        let end = self.pos + len;
        let slice = &self.buf[self.pos..end];
        self.pos = end;
        Ok(slice)
    }

    /// Reads a single byte.
    pub fn read_u8(&mut self) -> Result<u8> {
        Ok(self.read_bytes(1)?[0])
    }

    /// Reads a big-endian `u16`.
    pub fn read_u16(&mut self) -> Result<u16> {
        let b = self.read_bytes(2)?;
        Ok(u16::from_be_bytes([b[0], b[1]]))
    }

    /// Reads a big-endian `u32`.
    pub fn read_u32(&mut self) -> Result<u32> {
        let b = self.read_bytes(4)?;
        Ok(u32::from_be_bytes([b[0], b[1], b[2], b[3]]))
    }

    /// Reads a big-endian `u64`.
    // INVARIANT: read_bytes(8) returns exactly 8 bytes or an Err.
    #[allow(clippy::expect_used, reason = "slice length checked by read_bytes")]
    pub fn read_u64(&mut self) -> Result<u64> {
        let b = self.read_bytes(8)?;
        Ok(u64::from_be_bytes(b.try_into().expect("8 bytes read")))
    }

    /// Reads a signed byte.
    pub fn read_i8(&mut self) -> Result<i8> {
        Ok(self.read_u8()? as i8)
    }

    /// Reads a big-endian `i16`.
    pub fn read_i16(&mut self) -> Result<i16> {
        Ok(self.read_u16()? as i16)
    }

    /// Reads a big-endian `i32`.
    pub fn read_i32(&mut self) -> Result<i32> {
        Ok(self.read_u32()? as i32)
    }

    /// Reads a big-endian `i64`.
    pub fn read_i64(&mut self) -> Result<i64> {
        Ok(self.read_u64()? as i64)
    }

    /// Reads an IEEE-754 `f32`.
    pub fn read_f32(&mut self) -> Result<f32> {
        Ok(f32::from_bits(self.read_u32()?))
    }

    /// Reads an IEEE-754 `f64`.
    pub fn read_f64(&mut self) -> Result<f64> {
        Ok(f64::from_bits(self.read_u64()?))
    }

    /// Reads a SOME/IP bool (`0x00`/`0x01`); any nonzero byte is `true`.
    pub fn read_bool(&mut self) -> Result<bool> {
        Ok(self.read_u8()? != 0)
    }

    /// Reads a UTF-8 string with a 4-byte big-endian byte-count prefix,
    /// consuming trailing zero padding to the next 4-byte boundary.
    pub fn read_string(&mut self) -> Result<String> {
        let len = self.read_u32()? as usize;
        let bytes = self.read_bytes(len)?;
        let s = std::str::from_utf8(bytes)
            .map_err(|e| WireError::MalformedData(format!("invalid utf-8 string: {e}")))?
            .to_owned();
        let pad = (4 - (len % 4)) % 4;
        self.read_bytes(pad)?;
        Ok(s)
    }

    /// Reads a fixed-size array of `count` `width`-byte elements and
    /// returns the raw element bytes.
    pub fn read_fixed_array(&mut self, count: usize, width: usize) -> Result<&'a [u8]> {
        self.read_bytes(count * width)
    }

    /// Reads a dynamic array: a 4-byte big-endian byte-count prefix
    /// followed by that many bytes, which must be a multiple of `width`.
    pub fn read_dynamic_array(&mut self, width: usize) -> Result<&'a [u8]> {
        let len = self.read_u32()? as usize;
        if width > 0 && len % width != 0 {
            return Err(WireError::MalformedData(format!(
                "dynamic array length {len} not a multiple of element width {width}"
            )));
        }
        self.read_bytes(len)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trip_primitives() {
        let mut buf = [0u8; 64];
        let mut w = Writer::new(&mut buf);
        w.write_u8(0xAB).unwrap();
        w.write_u16(0x1234).unwrap();
        w.write_u32(0xDEAD_BEEF).unwrap();
        w.write_u64(0x0102_0304_0506_0708).unwrap();
        w.write_bool(true).unwrap();
        w.write_f32(1.5).unwrap();
        let n = w.position();

        let mut r = Reader::new(&buf[..n]);
        assert_eq!(r.read_u8().unwrap(), 0xAB);
        assert_eq!(r.read_u16().unwrap(), 0x1234);
        assert_eq!(r.read_u32().unwrap(), 0xDEAD_BEEF);
        assert_eq!(r.read_u64().unwrap(), 0x0102_0304_0506_0708);
        assert!(r.read_bool().unwrap());
        assert_eq!(r.read_f32().unwrap(), 1.5);
    }

    #[test]
    fn write_overflow_leaves_position_unchanged() {
        let mut buf = [0u8; 1];
        let mut w = Writer::new(&mut buf);
        let before = w.position();
        assert!(matches!(
            w.write_u32(1),
            Err(WireError::BufferOverflow { .. })
        ));
        assert_eq!(w.position(), before);
    }

    #[test]
    fn string_round_trip_with_padding() {
        let mut buf = [0u8; 32];
        let mut w = Writer::new(&mut buf);
        w.write_string("abc").unwrap();
        let n = w.position();
        assert_eq!(n, 4 + 3 + 1);

        let mut r = Reader::new(&buf[..n]);
        assert_eq!(r.read_string().unwrap(), "abc");
        assert_eq!(r.remaining(), 0);
    }

    #[test]
    fn dynamic_array_rejects_misaligned_length() {
        let mut buf = [0u8; 8];
        let mut w = Writer::new(&mut buf);
        w.write_u32(3).unwrap();
        let n = w.position();
        let mut r = Reader::new(&buf[..n]);
        assert!(matches!(
            r.read_dynamic_array(2),
            Err(WireError::MalformedData(_))
        ));
    }
}
