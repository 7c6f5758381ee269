//! Bounded byte-level codec primitives.
//!
//! Every read checks the remaining budget before consuming and fails closed
//! on overrun. The wire protocol reads big-endian; the PXNT container reads
//! little-endian — both variants live here so the two codecs share one
//! bounds-checking discipline.

use crate::error::WireError;
use bytes::{Buf, Bytes};

/// Compute the IEEE 802.3 CRC-32 (reflected 0xEDB88320) of a byte slice.
pub fn crc32(data: &[u8]) -> u32 {
    let mut hasher = crc32fast::Hasher::new();
    hasher.update(data);
    hasher.finalize()
}

/// A cursor over [`Bytes`] that refuses to read past its budget.
#[derive(Debug)]
pub struct BoundedReader {
    buf: Bytes,
}

impl BoundedReader {
    /// Wrap a buffer. The budget is the buffer length.
    pub fn new(buf: Bytes) -> Self {
        Self { buf }
    }

    /// Bytes left in the budget.
    pub fn remaining(&self) -> usize {
        self.buf.remaining()
    }

    /// True when the budget is exhausted.
    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    fn need(&self, n: usize, what: &'static str) -> Result<(), WireError> {
        if self.buf.remaining() < n {
            return Err(WireError::Truncated(what));
        }
        Ok(())
    }

    /// Read one byte.
    pub fn u8(&mut self, what: &'static str) -> Result<u8, WireError> {
        self.need(1, what)?;
        Ok(self.buf.get_u8())
    }

    /// Read a big-endian u16.
    pub fn u16_be(&mut self, what: &'static str) -> Result<u16, WireError> {
        self.need(2, what)?;
        Ok(self.buf.get_u16())
    }

    /// Read a big-endian u32.
    pub fn u32_be(&mut self, what: &'static str) -> Result<u32, WireError> {
        self.need(4, what)?;
        Ok(self.buf.get_u32())
    }

    /// Read a big-endian u64.
    pub fn u64_be(&mut self, what: &'static str) -> Result<u64, WireError> {
        self.need(8, what)?;
        Ok(self.buf.get_u64())
    }

    /// Read a little-endian u16.
    pub fn u16_le(&mut self, what: &'static str) -> Result<u16, WireError> {
        self.need(2, what)?;
        Ok(self.buf.get_u16_le())
    }

    /// Read a little-endian u32.
    pub fn u32_le(&mut self, what: &'static str) -> Result<u32, WireError> {
        self.need(4, what)?;
        Ok(self.buf.get_u32_le())
    }

    /// Read a little-endian u64.
    pub fn u64_le(&mut self, what: &'static str) -> Result<u64, WireError> {
        self.need(8, what)?;
        Ok(self.buf.get_u64_le())
    }

    /// Take exactly `n` bytes as a zero-copy slice.
    pub fn take(&mut self, n: usize, what: &'static str) -> Result<Bytes, WireError> {
        self.need(n, what)?;
        Ok(self.buf.split_to(n))
    }

    /// Take a fixed-size array.
    pub fn array<const N: usize>(&mut self, what: &'static str) -> Result<[u8; N], WireError> {
        self.need(N, what)?;
        let mut out = [0u8; N];
        self.buf.copy_to_slice(&mut out);
        Ok(out)
    }

    /// Read a u8-length-prefixed UTF-8 string (big-endian prefix is moot for u8).
    pub fn string_u8(&mut self, what: &'static str) -> Result<String, WireError> {
        let len = self.u8(what)? as usize;
        let raw = self.take(len, what)?;
        String::from_utf8(raw.to_vec()).map_err(|_| WireError::Utf8(what))
    }

    /// Read a u16-length-prefixed UTF-8 string with a big-endian prefix.
    pub fn string_u16_be(&mut self, what: &'static str) -> Result<String, WireError> {
        let len = self.u16_be(what)? as usize;
        let raw = self.take(len, what)?;
        String::from_utf8(raw.to_vec()).map_err(|_| WireError::Utf8(what))
    }

    /// Read a u16-length-prefixed UTF-8 string with a little-endian prefix.
    pub fn string_u16_le(&mut self, what: &'static str) -> Result<String, WireError> {
        let len = self.u16_le(what)? as usize;
        let raw = self.take(len, what)?;
        String::from_utf8(raw.to_vec()).map_err(|_| WireError::Utf8(what))
    }

    /// Read a u8-length-prefixed ASCII string, rejecting non-ASCII bytes.
    pub fn ascii_u8(&mut self, what: &'static str) -> Result<String, WireError> {
        let len = self.u8(what)? as usize;
        let raw = self.take(len, what)?;
        if !raw.iter().all(u8::is_ascii) {
            return Err(WireError::Ascii(what));
        }
        // Safe: all bytes are ASCII.
        Ok(String::from_utf8(raw.to_vec()).map_err(|_| WireError::Ascii(what))?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_crc32_known_vector() {
        // IEEE CRC-32 of "123456789"
        assert_eq!(crc32(b"123456789"), 0xCBF4_3926);
        assert_eq!(crc32(b""), 0);
    }

    #[test]
    fn test_bounded_reads() {
        let mut r = BoundedReader::new(Bytes::from_static(&[0x01, 0x02, 0x03, 0x04]));
        assert_eq!(r.u16_be("a").unwrap(), 0x0102);
        assert_eq!(r.u16_le("b").unwrap(), 0x0403);
        assert!(r.u8("c").is_err());
    }

    #[test]
    fn test_budget_overrun_fails_closed() {
        let mut r = BoundedReader::new(Bytes::from_static(&[0x05, b'h', b'i']));
        // Declared length 5, only 2 bytes present.
        assert!(matches!(r.string_u8("s"), Err(WireError::Truncated("s"))));
    }

    #[test]
    fn test_string_prefixes() {
        let mut buf = vec![0x02];
        buf.extend_from_slice("hi".as_bytes());
        buf.extend_from_slice(&[0x00, 0x03]);
        buf.extend_from_slice("abc".as_bytes());
        let mut r = BoundedReader::new(Bytes::from(buf));
        assert_eq!(r.string_u8("a").unwrap(), "hi");
        assert_eq!(r.string_u16_be("b").unwrap(), "abc");
        assert!(r.is_empty());
    }

    #[test]
    fn test_ascii_rejects_high_bytes() {
        let mut r = BoundedReader::new(Bytes::from_static(&[0x02, 0xC3, 0xA9]));
        assert!(matches!(r.ascii_u8("ua"), Err(WireError::Ascii("ua"))));
    }

    #[test]
    fn test_invalid_utf8_rejected() {
        let mut r = BoundedReader::new(Bytes::from_static(&[0x02, 0xFF, 0xFE]));
        assert!(matches!(r.string_u8("s"), Err(WireError::Utf8("s"))));
    }
}
