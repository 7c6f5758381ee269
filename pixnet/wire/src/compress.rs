//! Compression wrappers with size enforcement.
//!
//! zlib (RFC 1950 framing) is used on the wire and in PXNT files; LZ4 block
//! compression is legal in PXNT files only. Decompression always runs under
//! a declared expected size and a hard ceiling so a hostile stream cannot
//! balloon memory.

use crate::error::WireError;
use flate2::read::ZlibDecoder;
use flate2::write::ZlibEncoder;
use flate2::Compression;
use std::io::{Read, Write};

/// Default decompression-bomb ceiling (256 MiB).
pub const DEFAULT_DECOMPRESS_CEILING: usize = 256 * 1024 * 1024;

/// Deflate a buffer with a zlib header at the default level.
pub fn zlib_compress(data: &[u8]) -> Result<Vec<u8>, WireError> {
    let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
    encoder
        .write_all(data)
        .and_then(|_| encoder.finish())
        .map_err(|e| WireError::Compress(e.to_string()))
}

/// Inflate a zlib stream, enforcing the expected output size.
///
/// `expected_len` is the size implied by the enclosing header (pixel
/// dimensions, declared uncompressed size). Output that stops short or runs
/// past it is rejected; `ceiling` caps the expectation itself.
pub fn zlib_decompress(
    data: &[u8],
    expected_len: usize,
    ceiling: usize,
) -> Result<Vec<u8>, WireError> {
    if expected_len > ceiling {
        return Err(WireError::DecompressBomb(expected_len));
    }

    let mut decoder = ZlibDecoder::new(data);
    let mut out = vec![0u8; expected_len];
    decoder
        .read_exact(&mut out)
        .map_err(|e| WireError::Compress(e.to_string()))?;

    // Exactly expected_len bytes must drain the stream.
    let mut probe = [0u8; 1];
    match decoder.read(&mut probe) {
        Ok(0) => Ok(out),
        Ok(_) => Err(WireError::SizeMismatch {
            section: "zlib stream",
            declared: expected_len,
            actual: expected_len + 1,
        }),
        Err(e) => Err(WireError::Compress(e.to_string())),
    }
}

/// Compress a buffer with the LZ4 block format.
pub fn lz4_compress(data: &[u8]) -> Vec<u8> {
    lz4_flex::block::compress(data)
}

/// Decompress an LZ4 block into exactly `expected_len` bytes.
pub fn lz4_decompress(
    data: &[u8],
    expected_len: usize,
    ceiling: usize,
) -> Result<Vec<u8>, WireError> {
    if expected_len > ceiling {
        return Err(WireError::DecompressBomb(expected_len));
    }

    let out = lz4_flex::block::decompress(data, expected_len)
        .map_err(|e| WireError::Compress(e.to_string()))?;
    if out.len() != expected_len {
        return Err(WireError::SizeMismatch {
            section: "lz4 block",
            declared: expected_len,
            actual: out.len(),
        });
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zlib_roundtrip() {
        let data: Vec<u8> = (0..4096u32).map(|i| (i % 251) as u8).collect();
        let packed = zlib_compress(&data).unwrap();
        assert!(packed.len() < data.len());
        let unpacked = zlib_decompress(&packed, data.len(), DEFAULT_DECOMPRESS_CEILING).unwrap();
        assert_eq!(unpacked, data);
    }

    #[test]
    fn test_zlib_wrong_expected_len() {
        let packed = zlib_compress(b"hello world").unwrap();
        assert!(zlib_decompress(&packed, 5, DEFAULT_DECOMPRESS_CEILING).is_err());
        assert!(zlib_decompress(&packed, 100, DEFAULT_DECOMPRESS_CEILING).is_err());
    }

    #[test]
    fn test_bomb_guard() {
        let packed = zlib_compress(&[0u8; 64]).unwrap();
        assert!(matches!(
            zlib_decompress(&packed, 1 << 30, 1 << 20),
            Err(WireError::DecompressBomb(_))
        ));
    }

    #[test]
    fn test_lz4_roundtrip() {
        let data = b"aaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaabbbb".to_vec();
        let packed = lz4_compress(&data);
        let unpacked = lz4_decompress(&packed, data.len(), DEFAULT_DECOMPRESS_CEILING).unwrap();
        assert_eq!(unpacked, data);
    }

    #[test]
    fn test_lz4_garbage_rejected() {
        assert!(lz4_decompress(&[0xFF, 0x00, 0x12], 64, DEFAULT_DECOMPRESS_CEILING).is_err());
    }
}
