//! Gzip framing for chapter bodies.

use std::io::{Read, Write};

use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use flate2::Compression;

use crate::core::error::{LibraryError, LibraryResult};

/// Compress UTF-8 text into a gzip member
pub fn gzip_string(text: &str) -> LibraryResult<Vec<u8>> {
    let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
    encoder
        .write_all(text.as_bytes())
        .map_err(|e| LibraryError::CodecError(format!("gzip failed: {}", e)))?;
    encoder
        .finish()
        .map_err(|e| LibraryError::CodecError(format!("gzip failed: {}", e)))
}

/// Decompress a gzip stream holding UTF-8 text
pub fn gunzip_to_string(data: &[u8]) -> LibraryResult<String> {
    let mut decoder = GzDecoder::new(data);
    let mut text = String::new();
    decoder
        .read_to_string(&mut text)
        .map_err(|e| LibraryError::CodecError(format!("gunzip failed: {}", e)))?;
    Ok(text)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_round_trip_preserves_text() {
        let text = "第一章 陨落的天才\n\nThe wind howled over the cliffs.";
        let compressed = gzip_string(text).unwrap();
        assert_eq!(&compressed[..2], &[0x1f, 0x8b]);
        assert_eq!(gunzip_to_string(&compressed).unwrap(), text);
    }

    #[test]
    fn test_repetitive_text_shrinks() {
        let text = "the same line again\n".repeat(500);
        let compressed = gzip_string(&text).unwrap();
        assert!(compressed.len() < text.len() / 10);
    }

    #[test]
    fn test_garbage_is_codec_error() {
        let err = gunzip_to_string(b"definitely not gzip").unwrap_err();
        assert_eq!(err.error_code(), "CODEC_FAILURE");
    }
}
