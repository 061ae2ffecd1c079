//! Single chunk zlib transform.
use std::io::Write;

use flate2::write::ZlibEncoder;
use flate2::{Compression, Decompress, FlushDecompress, Status};
use log::trace;

use crate::error::{BundleError, Result};

/// Compress one chunk at the default zlib level.
pub fn compress(data: &[u8]) -> Result<Vec<u8>> {
    let mut encoder = ZlibEncoder::new(Vec::with_capacity(data.len() / 2), Compression::default());
    encoder.write_all(data)?;
    let compressed = encoder.finish()?;

    trace!("compressed chunk {} -> {} bytes", data.len(), compressed.len());

    Ok(compressed)
}

/// Inflate one chunk, producing at most `max_len` bytes.
///
/// Anything short of a complete zlib stream is a corrupt chunk, including
/// a stream that would inflate past `max_len`.
pub fn decompress(data: &[u8], max_len: usize) -> Result<Vec<u8>> {
    let mut inflater = Decompress::new(true);
    let mut out = Vec::with_capacity(max_len);

    let status = inflater
        .decompress_vec(data, &mut out, FlushDecompress::Finish)
        .map_err(|err| BundleError::CorruptChunk(err.to_string()))?;

    match status {
        Status::StreamEnd if out.len() <= max_len => {
            trace!("inflated chunk {} -> {} bytes", data.len(), out.len());
            Ok(out)
        }
        Status::StreamEnd => Err(BundleError::CorruptChunk(format!(
            "inflated to {} bytes, limit is {}",
            out.len(),
            max_len
        ))),
        Status::Ok | Status::BufError => Err(BundleError::CorruptChunk(format!(
            "stream incomplete after {} of {} input bytes",
            inflater.total_in(),
            data.len()
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::CHUNK_MAX_LEN;

    #[test]
    fn compress_then_decompress() {
        let data = b"hello hello hello hello hello".repeat(100);
        let compressed = compress(&data).unwrap();
        assert!(compressed.len() < data.len());
        assert_eq!(decompress(&compressed, CHUNK_MAX_LEN).unwrap(), data);
    }

    #[test]
    fn empty_chunk() {
        let compressed = compress(&[]).unwrap();
        assert!(decompress(&compressed, CHUNK_MAX_LEN).unwrap().is_empty());
    }

    #[test]
    fn garbage_is_corrupt() {
        let err = decompress(&[0xde, 0xad, 0xbe, 0xef], CHUNK_MAX_LEN).unwrap_err();
        assert!(matches!(err, BundleError::CorruptChunk(_)));
    }

    #[test]
    fn truncated_stream_is_corrupt() {
        let data = (0..4096u32).flat_map(|i| i.to_le_bytes()).collect::<Vec<u8>>();
        let compressed = compress(&data).unwrap();
        let cut = &compressed[..compressed.len() / 2];
        let err = decompress(cut, CHUNK_MAX_LEN).unwrap_err();
        assert!(matches!(err, BundleError::CorruptChunk(_)));
    }

    #[test]
    fn output_over_limit_is_corrupt() {
        let data = vec![7u8; 1024];
        let compressed = compress(&data).unwrap();
        let err = decompress(&compressed, 512).unwrap_err();
        assert!(matches!(err, BundleError::CorruptChunk(_)));
    }
}
