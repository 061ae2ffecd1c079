//! Segmented container that wraps a bundle's package bytes.
//!
//! Layout:
//!
//! ```text
//! +--------------------+
//! | version     u32    |
//! | size hint   u32    |
//! | reserved    u32    |
//! +--------------------+
//! | stored size u32    |  repeated until the end of the file
//! | chunk bytes        |
//! +--------------------+
//! ```
//!
//! A chunk stored with a size of exactly [`CHUNK_MAX_LEN`] is raw, every
//! other chunk is a zlib stream inflating to at most [`CHUNK_MAX_LEN`]
//! bytes. There is no end marker, the chunk loop stops when the file does.
use std::borrow::Cow;
use std::io::{Cursor, Write};
use std::path::Path;

use byteorder::{LittleEndian, WriteBytesExt};
use log::{debug, trace, warn};

use crate::chunk;
use crate::constants::*;
use crate::cursor::{self, ByteCursor};
use crate::error::{BundleError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ArchiveHeader {
    pub version: u32,
    /// Not populated by the engine's packer, don't rely on it.
    pub size_hint: u32,
    pub reserved: u32,
}

impl ArchiveHeader {
    fn read(reader: &mut ByteCursor) -> Result<Self> {
        Ok(Self {
            version: cursor::read_u32(reader)?,
            size_hint: cursor::read_u32(reader)?,
            reserved: cursor::read_u32(reader)?,
        })
    }

    fn write<W: Write>(&self, writer: &mut W) -> Result<()> {
        writer.write_u32::<LittleEndian>(self.version)?;
        writer.write_u32::<LittleEndian>(self.size_hint)?;
        writer.write_u32::<LittleEndian>(self.reserved)?;
        Ok(())
    }
}

impl Default for ArchiveHeader {
    fn default() -> Self {
        Self {
            version: ARCHIVE_FORMAT_VERSION,
            size_hint: 0,
            reserved: 0,
        }
    }
}

/// One chunk as it sits in the container.
#[derive(Debug, Clone, Copy)]
pub struct StoredChunk<'a> {
    /// Byte offset of the chunk's length prefix.
    pub offset: u64,
    pub bytes: &'a [u8],
}

impl<'a> StoredChunk<'a> {
    #[inline]
    pub fn is_raw(&self) -> bool {
        self.bytes.len() == CHUNK_MAX_LEN
    }

    pub fn decode(&self) -> Result<Cow<'a, [u8]>> {
        if self.is_raw() {
            Ok(Cow::Borrowed(self.bytes))
        } else {
            chunk::decompress(self.bytes, CHUNK_MAX_LEN).map(Cow::Owned)
        }
    }
}

/// Walks the chunks of an archive held in memory.
pub struct Chunks<'a> {
    reader: ByteCursor<'a>,
    failed: bool,
}

impl<'a> Iterator for Chunks<'a> {
    type Item = Result<StoredChunk<'a>>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed || cursor::remaining(&self.reader) == 0 {
            return None;
        }

        let offset = self.reader.position();
        let next = cursor::read_u32(&mut self.reader)
            .and_then(|stored_len| cursor::take(&mut self.reader, stored_len as usize))
            .map(|bytes| StoredChunk { offset, bytes });

        self.failed = next.is_err();
        Some(next)
    }
}

/// Read the header and return an iterator over the stored chunks.
pub fn chunks(archive: &[u8]) -> Result<(ArchiveHeader, Chunks<'_>)> {
    let mut reader = Cursor::new(archive);
    let header = ArchiveHeader::read(&mut reader)?;

    debug!(
        "archive version: {:08X}, size hint: {}, reserved: {}",
        header.version, header.size_hint, header.reserved
    );
    if header.version != ARCHIVE_FORMAT_VERSION {
        warn!(
            "unexpected archive version {:08X}, expected {:08X}",
            header.version, ARCHIVE_FORMAT_VERSION
        );
    }

    Ok((header, Chunks { reader, failed: false }))
}

/// Decode a whole archive into the package bytes it wraps.
pub fn decode(archive: &[u8]) -> Result<Vec<u8>> {
    let (_, chunks) = chunks(archive)?;

    let mut data = Vec::with_capacity(archive.len());
    let mut count = 0usize;

    for chunk in chunks {
        let chunk = chunk?;
        let decoded = chunk.decode()?;
        trace!(
            "[{}:{:08X}] stored {} bytes, raw: {}, decoded {} bytes",
            count,
            chunk.offset,
            chunk.bytes.len(),
            chunk.is_raw(),
            decoded.len()
        );

        data.extend_from_slice(&decoded);
        count += 1;
    }

    debug!("decoded {} chunks into {} bytes", count, data.len());

    Ok(data)
}

/// Read and decode an archive file.
pub fn read_archive<P: AsRef<Path>>(path: P) -> Result<Vec<u8>> {
    let archive = std::fs::read(path.as_ref())?;
    decode(&archive)
}

/// Encode package bytes into the segmented container.
pub fn encode(data: &[u8]) -> Result<Vec<u8>> {
    let mut out = Vec::with_capacity(ARCHIVE_HEADER_LEN + data.len());
    encode_to(data, &mut out)?;
    Ok(out)
}

/// Encode package bytes into `writer`, returning the number of chunks written.
pub fn encode_to<W: Write>(data: &[u8], mut writer: W) -> Result<usize> {
    ArchiveHeader::default().write(&mut writer)?;

    let mut count = 0usize;

    for (index, slice) in data.chunks(CHUNK_MAX_LEN).enumerate() {
        let offset = index * CHUNK_MAX_LEN;
        let compressed = chunk::compress(slice)?;

        if compressed.len() < CHUNK_MAX_LEN {
            trace!("[{}] {} -> {} bytes", index, slice.len(), compressed.len());
            writer.write_u32::<LittleEndian>(compressed.len() as u32)?;
            writer.write_all(&compressed)?;
        } else if slice.len() == CHUNK_MAX_LEN {
            trace!("[{}] stored raw", index);
            writer.write_u32::<LittleEndian>(CHUNK_MAX_LEN as u32)?;
            writer.write_all(slice)?;
        } else {
            // A short raw chunk would be read back as zlib.
            return Err(BundleError::UnstorableChunk {
                offset,
                len: slice.len(),
            });
        }

        count += 1;
    }

    debug!("encoded {} bytes into {} chunks", data.len(), count);

    Ok(count)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn noise(len: usize, mut seed: u64) -> Vec<u8> {
        (0..len)
            .map(|_| {
                seed ^= seed << 13;
                seed ^= seed >> 7;
                seed ^= seed << 17;
                (seed >> 32) as u8
            })
            .collect()
    }

    fn chunk_list(archive: &[u8]) -> Vec<StoredChunk<'_>> {
        let (_, chunks) = chunks(archive).unwrap();
        chunks.collect::<Result<Vec<_>>>().unwrap()
    }

    #[test]
    fn header_is_written() {
        let archive = encode(b"abc").unwrap();
        assert_eq!(&archive[0..4], &ARCHIVE_FORMAT_VERSION.to_le_bytes());
        assert_eq!(&archive[4..12], &[0u8; 8]);
    }

    #[test]
    fn empty_input_is_header_only() {
        let archive = encode(&[]).unwrap();
        assert_eq!(archive.len(), ARCHIVE_HEADER_LEN);
        assert!(decode(&archive).unwrap().is_empty());
    }

    #[test]
    fn exact_multiple_of_chunk_len() {
        let data = vec![0x41u8; CHUNK_MAX_LEN * 3];
        let archive = encode(&data).unwrap();
        let chunks = chunk_list(&archive);
        assert_eq!(chunks.len(), 3);
        for chunk in &chunks {
            assert_eq!(chunk.decode().unwrap().len(), CHUNK_MAX_LEN);
        }
        assert_eq!(decode(&archive).unwrap(), data);
    }

    #[test]
    fn remainder_gets_its_own_chunk() {
        let data = vec![0x42u8; CHUNK_MAX_LEN * 2 + 100];
        let archive = encode(&data).unwrap();
        let chunks = chunk_list(&archive);
        assert_eq!(chunks.len(), 3);
        assert_eq!(chunks[2].decode().unwrap().len(), 100);
        assert_eq!(decode(&archive).unwrap(), data);
    }

    #[test]
    fn incompressible_chunk_is_stored_raw() {
        let data = noise(CHUNK_MAX_LEN, 0x9E37_79B9_7F4A_7C15);
        let archive = encode(&data).unwrap();

        let stored = u32::from_le_bytes([archive[12], archive[13], archive[14], archive[15]]);
        assert_eq!(stored as usize, CHUNK_MAX_LEN);
        assert_eq!(&archive[16..], &data[..]);
        assert_eq!(archive.len(), ARCHIVE_HEADER_LEN + CHUNK_PREFIX_LEN + CHUNK_MAX_LEN);

        assert_eq!(decode(&archive).unwrap(), data);
    }

    #[test]
    fn mixed_raw_and_compressed_chunks() {
        let mut data = noise(CHUNK_MAX_LEN, 0x2545_F491_4F6C_DD1D);
        data.extend(std::iter::repeat(0u8).take(5000));
        let archive = encode(&data).unwrap();
        let chunks = chunk_list(&archive);
        assert!(chunks[0].is_raw());
        assert!(!chunks[1].is_raw());
        assert_eq!(decode(&archive).unwrap(), data);
    }

    #[test]
    fn short_incompressible_tail_is_rejected() {
        let mut data = vec![0u8; CHUNK_MAX_LEN];
        data.extend(noise(CHUNK_MAX_LEN - 1, 0xD1B5_4A32_D192_ED03));
        match encode(&data) {
            Err(BundleError::UnstorableChunk { offset, len }) => {
                assert_eq!(offset, CHUNK_MAX_LEN);
                assert_eq!(len, CHUNK_MAX_LEN - 1);
            }
            other => panic!("unexpected {:?}", other.map(|v| v.len())),
        }
    }

    #[test]
    fn truncated_chunk_body() {
        let data = vec![1u8; 1000];
        let mut archive = encode(&data).unwrap();
        archive.truncate(archive.len() - 3);
        assert!(matches!(decode(&archive), Err(BundleError::TruncatedInput { .. })));
    }

    #[test]
    fn truncated_length_prefix() {
        let mut archive = encode(b"hello").unwrap();
        archive.extend_from_slice(&[0x10, 0x00]);
        assert!(matches!(decode(&archive), Err(BundleError::TruncatedInput { .. })));
    }

    #[test]
    fn truncated_header() {
        assert!(matches!(decode(&[0u8; 8]), Err(BundleError::TruncatedInput { .. })));
    }

    #[test]
    fn corrupt_chunk_is_reported() {
        let mut archive = Vec::new();
        ArchiveHeader::default().write(&mut archive).unwrap();
        archive.extend_from_slice(&4u32.to_le_bytes());
        archive.extend_from_slice(&[1, 2, 3, 4]);
        assert!(matches!(decode(&archive), Err(BundleError::CorruptChunk(_))));
    }

    #[test]
    fn foreign_version_still_decodes() {
        let mut archive = encode(b"payload").unwrap();
        archive[0..4].copy_from_slice(&1u32.to_le_bytes());
        assert_eq!(decode(&archive).unwrap(), b"payload");
    }
}
