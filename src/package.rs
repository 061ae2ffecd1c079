//! Record-indexed resource package, the bytes inside the segmented container.
//!
//! Layout:
//!
//! ```text
//! record count            i32
//! reserved                256 bytes
//! keys[record count]      (type hash u64, name hash u64)
//! records[record count]:
//!     type hash           u64
//!     name hash           u64
//!     chunk count         i64
//!     descriptors[chunk count]:
//!         reserved        i32
//!         size            i32
//!         size high bits  i32
//!     payload             sum of descriptor sizes
//! ```
//!
//! Records are tied to keys by position. There is no offset table, a
//! payload's offset is the running sum of everything before it.
use std::borrow::Cow;
use std::io::{Cursor, Write};
use std::path::Path;

use byteorder::{LittleEndian, WriteBytesExt};
use log::{debug, trace, warn};

use crate::constants::*;
use crate::cursor::{self, ByteCursor};
use crate::error::{BundleError, Result};
use crate::registry::{is_numeric, TypeRegistry};

/// Identifies a resource. Ordering is by type hash, then name hash, which
/// is the order the engine's loader searches in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RecordKey {
    pub type_hash: u64,
    pub name_hash: u64,
}

impl RecordKey {
    pub fn new(type_hash: u64, name_hash: u64) -> Self {
        Self { type_hash, name_hash }
    }

    fn read(reader: &mut ByteCursor) -> Result<Self> {
        Ok(Self {
            type_hash: cursor::read_u64(reader)?,
            name_hash: cursor::read_u64(reader)?,
        })
    }

    fn write<W: Write>(&self, writer: &mut W) -> Result<()> {
        writer.write_u64::<LittleEndian>(self.type_hash)?;
        writer.write_u64::<LittleEndian>(self.name_hash)?;
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ChunkDescriptor {
    pub reserved: i32,
    /// Exact byte length of the chunk's payload.
    pub size: i32,
    pub size_high_bits: i32,
}

impl ChunkDescriptor {
    fn read(reader: &mut ByteCursor) -> Result<Self> {
        Ok(Self {
            reserved: cursor::read_i32(reader)?,
            size: cursor::read_i32(reader)?,
            size_high_bits: cursor::read_i32(reader)?,
        })
    }

    fn write<W: Write>(&self, writer: &mut W) -> Result<()> {
        writer.write_i32::<LittleEndian>(self.reserved)?;
        writer.write_i32::<LittleEndian>(self.size)?;
        writer.write_i32::<LittleEndian>(self.size_high_bits)?;
        Ok(())
    }
}

/// Record section variant.
///
/// Nothing in the package says which one it is, so it has to be chosen
/// by the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RecordLayout {
    /// Chunk count is an `i64`.
    #[default]
    Wide,
    /// Chunk count is an `i32` followed by 4 unused bytes.
    Narrow,
    /// Offzip dump: a 36 byte resource header with the payload size at
    /// offset 12, no hash pair, one payload.
    Dump,
}

/// A resource and the payload bytes it owns in the package buffer.
#[derive(Debug, Clone)]
pub struct Resource<'a> {
    pub key: RecordKey,
    pub descriptors: Vec<ChunkDescriptor>,
    pub chunks: Vec<&'a [u8]>,
}

impl<'a> Resource<'a> {
    /// Payload size across all chunks.
    pub fn len(&self) -> usize {
        self.chunks.iter().map(|chunk| chunk.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Payload bytes. Multi-chunk resources are concatenated.
    pub fn data(&self) -> Cow<'a, [u8]> {
        match self.chunks.as_slice() {
            [] => Cow::Borrowed(&[]),
            [single] => Cow::Borrowed(*single),
            many => Cow::Owned(many.concat()),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Package<'a> {
    /// The key array, in file order.
    pub keys: Vec<RecordKey>,
    /// One resource per key, same order.
    pub resources: Vec<Resource<'a>>,
    /// Records whose embedded hashes disagreed with their key.
    pub mismatches: usize,
}

/// Parse package bytes.
pub fn parse(data: &[u8], layout: RecordLayout) -> Result<Package<'_>> {
    let mut reader = Cursor::new(data);

    let record_count = cursor::read_i32(&mut reader)?;
    if record_count < 0 {
        return Err(BundleError::InvalidLength {
            field: "record count",
            value: i64::from(record_count),
        });
    }
    let record_count = record_count as usize;
    debug!("records count: {}", record_count);

    cursor::skip(&mut reader, PACKAGE_PAD_LEN)?;

    cursor::ensure(&reader, (record_count as u64).saturating_mul(RECORD_KEY_LEN as u64))?;
    let keys = (0..record_count)
        .map(|_| RecordKey::read(&mut reader))
        .collect::<Result<Vec<_>>>()?;

    let mut package = Package {
        keys,
        resources: Vec::with_capacity(record_count),
        mismatches: 0,
    };

    for index in 0..record_count {
        let offset = reader.position();
        let key = package.keys[index];

        let resource = match layout {
            RecordLayout::Wide | RecordLayout::Narrow => {
                let embedded = RecordKey::read(&mut reader)?;
                if embedded != key {
                    let mismatch = BundleError::RecordMismatch {
                        index,
                        key_type: key.type_hash,
                        key_name: key.name_hash,
                        record_type: embedded.type_hash,
                        record_name: embedded.name_hash,
                    };
                    warn!("{}", mismatch);
                    package.mismatches += 1;
                }

                let chunk_count = read_chunk_count(&mut reader, layout)?;
                read_chunks(&mut reader, key, chunk_count)?
            }
            RecordLayout::Dump => read_dump_resource(&mut reader, key)?,
        };

        trace!(
            "[{}:{:08X}] {:016x}/{:016x}: {} chunks, {} bytes",
            index,
            offset,
            key.type_hash,
            key.name_hash,
            resource.chunks.len(),
            resource.len()
        );

        package.resources.push(resource);
    }

    let trailing = cursor::remaining(&reader);
    if trailing > 0 {
        warn!("{} trailing bytes after the last record", trailing);
    }

    Ok(package)
}

fn read_chunk_count(reader: &mut ByteCursor, layout: RecordLayout) -> Result<usize> {
    let chunk_count = match layout {
        RecordLayout::Narrow => {
            let count = i64::from(cursor::read_i32(reader)?);
            cursor::skip(reader, 4)?; // unused
            count
        }
        _ => cursor::read_i64(reader)?,
    };

    if chunk_count < 0 {
        return Err(BundleError::InvalidLength {
            field: "chunk count",
            value: chunk_count,
        });
    }

    // Every descriptor needs its 12 bytes, check before allocating.
    let needed = (chunk_count as u64).saturating_mul(CHUNK_DESCRIPTOR_LEN as u64);
    cursor::ensure(reader, needed)?;

    Ok(chunk_count as usize)
}

fn read_chunks<'a>(reader: &mut ByteCursor<'a>, key: RecordKey, chunk_count: usize) -> Result<Resource<'a>> {
    let descriptors = (0..chunk_count)
        .map(|_| ChunkDescriptor::read(reader))
        .collect::<Result<Vec<_>>>()?;

    let mut chunks = Vec::with_capacity(chunk_count);
    for descriptor in &descriptors {
        let size = payload_size(descriptor.size)?;
        chunks.push(cursor::take(reader, size)?);
    }

    Ok(Resource {
        key,
        descriptors,
        chunks,
    })
}

fn read_dump_resource<'a>(reader: &mut ByteCursor<'a>, key: RecordKey) -> Result<Resource<'a>> {
    let header = cursor::take(reader, DUMP_RESOURCE_HEADER_LEN)?;
    let mut size_reader = Cursor::new(header);
    cursor::skip(&mut size_reader, DUMP_RESOURCE_SIZE_OFFSET)?;
    let size = cursor::read_i32(&mut size_reader)?;

    let payload = cursor::take(reader, payload_size(size)?)?;

    Ok(Resource {
        key,
        descriptors: vec![ChunkDescriptor {
            size,
            ..ChunkDescriptor::default()
        }],
        chunks: vec![payload],
    })
}

fn payload_size(size: i32) -> Result<usize> {
    usize::try_from(size).map_err(|_| BundleError::InvalidLength {
        field: "chunk size",
        value: i64::from(size),
    })
}

/// A resource to be written into a package.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceEntry {
    pub key: RecordKey,
    pub data: Vec<u8>,
}

impl SourceEntry {
    pub fn new(type_hash: u64, name_hash: u64, data: Vec<u8>) -> Self {
        Self {
            key: RecordKey::new(type_hash, name_hash),
            data,
        }
    }
}

/// Key of a source file named `<name_hash>.<type>`.
///
/// The name must be a decimal hash. The type is either a decimal hash or
/// a type name, which is hashed.
pub fn parse_source_name(file_name: &str) -> Result<RecordKey> {
    let invalid = || BundleError::InvalidSourceName(file_name.to_owned());

    let path = Path::new(file_name);
    let stem = path.file_stem().and_then(|s| s.to_str()).ok_or_else(invalid)?;
    let type_name = path.extension().and_then(|s| s.to_str()).ok_or_else(invalid)?;

    if !is_numeric(stem) || type_name.is_empty() {
        return Err(invalid());
    }
    let name_hash = stem.parse::<u64>().map_err(|_| invalid())?;

    Ok(RecordKey::new(TypeRegistry::hash_for(type_name), name_hash))
}

/// Serialize resources into package bytes.
///
/// Entries are sorted by key first. Each resource is written as a single chunk.
pub fn serialize(entries: Vec<SourceEntry>) -> Result<Vec<u8>> {
    let payload_len: usize = entries.iter().map(|entry| entry.data.len()).sum();
    let record_len = RECORD_KEY_LEN * 2 + 8 + CHUNK_DESCRIPTOR_LEN;
    let mut out = Vec::with_capacity(
        RECORD_COUNT_LEN + PACKAGE_PAD_LEN + entries.len() * record_len + payload_len,
    );

    serialize_to(entries, &mut out)?;

    Ok(out)
}

/// Serialize resources into `writer`.
pub fn serialize_to<W: Write>(mut entries: Vec<SourceEntry>, mut writer: W) -> Result<()> {
    entries.sort_by_key(|entry| entry.key);

    if let Some(pair) = entries.windows(2).find(|pair| pair[0].key == pair[1].key) {
        return Err(BundleError::DuplicateResource {
            type_hash: pair[0].key.type_hash,
            name_hash: pair[0].key.name_hash,
        });
    }

    let record_count = i32::try_from(entries.len()).map_err(|_| BundleError::InvalidLength {
        field: "record count",
        value: entries.len() as i64,
    })?;

    debug!("writing {} records", record_count);

    writer.write_i32::<LittleEndian>(record_count)?;
    writer.write_all(&PACKAGE_PAD)?;

    for entry in &entries {
        entry.key.write(&mut writer)?;
    }

    for entry in &entries {
        let size = i32::try_from(entry.data.len()).map_err(|_| BundleError::PayloadTooLarge(entry.data.len()))?;
        let descriptor = ChunkDescriptor {
            size,
            ..ChunkDescriptor::default()
        };

        entry.key.write(&mut writer)?;
        writer.write_i64::<LittleEndian>(1)?;
        descriptor.write(&mut writer)?;
        writer.write_all(&entry.data)?;

        trace!(
            "{:016x}/{:016x}: {} bytes",
            entry.key.type_hash,
            entry.key.name_hash,
            entry.data.len()
        );
    }

    Ok(())
}
