//! File format constants.

/// Byte count of the archive header at offset 0 of a packed bundle.
pub const ARCHIVE_HEADER_LEN: usize = 12;

/// Version written into the archive header.
/// Every bundle shipped by the engine carries this value.
pub const ARCHIVE_FORMAT_VERSION: u32 = 0xF000_0004;

/// Maximum decompressed size of a single container chunk.
///
/// A chunk whose stored size is exactly this value is raw, anything
/// else is a zlib stream.
pub const CHUNK_MAX_LEN: usize = 65536;

/// Byte count of the chunk length prefix.
pub const CHUNK_PREFIX_LEN: usize = 4; // 32 bits

/// Byte count of the record count at the start of the package.
pub const RECORD_COUNT_LEN: usize = 4;

/// Reserved region following the record count.
pub const PACKAGE_PAD_LEN: usize = 256;

/// Byte count of one `(type_hash, name_hash)` pair.
pub const RECORD_KEY_LEN: usize = 16;

/// Byte count of one chunk descriptor in the record section.
pub const CHUNK_DESCRIPTOR_LEN: usize = 12;

/// Byte count of the resource header in an offzip dump.
pub const DUMP_RESOURCE_HEADER_LEN: usize = 36;

/// Offset of the payload size inside a dump resource header.
pub const DUMP_RESOURCE_SIZE_OFFSET: usize = 12;

/// Suffix appended to the input path for the offzip output.
pub const DUMP_SUFFIX: &str = "dump";

/// Default name of the external helper used for dumps.
pub const OFFZIP_PROGRAM: &str = "offzip";

/// Reserved block written after the record count.
///
/// The loader does not interpret it, but this is what the engine's own
/// packer emits, so we emit the same bytes.
pub const PACKAGE_PAD: [u8; PACKAGE_PAD_LEN] = [
    0x0D, 0x61, 0xEB, 0x8E, 0x03, 0xEE, 0xD3, 0x92, 0x3D, 0x40, 0x19, 0x7E, 0xD1, 0xB5, 0xD7, 0xBB,
    0x62, 0xD2, 0xF5, 0x13, 0x78, 0x25, 0xE1, 0x11, 0xDF, 0xDE, 0x6A, 0x87, 0x97, 0xB4, 0xC0, 0xEA,
    0xD1, 0x9F, 0x14, 0x4E, 0xCD, 0x1A, 0xFB, 0xE2, 0xF4, 0x6C, 0x16, 0x55, 0xAA, 0x57, 0x88, 0x0F,
    0xE4, 0x26, 0x23, 0xDC, 0x1F, 0xF6, 0xA0, 0xFE, 0x24, 0xD6, 0x32, 0x37, 0xD1, 0xB4, 0x8F, 0xAA,
    0xAA, 0x4F, 0x98, 0xF7, 0x42, 0x68, 0x80, 0x31, 0x66, 0x7F, 0x95, 0x77, 0xED, 0x18, 0xBB, 0xC5,
    0x44, 0x2C, 0x43, 0x07, 0xEC, 0xC3, 0x39, 0xBA, 0x2D, 0x97, 0x4D, 0x46, 0x39, 0x7D, 0xA3, 0xC8,
    0xD7, 0x42, 0x52, 0xFC, 0x2E, 0x2F, 0x5E, 0xA9, 0x44, 0x0A, 0x3A, 0xC4, 0x68, 0xCC, 0xF9, 0x08,
    0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00,
    0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00,
    0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00,
    0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00,
    0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00,
    0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00,
    0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00,
    0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00,
    0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00,
];
