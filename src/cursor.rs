//! Bounds checked little-endian reads over an in-memory buffer.
use std::io::Cursor;

use byteorder::{LittleEndian, ReadBytesExt};

use crate::error::{BundleError, Result};

pub(crate) type ByteCursor<'a> = Cursor<&'a [u8]>;

#[inline]
pub(crate) fn remaining(reader: &ByteCursor) -> u64 {
    (reader.get_ref().len() as u64).saturating_sub(reader.position())
}

/// Fail with `TruncatedInput` unless `needed` more bytes are available.
#[inline]
pub(crate) fn ensure(reader: &ByteCursor, needed: u64) -> Result<()> {
    let available = remaining(reader);
    if needed > available {
        return Err(BundleError::TruncatedInput {
            offset: reader.position(),
            needed,
            available,
        });
    }
    Ok(())
}

pub(crate) fn read_u32(reader: &mut ByteCursor) -> Result<u32> {
    ensure(reader, 4)?;
    Ok(reader.read_u32::<LittleEndian>()?)
}

pub(crate) fn read_i32(reader: &mut ByteCursor) -> Result<i32> {
    ensure(reader, 4)?;
    Ok(reader.read_i32::<LittleEndian>()?)
}

pub(crate) fn read_u64(reader: &mut ByteCursor) -> Result<u64> {
    ensure(reader, 8)?;
    Ok(reader.read_u64::<LittleEndian>()?)
}

pub(crate) fn read_i64(reader: &mut ByteCursor) -> Result<i64> {
    ensure(reader, 8)?;
    Ok(reader.read_i64::<LittleEndian>()?)
}

/// Borrow the next `len` bytes and advance past them.
pub(crate) fn take<'a>(reader: &mut ByteCursor<'a>, len: usize) -> Result<&'a [u8]> {
    ensure(reader, len as u64)?;
    let buf: &'a [u8] = *reader.get_ref();
    let start = reader.position() as usize;
    let end = start + len;
    reader.set_position(end as u64);
    Ok(&buf[start..end])
}

pub(crate) fn skip(reader: &mut ByteCursor, len: usize) -> Result<()> {
    ensure(reader, len as u64)?;
    reader.set_position(reader.position() + len as u64);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reads_little_endian() {
        let bytes = [1, 0, 0, 0, 2, 0, 0, 0, 0, 0, 0, 0];
        let mut reader = Cursor::new(&bytes[..]);
        assert_eq!(read_u32(&mut reader).unwrap(), 1);
        assert_eq!(read_u64(&mut reader).unwrap(), 2);
        assert_eq!(remaining(&reader), 0);
    }

    #[test]
    fn short_read_reports_offset() {
        let bytes = [0u8; 6];
        let mut reader = Cursor::new(&bytes[..]);
        read_u32(&mut reader).unwrap();
        match read_u32(&mut reader) {
            Err(BundleError::TruncatedInput { offset, needed, available }) => {
                assert_eq!((offset, needed, available), (4, 4, 2));
            }
            other => panic!("unexpected {:?}", other),
        }
        // A failed read does not move the cursor.
        assert_eq!(reader.position(), 4);
    }

    #[test]
    fn take_borrows_from_buffer() {
        let bytes = b"abcdef";
        let mut reader = Cursor::new(&bytes[..]);
        skip(&mut reader, 2).unwrap();
        assert_eq!(take(&mut reader, 3).unwrap(), b"cde");
        assert!(take(&mut reader, 2).is_err());
    }
}
