use byteorder::{ByteOrder, LE};
use std::mem::size_of;
use thiserror::Error;

/// Returned by [`ByteCursor`] whenever an access would reach past the end of the buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("access up to byte {end} is out of range of a {length} byte buffer")]
pub struct OutOfRange {
    /// Position one past the last byte the access would have touched
    pub end: usize,
    pub length: usize,
}

/// Fixed-width values readable with [`ByteCursor::read`]. All of them are stored little endian.
pub trait Primitive: Sized + Copy {
    const SIZE: usize;

    /// Converts exactly [`Self::SIZE`] bytes into the value.
    fn from_le_slice(bytes: &[u8]) -> Self;
}

macro_rules! impl_primitive {
    ($ty:ty, $read:ident) => {
        impl Primitive for $ty {
            const SIZE: usize = size_of::<$ty>();

            fn from_le_slice(bytes: &[u8]) -> Self {
                LE::$read(bytes)
            }
        }
    };
}

impl Primitive for u8 {
    const SIZE: usize = 1;

    fn from_le_slice(bytes: &[u8]) -> Self {
        bytes[0]
    }
}

impl Primitive for i8 {
    const SIZE: usize = 1;

    fn from_le_slice(bytes: &[u8]) -> Self {
        bytes[0] as i8
    }
}

impl_primitive!(u16, read_u16);
impl_primitive!(i16, read_i16);
impl_primitive!(u32, read_u32);
impl_primitive!(i32, read_i32);
impl_primitive!(u64, read_u64);
impl_primitive!(i64, read_i64);
impl_primitive!(f32, read_f32);

/// Bounds-checked sequential reader over a borrowed byte buffer.
///
/// Failed operations never move the cursor, so `0 <= offset <= len` always holds.
///
/// ## Example
/// ```
/// use ballpit_utils::ByteCursor;
///
/// let data = [1, 0, 0, 0, 0xAA];
/// let mut cursor = ByteCursor::new(&data);
/// assert_eq!(cursor.read::<u32>().unwrap(), 1);
/// assert_eq!(cursor.remainder(), &[0xAA]);
/// assert!(cursor.read::<u16>().is_err());
/// assert_eq!(cursor.offset(), 4);
/// ```
#[derive(Debug, Clone)]
pub struct ByteCursor<'s> {
    data: &'s [u8],
    offset: usize,
}

impl<'s> ByteCursor<'s> {
    pub fn new(data: &'s [u8]) -> Self {
        Self { data, offset: 0 }
    }

    /// Reads a little endian primitive and advances past it.
    pub fn read<T: Primitive>(&mut self) -> Result<T, OutOfRange> {
        let bytes = self.read_bytes(T::SIZE)?;
        Ok(T::from_le_slice(bytes))
    }

    /// Borrows the next `count` bytes and advances past them.
    pub fn read_bytes(&mut self, count: usize) -> Result<&'s [u8], OutOfRange> {
        let end = self.checked_end(count)?;
        let bytes = &self.data[self.offset..end];
        self.offset = end;
        Ok(bytes)
    }

    /// Moves the cursor to `n` if `absolute` is set, or `n` bytes forward otherwise.
    pub fn seek(&mut self, n: usize, absolute: bool) -> Result<(), OutOfRange> {
        let target = if absolute {
            n
        } else {
            self.checked_end(n)?
        };

        if target > self.data.len() {
            return Err(OutOfRange {
                end: target,
                length: self.data.len(),
            });
        }

        self.offset = target;
        Ok(())
    }

    /// Shorthand for a relative [`Self::seek`].
    pub fn skip(&mut self, count: usize) -> Result<(), OutOfRange> {
        self.seek(count, false)
    }

    /// All bytes that weren't read yet. Doesn't move the cursor.
    pub fn remainder(&self) -> &'s [u8] {
        &self.data[self.offset..]
    }

    pub fn offset(&self) -> usize {
        self.offset
    }

    pub fn remaining(&self) -> usize {
        self.data.len() - self.offset
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    fn checked_end(&self, count: usize) -> Result<usize, OutOfRange> {
        match self.offset.checked_add(count) {
            Some(end) if end <= self.data.len() => Ok(end),
            end => Err(OutOfRange {
                end: end.unwrap_or(usize::MAX),
                length: self.data.len(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reads_little_endian_primitives() {
        let data = [
            0x78, 0x56, 0x34, 0x12, // u32
            0xFE, 0xFF, // i16
            0x00, 0x00, 0x80, 0x3F, // f32
            0x07, // u8
        ];
        let mut cursor = ByteCursor::new(&data);

        assert_eq!(cursor.read::<u32>(), Ok(0x12345678));
        assert_eq!(cursor.read::<i16>(), Ok(-2));
        assert_eq!(cursor.read::<f32>(), Ok(1.0));
        assert_eq!(cursor.read::<u8>(), Ok(7));
        assert_eq!(cursor.remaining(), 0);
    }

    #[test]
    fn failed_read_keeps_offset() {
        let data = [1, 2, 3];
        let mut cursor = ByteCursor::new(&data);
        cursor.skip(1).unwrap();

        assert_eq!(cursor.read::<u32>(), Err(OutOfRange { end: 5, length: 3 }));
        assert_eq!(cursor.offset(), 1);
        assert_eq!(cursor.read::<u16>(), Ok(0x0302));
    }

    #[test]
    fn seek_past_end_fails() {
        let data = [0u8; 8];
        let mut cursor = ByteCursor::new(&data);
        cursor.seek(3, true).unwrap();

        assert!(cursor.seek(9, true).is_err());
        assert_eq!(cursor.offset(), 3);
        assert!(cursor.seek(6, false).is_err());
        assert_eq!(cursor.offset(), 3);

        // Landing exactly on the end is fine
        cursor.seek(5, false).unwrap();
        assert_eq!(cursor.offset(), 8);
        assert!(cursor.remainder().is_empty());
    }

    #[test]
    fn remainder_does_not_advance() {
        let data = [9, 8, 7, 6];
        let mut cursor = ByteCursor::new(&data);
        cursor.skip(2).unwrap();

        assert_eq!(cursor.remainder(), &[7, 6]);
        assert_eq!(cursor.remainder(), &[7, 6]);
        assert_eq!(cursor.offset(), 2);
    }

    #[test]
    fn read_bytes_borrows_from_source() {
        let data = b"abcdef";
        let mut cursor = ByteCursor::new(data);

        let slice = cursor.read_bytes(4).unwrap();
        assert_eq!(slice, b"abcd");
        assert!(cursor.read_bytes(3).is_err());
        assert_eq!(cursor.read_bytes(2).unwrap(), b"ef");
    }
}
