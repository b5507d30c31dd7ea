//! Byte buffer utilities for parsing binary data structures.
//!
//! `ByteBuffer` is a position-tracking reader over a block copied out of the
//! target. It remembers the address the block was read from so that slicing
//! errors point at target addresses rather than buffer offsets.

use crate::error::{DecodeError, ReadError};

/// Convert a slice returned by a reader into a fixed-size array.
pub(crate) fn le_array<const N: usize>(bytes: &[u8], address: u64) -> Result<[u8; N], ReadError> {
    bytes
        .get(..N)
        .and_then(|head| head.try_into().ok())
        .ok_or_else(|| ReadError::Os {
            address,
            length: N,
            message: format!("short read: got {} bytes", bytes.len()),
        })
}

/// A position-tracking byte reader for parsing binary data structures.
///
/// # Example
///
/// ```
/// use osumem_core::process::ByteBuffer;
///
/// let data = [0x78, 0x56, 0x34, 0x12, 0x00, 0x00, 0x10, 0x41];
/// let mut buf = ByteBuffer::at(0x4000, &data);
///
/// assert_eq!(buf.read_i32().unwrap(), 0x12345678);
/// assert_eq!(buf.read_f32().unwrap(), 9.0);
/// assert_eq!(buf.position(), 8);
/// ```
pub struct ByteBuffer<'a> {
    data: &'a [u8],
    origin: u64,
    pos: usize,
}

impl<'a> ByteBuffer<'a> {
    /// Wrap `data`, which was read from target address `origin`.
    pub fn at(origin: u64, data: &'a [u8]) -> Self {
        Self {
            data,
            origin,
            pos: 0,
        }
    }

    pub fn position(&self) -> usize {
        self.pos
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn remaining(&self) -> usize {
        self.data.len().saturating_sub(self.pos)
    }

    /// Target address of the byte at `offset` in this buffer.
    pub fn address_of(&self, offset: usize) -> u64 {
        self.origin.wrapping_add(offset as u64)
    }

    pub fn skip(&mut self, count: usize) -> Result<(), DecodeError> {
        self.slice_at(self.pos, count)?;
        self.pos += count;
        Ok(())
    }

    /// Borrow `len` bytes at `offset` without moving the cursor.
    pub fn slice_at(&self, offset: usize, len: usize) -> Result<&'a [u8], DecodeError> {
        let end = offset.checked_add(len).ok_or_else(|| DecodeError::Malformed {
            address: self.address_of(offset),
            reason: "offset overflow".to_string(),
        })?;

        if end > self.data.len() {
            return Err(DecodeError::Malformed {
                address: self.address_of(offset),
                reason: format!(
                    "range {}..{} exceeds block of {} bytes",
                    offset,
                    end,
                    self.data.len()
                ),
            });
        }

        Ok(&self.data[offset..end])
    }

    pub fn read_bytes(&mut self, count: usize) -> Result<&'a [u8], DecodeError> {
        let bytes = self.slice_at(self.pos, count)?;
        self.pos += count;
        Ok(bytes)
    }

    fn array_at<const N: usize>(&self, offset: usize) -> Result<[u8; N], DecodeError> {
        let bytes = self.slice_at(offset, N)?;
        let mut out = [0u8; N];
        out.copy_from_slice(bytes);
        Ok(out)
    }

    fn next_array<const N: usize>(&mut self) -> Result<[u8; N], DecodeError> {
        let out = self.array_at::<N>(self.pos)?;
        self.pos += N;
        Ok(out)
    }

    pub fn read_i32(&mut self) -> Result<i32, DecodeError> {
        Ok(i32::from_le_bytes(self.next_array()?))
    }

    pub fn read_u32(&mut self) -> Result<u32, DecodeError> {
        Ok(u32::from_le_bytes(self.next_array()?))
    }

    pub fn read_f32(&mut self) -> Result<f32, DecodeError> {
        Ok(f32::from_le_bytes(self.next_array()?))
    }

    pub fn read_i16_at(&self, offset: usize) -> Result<i16, DecodeError> {
        Ok(i16::from_le_bytes(self.array_at(offset)?))
    }

    pub fn read_u16_at(&self, offset: usize) -> Result<u16, DecodeError> {
        Ok(u16::from_le_bytes(self.array_at(offset)?))
    }

    pub fn read_i32_at(&self, offset: usize) -> Result<i32, DecodeError> {
        Ok(i32::from_le_bytes(self.array_at(offset)?))
    }

    pub fn read_u32_at(&self, offset: usize) -> Result<u32, DecodeError> {
        Ok(u32::from_le_bytes(self.array_at(offset)?))
    }

    pub fn read_i64_at(&self, offset: usize) -> Result<i64, DecodeError> {
        Ok(i64::from_le_bytes(self.array_at(offset)?))
    }

    pub fn read_u64_at(&self, offset: usize) -> Result<u64, DecodeError> {
        Ok(u64::from_le_bytes(self.array_at(offset)?))
    }

    pub fn read_f32_at(&self, offset: usize) -> Result<f32, DecodeError> {
        Ok(f32::from_le_bytes(self.array_at(offset)?))
    }

    pub fn read_f64_at(&self, offset: usize) -> Result<f64, DecodeError> {
        Ok(f64::from_le_bytes(self.array_at(offset)?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_byte_buffer_sequential_reads() {
        let data = [
            0x01, 0x00, 0x00, 0x00, // i32: 1
            0x02, 0x00, 0x00, 0x00, // u32: 2
            0x00, 0x00, 0x80, 0x40, // f32: 4.0
        ];
        let mut buf = ByteBuffer::at(0x1000, &data);

        assert_eq!(buf.read_i32().unwrap(), 1);
        assert_eq!(buf.read_u32().unwrap(), 2);
        assert_eq!(buf.read_f32().unwrap(), 4.0);
        assert_eq!(buf.position(), 12);
        assert_eq!(buf.remaining(), 0);
    }

    #[test]
    fn test_byte_buffer_read_at() {
        let data = [0x01, 0x02, 0x03, 0x04, 0x05, 0x06, 0x07, 0x08];
        let buf = ByteBuffer::at(0x1000, &data);

        assert_eq!(buf.read_u32_at(4).unwrap(), 0x08070605);
        assert_eq!(buf.read_u16_at(0).unwrap(), 0x0201);
        assert_eq!(buf.position(), 0);
    }

    #[test]
    fn test_byte_buffer_skip() {
        let data = [0x01, 0x02, 0x03, 0x04, 0x05, 0x06, 0x07, 0x08];
        let mut buf = ByteBuffer::at(0x1000, &data);

        buf.skip(4).unwrap();
        assert_eq!(buf.read_u32().unwrap(), 0x08070605);
        assert!(buf.skip(1).is_err());
    }

    #[test]
    fn test_byte_buffer_error_reports_target_address() {
        let data = [0x01, 0x02];
        let buf = ByteBuffer::at(0x4000, &data);

        match buf.read_i32_at(1) {
            Err(DecodeError::Malformed { address, .. }) => assert_eq!(address, 0x4001),
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[test]
    fn test_le_array_short_read() {
        let result: Result<[u8; 4], _> = le_array(&[1, 2], 0x1000);
        assert!(matches!(result, Err(ReadError::Os { address: 0x1000, .. })));
    }
}
