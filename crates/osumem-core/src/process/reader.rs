use serde::{Deserialize, Serialize};

use crate::config::limits;
use crate::error::ReadError;
use crate::process::bytes::le_array;
use crate::process::region::MemoryRegion;

pub type ReadResult<T> = std::result::Result<T, ReadError>;

/// Pointer size of the target process.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum PointerWidth {
    #[default]
    #[serde(rename = "32")]
    Bits32,
    #[serde(rename = "64")]
    Bits64,
}

impl PointerWidth {
    pub fn bytes(self) -> usize {
        match self {
            PointerWidth::Bits32 => 4,
            PointerWidth::Bits64 => 8,
        }
    }

    pub fn bits(self) -> u32 {
        self.bytes() as u32 * 8
    }
}

/// Validate a read request before touching the target.
///
/// Rejects the null address, empty and oversized reads, and ranges that wrap
/// the address space.
pub fn check_read(address: u64, size: usize) -> ReadResult<()> {
    if address == 0 {
        return Err(ReadError::InvalidAddress { address });
    }
    if size == 0 || size > limits::MAX_READ_BYTES {
        return Err(ReadError::LengthOutOfBounds {
            length: size,
            max: limits::MAX_READ_BYTES,
        });
    }
    if address.checked_add(size as u64).is_none() {
        return Err(ReadError::InvalidAddress { address });
    }
    Ok(())
}

/// Trait for reading memory from a process or buffer
///
/// This trait enables mocking for tests and abstracts over different memory sources.
/// Implementations never write to the target.
pub trait ReadMemory {
    /// Read exactly `size` bytes at `address`.
    fn read_bytes(&self, address: u64, size: usize) -> ReadResult<Vec<u8>>;

    /// Base address of the main module.
    fn base_address(&self) -> u64;

    fn pointer_width(&self) -> PointerWidth;

    /// Readable committed regions, sorted by address.
    fn regions(&self) -> ReadResult<Vec<MemoryRegion>>;

    fn read_i16(&self, address: u64) -> ReadResult<i16> {
        let bytes = self.read_bytes(address, 2)?;
        Ok(i16::from_le_bytes(le_array(&bytes, address)?))
    }

    fn read_u16(&self, address: u64) -> ReadResult<u16> {
        let bytes = self.read_bytes(address, 2)?;
        Ok(u16::from_le_bytes(le_array(&bytes, address)?))
    }

    fn read_i32(&self, address: u64) -> ReadResult<i32> {
        let bytes = self.read_bytes(address, 4)?;
        Ok(i32::from_le_bytes(le_array(&bytes, address)?))
    }

    fn read_u32(&self, address: u64) -> ReadResult<u32> {
        let bytes = self.read_bytes(address, 4)?;
        Ok(u32::from_le_bytes(le_array(&bytes, address)?))
    }

    fn read_i64(&self, address: u64) -> ReadResult<i64> {
        let bytes = self.read_bytes(address, 8)?;
        Ok(i64::from_le_bytes(le_array(&bytes, address)?))
    }

    fn read_u64(&self, address: u64) -> ReadResult<u64> {
        let bytes = self.read_bytes(address, 8)?;
        Ok(u64::from_le_bytes(le_array(&bytes, address)?))
    }

    /// Read a 32-bit IEEE-754 float. No rounding is applied.
    fn read_f32(&self, address: u64) -> ReadResult<f32> {
        let bytes = self.read_bytes(address, 4)?;
        Ok(f32::from_le_bytes(le_array(&bytes, address)?))
    }

    fn read_f64(&self, address: u64) -> ReadResult<f64> {
        let bytes = self.read_bytes(address, 8)?;
        Ok(f64::from_le_bytes(le_array(&bytes, address)?))
    }

    /// Read a pointer-sized value, zero-extended to 64 bits.
    fn read_pointer(&self, address: u64) -> ReadResult<u64> {
        match self.pointer_width() {
            PointerWidth::Bits32 => self.read_u32(address).map(u64::from),
            PointerWidth::Bits64 => self.read_u64(address),
        }
    }
}

impl<R: ReadMemory + ?Sized> ReadMemory for &R {
    fn read_bytes(&self, address: u64, size: usize) -> ReadResult<Vec<u8>> {
        (**self).read_bytes(address, size)
    }

    fn base_address(&self) -> u64 {
        (**self).base_address()
    }

    fn pointer_width(&self) -> PointerWidth {
        (**self).pointer_width()
    }

    fn regions(&self) -> ReadResult<Vec<MemoryRegion>> {
        (**self).regions()
    }
}
