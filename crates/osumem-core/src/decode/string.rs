//! String decoding.
//!
//! Narrow strings are Windows-1252, wide strings UTF-16LE. Invalid sequences
//! are replaced with U+FFFD rather than rejected. Every decoder stops at
//! [`MAX_STRING_CHARS`] characters and reports [`DecodeError::TooLong`]
//! instead of truncating.

use encoding_rs::{UTF_16LE, WINDOWS_1252};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::limits::{MAX_STRING_CHARS, PAGE_SIZE, STRING_CHUNK_BYTES};
use crate::error::{DecodeError, ReadError};
use crate::process::ReadMemory;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StringEncoding {
    /// One byte per character, Windows-1252.
    Narrow,
    /// Two bytes per character, UTF-16LE.
    Wide,
}

impl StringEncoding {
    /// Bytes per code unit.
    pub fn unit(self) -> usize {
        match self {
            StringEncoding::Narrow => 1,
            StringEncoding::Wide => 2,
        }
    }

    pub fn decode(self, bytes: &[u8]) -> String {
        let (decoded, had_errors) = match self {
            StringEncoding::Narrow => WINDOWS_1252.decode_without_bom_handling(bytes),
            StringEncoding::Wide => UTF_16LE.decode_without_bom_handling(bytes),
        };
        if had_errors {
            debug!(
                "{:?} decoding had errors for bytes: {:?}",
                self,
                &bytes[..bytes.len().min(20)]
            );
        }
        decoded.into_owned()
    }
}

/// Read a null-terminated Windows-1252 string.
pub fn read_narrow_string<R: ReadMemory + ?Sized>(
    reader: &R,
    address: u64,
) -> Result<String, DecodeError> {
    read_terminated(reader, address, StringEncoding::Narrow)
}

/// Read a null-terminated UTF-16LE string.
pub fn read_wide_string<R: ReadMemory + ?Sized>(
    reader: &R,
    address: u64,
) -> Result<String, DecodeError> {
    read_terminated(reader, address, StringEncoding::Wide)
}

fn read_terminated<R: ReadMemory + ?Sized>(
    reader: &R,
    address: u64,
    encoding: StringEncoding,
) -> Result<String, DecodeError> {
    let unit = encoding.unit();
    // Room for the longest accepted string plus its terminator.
    let limit = (MAX_STRING_CHARS + 1) * unit;
    let mut collected: Vec<u8> = Vec::new();
    let mut cursor = address;

    while collected.len() < limit {
        let to_page_end = (PAGE_SIZE - cursor % PAGE_SIZE) as usize;
        let mut want = STRING_CHUNK_BYTES
            .min(limit - collected.len())
            .min(to_page_end);
        want -= want % unit;
        if want == 0 {
            // Less than one unit left before the page boundary.
            want = unit;
        }

        let chunk = read_with_fallback(reader, cursor, want, unit)?;
        let terminator = chunk
            .chunks_exact(unit)
            .position(|c| c.iter().all(|&b| b == 0));

        if let Some(index) = terminator {
            collected.extend_from_slice(&chunk[..index * unit]);
            return Ok(encoding.decode(&collected));
        }

        collected.extend_from_slice(&chunk);
        cursor += chunk.len() as u64;
    }

    Err(DecodeError::TooLong {
        address,
        max: MAX_STRING_CHARS,
    })
}

/// Read `want` bytes, halving the request while the tail of it is unreadable.
fn read_with_fallback<R: ReadMemory + ?Sized>(
    reader: &R,
    address: u64,
    want: usize,
    unit: usize,
) -> Result<Vec<u8>, DecodeError> {
    let mut size = want;
    loop {
        match reader.read_bytes(address, size) {
            Ok(bytes) => return Ok(bytes),
            Err(ReadError::ProcessExited) => return Err(ReadError::ProcessExited.into()),
            Err(e) if size <= unit => return Err(e.into()),
            Err(_) => {
                size /= 2;
                size -= size % unit;
                size = size.max(unit);
            }
        }
    }
}

/// Read a string stored as an `i32` character count followed by the
/// characters, without terminator.
pub fn read_prefixed<R: ReadMemory + ?Sized>(
    reader: &R,
    address: u64,
    encoding: StringEncoding,
) -> Result<String, DecodeError> {
    let length = reader.read_i32(address)?;
    if length < 0 {
        return Err(DecodeError::InvalidLength {
            address,
            length: i64::from(length),
        });
    }
    let length = length as usize;
    if length > MAX_STRING_CHARS {
        return Err(DecodeError::TooLong {
            address,
            max: MAX_STRING_CHARS,
        });
    }
    if length == 0 {
        return Ok(String::new());
    }

    let bytes = reader.read_bytes(address + 4, length * encoding.unit())?;
    Ok(encoding.decode(&bytes))
}

/// Decode a managed string object at `object`.
///
/// Layout: one pointer-sized header word, an `i32` length in UTF-16 code
/// units, then the characters.
pub fn read_managed_string<R: ReadMemory + ?Sized>(
    reader: &R,
    object: u64,
) -> Result<String, DecodeError> {
    if object == 0 {
        return Err(DecodeError::NullReference { address: object });
    }
    let header = reader.pointer_width().bytes() as u64;
    read_prefixed(reader, object + header, StringEncoding::Wide)
}

/// Follow the reference stored at `field` and decode the managed string it
/// points to.
pub fn read_managed_string_ref<R: ReadMemory + ?Sized>(
    reader: &R,
    field: u64,
) -> Result<String, DecodeError> {
    let object = reader.read_pointer(field)?;
    if object == 0 {
        return Err(DecodeError::NullReference { address: field });
    }
    read_managed_string(reader, object)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::process::{MockMemoryBuilder, PointerWidth};

    #[test]
    fn test_narrow_string() {
        let reader = MockMemoryBuilder::new()
            .with_size(0x40)
            .write_narrow(0x10, "Café")
            .build();
        assert_eq!(read_narrow_string(&reader, 0x1010).unwrap(), "Café");
    }

    #[test]
    fn test_wide_string() {
        let reader = MockMemoryBuilder::new()
            .with_size(0x40)
            .write_utf16(0x10, "ノーゲーム")
            .build();
        assert_eq!(read_wide_string(&reader, 0x1010).unwrap(), "ノーゲーム");
    }

    #[test]
    fn test_empty_terminated_string() {
        let reader = MockMemoryBuilder::new().with_size(0x10).build();
        assert_eq!(read_narrow_string(&reader, 0x1000).unwrap(), "");
        assert_eq!(read_wide_string(&reader, 0x1000).unwrap(), "");
    }

    #[test]
    fn test_terminator_at_end_of_memory() {
        // The string runs right up to the end of readable memory, so the
        // chunked read has to shrink to find the terminator.
        let reader = MockMemoryBuilder::new().write_utf8(0x10, "abc").build();
        assert_eq!(reader.len(), 0x14);
        assert_eq!(read_narrow_string(&reader, 0x1010).unwrap(), "abc");
    }

    #[test]
    fn test_string_crossing_page_boundary() {
        let text = "x".repeat(300);
        let reader = MockMemoryBuilder::new()
            .with_size(0x2000)
            .write_utf16(0xF00, &text)
            .build();
        assert_eq!(read_wide_string(&reader, 0x1F00).unwrap(), text);
    }

    #[test]
    fn test_max_length_string_accepted() {
        let text = "a".repeat(MAX_STRING_CHARS);
        let reader = MockMemoryBuilder::new()
            .with_size(MAX_STRING_CHARS * 2 + 0x10)
            .write_utf8(0, &text)
            .build();
        assert_eq!(read_narrow_string(&reader, 0x1000).unwrap(), text);
    }

    #[test]
    fn test_too_long_string_rejected() {
        let text = "a".repeat(MAX_STRING_CHARS + 1);
        let reader = MockMemoryBuilder::new()
            .with_size(MAX_STRING_CHARS * 2 + 0x10)
            .write_utf8(0, &text)
            .build();
        assert_eq!(
            read_narrow_string(&reader, 0x1000),
            Err(DecodeError::TooLong {
                address: 0x1000,
                max: MAX_STRING_CHARS
            })
        );
    }

    #[test]
    fn test_unterminated_at_end_of_memory() {
        let reader = MockMemoryBuilder::new().write_bytes(0, b"abcd").build();
        assert!(matches!(
            read_narrow_string(&reader, 0x1000),
            Err(DecodeError::Read(ReadError::InvalidAddress { .. }))
        ));
    }

    #[test]
    fn test_null_address() {
        let reader = MockMemoryBuilder::new().with_size(0x10).build();
        assert!(matches!(
            read_narrow_string(&reader, 0),
            Err(DecodeError::Read(ReadError::InvalidAddress { address: 0 }))
        ));
    }

    #[test]
    fn test_prefixed_string() {
        let reader = MockMemoryBuilder::new()
            .write_i32(0, 5)
            .write_bytes(4, b"hello")
            .build();
        assert_eq!(
            read_prefixed(&reader, 0x1000, StringEncoding::Narrow).unwrap(),
            "hello"
        );
    }

    #[test]
    fn test_prefixed_negative_length() {
        let reader = MockMemoryBuilder::new().write_i32(0, -3).build();
        assert_eq!(
            read_prefixed(&reader, 0x1000, StringEncoding::Wide),
            Err(DecodeError::InvalidLength {
                address: 0x1000,
                length: -3
            })
        );
    }

    #[test]
    fn test_prefixed_length_checked_before_reading() {
        // The length claims far more than the buffer holds; the bound must
        // trip before any allocation or read of the body.
        let reader = MockMemoryBuilder::new().write_i32(0, i32::MAX).build();
        assert!(matches!(
            read_prefixed(&reader, 0x1000, StringEncoding::Wide),
            Err(DecodeError::TooLong { .. })
        ));
    }

    #[test]
    fn test_managed_string() {
        let reader = MockMemoryBuilder::new()
            .with_size(0x80)
            .write_ptr32(0x00, 0x40)
            .write_managed_string(0x40, "Songs")
            .build();
        assert_eq!(read_managed_string_ref(&reader, 0x1000).unwrap(), "Songs");
        assert_eq!(read_managed_string(&reader, 0x1040).unwrap(), "Songs");
    }

    #[test]
    fn test_managed_string_64bit() {
        let reader = MockMemoryBuilder::new()
            .pointer_width(PointerWidth::Bits64)
            .with_size(0x80)
            .write_u64(0x00, 0x1040)
            .write_managed_string(0x40, "map.osu")
            .build();
        assert_eq!(read_managed_string_ref(&reader, 0x1000).unwrap(), "map.osu");
    }

    #[test]
    fn test_managed_string_null_reference() {
        let reader = MockMemoryBuilder::new().with_size(0x10).build();
        assert_eq!(
            read_managed_string_ref(&reader, 0x1000),
            Err(DecodeError::NullReference { address: 0x1000 })
        );
    }

    #[test]
    fn test_invalid_utf16_is_replaced() {
        // Lone high surrogate
        let reader = MockMemoryBuilder::new()
            .write_bytes(0, &[0x41, 0x00, 0x00, 0xD8, 0x42, 0x00, 0x00, 0x00])
            .build();
        assert_eq!(read_wide_string(&reader, 0x1000).unwrap(), "A\u{FFFD}B");
    }
}
