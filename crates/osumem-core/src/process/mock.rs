//! Mock memory reader for testing
//!
//! Provides a configurable mock implementation of ReadMemory trait
//! that reads from an in-memory buffer instead of a real process.

use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use crate::error::{AttachError, ReadError};
use crate::process::handle::{ProcessSelector, ProcessTarget};
use crate::process::provider::{ProcessInfo, ProcessProvider};
use crate::process::reader::{PointerWidth, ReadMemory, ReadResult, check_read};
use crate::process::region::MemoryRegion;

const DEFAULT_BASE: u64 = 0x1000;
const DEFAULT_PID: u32 = 4242;
/// Method table word written in front of managed strings.
const STRING_METHOD_TABLE: u32 = 0x7900_1234;

/// Mock memory reader for testing
///
/// Reads from an in-memory buffer, allowing tests to verify memory reading
/// logic without requiring access to a real process. Clones share the
/// liveness flag, so terminating one clone terminates them all.
#[derive(Debug, Clone)]
pub struct MockMemoryReader {
    data: Arc<Vec<u8>>,
    base: u64,
    target: ProcessTarget,
    alive: Arc<AtomicBool>,
}

impl MockMemoryReader {
    /// Create a new mock reader with the given data at base address 0x1000
    pub fn new(data: Vec<u8>) -> Self {
        Self::with_base(data, DEFAULT_BASE)
    }

    /// Create a new mock reader with custom base address
    pub fn with_base(data: Vec<u8>, base: u64) -> Self {
        let target = ProcessTarget {
            pid: DEFAULT_PID,
            name: "osu!.exe".to_string(),
            pointer_width: PointerWidth::Bits32,
            base_address: base,
            module_size: data.len() as u64,
            executable_dir: None,
        };
        Self {
            data: Arc::new(data),
            base,
            target,
            alive: Arc::new(AtomicBool::new(true)),
        }
    }

    /// Get the size of the underlying buffer
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Check if the buffer is empty
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Simulate the process exiting. Every later read fails.
    pub fn terminate(&self) {
        self.alive.store(false, Ordering::SeqCst);
    }

    pub fn alive_flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.alive)
    }
}

impl ReadMemory for MockMemoryReader {
    fn read_bytes(&self, address: u64, size: usize) -> ReadResult<Vec<u8>> {
        check_read(address, size)?;
        if !self.alive.load(Ordering::SeqCst) {
            return Err(ReadError::ProcessExited);
        }
        if address < self.base {
            return Err(ReadError::InvalidAddress { address });
        }
        let offset = (address - self.base) as usize;
        match offset.checked_add(size) {
            Some(end) if end <= self.data.len() => Ok(self.data[offset..end].to_vec()),
            _ => Err(ReadError::InvalidAddress { address }),
        }
    }

    fn base_address(&self) -> u64 {
        self.base
    }

    fn pointer_width(&self) -> PointerWidth {
        self.target.pointer_width
    }

    fn regions(&self) -> ReadResult<Vec<MemoryRegion>> {
        if !self.alive.load(Ordering::SeqCst) {
            return Err(ReadError::ProcessExited);
        }
        if self.data.is_empty() {
            return Ok(Vec::new());
        }
        Ok(vec![MemoryRegion::new(self.base, self.data.len() as u64)])
    }
}

impl ProcessInfo for MockMemoryReader {
    fn target(&self) -> &ProcessTarget {
        &self.target
    }

    fn is_alive(&self) -> bool {
        self.alive.load(Ordering::SeqCst)
    }
}

/// Builder for creating test memory buffers
///
/// Provides a fluent API for constructing memory layouts for testing.
/// Offsets are relative to the base address.
#[derive(Debug, Clone)]
pub struct MockMemoryBuilder {
    data: Vec<u8>,
    base: u64,
    pid: u32,
    pointer_width: PointerWidth,
    executable_dir: Option<PathBuf>,
}

impl Default for MockMemoryBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl MockMemoryBuilder {
    /// Create a new builder with default base address (0x1000)
    pub fn new() -> Self {
        Self {
            data: Vec::new(),
            base: DEFAULT_BASE,
            pid: DEFAULT_PID,
            pointer_width: PointerWidth::Bits32,
            executable_dir: None,
        }
    }

    /// Set the base address for the mock reader
    pub fn base(mut self, base: u64) -> Self {
        self.base = base;
        self
    }

    /// Pre-allocate buffer with zeros up to the specified size
    pub fn with_size(mut self, size: usize) -> Self {
        self.data.resize(size, 0);
        self
    }

    pub fn pid(mut self, pid: u32) -> Self {
        self.pid = pid;
        self
    }

    pub fn pointer_width(mut self, width: PointerWidth) -> Self {
        self.pointer_width = width;
        self
    }

    pub fn executable_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.executable_dir = Some(dir.into());
        self
    }

    pub fn write_i16(self, offset: usize, value: i16) -> Self {
        self.write_bytes(offset, &value.to_le_bytes())
    }

    /// Write a signed 32-bit integer at the specified offset from base
    pub fn write_i32(self, offset: usize, value: i32) -> Self {
        self.write_bytes(offset, &value.to_le_bytes())
    }

    /// Write an unsigned 32-bit integer at the specified offset from base
    pub fn write_u32(self, offset: usize, value: u32) -> Self {
        self.write_bytes(offset, &value.to_le_bytes())
    }

    /// Write a signed 64-bit integer at the specified offset from base
    pub fn write_i64(self, offset: usize, value: i64) -> Self {
        self.write_bytes(offset, &value.to_le_bytes())
    }

    /// Write an unsigned 64-bit integer at the specified offset from base
    pub fn write_u64(self, offset: usize, value: u64) -> Self {
        self.write_bytes(offset, &value.to_le_bytes())
    }

    pub fn write_f32(self, offset: usize, value: f32) -> Self {
        self.write_bytes(offset, &value.to_le_bytes())
    }

    pub fn write_f64(self, offset: usize, value: f64) -> Self {
        self.write_bytes(offset, &value.to_le_bytes())
    }

    /// Write a 32-bit pointer holding `base + target_offset`.
    pub fn write_ptr32(self, offset: usize, target_offset: usize) -> Self {
        let address = self.base + target_offset as u64;
        self.write_u32(offset, address as u32)
    }

    /// Write raw bytes at the specified offset from base
    pub fn write_bytes(mut self, offset: usize, bytes: &[u8]) -> Self {
        self.ensure_size(offset + bytes.len());
        self.data[offset..offset + bytes.len()].copy_from_slice(bytes);
        self
    }

    /// Write a null-terminated UTF-8 string at the specified offset
    pub fn write_utf8(mut self, offset: usize, text: &str) -> Self {
        let bytes = text.as_bytes();
        self.ensure_size(offset + bytes.len() + 1);
        self.data[offset..offset + bytes.len()].copy_from_slice(bytes);
        self.data[offset + bytes.len()] = 0; // null terminator
        self
    }

    /// Write a null-terminated Windows-1252 string at the specified offset
    pub fn write_narrow(mut self, offset: usize, text: &str) -> Self {
        use encoding_rs::WINDOWS_1252;
        let (encoded, _, _) = WINDOWS_1252.encode(text);
        let bytes = encoded.into_owned();
        self.ensure_size(offset + bytes.len() + 1);
        self.data[offset..offset + bytes.len()].copy_from_slice(&bytes);
        self.data[offset + bytes.len()] = 0;
        self
    }

    /// Write a null-terminated UTF-16LE string at the specified offset
    pub fn write_utf16(self, offset: usize, text: &str) -> Self {
        let mut bytes: Vec<u8> = text.encode_utf16().flat_map(u16::to_le_bytes).collect();
        bytes.extend_from_slice(&[0, 0]);
        self.write_bytes(offset, &bytes)
    }

    /// Write a managed string object: method table, i32 length in UTF-16
    /// code units, then the characters.
    pub fn write_managed_string(self, offset: usize, text: &str) -> Self {
        let units: Vec<u16> = text.encode_utf16().collect();
        let width = self.pointer_width.bytes();
        let chars: Vec<u8> = units.iter().flat_map(|u| u.to_le_bytes()).collect();
        let builder = match self.pointer_width {
            PointerWidth::Bits32 => self.write_u32(offset, STRING_METHOD_TABLE),
            PointerWidth::Bits64 => self.write_u64(offset, u64::from(STRING_METHOD_TABLE)),
        };
        builder
            .write_i32(offset + width, units.len() as i32)
            .write_bytes(offset + width + 4, &chars)
    }

    /// Build the MockMemoryReader
    pub fn build(self) -> MockMemoryReader {
        let mut reader = MockMemoryReader::with_base(self.data, self.base);
        reader.target.pid = self.pid;
        reader.target.pointer_width = self.pointer_width;
        reader.target.executable_dir = self.executable_dir;
        reader
    }

    fn ensure_size(&mut self, required: usize) {
        if self.data.len() < required {
            self.data.resize(required, 0);
        }
    }
}

/// Provider handing out a configurable in-memory process.
///
/// Clones share state, so a test can keep one clone while the poll loop owns
/// another.
#[derive(Debug, Clone, Default)]
pub struct MockProcessProvider {
    process: Arc<Mutex<Option<MockMemoryReader>>>,
    deny_permission: Arc<AtomicBool>,
    attach_count: Arc<AtomicU32>,
}

impl MockProcessProvider {
    pub fn new(process: MockMemoryReader) -> Self {
        let provider = Self::default();
        provider.set_process(process);
        provider
    }

    pub fn set_process(&self, process: MockMemoryReader) {
        *self.process.lock().unwrap_or_else(PoisonError::into_inner) = Some(process);
    }

    pub fn clear(&self) {
        *self.process.lock().unwrap_or_else(PoisonError::into_inner) = None;
    }

    /// Make every attach fail with a permission error.
    pub fn deny_permission(&self, deny: bool) {
        self.deny_permission.store(deny, Ordering::SeqCst);
    }

    /// Number of attach attempts so far.
    pub fn attach_count(&self) -> u32 {
        self.attach_count.load(Ordering::SeqCst)
    }
}

impl ProcessProvider for MockProcessProvider {
    type Process = MockMemoryReader;

    fn attach(&self, selector: &ProcessSelector) -> Result<Self::Process, AttachError> {
        self.attach_count.fetch_add(1, Ordering::SeqCst);

        let process = self
            .process
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
            .filter(|p| p.is_alive())
            .ok_or_else(|| AttachError::NotFound(format!("Mock process {} not found", selector)))?;

        if let ProcessSelector::Pid(pid) = selector {
            if *pid != process.target.pid {
                return Err(AttachError::NotFound(format!("Mock process {} not found", pid)));
            }
        }
        if self.deny_permission.load(Ordering::SeqCst) {
            return Err(AttachError::PermissionDenied {
                pid: process.target.pid,
            });
        }
        Ok(process)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mock_reader_basic() {
        let data = vec![0x78, 0x56, 0x34, 0x12];
        let reader = MockMemoryReader::new(data);

        let value = reader.read_i32(0x1000).unwrap();
        assert_eq!(value, 0x12345678);
    }

    #[test]
    fn test_mock_reader_with_base() {
        let data = vec![0x01, 0x02, 0x03, 0x04];
        let reader = MockMemoryReader::with_base(data, 0x400000);

        let bytes = reader.read_bytes(0x400000, 4).unwrap();
        assert_eq!(bytes, vec![0x01, 0x02, 0x03, 0x04]);
    }

    #[test]
    fn test_mock_reader_below_base() {
        let data = vec![0x01, 0x02, 0x03, 0x04];
        let reader = MockMemoryReader::with_base(data, 0x2000);

        let result = reader.read_bytes(0x1000, 4);
        assert_eq!(result, Err(ReadError::InvalidAddress { address: 0x1000 }));
    }

    #[test]
    fn test_mock_reader_terminate() {
        let reader = MockMemoryReader::new(vec![0; 16]);
        let clone = reader.clone();

        reader.terminate();
        assert!(!clone.is_alive());
        assert_eq!(clone.read_u32(0x1000), Err(ReadError::ProcessExited));
        assert_eq!(clone.regions(), Err(ReadError::ProcessExited));
    }

    #[test]
    fn test_mock_reader_single_region() {
        let reader = MockMemoryReader::new(vec![0; 0x200]);
        assert_eq!(
            reader.regions().unwrap(),
            vec![MemoryRegion::new(0x1000, 0x200)]
        );
    }

    #[test]
    fn test_builder_basic() {
        let reader = MockMemoryBuilder::new()
            .write_i32(0, 0x12345678)
            .write_u64(4, 0xDEADBEEFCAFEBABE)
            .build();

        assert_eq!(reader.read_i32(0x1000).unwrap(), 0x12345678);
        assert_eq!(reader.read_u64(0x1004).unwrap(), 0xDEADBEEFCAFEBABE);
    }

    #[test]
    fn test_builder_with_size() {
        let reader = MockMemoryBuilder::new()
            .with_size(100)
            .write_i32(96, 123)
            .build();

        assert_eq!(reader.len(), 100);
        assert_eq!(reader.read_i32(0x1000 + 96).unwrap(), 123);
    }

    #[test]
    fn test_builder_ptr32() {
        let reader = MockMemoryBuilder::new()
            .with_size(0x20)
            .write_ptr32(0, 0x10)
            .build();
        assert_eq!(reader.read_pointer(0x1000).unwrap(), 0x1010);
    }

    #[test]
    fn test_builder_managed_string_layout() {
        let reader = MockMemoryBuilder::new()
            .write_managed_string(0, "ab")
            .build();

        assert_eq!(reader.read_u32(0x1000).unwrap(), STRING_METHOD_TABLE);
        assert_eq!(reader.read_i32(0x1004).unwrap(), 2);
        assert_eq!(reader.read_bytes(0x1008, 4).unwrap(), vec![b'a', 0, b'b', 0]);
    }

    #[test]
    fn test_builder_target() {
        let reader = MockMemoryBuilder::new()
            .pid(77)
            .executable_dir("/games/osu")
            .with_size(4)
            .build();

        assert_eq!(reader.target().pid, 77);
        assert_eq!(
            reader.target().executable_dir,
            Some(PathBuf::from("/games/osu"))
        );
    }

    #[test]
    fn test_provider_permission_denied() {
        let provider = MockProcessProvider::new(MockMemoryBuilder::new().with_size(4).build());
        provider.deny_permission(true);

        let result = provider.attach(&ProcessSelector::name("osu!.exe"));
        assert_eq!(result.unwrap_err(), AttachError::PermissionDenied { pid: 4242 });
        assert_eq!(provider.attach_count(), 1);
    }

    #[test]
    fn test_provider_skips_terminated_process() {
        let reader = MockMemoryBuilder::new().with_size(4).build();
        let provider = MockProcessProvider::new(reader.clone());
        reader.terminate();

        assert!(matches!(
            provider.attach(&ProcessSelector::name("osu!.exe")),
            Err(AttachError::NotFound(_))
        ));
    }
}
