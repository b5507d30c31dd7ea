//! Chunked reads over one memory region.
//!
//! A scan never holds more than one chunk (plus the signature overlap) of
//! target memory at a time.

use crate::process::{MemoryRegion, ReadMemory, ReadResult};

/// Bytes read from the target, tagged with their address.
#[derive(Debug)]
pub struct MemoryChunk {
    pub address: u64,
    pub data: Vec<u8>,
}

/// Reads the start of a region in pieces of at most `chunk_size` bytes,
/// stopping after `budget` bytes.
pub struct RegionChunks<'a, R: ReadMemory + ?Sized> {
    reader: &'a R,
    next: u64,
    end: u64,
    chunk_size: u64,
}

impl<'a, R: ReadMemory + ?Sized> RegionChunks<'a, R> {
    pub fn new(reader: &'a R, region: MemoryRegion, budget: u64, chunk_size: usize) -> Self {
        Self {
            reader,
            next: region.base,
            end: region.end().min(region.base.saturating_add(budget)),
            chunk_size: chunk_size.max(1) as u64,
        }
    }

    /// Bytes left to read.
    pub fn remaining(&self) -> u64 {
        self.end.saturating_sub(self.next)
    }
}

impl<R: ReadMemory + ?Sized> Iterator for RegionChunks<'_, R> {
    type Item = ReadResult<MemoryChunk>;

    fn next(&mut self) -> Option<Self::Item> {
        let len = self.chunk_size.min(self.remaining());
        if len == 0 {
            return None;
        }

        let address = self.next;
        self.next += len;
        Some(
            self.reader
                .read_bytes(address, len as usize)
                .map(|data| MemoryChunk { address, data }),
        )
    }
}
