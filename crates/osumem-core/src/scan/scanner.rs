use tracing::debug;

use crate::config::scan::{CHUNK_SIZE, DEFAULT_SCAN_CAP};
use crate::error::{ReadError, ScanError};
use crate::process::ReadMemory;

use super::chunked::RegionChunks;
use super::{Signature, find_first};

/// Linear scanner over the readable regions of a target.
///
/// The first (lowest-address) match wins. Each `find` call reads at most
/// `cap` bytes; running out of budget reports `NotFound`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SignatureScanner {
    cap: u64,
    chunk_size: usize,
}

impl Default for SignatureScanner {
    fn default() -> Self {
        Self::new(DEFAULT_SCAN_CAP)
    }
}

impl SignatureScanner {
    pub fn new(cap: u64) -> Self {
        Self {
            cap,
            chunk_size: CHUNK_SIZE,
        }
    }

    pub fn with_chunk_size(mut self, chunk_size: usize) -> Self {
        self.chunk_size = chunk_size.max(1);
        self
    }

    pub fn cap(&self) -> u64 {
        self.cap
    }

    /// Address of the first match of `signature` in the target.
    ///
    /// Chunks overlap by `signature.len() - 1` bytes so matches straddling a
    /// chunk boundary, or the boundary between two adjacent regions, are
    /// found. An unreadable chunk ends the scan of its region; the process
    /// exiting ends the whole scan.
    pub fn find<R: ReadMemory + ?Sized>(
        &self,
        reader: &R,
        signature: &Signature,
    ) -> Result<u64, ScanError> {
        let regions = reader.regions()?;
        let overlap = signature.len().saturating_sub(1);

        let mut scanned: u64 = 0;
        let mut carry: Vec<u8> = Vec::new();
        let mut carry_start: u64 = 0;

        for region in regions {
            if scanned >= self.cap {
                break;
            }
            if carry_start.wrapping_add(carry.len() as u64) != region.base {
                carry.clear();
            }

            for chunk in RegionChunks::new(reader, region, self.cap - scanned, self.chunk_size) {
                let chunk = match chunk {
                    Ok(chunk) => chunk,
                    Err(ReadError::ProcessExited) => {
                        return Err(ScanError::Read(ReadError::ProcessExited));
                    }
                    Err(e) => {
                        debug!(
                            "Skipping rest of region {:#x}..{:#x}: {}",
                            region.base,
                            region.end(),
                            e
                        );
                        carry.clear();
                        break;
                    }
                };
                scanned += chunk.data.len() as u64;

                let (window_start, window) = if carry.is_empty() {
                    (chunk.address, chunk.data)
                } else {
                    let mut joined = std::mem::take(&mut carry);
                    joined.extend_from_slice(&chunk.data);
                    (carry_start, joined)
                };

                if let Some(offset) = find_first(&window, signature) {
                    let address = window_start + offset as u64;
                    debug!("Signature '{}' found at {:#x}", signature, address);
                    return Ok(address);
                }

                let keep = overlap.min(window.len());
                carry_start = window_start + (window.len() - keep) as u64;
                carry = window[window.len() - keep..].to_vec();
            }
        }

        debug!(
            "Signature '{}' not found after scanning {} bytes",
            signature, scanned
        );
        Err(ScanError::NotFound { scanned })
    }
}
