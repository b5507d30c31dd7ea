use std::collections::HashMap;
use std::time::{Duration, Instant};

use tracing::{debug, warn};

use crate::config::scan::MISS_RESCAN_MS;
use crate::error::ScanError;
use crate::process::ReadMemory;
use crate::scan::{Signature, SignatureScanner};

#[derive(Debug, Clone, Copy)]
enum Entry {
    Found(u64),
    Missing { at: Instant },
}

/// Signature scan results for one attach cycle.
///
/// Code does not move while the process runs, so a located anchor stays valid
/// until the next attach. A miss is only trusted for `rescan_after`: the game
/// may not have loaded the code yet when the first scan runs.
#[derive(Debug)]
pub struct AnchorCache {
    entries: HashMap<Signature, Entry>,
    rescan_after: Duration,
}

impl Default for AnchorCache {
    fn default() -> Self {
        Self {
            entries: HashMap::new(),
            rescan_after: Duration::from_millis(MISS_RESCAN_MS),
        }
    }
}

impl AnchorCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// How long a signature that was not found is reported missing before
    /// it is scanned for again.
    pub fn with_rescan_after(mut self, rescan_after: Duration) -> Self {
        self.rescan_after = rescan_after;
        self
    }

    /// Address of `signature`, scanning on first use and after an expired
    /// miss.
    ///
    /// Read failures other than "not found" are returned and not cached.
    pub fn locate<R: ReadMemory + ?Sized>(
        &mut self,
        reader: &R,
        scanner: &SignatureScanner,
        signature: &Signature,
    ) -> Result<Option<u64>, ScanError> {
        let missed_before = match self.entries.get(signature) {
            Some(Entry::Found(address)) => return Ok(Some(*address)),
            Some(Entry::Missing { at }) if at.elapsed() < self.rescan_after => return Ok(None),
            Some(Entry::Missing { .. }) => true,
            None => false,
        };

        let entry = match scanner.find(reader, signature) {
            Ok(address) => {
                debug!("Anchor '{}' at {:#x}", signature, address);
                Entry::Found(address)
            }
            Err(ScanError::NotFound { scanned }) => {
                if missed_before {
                    debug!("Anchor '{}' still missing", signature);
                } else {
                    warn!(
                        "Anchor '{}' not found ({} bytes scanned)",
                        signature, scanned
                    );
                }
                Entry::Missing { at: Instant::now() }
            }
            Err(e) => return Err(e),
        };

        self.entries.insert(signature.clone(), entry);
        Ok(match entry {
            Entry::Found(address) => Some(address),
            Entry::Missing { .. } => None,
        })
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ReadError;
    use crate::process::MockMemoryBuilder;

    #[test]
    fn test_locate_caches_hit() {
        let reader = MockMemoryBuilder::new()
            .with_size(0x40)
            .write_bytes(0x20, &[0xAB, 0xCD])
            .build();
        let signature: Signature = "AB CD".parse().unwrap();
        let mut cache = AnchorCache::new();
        let scanner = SignatureScanner::default();

        assert_eq!(cache.locate(&reader, &scanner, &signature), Ok(Some(0x1020)));
        assert_eq!(cache.len(), 1);

        // Served from the cache even after the process is gone.
        reader.terminate();
        assert_eq!(cache.locate(&reader, &scanner, &signature), Ok(Some(0x1020)));
    }

    #[test]
    fn test_locate_remembers_miss() {
        let reader = MockMemoryBuilder::new().with_size(0x40).build();
        let signature: Signature = "AB CD".parse().unwrap();
        let mut cache = AnchorCache::new();
        let scanner = SignatureScanner::default();

        assert_eq!(cache.locate(&reader, &scanner, &signature), Ok(None));
        reader.terminate();
        assert_eq!(cache.locate(&reader, &scanner, &signature), Ok(None));
    }

    #[test]
    fn test_expired_miss_is_rescanned() {
        let signature: Signature = "AB CD".parse().unwrap();
        let mut cache = AnchorCache::new().with_rescan_after(Duration::ZERO);
        let scanner = SignatureScanner::default();

        let before_load = MockMemoryBuilder::new().with_size(0x40).build();
        assert_eq!(cache.locate(&before_load, &scanner, &signature), Ok(None));

        let loaded = MockMemoryBuilder::new()
            .with_size(0x40)
            .write_bytes(0x30, &[0xAB, 0xCD])
            .build();
        assert_eq!(cache.locate(&loaded, &scanner, &signature), Ok(Some(0x1030)));
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_process_exit_not_cached() {
        let reader = MockMemoryBuilder::new().with_size(0x40).build();
        reader.terminate();
        let signature: Signature = "AB CD".parse().unwrap();
        let mut cache = AnchorCache::new();

        assert_eq!(
            cache.locate(&reader, &SignatureScanner::default(), &signature),
            Err(ScanError::Read(ReadError::ProcessExited))
        );
        assert!(cache.is_empty());
    }
}
