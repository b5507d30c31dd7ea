//! Configuration defaults and the poll loop configuration.
//!
//! This module contains:
//! - Constant tables for attach retry, polling, read limits and scanning
//! - `LoopConfig` - runtime configuration for the poll loop

mod loop_config;

pub use loop_config::{LoopConfig, LoopConfigBuilder};

/// Attach retry configuration.
///
/// Exponential backoff: 100ms → 200ms → 400ms → 800ms → 1600ms, then the
/// last delay repeats while the loop keeps waiting for the game.
pub mod retry {
    /// Attach attempts made by the initialization call before giving up.
    pub const MAX_INIT_ATTEMPTS: u32 = 5;

    /// Delay (in ms) before each attach attempt.
    pub const ATTACH_BACKOFF_MS: [u64; 5] = [100, 200, 400, 800, 1600];

    /// Consecutive permission failures tolerated before the loop gives up.
    pub const PERMISSION_FAILURE_BUDGET: u32 = 10;
}

/// Poll loop timing.
pub mod polling {
    /// Default interval between snapshots.
    pub const DEFAULT_INTERVAL_MS: u64 = 100;

    /// Lowest accepted polling interval.
    pub const MIN_INTERVAL_MS: u64 = 10;

    /// Floor for any retry delay, so a failing target is never busy-polled.
    pub const MIN_RETRY_INTERVAL_MS: u64 = 100;
}

/// Bounds applied to every read and decode.
pub mod limits {
    /// Largest single read accepted by a process handle (16 MiB).
    pub const MAX_READ_BYTES: usize = 16 * 1024 * 1024;

    /// Longest string the decoders will produce, in characters.
    pub const MAX_STRING_CHARS: usize = 4096;

    /// Bytes fetched per step while looking for a string terminator.
    pub const STRING_CHUNK_BYTES: usize = 256;

    /// Page granularity used to keep terminator searches inside one mapping.
    pub const PAGE_SIZE: u64 = 0x1000;
}

/// Signature scanning configuration.
pub mod scan {
    /// Default cap on bytes scanned per `find` call (512 MiB).
    pub const DEFAULT_SCAN_CAP: u64 = 512 * 1024 * 1024;

    /// Bytes read from the target per scan step (4 MiB).
    pub const CHUNK_SIZE: usize = 4 * 1024 * 1024;

    /// Time before a signature that was not found is scanned for again.
    pub const MISS_RESCAN_MS: u64 = 2000;
}

/// Target process identification.
pub mod process {
    /// Executable name of the game.
    pub const DEFAULT_PROCESS_NAME: &str = "osu!.exe";

    /// Command-line words marking launcher/wrapper processes that also carry
    /// the executable name under compatibility layers.
    pub const EXCLUDED_WORDS: [&str; 2] = ["umu-run", "waitforexitandrun"];
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retry_constants() {
        assert_eq!(retry::MAX_INIT_ATTEMPTS, 5);
        assert_eq!(retry::ATTACH_BACKOFF_MS.len(), 5);
        let total: u64 = retry::ATTACH_BACKOFF_MS.iter().sum();
        assert_eq!(total, 3100);
    }

    #[test]
    fn test_polling_constants() {
        assert!(polling::MIN_INTERVAL_MS <= polling::DEFAULT_INTERVAL_MS);
        assert!(polling::MIN_RETRY_INTERVAL_MS >= polling::MIN_INTERVAL_MS);
    }

    #[test]
    fn test_limit_constants() {
        assert_eq!(limits::MAX_READ_BYTES, 0x100_0000);
        assert_eq!(limits::MAX_STRING_CHARS, 4096);
        assert_eq!(limits::STRING_CHUNK_BYTES % 2, 0);
    }

    #[test]
    fn test_scan_constants() {
        assert_eq!(scan::DEFAULT_SCAN_CAP, 512 * 1024 * 1024);
        assert!(scan::CHUNK_SIZE <= limits::MAX_READ_BYTES);
        assert!(scan::MISS_RESCAN_MS > polling::DEFAULT_INTERVAL_MS);
    }
}
