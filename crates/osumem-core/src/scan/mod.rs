//! Signature scanning over target memory.

pub mod chunked;
mod pattern;
mod scanner;
mod signature;

pub use chunked::{MemoryChunk, RegionChunks};
pub use pattern::{find_all, find_first};
pub use scanner::SignatureScanner;
pub use signature::{Signature, format_pattern, parse_pattern};
