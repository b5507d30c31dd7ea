use std::sync::Arc;

use tracing::{debug, info};

use crate::error::{AttachError, Result};
use crate::process::ReadMemory;
use crate::scan::SignatureScanner;

use super::anchors::AnchorCache;
use super::loader::OffsetRegistry;
use super::table::OffsetTable;

/// Pick the first registered table whose version signature occurs in the
/// target.
///
/// Tables for a different pointer width are skipped without scanning. The
/// scan results land in `cache`, so anchors sharing the version signature
/// are not scanned twice.
pub fn detect_table<R: ReadMemory + ?Sized>(
    reader: &R,
    registry: &OffsetRegistry,
    scanner: &SignatureScanner,
    cache: &mut AnchorCache,
    pid: u32,
) -> Result<Arc<OffsetTable>> {
    for table in registry.tables() {
        if table.pointer_width != reader.pointer_width() {
            debug!(
                "Skipping table '{}': {}-bit table, {}-bit target",
                table.family,
                table.pointer_width.bits(),
                reader.pointer_width().bits()
            );
            continue;
        }

        if let Some(address) = cache.locate(reader, scanner, &table.version_signature)? {
            info!(
                "Using offset table '{}' (version signature at {:#x})",
                table.family, address
            );
            return Ok(Arc::clone(table));
        }
    }

    Err(AttachError::UnsupportedVersion { pid }.into())
}
