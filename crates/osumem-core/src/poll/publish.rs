use std::sync::{Arc, PoisonError, RwLock};

use crate::beatmap::SnapshotRecord;

/// Single-writer, multi-reader slot holding the latest snapshot.
///
/// The writer swaps in a whole new `Arc`; readers clone the `Arc` and never
/// see a record being built.
#[derive(Debug, Default)]
pub struct SnapshotCell {
    latest: RwLock<Option<Arc<SnapshotRecord>>>,
}

impl SnapshotCell {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the published snapshot.
    pub fn publish(&self, record: SnapshotRecord) -> Arc<SnapshotRecord> {
        let record = Arc::new(record);
        let mut slot = self.latest.write().unwrap_or_else(PoisonError::into_inner);
        *slot = Some(Arc::clone(&record));
        record
    }

    pub fn latest(&self) -> Option<Arc<SnapshotRecord>> {
        self.latest
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn clear(&self) {
        *self.latest.write().unwrap_or_else(PoisonError::into_inner) = None;
    }
}
