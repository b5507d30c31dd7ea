use chrono::{DateTime, Utc};
use serde::Serialize;

use super::info::BeatmapInfo;

/// A published snapshot together with where and when it was taken.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SnapshotRecord {
    pub pid: u32,
    /// Offset table family used to read it.
    pub family: String,
    /// Poll cycle that produced it; increases monotonically per loop.
    pub cycle: u64,
    pub captured_at: DateTime<Utc>,
    pub info: BeatmapInfo,
}

impl SnapshotRecord {
    pub fn new(pid: u32, family: impl Into<String>, cycle: u64, info: BeatmapInfo) -> Self {
        Self {
            pid,
            family: family.into(),
            cycle,
            captured_at: Utc::now(),
            info,
        }
    }

    /// Whether this record describes a different beatmap than `other`.
    pub fn is_new_beatmap(&self, other: Option<&SnapshotRecord>) -> bool {
        other.is_none_or(|o| o.pid != self.pid || o.info.technical.md5 != self.info.technical.md5)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(pid: u32, md5: &str) -> SnapshotRecord {
        let mut info = BeatmapInfo::default();
        info.technical.md5 = md5.to_string();
        SnapshotRecord::new(pid, "stable", 1, info)
    }

    #[test]
    fn test_is_new_beatmap() {
        let a = record(1, "aa");
        assert!(a.is_new_beatmap(None));
        assert!(!a.is_new_beatmap(Some(&record(1, "aa"))));
        assert!(a.is_new_beatmap(Some(&record(1, "bb"))));
        assert!(a.is_new_beatmap(Some(&record(2, "aa"))));
    }

    #[test]
    fn test_serializes_timestamp() {
        let json = serde_json::to_value(record(1, "aa")).unwrap();
        assert!(json["captured_at"].is_string());
        assert_eq!(json["family"], "stable");
    }
}
