use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::enums::{GameMode, RankedStatus};

/// One immutable view of the beatmap loaded in the game.
///
/// Optional fields are `None` (serialized as `null`) when the offset table
/// marks them unsupported or when they could not be read this cycle.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct BeatmapInfo {
    pub metadata: Metadata,
    pub stats: Stats,
    pub technical: Technical,
    pub location: Location,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Metadata {
    pub author: Option<String>,
    pub creator: Option<String>,
    pub title_romanized: Option<String>,
    pub title_original: Option<String>,
    pub difficulty: Option<String>,
    /// Space-separated search tags.
    pub tags: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Stats {
    pub ar: Option<f32>,
    pub od: Option<f32>,
    pub cs: Option<f32>,
    pub hp: Option<f32>,
    pub total_length_ms: Option<u32>,
    /// Playable time, without breaks and the lead-in.
    pub drain_time_ms: Option<u32>,
    pub object_count: Option<u32>,
    pub slider_count: Option<u32>,
    pub star_rating: StarRating,
}

/// Star ratings for the no-mod, double-time and half-time variants. Each is
/// absent until something computed it.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct StarRating {
    pub no_mod: Option<f32>,
    pub double_time: Option<f32>,
    pub half_time: Option<f32>,
}

impl StarRating {
    pub fn is_empty(&self) -> bool {
        self.no_mod.is_none() && self.double_time.is_none() && self.half_time.is_none()
    }

    /// Fill absent values from `other`.
    pub fn or(self, other: StarRating) -> StarRating {
        StarRating {
            no_mod: self.no_mod.or(other.no_mod),
            double_time: self.double_time.or(other.double_time),
            half_time: self.half_time.or(other.half_time),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Technical {
    /// Hex MD5 of the beatmap file.
    pub md5: String,
    pub id: Option<i32>,
    pub set_id: Option<i32>,
    pub mode: GameMode,
    pub ranked_status: RankedStatus,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Location {
    /// Beatmap folder, relative to the songs directory.
    pub folder: String,
    pub filename: String,
    pub audio: Option<String>,
    pub cover: Option<String>,
}

/// Absolute file locations of a beatmap.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BeatmapPaths {
    pub folder: PathBuf,
    pub beatmap: PathBuf,
    pub audio: Option<PathBuf>,
    pub cover: Option<PathBuf>,
}

impl BeatmapInfo {
    /// Resolve the location fields against the game's songs directory.
    pub fn paths(&self, songs_dir: &Path) -> BeatmapPaths {
        let folder = songs_dir.join(&self.location.folder);
        BeatmapPaths {
            beatmap: folder.join(&self.location.filename),
            audio: self.location.audio.as_ref().map(|a| folder.join(a)),
            cover: self.location.cover.as_ref().map(|c| folder.join(c)),
            folder,
        }
    }

    pub fn total_length(&self) -> Option<Duration> {
        self.stats
            .total_length_ms
            .map(|ms| Duration::from_millis(u64::from(ms)))
    }

    /// Display name in the usual `Artist - Title [Difficulty]` form.
    pub fn display_name(&self) -> String {
        let meta = &self.metadata;
        let title = meta
            .title_original
            .as_deref()
            .filter(|t| !t.is_empty())
            .or(meta.title_romanized.as_deref())
            .unwrap_or("?");
        let mut name = match meta.author.as_deref() {
            Some(author) => format!("{} - {}", author, title),
            None => title.to_string(),
        };
        if let Some(difficulty) = &meta.difficulty {
            name.push_str(&format!(" [{}]", difficulty));
        }
        name
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> BeatmapInfo {
        BeatmapInfo {
            metadata: Metadata {
                author: Some("xi".to_string()),
                title_romanized: Some("FREEDOM DiVE".to_string()),
                difficulty: Some("FOUR DIMENSIONS".to_string()),
                ..Default::default()
            },
            stats: Stats {
                ar: Some(9.0),
                total_length_ms: Some(1500),
                ..Default::default()
            },
            technical: Technical {
                md5: "da8aae79c8f3306b5d65ec951874a7fb".to_string(),
                mode: GameMode::Standard,
                ranked_status: RankedStatus::Ranked,
                ..Default::default()
            },
            location: Location {
                folder: "songs/123".to_string(),
                filename: "map.osu".to_string(),
                audio: Some("audio.mp3".to_string()),
                cover: None,
            },
        }
    }

    #[test]
    fn test_json_shape() {
        let json = serde_json::to_value(sample()).unwrap();

        assert_eq!(json["location"]["folder"], "songs/123");
        assert_eq!(json["stats"]["ar"], 9.0);
        assert_eq!(json["stats"]["od"], serde_json::Value::Null);
        assert_eq!(json["stats"]["star_rating"]["no_mod"], serde_json::Value::Null);
        assert_eq!(json["technical"]["mode"], "standard");
        assert_eq!(json["technical"]["ranked_status"], "ranked");
        assert_eq!(json["location"]["cover"], serde_json::Value::Null);
        assert_eq!(json["metadata"]["tags"], serde_json::Value::Null);
        assert_eq!(json["stats"]["drain_time_ms"], serde_json::Value::Null);
    }

    #[test]
    fn test_json_roundtrip() {
        let info = sample();
        let json = serde_json::to_string(&info).unwrap();
        let back: BeatmapInfo = serde_json::from_str(&json).unwrap();
        assert_eq!(back, info);
    }

    #[test]
    fn test_paths() {
        let paths = sample().paths(Path::new("/games/osu/Songs"));
        assert_eq!(paths.folder, PathBuf::from("/games/osu/Songs/songs/123"));
        assert_eq!(
            paths.beatmap,
            PathBuf::from("/games/osu/Songs/songs/123/map.osu")
        );
        assert_eq!(
            paths.audio,
            Some(PathBuf::from("/games/osu/Songs/songs/123/audio.mp3"))
        );
        assert_eq!(paths.cover, None);
    }

    #[test]
    fn test_total_length() {
        assert_eq!(sample().total_length(), Some(Duration::from_millis(1500)));
        assert_eq!(BeatmapInfo::default().total_length(), None);
    }

    #[test]
    fn test_display_name() {
        assert_eq!(sample().display_name(), "xi - FREEDOM DiVE [FOUR DIMENSIONS]");
    }

    #[test]
    fn test_star_rating_or() {
        let read = StarRating {
            no_mod: Some(5.0),
            ..Default::default()
        };
        let forwarded = StarRating {
            no_mod: Some(1.0),
            double_time: Some(7.5),
            half_time: None,
        };
        let merged = read.or(forwarded);
        assert_eq!(merged.no_mod, Some(5.0));
        assert_eq!(merged.double_time, Some(7.5));
        assert!(merged.half_time.is_none());
        assert!(StarRating::default().is_empty());
    }
}
