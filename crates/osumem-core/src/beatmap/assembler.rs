use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::{debug, trace};

use crate::decode::{Value, read_value};
use crate::error::{Error, FieldError, ReadError, Result, SnapshotError};
use crate::offset::{AnchorCache, Locator, OffsetTable, fields};
use crate::pointer::resolve;
use crate::process::{ProcessTarget, ReadMemory};
use crate::scan::SignatureScanner;

use super::enums::{GameMode, GameState, RankedStatus};
use super::info::{BeatmapInfo, Location, Metadata, StarRating, Stats, Technical};
use super::rating::{NoRatings, RatingRequest, RatingSource};

/// Songs folder value meaning "next to the executable".
const DEFAULT_SONGS_FOLDER: &str = "Songs";

/// A non-critical field that fell back to unknown.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownField {
    pub field: &'static str,
    pub cause: FieldError,
}

impl UnknownField {
    /// True when the offset table does not expose the field at all.
    pub fn is_unsupported(&self) -> bool {
        matches!(self.cause, FieldError::Unsupported | FieldError::MissingEntry)
    }
}

/// Which fields of a snapshot are unknown and why.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SnapshotReport {
    pub unknown: Vec<UnknownField>,
}

impl SnapshotReport {
    pub fn is_complete(&self) -> bool {
        self.unknown.is_empty()
    }

    pub fn unsupported(&self) -> impl Iterator<Item = &UnknownField> {
        self.unknown.iter().filter(|u| u.is_unsupported())
    }

    /// Fields the table locates but that could not be read this time.
    pub fn failed(&self) -> impl Iterator<Item = &UnknownField> {
        self.unknown.iter().filter(|u| !u.is_unsupported())
    }

    pub fn get(&self, field: &str) -> Option<&UnknownField> {
        self.unknown.iter().find(|u| u.field == field)
    }
}

/// Builds [`BeatmapInfo`] snapshots from target memory using one offset
/// table.
///
/// Anchor addresses are cached for the current attach cycle; every field
/// address is resolved again on each snapshot because the objects behind the
/// chains move when the game reloads the beatmap.
pub struct BeatmapAssembler {
    table: Arc<OffsetTable>,
    scanner: SignatureScanner,
    anchors: AnchorCache,
    ratings: Arc<dyn RatingSource>,
    rating_cache: Option<(String, StarRating)>,
    executable_dir: Option<PathBuf>,
}

impl BeatmapAssembler {
    pub fn new(table: Arc<OffsetTable>) -> Self {
        Self {
            table,
            scanner: SignatureScanner::default(),
            anchors: AnchorCache::new(),
            ratings: Arc::new(NoRatings),
            rating_cache: None,
            executable_dir: None,
        }
    }

    pub fn with_scanner(mut self, scanner: SignatureScanner) -> Self {
        self.scanner = scanner;
        self
    }

    pub fn with_ratings(mut self, ratings: Arc<dyn RatingSource>) -> Self {
        self.ratings = ratings;
        self.rating_cache = None;
        self
    }

    /// Start from anchors already located during version detection.
    pub fn with_anchors(mut self, anchors: AnchorCache) -> Self {
        self.anchors = anchors;
        self
    }

    pub fn table(&self) -> &Arc<OffsetTable> {
        &self.table
    }

    /// Give back the anchor cache, for reuse when re-attaching to the same
    /// process.
    pub fn into_anchors(self) -> AnchorCache {
        self.anchors
    }

    /// Forget everything tied to the previous process.
    pub fn reset_for(&mut self, target: &ProcessTarget) {
        self.anchors.clear();
        self.rating_cache = None;
        self.executable_dir = target.executable_dir.clone();
    }

    pub fn snapshot<R: ReadMemory + ?Sized>(&mut self, reader: &R) -> Result<BeatmapInfo> {
        self.snapshot_with_report(reader).map(|(info, _)| info)
    }

    /// Take a snapshot and report which non-critical fields are unknown.
    ///
    /// Fails with [`SnapshotError::IncompleteState`] when the folder, file
    /// name or content hash cannot be produced, and with
    /// [`ReadError::ProcessExited`] as soon as any read reports that the
    /// target is gone.
    pub fn snapshot_with_report<R: ReadMemory + ?Sized>(
        &mut self,
        reader: &R,
    ) -> Result<(BeatmapInfo, SnapshotReport)> {
        let mut pass = Pass {
            assembler: self,
            reader,
            report: SnapshotReport::default(),
        };

        let folder = pass.critical_text(fields::FOLDER)?;
        let filename = pass.critical_text(fields::FILENAME)?;
        let md5 = pass.critical_text(fields::MD5)?;
        if !is_md5(&md5) {
            return Err(SnapshotError::IncompleteState {
                field: fields::MD5,
                cause: FieldError::Invalid(format!("'{}' is not an MD5 digest", md5)),
            }
            .into());
        }
        if filename.is_empty() {
            return Err(SnapshotError::IncompleteState {
                field: fields::FILENAME,
                cause: FieldError::Invalid("empty file name".to_string()),
            }
            .into());
        }

        let metadata = Metadata {
            author: pass.text(fields::AUTHOR)?,
            creator: pass.text(fields::CREATOR)?,
            title_romanized: pass.text(fields::TITLE)?,
            title_original: pass.text(fields::TITLE_ORIGINAL)?,
            difficulty: pass.text(fields::DIFFICULTY_NAME)?,
            tags: pass.text(fields::TAGS)?,
        };

        let mode = pass
            .int(fields::MODE)?
            .and_then(|v| i32::try_from(v).ok())
            .map_or(GameMode::Unknown, GameMode::from_raw);
        let ranked_status = pass
            .int(fields::RANKED_STATUS)?
            .and_then(|v| i32::try_from(v).ok())
            .map_or(RankedStatus::Unknown, RankedStatus::from_raw);

        let technical = Technical {
            id: pass.signed(fields::ID)?,
            set_id: pass.signed(fields::SET_ID)?,
            mode,
            ranked_status,
            md5,
        };

        let location = Location {
            audio: pass.text(fields::AUDIO)?,
            cover: pass.text(fields::COVER)?,
            folder,
            filename,
        };

        let difficulty = pass.value(fields::DIFFICULTY_RECORD)?;
        let member = |name: &str| {
            difficulty
                .as_ref()
                .and_then(Value::as_record)
                .and_then(|record| record.f32(name))
        };
        let read_stars = StarRating {
            no_mod: pass.float(fields::STARS_NOMOD)?,
            double_time: pass.float(fields::STARS_DT)?,
            half_time: pass.float(fields::STARS_HT)?,
        };

        let mut stats = Stats {
            ar: member("ar"),
            od: member("od"),
            cs: member("cs"),
            hp: member("hp"),
            total_length_ms: pass.count(fields::TOTAL_LENGTH)?,
            drain_time_ms: pass.count(fields::DRAIN_TIME)?,
            object_count: pass.count(fields::OBJECT_COUNT)?,
            slider_count: pass.count(fields::SLIDER_COUNT)?,
            star_rating: read_stars,
        };

        let Pass {
            assembler, report, ..
        } = pass;

        let complete = read_stars.no_mod.is_some()
            && read_stars.double_time.is_some()
            && read_stars.half_time.is_some();
        if !complete {
            let forwarded = assembler.forwarded_rating(reader, &technical, &location)?;
            stats.star_rating = read_stars.or(forwarded);
        }

        let info = BeatmapInfo {
            metadata,
            stats,
            technical,
            location,
        };
        trace!(
            "Snapshot of '{}' ({} unknown fields)",
            info.location.filename,
            report.unknown.len()
        );
        Ok((info, report))
    }

    /// Screen the game is showing. Unreadable or unexpected values map to
    /// [`GameState::Unknown`].
    pub fn game_state<R: ReadMemory + ?Sized>(&mut self, reader: &R) -> Result<GameState> {
        Ok(self
            .game_int(reader, fields::GAME_STATUS)?
            .and_then(|raw| u32::try_from(raw).ok())
            .map_or(GameState::Unknown, GameState::from_raw))
    }

    /// Mods bitmask selected in song select.
    pub fn menu_mods<R: ReadMemory + ?Sized>(&mut self, reader: &R) -> Result<Option<u32>> {
        Ok(self
            .game_int(reader, fields::MENU_MODS)?
            .and_then(|raw| u32::try_from(raw).ok()))
    }

    /// Audio position of the current song in milliseconds. Negative during
    /// the lead-in.
    pub fn play_time_ms<R: ReadMemory + ?Sized>(&mut self, reader: &R) -> Result<Option<i32>> {
        Ok(self
            .game_int(reader, fields::PLAY_TIME)?
            .and_then(|raw| i32::try_from(raw).ok()))
    }

    /// Integer field outside the beatmap object; `None` unless it reads
    /// cleanly.
    fn game_int<R: ReadMemory + ?Sized>(&mut self, reader: &R, field: &str) -> Result<Option<i64>> {
        match self.read_field(reader, field) {
            Ok(value) => Ok(value.as_i64()),
            Err(e) if e.is_process_exited() => Err(ReadError::ProcessExited.into()),
            Err(e) => {
                debug!("{} unavailable: {}", field, e);
                Ok(None)
            }
        }
    }

    /// Absolute songs directory of the attached client, if it can be
    /// determined.
    pub fn songs_directory<R: ReadMemory + ?Sized>(&mut self, reader: &R) -> Result<Option<PathBuf>> {
        let configured = match self.read_field(reader, fields::SONGS_FOLDER) {
            Ok(value) => value.into_text(),
            Err(e) if e.is_process_exited() => return Err(ReadError::ProcessExited.into()),
            Err(e) => {
                debug!("Songs folder unavailable: {}", e);
                None
            }
        };
        Ok(configured.and_then(|folder| {
            songs_directory_for(&folder, self.executable_dir.as_deref())
        }))
    }

    fn forwarded_rating<R: ReadMemory + ?Sized>(
        &mut self,
        reader: &R,
        technical: &Technical,
        location: &Location,
    ) -> Result<StarRating> {
        if let Some((md5, cached)) = &self.rating_cache {
            if *md5 == technical.md5 {
                return Ok(*cached);
            }
        }

        let beatmap_path = self
            .songs_directory(reader)?
            .map(|songs| songs.join(&location.folder).join(&location.filename));
        let request = RatingRequest {
            md5: &technical.md5,
            beatmap_path: beatmap_path.as_deref(),
            mode: technical.mode,
        };
        let rating = self.ratings.star_rating(&request);
        debug!("Star rating for {}: {:?}", technical.md5, rating);

        self.rating_cache = Some((technical.md5.clone(), rating));
        Ok(rating)
    }

    fn locate<R: ReadMemory + ?Sized>(
        &mut self,
        reader: &R,
        locator: &Locator,
    ) -> std::result::Result<u64, FieldError> {
        match locator {
            Locator::Unsupported => Err(FieldError::Unsupported),
            Locator::Module { offsets } => Ok(resolve(reader, reader.base_address(), offsets)?),
            Locator::Chain { anchor, offsets } => {
                let entry = self
                    .table
                    .anchor(anchor)
                    .ok_or_else(|| FieldError::AnchorUnavailable(anchor.clone()))?;
                let base = self
                    .anchors
                    .locate(reader, &self.scanner, &entry.pattern)?
                    .ok_or_else(|| FieldError::AnchorUnavailable(anchor.clone()))?;
                Ok(resolve(reader, base, offsets)?)
            }
        }
    }

    fn read_field<R: ReadMemory + ?Sized>(
        &mut self,
        reader: &R,
        field: &str,
    ) -> std::result::Result<Value, FieldError> {
        let table = Arc::clone(&self.table);
        let entry = table.entry(field).ok_or(FieldError::MissingEntry)?;
        let address = self.locate(reader, &entry.locator)?;
        Ok(read_value(reader, address, &entry.value)?)
    }
}

/// Take a single snapshot with a fresh assembler.
pub fn snapshot<R: ReadMemory + ?Sized>(reader: &R, table: Arc<OffsetTable>) -> Result<BeatmapInfo> {
    BeatmapAssembler::new(table).snapshot(reader)
}

fn is_md5(text: &str) -> bool {
    text.len() == 32 && text.bytes().all(|b| b.is_ascii_hexdigit())
}

fn songs_directory_for(configured: &str, executable_dir: Option<&Path>) -> Option<PathBuf> {
    let configured = configured.trim();
    if configured.is_empty() || configured.eq_ignore_ascii_case(DEFAULT_SONGS_FOLDER) {
        return executable_dir.map(|dir| dir.join(DEFAULT_SONGS_FOLDER));
    }
    let path = Path::new(configured);
    if path.is_absolute() {
        return Some(path.to_path_buf());
    }
    executable_dir.map(|dir| dir.join(path))
}

/// One snapshot pass: reads fields and records the ones that fall back to
/// unknown.
struct Pass<'a, R: ?Sized> {
    assembler: &'a mut BeatmapAssembler,
    reader: &'a R,
    report: SnapshotReport,
}

impl<R: ReadMemory + ?Sized> Pass<'_, R> {
    fn critical_text(&mut self, field: &'static str) -> Result<String> {
        let cause = match self.assembler.read_field(self.reader, field) {
            Ok(Value::Text(text)) => return Ok(text),
            Ok(other) => FieldError::Invalid(format!("expected text, found {:?}", other)),
            Err(e) if e.is_process_exited() => return Err(ReadError::ProcessExited.into()),
            Err(e) => e,
        };
        Err(Error::Snapshot(SnapshotError::IncompleteState { field, cause }))
    }

    fn unknown(&mut self, field: &'static str, cause: FieldError) {
        if cause != FieldError::Unsupported {
            debug!("{} unknown: {}", field, cause);
        }
        self.report.unknown.push(UnknownField { field, cause });
    }

    fn value(&mut self, field: &'static str) -> Result<Option<Value>> {
        match self.assembler.read_field(self.reader, field) {
            Ok(value) => Ok(Some(value)),
            Err(e) if e.is_process_exited() => Err(ReadError::ProcessExited.into()),
            Err(e) => {
                self.unknown(field, e);
                Ok(None)
            }
        }
    }

    fn text(&mut self, field: &'static str) -> Result<Option<String>> {
        let Some(value) = self.value(field)? else {
            return Ok(None);
        };
        match value {
            Value::Text(text) => Ok(Some(text)),
            other => {
                self.unknown(field, FieldError::Invalid(format!("expected text, found {:?}", other)));
                Ok(None)
            }
        }
    }

    fn int(&mut self, field: &'static str) -> Result<Option<i64>> {
        let Some(value) = self.value(field)? else {
            return Ok(None);
        };
        match value.as_i64() {
            Some(v) => Ok(Some(v)),
            None => {
                self.unknown(field, FieldError::Invalid(format!("expected integer, found {:?}", value)));
                Ok(None)
            }
        }
    }

    fn signed(&mut self, field: &'static str) -> Result<Option<i32>> {
        let Some(v) = self.int(field)? else {
            return Ok(None);
        };
        match i32::try_from(v) {
            Ok(v) => Ok(Some(v)),
            Err(_) => {
                self.unknown(field, FieldError::Invalid(format!("{} out of range", v)));
                Ok(None)
            }
        }
    }

    /// Non-negative count; negative values are garbage left in memory.
    fn count(&mut self, field: &'static str) -> Result<Option<u32>> {
        let Some(v) = self.int(field)? else {
            return Ok(None);
        };
        match u32::try_from(v) {
            Ok(v) => Ok(Some(v)),
            Err(_) => {
                self.unknown(field, FieldError::Invalid(format!("{} is not a count", v)));
                Ok(None)
            }
        }
    }

    fn float(&mut self, field: &'static str) -> Result<Option<f32>> {
        let Some(value) = self.value(field)? else {
            return Ok(None);
        };
        match value.as_f32() {
            Some(v) if v.is_finite() => Ok(Some(v)),
            _ => {
                self.unknown(field, FieldError::Invalid(format!("expected float, found {:?}", value)));
                Ok(None)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    use super::*;
    use crate::decode::ValueKind;
    use crate::offset::builtin::{anchors, beatmap};
    use crate::offset::fixture::{SimulatedBeatmap, SimulatedStable};
    use crate::offset::{FieldEntry, stable_table};
    use crate::process::ProcessInfo;

    fn assembler() -> BeatmapAssembler {
        BeatmapAssembler::new(Arc::new(stable_table()))
    }

    #[test]
    fn test_snapshot_scenario() {
        let reader = SimulatedStable::new().build();
        let info = assembler().snapshot(&reader).unwrap();

        assert_eq!(info.location.folder, "songs/123");
        assert_eq!(info.location.filename, "map.osu");
        assert_eq!(info.stats.ar, Some(9.0));
        assert_eq!(info.stats.od, Some(8.5));
        assert_eq!(info.stats.cs, Some(4.0));
        assert_eq!(info.stats.hp, Some(6.0));
        assert_eq!(info.stats.object_count, Some(500));
        assert_eq!(info.stats.slider_count, Some(50));
        assert_eq!(info.technical.mode, GameMode::Standard);
        assert_eq!(info.technical.ranked_status, RankedStatus::Ranked);
        assert_eq!(info.technical.id, Some(129891));
        assert_eq!(info.metadata.author.as_deref(), Some("xi"));
        assert_eq!(info.location.cover.as_deref(), Some("bg.jpg"));
        assert_eq!(info.metadata.tags.as_deref(), Some("touhou beyond time"));
        assert_eq!(info.stats.drain_time_ms, Some(250_000));
    }

    #[test]
    fn test_table_without_optional_fields() {
        let mut table = stable_table();
        table.fields.remove(fields::TAGS);
        table.fields.remove(fields::DRAIN_TIME);
        let reader = SimulatedStable::new().build();
        let (info, report) = BeatmapAssembler::new(Arc::new(table))
            .snapshot_with_report(&reader)
            .unwrap();

        assert_eq!(info.metadata.tags, None);
        assert_eq!(info.stats.drain_time_ms, None);
        assert!(report.get(fields::TAGS).unwrap().is_unsupported());
        assert_eq!(report.failed().count(), 0);
    }

    #[test]
    fn test_menu_mods_and_play_time() {
        let reader = SimulatedStable::new()
            .menu_mods(0x48)
            .play_time_ms(-1200)
            .build();
        let mut assembler = assembler();

        assert_eq!(assembler.menu_mods(&reader).unwrap(), Some(0x48));
        assert_eq!(assembler.play_time_ms(&reader).unwrap(), Some(-1200));
    }

    #[test]
    fn test_menu_mods_without_anchor() {
        let reader = SimulatedStable::new()
            .without_anchor(anchors::MENU_MODS)
            .build();
        let mut assembler = assembler();

        assert_eq!(assembler.menu_mods(&reader).unwrap(), None);
        assert_eq!(assembler.play_time_ms(&reader).unwrap(), Some(0));

        reader.terminate();
        assert!(assembler.play_time_ms(&reader).unwrap_err().is_process_exited());
    }

    #[test]
    fn test_star_ratings_absent_without_source() {
        let reader = SimulatedStable::new().build();
        let (info, report) = assembler().snapshot_with_report(&reader).unwrap();

        assert!(info.stats.star_rating.is_empty());
        assert_eq!(report.unsupported().count(), 3);
        assert_eq!(report.failed().count(), 0);
    }

    #[test]
    fn test_null_cover_is_unknown() {
        let reader = SimulatedStable::new().null_field(fields::COVER).build();
        let (info, report) = assembler().snapshot_with_report(&reader).unwrap();

        assert_eq!(info.location.cover, None);
        let cover = report.get(fields::COVER).unwrap();
        assert!(!cover.is_unsupported());
    }

    #[test]
    fn test_no_beatmap_is_incomplete() {
        let reader = SimulatedStable::new().no_beatmap().build();
        let err = assembler().snapshot(&reader).unwrap_err();

        assert!(matches!(
            err,
            Error::Snapshot(SnapshotError::IncompleteState { field: fields::FOLDER, .. })
        ));
        assert!(!err.is_process_exited());
    }

    #[test]
    fn test_bad_md5_is_incomplete() {
        let map = SimulatedBeatmap {
            md5: "not-a-hash".to_string(),
            ..Default::default()
        };
        let reader = SimulatedStable::new().beatmap(map).build();
        let err = assembler().snapshot(&reader).unwrap_err();

        assert!(matches!(
            err,
            Error::Snapshot(SnapshotError::IncompleteState { field: fields::MD5, .. })
        ));
    }

    #[test]
    fn test_unknown_enum_values() {
        let map = SimulatedBeatmap {
            mode: 9,
            ranked_status: -4,
            object_count: -1,
            ..Default::default()
        };
        let reader = SimulatedStable::new().beatmap(map).build();
        let (info, report) = assembler().snapshot_with_report(&reader).unwrap();

        assert_eq!(info.technical.mode, GameMode::Unknown);
        assert_eq!(info.technical.ranked_status, RankedStatus::Unknown);
        assert_eq!(info.stats.object_count, None);
        assert!(report.get(fields::OBJECT_COUNT).is_some());
    }

    #[test]
    fn test_process_exit() {
        let reader = SimulatedStable::new().build();
        reader.terminate();
        let err = assembler().snapshot(&reader).unwrap_err();

        assert!(err.is_process_exited());
    }

    #[test]
    fn test_module_locator() {
        let mut table = stable_table();
        table.fields.insert(
            fields::FOLDER.to_string(),
            FieldEntry {
                locator: Locator::Module {
                    offsets: vec![0x400, beatmap::FOLDER],
                },
                value: ValueKind::ManagedString,
            },
        );
        let reader = SimulatedStable::new().build();
        let info = snapshot(&reader, Arc::new(table)).unwrap();

        assert_eq!(info.location.folder, "songs/123");
    }

    #[test]
    fn test_game_state() {
        let reader = SimulatedStable::new().status(2).build();
        assert_eq!(assembler().game_state(&reader).unwrap(), GameState::Playing);

        let reader = SimulatedStable::new().status(3).build();
        assert_eq!(assembler().game_state(&reader).unwrap(), GameState::Unknown);
    }

    #[test]
    fn test_status_found_once_code_is_loaded() {
        let mut assembler = assembler()
            .with_anchors(AnchorCache::new().with_rescan_after(Duration::ZERO));

        let loading = SimulatedStable::new()
            .status(2)
            .without_anchor(anchors::STATUS)
            .build();
        assert_eq!(assembler.game_state(&loading).unwrap(), GameState::Unknown);

        let loaded = SimulatedStable::new().status(2).build();
        assert_eq!(assembler.game_state(&loaded).unwrap(), GameState::Playing);
    }

    #[test]
    fn test_missing_status_anchor_is_remembered() {
        let mut assembler = assembler();
        let loading = SimulatedStable::new().without_anchor(anchors::STATUS).build();
        assert_eq!(assembler.game_state(&loading).unwrap(), GameState::Unknown);

        // Within the rescan interval the miss is served from the cache.
        let loaded = SimulatedStable::new().status(2).build();
        assert_eq!(assembler.game_state(&loaded).unwrap(), GameState::Unknown);
    }

    #[test]
    fn test_songs_directory_default() {
        let reader = SimulatedStable::new()
            .executable_dir("/games/osu")
            .build();
        let mut assembler = assembler();
        assembler.reset_for(reader.target());

        assert_eq!(
            assembler.songs_directory(&reader).unwrap(),
            Some(PathBuf::from("/games/osu/Songs"))
        );
    }

    #[test]
    fn test_songs_directory_without_executable_dir() {
        let reader = SimulatedStable::new().build();
        assert_eq!(assembler().songs_directory(&reader).unwrap(), None);
    }

    #[test]
    fn test_songs_directory_for() {
        let exe = Some(Path::new("/games/osu"));
        assert_eq!(
            songs_directory_for("songs", exe),
            Some(PathBuf::from("/games/osu/Songs"))
        );
        assert_eq!(
            songs_directory_for("/mnt/maps", exe),
            Some(PathBuf::from("/mnt/maps"))
        );
        assert_eq!(
            songs_directory_for("Extra", exe),
            Some(PathBuf::from("/games/osu/Extra"))
        );
        assert_eq!(songs_directory_for("Extra", None), None);
    }

    #[test]
    fn test_rating_source_called_once_per_beatmap() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);
        let source = move |request: &RatingRequest<'_>| {
            counter.fetch_add(1, Ordering::SeqCst);
            assert_eq!(
                request.beatmap_path,
                Some(Path::new("/games/osu/Songs/songs/123/map.osu"))
            );
            StarRating {
                no_mod: Some(7.1),
                double_time: Some(10.2),
                half_time: None,
            }
        };

        let reader = SimulatedStable::new()
            .executable_dir("/games/osu")
            .build();
        let mut assembler = assembler().with_ratings(Arc::new(source));
        assembler.reset_for(reader.target());

        let first = assembler.snapshot(&reader).unwrap();
        let second = assembler.snapshot(&reader).unwrap();

        assert_eq!(first.stats.star_rating.no_mod, Some(7.1));
        assert_eq!(first.stats.star_rating.half_time, None);
        assert_eq!(first, second);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_is_md5() {
        assert!(is_md5("da8aae79c8f3306b5d65ec951874a7fb"));
        assert!(!is_md5("da8aae79c8f3306b5d65ec951874a7f"));
        assert!(!is_md5("za8aae79c8f3306b5d65ec951874a7fb"));
    }
}
