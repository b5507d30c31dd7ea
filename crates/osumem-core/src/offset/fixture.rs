//! Simulated process image laid out like the stable client.
//!
//! Used by tests to exercise scanning, pointer chains and decoding against
//! the built-in table without a running game.

use std::collections::BTreeSet;
use std::path::PathBuf;

use crate::process::{MockMemoryBuilder, MockMemoryReader};

use super::builtin::{anchors, beatmap};
use super::table::fields;

const IMAGE_SIZE: usize = 0x4000;

const BASE_ANCHOR: usize = 0x100;
const BEATMAP_SLOT: usize = 0x400;
const STATUS_ANCHOR: usize = 0x200;
const STATUS_WORD: usize = 0x480;
const SETTINGS_ANCHOR: usize = 0x300;
const SETTINGS_OBJECT: usize = 0x500;
const SETTINGS_INNER: usize = 0x600;
const MENU_MODS_ANCHOR: usize = 0x700;
const MODS_WORD: usize = 0x780;
const PLAY_TIME_ANCHOR: usize = 0x800;
const PLAY_TIME_WORD: usize = 0x880;
const BEATMAP_OBJECT: usize = 0x1000;
const STRING_HEAP: usize = 0x2000;

/// Beatmap state written into the simulated image.
#[derive(Debug, Clone, PartialEq)]
pub struct SimulatedBeatmap {
    pub author: String,
    pub creator: String,
    pub title: String,
    pub title_original: String,
    pub difficulty: String,
    pub md5: String,
    pub folder: String,
    pub filename: String,
    pub audio: String,
    pub cover: String,
    pub tags: String,
    pub ar: f32,
    pub cs: f32,
    pub hp: f32,
    pub od: f32,
    pub id: i32,
    pub set_id: i32,
    pub mode: i32,
    pub ranked_status: i32,
    pub object_count: i32,
    pub slider_count: i32,
    pub total_length_ms: i32,
    pub drain_time_ms: i32,
}

impl Default for SimulatedBeatmap {
    fn default() -> Self {
        Self {
            author: "xi".to_string(),
            creator: "Nakagawa-Kanon".to_string(),
            title: "FREEDOM DiVE".to_string(),
            title_original: "FREEDOM DiVE".to_string(),
            difficulty: "FOUR DIMENSIONS".to_string(),
            md5: "da8aae79c8f3306b5d65ec951874a7fb".to_string(),
            folder: "songs/123".to_string(),
            filename: "map.osu".to_string(),
            audio: "audio.mp3".to_string(),
            cover: "bg.jpg".to_string(),
            tags: "touhou beyond time".to_string(),
            ar: 9.0,
            cs: 4.0,
            hp: 6.0,
            od: 8.5,
            id: 129891,
            set_id: 39804,
            mode: 0,
            ranked_status: 4,
            object_count: 500,
            slider_count: 50,
            total_length_ms: 257_000,
            drain_time_ms: 250_000,
        }
    }
}

/// Builder for a simulated stable client image.
#[derive(Debug, Clone)]
pub struct SimulatedStable {
    pub beatmap: Option<SimulatedBeatmap>,
    pub status: u32,
    pub menu_mods: u32,
    pub play_time_ms: i32,
    pub songs_folder: Option<String>,
    pub pid: u32,
    pub executable_dir: Option<PathBuf>,
    /// Beatmap fields whose string reference is left null.
    pub null_fields: BTreeSet<&'static str>,
    /// Anchors whose code bytes are not in the image yet.
    pub missing_anchors: BTreeSet<&'static str>,
}

impl Default for SimulatedStable {
    fn default() -> Self {
        Self {
            beatmap: Some(SimulatedBeatmap::default()),
            status: 5,
            menu_mods: 0,
            play_time_ms: 0,
            songs_folder: Some("Songs".to_string()),
            pid: 4242,
            executable_dir: None,
            null_fields: BTreeSet::new(),
            missing_anchors: BTreeSet::new(),
        }
    }
}

impl SimulatedStable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn beatmap(mut self, beatmap: SimulatedBeatmap) -> Self {
        self.beatmap = Some(beatmap);
        self
    }

    /// No beatmap loaded: the beatmap slot holds a null pointer.
    pub fn no_beatmap(mut self) -> Self {
        self.beatmap = None;
        self
    }

    pub fn status(mut self, status: u32) -> Self {
        self.status = status;
        self
    }

    pub fn menu_mods(mut self, mods: u32) -> Self {
        self.menu_mods = mods;
        self
    }

    pub fn play_time_ms(mut self, time: i32) -> Self {
        self.play_time_ms = time;
        self
    }

    pub fn songs_folder(mut self, folder: Option<&str>) -> Self {
        self.songs_folder = folder.map(str::to_string);
        self
    }

    pub fn pid(mut self, pid: u32) -> Self {
        self.pid = pid;
        self
    }

    pub fn executable_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.executable_dir = Some(dir.into());
        self
    }

    /// Leave the string reference of `field` null.
    pub fn null_field(mut self, field: &'static str) -> Self {
        self.null_fields.insert(field);
        self
    }

    /// Leave out the signature bytes of anchor `name`.
    pub fn without_anchor(mut self, name: &'static str) -> Self {
        self.missing_anchors.insert(name);
        self
    }

    pub fn build(&self) -> MockMemoryReader {
        let mut heap = StringHeap {
            builder: MockMemoryBuilder::new()
                .with_size(IMAGE_SIZE)
                .pid(self.pid),
            next: STRING_HEAP,
        };
        if let Some(dir) = &self.executable_dir {
            heap.builder = heap.builder.executable_dir(dir.clone());
        }

        // Code first: wildcard bytes are zero until the operand pointers
        // below are written over them.
        let code = [
            (anchors::BASE, BASE_ANCHOR, concrete(&anchors::BASE_PATTERN)),
            (anchors::STATUS, STATUS_ANCHOR, concrete(&anchors::STATUS_PATTERN)),
            (anchors::SETTINGS, SETTINGS_ANCHOR, concrete(&anchors::SETTINGS_PATTERN)),
            (anchors::MENU_MODS, MENU_MODS_ANCHOR, instance(&anchors::MENU_MODS_PATTERN)),
            (anchors::PLAY_TIME, PLAY_TIME_ANCHOR, instance(&anchors::PLAY_TIME_PATTERN)),
        ];
        for (name, at, bytes) in code {
            if !self.missing_anchors.contains(name) {
                heap.builder = std::mem::take(&mut heap.builder).write_bytes(at, &bytes);
            }
        }

        // The base anchor: a pointer to the beatmap slot sits 0xC bytes
        // before the signature.
        heap.builder = std::mem::take(&mut heap.builder)
            .write_ptr32(BASE_ANCHOR - 0xC, BEATMAP_SLOT)
            .write_ptr32(STATUS_ANCHOR - 0x4, STATUS_WORD)
            .write_u32(STATUS_WORD, self.status)
            .write_ptr32(SETTINGS_ANCHOR + 0x8, SETTINGS_OBJECT)
            .write_ptr32(SETTINGS_OBJECT + 0xB8, SETTINGS_INNER)
            .write_ptr32(MENU_MODS_ANCHOR + 0x9, MODS_WORD)
            .write_u32(MODS_WORD, self.menu_mods)
            .write_ptr32(PLAY_TIME_ANCHOR + 0x5, PLAY_TIME_WORD)
            .write_i32(PLAY_TIME_WORD, self.play_time_ms);

        if let Some(folder) = &self.songs_folder {
            heap.string_ref(SETTINGS_INNER + 0x4, folder);
        }

        if let Some(map) = &self.beatmap {
            heap.builder = heap.builder.write_ptr32(BEATMAP_SLOT, BEATMAP_OBJECT);
            self.write_beatmap(&mut heap, map);
        }

        heap.builder.build()
    }

    fn write_beatmap(&self, heap: &mut StringHeap, map: &SimulatedBeatmap) {
        let at = |offset: i64| BEATMAP_OBJECT + offset as usize;

        let strings = [
            (fields::AUTHOR, beatmap::AUTHOR, &map.author),
            (fields::CREATOR, beatmap::CREATOR, &map.creator),
            (fields::TITLE, beatmap::TITLE, &map.title),
            (fields::TITLE_ORIGINAL, beatmap::TITLE_ORIGINAL, &map.title_original),
            (fields::DIFFICULTY_NAME, beatmap::DIFFICULTY_NAME, &map.difficulty),
            (fields::MD5, beatmap::MD5, &map.md5),
            (fields::FOLDER, beatmap::FOLDER, &map.folder),
            (fields::FILENAME, beatmap::FILENAME, &map.filename),
            (fields::AUDIO, beatmap::AUDIO, &map.audio),
            (fields::COVER, beatmap::COVER, &map.cover),
            (fields::TAGS, beatmap::TAGS, &map.tags),
        ];
        for (name, offset, text) in strings {
            if !self.null_fields.contains(name) {
                heap.string_ref(at(offset), text);
            }
        }

        let record = at(beatmap::DIFFICULTY_RECORD);
        let builder = std::mem::take(&mut heap.builder);
        heap.builder = builder
            .write_f32(record, map.ar)
            .write_f32(record + 0x4, map.cs)
            .write_f32(record + 0x8, map.hp)
            .write_f32(record + 0xC, map.od)
            .write_i32(at(beatmap::ID), map.id)
            .write_i32(at(beatmap::SET_ID), map.set_id)
            .write_i32(at(beatmap::OBJECT_COUNT), map.object_count)
            .write_i32(at(beatmap::SLIDER_COUNT), map.slider_count)
            .write_i32(at(beatmap::MODE), map.mode)
            .write_i32(at(beatmap::RANKED_STATUS), map.ranked_status)
            .write_i32(at(beatmap::TOTAL_LENGTH), map.total_length_ms)
            .write_i32(at(beatmap::DRAIN_TIME), map.drain_time_ms);
    }
}

fn concrete(pattern: &[u8]) -> Vec<u8> {
    pattern.to_vec()
}

/// Code bytes matching `pattern`, wildcards zeroed.
fn instance(pattern: &[Option<u8>]) -> Vec<u8> {
    pattern.iter().map(|b| b.unwrap_or(0)).collect()
}

/// Bump allocator for managed string objects in the simulated image.
struct StringHeap {
    builder: MockMemoryBuilder,
    next: usize,
}

impl StringHeap {
    /// Allocate `text` and store a reference to it at `field`.
    fn string_ref(&mut self, field: usize, text: &str) {
        let object = self.next;
        let units = text.encode_utf16().count();
        // Header word, length, characters; keep objects 4-byte aligned.
        self.next = (object + 8 + units * 2 + 3) & !3;

        let builder = std::mem::take(&mut self.builder);
        self.builder = builder
            .write_managed_string(object, text)
            .write_ptr32(field, object);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decode::read_managed_string_ref;
    use crate::pointer::resolve;
    use crate::process::ReadMemory;

    #[test]
    fn test_beatmap_chain_reaches_object() {
        let reader = SimulatedStable::new().build();
        let anchor = 0x1000 + BASE_ANCHOR as u64;

        let folder = resolve(&reader, anchor, &[-0xC, 0x0, beatmap::FOLDER]).unwrap();
        assert_eq!(folder, 0x1000 + (BEATMAP_OBJECT as i64 + beatmap::FOLDER) as u64);
        assert_eq!(read_managed_string_ref(&reader, folder).unwrap(), "songs/123");
    }

    #[test]
    fn test_status_word() {
        let reader = SimulatedStable::new().status(2).build();
        let anchor = 0x1000 + STATUS_ANCHOR as u64;

        let status = resolve(&reader, anchor, &[-0x4, 0x0]).unwrap();
        assert_eq!(reader.read_u32(status).unwrap(), 2);
    }

    #[test]
    fn test_songs_folder_chain() {
        let reader = SimulatedStable::new().build();
        let anchor = 0x1000 + SETTINGS_ANCHOR as u64;

        let field = resolve(&reader, anchor, &[0x8, 0xB8, 0x4]).unwrap();
        assert_eq!(read_managed_string_ref(&reader, field).unwrap(), "Songs");
    }

    #[test]
    fn test_menu_mods_chain() {
        let reader = SimulatedStable::new().menu_mods(0x18).build();
        let anchor = 0x1000 + MENU_MODS_ANCHOR as u64;

        let mods = resolve(&reader, anchor, &[0x9, 0x0]).unwrap();
        assert_eq!(reader.read_u32(mods).unwrap(), 0x18);
    }

    #[test]
    fn test_null_field() {
        let reader = SimulatedStable::new().null_field(fields::COVER).build();
        let anchor = 0x1000 + BASE_ANCHOR as u64;

        let cover = resolve(&reader, anchor, &[-0xC, 0x0, beatmap::COVER]).unwrap();
        assert!(read_managed_string_ref(&reader, cover).is_err());
    }

    #[test]
    fn test_no_beatmap() {
        let reader = SimulatedStable::new().no_beatmap().build();
        let anchor = 0x1000 + BASE_ANCHOR as u64;

        assert!(resolve(&reader, anchor, &[-0xC, 0x0, beatmap::FOLDER]).is_err());
    }

    #[test]
    fn test_image_fits_strings() {
        let reader = SimulatedStable::new().build();
        assert_eq!(reader.len(), IMAGE_SIZE);
    }
}
