//! Built-in offset table for the stable client.

use std::collections::BTreeMap;

use crate::decode::{FieldSpec, Scalar, ValueKind};
use crate::process::PointerWidth;
use crate::scan::Signature;

use super::table::{AnchorEntry, FieldEntry, OffsetTable, fields};

pub const FAMILY: &str = "stable";

/// Anchor signatures.
pub mod anchors {
    pub const BASE: &str = "base";
    pub const BASE_PATTERN: [u8; 6] = [0xF8, 0x01, 0x74, 0x04, 0x83, 0x65];

    pub const STATUS: &str = "status";
    pub const STATUS_PATTERN: [u8; 6] = [0x48, 0x83, 0xF8, 0x04, 0x73, 0x1E];

    pub const SETTINGS: &str = "settings";
    pub const SETTINGS_PATTERN: [u8; 7] = [0x83, 0xE0, 0x20, 0x85, 0xC0, 0x7E, 0x2F];

    const W: Option<u8> = None;
    const fn b(byte: u8) -> Option<u8> {
        Some(byte)
    }

    /// `C8 FF ?? ?? ?? ?? ?? 81 0D ?? ?? ?? ?? 00 08 00 00`
    pub const MENU_MODS: &str = "menu_mods";
    pub const MENU_MODS_PATTERN: [Option<u8>; 17] = [
        b(0xC8), b(0xFF), W, W, W, W, W, b(0x81), b(0x0D), W, W, W, W,
        b(0x00), b(0x08), b(0x00), b(0x00),
    ];

    /// `5E 5F 5D C3 A1 ?? ?? ?? ?? 89 ?? 04`
    pub const PLAY_TIME: &str = "play_time";
    pub const PLAY_TIME_PATTERN: [Option<u8>; 12] = [
        b(0x5E), b(0x5F), b(0x5D), b(0xC3), b(0xA1), W, W, W, W, b(0x89), W, b(0x04),
    ];
}

/// Chain from the base anchor to the current beatmap object.
pub const BEATMAP_CHAIN: [i64; 2] = [-0xC, 0x0];
/// Chain from the status anchor to the game status word.
pub const STATUS_CHAIN: [i64; 2] = [-0x4, 0x0];
/// Chain from the settings anchor to the songs folder string reference.
pub const SONGS_FOLDER_CHAIN: [i64; 3] = [0x8, 0xB8, 0x4];
/// Chain from the menu mods anchor to the selected mods bitmask.
pub const MENU_MODS_CHAIN: [i64; 2] = [0x9, 0x0];
/// Chain from the play time anchor to the audio position in milliseconds.
pub const PLAY_TIME_CHAIN: [i64; 2] = [0x5, 0x0];

/// Field offsets inside the beatmap object.
pub mod beatmap {
    pub const AUTHOR: i64 = 0x18;
    pub const TAGS: i64 = 0x20;
    pub const TITLE: i64 = 0x24;
    pub const TITLE_ORIGINAL: i64 = 0x28;
    pub const DIFFICULTY_RECORD: i64 = 0x2C;
    pub const AUDIO: i64 = 0x64;
    pub const COVER: i64 = 0x68;
    pub const MD5: i64 = 0x6C;
    pub const FOLDER: i64 = 0x78;
    pub const CREATOR: i64 = 0x7C;
    pub const FILENAME: i64 = 0x90;
    pub const DIFFICULTY_NAME: i64 = 0xAC;
    pub const ID: i64 = 0xC8;
    pub const SET_ID: i64 = 0xCC;
    pub const OBJECT_COUNT: i64 = 0xF8;
    pub const SLIDER_COUNT: i64 = 0xFC;
    pub const MODE: i64 = 0x11C;
    pub const RANKED_STATUS: i64 = 0x12C;
    pub const TOTAL_LENGTH: i64 = 0x130;
    pub const DRAIN_TIME: i64 = 0x134;
}

fn difficulty_layout() -> Vec<FieldSpec> {
    vec![
        FieldSpec::new("ar", 0x0, Scalar::F32),
        FieldSpec::new("cs", 0x4, Scalar::F32),
        FieldSpec::new("hp", 0x8, Scalar::F32),
        FieldSpec::new("od", 0xC, Scalar::F32),
    ]
}

fn signature(pattern: &[u8]) -> Signature {
    Signature::exact(pattern)
}

fn beatmap_field(offset: i64, value: ValueKind) -> FieldEntry {
    let [first, second] = BEATMAP_CHAIN;
    FieldEntry::chain(anchors::BASE, &[first, second, offset], value)
}

/// Offset table for the 32-bit stable client.
pub fn stable_table() -> OffsetTable {
    use beatmap as b;

    let string_fields = [
        (fields::AUTHOR, b::AUTHOR),
        (fields::CREATOR, b::CREATOR),
        (fields::TITLE, b::TITLE),
        (fields::TITLE_ORIGINAL, b::TITLE_ORIGINAL),
        (fields::DIFFICULTY_NAME, b::DIFFICULTY_NAME),
        (fields::MD5, b::MD5),
        (fields::FOLDER, b::FOLDER),
        (fields::FILENAME, b::FILENAME),
        (fields::AUDIO, b::AUDIO),
        (fields::COVER, b::COVER),
        (fields::TAGS, b::TAGS),
    ];
    let int_fields = [
        (fields::TOTAL_LENGTH, b::TOTAL_LENGTH),
        (fields::DRAIN_TIME, b::DRAIN_TIME),
        (fields::OBJECT_COUNT, b::OBJECT_COUNT),
        (fields::SLIDER_COUNT, b::SLIDER_COUNT),
        (fields::ID, b::ID),
        (fields::SET_ID, b::SET_ID),
        (fields::MODE, b::MODE),
        (fields::RANKED_STATUS, b::RANKED_STATUS),
    ];

    let mut table_fields = BTreeMap::new();
    for (name, offset) in string_fields {
        table_fields.insert(
            name.to_string(),
            beatmap_field(offset, ValueKind::ManagedString),
        );
    }
    for (name, offset) in int_fields {
        table_fields.insert(name.to_string(), beatmap_field(offset, ValueKind::I32));
    }
    table_fields.insert(
        fields::DIFFICULTY_RECORD.to_string(),
        beatmap_field(
            b::DIFFICULTY_RECORD,
            ValueKind::Record {
                fields: difficulty_layout(),
            },
        ),
    );
    // Star ratings are computed lazily by the client and not kept on the
    // beatmap object; they come from a rating source instead.
    for name in [fields::STARS_NOMOD, fields::STARS_DT, fields::STARS_HT] {
        table_fields.insert(name.to_string(), FieldEntry::unsupported(ValueKind::F32));
    }

    table_fields.insert(
        fields::GAME_STATUS.to_string(),
        FieldEntry::chain(anchors::STATUS, &STATUS_CHAIN, ValueKind::U32),
    );
    table_fields.insert(
        fields::SONGS_FOLDER.to_string(),
        FieldEntry::chain(
            anchors::SETTINGS,
            &SONGS_FOLDER_CHAIN,
            ValueKind::ManagedString,
        ),
    );
    table_fields.insert(
        fields::MENU_MODS.to_string(),
        FieldEntry::chain(anchors::MENU_MODS, &MENU_MODS_CHAIN, ValueKind::U32),
    );
    table_fields.insert(
        fields::PLAY_TIME.to_string(),
        FieldEntry::chain(anchors::PLAY_TIME, &PLAY_TIME_CHAIN, ValueKind::I32),
    );

    OffsetTable {
        family: FAMILY.to_string(),
        pointer_width: PointerWidth::Bits32,
        version_signature: signature(&anchors::BASE_PATTERN),
        anchors: vec![
            AnchorEntry {
                name: anchors::BASE.to_string(),
                pattern: signature(&anchors::BASE_PATTERN),
            },
            AnchorEntry {
                name: anchors::STATUS.to_string(),
                pattern: signature(&anchors::STATUS_PATTERN),
            },
            AnchorEntry {
                name: anchors::SETTINGS.to_string(),
                pattern: signature(&anchors::SETTINGS_PATTERN),
            },
            AnchorEntry {
                name: anchors::MENU_MODS.to_string(),
                pattern: Signature::masked(&anchors::MENU_MODS_PATTERN),
            },
            AnchorEntry {
                name: anchors::PLAY_TIME.to_string(),
                pattern: Signature::masked(&anchors::PLAY_TIME_PATTERN),
            },
        ],
        fields: table_fields,
    }
}
