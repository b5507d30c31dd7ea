use std::collections::{BTreeMap, HashSet};

use serde::{Deserialize, Serialize};

use crate::decode::ValueKind;
use crate::error::{Error, Result};
use crate::process::PointerWidth;
use crate::scan::Signature;

/// Logical field names understood by the beatmap assembler.
pub mod fields {
    pub const AUTHOR: &str = "beatmap.author";
    pub const CREATOR: &str = "beatmap.creator";
    pub const TITLE: &str = "beatmap.title";
    pub const TITLE_ORIGINAL: &str = "beatmap.title_original";
    pub const DIFFICULTY_NAME: &str = "beatmap.difficulty_name";
    /// Packed record holding `ar`, `cs`, `hp` and `od`.
    pub const DIFFICULTY_RECORD: &str = "beatmap.difficulty_record";
    pub const TOTAL_LENGTH: &str = "beatmap.total_length";
    pub const OBJECT_COUNT: &str = "beatmap.object_count";
    pub const SLIDER_COUNT: &str = "beatmap.slider_count";
    pub const STARS_NOMOD: &str = "beatmap.stars_nomod";
    pub const STARS_DT: &str = "beatmap.stars_dt";
    pub const STARS_HT: &str = "beatmap.stars_ht";
    pub const MD5: &str = "beatmap.md5";
    pub const ID: &str = "beatmap.id";
    pub const SET_ID: &str = "beatmap.set_id";
    pub const MODE: &str = "beatmap.mode";
    pub const RANKED_STATUS: &str = "beatmap.ranked_status";
    pub const FOLDER: &str = "beatmap.folder";
    pub const FILENAME: &str = "beatmap.filename";
    pub const AUDIO: &str = "beatmap.audio";
    pub const COVER: &str = "beatmap.cover";

    pub const GAME_STATUS: &str = "game.status";
    pub const SONGS_FOLDER: &str = "settings.songs_folder";

    // Optional: a table without an entry reports them unknown.
    pub const TAGS: &str = "beatmap.tags";
    pub const DRAIN_TIME: &str = "beatmap.drain_time";
    pub const MENU_MODS: &str = "game.menu_mods";
    pub const PLAY_TIME: &str = "game.play_time";

    /// Fields every table must locate or mark unsupported.
    pub const REQUIRED: [&str; 21] = [
        AUTHOR,
        CREATOR,
        TITLE,
        TITLE_ORIGINAL,
        DIFFICULTY_NAME,
        DIFFICULTY_RECORD,
        TOTAL_LENGTH,
        OBJECT_COUNT,
        SLIDER_COUNT,
        STARS_NOMOD,
        STARS_DT,
        STARS_HT,
        MD5,
        ID,
        SET_ID,
        MODE,
        RANKED_STATUS,
        FOLDER,
        FILENAME,
        AUDIO,
        COVER,
    ];

    /// Members of the difficulty record.
    pub const DIFFICULTY_MEMBERS: [&str; 4] = ["ar", "cs", "hp", "od"];
}

/// A named signature whose first match anchors pointer chains.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnchorEntry {
    pub name: String,
    pub pattern: Signature,
}

/// Where a field lives.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Locator {
    /// Pointer chain starting at the address of a signature match.
    Chain { anchor: String, offsets: Vec<i64> },
    /// Pointer chain starting at the main module base address.
    Module { offsets: Vec<i64> },
    /// The game version this table describes does not expose the field.
    Unsupported,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldEntry {
    pub locator: Locator,
    pub value: ValueKind,
}

impl FieldEntry {
    pub fn chain(anchor: &str, offsets: &[i64], value: ValueKind) -> Self {
        Self {
            locator: Locator::Chain {
                anchor: anchor.to_string(),
                offsets: offsets.to_vec(),
            },
            value,
        }
    }

    pub fn unsupported(value: ValueKind) -> Self {
        Self {
            locator: Locator::Unsupported,
            value,
        }
    }

    pub fn is_supported(&self) -> bool {
        self.locator != Locator::Unsupported
    }
}

/// Field locations for one family of game versions.
///
/// A table is selected when its `version_signature` is found in the target.
/// Tables are immutable once loaded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OffsetTable {
    pub family: String,
    pub pointer_width: PointerWidth,
    pub version_signature: Signature,
    pub anchors: Vec<AnchorEntry>,
    pub fields: BTreeMap<String, FieldEntry>,
}

impl OffsetTable {
    pub fn entry(&self, field: &str) -> Option<&FieldEntry> {
        self.fields.get(field)
    }

    pub fn anchor(&self, name: &str) -> Option<&AnchorEntry> {
        self.anchors.iter().find(|a| a.name == name)
    }

    /// Check that every required field has a locator (or is marked
    /// unsupported) and that every chain refers to a declared anchor.
    pub fn validate(&self) -> Result<()> {
        if self.family.trim().is_empty() {
            return Err(Error::invalid_table("table family must not be empty"));
        }

        let mut names = HashSet::new();
        for anchor in &self.anchors {
            if !names.insert(anchor.name.as_str()) {
                return Err(Error::invalid_table(format!(
                    "{}: duplicate anchor '{}'",
                    self.family, anchor.name
                )));
            }
        }

        for field in fields::REQUIRED {
            if !self.fields.contains_key(field) {
                return Err(Error::invalid_table(format!(
                    "{}: missing entry for required field '{}'",
                    self.family, field
                )));
            }
        }

        for (name, entry) in &self.fields {
            if let Locator::Chain { anchor, .. } = &entry.locator {
                if self.anchor(anchor).is_none() {
                    return Err(Error::invalid_table(format!(
                        "{}: field '{}' refers to unknown anchor '{}'",
                        self.family, name, anchor
                    )));
                }
            }
            if let ValueKind::Record { fields: layout } = &entry.value {
                if let Some(spec) = layout.iter().find(|spec| spec.end().is_none()) {
                    return Err(Error::invalid_table(format!(
                        "{}: member '{}' of '{}' has an out-of-range offset {:#x}",
                        self.family, spec.name, name, spec.offset
                    )));
                }
            }
        }

        if let Some(entry) = self.entry(fields::DIFFICULTY_RECORD) {
            if entry.is_supported() {
                let ValueKind::Record { fields: layout } = &entry.value else {
                    return Err(Error::invalid_table(format!(
                        "{}: '{}' must be a record",
                        self.family,
                        fields::DIFFICULTY_RECORD
                    )));
                };
                for member in fields::DIFFICULTY_MEMBERS {
                    if !layout.iter().any(|spec| spec.name == member) {
                        return Err(Error::invalid_table(format!(
                            "{}: difficulty record has no '{}' member",
                            self.family, member
                        )));
                    }
                }
            }
        }

        Ok(())
    }
}
