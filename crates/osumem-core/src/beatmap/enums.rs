use serde::{Deserialize, Serialize};
use strum::{Display, FromRepr, IntoStaticStr};

#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Default,
    Serialize,
    Deserialize,
    FromRepr,
    IntoStaticStr,
    Display,
)]
#[repr(i32)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum GameMode {
    Standard = 0,
    Taiko = 1,
    Catch = 2,
    Mania = 3,
    #[default]
    Unknown = -1,
}

impl GameMode {
    /// Map the raw value stored by the game. Unrecognized values map to
    /// `Unknown`.
    pub fn from_raw(value: i32) -> Self {
        Self::from_repr(value).unwrap_or(Self::Unknown)
    }

    pub fn as_str(&self) -> &'static str {
        self.into()
    }
}

#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Default,
    Serialize,
    Deserialize,
    FromRepr,
    IntoStaticStr,
    Display,
)]
#[repr(i32)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum RankedStatus {
    #[default]
    Unknown = 0,
    Unsubmitted = 1,
    /// Pending, work in progress or graveyard.
    Unranked = 2,
    Unused = 3,
    Ranked = 4,
    Approved = 5,
    Qualified = 6,
    Loved = 7,
}

impl RankedStatus {
    pub fn from_raw(value: i32) -> Self {
        Self::from_repr(value).unwrap_or(Self::Unknown)
    }

    pub fn as_str(&self) -> &'static str {
        self.into()
    }
}

/// The screen the game is currently showing.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Default,
    Serialize,
    Deserialize,
    FromRepr,
    IntoStaticStr,
    Display,
)]
#[repr(u32)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum GameState {
    PreSongSelect = 0,
    Playing = 2,
    EditorSongSelect = 4,
    SongSelect = 5,
    ResultScreen = 7,
    MultiplayerLobbySelect = 11,
    MultiplayerLobby = 12,
    MultiplayerResultScreen = 14,
    #[default]
    Unknown = 0xFFFF_FFFF,
}

impl GameState {
    pub fn from_raw(value: u32) -> Self {
        Self::from_repr(value).unwrap_or(Self::Unknown)
    }

    pub fn as_str(&self) -> &'static str {
        self.into()
    }
}
