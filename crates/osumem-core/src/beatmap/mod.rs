//! Beatmap snapshot types and assembly.
//!
//! This module contains:
//! - `BeatmapInfo` - the immutable snapshot handed to callers
//! - `GameMode`, `RankedStatus`, `GameState` - enumerations decoded from raw integers
//! - `BeatmapAssembler` - reads one snapshot through an offset table
//! - `RatingSource` - hand-off for star ratings the game does not expose
//! - `SnapshotRecord` - a published snapshot with its provenance

mod assembler;
mod enums;
mod info;
mod rating;
mod state;

pub use assembler::{BeatmapAssembler, SnapshotReport, UnknownField, snapshot};
pub use enums::{GameMode, GameState, RankedStatus};
pub use info::{BeatmapInfo, BeatmapPaths, Location, Metadata, StarRating, Stats, Technical};
pub use rating::{NoRatings, RatingRequest, RatingSource};
pub use state::SnapshotRecord;
