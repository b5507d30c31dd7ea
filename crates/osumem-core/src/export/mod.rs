//! Human-readable rendering of snapshots.

mod console;

pub use console::{format_beatmap_console, format_beatmap_summary, format_game_state};
