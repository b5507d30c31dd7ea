//! Console output formatting with colored display

use std::fmt::Write as _;

use owo_colors::OwoColorize;

use crate::beatmap::{BeatmapInfo, GameMode, GameState, RankedStatus, StarRating};

const BORDER_WIDTH: usize = 50;

/// Format a beatmap for console display with colored output
///
/// Returns a multi-line string with a boxed format. Unknown values are shown
/// as `-`.
pub fn format_beatmap_console(info: &BeatmapInfo) -> String {
    let mut output = String::new();

    let title_content = format!(
        "  {} [{}]",
        info.display_name().bold(),
        format_colored_mode(info.technical.mode)
    );
    let border_width = (info.display_name().chars().count() + 16).max(BORDER_WIDTH);
    let border = "━".repeat(border_width);
    let border_dim = border.dimmed();

    let stats = &info.stats;
    let _ = writeln!(output, "{}", border_dim);
    let _ = writeln!(output, "{}", title_content);
    let _ = writeln!(output, "{}", border_dim);
    let _ = writeln!(
        output,
        "  MAPPER : {}",
        info.metadata.creator.as_deref().unwrap_or("-")
    );
    let _ = writeln!(
        output,
        "  STATUS : {}",
        format_colored_status(info.technical.ranked_status)
    );
    let _ = writeln!(
        output,
        "  DIFF   : AR {} / OD {} / CS {} / HP {}",
        or_dash(stats.ar),
        or_dash(stats.od),
        or_dash(stats.cs),
        or_dash(stats.hp)
    );
    let _ = writeln!(output, "  STARS  : {}", format_stars(&stats.star_rating));
    let _ = writeln!(
        output,
        "  LENGTH : {} (drain {})",
        or_dash(stats.total_length_ms.map(format_length)),
        or_dash(stats.drain_time_ms.map(format_length))
    );
    let _ = writeln!(
        output,
        "  OBJECTS: {} ({} sliders)",
        or_dash(stats.object_count),
        or_dash(stats.slider_count)
    );
    let _ = writeln!(
        output,
        "  ID     : {} / set {}",
        or_dash(info.technical.id),
        or_dash(info.technical.set_id)
    );
    let _ = writeln!(output, "  MD5    : {}", info.technical.md5.dimmed());
    if let Some(tags) = info.metadata.tags.as_deref().filter(|t| !t.is_empty()) {
        let _ = writeln!(output, "  TAGS   : {}", tags.dimmed());
    }
    let _ = writeln!(
        output,
        "  FILE   : {}/{}",
        info.location.folder, info.location.filename
    );
    let _ = write!(output, "{}", border_dim);

    output
}

/// One-line summary for logging
pub fn format_beatmap_summary(info: &BeatmapInfo) -> String {
    format!(
        "{} ({}, {}) {}",
        info.display_name(),
        info.technical.mode.as_str(),
        info.technical.ranked_status.as_str(),
        info.technical.md5
    )
}

/// Format a game state change
pub fn format_game_state(state: GameState) -> String {
    let name = state.as_str();
    match state {
        GameState::Playing => name.green().to_string(),
        GameState::ResultScreen | GameState::MultiplayerResultScreen => name.cyan().to_string(),
        GameState::Unknown => name.dimmed().to_string(),
        _ => name.to_string(),
    }
}

fn format_colored_mode(mode: GameMode) -> String {
    let name = mode.as_str();
    match mode {
        GameMode::Standard => name.magenta().to_string(),
        GameMode::Taiko => name.red().to_string(),
        GameMode::Catch => name.green().to_string(),
        GameMode::Mania => name.purple().to_string(),
        GameMode::Unknown => name.dimmed().to_string(),
    }
}

fn format_colored_status(status: RankedStatus) -> String {
    let name = status.as_str();
    match status {
        RankedStatus::Ranked | RankedStatus::Approved => name.cyan().to_string(),
        RankedStatus::Qualified => name.yellow().to_string(),
        RankedStatus::Loved => name.magenta().to_string(),
        RankedStatus::Unknown => name.dimmed().to_string(),
        _ => name.to_string(),
    }
}

fn format_stars(stars: &StarRating) -> String {
    if stars.is_empty() {
        return "-".to_string();
    }
    let star = |value: Option<f32>| {
        value
            .map(|v| format!("{:.2}", v))
            .unwrap_or_else(|| "-".to_string())
    };
    format!(
        "{} (DT {} / HT {})",
        star(stars.no_mod).yellow(),
        star(stars.double_time),
        star(stars.half_time)
    )
}

fn format_length(ms: u32) -> String {
    let seconds = ms / 1000;
    format!("{}:{:02}", seconds / 60, seconds % 60)
}

fn or_dash<T: ToString>(value: Option<T>) -> String {
    value.map_or_else(|| "-".to_string(), |v| v.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::beatmap::{Location, Metadata, Stats, Technical};

    fn info() -> BeatmapInfo {
        BeatmapInfo {
            metadata: Metadata {
                author: Some("xi".to_string()),
                creator: Some("Nakagawa-Kanon".to_string()),
                title_romanized: Some("FREEDOM DiVE".to_string()),
                title_original: None,
                difficulty: Some("FOUR DIMENSIONS".to_string()),
                tags: Some("touhou".to_string()),
            },
            stats: Stats {
                ar: Some(9.0),
                od: Some(8.5),
                cs: Some(4.0),
                hp: Some(6.0),
                total_length_ms: Some(257_000),
                drain_time_ms: Some(250_000),
                object_count: Some(500),
                slider_count: Some(50),
                star_rating: StarRating {
                    no_mod: Some(7.5),
                    ..Default::default()
                },
            },
            technical: Technical {
                md5: "da8aae79c8f3306b5d65ec951874a7fb".to_string(),
                id: Some(129891),
                set_id: Some(39804),
                mode: GameMode::Standard,
                ranked_status: RankedStatus::Ranked,
            },
            location: Location {
                folder: "songs/123".to_string(),
                filename: "map.osu".to_string(),
                audio: None,
                cover: None,
            },
        }
    }

    #[test]
    fn test_format_beatmap_summary() {
        let summary = format_beatmap_summary(&info());
        assert_eq!(
            summary,
            "xi - FREEDOM DiVE [FOUR DIMENSIONS] (standard, ranked) da8aae79c8f3306b5d65ec951874a7fb"
        );
    }

    #[test]
    fn test_format_beatmap_console() {
        let output = format_beatmap_console(&info());
        assert!(output.contains("FREEDOM DiVE"));
        assert!(output.contains("AR 9 / OD 8.5 / CS 4 / HP 6"));
        assert!(output.contains("4:17 (drain 4:10)"));
        assert!(output.contains("TAGS   : "));
        assert!(output.contains("7.50"));
        assert!(output.contains("songs/123/map.osu"));
    }

    #[test]
    fn test_format_unknown_values() {
        let output = format_beatmap_console(&BeatmapInfo::default());
        assert!(output.contains("AR - / OD - / CS - / HP -"));
        assert!(output.contains("STARS  : -"));
        assert!(output.contains("LENGTH : - (drain -)"));
        assert!(!output.contains("TAGS"));
    }

    #[test]
    fn test_format_length() {
        assert_eq!(format_length(257_000), "4:17");
        assert_eq!(format_length(59_999), "0:59");
    }
}
