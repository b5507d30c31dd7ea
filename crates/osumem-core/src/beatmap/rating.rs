//! Hand-off point for star ratings the game does not keep in memory.

use std::path::Path;

use super::enums::GameMode;
use super::info::StarRating;

/// What a rating calculator needs to rate the current beatmap.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RatingRequest<'a> {
    pub md5: &'a str,
    /// Absolute path of the `.osu` file, when the songs directory is known.
    pub beatmap_path: Option<&'a Path>,
    pub mode: GameMode,
}

/// External source of star ratings.
///
/// Called at most once per distinct beatmap; the assembler caches the answer
/// until the content hash changes.
pub trait RatingSource: Send + Sync {
    fn star_rating(&self, request: &RatingRequest<'_>) -> StarRating;
}

/// Rating source that knows nothing.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoRatings;

impl RatingSource for NoRatings {
    fn star_rating(&self, _request: &RatingRequest<'_>) -> StarRating {
        StarRating::default()
    }
}

impl<F> RatingSource for F
where
    F: Fn(&RatingRequest<'_>) -> StarRating + Send + Sync,
{
    fn star_rating(&self, request: &RatingRequest<'_>) -> StarRating {
        self(request)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_ratings() {
        let request = RatingRequest {
            md5: "abc",
            beatmap_path: None,
            mode: GameMode::Standard,
        };
        assert!(NoRatings.star_rating(&request).is_empty());
    }

    #[test]
    fn test_closure_source() {
        let source = |request: &RatingRequest<'_>| StarRating {
            no_mod: (request.mode == GameMode::Mania).then_some(3.2),
            ..Default::default()
        };
        let request = RatingRequest {
            md5: "abc",
            beatmap_path: Some(Path::new("/songs/map.osu")),
            mode: GameMode::Mania,
        };
        assert_eq!(source.star_rating(&request).no_mod, Some(3.2));
    }
}
