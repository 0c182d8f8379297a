//! Completeness status codes and child-to-parent aggregation.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Completeness marker stored on every artist, album and track row.
///
/// Ordered by completeness, not by time: `Preload < Null < Ignored < Live <
/// NoMetadata < Incomplete < Finished`. The discriminants are the integers
/// persisted in the `status` columns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum StatusCode {
    /// Row created, nothing fetched yet.
    Preload = 1,
    /// Track has no fetchable source.
    Null = 2,
    /// Operator excluded this entity.
    Ignored = 3,
    /// Live recording, excluded unless live content is requested.
    Live = 4,
    /// Fetched but not tagged.
    NoMetadata = 5,
    /// Attempted, not complete (failed fetch, or present on disk untagged).
    Incomplete = 6,
    /// Fetched and tagged.
    Finished = 9,
}

impl StatusCode {
    /// Every status, in completeness order.
    pub const ALL: [Self; 7] = [
        Self::Preload,
        Self::Null,
        Self::Ignored,
        Self::Live,
        Self::NoMetadata,
        Self::Incomplete,
        Self::Finished,
    ];

    /// Returns the persisted integer code.
    #[must_use]
    pub fn code(self) -> i64 {
        self as i64
    }

    /// Parses a persisted integer code.
    #[must_use]
    pub fn from_code(code: i64) -> Option<Self> {
        match code {
            1 => Some(Self::Preload),
            2 => Some(Self::Null),
            3 => Some(Self::Ignored),
            4 => Some(Self::Live),
            5 => Some(Self::NoMetadata),
            6 => Some(Self::Incomplete),
            9 => Some(Self::Finished),
            _ => None,
        }
    }

    /// Returns the display label.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Preload => "PRELOAD",
            Self::Null => "NULL",
            Self::Ignored => "IGNORED",
            Self::Live => "LIVE",
            Self::NoMetadata => "NOMETADATA",
            Self::Incomplete => "INCOMPLETE",
            Self::Finished => "FINISHED",
        }
    }
}

impl fmt::Display for StatusCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Aggregates a parent's status from its direct children.
///
/// The parent is only as complete as its least complete child. Returns `None`
/// for an empty child set; callers keep the parent's stored status then.
#[must_use]
pub fn propagate_min<I>(children: I) -> Option<StatusCode>
where
    I: IntoIterator<Item = StatusCode>,
{
    children.into_iter().min()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_order_follows_completeness() {
        for pair in StatusCode::ALL.windows(2) {
            assert!(pair[0] < pair[1], "{} should sort before {}", pair[0], pair[1]);
        }
    }

    #[test]
    fn test_status_codes_round_trip_through_integers() {
        for status in StatusCode::ALL {
            assert_eq!(StatusCode::from_code(status.code()), Some(status));
        }
        assert_eq!(StatusCode::Finished.code(), 9);
        assert_eq!(StatusCode::from_code(7), None);
        assert_eq!(StatusCode::from_code(0), None);
    }

    #[test]
    fn test_propagate_min_one_incomplete_child_marks_parent_incomplete() {
        let parent = propagate_min([
            StatusCode::Finished,
            StatusCode::Incomplete,
            StatusCode::Finished,
        ]);
        assert_eq!(parent, Some(StatusCode::Incomplete));
    }

    #[test]
    fn test_propagate_min_all_finished() {
        let parent = propagate_min([StatusCode::Finished, StatusCode::Finished]);
        assert_eq!(parent, Some(StatusCode::Finished));
    }

    #[test]
    fn test_propagate_min_empty_is_none() {
        assert_eq!(propagate_min(Vec::<StatusCode>::new()), None);
    }

    #[test]
    fn test_propagate_min_live_album_pulls_artist_down() {
        let parent = propagate_min([StatusCode::Finished, StatusCode::Live]);
        assert_eq!(parent, Some(StatusCode::Live));
    }
}
