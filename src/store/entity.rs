//! Entity addressing and the per-run skip policy.

use std::fmt;

use super::StatusCode;

/// One catalog entity, addressed by its natural key.
///
/// Children carry the id of their parent row, so a parent must be checked
/// (and thereby created) before any of its children.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntityKind<'a> {
    /// Top-level artist, keyed by sanitized name.
    Artist {
        /// Sanitized artist name.
        name: &'a str,
    },
    /// Album (or pseudo-album) owned by an artist row.
    Album {
        /// Parent artist row id.
        artist_id: i64,
        /// Sanitized album title.
        title: &'a str,
    },
    /// Track owned by an album row.
    Track {
        /// Parent album row id.
        album_id: i64,
        /// Sanitized track title.
        title: &'a str,
    },
}

impl EntityKind<'_> {
    /// Table that stores this kind of entity.
    #[must_use]
    pub fn table(&self) -> EntityTable {
        match self {
            Self::Artist { .. } => EntityTable::Artists,
            Self::Album { .. } => EntityTable::Albums,
            Self::Track { .. } => EntityTable::Tracks,
        }
    }

    /// The natural name of the entity.
    #[must_use]
    pub fn name(&self) -> &str {
        match self {
            Self::Artist { name } => name,
            Self::Album { title, .. } | Self::Track { title, .. } => title,
        }
    }
}

impl fmt::Display for EntityKind<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} '{}'", self.table().singular(), self.name())
    }
}

/// The three entity tables.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntityTable {
    Artists,
    Albums,
    Tracks,
}

impl EntityTable {
    /// SQL table name.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Artists => "artists",
            Self::Albums => "albums",
            Self::Tracks => "tracks",
        }
    }

    /// Singular label for logs.
    #[must_use]
    pub fn singular(self) -> &'static str {
        match self {
            Self::Artists => "artist",
            Self::Albums => "album",
            Self::Tracks => "track",
        }
    }
}

/// Which stored statuses count as "already handled" for this run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SkipPolicy {
    /// Live content is requested, so LIVE rows are resumed rather than skipped.
    pub include_live: bool,
    /// Tag writing is disabled, so NOMETADATA rows are final.
    pub skip_tags: bool,
}

impl SkipPolicy {
    /// Returns true when a row at `status` needs no further work this run.
    #[must_use]
    pub fn is_terminal(&self, status: StatusCode) -> bool {
        match status {
            StatusCode::Finished | StatusCode::Ignored => true,
            StatusCode::Live => !self.include_live,
            StatusCode::NoMetadata => self.skip_tags,
            StatusCode::Preload | StatusCode::Null | StatusCode::Incomplete => false,
        }
    }
}

/// Outcome of [`CatalogStore::check_or_create`](super::CatalogStore::check_or_create).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Presence {
    /// Row exists in a terminal state; nothing to do.
    Skip {
        /// The stored status, used when aggregating the parent.
        status: StatusCode,
    },
    /// Row exists and must be re-attempted.
    Resume {
        /// Existing row id.
        id: i64,
        /// The stored status before this run touches it.
        status: StatusCode,
    },
    /// Row did not exist and was inserted at PRELOAD.
    Created {
        /// New row id.
        id: i64,
    },
}

impl Presence {
    /// True for the "already handled" outcome.
    #[must_use]
    pub fn is_skip(&self) -> bool {
        matches!(self, Self::Skip { .. })
    }

    /// Row id to continue with, or 0 when skipped.
    #[must_use]
    pub fn id(&self) -> i64 {
        match self {
            Self::Skip { .. } => 0,
            Self::Resume { id, .. } | Self::Created { id } => *id,
        }
    }

    /// Status currently persisted for the row.
    #[must_use]
    pub fn status(&self) -> StatusCode {
        match self {
            Self::Skip { status } | Self::Resume { status, .. } => *status,
            Self::Created { .. } => StatusCode::Preload,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_policy_terminal_statuses() {
        let policy = SkipPolicy::default();
        assert!(policy.is_terminal(StatusCode::Finished));
        assert!(policy.is_terminal(StatusCode::Ignored));
        assert!(policy.is_terminal(StatusCode::Live));
        assert!(!policy.is_terminal(StatusCode::NoMetadata));
        assert!(!policy.is_terminal(StatusCode::Incomplete));
        assert!(!policy.is_terminal(StatusCode::Preload));
        assert!(!policy.is_terminal(StatusCode::Null));
    }

    #[test]
    fn test_include_live_resumes_live_rows() {
        let policy = SkipPolicy {
            include_live: true,
            skip_tags: false,
        };
        assert!(!policy.is_terminal(StatusCode::Live));
    }

    #[test]
    fn test_skip_tags_makes_nometadata_final() {
        let policy = SkipPolicy {
            include_live: false,
            skip_tags: true,
        };
        assert!(policy.is_terminal(StatusCode::NoMetadata));
    }

    #[test]
    fn test_presence_skip_reports_zero_id() {
        let presence = Presence::Skip {
            status: StatusCode::Finished,
        };
        assert!(presence.is_skip());
        assert_eq!(presence.id(), 0);
        assert_eq!(Presence::Created { id: 5 }.status(), StatusCode::Preload);
    }

    #[test]
    fn test_entity_display() {
        let entity = EntityKind::Album {
            artist_id: 1,
            title: "Low",
        };
        assert_eq!(entity.to_string(), "album 'Low'");
        assert_eq!(entity.table().as_str(), "albums");
    }
}
