//! Classification of fetch failures from the fetcher's diagnostic text.

use std::fmt;
use std::sync::LazyLock;

use regex::RegexSet;
use serde::Serialize;

/// Known causes of a failed track fetch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum FetchFailureCause {
    AgeRestricted,
    SignatureExtraction,
    FileNameTooLong,
    EmptyDownload,
    ChannelAccessRestricted,
    PremiereNotLive,
    Forbidden,
    NameResolution,
    Unclassified,
}

/// Table order matters: the first matching pattern wins.
const PATTERNS: [(&str, FetchFailureCause); 8] = [
    (
        r"(?i)Sign in to confirm your age",
        FetchFailureCause::AgeRestricted,
    ),
    (
        r"(?i)Signature extraction failed|[nm]sig extraction failed",
        FetchFailureCause::SignatureExtraction,
    ),
    (r"(?i)File name too long", FetchFailureCause::FileNameTooLong),
    (
        r"(?i)The downloaded file is empty",
        FetchFailureCause::EmptyDownload,
    ),
    (
        r"(?i)Join this channel to get access",
        FetchFailureCause::ChannelAccessRestricted,
    ),
    (r"(?i)Premieres in", FetchFailureCause::PremiereNotLive),
    (r"(?i)Error 403: Forbidden", FetchFailureCause::Forbidden),
    (
        r"(?i)Temporary failure in name resolution",
        FetchFailureCause::NameResolution,
    ),
];

#[allow(clippy::expect_used)]
static PATTERN_SET: LazyLock<RegexSet> = LazyLock::new(|| {
    RegexSet::new(PATTERNS.iter().map(|(pattern, _)| *pattern))
        .expect("fetch failure patterns are valid") // Static patterns, safe to panic
});

impl FetchFailureCause {
    /// Classifies a fetcher diagnostic. Unknown text is [`Self::Unclassified`].
    #[must_use]
    pub fn classify(diagnostic: &str) -> Self {
        PATTERN_SET
            .matches(diagnostic)
            .iter()
            .next()
            .map_or(Self::Unclassified, |index| PATTERNS[index].1)
    }

    /// Retrying a skippable failure cannot succeed, so the track is abandoned.
    ///
    /// An upcoming premiere is a channel-access restriction until it airs.
    #[must_use]
    pub fn is_skippable(self) -> bool {
        matches!(
            self,
            Self::AgeRestricted
                | Self::SignatureExtraction
                | Self::FileNameTooLong
                | Self::EmptyDownload
                | Self::ChannelAccessRestricted
                | Self::PremiereNotLive
        )
    }

    /// Short code written to the error log.
    #[must_use]
    pub fn code(self) -> &'static str {
        match self {
            Self::AgeRestricted => "AGE",
            Self::SignatureExtraction => "SIG",
            Self::FileNameTooLong => "FILENAME",
            Self::EmptyDownload => "EMPTY",
            Self::ChannelAccessRestricted => "ACCESS",
            Self::PremiereNotLive => "PREMIERE",
            Self::Forbidden => "FORBIDDEN",
            Self::NameResolution => "DNS",
            Self::Unclassified => "OTHER",
        }
    }
}

impl fmt::Display for FetchFailureCause {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::AgeRestricted => "age restricted",
            Self::SignatureExtraction => "signature extraction failed",
            Self::FileNameTooLong => "file name too long",
            Self::EmptyDownload => "downloaded file is empty",
            Self::ChannelAccessRestricted => "channel access restricted",
            Self::PremiereNotLive => "premiere not live yet",
            Self::Forbidden => "forbidden",
            Self::NameResolution => "name resolution failed",
            Self::Unclassified => "unclassified error",
        };
        write!(f, "{label}")
    }
}
