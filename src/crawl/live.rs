//! Name heuristic for live recordings.

use std::sync::LazyLock;

use regex::Regex;

/// Bracketed "live", "live at/in/from/..." phrasing, a leading "Live!", a
/// trailing "live", and broadcast markers. `live`/`bbc` must start a word so
/// titles like "Alive and Well" stay studio releases.
#[allow(clippy::expect_used)]
static LIVE_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)([\[(]live[\])]|\b(live|bbc) (at|in|from|fm|bootleg|sessions|in concert|[12][0-9]{3}|- )|^live! | live$|\(live-| live!|fm broadcast)",
    )
    .expect("live pattern is valid") // Static pattern, safe to panic
});

/// Returns true when `name` looks like a live recording.
#[must_use]
pub fn is_live_title(name: &str) -> bool {
    LIVE_PATTERN.is_match(name)
}

/// An album is live when its title says so, or when every track title does.
///
/// An album with no tracks is never live by the track rule.
#[must_use]
pub fn is_live_album<'a, I>(title: &str, track_titles: I) -> bool
where
    I: IntoIterator<Item = &'a str>,
{
    if is_live_title(title) {
        return true;
    }
    let mut any = false;
    for track in track_titles {
        if !is_live_title(track) {
            return false;
        }
        any = true;
    }
    any
}
