//! File and directory names for downloaded tracks.

use std::path::{Path, PathBuf};

/// Longest file name component most filesystems accept, in bytes.
const MAX_NAME_BYTES: usize = 240;

/// Suffixes of partial downloads that must not count as present files.
const PARTIAL_SUFFIXES: [&str; 2] = [".part", ".ytdl"];

/// Makes `name` safe as a single path component.
///
/// Slashes become dashes, backticks become apostrophes, and the ordinal
/// indicator becomes a degree sign; characters illegal on common filesystems
/// are dropped, as are trailing dots and spaces.
#[must_use]
pub fn sanitize_name(name: &str) -> String {
    let mapped: String = name
        .chars()
        .filter_map(|c| match c {
            '/' => Some('-'),
            '`' => Some('\''),
            'º' => Some('°'),
            '<' | '>' | ':' | '"' | '\\' | '|' | '?' | '*' => None,
            c if c.is_control() => None,
            c => Some(c),
        })
        .collect();

    let trimmed = mapped.trim().trim_end_matches(['.', ' ']);
    let mut sanitized = String::with_capacity(trimmed.len());
    for c in trimmed.chars() {
        if sanitized.len() + c.len_utf8() > MAX_NAME_BYTES {
            break;
        }
        sanitized.push(c);
    }

    if sanitized.is_empty() || sanitized == "." || sanitized == ".." {
        "_".to_string()
    } else {
        sanitized
    }
}

/// File stem for a track: `"{n} - {title}"`, or just the title without a number.
#[must_use]
pub fn track_file_stem(track_number: Option<u32>, sanitized_title: &str) -> String {
    match track_number {
        Some(number) => format!("{number} - {sanitized_title}"),
        None => sanitized_title.to_string(),
    }
}

/// Finds a completed file named `{stem}.<any extension>` in `directory`.
#[must_use]
pub fn find_existing(directory: &Path, stem: &str) -> Option<PathBuf> {
    let prefix = format!("{stem}.");
    let entries = std::fs::read_dir(directory).ok()?;

    let mut matches: Vec<PathBuf> = entries
        .filter_map(Result::ok)
        .filter(|entry| entry.file_type().is_ok_and(|kind| kind.is_file()))
        .filter_map(|entry| {
            let name = entry.file_name().into_string().ok()?;
            let is_match = name.len() > prefix.len()
                && name.starts_with(&prefix)
                && !PARTIAL_SUFFIXES.iter().any(|suffix| name.ends_with(suffix));
            is_match.then(|| entry.path())
        })
        .collect();
    matches.sort();
    matches.into_iter().next()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_sanitize_replaces_and_drops() {
        assert_eq!(sanitize_name("AC/DC"), "AC-DC");
        assert_eq!(sanitize_name("Don`t Stop"), "Don't Stop");
        assert_eq!(sanitize_name("Nº 5"), "N° 5");
        assert_eq!(sanitize_name("What? Why: *Now*"), "What Why Now");
        assert_eq!(sanitize_name("Trailing..."), "Trailing");
        assert_eq!(sanitize_name("???"), "_");
    }

    #[test]
    fn test_sanitize_caps_length_on_char_boundary() {
        let long = "é".repeat(400);
        let sanitized = sanitize_name(&long);
        assert!(sanitized.len() <= MAX_NAME_BYTES);
        assert!(sanitized.chars().all(|c| c == 'é'));
    }

    #[test]
    fn test_track_file_stem() {
        assert_eq!(track_file_stem(Some(3), "Autobahn"), "3 - Autobahn");
        assert_eq!(track_file_stem(None, "Single"), "Single");
    }

    #[test]
    fn test_find_existing_any_extension() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("1 - Intro.opus"), b"x").unwrap();
        std::fs::write(dir.path().join("2 - Outro.webm.part"), b"x").unwrap();

        assert_eq!(
            find_existing(dir.path(), "1 - Intro"),
            Some(dir.path().join("1 - Intro.opus"))
        );
        assert_eq!(find_existing(dir.path(), "2 - Outro"), None);
        assert_eq!(find_existing(dir.path(), "1 - Intr"), None);
    }

    #[test]
    fn test_find_existing_missing_directory() {
        assert_eq!(find_existing(Path::new("/nonexistent/dir"), "x"), None);
    }
}
