use std::path::{Path, PathBuf};

use crate::models::ResolvedMetadata;

/// Replaces characters that are invalid in a file name on any common
/// filesystem with `_`, and trims trailing dots and spaces.
pub fn sanitize_filename(s: &str) -> String {
    let replaced: String = s
        .chars()
        .map(|c| match c {
            '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|' => '_',
            c if c.is_control() => '_',
            c => c,
        })
        .collect();
    replaced
        .trim()
        .trim_end_matches(|c| c == '.' || c == ' ')
        .to_string()
}

/// `"{artist} - {title}"`, without extension.
pub fn track_stem(metadata: &ResolvedMetadata) -> String {
    format!(
        "{} - {}",
        sanitize_filename(metadata.artist()),
        sanitize_filename(metadata.title())
    )
}

/// `dir/{stem}.mp3`, or `dir/{stem} (n).mp3` when that file already exists.
pub fn unique_mp3_path(dir: &Path, stem: &str) -> PathBuf {
    let first = dir.join(format!("{}.mp3", stem));
    if !first.exists() {
        return first;
    }
    (2..)
        .map(|n| dir.join(format!("{} ({}).mp3", stem, n)))
        .find(|candidate| !candidate.exists())
        .unwrap_or(first)
}

/// Playlist downloads go into a subdirectory named after the playlist.
pub fn playlist_dir(base: &Path, playlist_title: Option<&str>) -> PathBuf {
    match playlist_title.map(sanitize_filename) {
        Some(name) if !name.is_empty() => base.join(name),
        _ => base.to_path_buf(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ProviderKind, ProviderResult};

    #[test]
    fn test_sanitize_filename_reserved_characters() {
        assert_eq!(sanitize_filename("a/b\0c"), "a_b_c");
        assert_eq!(sanitize_filename("What? Why: Now*"), "What_ Why_ Now_");
        assert_eq!(sanitize_filename("Hello World"), "Hello World");
        assert_eq!(sanitize_filename("아이유 - 좋은날"), "아이유 - 좋은날");
    }

    #[test]
    fn test_sanitize_filename_trailing_dots() {
        assert_eq!(sanitize_filename("Vol. 2..."), "Vol. 2");
        assert_eq!(sanitize_filename("  padded  "), "padded");
    }

    #[test]
    fn test_track_stem() {
        let metadata = ResolvedMetadata::from_provider(ProviderResult::new(
            ProviderKind::ITunes,
            Some("Back In Black".to_string()),
            Some("AC/DC".to_string()),
        ));
        assert_eq!(track_stem(&metadata), "AC_DC - Back In Black");
    }

    #[test]
    fn test_unique_mp3_path() {
        let dir = tempfile::TempDir::new().unwrap();
        let first = unique_mp3_path(dir.path(), "IU - Good Day");
        assert_eq!(first, dir.path().join("IU - Good Day.mp3"));

        std::fs::write(&first, b"").unwrap();
        assert_eq!(
            unique_mp3_path(dir.path(), "IU - Good Day"),
            dir.path().join("IU - Good Day (2).mp3")
        );
    }

    #[test]
    fn test_playlist_dir() {
        let base = Path::new("/music");
        assert_eq!(playlist_dir(base, Some("Love poem")), base.join("Love poem"));
        assert_eq!(playlist_dir(base, Some("AC/DC")), base.join("AC_DC"));
        assert_eq!(playlist_dir(base, Some(" ")), base.to_path_buf());
        assert_eq!(playlist_dir(base, None), base.to_path_buf());
    }
}
