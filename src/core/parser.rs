use std::sync::LazyLock;

use regex::Regex;

use crate::models::{non_empty, VideoInfo};
use crate::sources::youtube::clean_uploader;

/// Decorations that hurt catalog searches, removed in order.
static TITLE_NOISE: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    [
        r"(?i)\s*\(Official[^)]*\)",
        r"(?i)\s*\[Official[^\]]*\]",
        r"(?i)\s*\([^)]*Audio\)",
        r"(?i)\s*\([^)]*Video\)",
        r"(?i)\s*\([^)]*\bMV\)",
        r"(?i)\bM/?V\b",
        r"(?i)\s*[(\[]?\s*\bf(ea)?t\.?\s+[^)\]]*[)\]]?",
    ]
    .iter()
    .map(|p| Regex::new(p).expect("title pattern should compile"))
    .collect()
});

static PUNCTUATION: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[^\w\s\-/&]").expect("punctuation pattern should compile"));

/// Strips `(Official Video)`, `[Official Audio]`, `MV`, featured-artist
/// credits and stray punctuation from a video title.
pub fn clean_title(title: &str) -> String {
    let mut cleaned = title.to_string();
    for pattern in TITLE_NOISE.iter() {
        cleaned = pattern.replace_all(&cleaned, " ").into_owned();
    }
    let cleaned = PUNCTUATION.replace_all(&cleaned, "");
    cleaned.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Splits `"Artist - Title"`. Both halves must be non-empty.
pub fn split_artist_title(title: &str) -> Option<(&str, &str)> {
    let (artist, title) = title.split_once(" - ")?;
    let (artist, title) = (artist.trim(), title.trim());
    if artist.is_empty() || title.is_empty() {
        return None;
    }
    Some((artist, title))
}

/// Build a catalog search query for a video.
///
/// Preference order:
/// - YouTube Music auto-tags: "{artist} {track}"
/// - an "Artist - Title" video title: "{Artist} {Title}"
/// - "{uploader} {title}" with the channel name cleaned up
pub fn build_search_query(video: &VideoInfo) -> String {
    if let (Some(artist), Some(track)) = (
        non_empty(video.artist.clone()),
        non_empty(video.track.clone()),
    ) {
        return format!("{} {}", artist, track);
    }

    let title = clean_title(video.title.as_deref().unwrap_or_default());
    if let Some((artist, title)) = split_artist_title(&title) {
        return format!("{} {}", artist, title);
    }

    let uploader = video
        .uploader
        .as_deref()
        .map(clean_uploader)
        .unwrap_or_default();

    let parts: Vec<&str> = [uploader.as_str(), title.as_str()]
        .into_iter()
        .filter(|s| !s.is_empty())
        .collect();
    parts.join(" ")
}
