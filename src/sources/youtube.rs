use std::sync::LazyLock;

use regex::Regex;

use crate::models::{non_empty, ProviderKind, ProviderResult, VideoInfo};

/// Builds a result from the video's own data: title, uploader as artist and
/// upload date. Never fails; missing fields become placeholders.
pub fn synthesize(video: &VideoInfo) -> ProviderResult {
    let artist = video.uploader.as_deref().map(clean_uploader);
    let mut result = ProviderResult::new(ProviderKind::YouTube, video.title.clone(), artist);
    result.release_date = non_empty(video.upload_date.clone());
    result.cover_url = non_empty(video.thumbnail.clone())
        .or_else(|| video.thumbnails.last().map(|t| t.url.clone()));
    result
}

static UPLOADER_NOISE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\s*-\s*Topic\b|VEVO|Official").expect("uploader pattern should compile")
});

/// Strips channel decorations: `Artist - Topic`, `ArtistVEVO`, `Official`.
pub fn clean_uploader(uploader: &str) -> String {
    let name = UPLOADER_NOISE.replace_all(uploader, " ");
    name.split_whitespace().collect::<Vec<_>>().join(" ")
}
