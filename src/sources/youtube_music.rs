use tracing::debug;

use crate::error::SourceError;
use crate::models::{non_empty, Platform, ProviderKind, ProviderResult, VideoInfo};
use crate::sources::ytdlp::YtDlp;
use crate::sources::{MetadataSource, SEARCH_LIMIT};

/// Host serving YouTube Music album art (square, sized by URL parameters).
const ALBUM_ART_HOST: &str = "lh3.googleusercontent.com";

/// YouTube Music metadata via yt-dlp's music player client.
pub struct YouTubeMusicSource {
    ytdlp: YtDlp,
}

impl YouTubeMusicSource {
    pub fn new(ytdlp: YtDlp) -> Self {
        Self { ytdlp }
    }

    /// Maps a yt-dlp entry, preferring the music auto-tags over video fields.
    pub fn convert_entry(entry: &VideoInfo) -> ProviderResult {
        let title = non_empty(entry.track.clone()).or_else(|| entry.title.clone());
        let artist = non_empty(entry.artist.clone()).or_else(|| entry.uploader.clone());

        let mut result = ProviderResult::new(ProviderKind::YouTubeMusic, title, artist);
        result.album = non_empty(entry.album.clone());
        result.release_date =
            non_empty(entry.release_date.clone()).or_else(|| non_empty(entry.upload_date.clone()));
        result.cover_url = select_thumbnail(entry);
        result
    }

    /// True when the entry names both a title and an artist.
    fn is_complete(entry: &VideoInfo) -> bool {
        let has = |a: &Option<String>, b: &Option<String>| {
            non_empty(a.clone()).or_else(|| non_empty(b.clone())).is_some()
        };
        has(&entry.track, &entry.title) && has(&entry.artist, &entry.uploader)
    }
}

impl MetadataSource for YouTubeMusicSource {
    fn kind(&self) -> ProviderKind {
        ProviderKind::YouTubeMusic
    }

    fn resolve_from_url(&self, url: &str) -> Result<Option<ProviderResult>, SourceError> {
        if !matches!(
            ProviderKind::for_url(url),
            Some(ProviderKind::YouTubeMusic | ProviderKind::YouTube)
        ) {
            debug!("Not a YouTube link: {}", url);
            return Ok(None);
        }
        let entries = self.ytdlp.dump_track(url, Platform::YouTubeMusic)?;
        let Some(entry) = entries.first() else {
            return Ok(None);
        };
        if !Self::is_complete(entry) {
            debug!("Insufficient metadata from YouTube Music for {}", url);
            return Ok(None);
        }
        Ok(Some(Self::convert_entry(entry)))
    }

    fn search(&self, query: &str) -> Result<Vec<ProviderResult>, SourceError> {
        let target = format!("ytsearch{}:{}", SEARCH_LIMIT, query);
        let entries = self.ytdlp.dump_json(&target, Platform::YouTubeMusic)?;
        Ok(entries
            .iter()
            .filter(|e| Self::is_complete(e))
            .map(Self::convert_entry)
            .take(SEARCH_LIMIT)
            .collect())
    }
}

/// Picks the album art thumbnail when YouTube Music provides one (the
/// largest square `lh3.googleusercontent.com` image), otherwise the default.
pub fn select_thumbnail(entry: &VideoInfo) -> Option<String> {
    let album_art = entry
        .thumbnails
        .iter()
        .filter(|t| t.url.contains(ALBUM_ART_HOST))
        .max_by_key(|t| {
            let square = t.width.is_some() && t.width == t.height;
            (square, t.width.unwrap_or(0))
        });

    match album_art {
        Some(thumb) => Some(thumb.url.clone()),
        None => non_empty(entry.thumbnail.clone()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Thumbnail;

    fn thumb(url: &str, width: u32, height: u32) -> Thumbnail {
        Thumbnail {
            url: url.to_string(),
            width: Some(width),
            height: Some(height),
        }
    }

    #[test]
    fn test_convert_prefers_music_tags() {
        let entry = VideoInfo {
            title: Some("Artist - Song (Official Audio)".to_string()),
            uploader: Some("Artist - Topic".to_string()),
            track: Some("Song".to_string()),
            artist: Some("Artist".to_string()),
            album: Some("Record".to_string()),
            release_date: Some("20210305".to_string()),
            upload_date: Some("20210101".to_string()),
            ..Default::default()
        };
        let result = YouTubeMusicSource::convert_entry(&entry);
        assert_eq!(result.title, "Song");
        assert_eq!(result.artist, "Artist");
        assert_eq!(result.album.as_deref(), Some("Record"));
        assert_eq!(result.release_date.as_deref(), Some("20210305"));
        assert_eq!(result.source, ProviderKind::YouTubeMusic);
    }

    #[test]
    fn test_convert_falls_back_to_video_fields() {
        let entry = VideoInfo {
            title: Some("Live Session".to_string()),
            uploader: Some("Some Channel".to_string()),
            upload_date: Some("20190101".to_string()),
            ..Default::default()
        };
        let result = YouTubeMusicSource::convert_entry(&entry);
        assert_eq!(result.title, "Live Session");
        assert_eq!(result.artist, "Some Channel");
        assert_eq!(result.release_date.as_deref(), Some("20190101"));
    }

    #[test]
    fn test_incomplete_entry() {
        let entry = VideoInfo {
            title: Some("Untitled".to_string()),
            ..Default::default()
        };
        assert!(!YouTubeMusicSource::is_complete(&entry));
    }

    #[test]
    fn test_foreign_links_are_not_handed_to_ytdlp() {
        let source = YouTubeMusicSource::new(YtDlp::with_program("ytmsd-no-such-yt-dlp"));
        let resolved = source
            .resolve_from_url("https://musicbrainz.org/recording/5b11f4ce-a62d-471e-81fc-a69a8278c7da")
            .unwrap();
        assert!(resolved.is_none());
        assert!(source.resolve_from_url("not a url").unwrap().is_none());

        // a YouTube link does reach yt-dlp
        assert!(matches!(
            source.resolve_from_url("https://music.youtube.com/watch?v=abc123"),
            Err(SourceError::Spawn { .. })
        ));
    }

    #[test]
    fn test_select_thumbnail_prefers_square_album_art() {
        let entry = VideoInfo {
            thumbnail: Some("https://i.ytimg.com/vi/x/maxresdefault.jpg".to_string()),
            thumbnails: vec![
                thumb("https://i.ytimg.com/vi/x/hqdefault.jpg", 480, 360),
                thumb("https://lh3.googleusercontent.com/abc=w120-h120", 120, 120),
                thumb("https://lh3.googleusercontent.com/abc=w544-h544", 544, 544),
            ],
            ..Default::default()
        };
        assert_eq!(
            select_thumbnail(&entry).as_deref(),
            Some("https://lh3.googleusercontent.com/abc=w544-h544")
        );
    }

    #[test]
    fn test_select_thumbnail_default() {
        let entry = VideoInfo {
            thumbnail: Some("https://i.ytimg.com/vi/x/maxresdefault.jpg".to_string()),
            thumbnails: vec![thumb("https://i.ytimg.com/vi/x/hqdefault.jpg", 480, 360)],
            ..Default::default()
        };
        assert_eq!(
            select_thumbnail(&entry).as_deref(),
            Some("https://i.ytimg.com/vi/x/maxresdefault.jpg")
        );
    }
}
