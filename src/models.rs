use std::fmt;
use std::str::FromStr;

use serde::Deserialize;
use url::Url;

use crate::error::InputError;

/// Placeholder used when a provider or video has no usable title/artist.
pub const UNKNOWN: &str = "Unknown";

/// Where the download URL points.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Platform {
    YouTube,
    YouTubeMusic,
}

impl Platform {
    pub fn label(self) -> &'static str {
        match self {
            Platform::YouTube => "YouTube",
            Platform::YouTubeMusic => "YouTube Music",
        }
    }
}

/// A metadata provider. YouTube itself is only ever the fallback.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProviderKind {
    YouTube,
    YouTubeMusic,
    MusicBrainz,
    ITunes,
}

impl ProviderKind {
    /// Providers that can be enabled in the settings, in query order.
    pub const SELECTABLE: [ProviderKind; 3] = [
        ProviderKind::YouTubeMusic,
        ProviderKind::MusicBrainz,
        ProviderKind::ITunes,
    ];

    /// Short code used by `--meta` and the CSV `meta_source` column.
    pub fn code(self) -> &'static str {
        match self {
            ProviderKind::YouTube => "yt",
            ProviderKind::YouTubeMusic => "ytm",
            ProviderKind::MusicBrainz => "mb",
            ProviderKind::ITunes => "it",
        }
    }

    /// Infers which provider owns a metadata URL.
    pub fn for_url(raw: &str) -> Option<ProviderKind> {
        let url = Url::parse(raw.trim()).ok()?;
        let host = url.host_str()?.to_ascii_lowercase();
        let host = host.strip_prefix("www.").unwrap_or(&host);
        match host {
            "music.youtube.com" => Some(ProviderKind::YouTubeMusic),
            "youtube.com" | "m.youtube.com" | "youtu.be" => Some(ProviderKind::YouTube),
            "musicbrainz.org" | "beta.musicbrainz.org" => Some(ProviderKind::MusicBrainz),
            "music.apple.com" | "itunes.apple.com" => Some(ProviderKind::ITunes),
            _ => None,
        }
    }
}

impl fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ProviderKind::YouTube => "YouTube",
            ProviderKind::YouTubeMusic => "YouTube Music",
            ProviderKind::MusicBrainz => "MusicBrainz",
            ProviderKind::ITunes => "iTunes",
        };
        f.write_str(name)
    }
}

impl FromStr for ProviderKind {
    type Err = InputError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "yt" => Ok(ProviderKind::YouTube),
            "ytm" => Ok(ProviderKind::YouTubeMusic),
            "mb" => Ok(ProviderKind::MusicBrainz),
            "it" => Ok(ProviderKind::ITunes),
            _ => Err(InputError::UnknownProvider(s.to_string())),
        }
    }
}

/// A parsed download URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediaRef {
    pub url: String,
    pub platform: Platform,
    /// `None` for playlist/album URLs.
    pub video_id: Option<String>,
}

impl MediaRef {
    pub fn parse(raw: &str) -> Result<Self, InputError> {
        let raw = raw.trim();
        let invalid = || InputError::InvalidMediaUrl(raw.to_string());

        if !(raw.starts_with("http://") || raw.starts_with("https://")) {
            return Err(invalid());
        }
        let url = Url::parse(raw).map_err(|_| invalid())?;
        let host = url.host_str().ok_or_else(invalid)?.to_ascii_lowercase();

        let platform = if host == "music.youtube.com" {
            Platform::YouTubeMusic
        } else {
            Platform::YouTube
        };

        Ok(Self {
            url: raw.to_string(),
            platform,
            video_id: video_id(&url, &host),
        })
    }

    pub fn is_music(&self) -> bool {
        self.platform == Platform::YouTubeMusic
    }

    /// The same video on the plain YouTube host. A known video id gives a
    /// bare watch URL.
    pub fn youtube_url(&self) -> String {
        if !self.is_music() {
            return self.url.clone();
        }
        if let Some(id) = &self.video_id {
            return format!("https://www.youtube.com/watch?v={}", id);
        }
        match Url::parse(&self.url) {
            Ok(mut url) => {
                if url.set_host(Some("www.youtube.com")).is_ok() {
                    url.to_string()
                } else {
                    self.url.clone()
                }
            }
            Err(_) => self.url.clone(),
        }
    }

    /// Narrows a (possibly playlist) reference down to one of its entries.
    pub fn for_entry(&self, video: &VideoInfo) -> MediaRef {
        let url = video
            .page_url()
            .filter(|u| u.starts_with("http://") || u.starts_with("https://"))
            .unwrap_or(&self.url)
            .to_string();
        let video_id = video.id.clone().or_else(|| {
            Url::parse(&url)
                .ok()
                .and_then(|u| {
                    let host = u.host_str()?.to_ascii_lowercase();
                    video_id(&u, &host)
                })
        });
        MediaRef {
            url,
            platform: self.platform,
            video_id,
        }
    }
}

fn video_id(url: &Url, host: &str) -> Option<String> {
    if let Some((_, v)) = url.query_pairs().find(|(k, _)| k == "v") {
        if !v.is_empty() {
            return Some(v.into_owned());
        }
    }

    let mut segments = url.path_segments()?;
    let first = segments.next()?;
    if host.ends_with("youtu.be") && !first.is_empty() {
        return Some(first.to_string());
    }
    if matches!(first, "shorts" | "embed" | "live") {
        return segments.next().filter(|s| !s.is_empty()).map(str::to_string);
    }
    None
}

/// Everything needed to resolve metadata for one track.
#[derive(Debug, Clone)]
pub struct MetaRequest {
    pub media: MediaRef,
    pub metadata_url: Option<String>,
    pub provider: Option<ProviderKind>,
    pub query: Option<String>,
}

/// One candidate match from a provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderResult {
    pub title: String,
    pub artist: String,
    pub album: Option<String>,
    pub release_date: Option<String>,
    pub cover_url: Option<String>,
    pub source: ProviderKind,
    /// MusicBrainz release id, used for the Cover Art Archive lookup.
    pub release_id: Option<String>,
}

impl ProviderResult {
    pub fn new(source: ProviderKind, title: Option<String>, artist: Option<String>) -> Self {
        Self {
            title: non_empty(title).unwrap_or_else(|| UNKNOWN.to_string()),
            artist: non_empty(artist).unwrap_or_else(|| UNKNOWN.to_string()),
            album: None,
            release_date: None,
            cover_url: None,
            source,
            release_id: None,
        }
    }

    /// Year taken from the first four characters of the release date.
    pub fn year(&self) -> Option<i32> {
        let date = self.release_date.as_deref()?.trim();
        let year = date.get(..4)?;
        if !year.chars().all(|c| c.is_ascii_digit()) {
            return None;
        }
        year.parse().ok()
    }

    pub fn summary(&self) -> String {
        match &self.album {
            Some(album) => format!("{} - {} [{}]", self.artist, self.title, album),
            None => format!("{} - {}", self.artist, self.title),
        }
    }

    /// Two candidates describing the same track from the same provider.
    pub fn same_track(&self, other: &ProviderResult) -> bool {
        self.source == other.source
            && self.title.eq_ignore_ascii_case(&other.title)
            && self.artist.eq_ignore_ascii_case(&other.artist)
            && self.album.as_deref().map(str::to_lowercase)
                == other.album.as_deref().map(str::to_lowercase)
    }
}

/// The record that ends up in the tags.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedMetadata {
    pub result: ProviderResult,
    /// The cover art is a raw 16:9 YouTube thumbnail and must be cropped square.
    pub needs_crop: bool,
}

impl ResolvedMetadata {
    /// Provider art is curated and already square.
    pub fn from_provider(result: ProviderResult) -> Self {
        Self {
            result,
            needs_crop: false,
        }
    }

    pub fn title(&self) -> &str {
        &self.result.title
    }

    pub fn artist(&self) -> &str {
        &self.result.artist
    }
}

/// The part of a `yt-dlp --dump-json` entry we care about.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct VideoInfo {
    pub id: Option<String>,
    pub title: Option<String>,
    pub uploader: Option<String>,
    pub upload_date: Option<String>,
    pub thumbnail: Option<String>,
    #[serde(default)]
    pub thumbnails: Vec<Thumbnail>,
    pub webpage_url: Option<String>,
    pub url: Option<String>,
    pub track: Option<String>,
    pub artist: Option<String>,
    pub album: Option<String>,
    pub release_date: Option<String>,
    pub playlist_title: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Thumbnail {
    pub url: String,
    pub width: Option<u32>,
    pub height: Option<u32>,
}

impl VideoInfo {
    pub fn page_url(&self) -> Option<&str> {
        self.webpage_url.as_deref().or(self.url.as_deref())
    }

    pub fn display_title(&self) -> &str {
        self.title.as_deref().unwrap_or(UNKNOWN)
    }
}

/// One line of work: a download URL plus the optional overrides for it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrackJob {
    pub download_url: String,
    pub metadata_url: Option<String>,
    pub provider: Option<ProviderKind>,
}

/// Trims and drops empty strings.
pub fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}
