use reqwest::blocking::Client;
use serde::Deserialize;
use tracing::debug;

use crate::error::SourceError;
use crate::models::{non_empty, ProviderKind, ProviderResult};
use crate::sources::{MetadataSource, SEARCH_LIMIT};

const API_BASE: &str = "https://musicbrainz.org/ws/2";
const COVER_ART_BASE: &str = "https://coverartarchive.org/release";

/// MusicBrainz recording search. The client must carry a descriptive
/// User-Agent or MusicBrainz rejects the request.
pub struct MusicBrainzClient {
    client: Client,
}

#[derive(Deserialize)]
struct RecordingSearch {
    #[serde(default)]
    recordings: Vec<Recording>,
}

#[derive(Deserialize)]
struct Recording {
    title: Option<String>,
    #[serde(rename = "artist-credit", default)]
    artist_credit: Vec<ArtistCredit>,
    #[serde(default)]
    releases: Vec<Release>,
}

#[derive(Deserialize)]
struct ArtistCredit {
    name: String,
    #[serde(default)]
    joinphrase: String,
}

#[derive(Deserialize)]
struct Release {
    id: String,
    title: Option<String>,
    date: Option<String>,
}

impl MusicBrainzClient {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    fn convert_recording(recording: &Recording) -> Option<ProviderResult> {
        let title = non_empty(recording.title.clone())?;
        let artist: String = recording
            .artist_credit
            .iter()
            .map(|credit| format!("{}{}", credit.name, credit.joinphrase))
            .collect();

        let mut result = ProviderResult::new(ProviderKind::MusicBrainz, Some(title), Some(artist));
        if let Some(release) = recording.releases.first() {
            result.album = non_empty(release.title.clone());
            result.release_date = non_empty(release.date.clone());
            result.release_id = Some(release.id.clone());
        }
        Some(result)
    }

    fn parse_search(body: &str) -> Result<Vec<ProviderResult>, SourceError> {
        let resp: RecordingSearch = serde_json::from_str(body)?;
        Ok(resp
            .recordings
            .iter()
            .filter_map(Self::convert_recording)
            .take(SEARCH_LIMIT)
            .collect())
    }

    fn parse_recording(body: &str) -> Result<Option<ProviderResult>, SourceError> {
        let recording: Recording = serde_json::from_str(body)?;
        Ok(Self::convert_recording(&recording))
    }

    fn cover_art_url(release_id: &str) -> String {
        format!("{}/{}/front", COVER_ART_BASE, release_id)
    }
}

impl MetadataSource for MusicBrainzClient {
    fn kind(&self) -> ProviderKind {
        ProviderKind::MusicBrainz
    }

    fn resolve_from_url(&self, url: &str) -> Result<Option<ProviderResult>, SourceError> {
        let Some(mbid) = recording_id(url) else {
            return Ok(None);
        };

        let body = self
            .client
            .get(format!("{}/recording/{}?inc=artists+releases&fmt=json", API_BASE, mbid))
            .send()?
            .error_for_status()?
            .text()?;

        Self::parse_recording(&body)
    }

    fn search(&self, query: &str) -> Result<Vec<ProviderResult>, SourceError> {
        let limit = SEARCH_LIMIT.to_string();
        let body = self
            .client
            .get(format!("{}/recording/", API_BASE))
            .query(&[("query", query), ("fmt", "json"), ("limit", limit.as_str())])
            .send()?
            .error_for_status()?
            .text()?;

        Self::parse_search(&body)
    }

    /// Looks the release up in the Cover Art Archive. A release without art
    /// is still a valid result.
    fn with_cover_art(&self, mut result: ProviderResult) -> ProviderResult {
        if result.cover_url.is_some() {
            return result;
        }
        let Some(release_id) = result.release_id.as_deref() else {
            return result;
        };

        let url = Self::cover_art_url(release_id);
        match self.client.head(&url).send() {
            Ok(resp) if resp.status().is_success() => result.cover_url = Some(url),
            Ok(resp) => debug!("No cover art in the Cover Art Archive ({})", resp.status()),
            Err(e) => debug!("Cover Art Archive lookup failed: {}", e),
        }
        result
    }
}

/// Extracts the recording MBID from `https://musicbrainz.org/recording/<mbid>`.
pub fn recording_id(url: &str) -> Option<&str> {
    let start = url.find("/recording/")? + "/recording/".len();
    let id = &url[start..];
    let end = id
        .find(|c: char| !(c.is_ascii_hexdigit() || c == '-'))
        .unwrap_or(id.len());
    let id = &id[..end];
    if id.len() == 36 {
        Some(id)
    } else {
        None
    }
}
