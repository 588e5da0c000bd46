use reqwest::blocking::Client;
use serde::Deserialize;
use url::Url;

use crate::error::SourceError;
use crate::models::{non_empty, ProviderKind, ProviderResult};
use crate::sources::{MetadataSource, SEARCH_LIMIT};

const SEARCH_URL: &str = "https://itunes.apple.com/search";
const LOOKUP_URL: &str = "https://itunes.apple.com/lookup";

/// iTunes public catalog search. No authentication needed.
pub struct ItunesClient {
    client: Client,
    cover_size: String,
}

#[derive(Deserialize)]
struct SearchResponse {
    #[serde(default)]
    results: Vec<ItunesTrack>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ItunesTrack {
    wrapper_type: Option<String>,
    track_name: Option<String>,
    artist_name: Option<String>,
    collection_name: Option<String>,
    release_date: Option<String>,
    #[serde(rename = "artworkUrl100")]
    artwork_url_100: Option<String>,
}

impl ItunesClient {
    pub fn new(client: Client, cover_size: &str) -> Self {
        Self {
            client,
            cover_size: cover_size.to_string(),
        }
    }

    fn convert_track(&self, track: &ItunesTrack) -> Option<ProviderResult> {
        if track.wrapper_type.as_deref().is_some_and(|w| w != "track") {
            return None;
        }
        let title = non_empty(track.track_name.clone())?;

        let mut result =
            ProviderResult::new(ProviderKind::ITunes, Some(title), track.artist_name.clone());
        result.album = non_empty(track.collection_name.clone());
        result.release_date = track
            .release_date
            .as_deref()
            .map(|d| d.chars().take(10).collect::<String>())
            .and_then(|d| non_empty(Some(d)));
        // artworkUrl100 can be resized by rewriting the dimensions in the path
        result.cover_url = non_empty(track.artwork_url_100.clone())
            .map(|url| url.replace("100x100", &self.cover_size));
        Some(result)
    }

    fn parse_results(&self, body: &str) -> Result<Vec<ProviderResult>, SourceError> {
        let resp: SearchResponse = serde_json::from_str(body)?;
        Ok(resp
            .results
            .iter()
            .filter_map(|t| self.convert_track(t))
            .take(SEARCH_LIMIT)
            .collect())
    }
}

impl MetadataSource for ItunesClient {
    fn kind(&self) -> ProviderKind {
        ProviderKind::ITunes
    }

    fn resolve_from_url(&self, url: &str) -> Result<Option<ProviderResult>, SourceError> {
        let Some(id) = track_id(url) else {
            return Ok(None);
        };

        let body = self
            .client
            .get(LOOKUP_URL)
            .query(&[("id", id.as_str()), ("entity", "song")])
            .send()?
            .error_for_status()?
            .text()?;

        Ok(self.parse_results(&body)?.into_iter().next())
    }

    fn search(&self, query: &str) -> Result<Vec<ProviderResult>, SourceError> {
        let limit = SEARCH_LIMIT.to_string();
        let body = self
            .client
            .get(SEARCH_URL)
            .query(&[
                ("term", query),
                ("media", "music"),
                ("entity", "song"),
                ("limit", limit.as_str()),
            ])
            .send()?
            .error_for_status()?
            .text()?;

        self.parse_results(&body)
    }
}

/// Extracts the track id from an Apple Music / iTunes URL.
///
/// - `https://music.apple.com/us/album/name/1440857781?i=1440858149` -> `1440858149`
/// - `https://itunes.apple.com/us/album/name/id1440857781` -> `1440857781`
/// - `https://music.apple.com/us/song/name/1440858149` -> `1440858149`
pub fn track_id(raw: &str) -> Option<String> {
    let url = Url::parse(raw.trim()).ok()?;
    let is_digits = |s: &str| !s.is_empty() && s.chars().all(|c| c.is_ascii_digit());

    if let Some((_, i)) = url.query_pairs().find(|(k, _)| k == "i") {
        if is_digits(&i) {
            return Some(i.into_owned());
        }
    }

    let segments: Vec<&str> = url.path_segments()?.collect();
    if let Some(id) = segments
        .iter()
        .filter_map(|s| s.strip_prefix("id"))
        .find(|s| is_digits(s))
    {
        return Some(id.to_string());
    }
    segments
        .iter()
        .rev()
        .find(|s| is_digits(s))
        .map(|s| s.to_string())
}
