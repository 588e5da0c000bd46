pub mod itunes;
pub mod musicbrainz;
pub mod youtube;
pub mod youtube_music;
pub mod ytdlp;

use anyhow::{Context, Result};
use tracing::{debug, info, warn};

use crate::error::SourceError;
use crate::models::{ProviderKind, ProviderResult};

use self::itunes::ItunesClient;
use self::musicbrainz::MusicBrainzClient;
use self::youtube_music::YouTubeMusicSource;
use self::ytdlp::YtDlp;

/// Most candidates a single provider contributes to a search.
pub const SEARCH_LIMIT: usize = 5;

pub const USER_AGENT: &str = concat!("ytmsd/", env!("CARGO_PKG_VERSION"));

/// Metadata source trait.
/// Every provider can resolve one of its own URLs and run a text search.
pub trait MetadataSource {
    fn kind(&self) -> ProviderKind;

    /// Resolves a provider URL to a single match. `Ok(None)` when the URL
    /// does not belong to this provider or names nothing.
    fn resolve_from_url(&self, url: &str) -> Result<Option<ProviderResult>, SourceError>;

    /// Searches by free text, at most [`SEARCH_LIMIT`] results in provider order.
    fn search(&self, query: &str) -> Result<Vec<ProviderResult>, SourceError>;

    /// Fills in cover art that needs a separate lookup. The default keeps
    /// whatever URL the search payload carried.
    fn with_cover_art(&self, result: ProviderResult) -> ProviderResult {
        result
    }

    /// Like [`resolve_from_url`](Self::resolve_from_url) but never fails.
    fn resolve_soft(&self, url: &str) -> Option<ProviderResult> {
        info!("Fetching {} metadata from {}", self.kind(), url);
        match self.resolve_from_url(url) {
            Ok(Some(result)) => {
                info!("Metadata fetched from {}", self.kind());
                Some(result)
            }
            Ok(None) => {
                info!("{} has nothing for {}", self.kind(), url);
                None
            }
            Err(e) => {
                warn!("{} lookup failed: {}", self.kind(), e);
                debug!("{:?}", e);
                None
            }
        }
    }

    /// Like [`search`](Self::search) but never fails.
    fn search_soft(&self, query: &str) -> Vec<ProviderResult> {
        info!("Searching {} for: {}", self.kind(), query);
        match self.search(query) {
            Ok(mut results) => {
                results.truncate(SEARCH_LIMIT);
                info!("Found {} results from {}", results.len(), self.kind());
                results
            }
            Err(e) => {
                warn!("{} search failed: {}", self.kind(), e);
                debug!("{:?}", e);
                Vec::new()
            }
        }
    }
}

/// The queryable providers, dispatched by kind.
pub enum Provider {
    YouTubeMusic(YouTubeMusicSource),
    MusicBrainz(MusicBrainzClient),
    ITunes(ItunesClient),
}

impl Provider {
    fn inner(&self) -> &dyn MetadataSource {
        match self {
            Provider::YouTubeMusic(source) => source,
            Provider::MusicBrainz(source) => source,
            Provider::ITunes(source) => source,
        }
    }
}

impl MetadataSource for Provider {
    fn kind(&self) -> ProviderKind {
        self.inner().kind()
    }

    fn resolve_from_url(&self, url: &str) -> Result<Option<ProviderResult>, SourceError> {
        self.inner().resolve_from_url(url)
    }

    fn search(&self, query: &str) -> Result<Vec<ProviderResult>, SourceError> {
        self.inner().search(query)
    }

    fn with_cover_art(&self, result: ProviderResult) -> ProviderResult {
        self.inner().with_cover_art(result)
    }
}

/// Lookup of the adapter for a provider kind.
pub trait SourceSet {
    fn source(&self, kind: ProviderKind) -> Option<&dyn MetadataSource>;
}

/// The production provider set.
pub struct Providers {
    providers: Vec<Provider>,
}

impl Providers {
    pub fn new(ytdlp: YtDlp, cover_size: &str) -> Result<Self> {
        let http = reqwest::blocking::Client::builder()
            .user_agent(USER_AGENT)
            .build()
            .context("could not create the HTTP client")?;

        Ok(Self {
            providers: vec![
                Provider::YouTubeMusic(YouTubeMusicSource::new(ytdlp)),
                Provider::MusicBrainz(MusicBrainzClient::new(http.clone())),
                Provider::ITunes(ItunesClient::new(http, cover_size)),
            ],
        })
    }
}

impl SourceSet for Providers {
    fn source(&self, kind: ProviderKind) -> Option<&dyn MetadataSource> {
        self.providers
            .iter()
            .find(|p| p.kind() == kind)
            .map(|p| p as &dyn MetadataSource)
    }
}
