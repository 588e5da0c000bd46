use tracing::{info, warn};

use crate::config::Preferences;
use crate::core::fallback::{fallback, youtube_override};
use crate::core::parser::build_search_query;
use crate::core::presenter::{merge_candidates, Choice, Presenter};
use crate::core::selector::select_providers;
use crate::error::ResolveError;
use crate::models::{MetaRequest, ProviderKind, ProviderResult, ResolvedMetadata, VideoInfo};
use crate::sources::SourceSet;

/// What to look up on the next round.
enum Lookup {
    Search(String),
    Link(String),
}

impl Lookup {
    fn from_input(input: String) -> Self {
        if input.starts_with("http://") || input.starts_with("https://") {
            Lookup::Link(input)
        } else {
            Lookup::Search(input)
        }
    }
}

/// Picks the final metadata for one video. Every path ends in a result:
/// provider failures are logged and the video's own metadata fills in.
pub struct Resolver<'a, S: SourceSet> {
    sources: &'a S,
    prefs: Preferences,
    presenter: &'a mut Presenter,
}

impl<'a, S: SourceSet> Resolver<'a, S> {
    pub fn new(sources: &'a S, prefs: Preferences, presenter: &'a mut Presenter) -> Self {
        Self {
            sources,
            prefs,
            presenter,
        }
    }

    pub fn resolve(&mut self, request: &MetaRequest, video: &VideoInfo) -> ResolvedMetadata {
        let kinds = select_providers(request, &self.prefs);

        if kinds.is_empty() {
            info!("No metadata sources enabled, using YouTube metadata");
            return fallback(&request.media, video);
        }
        if kinds == [ProviderKind::YouTube] {
            info!("Using YouTube metadata as requested");
            return youtube_override(video);
        }

        if let Some(url) = request.metadata_url.as_deref() {
            if let Some(result) = self.resolve_link(&kinds, url, false) {
                return self.accept(result);
            }
            warn!("Could not fetch metadata from {}, searching instead", url);
        }

        if request.media.is_music() && kinds == [ProviderKind::YouTubeMusic] {
            let direct = self
                .sources
                .source(ProviderKind::YouTubeMusic)
                .and_then(|source| source.resolve_soft(&request.media.url));
            return match direct {
                Some(result) => self.accept(result),
                None => {
                    info!("Using YouTube metadata for {}", request.media.url);
                    fallback(&request.media, video)
                }
            };
        }

        let query = request
            .query
            .clone()
            .unwrap_or_else(|| build_search_query(video));
        let mut lookup = Lookup::Search(query);

        loop {
            let candidates = match &lookup {
                Lookup::Search(query) => self.gather(&kinds, query).unwrap_or_else(|e| {
                    info!("{}", e);
                    Vec::new()
                }),
                Lookup::Link(url) => self.resolve_link(&kinds, url, true).into_iter().collect(),
            };

            match self.presenter.present(&candidates) {
                Choice::Pick(result) => return self.accept(result),
                Choice::Fallback => return fallback(&request.media, video),
                Choice::NewQuery(input) => lookup = Lookup::from_input(input),
            }
        }
    }

    /// Queries every selected provider with the same text.
    fn gather(&self, kinds: &[ProviderKind], query: &str) -> Result<Vec<ProviderResult>, ResolveError> {
        let not_found = || ResolveError::NoCandidatesFound {
            query: query.to_string(),
        };
        if query.trim().is_empty() {
            return Err(not_found());
        }

        let batches = kinds
            .iter()
            .filter_map(|kind| self.sources.source(*kind))
            .map(|source| source.search_soft(query))
            .collect();
        let merged = merge_candidates(batches);

        if merged.is_empty() {
            Err(not_found())
        } else {
            Ok(merged)
        }
    }

    /// Resolves a metadata link within the selected providers. A link typed
    /// at the prompt goes to whichever provider owns it first.
    fn resolve_link(&self, kinds: &[ProviderKind], url: &str, owner_first: bool) -> Option<ProviderResult> {
        let mut order: Vec<ProviderKind> = Vec::new();
        if owner_first {
            if let Some(owner) = ProviderKind::for_url(url) {
                order.push(owner);
            }
        }
        for kind in kinds {
            if !order.contains(kind) {
                order.push(*kind);
            }
        }

        order
            .into_iter()
            .filter_map(|kind| self.sources.source(kind))
            .find_map(|source| source.resolve_soft(url))
    }

    fn accept(&self, result: ProviderResult) -> ResolvedMetadata {
        let result = match self.sources.source(result.source) {
            Some(source) => source.with_cover_art(result),
            None => result,
        };
        ResolvedMetadata::from_provider(result)
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;

    use super::*;
    use crate::core::prompt::testing::scripted;
    use crate::error::SourceError;
    use crate::models::MediaRef;
    use crate::sources::MetadataSource;

    struct FakeSource {
        kind: ProviderKind,
        hits: Vec<ProviderResult>,
        linked: Option<ProviderResult>,
        failing: bool,
        queries: RefCell<Vec<String>>,
    }

    impl FakeSource {
        fn new(kind: ProviderKind) -> Self {
            Self {
                kind,
                hits: Vec::new(),
                linked: None,
                failing: false,
                queries: RefCell::new(Vec::new()),
            }
        }

        /// Every call errors, as with a provider returning garbage.
        fn failing(mut self) -> Self {
            self.failing = true;
            self
        }

        fn error(&self) -> Option<SourceError> {
            self.failing.then(|| {
                SourceError::Malformed(serde_json::from_str::<serde_json::Value>("{").unwrap_err())
            })
        }

        fn with_hits(mut self, titles: &[&str]) -> Self {
            self.hits = titles.iter().map(|t| result(self.kind, t)).collect();
            self
        }

        fn with_link(mut self, title: &str) -> Self {
            self.linked = Some(result(self.kind, title));
            self
        }
    }

    impl MetadataSource for FakeSource {
        fn kind(&self) -> ProviderKind {
            self.kind
        }

        fn resolve_from_url(&self, _url: &str) -> Result<Option<ProviderResult>, SourceError> {
            match self.error() {
                Some(e) => Err(e),
                None => Ok(self.linked.clone()),
            }
        }

        fn search(&self, query: &str) -> Result<Vec<ProviderResult>, SourceError> {
            self.queries.borrow_mut().push(query.to_string());
            match self.error() {
                Some(e) => Err(e),
                None => Ok(self.hits.clone()),
            }
        }

        fn with_cover_art(&self, mut result: ProviderResult) -> ProviderResult {
            result.cover_url = Some(format!("https://covers.example/{}", result.title));
            result
        }
    }

    struct FakeSet(Vec<FakeSource>);

    impl FakeSet {
        fn get(&self, kind: ProviderKind) -> &FakeSource {
            self.0.iter().find(|s| s.kind == kind).unwrap()
        }
    }

    impl SourceSet for FakeSet {
        fn source(&self, kind: ProviderKind) -> Option<&dyn MetadataSource> {
            self.0
                .iter()
                .find(|s| s.kind == kind)
                .map(|s| s as &dyn MetadataSource)
        }
    }

    fn result(kind: ProviderKind, title: &str) -> ProviderResult {
        ProviderResult::new(kind, Some(title.to_string()), Some("Artist".to_string()))
    }

    fn request(url: &str) -> MetaRequest {
        MetaRequest {
            media: MediaRef::parse(url).unwrap(),
            metadata_url: None,
            provider: None,
            query: None,
        }
    }

    fn video() -> VideoInfo {
        VideoInfo {
            id: Some("X".to_string()),
            title: Some("Artist - Song (Official Video)".to_string()),
            uploader: Some("ArtistVEVO".to_string()),
            thumbnail: Some("https://i.ytimg.com/vi/X/maxresdefault.jpg".to_string()),
            ..Default::default()
        }
    }

    fn prefs(youtube_music: bool, musicbrainz: bool, itunes: bool) -> Preferences {
        Preferences {
            youtube_music,
            musicbrainz,
            itunes,
        }
    }

    fn all_sources() -> FakeSet {
        FakeSet(vec![
            FakeSource::new(ProviderKind::YouTubeMusic).with_hits(&["A", "B", "C"]),
            FakeSource::new(ProviderKind::MusicBrainz).with_link("MB Linked"),
            FakeSource::new(ProviderKind::ITunes).with_link("iTunes Linked"),
        ])
    }

    #[test]
    fn test_pick_from_search() {
        let sources = all_sources();
        let mut presenter = Presenter::new(scripted(&["2"]));
        let mut resolver = Resolver::new(&sources, prefs(true, false, false), &mut presenter);

        let resolved = resolver.resolve(&request("https://youtube.com/watch?v=X"), &video());
        assert_eq!(resolved.title(), "B");
        assert_eq!(resolved.result.source, ProviderKind::YouTubeMusic);
        assert_eq!(resolved.result.cover_url.as_deref(), Some("https://covers.example/B"));
        assert!(!resolved.needs_crop);
        assert_eq!(
            *sources.get(ProviderKind::YouTubeMusic).queries.borrow(),
            vec!["Artist Song".to_string()]
        );
    }

    #[test]
    fn test_double_zero_and_timeout_give_fallback() {
        let media = request("https://youtube.com/watch?v=X");
        let expected = fallback(&media.media, &video());

        for script in [&["00"][..], &[][..]] {
            let sources = all_sources();
            let mut presenter = Presenter::new(scripted(script));
            let mut resolver = Resolver::new(&sources, prefs(true, true, false), &mut presenter);
            assert_eq!(resolver.resolve(&media, &video()), expected);
        }
    }

    #[test]
    fn test_nothing_enabled_skips_the_prompt() {
        let sources = all_sources();
        let mut presenter = Presenter::new(scripted(&["1"]));
        let mut resolver = Resolver::new(&sources, prefs(false, false, false), &mut presenter);

        let resolved = resolver.resolve(&request("https://youtube.com/watch?v=X"), &video());
        assert_eq!(resolved.result.source, ProviderKind::YouTube);
        assert!(resolved.needs_crop);
        assert_eq!(presenter.countdowns(), 0);
    }

    #[test]
    fn test_empty_results_fall_back_to_cropped_video_metadata() {
        let sources = FakeSet(vec![
            FakeSource::new(ProviderKind::YouTubeMusic),
            FakeSource::new(ProviderKind::MusicBrainz),
        ]);
        let mut presenter = Presenter::new(scripted(&[]));
        let mut resolver = Resolver::new(&sources, prefs(true, true, false), &mut presenter);

        let resolved = resolver.resolve(&request("https://youtube.com/watch?v=X"), &video());
        assert_eq!(resolved.title(), "Artist - Song (Official Video)");
        assert_eq!(resolved.artist(), "Artist");
        assert!(resolved.needs_crop);
        assert_eq!(presenter.countdowns(), 1);
    }

    #[test]
    fn test_new_query_from_prompt() {
        let sources = FakeSet(vec![
            FakeSource::new(ProviderKind::MusicBrainz).with_hits(&["Found"]),
        ]);
        let mut presenter = Presenter::new(scripted(&["0", "other words", "1"]));
        let mut resolver = Resolver::new(&sources, prefs(false, true, false), &mut presenter);

        let resolved = resolver.resolve(&request("https://youtube.com/watch?v=X"), &video());
        assert_eq!(resolved.title(), "Found");
        assert_eq!(
            *sources.get(ProviderKind::MusicBrainz).queries.borrow(),
            vec!["Artist Song".to_string(), "other words".to_string()]
        );
        assert_eq!(presenter.countdowns(), 2);
    }

    #[test]
    fn test_link_from_prompt_goes_to_its_owner() {
        let sources = all_sources();
        let mut presenter = Presenter::new(scripted(&["0", "https://music.apple.com/us/album/x/1?i=2", "1"]));
        let mut resolver = Resolver::new(&sources, prefs(true, true, false), &mut presenter);

        let resolved = resolver.resolve(&request("https://youtube.com/watch?v=X"), &video());
        assert_eq!(resolved.title(), "iTunes Linked");
        assert_eq!(resolved.result.source, ProviderKind::ITunes);
    }

    #[test]
    fn test_youtube_override_is_cropped_without_prompt() {
        let sources = all_sources();
        let mut presenter = Presenter::new(scripted(&["1"]));
        let mut resolver = Resolver::new(&sources, prefs(true, true, true), &mut presenter);

        let mut req = request("https://music.youtube.com/watch?v=X");
        req.provider = Some(ProviderKind::YouTube);
        let resolved = resolver.resolve(&req, &video());
        assert_eq!(resolved.result.source, ProviderKind::YouTube);
        assert!(resolved.needs_crop);
        assert_eq!(presenter.countdowns(), 0);
    }

    #[test]
    fn test_music_url_resolves_directly() {
        let sources = FakeSet(vec![
            FakeSource::new(ProviderKind::YouTubeMusic).with_link("Direct"),
        ]);
        let mut presenter = Presenter::new(scripted(&[]));
        let mut resolver = Resolver::new(&sources, prefs(false, true, true), &mut presenter);

        let resolved = resolver.resolve(&request("https://music.youtube.com/watch?v=X"), &video());
        assert_eq!(resolved.title(), "Direct");
        assert!(!resolved.needs_crop);
        assert_eq!(presenter.countdowns(), 0);
    }

    #[test]
    fn test_music_url_without_match_uses_uncropped_fallback() {
        let sources = FakeSet(vec![FakeSource::new(ProviderKind::YouTubeMusic)]);
        let mut presenter = Presenter::new(scripted(&[]));
        let mut resolver = Resolver::new(&sources, Preferences::default(), &mut presenter);

        let resolved = resolver.resolve(&request("https://music.youtube.com/watch?v=X"), &video());
        assert_eq!(resolved.result.source, ProviderKind::YouTube);
        assert!(!resolved.needs_crop);
    }

    #[test]
    fn test_override_resolves_link_within_its_provider() {
        let sources = all_sources();
        let mut presenter = Presenter::new(scripted(&[]));
        let mut resolver = Resolver::new(&sources, Preferences::default(), &mut presenter);

        let mut req = request("https://youtube.com/watch?v=X");
        req.provider = Some(ProviderKind::MusicBrainz);
        req.metadata_url = Some("https://music.apple.com/us/album/x/1?i=2".to_string());
        let resolved = resolver.resolve(&req, &video());
        assert_eq!(resolved.title(), "MB Linked");
        assert_eq!(resolved.result.source, ProviderKind::MusicBrainz);
        assert_eq!(presenter.countdowns(), 0);
    }

    #[test]
    fn test_failing_provider_is_skipped() {
        let sources = FakeSet(vec![
            FakeSource::new(ProviderKind::YouTubeMusic).with_hits(&["Never"]).failing(),
            FakeSource::new(ProviderKind::MusicBrainz).with_hits(&["A"]),
        ]);
        let mut presenter = Presenter::new(scripted(&["1"]));
        let mut resolver = Resolver::new(&sources, prefs(true, true, false), &mut presenter);

        let resolved = resolver.resolve(&request("https://youtube.com/watch?v=X"), &video());
        assert_eq!(resolved.title(), "A");
        assert_eq!(resolved.result.source, ProviderKind::MusicBrainz);
        assert_eq!(sources.get(ProviderKind::YouTubeMusic).queries.borrow().len(), 1);
    }

    #[test]
    fn test_all_providers_failing_give_fallback() {
        let sources = FakeSet(vec![
            FakeSource::new(ProviderKind::YouTubeMusic).with_link("Never").failing(),
            FakeSource::new(ProviderKind::MusicBrainz).with_hits(&["Never"]).failing(),
            FakeSource::new(ProviderKind::ITunes).with_hits(&["Never"]).failing(),
        ]);
        let mut presenter = Presenter::new(scripted(&[]));
        let mut resolver = Resolver::new(&sources, prefs(true, true, true), &mut presenter);

        let mut req = request("https://youtube.com/watch?v=X");
        req.metadata_url =
            Some("https://musicbrainz.org/recording/5b11f4ce-a62d-471e-81fc-a69a8278c7da".to_string());
        let resolved = resolver.resolve(&req, &video());
        assert_eq!(resolved, fallback(&req.media, &video()));
        assert_eq!(presenter.countdowns(), 1);
    }
}
