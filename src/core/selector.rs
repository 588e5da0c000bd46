use crate::config::Preferences;
use crate::models::{MetaRequest, ProviderKind};

/// Decides which providers to query for a request, in query order.
///
/// 1. An explicit override wins outright, even over a metadata URL that
///    belongs to another provider (the URL is then resolved within the
///    override's provider).
/// 2. A YouTube Music download is its own source of truth, unless a
///    metadata URL of another provider is given.
/// 3. Otherwise every enabled provider.
///
/// An empty list means "use the YouTube metadata, no interaction".
pub fn select_providers(request: &MetaRequest, prefs: &Preferences) -> Vec<ProviderKind> {
    if let Some(kind) = request.provider {
        return vec![kind];
    }

    let url_kind = request
        .metadata_url
        .as_deref()
        .and_then(ProviderKind::for_url);

    if request.media.is_music() {
        return match url_kind {
            Some(kind) if kind != ProviderKind::YouTubeMusic => vec![kind],
            _ => vec![ProviderKind::YouTubeMusic],
        };
    }

    prefs.enabled()
}
