use crate::models::{MediaRef, Platform, ResolvedMetadata, VideoInfo};
use crate::sources::youtube;

/// Raw YouTube thumbnail host. Its images are 16:9 and need cropping.
pub const RAW_THUMBNAIL_HOST: &str = "ytimg.com";

/// The video's own metadata. Always succeeds.
///
/// YouTube thumbnails are cropped; YouTube Music ones are already square.
pub fn fallback(media: &MediaRef, video: &VideoInfo) -> ResolvedMetadata {
    ResolvedMetadata {
        result: youtube::synthesize(video),
        needs_crop: media.platform == Platform::YouTube,
    }
}

/// The video's own metadata on explicit request (`--meta yt`): the raw
/// YouTube thumbnail is always cropped.
pub fn youtube_override(video: &VideoInfo) -> ResolvedMetadata {
    ResolvedMetadata {
        result: youtube::synthesize(video),
        needs_crop: true,
    }
}

pub fn is_raw_youtube_thumbnail(url: &str) -> bool {
    url::Url::parse(url)
        .ok()
        .and_then(|u| u.host_str().map(|h| h.to_ascii_lowercase()))
        .is_some_and(|host| host == RAW_THUMBNAIL_HOST || host.ends_with(".ytimg.com"))
}
