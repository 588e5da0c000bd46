use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use tracing::{info, warn};

use crate::core::cover::{CoverFetcher, Ffmpeg};
use crate::core::fallback::is_raw_youtube_thumbnail;
use crate::core::renamer::{track_stem, unique_mp3_path};
use crate::core::tagger::write_tags;
use crate::models::{MediaRef, Platform, ResolvedMetadata, VideoInfo};
use crate::sources::youtube;
use crate::sources::ytdlp::YtDlp;

/// Where the cover comes from and whether it must be cropped. Provider art
/// wins; without it the video thumbnail is used, cropped when it is a raw
/// YouTube frame.
pub fn cover_source(metadata: &ResolvedMetadata, video: &VideoInfo) -> Option<(String, bool)> {
    if let Some(url) = &metadata.result.cover_url {
        return Some((url.clone(), metadata.needs_crop));
    }
    let thumbnail = youtube::synthesize(video).cover_url?;
    let crop = is_raw_youtube_thumbnail(&thumbnail);
    Some((thumbnail, crop))
}

/// Downloads, covers and tags one track.
pub struct Processor<'a> {
    ytdlp: &'a YtDlp,
    covers: &'a CoverFetcher,
    /// `None` when ffmpeg is not installed: covers are embedded uncropped.
    ffmpeg: Option<&'a Ffmpeg>,
}

impl<'a> Processor<'a> {
    pub fn new(ytdlp: &'a YtDlp, covers: &'a CoverFetcher, ffmpeg: Option<&'a Ffmpeg>) -> Self {
        Self {
            ytdlp,
            covers,
            ffmpeg,
        }
    }

    /// Returns the path of the tagged MP3.
    pub fn process(
        &self,
        media: &MediaRef,
        video: &VideoInfo,
        metadata: &ResolvedMetadata,
        dir: &Path,
    ) -> Result<PathBuf> {
        fs::create_dir_all(dir).with_context(|| format!("could not create {}", dir.display()))?;

        let target = unique_mp3_path(dir, &track_stem(metadata));
        self.download(media, &target.with_extension(""))?;
        if !target.exists() {
            bail!("yt-dlp finished but {} was not created", target.display());
        }

        let cover = cover_source(metadata, video).and_then(|(url, crop)| self.cover(&url, crop));
        if cover.is_none() {
            warn!("No cover art embedded");
        }

        write_tags(&target, metadata, cover.as_deref())?;
        info!("Saved {}", target.display());
        Ok(target)
    }

    /// A YouTube Music URL that fails twice is retried once on plain YouTube.
    fn download(&self, media: &MediaRef, output_stem: &Path) -> Result<()> {
        let first = self
            .ytdlp
            .download_audio(&media.url, output_stem, media.platform);
        match first {
            Ok(()) => Ok(()),
            Err(e) if media.is_music() => {
                warn!("YouTube Music download failed: {}", e);
                let fallback_url = media.youtube_url();
                info!("Retrying with {}", fallback_url);
                self.ytdlp
                    .download_audio(&fallback_url, output_stem, Platform::YouTube)
                    .context("audio download failed")
            }
            Err(e) => Err(e).context("audio download failed"),
        }
    }

    fn cover(&self, url: &str, crop: bool) -> Option<Vec<u8>> {
        let bytes = self.covers.fetch(url)?;
        if !crop {
            return Some(bytes);
        }

        let Some(ffmpeg) = self.ffmpeg else {
            warn!("ffmpeg not found, embedding the thumbnail uncropped");
            return Some(bytes);
        };
        info!("Cropping YouTube thumbnail to a square");
        match ffmpeg.square_crop(&bytes) {
            Ok(cropped) => Some(cropped),
            Err(e) => {
                warn!("Could not crop cover: {:#}, embedding it uncropped", e);
                Some(bytes)
            }
        }
    }
}
