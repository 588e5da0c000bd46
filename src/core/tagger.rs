use std::path::Path;

use anyhow::{Context, Result};
use id3::frame::{Picture, PictureType};
use id3::{Tag, TagLike, Version};

use crate::models::ResolvedMetadata;

/// Writes title, artist, album, year and the front cover as ID3v2.4.
/// Fields the metadata does not carry are left as they are.
pub fn write_tags(path: &Path, metadata: &ResolvedMetadata, cover: Option<&[u8]>) -> Result<()> {
    let mut tag = Tag::read_from_path(path).unwrap_or_else(|_| Tag::new());
    let result = &metadata.result;

    tag.set_title(&result.title);
    tag.set_artist(&result.artist);
    if let Some(album) = &result.album {
        tag.set_album(album);
    }
    if let Some(year) = result.year() {
        tag.set_year(year);
    }
    if let Some(data) = cover {
        tag.remove_all_pictures();
        tag.add_frame(Picture {
            mime_type: detect_mime_type(data).to_string(),
            picture_type: PictureType::CoverFront,
            description: "Cover".to_string(),
            data: data.to_vec(),
        });
    }

    tag.write_to_path(path, Version::Id3v24)
        .with_context(|| format!("could not write tags to {}", path.display()))?;
    Ok(())
}

/// MIME type from the image's magic bytes. Anything unknown is treated as JPEG.
fn detect_mime_type(data: &[u8]) -> &'static str {
    if data.starts_with(&[0x89, 0x50, 0x4E, 0x47]) {
        "image/png"
    } else if data.starts_with(b"RIFF") && data.get(8..12) == Some(b"WEBP".as_slice()) {
        "image/webp"
    } else {
        "image/jpeg"
    }
}
