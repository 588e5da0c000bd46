use std::process::Command;
use std::thread;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use reqwest::blocking::Client;
use reqwest::header::USER_AGENT as USER_AGENT_HEADER;
use reqwest::StatusCode;
use tracing::{debug, info, warn};
use url::Url;

use crate::core::fallback::is_raw_youtube_thumbnail;
use crate::error::SourceError;
use crate::sources::USER_AGENT;

/// Tried in order; some image hosts reject unknown agents.
const USER_AGENTS: [&str; 3] = [
    USER_AGENT,
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0 Safari/537.36",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/605.1.15 (KHTML, like Gecko) Version/17.0 Safari/605.1.15",
];

const RETRY_DELAY: Duration = Duration::from_secs(1);

/// Center square, scaled to 600x600.
pub const CROP_FILTER: &str = r"crop=min(iw\,ih):min(iw\,ih),scale=600:600";

/// URLs to try for a cover, best first. For a raw YouTube thumbnail this
/// is the JPEG rendition, then the max and high resolution variants.
pub fn cover_candidates(url: &str) -> Vec<String> {
    let mut candidates = vec![url.to_string()];
    if !is_raw_youtube_thumbnail(url) {
        return candidates;
    }

    let Ok(parsed) = Url::parse(url) else {
        return candidates;
    };
    let segments: Vec<&str> = parsed
        .path_segments()
        .map(|s| s.collect())
        .unwrap_or_default();
    let video_id = match segments.as_slice() {
        ["vi" | "vi_webp", id, ..] if !id.is_empty() => *id,
        _ => return candidates,
    };

    if segments[0] == "vi_webp" {
        let jpeg = url.replacen("/vi_webp/", "/vi/", 1).replace(".webp", ".jpg");
        candidates.insert(0, jpeg);
    }
    for variant in ["maxresdefault.jpg", "hqdefault.jpg"] {
        let candidate = format!("https://i.ytimg.com/vi/{}/{}", video_id, variant);
        if !candidates.contains(&candidate) {
            candidates.push(candidate);
        }
    }
    candidates
}

/// Downloads cover art over plain HTTP with a rotating User-Agent.
pub struct CoverFetcher {
    client: Client,
}

impl CoverFetcher {
    pub fn new() -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .context("could not create the HTTP client")?;
        Ok(Self { client })
    }

    /// The first candidate that downloads wins. `None` once all are exhausted.
    pub fn fetch(&self, url: &str) -> Option<Vec<u8>> {
        for candidate in cover_candidates(url) {
            info!("Downloading cover from {}", candidate);
            if let Some(bytes) = self.fetch_one(&candidate) {
                info!("Cover downloaded ({} bytes)", bytes.len());
                return Some(bytes);
            }
        }
        warn!("All cover download attempts failed");
        None
    }

    fn fetch_one(&self, url: &str) -> Option<Vec<u8>> {
        for (attempt, agent) in USER_AGENTS.iter().enumerate() {
            debug!("Cover attempt {}/{}", attempt + 1, USER_AGENTS.len());
            match self.get(url, agent) {
                Ok(bytes) if !bytes.is_empty() => return Some(bytes),
                Ok(_) => debug!("Empty cover response from {}", url),
                Err(SourceError::Http(e)) if e.status() == Some(StatusCode::NOT_FOUND) => {
                    debug!("No cover at {}", url);
                    return None;
                }
                Err(e) => warn!(
                    "Cover download failed (attempt {}/{}): {}",
                    attempt + 1,
                    USER_AGENTS.len(),
                    e
                ),
            }
            if attempt + 1 < USER_AGENTS.len() {
                thread::sleep(RETRY_DELAY);
            }
        }
        None
    }

    fn get(&self, url: &str, agent: &str) -> Result<Vec<u8>, SourceError> {
        let bytes = self
            .client
            .get(url)
            .header(USER_AGENT_HEADER, agent)
            .send()?
            .error_for_status()?
            .bytes()?;
        Ok(bytes.to_vec())
    }
}

/// `ffmpeg`, used to crop raw YouTube thumbnails.
#[derive(Debug, Clone)]
pub struct Ffmpeg {
    program: String,
}

impl Default for Ffmpeg {
    fn default() -> Self {
        Self {
            program: "ffmpeg".to_string(),
        }
    }
}

impl Ffmpeg {
    pub fn is_available(&self) -> bool {
        Command::new(&self.program)
            .arg("-version")
            .output()
            .is_ok_and(|output| output.status.success())
    }

    /// Crops an image to its center square and scales it to 600x600 JPEG.
    pub fn square_crop(&self, image: &[u8]) -> Result<Vec<u8>> {
        let dir = tempfile::TempDir::new().context("could not create a temporary directory")?;
        let input = dir.path().join("cover.src");
        let output = dir.path().join("cover.jpg");
        std::fs::write(&input, image).context("could not write the cover for cropping")?;

        let result = Command::new(&self.program)
            .args(["-y", "-loglevel", "error", "-i"])
            .arg(&input)
            .args(["-vf", CROP_FILTER, "-frames:v", "1"])
            .arg(&output)
            .output()
            .with_context(|| format!("could not run {}", self.program))?;

        if !result.status.success() {
            bail!(
                "{} exited with {}: {}",
                self.program,
                result.status,
                String::from_utf8_lossy(&result.stderr).trim()
            );
        }
        std::fs::read(&output).context("could not read the cropped cover")
    }
}
