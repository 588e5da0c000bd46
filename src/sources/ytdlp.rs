use std::path::Path;
use std::process::{Command, Output};

use tracing::{debug, info, warn};

use crate::error::SourceError;
use crate::models::{MediaRef, Platform, VideoInfo};

const PROGRAM: &str = "yt-dlp";
const ANDROID_CLIENT: &str = "youtube:player_client=android";
const IOS_CLIENT: &str = "youtube:player_client=ios";
const WEB_CLIENT: &str = "youtube:player_client=web";

/// Player clients tried for one inspection.
const INSPECT_ATTEMPTS: usize = 3;

/// `--extractor-args` player client for a platform.
fn player_client(platform: Platform) -> &'static str {
    match platform {
        Platform::YouTubeMusic => "youtube:player_client=web_music,android",
        Platform::YouTube => ANDROID_CLIENT,
    }
}

/// The platform's client first, then android, ios and web.
fn inspect_clients(platform: Platform) -> Vec<&'static str> {
    let mut clients = vec![player_client(platform)];
    for client in [ANDROID_CLIENT, IOS_CLIENT, WEB_CLIENT] {
        if !clients.contains(&client) {
            clients.push(client);
        }
    }
    clients.truncate(INSPECT_ATTEMPTS);
    clients
}

/// Runs `attempt` per client until one yields entries. A failed yt-dlp run
/// or empty output moves on to the next client; any other error is final.
fn first_with_entries(
    clients: &[&str],
    mut attempt: impl FnMut(&str) -> Result<Vec<VideoInfo>, SourceError>,
) -> Result<Vec<VideoInfo>, SourceError> {
    let mut last = Ok(Vec::new());
    for (i, client) in clients.iter().enumerate() {
        info!("Fetch attempt {}/{} with {}", i + 1, clients.len(), client);
        match attempt(client) {
            Ok(entries) if !entries.is_empty() => return Ok(entries),
            Ok(_) => {
                warn!("No entries found in yt-dlp output");
                last = Ok(Vec::new());
            }
            Err(e @ SourceError::Process { .. }) => {
                warn!("Fetching info failed: {}", e);
                debug!("{:?}", e);
                last = Err(e);
            }
            Err(e) => return Err(e),
        }
    }
    last
}

/// Thin wrapper around the `yt-dlp` executable.
#[derive(Debug, Clone)]
pub struct YtDlp {
    program: String,
}

impl Default for YtDlp {
    fn default() -> Self {
        Self::with_program(PROGRAM)
    }
}

impl YtDlp {
    pub fn with_program(program: &str) -> Self {
        Self {
            program: program.to_string(),
        }
    }

    pub fn version(&self) -> Result<String, SourceError> {
        let output = self.run(&["--version"])?;
        Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
    }

    /// Dumps one JSON entry per video without downloading anything.
    /// Lines that fail to parse are skipped.
    pub fn dump_json(&self, target: &str, platform: Platform) -> Result<Vec<VideoInfo>, SourceError> {
        self.dump(target, player_client(platform), false)
    }

    /// Like [`dump_json`](Self::dump_json) for a single video, even when the
    /// URL also names a playlist or mix.
    pub fn dump_track(&self, url: &str, platform: Platform) -> Result<Vec<VideoInfo>, SourceError> {
        self.dump(url, player_client(platform), true)
    }

    fn dump(&self, target: &str, client: &str, no_playlist: bool) -> Result<Vec<VideoInfo>, SourceError> {
        let mut args = vec![
            "--dump-json",
            "--skip-download",
            "--no-warnings",
            "--extractor-args",
            client,
        ];
        if no_playlist {
            args.push("--no-playlist");
        }
        args.push(target);

        let output = self.run(&args)?;
        Ok(parse_entries(&String::from_utf8_lossy(&output.stdout)))
    }

    /// Fetches the entries behind a download URL (one for a video, many for
    /// a playlist), rotating player clients when yt-dlp fails or finds nothing.
    pub fn inspect(&self, media: &MediaRef) -> Result<Vec<VideoInfo>, SourceError> {
        info!("Fetching info from {}", media.url);
        let clients = inspect_clients(media.platform);
        let entries = first_with_entries(&clients, |client| self.dump(&media.url, client, false))?;
        if entries.is_empty() {
            warn!("No entries for {} after {} attempts", media.url, clients.len());
        }
        Ok(entries)
    }

    /// Downloads and transcodes the audio to `<output_stem>.mp3`.
    /// Tries the platform's player client first, then the iOS client.
    pub fn download_audio(
        &self,
        url: &str,
        output_stem: &Path,
        platform: Platform,
    ) -> Result<(), SourceError> {
        let template = output_template(output_stem);

        info!("Downloading (attempt 1/2)...");
        if let Err(e) = self.download_with(url, &template, player_client(platform)) {
            warn!("Download failed: {}", e);
            debug!("{:?}", e);
            info!("Downloading (attempt 2/2)...");
            self.download_with(url, &template, IOS_CLIENT)?;
        }
        info!("Audio download complete");
        Ok(())
    }

    fn download_with(&self, url: &str, template: &str, client: &str) -> Result<(), SourceError> {
        self.run(&[
            "-x",
            "--audio-format",
            "mp3",
            "--audio-quality",
            "0",
            "-f",
            "bestaudio/best",
            "--no-playlist",
            "--no-warnings",
            "--extractor-args",
            client,
            "-o",
            template,
            url,
        ])?;
        Ok(())
    }

    fn run(&self, args: &[&str]) -> Result<Output, SourceError> {
        debug!("Running {} {}", self.program, args.join(" "));
        let output = Command::new(&self.program)
            .args(args)
            .output()
            .map_err(|source| SourceError::Spawn {
                program: self.program.clone(),
                source,
            })?;

        if !output.status.success() {
            return Err(SourceError::Process {
                program: self.program.clone(),
                status: output.status,
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }
        Ok(output)
    }
}

/// `-o` template for a fixed output path. A literal `%` must be doubled.
fn output_template(output_stem: &Path) -> String {
    format!("{}.%(ext)s", output_stem.display().to_string().replace('%', "%%"))
}

/// Parses newline-delimited `--dump-json` output.
pub fn parse_entries(stdout: &str) -> Vec<VideoInfo> {
    stdout
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .filter_map(|line| match serde_json::from_str::<VideoInfo>(line) {
            Ok(entry) => Some(entry),
            Err(e) => {
                debug!("Skipping unparseable yt-dlp line: {}", e);
                None
            }
        })
        .collect()
}
