use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{bail, Context, Result};
use clap::Parser;
use dialoguer::Select;
use tracing::{debug, info, warn};
use tracing_subscriber::EnvFilter;

use crate::config::{Config, PreferenceStore, Preferences};
use crate::core::batch::{self, JobDefaults};
use crate::core::cover::{CoverFetcher, Ffmpeg};
use crate::core::presenter::Presenter;
use crate::core::processor::Processor;
use crate::core::prompt::{InputLines, Prompter};
use crate::core::renamer;
use crate::core::resolver::Resolver;
use crate::models::{MediaRef, MetaRequest, ProviderKind, ResolvedMetadata, TrackJob, UNKNOWN};
use crate::sources::ytdlp::YtDlp;
use crate::sources::Providers;

#[derive(Parser)]
#[command(
    name = "ytmsd",
    version,
    about = "Download YouTube / YouTube Music audio as tagged MP3"
)]
pub struct Cli {
    /// Download URL, or a .csv file of `download_url,metadata_url,meta_source` rows
    #[arg(value_name = "INPUT", required_unless_present = "settings")]
    pub input: Option<String>,

    /// Metadata URL (same as --meta_link)
    #[arg(value_name = "METADATA_URL")]
    pub metadata_url: Option<String>,

    /// Metadata source: yt, ytm, mb or it
    #[arg(long, value_name = "SOURCE")]
    pub meta: Option<ProviderKind>,

    /// Exact track page to take metadata from
    #[arg(long = "meta_link", value_name = "URL")]
    pub meta_link: Option<String>,

    /// Selection countdown in seconds
    #[arg(long, value_name = "SECS")]
    pub timeout: Option<u64>,

    /// Output directory
    #[arg(long, short, value_name = "DIR", default_value = ".")]
    pub output: PathBuf,

    /// Verbose logging
    #[arg(long)]
    pub debug: bool,

    /// Choose which metadata sources are searched
    #[arg(long, conflicts_with_all = ["meta", "meta_link"])]
    pub settings: bool,
}

impl Cli {
    fn job_defaults(&self) -> JobDefaults {
        JobDefaults {
            metadata_url: self.meta_link.clone().or_else(|| self.metadata_url.clone()),
            provider: self.meta,
        }
    }
}

/// `RUST_LOG` overrides the level picked by `--debug`.
pub fn init_logging(debug: bool) {
    let level = if debug { "ytmsd=debug" } else { "ytmsd=info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .without_time()
        .init();
}

pub fn run(cli: Cli) -> Result<()> {
    let store = PreferenceStore::default_location()?;
    if cli.settings {
        return cmd_settings(&store);
    }
    let Some(input) = cli.input.as_deref() else {
        bail!("an INPUT URL or .csv file is required");
    };
    cmd_download(&cli, input, &store)
}

fn cmd_settings(store: &PreferenceStore) -> Result<()> {
    let mut config = store.load();

    loop {
        let mut items: Vec<String> = ProviderKind::SELECTABLE
            .iter()
            .map(|kind| {
                let state = if config.sources.is_enabled(*kind) {
                    "enabled"
                } else {
                    "disabled"
                };
                format!("{} ({}) [{}]", kind, kind.code(), state)
            })
            .collect();
        items.push("Save and exit".to_string());
        items.push("Exit without saving".to_string());

        let choice = Select::new()
            .with_prompt("Metadata sources (select one to toggle it)")
            .items(&items)
            .default(0)
            .interact()?;

        match ProviderKind::SELECTABLE.get(choice) {
            Some(kind) => config.sources = config.sources.toggle(*kind),
            None if choice == ProviderKind::SELECTABLE.len() => {
                store.save(&config)?;
                println!("Settings saved to {}", store.path().display());
                return Ok(());
            }
            None => {
                println!("Settings not saved.");
                return Ok(());
            }
        }
    }
}

fn cmd_download(cli: &Cli, input: &str, store: &PreferenceStore) -> Result<()> {
    let ytdlp = YtDlp::default();
    let version = ytdlp
        .version()
        .context("yt-dlp is required; install it and make sure it is on PATH")?;
    info!("Using yt-dlp {}", version);

    let ffmpeg = Ffmpeg::default();
    let ffmpeg = if ffmpeg.is_available() {
        Some(ffmpeg)
    } else {
        warn!("ffmpeg not found, YouTube thumbnails will be embedded uncropped");
        None
    };

    let jobs = jobs_for_input(input, &cli.job_defaults())?;
    if jobs.is_empty() {
        warn!("Nothing to download");
        return Ok(());
    }

    let config = store.load();
    let timeout = Duration::from_secs(cli.timeout.unwrap_or(config.timeout));
    let providers = Providers::new(ytdlp.clone(), &config.cover_size)?;
    let mut presenter = Presenter::new(Prompter::new(InputLines::stdin(), timeout)?);
    let covers = CoverFetcher::new()?;
    let processor = Processor::new(&ytdlp, &covers, ffmpeg.as_ref());

    let mut session = Session {
        ytdlp: &ytdlp,
        providers: &providers,
        config: &config,
        presenter: &mut presenter,
        processor: &processor,
        output: &cli.output,
    };

    let mut failed = 0;
    for (i, job) in jobs.iter().enumerate() {
        println!("\n=== [{}/{}] {} ===", i + 1, jobs.len(), job.download_url);
        match session.run_job(job) {
            Ok(0) => {}
            Ok(n) => failed += n,
            Err(e) => {
                warn!("Track failed: {:#}", e);
                failed += 1;
            }
        }
    }

    if failed > 0 {
        warn!("Finished with {} failed track(s)", failed);
    } else {
        info!("All done");
    }
    Ok(())
}

/// A `.csv` file yields its rows; anything else must be a download URL.
fn jobs_for_input(input: &str, defaults: &JobDefaults) -> Result<Vec<TrackJob>> {
    if input.to_ascii_lowercase().ends_with(".csv") {
        return batch::load_jobs(Path::new(input), defaults);
    }
    let media = MediaRef::parse(input)?;
    Ok(vec![defaults.job(&media.url)])
}

/// Everything one download run shares across jobs.
struct Session<'a> {
    ytdlp: &'a YtDlp,
    providers: &'a Providers,
    config: &'a Config,
    presenter: &'a mut Presenter,
    processor: &'a Processor<'a>,
    output: &'a Path,
}

impl Session<'_> {
    /// Returns how many entries of the job failed. A playlist entry failure
    /// does not stop the remaining entries.
    fn run_job(&mut self, job: &TrackJob) -> Result<usize> {
        let media = MediaRef::parse(&job.download_url)?;
        match &media.video_id {
            Some(id) => debug!("Video id {}", id),
            None => debug!("No video id in {}, expecting a playlist", media.url),
        }
        let entries = self
            .ytdlp
            .inspect(&media)
            .context("could not fetch video info")?;
        if entries.is_empty() {
            bail!("yt-dlp returned no entries for {}", media.url);
        }

        info!("{} link", media.platform.label());
        let is_playlist = entries.len() > 1;
        let dir = if is_playlist {
            info!("Playlist with {} entries", entries.len());
            renamer::playlist_dir(self.output, entries[0].playlist_title.as_deref())
        } else {
            self.output.to_path_buf()
        };
        if is_playlist && job.metadata_url.is_some() {
            warn!("A metadata URL names one track, ignoring it for the playlist");
        }

        let prefs: Preferences = self.config.sources;
        let mut resolver = Resolver::new(self.providers, prefs, self.presenter);
        let mut failed = 0;

        for (i, video) in entries.iter().enumerate() {
            if is_playlist {
                println!("\n--- {}/{}: {} ---", i + 1, entries.len(), video.display_title());
            }
            let entry = media.for_entry(video);
            let request = MetaRequest {
                media: entry.clone(),
                metadata_url: job.metadata_url.clone().filter(|_| !is_playlist),
                provider: job.provider,
                query: None,
            };

            let metadata = resolver.resolve(&request, video);
            print_metadata(&metadata);

            if let Err(e) = self.processor.process(&entry, video, &metadata, &dir) {
                warn!("Failed to process {}: {:#}", video.display_title(), e);
                failed += 1;
            }
        }
        Ok(failed)
    }
}

fn print_metadata(metadata: &ResolvedMetadata) {
    let result = &metadata.result;
    println!("\nUsing metadata from {}:", result.source);
    println!("  Title:  {}", result.title);
    println!("  Artist: {}", result.artist);
    println!("  Album:  {}", result.album.as_deref().unwrap_or(UNKNOWN));
    match result.year() {
        Some(year) => println!("  Year:   {}", year),
        None => println!("  Year:   {}", UNKNOWN),
    }
    if metadata.needs_crop {
        println!("  Cover:  YouTube thumbnail (cropped)");
    }
}
