use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::error::CorruptPreferences;
use crate::models::ProviderKind;

const CONFIG_FILE_NAME: &str = ".ytmsd_config.json";

/// Contents of `~/.ytmsd_config.json`. Unknown keys are ignored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub sources: Preferences,
    /// Selection countdown in seconds.
    #[serde(default = "default_timeout")]
    pub timeout: u64,
    /// Size requested for iTunes artwork.
    #[serde(default = "default_cover_size")]
    pub cover_size: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            sources: Preferences::default(),
            timeout: default_timeout(),
            cover_size: default_cover_size(),
        }
    }
}

fn default_timeout() -> u64 {
    10
}

fn default_cover_size() -> String {
    "600x600".to_string()
}

fn enabled() -> bool {
    true
}

/// Which providers are queried when no override is given.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Preferences {
    #[serde(default = "enabled")]
    pub youtube_music: bool,
    #[serde(default = "enabled")]
    pub musicbrainz: bool,
    #[serde(default)]
    pub itunes: bool,
}

impl Default for Preferences {
    fn default() -> Self {
        Self {
            youtube_music: true,
            musicbrainz: true,
            itunes: false,
        }
    }
}

impl Preferences {
    /// YouTube is the fallback and is never "enabled" as a candidate source.
    pub fn is_enabled(&self, kind: ProviderKind) -> bool {
        match kind {
            ProviderKind::YouTube => false,
            ProviderKind::YouTubeMusic => self.youtube_music,
            ProviderKind::MusicBrainz => self.musicbrainz,
            ProviderKind::ITunes => self.itunes,
        }
    }

    pub fn toggle(mut self, kind: ProviderKind) -> Self {
        match kind {
            ProviderKind::YouTube => {}
            ProviderKind::YouTubeMusic => self.youtube_music = !self.youtube_music,
            ProviderKind::MusicBrainz => self.musicbrainz = !self.musicbrainz,
            ProviderKind::ITunes => self.itunes = !self.itunes,
        }
        self
    }

    /// Enabled providers in query order.
    pub fn enabled(&self) -> Vec<ProviderKind> {
        ProviderKind::SELECTABLE
            .into_iter()
            .filter(|kind| self.is_enabled(*kind))
            .collect()
    }
}

/// Reads and writes the config file.
pub struct PreferenceStore {
    path: PathBuf,
}

impl PreferenceStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// `~/.ytmsd_config.json`
    pub fn default_location() -> Result<Self> {
        let home = dirs::home_dir().context("could not determine the home directory")?;
        Ok(Self::new(home.join(CONFIG_FILE_NAME)))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Loads the config. A missing, unreadable or corrupt file yields the defaults.
    pub fn load(&self) -> Config {
        match self.try_load() {
            Ok(Some(config)) => config,
            Ok(None) => {
                info!("No configuration at {}, using defaults", self.path.display());
                Config::default()
            }
            Err(e) => {
                warn!("{:#}, using defaults", e);
                Config::default()
            }
        }
    }

    fn try_load(&self) -> Result<Option<Config>> {
        if !self.path.exists() {
            return Ok(None);
        }
        let content = std::fs::read_to_string(&self.path)
            .with_context(|| format!("could not read {}", self.path.display()))?;
        let config = serde_json::from_str(&content).map_err(|source| CorruptPreferences {
            path: self.path.clone(),
            source,
        })?;
        Ok(Some(config))
    }

    pub fn save(&self, config: &Config) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = serde_json::to_string_pretty(config)?;
        std::fs::write(&self.path, content)
            .with_context(|| format!("could not write {}", self.path.display()))?;
        info!("Configuration saved to {}", self.path.display());
        Ok(())
    }
}
