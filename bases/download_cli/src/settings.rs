// bases/download_cli/src/settings.rs
use color_eyre::Result;
use media_downloader::{DownloadRequest, OutputFormat, Platform};
use serde::{Deserialize, Serialize};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Choices remembered between runs
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub output_dir: Option<PathBuf>,
    pub platform: Option<Platform>,
    pub output_format: Option<OutputFormat>,
    pub quality: Option<String>,
    pub playlist_mode: bool,
}

impl Settings {
    /// Record the choices of a successful download
    pub fn remember(&mut self, request: &DownloadRequest) {
        self.output_dir = Some(request.output_dir.clone());
        self.platform = Some(request.platform);
        self.output_format = Some(request.output_format);
        self.quality = Some(request.quality.clone());
        self.playlist_mode = request.playlist_mode;
    }
}

/// JSON file holding [`Settings`]
pub struct SettingsStore {
    path: PathBuf,
}

impl SettingsStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// `<app dir>/settings.json`
    pub fn in_dir(dir: &Path) -> Self {
        Self::new(dir.join("settings.json"))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Missing or unreadable settings fall back to defaults
    pub fn load(&self) -> Settings {
        let text = match std::fs::read_to_string(&self.path) {
            Ok(text) => text,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                debug!("No settings at {}", self.path.display());
                return Settings::default();
            }
            Err(e) => {
                warn!("Could not read settings {}: {}", self.path.display(), e);
                return Settings::default();
            }
        };

        serde_json::from_str(&text).unwrap_or_else(|e| {
            warn!("Ignoring corrupt settings {}: {}", self.path.display(), e);
            Settings::default()
        })
    }

    pub fn save(&self, settings: &Settings) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(&self.path, serde_json::to_string_pretty(settings)?)?;
        Ok(())
    }
}
