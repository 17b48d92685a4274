// bases/download_cli/src/config.rs
use crate::args::DownloadArgs;
use crate::settings::Settings;
use media_downloader::{DownloadError, DownloadRequest, OutputFormat, Platform};
use std::path::PathBuf;

/// Directory holding settings and the private FFmpeg install
pub fn app_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("EasyDownload")
}

pub fn default_output_dir() -> PathBuf {
    dirs::download_dir().unwrap_or_else(|| PathBuf::from("Downloads"))
}

/// Resolved download configuration
#[derive(Debug, Clone)]
pub struct Config {
    pub request: DownloadRequest,

    /// Print the plan instead of downloading
    pub dry_run: bool,

    /// Locate or install FFmpeg before handing off to the media backend
    pub provision_ffmpeg: bool,
}

impl Config {
    /// Merge CLI flags over saved settings over defaults
    pub fn from_args(
        args: DownloadArgs,
        settings: &Settings,
        default_output_dir: PathBuf,
    ) -> Result<Self, DownloadError> {
        let platform = args
            .platform
            .or_else(|| Platform::detect(&args.url))
            .or(settings.platform)
            .unwrap_or(Platform::YouTube);

        let output_format = args
            .format
            .or(settings.output_format)
            .unwrap_or(OutputFormat::Mp4);

        // A saved quality only applies to the format it was saved for
        let quality = args
            .quality
            .or_else(|| {
                settings
                    .quality
                    .clone()
                    .filter(|q| output_format.accepts_quality(q))
            })
            .unwrap_or_else(|| output_format.default_quality().to_string());

        let playlist_mode = if args.playlist {
            true
        } else if args.single {
            false
        } else {
            settings.playlist_mode
        };

        let output_dir = args
            .output_dir
            .or_else(|| settings.output_dir.clone())
            .unwrap_or(default_output_dir);

        let request = DownloadRequest::new(
            args.url,
            platform,
            playlist_mode,
            output_format,
            quality,
            output_dir,
        )?;

        Ok(Self {
            provision_ffmpeg: !args.no_ffmpeg && platform != Platform::Spotify,
            dry_run: args.dry_run,
            request,
        })
    }
}
