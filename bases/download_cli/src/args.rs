// bases/download_cli/src/args.rs
use clap::{Args, Parser, Subcommand};
use media_downloader::{OutputFormat, Platform};
use std::path::PathBuf;

/// Download audio and video from YouTube, Instagram, TikTok, Pinterest and Spotify
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Download media from a URL
    Download(DownloadArgs),

    /// Locate FFmpeg, installing a private copy if none is found
    Ffmpeg,

    /// Show the saved settings
    Settings,
}

#[derive(Args, Debug, Clone, Default)]
pub struct DownloadArgs {
    /// URL to download from
    pub url: String,

    /// Directory to store downloaded files
    #[arg(short, long)]
    pub output_dir: Option<PathBuf>,

    /// Source platform (youtube, instagram, tiktok, pinterest, spotify); detected from the URL when omitted
    #[arg(short, long)]
    pub platform: Option<Platform>,

    /// Output format (mp3, flac, mp4)
    #[arg(short, long)]
    pub format: Option<OutputFormat>,

    /// Quality: 128/192/256/320 for mp3, lossless for flac, 360p/480p/720p/1080p for mp4
    #[arg(short, long)]
    pub quality: Option<String>,

    /// Download the whole playlist instead of a single item
    #[arg(long)]
    pub playlist: bool,

    /// Download a single item even if playlist mode was saved
    #[arg(long, conflicts_with = "playlist")]
    pub single: bool,

    /// Show what would be run without downloading anything
    #[arg(long)]
    pub dry_run: bool,

    /// Do not look for or install FFmpeg before downloading
    #[arg(long)]
    pub no_ffmpeg: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_download_flags() {
        let cli = Cli::parse_from([
            "download-cli",
            "download",
            "https://youtu.be/abc",
            "-f",
            "MP3",
            "-q",
            "192",
            "--playlist",
            "-v",
        ]);

        assert!(cli.verbose);
        match cli.command {
            Commands::Download(args) => {
                assert_eq!(args.url, "https://youtu.be/abc");
                assert_eq!(args.format, Some(OutputFormat::Mp3));
                assert_eq!(args.quality.as_deref(), Some("192"));
                assert!(args.playlist);
                assert_eq!(args.platform, None);
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn rejects_unknown_platform() {
        let result = Cli::try_parse_from([
            "download-cli",
            "download",
            "https://vimeo.com/1",
            "--platform",
            "vimeo",
        ]);
        assert!(result.is_err());
    }

    #[test]
    fn playlist_and_single_conflict() {
        let result = Cli::try_parse_from([
            "download-cli",
            "download",
            "https://youtu.be/abc",
            "--playlist",
            "--single",
        ]);
        assert!(result.is_err());
    }
}
