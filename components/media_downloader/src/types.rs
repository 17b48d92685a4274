// components/media_downloader/src/types.rs
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use thiserror::Error;
use url::Url;

#[derive(Debug, Error)]
pub enum DownloadError {
    #[error("URL is empty")]
    EmptyUrl,

    #[error("Invalid quality '{quality}' for {format} (expected one of: {})", .format.valid_qualities().join(", "))]
    InvalidQuality {
        format: OutputFormat,
        quality: String,
    },

    #[error("Download failed: {0}")]
    BackendFetchFailure(String),

    #[error("{command} exited with {status}: {stderr}")]
    BackendProcessFailure {
        command: String,
        status: String,
        stderr: String,
    },

    #[error("FFmpeg unavailable: {0}")]
    FfmpegUnavailable(String),

    #[error("Required dependency not found: {0}")]
    DependencyNotFound(&'static str),

    #[error("A download is already in progress")]
    Busy,

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

#[derive(Debug, Error)]
#[error("unknown {kind} '{value}'")]
pub struct ParseEnumError {
    kind: &'static str,
    value: String,
}

/// Source platform selected for a download
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Platform {
    YouTube,
    Instagram,
    TikTok,
    Pinterest,
    Spotify,
}

impl Platform {
    pub const ALL: [Platform; 5] = [
        Platform::YouTube,
        Platform::Instagram,
        Platform::TikTok,
        Platform::Pinterest,
        Platform::Spotify,
    ];

    /// Guess the platform from the URL host
    pub fn detect(url: &str) -> Option<Self> {
        let url = Url::parse(url.trim()).ok()?;
        let host = url.host_str()?.to_ascii_lowercase();
        let host = host.strip_prefix("www.").unwrap_or(&host);

        let is_domain = |domain: &str| host == domain || host.ends_with(&format!(".{domain}"));

        if is_domain("youtube.com") || is_domain("youtu.be") || is_domain("youtube-nocookie.com") {
            Some(Platform::YouTube)
        } else if is_domain("instagram.com") {
            Some(Platform::Instagram)
        } else if is_domain("tiktok.com") {
            Some(Platform::TikTok)
        } else if is_domain("pin.it") || host.split('.').any(|label| label == "pinterest") {
            Some(Platform::Pinterest)
        } else if is_domain("spotify.com") {
            Some(Platform::Spotify)
        } else {
            None
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Platform::YouTube => "youtube",
            Platform::Instagram => "instagram",
            Platform::TikTok => "tiktok",
            Platform::Pinterest => "pinterest",
            Platform::Spotify => "spotify",
        }
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Platform::YouTube => "YouTube",
            Platform::Instagram => "Instagram",
            Platform::TikTok => "TikTok",
            Platform::Pinterest => "Pinterest",
            Platform::Spotify => "Spotify",
        };
        f.write_str(name)
    }
}

impl FromStr for Platform {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Platform::ALL
            .into_iter()
            .find(|p| p.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| ParseEnumError {
                kind: "platform",
                value: s.to_string(),
            })
    }
}

/// Container/codec the user wants to end up with
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    Mp3,
    Flac,
    Mp4,
}

impl OutputFormat {
    pub const FLAC_QUALITY: &'static str = "lossless";

    pub fn valid_qualities(&self) -> &'static [&'static str] {
        match self {
            OutputFormat::Mp3 => &["128", "192", "256", "320"],
            OutputFormat::Flac => &[Self::FLAC_QUALITY],
            OutputFormat::Mp4 => &["360p", "480p", "720p", "1080p"],
        }
    }

    pub fn default_quality(&self) -> &'static str {
        match self {
            OutputFormat::Mp3 => "320",
            OutputFormat::Flac => Self::FLAC_QUALITY,
            OutputFormat::Mp4 => "1080p",
        }
    }

    pub fn accepts_quality(&self, quality: &str) -> bool {
        self.valid_qualities().contains(&quality)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            OutputFormat::Mp3 => "mp3",
            OutputFormat::Flac => "flac",
            OutputFormat::Mp4 => "mp4",
        }
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.as_str().to_ascii_uppercase())
    }
}

impl FromStr for OutputFormat {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "mp3" => Ok(OutputFormat::Mp3),
            "flac" => Ok(OutputFormat::Flac),
            "mp4" => Ok(OutputFormat::Mp4),
            _ => Err(ParseEnumError {
                kind: "output format",
                value: s.to_string(),
            }),
        }
    }
}

/// One user-initiated download
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DownloadRequest {
    pub url: String,
    pub platform: Platform,
    pub playlist_mode: bool,
    pub output_format: OutputFormat,
    pub quality: String,
    pub output_dir: PathBuf,
}

impl DownloadRequest {
    /// Build a request, rejecting empty URLs and qualities the format does not offer
    pub fn new(
        url: impl Into<String>,
        platform: Platform,
        playlist_mode: bool,
        output_format: OutputFormat,
        quality: impl Into<String>,
        output_dir: impl Into<PathBuf>,
    ) -> Result<Self, DownloadError> {
        let request = Self {
            url: url.into().trim().to_string(),
            platform,
            playlist_mode,
            output_format,
            quality: quality.into(),
            output_dir: output_dir.into(),
        };
        request.validate()?;
        Ok(request)
    }

    pub fn validate(&self) -> Result<(), DownloadError> {
        if self.url.trim().is_empty() {
            return Err(DownloadError::EmptyUrl);
        }
        if !self.output_format.accepts_quality(&self.quality) {
            return Err(DownloadError::InvalidQuality {
                format: self.output_format,
                quality: self.quality.clone(),
            });
        }
        Ok(())
    }
}

/// Summary of a finished download
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DownloadReport {
    /// URL handed to the backend (mix parameters already stripped)
    pub url: String,
    pub platform: Platform,
    pub output_dir: PathBuf,
    pub was_mix: bool,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use rstest::rstest;

    #[rstest]
    #[case("https://www.youtube.com/watch?v=abc", Some(Platform::YouTube))]
    #[case("https://music.youtube.com/watch?v=abc", Some(Platform::YouTube))]
    #[case("https://youtu.be/abc", Some(Platform::YouTube))]
    #[case("https://www.instagram.com/reel/xyz/", Some(Platform::Instagram))]
    #[case("https://vm.tiktok.com/ZM123/", Some(Platform::TikTok))]
    #[case("https://pin.it/abc", Some(Platform::Pinterest))]
    #[case("https://www.pinterest.co.uk/pin/123/", Some(Platform::Pinterest))]
    #[case("https://open.spotify.com/track/4uLU6hMCjMI75M1A2tKUQC", Some(Platform::Spotify))]
    #[case("https://example.com/video", None)]
    #[case("not a url", None)]
    fn detects_platform_from_host(#[case] url: &str, #[case] expected: Option<Platform>) {
        assert_eq!(Platform::detect(url), expected);
    }

    #[test]
    fn lookalike_hosts_are_not_detected() {
        assert_eq!(Platform::detect("https://notyoutube.com/watch?v=abc"), None);
    }

    #[test]
    fn platform_parses_case_insensitively() {
        assert_eq!("YouTube".parse::<Platform>().unwrap(), Platform::YouTube);
        assert_eq!("SPOTIFY".parse::<Platform>().unwrap(), Platform::Spotify);
        assert!("vimeo".parse::<Platform>().is_err());
    }

    #[test]
    fn output_format_parses_and_displays() {
        let format: OutputFormat = "Flac".parse().unwrap();
        assert_eq!(format, OutputFormat::Flac);
        assert_eq!(format.to_string(), "FLAC");
        assert!("wav".parse::<OutputFormat>().is_err());
    }

    #[test]
    fn default_quality_is_always_valid() {
        for format in [OutputFormat::Mp3, OutputFormat::Flac, OutputFormat::Mp4] {
            assert!(format.accepts_quality(format.default_quality()));
        }
    }

    #[test]
    fn request_rejects_blank_url() {
        let result = DownloadRequest::new(
            "   ",
            Platform::YouTube,
            false,
            OutputFormat::Mp3,
            "320",
            "/tmp",
        );
        assert_matches!(result, Err(DownloadError::EmptyUrl));
    }

    #[test]
    fn request_rejects_quality_from_other_format() {
        let result = DownloadRequest::new(
            "https://youtu.be/abc",
            Platform::YouTube,
            false,
            OutputFormat::Mp3,
            "720p",
            "/tmp",
        );
        assert_matches!(
            result,
            Err(DownloadError::InvalidQuality { format: OutputFormat::Mp3, quality }) if quality == "720p"
        );
    }

    #[test]
    fn request_trims_url() {
        let request = DownloadRequest::new(
            "  https://youtu.be/abc \n",
            Platform::YouTube,
            false,
            OutputFormat::Flac,
            "lossless",
            "/tmp",
        )
        .unwrap();
        assert_eq!(request.url, "https://youtu.be/abc");
    }

    #[test]
    fn invalid_quality_message_lists_choices() {
        let error = DownloadError::InvalidQuality {
            format: OutputFormat::Mp4,
            quality: "4k".to_string(),
        };
        assert_eq!(
            error.to_string(),
            "Invalid quality '4k' for MP4 (expected one of: 360p, 480p, 720p, 1080p)"
        );
    }
}
