// components/media_downloader/src/options.rs
use crate::types::{DownloadError, DownloadRequest, OutputFormat};
use serde::Serialize;

/// Output naming understood by the backend; kept verbatim
pub const OUTPUT_TEMPLATE_NAME: &str = "%(title)s.%(ext)s";

pub const AUDIO_FORMAT_SELECTOR: &str = "bestaudio/best";

/// Backend convention for best quality of a lossless codec
pub const LOSSLESS_AUDIO_QUALITY: &str = "0";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum PostProcessorKind {
    ExtractAudio,
}

/// Conversion step applied by the backend after fetching
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PostProcessor {
    pub kind: PostProcessorKind,
    pub codec: String,
    pub quality: String,
}

impl PostProcessor {
    pub fn extract_audio(codec: impl Into<String>, quality: impl Into<String>) -> Self {
        Self {
            kind: PostProcessorKind::ExtractAudio,
            codec: codec.into(),
            quality: quality.into(),
        }
    }
}

/// Everything the media-fetch backend needs besides the URL
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BackendOptions {
    pub output_template: String,
    pub no_playlist: bool,
    pub format_selector: String,
    pub post_processors: Vec<PostProcessor>,
}

/// Derive backend options from a request.
///
/// `mix_detected` forces single-item mode regardless of the requested
/// playlist mode.
pub fn build_options(
    req: &DownloadRequest,
    mix_detected: bool,
) -> Result<BackendOptions, DownloadError> {
    if !req.output_format.accepts_quality(&req.quality) {
        return Err(DownloadError::InvalidQuality {
            format: req.output_format,
            quality: req.quality.clone(),
        });
    }

    let output_template = req
        .output_dir
        .join(OUTPUT_TEMPLATE_NAME)
        .to_string_lossy()
        .into_owned();
    let no_playlist = !req.playlist_mode || mix_detected;

    let (format_selector, post_processors) = match req.output_format {
        OutputFormat::Mp3 => (
            AUDIO_FORMAT_SELECTOR.to_string(),
            vec![PostProcessor::extract_audio("mp3", req.quality.as_str())],
        ),
        OutputFormat::Flac => (
            AUDIO_FORMAT_SELECTOR.to_string(),
            vec![PostProcessor::extract_audio("flac", LOSSLESS_AUDIO_QUALITY)],
        ),
        OutputFormat::Mp4 => {
            let height = req.quality.trim_end_matches('p');
            (
                format!("bestvideo[height<={height}]+bestaudio/best[height<={height}]/best"),
                Vec::new(),
            )
        }
    };

    Ok(BackendOptions {
        output_template,
        no_playlist,
        format_selector,
        post_processors,
    })
}
