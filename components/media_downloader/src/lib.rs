// components/media_downloader/src/lib.rs
mod ffmpeg;
mod mix;
mod options;
mod plan;
mod progress;
mod spotdl;
mod types;
mod worker;
mod ytdlp;

use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;

pub use ffmpeg::{
    ffmpeg_executable_name, ArchiveFetcher, FfmpegLocation, FfmpegProvisioner, FfmpegSource,
    HttpFetcher, ProvisionStrategy, FFMPEG_ARCHIVE_URL, FFMPEG_CHECKSUM_URL,
    SPOTDL_FFMPEG_TIMEOUT,
};
pub use mix::{is_mix_url, normalize, strip_mix_parameters, NormalizedUrl};
pub use options::{build_options, BackendOptions, PostProcessor, PostProcessorKind};
pub use plan::{plan, DownloadPlan};
pub use progress::{fraction_done, DownloadEvent, ProgressStatus, ProgressTracker};
pub use spotdl::{SpotDl, SpotifyDownloader};
pub use types::{
    DownloadError, DownloadReport, DownloadRequest, OutputFormat, ParseEnumError, Platform,
};
pub use worker::{DownloadGate, DownloadHandle, GateGuard};
pub use ytdlp::{Downloader, YtDlp};

use worker::Job;

pub struct MediaDownloader {
    downloader: Arc<dyn Downloader + Send + Sync>,
    spotify: Arc<dyn SpotifyDownloader + Send + Sync>,
    ffmpeg: Option<PathBuf>,
    gate: DownloadGate,
}

impl Default for MediaDownloader {
    fn default() -> Self {
        Self::new()
    }
}

impl MediaDownloader {
    /// Create a MediaDownloader backed by the `yt-dlp` and `spotdl` executables
    pub fn new() -> Self {
        Self::new_with_backends(Arc::new(YtDlp::default()), Arc::new(SpotDl::default()))
    }

    /// Create a MediaDownloader with specific backend implementations
    pub fn new_with_backends(
        downloader: Arc<dyn Downloader + Send + Sync>,
        spotify: Arc<dyn SpotifyDownloader + Send + Sync>,
    ) -> Self {
        Self {
            downloader,
            spotify,
            ffmpeg: None,
            gate: DownloadGate::default(),
        }
    }

    /// FFmpeg executable handed to the media backend for conversions
    pub fn with_ffmpeg(mut self, ffmpeg: Option<PathBuf>) -> Self {
        self.ffmpeg = ffmpeg;
        self
    }

    pub fn is_busy(&self) -> bool {
        self.gate.is_busy()
    }

    /// Validate and dispatch a request, then run it on a background task.
    ///
    /// Fails immediately with `Busy` while another download runs, and with
    /// `EmptyUrl`/`InvalidQuality` before any backend is touched.
    pub fn start(&self, request: DownloadRequest) -> Result<DownloadHandle, DownloadError> {
        let guard = self.gate.try_acquire()?;
        let plan = plan(&request)?;

        info!(
            "Starting {} download ({} {}) from {}",
            request.platform,
            request.output_format,
            request.quality,
            plan.url()
        );

        let job = Job {
            plan,
            platform: request.platform,
            output_dir: request.output_dir,
            downloader: Arc::clone(&self.downloader),
            spotify: Arc::clone(&self.spotify),
            ffmpeg: self.ffmpeg.clone(),
        };
        Ok(job.spawn(guard))
    }

    /// Start a download and wait for it to finish
    pub async fn download(
        &self,
        request: DownloadRequest,
        on_progress: impl FnMut(f64),
    ) -> Result<DownloadReport, DownloadError> {
        self.start(request)?.wait(on_progress).await
    }
}
