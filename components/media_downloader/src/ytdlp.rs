// components/media_downloader/src/ytdlp.rs
use crate::options::{BackendOptions, PostProcessorKind};
use crate::progress::{ProgressStatus, ProgressTracker};
use crate::types::DownloadError;
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use tokio::io::{AsyncBufReadExt, AsyncReadExt, BufReader};
use tokio::process::Command;
use tracing::{debug, info};

/// Marker yt-dlp prepends to every progress line we ask it for
const PROGRESS_PREFIX: &str = "easydl-progress";

const PROGRESS_TEMPLATE: &str = "download:easydl-progress %(progress.status)s \
%(progress.downloaded_bytes)s %(progress.total_bytes)s %(progress.total_bytes_estimate)s";

/// Generic media-fetch backend
#[async_trait]
pub trait Downloader {
    /// Check if the backend executable is installed
    async fn check_available(&self) -> Result<(), DownloadError>;

    /// Fetch `url` according to `options`, reporting progress as it goes
    async fn download(
        &self,
        url: &str,
        options: &BackendOptions,
        ffmpeg: Option<&Path>,
        progress: &mut ProgressTracker,
    ) -> Result<(), DownloadError>;
}

pub struct YtDlp {
    program: PathBuf,
}

impl Default for YtDlp {
    fn default() -> Self {
        Self::with_program("yt-dlp")
    }
}

impl YtDlp {
    pub fn with_program(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
        }
    }

    /// Command line arguments equivalent to `options`
    pub fn command_args(url: &str, options: &BackendOptions, ffmpeg: Option<&Path>) -> Vec<String> {
        let mut args = vec![
            "--newline".to_string(),
            "--progress-template".to_string(),
            PROGRESS_TEMPLATE.to_string(),
            "-o".to_string(),
            options.output_template.clone(),
        ];

        args.push(if options.no_playlist { "--no-playlist" } else { "--yes-playlist" }.to_string());
        args.push("-f".to_string());
        args.push(options.format_selector.clone());

        for pp in &options.post_processors {
            match pp.kind {
                PostProcessorKind::ExtractAudio => {
                    args.push("-x".to_string());
                    args.push("--audio-format".to_string());
                    args.push(pp.codec.clone());
                    args.push("--audio-quality".to_string());
                    args.push(pp.quality.clone());
                }
            }
        }

        // The directory, so yt-dlp also finds ffprobe next to ffmpeg
        if let Some(ffmpeg) = ffmpeg {
            let dir = ffmpeg
                .parent()
                .filter(|dir| !dir.as_os_str().is_empty())
                .unwrap_or(ffmpeg);
            args.push("--ffmpeg-location".to_string());
            args.push(dir.to_string_lossy().into_owned());
        }

        args.push("--".to_string());
        args.push(url.to_string());
        args
    }
}

#[async_trait]
impl Downloader for YtDlp {
    async fn check_available(&self) -> Result<(), DownloadError> {
        which::which(&self.program)
            .map(|_| ())
            .map_err(|_| DownloadError::DependencyNotFound("yt-dlp"))
    }

    async fn download(
        &self,
        url: &str,
        options: &BackendOptions,
        ffmpeg: Option<&Path>,
        progress: &mut ProgressTracker,
    ) -> Result<(), DownloadError> {
        let args = Self::command_args(url, options, ffmpeg);
        info!("Running {} {}", self.program.display(), args.join(" "));

        let mut child = Command::new(&self.program)
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()?;

        let stdout = child.stdout.take().ok_or_else(|| {
            DownloadError::BackendFetchFailure("yt-dlp stdout was not captured".to_string())
        })?;
        let mut stderr = child.stderr.take().ok_or_else(|| {
            DownloadError::BackendFetchFailure("yt-dlp stderr was not captured".to_string())
        })?;

        let stderr_task = tokio::spawn(async move {
            let mut buf = Vec::new();
            let _ = stderr.read_to_end(&mut buf).await;
            String::from_utf8_lossy(&buf).into_owned()
        });

        // Titles arrive in the console code page, not necessarily UTF-8
        let mut lines = BufReader::new(stdout).split(b'\n');
        while let Some(raw) = lines.next_segment().await? {
            let line = String::from_utf8_lossy(&raw);
            match parse_progress_line(&line) {
                Some(status) => progress.observe(status).await,
                None => debug!("yt-dlp: {}", line),
            }
        }

        let status = child.wait().await?;
        let stderr = stderr_task.await.unwrap_or_default();

        if !status.success() {
            return Err(DownloadError::BackendFetchFailure(error_text(
                &stderr,
                &status.to_string(),
            )));
        }

        Ok(())
    }
}

/// Parse one of our templated progress lines
pub fn parse_progress_line(line: &str) -> Option<ProgressStatus> {
    let rest = line.trim().strip_prefix(PROGRESS_PREFIX)?;
    let fields: Vec<&str> = rest.split_whitespace().collect();

    match fields.first().copied()? {
        "downloading" => {
            let downloaded = fields.get(1).and_then(|f| parse_bytes(f)).unwrap_or(0);
            let total = fields
                .get(2)
                .and_then(|f| parse_bytes(f))
                .filter(|&total| total > 0)
                .or_else(|| fields.get(3).and_then(|f| parse_bytes(f)));
            Some(ProgressStatus::Downloading { downloaded, total })
        }
        "finished" => Some(ProgressStatus::Finished),
        _ => None,
    }
}

/// yt-dlp prints `NA` for missing values and floats for estimates
fn parse_bytes(field: &str) -> Option<u64> {
    let value: f64 = field.parse().ok()?;
    (value.is_finite() && value >= 0.0).then(|| value as u64)
}

/// The `ERROR:` lines yt-dlp wrote, or its last words
fn error_text(stderr: &str, status: &str) -> String {
    let errors: Vec<&str> = stderr
        .lines()
        .map(str::trim)
        .filter(|line| line.starts_with("ERROR:"))
        .collect();

    if !errors.is_empty() {
        return errors.join("\n");
    }

    stderr
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .last()
        .map(str::to_string)
        .unwrap_or_else(|| format!("yt-dlp exited with {status}"))
}

#[cfg(test)]
pub mod stub {
    use super::*;
    use std::sync::Mutex;

    /// Records what it was asked to fetch and replays scripted statuses
    #[derive(Default)]
    pub struct DownloaderStub {
        pub statuses: Vec<ProgressStatus>,
        pub failure: Option<String>,
        pub calls: Mutex<Vec<(String, BackendOptions, Option<PathBuf>)>>,
    }

    impl DownloaderStub {
        pub fn with_statuses(statuses: Vec<ProgressStatus>) -> Self {
            Self {
                statuses,
                ..Default::default()
            }
        }

        pub fn failing(message: &str) -> Self {
            Self {
                failure: Some(message.to_string()),
                ..Default::default()
            }
        }
    }

    #[async_trait]
    impl Downloader for DownloaderStub {
        async fn check_available(&self) -> Result<(), DownloadError> {
            Ok(())
        }

        async fn download(
            &self,
            url: &str,
            options: &BackendOptions,
            ffmpeg: Option<&Path>,
            progress: &mut ProgressTracker,
        ) -> Result<(), DownloadError> {
            self.calls.lock().unwrap().push((
                url.to_string(),
                options.clone(),
                ffmpeg.map(Path::to_path_buf),
            ));
            for status in &self.statuses {
                progress.observe(*status).await;
            }
            match &self.failure {
                Some(message) => Err(DownloadError::BackendFetchFailure(message.clone())),
                None => Ok(()),
            }
        }
    }
}
