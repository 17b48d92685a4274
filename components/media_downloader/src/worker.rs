// components/media_downloader/src/worker.rs
use crate::plan::DownloadPlan;
use crate::progress::{DownloadEvent, ProgressTracker};
use crate::spotdl::SpotifyDownloader;
use crate::types::{DownloadError, DownloadReport, Platform};
use crate::ytdlp::Downloader;
use chrono::Utc;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{info, warn};

pub const EVENT_CHANNEL_CAPACITY: usize = 32;

/// Allows at most one download at a time
#[derive(Debug, Clone, Default)]
pub struct DownloadGate {
    busy: Arc<AtomicBool>,
}

impl DownloadGate {
    pub fn try_acquire(&self) -> Result<GateGuard, DownloadError> {
        self.busy
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .map_err(|_| DownloadError::Busy)?;
        Ok(GateGuard {
            busy: Arc::clone(&self.busy),
        })
    }

    pub fn is_busy(&self) -> bool {
        self.busy.load(Ordering::Acquire)
    }
}

/// Reopens the gate when dropped, whatever way the job ended
#[derive(Debug)]
pub struct GateGuard {
    busy: Arc<AtomicBool>,
}

impl Drop for GateGuard {
    fn drop(&mut self) {
        self.busy.store(false, Ordering::Release);
    }
}

/// Receiving end of a running download
#[derive(Debug)]
pub struct DownloadHandle {
    events: mpsc::Receiver<DownloadEvent>,
    task: JoinHandle<()>,
}

impl DownloadHandle {
    pub async fn next_event(&mut self) -> Option<DownloadEvent> {
        self.events.recv().await
    }

    /// Drain events until the job completes, passing progress to `on_progress`
    pub async fn wait(
        mut self,
        mut on_progress: impl FnMut(f64),
    ) -> Result<DownloadReport, DownloadError> {
        while let Some(event) = self.events.recv().await {
            match event {
                DownloadEvent::Progress(value) => on_progress(value),
                DownloadEvent::Completed(result) => return result,
            }
        }

        // The channel only closes early if the worker died
        let reason = match self.task.await {
            Err(e) => format!("download worker failed: {e}"),
            Ok(()) => "download worker ended without a result".to_string(),
        };
        Err(DownloadError::BackendFetchFailure(reason))
    }
}

/// Everything a worker needs, moved into its task
pub(crate) struct Job {
    pub plan: DownloadPlan,
    pub platform: Platform,
    pub output_dir: PathBuf,
    pub downloader: Arc<dyn Downloader + Send + Sync>,
    pub spotify: Arc<dyn SpotifyDownloader + Send + Sync>,
    pub ffmpeg: Option<PathBuf>,
}

impl Job {
    pub fn spawn(self, guard: GateGuard) -> DownloadHandle {
        let (tx, rx) = mpsc::channel(EVENT_CHANNEL_CAPACITY);

        let task = tokio::spawn(async move {
            let mut tracker = ProgressTracker::new(tx.clone());
            let result = self.run(&mut tracker).await;
            if result.is_ok() {
                tracker.finish().await;
            }
            if let Err(e) = &result {
                warn!("Download failed: {}", e);
            }
            drop(guard);
            let _ = tx.send(DownloadEvent::Completed(result)).await;
        });

        DownloadHandle { events: rx, task }
    }

    async fn run(&self, tracker: &mut ProgressTracker) -> Result<DownloadReport, DownloadError> {
        let started_at = Utc::now();
        tokio::fs::create_dir_all(&self.output_dir).await?;

        match &self.plan {
            DownloadPlan::Spotify { url, output_dir } => {
                self.spotify.check_available().await?;
                self.spotify.download(url, output_dir).await?;
            }
            DownloadPlan::Media { url, options } => {
                if url.was_mix {
                    info!("Mix playlist detected, downloading only {}", url.clean_url);
                }
                self.downloader.check_available().await?;
                self.downloader
                    .download(&url.clean_url, options, self.ffmpeg.as_deref(), tracker)
                    .await?;
            }
        }

        let output_dir =
            dunce::canonicalize(&self.output_dir).unwrap_or_else(|_| self.output_dir.clone());

        Ok(DownloadReport {
            url: self.plan.url().to_string(),
            platform: self.platform,
            output_dir,
            was_mix: self.plan.was_mix(),
            started_at,
            finished_at: Utc::now(),
        })
    }
}
