// components/media_downloader/src/progress.rs
use crate::types::{DownloadError, DownloadReport};
use tokio::sync::mpsc;

/// Highest value reported before the backend signals completion
pub const MAX_INTERMEDIATE_PROGRESS: f64 = 0.99;

/// Messages from the download worker to whoever drives the UI
#[derive(Debug)]
pub enum DownloadEvent {
    /// Fraction done, in `[0.0, 1.0]`
    Progress(f64),
    /// Always the last event of a job
    Completed(Result<DownloadReport, DownloadError>),
}

/// Raw status reported by a backend while it works
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ProgressStatus {
    Downloading { downloaded: u64, total: Option<u64> },
    Finished,
}

/// Turns backend statuses into clamped progress events.
///
/// A backend `finished` only closes one stream (video and audio are fetched
/// separately), so it is held at `0.99`. `1.0` comes from [`finish`] alone,
/// exactly once; after that the tracker ignores further statuses.
///
/// [`finish`]: ProgressTracker::finish
pub struct ProgressTracker {
    events: mpsc::Sender<DownloadEvent>,
    last: Option<f64>,
    completed: bool,
}

impl ProgressTracker {
    pub fn new(events: mpsc::Sender<DownloadEvent>) -> Self {
        Self {
            events,
            last: None,
            completed: false,
        }
    }

    pub fn is_completed(&self) -> bool {
        self.completed
    }

    pub async fn observe(&mut self, status: ProgressStatus) {
        if self.completed {
            return;
        }
        match status {
            ProgressStatus::Downloading { downloaded, total } => {
                if let Some(fraction) = fraction_done(downloaded, total) {
                    self.emit(fraction).await;
                }
            }
            ProgressStatus::Finished => self.emit(MAX_INTERMEDIATE_PROGRESS).await,
        }
    }

    /// Emit the terminal `1.0`; called once the whole job has succeeded
    pub async fn finish(&mut self) {
        if !self.completed {
            self.completed = true;
            self.emit(1.0).await;
        }
    }

    async fn emit(&mut self, value: f64) {
        if self.last == Some(value) {
            return;
        }
        self.last = Some(value);
        // A dropped receiver just means nobody is watching any more
        let _ = self.events.send(DownloadEvent::Progress(value)).await;
    }
}

/// `downloaded / total` clamped to `[0, 0.99]`; `None` without a usable total
pub fn fraction_done(downloaded: u64, total: Option<u64>) -> Option<f64> {
    let total = total.filter(|&t| t > 0)?;
    let fraction = downloaded as f64 / total as f64;
    Some(fraction.clamp(0.0, MAX_INTERMEDIATE_PROGRESS))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn drain(rx: &mut mpsc::Receiver<DownloadEvent>) -> Vec<f64> {
        let mut values = Vec::new();
        while let Ok(event) = rx.try_recv() {
            if let DownloadEvent::Progress(value) = event {
                values.push(value);
            }
        }
        values
    }

    #[test]
    fn fraction_is_clamped_below_one() {
        assert_eq!(fraction_done(50, Some(100)), Some(0.5));
        assert_eq!(fraction_done(99, Some(100)), Some(0.99));
        assert_eq!(fraction_done(100, Some(100)), Some(0.99));
        assert_eq!(fraction_done(150, Some(100)), Some(0.99));
    }

    #[test]
    fn unknown_total_reports_nothing() {
        assert_eq!(fraction_done(10, None), None);
        assert_eq!(fraction_done(10, Some(0)), None);
    }

    #[tokio::test]
    async fn holds_at_099_until_finished() {
        let (tx, mut rx) = mpsc::channel(16);
        let mut tracker = ProgressTracker::new(tx);

        tracker
            .observe(ProgressStatus::Downloading { downloaded: 25, total: Some(100) })
            .await;
        tracker
            .observe(ProgressStatus::Downloading { downloaded: 100, total: Some(100) })
            .await;
        tracker
            .observe(ProgressStatus::Downloading { downloaded: 10, total: None })
            .await;
        assert!(!tracker.is_completed());

        tracker.observe(ProgressStatus::Finished).await;
        assert!(!tracker.is_completed());

        tracker.finish().await;

        assert_eq!(drain(&mut rx), vec![0.25, 0.99, 1.0]);
        assert!(tracker.is_completed());
    }

    #[tokio::test]
    async fn stream_finish_is_not_job_completion() {
        let (tx, mut rx) = mpsc::channel(16);
        let mut tracker = ProgressTracker::new(tx);

        // video stream, then audio stream
        tracker
            .observe(ProgressStatus::Downloading { downloaded: 50, total: Some(100) })
            .await;
        tracker.observe(ProgressStatus::Finished).await;
        tracker
            .observe(ProgressStatus::Downloading { downloaded: 10, total: Some(100) })
            .await;
        tracker.observe(ProgressStatus::Finished).await;
        assert!(!tracker.is_completed());

        tracker.finish().await;

        assert_eq!(drain(&mut rx), vec![0.5, 0.99, 0.1, 0.99, 1.0]);
    }

    #[tokio::test]
    async fn terminal_value_is_emitted_once() {
        let (tx, mut rx) = mpsc::channel(16);
        let mut tracker = ProgressTracker::new(tx);

        tracker.observe(ProgressStatus::Finished).await;
        tracker.finish().await;
        tracker
            .observe(ProgressStatus::Downloading { downloaded: 1, total: Some(2) })
            .await;
        tracker.observe(ProgressStatus::Finished).await;
        tracker.finish().await;

        assert_eq!(drain(&mut rx), vec![0.99, 1.0]);
    }

    #[tokio::test]
    async fn finish_without_backend_status_still_completes() {
        let (tx, mut rx) = mpsc::channel(16);
        let mut tracker = ProgressTracker::new(tx);

        tracker.finish().await;

        assert_eq!(drain(&mut rx), vec![1.0]);
    }

    #[tokio::test]
    async fn closed_receiver_is_not_an_error() {
        let (tx, rx) = mpsc::channel(1);
        drop(rx);
        let mut tracker = ProgressTracker::new(tx);

        tracker
            .observe(ProgressStatus::Downloading { downloaded: 1, total: Some(4) })
            .await;
        tracker.finish().await;
        assert!(tracker.is_completed());
    }
}
