// bases/download_cli/src/output.rs
use crate::settings::Settings;
use media_downloader::{DownloadError, DownloadPlan, DownloadReport, DownloadRequest, FfmpegLocation};
use std::io::Write;
use std::path::Path;

const PROGRESS_WIDTH: usize = 30;

pub struct OutputHandler {
    verbose: bool,
}

impl OutputHandler {
    pub fn new(verbose: bool) -> Self {
        Self { verbose }
    }

    pub fn print_download_start(&self, request: &DownloadRequest, plan: &DownloadPlan) {
        println!("Starting download from: {}", request.url);
        if plan.was_mix() {
            println!("Mix playlist detected, downloading a single item: {}", plan.url());
        }
        println!(
            "Platform: {}  Format: {} ({})  Output: {}",
            request.platform,
            request.output_format,
            request.quality,
            request.output_dir.display()
        );
    }

    pub fn print_progress(&self, fraction: f64) {
        print!("\r{}", render_progress(fraction, PROGRESS_WIDTH));
        let _ = std::io::stdout().flush();
        if fraction >= 1.0 {
            println!();
        }
    }

    pub fn print_download_complete(&self, report: &DownloadReport) {
        println!("Download complete: {}", report.output_dir.display());

        if self.verbose {
            println!("Source: {}", report.url);
            println!("Started: {}", report.started_at);
            println!("Finished: {}", report.finished_at);
        }
    }

    pub fn print_dry_run(&self, plan: &DownloadPlan, command: &[String]) -> serde_json::Result<()> {
        println!("{}", serde_json::to_string_pretty(plan)?);
        println!("Would run: {}", command.join(" "));
        Ok(())
    }

    pub fn print_ffmpeg(&self, location: &FfmpegLocation) {
        println!("FFmpeg ({:?}): {}", location.source, location.path.display());
    }

    pub fn print_ffmpeg_unavailable(&self, error: &DownloadError) {
        eprintln!("Warning: {}", error);
        eprintln!("Conversions that need FFmpeg will fail.");
    }

    pub fn print_settings(&self, path: &Path, settings: &Settings) -> serde_json::Result<()> {
        println!("Settings file: {}", path.display());
        println!("{}", serde_json::to_string_pretty(settings)?);
        Ok(())
    }

    pub fn print_error(&self, error: &color_eyre::Report) {
        eprintln!("Error: {}", error);

        if self.verbose {
            eprintln!("\nError details:");
            error.chain().skip(1).for_each(|cause| {
                eprintln!("  caused by: {}", cause);
            });
        }
    }
}

/// `[#####     ]  50%`
pub fn render_progress(fraction: f64, width: usize) -> String {
    let fraction = fraction.clamp(0.0, 1.0);
    let filled = (fraction * width as f64).round() as usize;
    format!(
        "[{}{}] {:>3}%",
        "#".repeat(filled),
        " ".repeat(width - filled),
        (fraction * 100.0).floor() as u32
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn renders_partial_progress() {
        assert_eq!(render_progress(0.5, 10), "[#####     ]  50%");
    }

    #[test]
    fn clamped_progress_never_shows_done() {
        assert_eq!(render_progress(0.99, 10), "[##########]  99%");
    }

    #[test]
    fn renders_bounds() {
        assert_eq!(render_progress(0.0, 4), "[    ]   0%");
        assert_eq!(render_progress(1.0, 4), "[####] 100%");
        assert_eq!(render_progress(7.0, 4), "[####] 100%");
    }
}
