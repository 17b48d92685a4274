// bases/download_cli/src/app.rs
use crate::args::{Cli, Commands, DownloadArgs};
use crate::config::{app_dir, default_output_dir, Config};
use crate::output::OutputHandler;
use crate::settings::SettingsStore;
use color_eyre::eyre::bail;
use color_eyre::Result;
use media_downloader::{
    plan, DownloadEvent, DownloadPlan, FfmpegProvisioner, MediaDownloader, SpotDl, YtDlp,
};
use std::path::PathBuf;
use tracing::warn;

pub struct App {
    cli: Cli,
    output: OutputHandler,
    settings: SettingsStore,
    app_dir: PathBuf,
}

impl App {
    pub fn new(cli: Cli) -> Self {
        let output = OutputHandler::new(cli.verbose);
        let app_dir = app_dir();
        Self {
            cli,
            output,
            settings: SettingsStore::in_dir(&app_dir),
            app_dir,
        }
    }

    pub async fn run(&self) -> Result<()> {
        match &self.cli.command {
            Commands::Download(args) => self.download(args.clone()).await,
            Commands::Ffmpeg => {
                let location = FfmpegProvisioner::new(&self.app_dir).provision().await?;
                self.output.print_ffmpeg(&location);
                Ok(())
            }
            Commands::Settings => {
                let settings = self.settings.load();
                self.output.print_settings(self.settings.path(), &settings)?;
                Ok(())
            }
        }
    }

    async fn download(&self, args: DownloadArgs) -> Result<()> {
        let mut settings = self.settings.load();
        let config = Config::from_args(args, &settings, default_output_dir())?;
        let plan = plan(&config.request)?;

        let provisioner = FfmpegProvisioner::new(&self.app_dir);

        if config.dry_run {
            let command: Vec<String> = match &plan {
                DownloadPlan::Spotify { url, output_dir } => {
                    std::iter::once("spotdl".to_string())
                        .chain(
                            SpotDl::command_args(url, output_dir)
                                .into_iter()
                                .map(|arg| arg.to_string_lossy().into_owned()),
                        )
                        .collect()
                }
                DownloadPlan::Media { url, options } => {
                    let ffmpeg = provisioner.locate().map(|location| location.path);
                    std::iter::once("yt-dlp".to_string())
                        .chain(YtDlp::command_args(&url.clean_url, options, ffmpeg.as_deref()))
                        .collect()
                }
            };
            self.output.print_dry_run(&plan, &command)?;
            return Ok(());
        }

        let ffmpeg = if config.provision_ffmpeg && matches!(plan, DownloadPlan::Media { .. }) {
            match provisioner.provision().await {
                Ok(location) => Some(location.path),
                Err(e) => {
                    self.output.print_ffmpeg_unavailable(&e);
                    None
                }
            }
        } else {
            None
        };

        let downloader = MediaDownloader::new().with_ffmpeg(ffmpeg);
        self.output.print_download_start(&config.request, &plan);

        let mut handle = downloader.start(config.request.clone())?;
        let report = loop {
            match handle.next_event().await {
                Some(DownloadEvent::Progress(fraction)) => self.output.print_progress(fraction),
                Some(DownloadEvent::Completed(result)) => break result?,
                None => bail!("download worker stopped without reporting a result"),
            }
        };

        self.output.print_download_complete(&report);

        settings.remember(&config.request);
        if let Err(e) = self.settings.save(&settings) {
            warn!("Could not save settings to {}: {}", self.settings.path().display(), e);
        }
        Ok(())
    }

    pub fn print_error(&self, error: &color_eyre::Report) {
        self.output.print_error(error);
    }
}
