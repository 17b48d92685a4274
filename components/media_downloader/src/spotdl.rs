// components/media_downloader/src/spotdl.rs
use crate::types::DownloadError;
use async_trait::async_trait;
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use tokio::process::Command;
use tracing::info;

/// Backend for Spotify links, which the media-fetch backend cannot resolve
#[async_trait]
pub trait SpotifyDownloader {
    async fn check_available(&self) -> Result<(), DownloadError>;

    async fn download(&self, url: &str, output_dir: &Path) -> Result<(), DownloadError>;
}

pub struct SpotDl {
    program: PathBuf,
}

impl Default for SpotDl {
    fn default() -> Self {
        Self::with_program("spotdl")
    }
}

impl SpotDl {
    pub fn with_program(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
        }
    }

    pub fn command_args(url: &str, output_dir: &Path) -> Vec<OsString> {
        vec![
            "download".into(),
            url.into(),
            "--output".into(),
            output_dir.as_os_str().to_owned(),
        ]
    }
}

#[async_trait]
impl SpotifyDownloader for SpotDl {
    async fn check_available(&self) -> Result<(), DownloadError> {
        which::which(&self.program)
            .map(|_| ())
            .map_err(|_| DownloadError::DependencyNotFound("spotdl"))
    }

    async fn download(&self, url: &str, output_dir: &Path) -> Result<(), DownloadError> {
        info!("Running {} download {} --output {}", self.program.display(), url, output_dir.display());

        let output = Command::new(&self.program)
            .args(Self::command_args(url, output_dir))
            .stdin(Stdio::null())
            .kill_on_drop(true)
            .output()
            .await?;

        if !output.status.success() {
            return Err(DownloadError::BackendProcessFailure {
                command: self.program.display().to_string(),
                status: output.status.to_string(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        Ok(())
    }
}

#[cfg(test)]
pub mod stub {
    use super::*;
    use std::sync::Mutex;

    #[derive(Default)]
    pub struct SpotifyStub {
        pub fail: bool,
        pub calls: Mutex<Vec<(String, PathBuf)>>,
    }

    #[async_trait]
    impl SpotifyDownloader for SpotifyStub {
        async fn check_available(&self) -> Result<(), DownloadError> {
            Ok(())
        }

        async fn download(&self, url: &str, output_dir: &Path) -> Result<(), DownloadError> {
            self.calls
                .lock()
                .unwrap()
                .push((url.to_string(), output_dir.to_path_buf()));
            if self.fail {
                return Err(DownloadError::BackendProcessFailure {
                    command: "spotdl".to_string(),
                    status: "exit status: 1".to_string(),
                    stderr: "no results".to_string(),
                });
            }
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    #[test]
    fn passes_url_and_output_positionally() {
        let args = SpotDl::command_args(
            "https://open.spotify.com/track/abc",
            Path::new("/music"),
        );
        assert_eq!(
            args,
            vec![
                OsString::from("download"),
                OsString::from("https://open.spotify.com/track/abc"),
                OsString::from("--output"),
                OsString::from("/music"),
            ]
        );
    }

    #[tokio::test]
    async fn missing_program_is_reported() {
        let spotdl = SpotDl::with_program("definitely-not-installed-spotdl-binary");
        assert_matches!(
            spotdl.check_available().await,
            Err(DownloadError::DependencyNotFound("spotdl"))
        );
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn non_zero_exit_is_a_process_failure() {
        // `false` ignores its arguments and exits 1
        let spotdl = SpotDl::with_program("false");
        let result = spotdl
            .download("https://open.spotify.com/track/abc", Path::new("/tmp"))
            .await;
        assert_matches!(result, Err(DownloadError::BackendProcessFailure { command, .. }) if command == "false");
    }
}
