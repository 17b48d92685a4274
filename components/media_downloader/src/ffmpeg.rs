// components/media_downloader/src/ffmpeg.rs
//! Locating FFmpeg, and installing a private copy when none is found.
//!
//! The resolved executable is returned to the caller and passed to the
//! backend explicitly; the process environment is left untouched.

use crate::types::DownloadError;
use async_trait::async_trait;
use sha2::{Digest, Sha256};
use std::fs::{self, File};
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tracing::{debug, info, warn};
use walkdir::WalkDir;
use zip::ZipArchive;

pub const FFMPEG_ARCHIVE_URL: &str =
    "https://www.gyan.dev/ffmpeg/builds/ffmpeg-release-essentials.zip";
pub const FFMPEG_CHECKSUM_URL: &str =
    "https://www.gyan.dev/ffmpeg/builds/ffmpeg-release-essentials.zip.sha256";

/// Upper bound for `spotdl --download-ffmpeg`
pub const SPOTDL_FFMPEG_TIMEOUT: Duration = Duration::from_secs(60);

pub fn ffmpeg_executable_name() -> String {
    format!("ffmpeg{}", std::env::consts::EXE_SUFFIX)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FfmpegSource {
    /// Found on the system search path
    System,
    /// A copy installed by an earlier run
    Local,
    /// Installed just now
    Provisioned,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FfmpegLocation {
    pub path: PathBuf,
    pub source: FfmpegSource,
}

#[derive(Debug, Clone)]
pub enum ProvisionStrategy {
    /// Download a zip build and unpack it under the install root
    Archive {
        url: String,
        checksum_url: Option<String>,
    },
    /// Let spotdl fetch its own FFmpeg build
    SpotDl { program: PathBuf, timeout: Duration },
}

impl ProvisionStrategy {
    /// Zip builds on Windows, spotdl everywhere else
    pub fn platform_default() -> Self {
        if cfg!(windows) {
            ProvisionStrategy::Archive {
                url: FFMPEG_ARCHIVE_URL.to_string(),
                checksum_url: Some(FFMPEG_CHECKSUM_URL.to_string()),
            }
        } else {
            ProvisionStrategy::SpotDl {
                program: PathBuf::from("spotdl"),
                timeout: SPOTDL_FFMPEG_TIMEOUT,
            }
        }
    }
}

/// Fetches provisioning artifacts over the network
#[async_trait]
pub trait ArchiveFetcher {
    async fn fetch(&self, url: &str, dest: &Path) -> Result<(), DownloadError>;

    async fn fetch_text(&self, url: &str) -> Result<String, DownloadError>;
}

#[derive(Default)]
pub struct HttpFetcher {
    client: reqwest::Client,
}

fn http_error(url: &str, error: reqwest::Error) -> DownloadError {
    DownloadError::FfmpegUnavailable(format!("failed to fetch {url}: {error}"))
}

#[async_trait]
impl ArchiveFetcher for HttpFetcher {
    async fn fetch(&self, url: &str, dest: &Path) -> Result<(), DownloadError> {
        let mut response = self
            .client
            .get(url)
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map_err(|e| http_error(url, e))?;

        let mut file = tokio::fs::File::create(dest).await?;
        while let Some(chunk) = response.chunk().await.map_err(|e| http_error(url, e))? {
            file.write_all(&chunk).await?;
        }
        file.flush().await?;
        Ok(())
    }

    async fn fetch_text(&self, url: &str) -> Result<String, DownloadError> {
        self.client
            .get(url)
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map_err(|e| http_error(url, e))?
            .text()
            .await
            .map_err(|e| http_error(url, e))
    }
}

pub struct FfmpegProvisioner {
    install_root: PathBuf,
    strategy: ProvisionStrategy,
    fetcher: Arc<dyn ArchiveFetcher + Send + Sync>,
    search_system: bool,
}

impl FfmpegProvisioner {
    /// Provisioner installing under `install_root/ffmpeg` with the platform default strategy
    pub fn new(install_root: impl Into<PathBuf>) -> Self {
        Self::with_strategy(
            install_root,
            ProvisionStrategy::platform_default(),
            Arc::new(HttpFetcher::default()),
        )
    }

    pub fn with_strategy(
        install_root: impl Into<PathBuf>,
        strategy: ProvisionStrategy,
        fetcher: Arc<dyn ArchiveFetcher + Send + Sync>,
    ) -> Self {
        Self {
            install_root: install_root.into(),
            strategy,
            fetcher,
            search_system: true,
        }
    }

    /// Only consider copies under the install root
    pub fn without_system_lookup(mut self) -> Self {
        self.search_system = false;
        self
    }

    pub fn local_bin_dir(&self) -> PathBuf {
        self.install_root.join("ffmpeg").join("bin")
    }

    /// An FFmpeg that is already usable, if any
    pub fn locate(&self) -> Option<FfmpegLocation> {
        if self.search_system {
            if let Ok(path) = which::which("ffmpeg") {
                return Some(FfmpegLocation {
                    path,
                    source: FfmpegSource::System,
                });
            }
        }

        let local = self.local_bin_dir().join(ffmpeg_executable_name());
        local.is_file().then(|| FfmpegLocation {
            path: local,
            source: FfmpegSource::Local,
        })
    }

    /// Locate FFmpeg, installing it first when necessary
    pub async fn provision(&self) -> Result<FfmpegLocation, DownloadError> {
        if let Some(location) = self.locate() {
            debug!("Using FFmpeg at {}", location.path.display());
            return Ok(location);
        }

        info!("FFmpeg not found, provisioning");
        let result = match &self.strategy {
            ProvisionStrategy::Archive { url, checksum_url } => {
                self.install_from_archive(url, checksum_url.as_deref()).await
            }
            ProvisionStrategy::SpotDl { program, timeout } => {
                self.install_with_spotdl(program, *timeout).await
            }
        };

        result.map_err(|e| match e {
            DownloadError::FfmpegUnavailable(_) => e,
            other => DownloadError::FfmpegUnavailable(other.to_string()),
        })
    }

    async fn install_from_archive(
        &self,
        url: &str,
        checksum_url: Option<&str>,
    ) -> Result<FfmpegLocation, DownloadError> {
        let temp_dir = tempfile::tempdir()?;
        let archive_path = temp_dir.path().join("ffmpeg.zip");

        info!("Downloading FFmpeg from {}", url);
        self.fetcher.fetch(url, &archive_path).await?;

        let expected_checksum = match checksum_url {
            Some(checksum_url) => Some(self.fetcher.fetch_text(checksum_url).await?),
            None => None,
        };

        let root = self.install_root.join("ffmpeg");
        let path = tokio::task::spawn_blocking(move || {
            if let Some(expected) = expected_checksum {
                verify_checksum(&archive_path, &expected)?;
            }
            extract_archive(&archive_path, &root, &ffmpeg_executable_name())
        })
        .await
        .map_err(|e| DownloadError::FfmpegUnavailable(e.to_string()))??;

        info!("FFmpeg installed at {}", path.display());
        Ok(FfmpegLocation {
            path,
            source: FfmpegSource::Provisioned,
        })
    }

    async fn install_with_spotdl(
        &self,
        program: &Path,
        timeout: Duration,
    ) -> Result<FfmpegLocation, DownloadError> {
        info!("Running {} --download-ffmpeg", program.display());

        let mut command = Command::new(program);
        command
            .arg("--download-ffmpeg")
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        let output = tokio::time::timeout(timeout, command.output())
            .await
            .map_err(|_| {
                DownloadError::FfmpegUnavailable(format!(
                    "{} --download-ffmpeg timed out after {}s",
                    program.display(),
                    timeout.as_secs()
                ))
            })??;

        if !output.status.success() {
            return Err(DownloadError::FfmpegUnavailable(format!(
                "{} --download-ffmpeg exited with {}: {}",
                program.display(),
                output.status,
                String::from_utf8_lossy(&output.stderr).trim()
            )));
        }

        if let Some(location) = self.locate() {
            return Ok(FfmpegLocation {
                path: location.path,
                source: FfmpegSource::Provisioned,
            });
        }

        spotdl_ffmpeg_path()
            .filter(|path| path.is_file())
            .map(|path| FfmpegLocation {
                path,
                source: FfmpegSource::Provisioned,
            })
            .ok_or_else(|| {
                DownloadError::FfmpegUnavailable(
                    "ffmpeg not accessible after spotdl install".to_string(),
                )
            })
    }
}

/// Where spotdl keeps the FFmpeg it downloads
fn spotdl_ffmpeg_path() -> Option<PathBuf> {
    dirs::home_dir().map(|home| home.join(".spotdl").join(ffmpeg_executable_name()))
}

/// Compare the archive against a published `sha256sum`-style line
fn verify_checksum(archive: &Path, expected: &str) -> Result<(), DownloadError> {
    let expected = expected
        .split_whitespace()
        .next()
        .unwrap_or_default()
        .to_ascii_lowercase();

    let mut hasher = Sha256::new();
    std::io::copy(&mut File::open(archive)?, &mut hasher)?;
    let actual = hex::encode(hasher.finalize());

    if actual != expected {
        warn!("FFmpeg archive checksum mismatch: expected {}, got {}", expected, actual);
        return Err(DownloadError::FfmpegUnavailable(format!(
            "archive checksum mismatch (expected {expected}, got {actual})"
        )));
    }
    Ok(())
}

fn zip_error(error: zip::result::ZipError) -> DownloadError {
    DownloadError::FfmpegUnavailable(format!("unreadable FFmpeg archive: {error}"))
}

fn entry_file_name(name: &str) -> &str {
    name.rsplit(|c| c == '/' || c == '\\').next().unwrap_or(name)
}

/// Unpack `archive` into `root` and move the directory holding `executable` to `root/bin`
fn extract_archive(archive: &Path, root: &Path, executable: &str) -> Result<PathBuf, DownloadError> {
    let mut zip = ZipArchive::new(File::open(archive)?).map_err(zip_error)?;

    if !zip
        .file_names()
        .any(|name| entry_file_name(name).eq_ignore_ascii_case(executable))
    {
        return Err(DownloadError::FfmpegUnavailable(format!(
            "{executable} missing from archive"
        )));
    }

    if root.exists() {
        fs::remove_dir_all(root)?;
    }
    fs::create_dir_all(root)?;
    zip.extract(root).map_err(zip_error)?;

    let found = WalkDir::new(root)
        .into_iter()
        .filter_map(Result::ok)
        .find(|entry| {
            entry.file_type().is_file()
                && entry
                    .file_name()
                    .to_string_lossy()
                    .eq_ignore_ascii_case(executable)
        })
        .map(|entry| entry.into_path())
        .ok_or_else(|| {
            DownloadError::FfmpegUnavailable(format!("{executable} not found after extraction"))
        })?;

    let bin = root.join("bin");
    match found.parent() {
        Some(dir) if dir == bin => {}
        Some(dir) if dir == root => {
            // ffprobe and friends have to end up next to ffmpeg
            let entries = fs::read_dir(root)?.collect::<Result<Vec<_>, _>>()?;
            fs::create_dir_all(&bin)?;
            for entry in entries {
                fs::rename(entry.path(), bin.join(entry.file_name()))?;
            }
        }
        Some(dir) => {
            let staging = root.join(".bin-staging");
            fs::rename(dir, &staging)?;
            if bin.exists() {
                fs::remove_dir_all(&bin)?;
            }
            fs::rename(&staging, &bin)?;
        }
        None => {
            return Err(DownloadError::FfmpegUnavailable(format!(
                "{} has no parent directory",
                found.display()
            )))
        }
    }

    let path = bin.join(executable);
    if !path.is_file() {
        return Err(DownloadError::FfmpegUnavailable(format!(
            "{} not accessible",
            path.display()
        )));
    }

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        fs::set_permissions(&path, fs::Permissions::from_mode(0o755))?;
    }

    Ok(path)
}
