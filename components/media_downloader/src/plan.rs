// components/media_downloader/src/plan.rs
use crate::mix::{normalize, NormalizedUrl};
use crate::options::{build_options, BackendOptions};
use crate::types::{DownloadError, DownloadRequest, Platform};
use serde::Serialize;
use std::path::PathBuf;

/// What the worker will hand to which backend
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "backend", rename_all = "lowercase")]
pub enum DownloadPlan {
    /// Raw URL for the Spotify tool; no normalization applies
    Spotify { url: String, output_dir: PathBuf },
    /// Normalized URL and options for the generic media-fetch backend
    Media {
        url: NormalizedUrl,
        options: BackendOptions,
    },
}

impl DownloadPlan {
    pub fn url(&self) -> &str {
        match self {
            DownloadPlan::Spotify { url, .. } => url,
            DownloadPlan::Media { url, .. } => &url.clean_url,
        }
    }

    pub fn was_mix(&self) -> bool {
        matches!(self, DownloadPlan::Media { url, .. } if url.was_mix)
    }
}

pub fn plan(req: &DownloadRequest) -> Result<DownloadPlan, DownloadError> {
    req.validate()?;

    if req.platform == Platform::Spotify {
        return Ok(DownloadPlan::Spotify {
            url: req.url.trim().to_string(),
            output_dir: req.output_dir.clone(),
        });
    }

    let url = normalize(&req.url);
    let options = build_options(req, url.was_mix)?;
    Ok(DownloadPlan::Media { url, options })
}
