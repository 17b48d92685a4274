// components/media_downloader/src/mix.rs
//! Detection and removal of YouTube "Mix" playlist parameters.
//!
//! A Mix is an auto-generated radio playlist whose id starts with `RD`.
//! Handing such a URL to the backend would pull in an endless playlist,
//! so the playlist parameters are stripped and only the referenced item
//! is downloaded.

use regex::Regex;
use serde::Serialize;
use std::sync::OnceLock;

/// URL ready for the backend, plus whether mix parameters were removed
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NormalizedUrl {
    pub clean_url: String,
    pub was_mix: bool,
}

fn mix_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"[?&]list=RD[A-Za-z0-9_-]+").expect("valid mix regex"))
}

fn playlist_params_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"[&?](?:list|index|start_radio)=[^&]*").expect("valid playlist param regex")
    })
}

/// True when the query carries a `list=RD...` playlist id
pub fn is_mix_url(url: &str) -> bool {
    mix_pattern().is_match(url)
}

/// Remove `list`, `index` and `start_radio` and repair the `?` leader
pub fn strip_mix_parameters(url: &str) -> String {
    let mut cleaned = playlist_params_pattern().replace_all(url, "").into_owned();

    if !cleaned.contains('?') {
        if let Some(pos) = cleaned.find('&') {
            cleaned.replace_range(pos..pos + 1, "?");
        }
    }
    cleaned
}

/// Trim the raw URL and strip mix parameters when a mix is detected
pub fn normalize(url: &str) -> NormalizedUrl {
    let url = url.trim();

    if is_mix_url(url) {
        NormalizedUrl {
            clean_url: strip_mix_parameters(url),
            was_mix: true,
        }
    } else {
        NormalizedUrl {
            clean_url: url.to_string(),
            was_mix: false,
        }
    }
}
