//! Run configuration
//!
//! Loaded from an optional `rakuten-m3u.json` next to the output tree;
//! every field falls back to the upstream defaults, so a missing or
//! invalid file still yields a working run.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

const CONFIG_FILE: &str = "rakuten-m3u.json";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// W3U source playlist to scrape.
    #[serde(default = "default_w3u_url")]
    pub w3u_url: String,
    /// Gzip-compressed XMLTV guide feed.
    #[serde(default = "default_epg_url")]
    pub epg_url: String,
    /// Base URL the generated tree is published under. Every cross-document
    /// URL is this base joined with a relative output path.
    #[serde(default = "default_base_url")]
    pub base_url: String,
    /// Directory the document tree is written into.
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,
    /// Per-request timeout in seconds.
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,
}

fn default_w3u_url() -> String {
    "https://github.com/HelmerLuzo/RakutenTV_HL/raw/refs/heads/main/tv/w3u/RakutenTV_tv.w3u".into()
}

fn default_epg_url() -> String {
    "https://helmerluzo.github.io/RakutenTV_HL/epg/RakutenTV.xml.gz".into()
}

fn default_base_url() -> String {
    "https://raw.githubusercontent.com/joaquinito2070/rakuten-m3u/refs/heads/main/".into()
}

fn default_output_dir() -> PathBuf {
    PathBuf::from(".")
}

fn default_timeout() -> u64 {
    10
}

impl Default for Config {
    fn default() -> Self {
        Self {
            w3u_url: default_w3u_url(),
            epg_url: default_epg_url(),
            base_url: default_base_url(),
            output_dir: default_output_dir(),
            timeout_secs: default_timeout(),
        }
    }
}

impl Config {
    pub fn load() -> Self {
        Self::load_from(Path::new(CONFIG_FILE))
    }

    pub fn load_from(path: &Path) -> Self {
        if path.exists() {
            if let Ok(content) = fs::read_to_string(path) {
                if let Ok(config) = serde_json::from_str(&content) {
                    return config;
                }
            }
        }
        Self::default()
    }

    /// Base URL with a guaranteed trailing slash, so joining with relative
    /// output paths never eats a path segment.
    pub fn base(&self) -> String {
        if self.base_url.ends_with('/') {
            self.base_url.clone()
        } else {
            format!("{}/", self.base_url)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_when_file_missing() {
        let config = Config::load_from(Path::new("definitely-not-here.json"));
        assert_eq!(config.timeout_secs, 10);
        assert!(config.base_url.ends_with('/'));
    }

    #[test]
    fn test_partial_config_fills_defaults() {
        let config: Config = serde_json::from_str(r#"{"timeout_secs": 5}"#).unwrap();
        assert_eq!(config.timeout_secs, 5);
        assert_eq!(config.w3u_url, default_w3u_url());
    }

    #[test]
    fn test_base_appends_slash() {
        let mut config = Config::default();
        config.base_url = "https://example.com/tree".into();
        assert_eq!(config.base(), "https://example.com/tree/");
    }
}
