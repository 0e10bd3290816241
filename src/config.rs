//! Configuration types for podcast-manifest
//!
//! Every field has a default, so `Config::default()` reproduces the hardcoded
//! values the manifest has always been built with. A TOML file only needs to
//! name the settings it changes.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Placeholder substituted with the zero-padded sequence number in URL templates
pub const NUM_PLACEHOLDER: &str = "{num}";

/// Feed location and fetch settings
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct FeedConfig {
    /// RSS/Atom feed URL
    #[serde(default = "default_feed_url")]
    pub url: String,

    /// User-Agent header sent with every outbound request
    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    /// Timeout for fetching the feed document (default: 30 seconds)
    #[serde(default = "default_feed_timeout", with = "duration_serde")]
    pub timeout: Duration,
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            url: default_feed_url(),
            user_agent: default_user_agent(),
            timeout: default_feed_timeout(),
        }
    }
}

/// Transcript probing and fallback URL settings
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct TranscriptConfig {
    /// Timeout for the HEAD existence check (default: 20 seconds)
    #[serde(default = "default_head_timeout", with = "duration_serde")]
    pub head_timeout: Duration,

    /// Timeout for the partial GET content check (default: 30 seconds)
    #[serde(default = "default_fetch_timeout", with = "duration_serde")]
    pub fetch_timeout: Duration,

    /// Number of body bytes inspected for the `WEBVTT` signature (default: 2048)
    #[serde(default = "default_sniff_limit")]
    pub sniff_limit: usize,

    /// Raw-content fallback URL; `{num}` is replaced with the sequence number
    #[serde(default = "default_raw_url_template")]
    pub raw_url_template: String,

    /// CDN mirror URL; recorded in the manifest but never auto-selected
    #[serde(default = "default_cdn_url_template")]
    pub cdn_url_template: String,

    /// Lowercase title substring marking non-episode filler entries
    #[serde(default = "default_noise_marker")]
    pub noise_marker: String,
}

impl Default for TranscriptConfig {
    fn default() -> Self {
        Self {
            head_timeout: default_head_timeout(),
            fetch_timeout: default_fetch_timeout(),
            sniff_limit: default_sniff_limit(),
            raw_url_template: default_raw_url_template(),
            cdn_url_template: default_cdn_url_template(),
            noise_marker: default_noise_marker(),
        }
    }
}

/// Output file settings
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct OutputConfig {
    /// Manifest CSV path, overwritten on every run (default: "manifest_latest.csv")
    #[serde(default = "default_output_path")]
    pub path: PathBuf,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            path: default_output_path(),
        }
    }
}

/// Main configuration for a manifest rebuild
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct Config {
    /// Feed source settings
    #[serde(default)]
    pub feed: FeedConfig,

    /// Transcript resolution settings
    #[serde(default)]
    pub transcripts: TranscriptConfig,

    /// Output settings
    #[serde(default)]
    pub output: OutputConfig,
}

impl Config {
    /// Load configuration from a TOML file, filling unspecified keys with defaults
    pub fn from_toml_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    /// Parse configuration from TOML text
    pub fn from_toml_str(content: &str) -> Result<Self> {
        toml::from_str(content).map_err(|e| Error::Config {
            message: format!("invalid TOML: {}", e),
            key: None,
        })
    }

    /// Check the settings that would otherwise fail deep inside a run
    pub fn validate(&self) -> Result<()> {
        url::Url::parse(&self.feed.url)
            .map_err(|e| Error::config("feed.url", format!("invalid feed URL: {}", e)))?;

        for (key, template) in [
            ("transcripts.raw_url_template", &self.transcripts.raw_url_template),
            ("transcripts.cdn_url_template", &self.transcripts.cdn_url_template),
        ] {
            if !template.contains(NUM_PLACEHOLDER) {
                return Err(Error::config(
                    key,
                    format!("template must contain {}", NUM_PLACEHOLDER),
                ));
            }
        }

        if self.transcripts.sniff_limit == 0 {
            return Err(Error::config(
                "transcripts.sniff_limit",
                "must be greater than zero",
            ));
        }

        if self.output.path.as_os_str().is_empty() {
            return Err(Error::config("output.path", "must not be empty"));
        }

        Ok(())
    }
}

// Default value functions
fn default_feed_url() -> String {
    "https://letscast.fm/podcasts/bauertothepeople-b2p-der-podcast-hinter-den-kulissen-von-deinem-essen-de5c15c4/feed".to_string()
}

fn default_user_agent() -> String {
    "b2p-manifest-rebuilder/1.0".to_string()
}

fn default_feed_timeout() -> Duration {
    Duration::from_secs(30)
}

fn default_head_timeout() -> Duration {
    Duration::from_secs(20)
}

fn default_fetch_timeout() -> Duration {
    Duration::from_secs(30)
}

fn default_sniff_limit() -> usize {
    2048
}

fn default_raw_url_template() -> String {
    "https://raw.githubusercontent.com/b2p-hub/b2p-vtts/main/{num}.vtt".to_string()
}

fn default_cdn_url_template() -> String {
    "https://cdn.jsdelivr.net/gh/b2p-hub/b2p-vtts@main/{num}.vtt".to_string()
}

fn default_noise_marker() -> String {
    "hintergrundrauschen".to_string()
}

fn default_output_path() -> PathBuf {
    PathBuf::from("manifest_latest.csv")
}

// Duration serialization helper
mod duration_serde {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_u64(duration.as_secs())
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let secs = u64::deserialize(deserializer)?;
        Ok(Duration::from_secs(secs))
    }
}
