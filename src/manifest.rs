//! Manifest rows and the builder that numbers ordered entries.

use crate::ordering::DatedEntry;
use crate::transcript::{TranscriptResolution, TranscriptResolver, TranscriptSource};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

/// One line of the manifest CSV
///
/// Field names are the CSV column names and must not change: consumers look
/// transcripts up by `num` and skip rows flagged `is_noise`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManifestRow {
    /// Zero-padded 1-based chronological position ("001", "002", ...)
    pub num: String,
    /// Episode title
    pub title: String,
    /// Canonical episode link
    pub link: String,
    /// Entry id, falling back to the RSS guid
    pub guid: String,
    /// ISO-8601 publish date, empty when unknown
    pub pub_date: String,
    /// Declared episode number, empty unless numeric
    pub itunes_episode: Option<i64>,
    /// Title marks a non-episode filler entry
    #[serde(with = "title_case_bool")]
    pub is_noise: bool,
    /// Transcript URL offered by the feed (validated or not), empty if none
    pub transcript_url_feed: String,
    /// Raw-content fallback transcript URL
    pub transcript_url_raw: String,
    /// CDN mirror of the fallback transcript URL
    pub transcript_url_jsdelivr: String,
    /// Transcript URL chosen for consumption
    pub transcript_url_final: String,
    /// Which candidate `transcript_url_final` came from
    pub vtt_source: TranscriptSource,
}

/// Format a 1-based position as a sequence number
pub fn sequence_number(position: usize) -> String {
    format!("{:03}", position)
}

/// Whether `title` contains the noise marker, ignoring case
pub fn is_noise(title: &str, marker: &str) -> bool {
    !marker.is_empty() && title.to_lowercase().contains(&marker.to_lowercase())
}

/// Parse a declared episode number
///
/// Integers are taken as-is; floats are accepted only when integral.
pub fn normalize_episode(raw: Option<&str>) -> Option<i64> {
    let raw = raw?.trim();
    if let Ok(n) = raw.parse::<i64>() {
        return Some(n);
    }
    match raw.parse::<f64>() {
        Ok(f) if f.is_finite() && f.fract() == 0.0 && f.abs() < i64::MAX as f64 => Some(f as i64),
        _ => None,
    }
}

/// Assemble a row from an ordered entry and its transcript resolution
pub fn build_row(
    num: String,
    dated: &DatedEntry,
    transcript: TranscriptResolution,
    noise_marker: &str,
) -> ManifestRow {
    let entry = &dated.entry;
    let title = entry.title.clone().unwrap_or_default();

    ManifestRow {
        is_noise: is_noise(&title, noise_marker),
        num,
        link: entry.link.clone().unwrap_or_default(),
        guid: entry
            .id
            .clone()
            .or_else(|| entry.guid.clone())
            .unwrap_or_default(),
        pub_date: dated
            .timestamp
            .map(|ts| ts.to_iso8601())
            .unwrap_or_default(),
        itunes_episode: normalize_episode(entry.itunes_episode.as_deref()),
        title,
        transcript_url_feed: transcript.feed_url.unwrap_or_default(),
        transcript_url_raw: transcript.raw_url,
        transcript_url_jsdelivr: transcript.cdn_url,
        transcript_url_final: transcript.final_url,
        vtt_source: transcript.source,
    }
}

/// Numbers ordered entries and resolves their transcripts
pub struct ManifestBuilder {
    resolver: TranscriptResolver,
    noise_marker: String,
}

impl ManifestBuilder {
    /// Create a builder resolving transcripts through `resolver`
    pub fn new(resolver: TranscriptResolver, noise_marker: impl Into<String>) -> Self {
        Self {
            resolver,
            noise_marker: noise_marker.into(),
        }
    }

    /// Build one row per entry, in the given order
    ///
    /// Entries are processed strictly one after another; each may cost up to
    /// two probe round trips.
    pub async fn build(&self, entries: &[DatedEntry]) -> Vec<ManifestRow> {
        let mut rows = Vec::with_capacity(entries.len());

        for (index, dated) in entries.iter().enumerate() {
            let num = sequence_number(index + 1);
            let transcript = self.resolver.resolve(&dated.entry, &num).await;
            let row = build_row(num, dated, transcript, &self.noise_marker);
            debug!(
                num = %row.num,
                title = %row.title,
                source = %row.vtt_source,
                "Built manifest row"
            );
            rows.push(row);
        }

        let from_feed = rows
            .iter()
            .filter(|r| r.vtt_source == TranscriptSource::Feed)
            .count();
        info!(rows = rows.len(), from_feed, "Built manifest rows");

        rows
    }
}

// Booleans as "True"/"False", accepting any case when reading
mod title_case_bool {
    use serde::{Deserialize, Deserializer, Serializer, de::Error};

    pub fn serialize<S>(value: &bool, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(if *value { "True" } else { "False" })
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<bool, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        match raw.trim().to_ascii_lowercase().as_str() {
            "true" => Ok(true),
            "false" => Ok(false),
            other => Err(D::Error::custom(format!("invalid boolean: {:?}", other))),
        }
    }
}
