//! End-to-end manifest rebuild: fetch, order, resolve, build, validate, write.

use crate::config::Config;
use crate::error::{Error, Result};
use crate::feed::{FeedSource, HttpFeedSource};
use crate::manifest::ManifestBuilder;
use crate::ordering::order_entries;
use crate::transcript::{HttpProbe, TranscriptProbe, TranscriptResolver, TranscriptSource};
use crate::writer::write_manifest;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;

/// Outcome of a successful rebuild
#[must_use]
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RebuildSummary {
    /// Where the manifest was written
    pub path: PathBuf,
    /// Number of rows written (one per feed entry)
    pub rows: usize,
    /// Rows whose final transcript URL came from the feed
    pub from_feed: usize,
    /// Rows flagged as noise
    pub noise: usize,
}

/// Rebuilds the manifest from the feed in a single sequential pass
pub struct ManifestRebuilder {
    config: Config,
    feed_source: Arc<dyn FeedSource>,
    probe: Arc<dyn TranscriptProbe>,
}

impl ManifestRebuilder {
    /// Create a rebuilder talking HTTP through one shared client
    ///
    /// # Errors
    /// Returns error if the configuration is invalid or the HTTP client cannot be created
    pub fn new(config: Config) -> Result<Self> {
        config.validate()?;

        let http_client = reqwest::Client::builder()
            .timeout(config.feed.timeout)
            .user_agent(config.feed.user_agent.clone())
            .build()
            .map_err(|e| Error::Other(format!("Failed to create HTTP client: {}", e)))?;

        let feed_source = Arc::new(HttpFeedSource::new(
            http_client.clone(),
            config.feed.url.clone(),
            config.feed.timeout,
        ));
        let probe = Arc::new(HttpProbe::new(http_client, &config.transcripts));

        Ok(Self {
            config,
            feed_source,
            probe,
        })
    }

    /// Create a rebuilder from explicit feed and probe implementations
    pub fn with_parts(
        config: Config,
        feed_source: Arc<dyn FeedSource>,
        probe: Arc<dyn TranscriptProbe>,
    ) -> Self {
        Self {
            config,
            feed_source,
            probe,
        }
    }

    /// Run the pipeline once and write the manifest
    ///
    /// # Errors
    /// Fails if the feed cannot be fetched or parsed, if sequence numbers
    /// collide, or if the output file cannot be written. Transcript probing
    /// never fails the run.
    pub async fn run(&self) -> Result<RebuildSummary> {
        let entries = self.feed_source.fetch_entries().await?;
        info!(entries = entries.len(), "Ordering feed entries");
        let ordered = order_entries(entries);

        let resolver = TranscriptResolver::new(self.probe.clone(), &self.config.transcripts);
        let builder = ManifestBuilder::new(resolver, self.config.transcripts.noise_marker.clone());
        let rows = builder.build(&ordered).await;

        let path = self.config.output.path.clone();
        let written = write_manifest(&path, &rows)?;

        Ok(RebuildSummary {
            path,
            rows: written,
            from_feed: rows
                .iter()
                .filter(|r| r.vtt_source == TranscriptSource::Feed)
                .count(),
            noise: rows.iter().filter(|r| r.is_noise).count(),
        })
    }
}
