//! Command line entry point: rebuild the manifest once and exit.
//!
//! Usage: rebuild-manifest [--config FILE] [--feed-url URL] [--output PATH] [-v]

use clap::Parser;
use podcast_manifest::{Config, ManifestRebuilder};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

/// Rebuild the podcast manifest CSV from the feed
#[derive(Debug, Parser)]
#[command(name = "rebuild-manifest", version, about)]
struct Cli {
    /// TOML configuration file; unspecified keys keep their defaults
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Feed URL (overrides the configuration file)
    #[arg(long, value_name = "URL")]
    feed_url: Option<String>,

    /// Output CSV path (overrides the configuration file)
    #[arg(long, short, value_name = "PATH")]
    output: Option<PathBuf>,

    /// Log per-entry decisions
    #[arg(long, short)]
    verbose: bool,
}

impl Cli {
    fn load_config(&self) -> podcast_manifest::Result<Config> {
        let mut config = match &self.config {
            Some(path) => Config::from_toml_file(path)?,
            None => Config::default(),
        };
        if let Some(url) = &self.feed_url {
            config.feed.url = url.clone();
        }
        if let Some(output) = &self.output {
            config.output.path = output.clone();
        }
        Ok(config)
    }
}

fn init_tracing(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let result = async {
        let config = cli.load_config()?;
        ManifestRebuilder::new(config)?.run().await
    }
    .await;

    match result {
        Ok(summary) => {
            println!(
                "OK: {} neu erzeugt ({} Einträge)",
                summary.path.display(),
                summary.rows
            );
            ExitCode::SUCCESS
        }
        Err(e) => {
            tracing::error!(error = %e, "Manifest rebuild failed");
            eprintln!("Error: {}", e);
            ExitCode::FAILURE
        }
    }
}
