// src/main.rs

//! Region Crawler CLI
//!
//! Extracts a nested travel-region hierarchy from Wikivoyage and exports
//! it for the region-tracking application to import.

use std::sync::Arc;
use std::time::Duration;

use clap::{Parser, Subcommand};

use region_crawler::error::{AppError, Result};
use region_crawler::models::{Config, ExtractionStatus};
use region_crawler::pipeline::ExtractionManager;
use region_crawler::storage::{LocalImporter, NoopMatcher};
use region_crawler::utils::log;

#[derive(Parser, Debug)]
#[command(
    name = "region-crawler",
    version,
    about = "Travel region hierarchy extractor"
)]
struct Cli {
    /// Path to the configuration file
    #[arg(short, long, default_value = "data/config.toml")]
    config: String,

    /// Suppress per-page progress narration
    #[arg(short, long, global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the extraction pipeline and wait for it to finish
    Extract {
        /// Override the configured recursion depth limit
        #[arg(long)]
        max_depth: Option<usize>,

        /// Override the configured anchor pages (repeatable)
        #[arg(long)]
        anchor: Vec<String>,
    },
    /// Validate configuration
    Validate,
}

/// Main entry point
#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let _ = env_logger::try_init();

    let mut config = Config::load_or_default(&cli.config);
    log::init(&config.logging.level);
    if cli.quiet {
        config.logging.show_progress = false;
    }

    match cli.command {
        Command::Validate => {
            config.validate()?;
            log::success("Configuration is valid");
            log::summary(
                "Configuration",
                &[
                    ("endpoint", config.api.endpoint.clone()),
                    ("anchors", config.pipeline.anchor_pages.join(", ")),
                    ("max depth", config.pipeline.max_depth.to_string()),
                    ("cache dir", config.paths.cache_dir.clone()),
                    ("output dir", config.paths.output_dir.clone()),
                ],
            );
            Ok(())
        }
        Command::Extract { max_depth, anchor } => {
            if let Some(depth) = max_depth {
                config.pipeline.max_depth = depth;
            }
            if !anchor.is_empty() {
                config.pipeline.anchor_pages = anchor;
            }
            run_extract(config).await
        }
    }
}

/// Start a run, poll it to a terminal state, narrate transitions.
async fn run_extract(config: Config) -> Result<()> {
    config.validate()?;

    let config = Arc::new(config);
    let importer = Arc::new(LocalImporter::new(&config.paths.output_dir));
    let manager = Arc::new(ExtractionManager::new(
        Arc::clone(&config),
        importer,
        Arc::new(NoopMatcher),
    ));

    log::header("Region extraction");
    let run_id = manager.start();

    // Ctrl-C flags the run; the pipeline honors it at the next boundary
    {
        let manager = Arc::clone(&manager);
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                log::warn("Interrupt received, cancelling run");
                manager.cancel(None);
            }
        });
    }

    let mut last_status = None;
    loop {
        tokio::time::sleep(Duration::from_secs(1)).await;
        let Some(snapshot) = manager.status(run_id) else {
            break;
        };

        if last_status != Some(snapshot.status) {
            last_status = Some(snapshot.status);
            match snapshot.status {
                ExtractionStatus::Extracting => {
                    log::step(1, 4, "Extract - Building the region tree")
                }
                ExtractionStatus::Enriching => {
                    log::step(2, 4, "Enrich - Resolving Wikidata identifiers")
                }
                ExtractionStatus::Importing => {
                    log::step(3, 4, "Import - Handing off the hierarchy")
                }
                ExtractionStatus::Matching => log::step(4, 4, "Match - Boundary matching"),
                _ => {}
            }
        }

        if snapshot.status.is_terminal() {
            log::summary(
                "Extraction run",
                &[
                    ("status", snapshot.status.as_str().to_string()),
                    ("message", snapshot.message.clone()),
                    ("pages fetched", snapshot.pages_fetched.to_string()),
                    ("API requests", snapshot.api_requests.to_string()),
                    ("cache hits", snapshot.cache_hits.to_string()),
                ],
            );
            if snapshot.status == ExtractionStatus::Failed {
                return Err(AppError::pipeline(snapshot.message));
            }
            log::success("Extraction finished");
            break;
        }

        if config.logging.show_progress {
            log::sub_item(&format!(
                "{} ({} pages, {} requests, {} cache hits)",
                snapshot.message,
                snapshot.pages_fetched,
                snapshot.api_requests,
                snapshot.cache_hits
            ));
        }
    }

    Ok(())
}
