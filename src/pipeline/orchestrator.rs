// src/pipeline/orchestrator.rs

//! Background run orchestration.
//!
//! `start` launches a detached pipeline run and returns immediately; the
//! run's progress record is the only externally visible handle. `status`
//! and `cancel` are the entire control surface; transport concerns live
//! elsewhere.

use std::collections::HashMap;
use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use crate::error::Result;
use crate::models::{Config, ExtractionStatus, ProgressSnapshot, RunProgress};
use crate::services::{RegionTreeBuilder, WikiClient, WikidataEnricher};
use crate::storage::{ImportMetadata, RegionImporter, RegionMatcher};
use crate::utils::log;

use super::extract::run_extraction;

/// Owns the run registry and drives extraction pipelines to completion.
///
/// Created once at service start; each run gets its own client, cache
/// handle, and progress record. Finished runs linger in the registry for
/// `run_retention_secs` so a final status poll still answers, then they
/// are evicted to bound memory across many runs.
pub struct ExtractionManager {
    config: Arc<Config>,
    importer: Arc<dyn RegionImporter>,
    matcher: Arc<dyn RegionMatcher>,
    runs: Mutex<HashMap<u64, Arc<RunProgress>>>,
    next_run_id: AtomicU64,
}

impl ExtractionManager {
    pub fn new(
        config: Arc<Config>,
        importer: Arc<dyn RegionImporter>,
        matcher: Arc<dyn RegionMatcher>,
    ) -> Self {
        Self {
            config,
            importer,
            matcher,
            runs: Mutex::new(HashMap::new()),
            next_run_id: AtomicU64::new(1),
        }
    }

    /// Launch a pipeline run as a detached background task.
    ///
    /// Returns the run id immediately; callers poll `status` for the rest.
    pub fn start(self: &Arc<Self>) -> u64 {
        let run_id = self.next_run_id.fetch_add(1, Ordering::Relaxed);
        let progress = Arc::new(RunProgress::new());
        self.runs.lock().unwrap().insert(run_id, Arc::clone(&progress));

        let manager = Arc::clone(self);
        tokio::spawn(async move {
            manager.run(run_id, progress).await;
        });

        log::info(&format!("Extraction run {} started", run_id));
        run_id
    }

    /// Snapshot of a run's progress, if it is still registered.
    pub fn status(&self, run_id: u64) -> Option<ProgressSnapshot> {
        self.runs
            .lock()
            .unwrap()
            .get(&run_id)
            .map(|progress| progress.snapshot())
    }

    /// Flag a run for cancellation; with no id, flags every non-terminal
    /// run. Returns whether some run was actually flagged.
    pub fn cancel(&self, run_id: Option<u64>) -> bool {
        let runs = self.runs.lock().unwrap();
        match run_id {
            Some(id) => match runs.get(&id) {
                Some(progress) if !progress.is_terminal() => {
                    progress.request_cancel();
                    true
                }
                _ => false,
            },
            None => {
                let mut flagged = false;
                for progress in runs.values() {
                    if !progress.is_terminal() {
                        progress.request_cancel();
                        flagged = true;
                    }
                }
                flagged
            }
        }
    }

    /// Drive one run to a terminal state.
    ///
    /// This is the outer error boundary: whatever escapes a phase becomes
    /// a failed status, never a crash of the host process.
    async fn run(self: Arc<Self>, run_id: u64, progress: Arc<RunProgress>) {
        let cache_dir = Path::new(&self.config.paths.cache_dir);
        let client = match WikiClient::new(&self.config.api, &self.config.crawler, cache_dir).await
        {
            Ok(client) => Arc::new(client),
            Err(e) => {
                progress.set_status(ExtractionStatus::Failed, format!("Failed to start: {e}"));
                self.schedule_cleanup(run_id);
                return;
            }
        };

        match self.run_phases(Arc::clone(&client), &progress).await {
            Ok(Some(summary)) => {
                log::success(&format!("Run {} complete", run_id));
                progress.set_status(ExtractionStatus::Complete, summary);
            }
            Ok(None) => {
                log::warn(&format!("Run {} cancelled", run_id));
                progress.set_status(ExtractionStatus::Cancelled, "Extraction cancelled");
            }
            Err(e) => {
                log::error(&format!("Run {} failed: {}", run_id, e));
                progress.set_status(ExtractionStatus::Failed, e.to_string());
            }
        }

        if let Err(e) = client.save_cache().await {
            log::warn(&format!("Final cache flush failed: {}", e));
        }
        self.schedule_cleanup(run_id);
    }

    /// The phase state machine. `Ok(None)` means the run was cancelled.
    async fn run_phases(
        &self,
        client: Arc<WikiClient>,
        progress: &Arc<RunProgress>,
    ) -> Result<Option<String>> {
        progress.set_status(ExtractionStatus::Extracting, "Extracting region tree");
        let builder = RegionTreeBuilder::new(Arc::clone(&client), Arc::clone(&self.config));
        let mut tree = run_extraction(&builder, &self.config, progress).await;
        if progress.is_cancelled() {
            return Ok(None);
        }

        progress.set_status(ExtractionStatus::Enriching, "Resolving Wikidata identifiers");
        let enricher = WikidataEnricher::new(Arc::clone(&client));
        let titles = WikidataEnricher::collect_titles(&tree);
        let ids = enricher.fetch_ids(&titles, progress).await;
        WikidataEnricher::enrich(&mut tree, &ids);
        if progress.is_cancelled() {
            return Ok(None);
        }

        progress.set_status(ExtractionStatus::Importing, "Importing region hierarchy");
        let metadata = ImportMetadata {
            source_type: self.config.pipeline.source_type.clone(),
            source: self.config.pipeline.source.clone(),
            description: self.config.pipeline.description.clone(),
            display_name: self.config.pipeline.display_name.clone(),
        };
        let report = self.importer.import(&tree, &metadata, progress).await?;
        progress.set_import_progress(report.progress);
        if progress.is_cancelled() {
            return Ok(None);
        }

        progress.set_status(
            ExtractionStatus::Matching,
            "Matching regions against boundary data",
        );
        let matching = self
            .matcher
            .match_hierarchy(&report.hierarchy_id, progress)
            .await?;
        progress.set_match_progress(matching);

        Ok(Some(format!(
            "Imported {} regions as {} ({} pages fetched, {} API requests, {} cache hits)",
            report.progress.created_regions,
            report.hierarchy_id,
            progress.pages_fetched(),
            progress.api_requests(),
            progress.cache_hits(),
        )))
    }

    /// Drop the run's record once pollers have had time for a last look.
    fn schedule_cleanup(self: &Arc<Self>, run_id: u64) {
        let manager = Arc::clone(self);
        let delay = Duration::from_secs(self.config.pipeline.run_retention_secs);
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            manager.runs.lock().unwrap().remove(&run_id);
        });
    }
}
