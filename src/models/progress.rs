//! Run-scoped progress record shared between a pipeline run and pollers.

use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Phase of an extraction run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExtractionStatus {
    Extracting,
    Enriching,
    Importing,
    Matching,
    Complete,
    Failed,
    Cancelled,
}

impl ExtractionStatus {
    /// Whether the run has finished (successfully or not).
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Complete | Self::Failed | Self::Cancelled)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Extracting => "extracting",
            Self::Enriching => "enriching",
            Self::Importing => "importing",
            Self::Matching => "matching",
            Self::Complete => "complete",
            Self::Failed => "failed",
            Self::Cancelled => "cancelled",
        }
    }
}

/// Counters forwarded verbatim from the import collaborator.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ImportProgress {
    pub created_regions: usize,
    pub total_regions: usize,
}

/// Counters forwarded verbatim from the matching collaborator.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct MatchProgress {
    pub countries_matched: usize,
    pub total_countries: usize,
    pub subdivisions_drilled: usize,
    pub no_candidates: usize,
}

/// Mutable state behind the progress mutex.
#[derive(Debug)]
struct RunState {
    status: ExtractionStatus,
    message: String,
    import: Option<ImportProgress>,
    matching: Option<MatchProgress>,
}

/// Per-run progress record.
///
/// One instance per run, created at submission. The run's own task is the
/// only writer; pollers read eventually-consistent snapshots.
#[derive(Debug)]
pub struct RunProgress {
    cancel: AtomicBool,
    pages_fetched: AtomicU64,
    api_requests: AtomicU64,
    cache_hits: AtomicU64,
    started_at: DateTime<Utc>,
    state: Mutex<RunState>,
}

impl RunProgress {
    pub fn new() -> Self {
        Self {
            cancel: AtomicBool::new(false),
            pages_fetched: AtomicU64::new(0),
            api_requests: AtomicU64::new(0),
            cache_hits: AtomicU64::new(0),
            started_at: Utc::now(),
            state: Mutex::new(RunState {
                status: ExtractionStatus::Extracting,
                message: "Starting extraction".to_string(),
                import: None,
                matching: None,
            }),
        }
    }

    /// Request cooperative cancellation.
    pub fn request_cancel(&self) {
        self.cancel.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.load(Ordering::Relaxed)
    }

    pub fn status(&self) -> ExtractionStatus {
        self.state.lock().unwrap().status
    }

    pub fn is_terminal(&self) -> bool {
        self.status().is_terminal()
    }

    /// Move to a new phase with a fresh status message.
    pub fn set_status(&self, status: ExtractionStatus, message: impl Into<String>) {
        let mut state = self.state.lock().unwrap();
        state.status = status;
        state.message = message.into();
    }

    /// Update the status message without changing phase.
    pub fn set_message(&self, message: impl Into<String>) {
        self.state.lock().unwrap().message = message.into();
    }

    pub fn add_page_fetched(&self) {
        self.pages_fetched.fetch_add(1, Ordering::Relaxed);
    }

    pub fn add_api_request(&self) {
        self.api_requests.fetch_add(1, Ordering::Relaxed);
    }

    pub fn add_cache_hit(&self) {
        self.cache_hits.fetch_add(1, Ordering::Relaxed);
    }

    pub fn pages_fetched(&self) -> u64 {
        self.pages_fetched.load(Ordering::Relaxed)
    }

    pub fn api_requests(&self) -> u64 {
        self.api_requests.load(Ordering::Relaxed)
    }

    pub fn cache_hits(&self) -> u64 {
        self.cache_hits.load(Ordering::Relaxed)
    }

    /// Forward counters reported by the import collaborator.
    pub fn set_import_progress(&self, import: ImportProgress) {
        self.state.lock().unwrap().import = Some(import);
    }

    /// Forward counters reported by the matching collaborator.
    pub fn set_match_progress(&self, matching: MatchProgress) {
        self.state.lock().unwrap().matching = Some(matching);
    }

    /// Point-in-time copy for status polling.
    pub fn snapshot(&self) -> ProgressSnapshot {
        let state = self.state.lock().unwrap();
        ProgressSnapshot {
            status: state.status,
            message: state.message.clone(),
            pages_fetched: self.pages_fetched(),
            api_requests: self.api_requests(),
            cache_hits: self.cache_hits(),
            import: state.import,
            matching: state.matching,
            started_at: self.started_at,
        }
    }
}

impl Default for RunProgress {
    fn default() -> Self {
        Self::new()
    }
}

/// Serializable snapshot of a run's progress.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ProgressSnapshot {
    pub status: ExtractionStatus,
    pub message: String,
    pub pages_fetched: u64,
    pub api_requests: u64,
    pub cache_hits: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub import: Option<ImportProgress>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub matching: Option<MatchProgress>,
    pub started_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_run_is_extracting() {
        let progress = RunProgress::new();
        assert_eq!(progress.status(), ExtractionStatus::Extracting);
        assert!(!progress.is_cancelled());
        assert!(!progress.is_terminal());
    }

    #[test]
    fn test_cancel_flag() {
        let progress = RunProgress::new();
        progress.request_cancel();
        assert!(progress.is_cancelled());
    }

    #[test]
    fn test_terminal_states() {
        assert!(ExtractionStatus::Complete.is_terminal());
        assert!(ExtractionStatus::Failed.is_terminal());
        assert!(ExtractionStatus::Cancelled.is_terminal());
        assert!(!ExtractionStatus::Enriching.is_terminal());
    }

    #[test]
    fn test_snapshot_carries_counters() {
        let progress = RunProgress::new();
        progress.add_page_fetched();
        progress.add_api_request();
        progress.add_api_request();
        progress.add_cache_hit();
        progress.set_status(ExtractionStatus::Enriching, "Resolving identifiers");

        let snapshot = progress.snapshot();
        assert_eq!(snapshot.status, ExtractionStatus::Enriching);
        assert_eq!(snapshot.pages_fetched, 1);
        assert_eq!(snapshot.api_requests, 2);
        assert_eq!(snapshot.cache_hits, 1);
        assert_eq!(snapshot.message, "Resolving identifiers");
    }

    #[test]
    fn test_snapshot_serializes_status_lowercase() {
        let progress = RunProgress::new();
        let json = serde_json::to_value(progress.snapshot()).unwrap();
        assert_eq!(json["status"], "extracting");
    }

    #[test]
    fn test_forwarded_counters() {
        let progress = RunProgress::new();
        progress.set_import_progress(ImportProgress {
            created_regions: 10,
            total_regions: 12,
        });
        let snapshot = progress.snapshot();
        assert_eq!(snapshot.import.unwrap().created_regions, 10);
        assert!(snapshot.matching.is_none());
    }
}
