// src/storage/mod.rs

//! Downstream collaborator seams for finished hierarchies.
//!
//! The production deployment persists the tree into the application's
//! relational model and matches countries against boundary data; both live
//! outside this crate. This module holds the traits they implement plus
//! the defaults the crate ships: an atomic JSON exporter and a matcher
//! that does nothing.

pub mod local;

use async_trait::async_trait;

use crate::error::Result;
use crate::models::{ImportProgress, MatchProgress, RegionNode, RunProgress};

// Re-export for convenience
pub use local::LocalImporter;

/// Run metadata handed to the import collaborator.
#[derive(Debug, Clone)]
pub struct ImportMetadata {
    /// Kind of source the hierarchy came from (e.g. "wikivoyage")
    pub source_type: String,

    /// Attribution string (e.g. "en.wikivoyage.org")
    pub source: String,

    /// Human-readable description of the hierarchy
    pub description: String,

    /// Display name of the hierarchy
    pub display_name: String,
}

/// Result of an import handoff.
#[derive(Debug, Clone)]
pub struct ImportReport {
    /// Identifier of the created hierarchy
    pub hierarchy_id: String,

    /// The collaborator's own counters, forwarded verbatim
    pub progress: ImportProgress,
}

/// Accepts a completed region tree and persists it somewhere.
#[async_trait]
pub trait RegionImporter: Send + Sync {
    /// Import the tree, reporting progress into the run's record.
    async fn import(
        &self,
        tree: &RegionNode,
        metadata: &ImportMetadata,
        progress: &RunProgress,
    ) -> Result<ImportReport>;
}

/// Matches imported regions against authoritative boundary data.
#[async_trait]
pub trait RegionMatcher: Send + Sync {
    /// Match the hierarchy, reporting progress into the run's record.
    async fn match_hierarchy(
        &self,
        hierarchy_id: &str,
        progress: &RunProgress,
    ) -> Result<MatchProgress>;
}

/// Matcher used when no boundary-matching backend is wired in.
pub struct NoopMatcher;

#[async_trait]
impl RegionMatcher for NoopMatcher {
    async fn match_hierarchy(
        &self,
        hierarchy_id: &str,
        progress: &RunProgress,
    ) -> Result<MatchProgress> {
        log::info!("No matcher configured, skipping {}", hierarchy_id);
        let report = MatchProgress::default();
        progress.set_match_progress(report);
        Ok(report)
    }
}
