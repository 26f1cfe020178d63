//! Local filesystem importer.
//!
//! Stands in for the relational importer: serializes the finished tree to
//! one JSON document per run, written atomically (temp file, then rename).

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::io::AsyncWriteExt;

use crate::error::Result;
use crate::models::{ImportProgress, RegionNode, RunProgress};

use super::{ImportMetadata, ImportReport, RegionImporter};

/// Exported document wrapping the finished tree.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct HierarchyExport<'a> {
    display_name: &'a str,
    source_type: &'a str,
    source: &'a str,
    description: &'a str,
    created_at: DateTime<Utc>,
    region_count: usize,
    tree: &'a RegionNode,
}

/// Importer writing hierarchies to a local directory.
pub struct LocalImporter {
    output_dir: PathBuf,
}

impl LocalImporter {
    pub fn new(output_dir: impl Into<PathBuf>) -> Self {
        Self {
            output_dir: output_dir.into(),
        }
    }

    /// Filesystem-safe slug for a display name.
    fn slug(name: &str) -> String {
        let mut out = String::new();
        let mut last_dash = true;
        for c in name.chars() {
            if c.is_ascii_alphanumeric() {
                out.push(c.to_ascii_lowercase());
                last_dash = false;
            } else if !last_dash {
                out.push('-');
                last_dash = true;
            }
        }
        out.trim_end_matches('-').to_string()
    }

    async fn write_atomic(&self, path: &Path, bytes: &[u8]) -> Result<()> {
        tokio::fs::create_dir_all(&self.output_dir).await?;

        let tmp = path.with_extension("json.tmp");
        let mut file = tokio::fs::File::create(&tmp).await?;
        file.write_all(bytes).await?;
        file.flush().await?;
        drop(file);

        tokio::fs::rename(&tmp, path).await?;
        Ok(())
    }
}

#[async_trait]
impl RegionImporter for LocalImporter {
    async fn import(
        &self,
        tree: &RegionNode,
        metadata: &ImportMetadata,
        progress: &RunProgress,
    ) -> Result<ImportReport> {
        let total = tree.node_count();
        progress.set_import_progress(ImportProgress {
            created_regions: 0,
            total_regions: total,
        });

        let stamp = Utc::now().format("%Y%m%d%H%M%S");
        let hierarchy_id = format!("{}-{}", Self::slug(&metadata.display_name), stamp);
        let path = self.output_dir.join(format!("{hierarchy_id}.json"));

        let export = HierarchyExport {
            display_name: &metadata.display_name,
            source_type: &metadata.source_type,
            source: &metadata.source,
            description: &metadata.description,
            created_at: Utc::now(),
            region_count: total,
            tree,
        };
        let bytes = serde_json::to_vec_pretty(&export)?;
        self.write_atomic(&path, &bytes).await?;

        let report = ImportProgress {
            created_regions: total,
            total_regions: total,
        };
        progress.set_import_progress(report);
        log::info!("Exported {} regions to {:?}", total, path);

        Ok(ImportReport {
            hierarchy_id,
            progress: report,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn metadata() -> ImportMetadata {
        ImportMetadata {
            source_type: "wikivoyage".to_string(),
            source: "en.wikivoyage.org".to_string(),
            description: "Test hierarchy".to_string(),
            display_name: "Wikivoyage world hierarchy".to_string(),
        }
    }

    fn tree() -> RegionNode {
        let mut root = RegionNode::new("World");
        root.children.push(RegionNode::new("Europe"));
        root.children.push(RegionNode::new("Asia"));
        root
    }

    #[test]
    fn test_slug() {
        assert_eq!(
            LocalImporter::slug("Wikivoyage world hierarchy"),
            "wikivoyage-world-hierarchy"
        );
        assert_eq!(LocalImporter::slug("  Places!! 2026  "), "places-2026");
    }

    #[tokio::test]
    async fn test_import_writes_parseable_export() {
        let tmp = TempDir::new().unwrap();
        let importer = LocalImporter::new(tmp.path());
        let progress = RunProgress::new();

        let report = importer.import(&tree(), &metadata(), &progress).await.unwrap();
        assert_eq!(report.progress.total_regions, 3);
        assert_eq!(report.progress.created_regions, 3);

        let path = tmp.path().join(format!("{}.json", report.hierarchy_id));
        let bytes = tokio::fs::read(&path).await.unwrap();
        let value: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(value["regionCount"], 3);
        assert_eq!(value["tree"]["name"], "World");
        assert_eq!(value["tree"]["children"][0]["name"], "Europe");

        // no temp file left behind
        assert!(!path.with_extension("json.tmp").exists());
    }

    #[tokio::test]
    async fn test_import_forwards_progress_counters() {
        let tmp = TempDir::new().unwrap();
        let importer = LocalImporter::new(tmp.path());
        let progress = RunProgress::new();

        importer.import(&tree(), &metadata(), &progress).await.unwrap();
        let snapshot = progress.snapshot();
        assert_eq!(snapshot.import.unwrap().created_regions, 3);
    }
}
