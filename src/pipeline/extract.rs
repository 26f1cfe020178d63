// src/pipeline/extract.rs

//! Extraction phase: anchor pages into one assembled world tree.

use std::collections::HashSet;

use crate::models::{Config, RegionNode, RunProgress};
use crate::services::{BuildOutcome, RegionTreeBuilder};
use crate::utils::log;

/// Build every configured anchor page and assemble the survivors under a
/// synthetic root.
///
/// Anchors that are missing or self-referencing are skipped with a
/// warning. A cancelled run keeps whatever was finished so far; deciding
/// whether a partial tree is usable is the orchestrator's call.
pub async fn run_extraction(
    builder: &RegionTreeBuilder,
    config: &Config,
    progress: &RunProgress,
) -> RegionNode {
    let mut root = RegionNode::new(&config.pipeline.root_name);

    for anchor in &config.pipeline.anchor_pages {
        if progress.is_cancelled() {
            break;
        }
        progress.set_message(format!("Extracting {}", anchor));
        if config.logging.show_progress {
            log::info(&format!("Extracting anchor {}", anchor));
        }

        match builder.build(anchor, 0, &HashSet::new(), progress).await {
            BuildOutcome::Node(node) => root.children.push(node),
            BuildOutcome::SelfReference => {
                log::warn(&format!("Anchor {} references itself, skipped", anchor));
            }
            BuildOutcome::Missing => {
                log::warn(&format!("Anchor page {} not found, skipped", anchor));
            }
        }
    }

    root
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use tempfile::TempDir;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use crate::models::{ApiConfig, CrawlerConfig};
    use crate::services::WikiClient;

    async fn mount_leaf(server: &MockServer, title: &str) {
        Mock::given(method("GET"))
            .and(path("/w/api.php"))
            .and(query_param("page", title))
            .and(query_param("prop", "sections"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "parse": {"title": title, "sections": [{"index": "1", "line": "Understand"}]}
            })))
            .mount(server)
            .await;
        Mock::given(method("GET"))
            .and(path("/w/api.php"))
            .and(query_param("page", title))
            .and(query_param("prop", "wikitext"))
            .respond_with(ResponseTemplate::new(200).set_body_json(
                serde_json::json!({"parse": {"title": title, "wikitext": ""}}),
            ))
            .mount(server)
            .await;
    }

    async fn mount_missing(server: &MockServer, title: &str) {
        Mock::given(method("GET"))
            .and(path("/w/api.php"))
            .and(query_param("page", title))
            .respond_with(ResponseTemplate::new(200).set_body_json(
                serde_json::json!({"error": {"code": "missingtitle", "info": "no such page"}}),
            ))
            .mount(server)
            .await;
    }

    #[tokio::test]
    async fn test_missing_anchor_excluded_from_root() {
        let server = MockServer::start().await;
        let tmp = TempDir::new().unwrap();

        mount_leaf(&server, "Europe").await;
        mount_missing(&server, "Atlantis").await;

        let mut config = Config::default();
        config.api = ApiConfig {
            endpoint: format!("{}/w/api.php", server.uri()),
            user_agent: "region-crawler test".to_string(),
            timeout_secs: 5,
        };
        config.crawler = CrawlerConfig {
            min_interval_ms: 0,
            max_retries: 2,
            retry_backoff_ms: 1,
            retry_after_default_secs: 0,
            cache_flush_every: 1000,
            max_image_candidates: 15,
        };
        config.pipeline.anchor_pages = vec!["Europe".to_string(), "Atlantis".to_string()];
        config.logging.show_progress = false;
        let config = Arc::new(config);

        let client = WikiClient::new(&config.api, &config.crawler, tmp.path())
            .await
            .unwrap();
        let builder = RegionTreeBuilder::new(Arc::new(client), Arc::clone(&config));
        let progress = RunProgress::new();

        let root = run_extraction(&builder, &config, &progress).await;
        assert_eq!(root.name, "World");
        assert_eq!(root.children.len(), 1);
        assert_eq!(root.children[0].name, "Europe");
    }
}
