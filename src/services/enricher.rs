//! Batched Wikidata identifier lookup.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use serde_json::Value;

use crate::models::{RegionNode, RunProgress};

use super::fetcher::{WikiClient, is_error};

/// The query API accepts at most this many titles per request.
const BATCH_SIZE: usize = 50;

/// Normalization/redirect chains longer than this are abandoned.
const MAX_HOPS: usize = 5;

/// Resolves Wikidata identifiers for every title in a built tree.
pub struct WikidataEnricher {
    client: Arc<WikiClient>,
}

impl WikidataEnricher {
    pub fn new(client: Arc<WikiClient>) -> Self {
        Self { client }
    }

    /// All node names in pre-order, root included, deduplicated.
    pub fn collect_titles(node: &RegionNode) -> Vec<String> {
        let mut titles = Vec::new();
        let mut seen = HashSet::new();
        collect_into(node, &mut titles, &mut seen);
        titles
    }

    /// Resolve identifiers for `titles`, keyed by the *requested* title
    /// even when the API reports it normalized or redirected elsewhere.
    pub async fn fetch_ids(
        &self,
        titles: &[String],
        progress: &RunProgress,
    ) -> HashMap<String, String> {
        let mut ids = HashMap::new();
        let mut resolved = 0usize;

        for batch in titles.chunks(BATCH_SIZE) {
            if progress.is_cancelled() {
                break;
            }
            progress.set_message(format!(
                "Resolving identifiers ({} of {})",
                resolved,
                titles.len()
            ));

            let joined = batch.join("|");
            let resp = self
                .client
                .api_get(
                    &[
                        ("action", "query"),
                        ("titles", &joined),
                        ("prop", "pageprops"),
                        ("ppprop", "wikibase_item"),
                        ("redirects", "1"),
                    ],
                    progress,
                )
                .await;

            if is_error(&resp) {
                log::warn!("Identifier batch failed, {} titles skipped", batch.len());
            } else {
                merge_batch(batch, &resp, &mut ids);
            }
            resolved += batch.len();
        }

        ids
    }

    /// Attach identifiers to every node whose name has one.
    ///
    /// Nodes without a match stay undecorated; absence is not an error.
    pub fn enrich(node: &mut RegionNode, ids: &HashMap<String, String>) {
        if let Some(id) = ids.get(&node.name) {
            node.wikidata_id = Some(id.clone());
        }
        for child in &mut node.children {
            Self::enrich(child, ids);
        }
    }
}

fn collect_into(node: &RegionNode, titles: &mut Vec<String>, seen: &mut HashSet<String>) {
    if seen.insert(node.name.clone()) {
        titles.push(node.name.clone());
    }
    for child in &node.children {
        collect_into(child, titles, seen);
    }
}

/// Fold one query response into the identifier map.
///
/// The response's `normalized` and `redirects` arrays describe title
/// rewrites; following them (bounded) maps an identifier found under the
/// final title back to the title that was actually asked for.
fn merge_batch(batch: &[String], resp: &Value, ids: &mut HashMap<String, String>) {
    let query = &resp["query"];

    let mut rewrites: HashMap<String, String> = HashMap::new();
    for key in ["normalized", "redirects"] {
        if let Some(list) = query[key].as_array() {
            for hop in list {
                if let (Some(from), Some(to)) = (hop["from"].as_str(), hop["to"].as_str()) {
                    rewrites.insert(from.to_string(), to.to_string());
                }
            }
        }
    }

    let mut by_title: HashMap<&str, &str> = HashMap::new();
    if let Some(pages) = query["pages"].as_array() {
        for page in pages {
            if let (Some(title), Some(id)) = (
                page["title"].as_str(),
                page["pageprops"]["wikibase_item"].as_str(),
            ) {
                by_title.insert(title, id);
            }
        }
    }

    for requested in batch {
        let mut current = requested.as_str();
        for _ in 0..=MAX_HOPS {
            if let Some(id) = by_title.get(current) {
                ids.insert(requested.clone(), id.to_string());
                break;
            }
            match rewrites.get(current) {
                Some(next) => current = next,
                None => break,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use crate::models::{ApiConfig, CrawlerConfig};

    async fn test_enricher(server: &MockServer, dir: &TempDir) -> WikidataEnricher {
        let api = ApiConfig {
            endpoint: format!("{}/w/api.php", server.uri()),
            user_agent: "region-crawler test".to_string(),
            timeout_secs: 5,
        };
        let crawler = CrawlerConfig {
            min_interval_ms: 0,
            max_retries: 2,
            retry_backoff_ms: 1,
            retry_after_default_secs: 0,
            cache_flush_every: 1000,
            max_image_candidates: 15,
        };
        let client = WikiClient::new(&api, &crawler, dir.path()).await.unwrap();
        WikidataEnricher::new(Arc::new(client))
    }

    fn tree() -> RegionNode {
        let mut root = RegionNode::new("World");
        let mut europe = RegionNode::new("Europe");
        europe.children.push(RegionNode::new("France"));
        root.children.push(europe);
        root.children.push(RegionNode::new("France")); // transcontinental duplicate
        root
    }

    #[test]
    fn test_collect_titles_preorder_dedup() {
        assert_eq!(
            WikidataEnricher::collect_titles(&tree()),
            vec!["World", "Europe", "France"]
        );
    }

    #[test]
    fn test_enrich_decorates_matches_only() {
        let mut root = tree();
        let ids: HashMap<String, String> = [("France".to_string(), "Q142".to_string())]
            .into_iter()
            .collect();
        WikidataEnricher::enrich(&mut root, &ids);

        assert!(root.wikidata_id.is_none());
        assert_eq!(root.children[0].children[0].wikidata_id.as_deref(), Some("Q142"));
        assert_eq!(root.children[1].wikidata_id.as_deref(), Some("Q142"));
    }

    #[tokio::test]
    async fn test_fetch_ids_follows_redirects_back() {
        let server = MockServer::start().await;
        let tmp = TempDir::new().unwrap();

        Mock::given(method("GET"))
            .and(path("/w/api.php"))
            .and(query_param("action", "query"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "query": {
                    "normalized": [{"from": "côte d'ivoire", "to": "Côte d'Ivoire"}],
                    "redirects": [{"from": "Côte d'Ivoire", "to": "Ivory Coast"}],
                    "pages": [
                        {"title": "Ivory Coast", "pageprops": {"wikibase_item": "Q1008"}},
                        {"title": "France", "pageprops": {"wikibase_item": "Q142"}},
                        {"title": "Nowhere"}
                    ]
                }
            })))
            .mount(&server)
            .await;

        let enricher = test_enricher(&server, &tmp).await;
        let progress = RunProgress::new();
        let titles = vec![
            "côte d'ivoire".to_string(),
            "France".to_string(),
            "Nowhere".to_string(),
        ];
        let ids = enricher.fetch_ids(&titles, &progress).await;

        // the identifier maps back to the requested title, not the target
        assert_eq!(ids.get("côte d'ivoire").map(String::as_str), Some("Q1008"));
        assert_eq!(ids.get("France").map(String::as_str), Some("Q142"));
        assert!(!ids.contains_key("Nowhere"));
        assert!(!ids.contains_key("Ivory Coast"));
    }

    #[tokio::test]
    async fn test_fetch_ids_batches_at_fifty() {
        let server = MockServer::start().await;
        let tmp = TempDir::new().unwrap();

        Mock::given(method("GET"))
            .and(path("/w/api.php"))
            .and(query_param("action", "query"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(serde_json::json!({"query": {"pages": []}})),
            )
            .expect(2)
            .mount(&server)
            .await;

        let enricher = test_enricher(&server, &tmp).await;
        let progress = RunProgress::new();
        let titles: Vec<String> = (0..52).map(|i| format!("Region {i}")).collect();
        enricher.fetch_ids(&titles, &progress).await;

        assert_eq!(progress.api_requests(), 2);
    }
}
