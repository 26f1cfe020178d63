//! Recursive region-tree construction.

use std::collections::HashSet;
use std::sync::Arc;

use futures::FutureExt;
use futures::future::BoxFuture;
use serde_json::Value;

use crate::models::{Config, RawPageData, RegionEntry, RegionNode, RunProgress};
use crate::parser;
use crate::utils::url::{file_url, page_url};

use super::fetcher::{WikiClient, is_error};

/// Outcome of building one page into a tree node.
///
/// Self-references and missing pages are expected results with defined
/// tree-shape consequences, not errors; callers must handle all three
/// cases explicitly.
#[derive(Debug)]
pub enum BuildOutcome {
    /// A fully built subtree
    Node(RegionNode),
    /// The page, directly or via redirect, is already among its own
    /// branch ancestors
    SelfReference,
    /// The page does not exist upstream, or its fetch failed permanently
    Missing,
}

/// Builds the region tree by recursively fetching and parsing pages.
pub struct RegionTreeBuilder {
    client: Arc<WikiClient>,
    config: Arc<Config>,
}

impl RegionTreeBuilder {
    pub fn new(client: Arc<WikiClient>, config: Arc<Config>) -> Self {
        Self { client, config }
    }

    /// Build the subtree rooted at `title`.
    ///
    /// `ancestors` holds the titles along this branch only; sibling
    /// branches never share it. That is what lets the same region appear
    /// under two different parents (a transcontinental country, say) while
    /// still rejecting true cycles.
    ///
    /// Children are built sequentially: the shared client already
    /// serializes physical requests, and sequential traversal keeps the
    /// ancestry bookkeeping simple.
    pub fn build<'a>(
        &'a self,
        title: &'a str,
        depth: usize,
        ancestors: &'a HashSet<String>,
        progress: &'a RunProgress,
    ) -> BoxFuture<'a, BuildOutcome> {
        async move {
            if ancestors.contains(title) {
                return BuildOutcome::SelfReference;
            }

            let mut node = RegionNode::new(title);
            node.source_url = Some(page_url(self.client.endpoint(), title));

            // cancelled or too deep: keep the node, stop fetching
            if progress.is_cancelled() || depth >= self.config.pipeline.max_depth {
                return BuildOutcome::Node(node);
            }

            let page = self.fetch_page(title, progress).await;
            if !page.exists {
                return BuildOutcome::Missing;
            }
            if ancestors.contains(&page.resolved_title) {
                return BuildOutcome::SelfReference;
            }

            node.name = page.resolved_title.clone();
            node.source_url = Some(page_url(self.client.endpoint(), &page.resolved_title));
            node.region_map_url = page.map_image_url.clone();
            if !page.map_image_candidates.is_empty() {
                node.map_image_candidates = Some(page.map_image_candidates.clone());
            }

            let mut child_ancestors = ancestors.clone();
            child_ancestors.insert(title.to_string());
            child_ancestors.insert(page.resolved_title.clone());

            for entry in &page.region_entries {
                if progress.is_cancelled() {
                    break;
                }
                if entry.has_link {
                    match self
                        .build(&entry.name, depth + 1, &child_ancestors, progress)
                        .await
                    {
                        BuildOutcome::Node(child) => node.children.push(child),
                        BuildOutcome::SelfReference => node.children.push(self.leaf(&entry.name)),
                        BuildOutcome::Missing => {
                            log::debug!("Dropping missing page {:?}", entry.name);
                        }
                    }
                } else {
                    // grouping: a transparent container, items stay at the
                    // same depth
                    let mut group = RegionNode::new(&entry.name);
                    for item in &entry.items {
                        if progress.is_cancelled() {
                            break;
                        }
                        match self.build(item, depth, &child_ancestors, progress).await {
                            BuildOutcome::Node(child) => group.children.push(child),
                            BuildOutcome::SelfReference => group.children.push(self.leaf(item)),
                            BuildOutcome::Missing => {
                                log::debug!("Dropping missing page {:?}", item);
                            }
                        }
                    }
                    if !group.children.is_empty() {
                        node.children.push(group);
                    }
                }
            }

            BuildOutcome::Node(node)
        }
        .boxed()
    }

    /// Name-only stub for self-referencing children.
    fn leaf(&self, title: &str) -> RegionNode {
        let mut node = RegionNode::new(title);
        node.source_url = Some(page_url(self.client.endpoint(), title));
        node
    }

    /// Fetch and parse everything the builder needs from one page.
    ///
    /// Sections first; the region section's wikitext when one exists; the
    /// full page text only as a fallback source of map images.
    async fn fetch_page(&self, title: &str, progress: &RunProgress) -> RawPageData {
        let sections_resp = self
            .client
            .api_get(
                &[
                    ("action", "parse"),
                    ("page", title),
                    ("prop", "sections"),
                    ("redirects", "1"),
                ],
                progress,
            )
            .await;

        if is_error(&sections_resp) {
            return RawPageData::missing(title);
        }

        let resolved_title = sections_resp["parse"]["title"]
            .as_str()
            .unwrap_or(title)
            .to_string();
        let sections = parse_sections(&sections_resp);

        progress.add_page_fetched();
        progress.set_message(format!("Extracting {}", resolved_title));
        log::debug!("Fetched {:?}", resolved_title);

        let mut page = RawPageData {
            resolved_title,
            exists: true,
            ..RawPageData::default()
        };
        let cap = self.config.crawler.max_image_candidates;

        if let Some(section_index) = parser::find_region_section(&sections) {
            let text_resp = self
                .client
                .api_get(
                    &[
                        ("action", "parse"),
                        ("page", title),
                        ("prop", "wikitext"),
                        ("section", section_index),
                        ("redirects", "1"),
                    ],
                    progress,
                )
                .await;

            if let Some(raw) = text_resp["parse"]["wikitext"].as_str() {
                let text = parser::strip_comments(raw);
                match parser::parse_region_list(&text) {
                    Some(list) => {
                        page.region_entries = list.entries;
                        for extra in list.extra_links {
                            if !page.region_entries.iter().any(|e| e.name == extra) {
                                page.region_entries.push(RegionEntry::linked(extra));
                            }
                        }
                        page.map_image_url =
                            list.map_image.or_else(|| parser::find_map_image(&text));
                    }
                    None => {
                        page.region_entries = parser::parse_bullet_links(&text)
                            .into_iter()
                            .map(RegionEntry::linked)
                            .collect();
                        page.map_image_url = parser::find_map_image(&text);
                    }
                }
                page.map_image_candidates = parser::collect_image_candidates(&text, cap);
            }
        }

        if page.map_image_url.is_none() || page.map_image_candidates.is_empty() {
            let full_resp = self
                .client
                .api_get(
                    &[
                        ("action", "parse"),
                        ("page", title),
                        ("prop", "wikitext"),
                        ("redirects", "1"),
                    ],
                    progress,
                )
                .await;

            if let Some(raw) = full_resp["parse"]["wikitext"].as_str() {
                let text = parser::strip_comments(raw);
                if page.map_image_url.is_none() {
                    page.map_image_url = parser::find_map_image(&text);
                }
                for candidate in parser::collect_image_candidates(&text, cap) {
                    if page.map_image_candidates.len() >= cap {
                        break;
                    }
                    if !page.map_image_candidates.contains(&candidate) {
                        page.map_image_candidates.push(candidate);
                    }
                }
            }
        }

        finalize_images(&mut page);
        page
    }
}

/// Section index entries from an `action=parse&prop=sections` response.
fn parse_sections(resp: &Value) -> Vec<parser::PageSection> {
    resp["parse"]["sections"]
        .as_array()
        .map(|list| {
            list.iter()
                .filter_map(|section| {
                    let line = section.get("line")?.as_str()?.to_string();
                    let index = match section.get("index")? {
                        Value::String(text) => text.clone(),
                        Value::Number(number) => number.to_string(),
                        _ => return None,
                    };
                    Some(parser::PageSection { index, line })
                })
                .collect()
        })
        .unwrap_or_default()
}

/// Turn parsed filenames into fetchable URLs, chosen map first.
fn finalize_images(page: &mut RawPageData) {
    let chosen = page.map_image_url.take().map(|name| file_url(&name));
    let mut urls: Vec<String> = Vec::new();
    if let Some(url) = &chosen {
        urls.push(url.clone());
    }
    for name in std::mem::take(&mut page.map_image_candidates) {
        let url = file_url(&name);
        if !urls.contains(&url) {
            urls.push(url);
        }
    }
    page.map_image_url = chosen;
    page.map_image_candidates = urls;
}
