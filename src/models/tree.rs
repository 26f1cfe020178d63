//! The extracted region tree.

use serde::{Deserialize, Serialize};

/// One node of the extracted region hierarchy.
///
/// Children are exclusively owned by their parent; the tree is built by the
/// tree builder, decorated in place by the enricher, and handed by value to
/// the import collaborator. It is never mutated after import.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct RegionNode {
    /// Region name (resolved page title, or a grouping label)
    pub name: String,

    /// Chosen map image URL
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub region_map_url: Option<String>,

    /// All map-image candidate URLs, chosen one first
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub map_image_candidates: Option<Vec<String>>,

    /// Wikidata identifier (e.g. "Q142")
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub wikidata_id: Option<String>,

    /// Canonical URL of the source page
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_url: Option<String>,

    /// Sub-regions in page order
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<RegionNode>,
}

impl RegionNode {
    /// Create a childless node with only a name.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            region_map_url: None,
            map_image_candidates: None,
            wikidata_id: None,
            source_url: None,
            children: Vec::new(),
        }
    }

    /// Total number of nodes in this subtree, the node itself included.
    pub fn node_count(&self) -> usize {
        1 + self.children.iter().map(RegionNode::node_count).sum::<usize>()
    }

    /// Depth of this subtree; a childless node has depth 1.
    pub fn depth(&self) -> usize {
        1 + self
            .children
            .iter()
            .map(RegionNode::depth)
            .max()
            .unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_tree() -> RegionNode {
        let mut root = RegionNode::new("World");
        let mut europe = RegionNode::new("Europe");
        europe.children.push(RegionNode::new("France"));
        root.children.push(europe);
        root.children.push(RegionNode::new("Antarctica"));
        root
    }

    #[test]
    fn test_node_count() {
        assert_eq!(sample_tree().node_count(), 4);
    }

    #[test]
    fn test_depth() {
        assert_eq!(sample_tree().depth(), 3);
        assert_eq!(RegionNode::new("Leaf").depth(), 1);
    }

    #[test]
    fn test_serialization_skips_empty_fields() {
        let json = serde_json::to_value(RegionNode::new("France")).unwrap();
        assert_eq!(json, serde_json::json!({"name": "France"}));
    }

    #[test]
    fn test_serialization_camel_case() {
        let mut node = RegionNode::new("France");
        node.wikidata_id = Some("Q142".to_string());
        node.source_url = Some("https://en.wikivoyage.org/wiki/France".to_string());
        let json = serde_json::to_value(&node).unwrap();
        assert_eq!(json["wikidataId"], "Q142");
        assert!(json["sourceUrl"].as_str().unwrap().ends_with("France"));
    }
}
