//! Intermediate data produced by a single page fetch.

/// One entry from a page's region listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegionEntry {
    /// Page title, or a synthetic grouping label when `has_link` is false
    pub name: String,

    /// Child page titles; meaningful only for grouping entries
    pub items: Vec<String>,

    /// Whether `name` itself resolves to a fetchable page
    pub has_link: bool,
}

impl RegionEntry {
    /// Entry whose name is a fetchable page title.
    pub fn linked(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            items: Vec::new(),
            has_link: true,
        }
    }

    /// Plain-text grouping entry standing for the pages in `items`.
    pub fn grouping(name: impl Into<String>, items: Vec<String>) -> Self {
        Self {
            name: name.into(),
            items,
            has_link: false,
        }
    }
}

/// Everything the tree builder needs from one fetched page.
///
/// Produced once per page during a run and discarded afterwards; only the
/// raw API responses behind it are cached.
#[derive(Debug, Clone, Default)]
pub struct RawPageData {
    /// Title after redirect resolution; may differ from the requested title
    pub resolved_title: String,

    /// Whether the page exists upstream
    pub exists: bool,

    /// Chosen map image URL, if any heuristic matched
    pub map_image_url: Option<String>,

    /// Ordered, deduplicated map-image candidate URLs (chosen one first)
    pub map_image_candidates: Vec<String>,

    /// Parsed region entries in page order
    pub region_entries: Vec<RegionEntry>,
}

impl RawPageData {
    /// Data for a page the API reports as missing.
    pub fn missing(title: impl Into<String>) -> Self {
        Self {
            resolved_title: title.into(),
            exists: false,
            ..Self::default()
        }
    }
}
