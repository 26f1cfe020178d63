//! Structured region-list template parsing.
//!
//! The template declares an ordered set of sub-regions:
//!
//! ```text
//! {{Regionlist
//! | regionmap=France regions.png
//! | region1name=[[Northern France]]
//! | region1items=[[Paris]], [[Lille]]
//! | region2name=...
//! }}
//! ```

use std::collections::BTreeMap;
use std::sync::LazyLock;

use regex::Regex;

use crate::models::RegionEntry;

use super::bullets::parse_bullet_links;
use super::images::file_refs;
use super::links::{classify_multi_link, extract_links, strip_markup};

static TEMPLATE_START_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\{\{\s*regionlist").unwrap());

static NAME_KEY_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^region(\d+)name$").unwrap());

static ITEMS_KEY_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^region(\d+)items$").unwrap());

/// Parsed contents of a region-list template.
#[derive(Debug, Clone, Default)]
pub struct RegionList {
    /// Per-index entries in declaration order
    pub entries: Vec<RegionEntry>,

    /// Map image declared by the template's `regionmap` parameter
    pub map_image: Option<String>,

    /// Bullet links appearing strictly after the template's closing braces
    pub extra_links: Vec<String>,
}

/// Byte span of the region-list template, closing braces included.
fn template_span(text: &str) -> Option<(usize, usize)> {
    let start = TEMPLATE_START_RE.find(text)?.start();
    let mut depth = 0usize;
    let mut i = start;
    while i < text.len() {
        let rest = &text[i..];
        if rest.starts_with("{{") {
            depth += 1;
            i += 2;
        } else if rest.starts_with("}}") {
            depth = depth.saturating_sub(1);
            i += 2;
            if depth == 0 {
                return Some((start, i));
            }
        } else {
            i += rest.chars().next()?.len_utf8();
        }
    }
    None
}

/// The template's inner text, braces stripped. `None` when the page has no
/// region-list template.
pub fn template_body(text: &str) -> Option<&str> {
    let (start, end) = template_span(text)?;
    Some(&text[start + 2..end - 2])
}

/// Split a template body into parameters on top-level `|`, leaving pipes
/// inside nested links and templates alone.
fn split_params(body: &str) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut depth = 0usize;
    let mut last = 0;
    let mut i = 0;
    while i < body.len() {
        let rest = &body[i..];
        if rest.starts_with("[[") || rest.starts_with("{{") {
            depth += 1;
            i += 2;
        } else if rest.starts_with("]]") || rest.starts_with("}}") {
            depth = depth.saturating_sub(1);
            i += 2;
        } else if depth == 0 && rest.starts_with('|') {
            parts.push(&body[last..i]);
            i += 1;
            last = i;
        } else {
            match rest.chars().next() {
                Some(c) => i += c.len_utf8(),
                None => break,
            }
        }
    }
    parts.push(&body[last..]);
    parts
}

/// Parse the region-list template out of section wikitext.
///
/// Per index: one link in the name makes a normal linked entry, two or
/// more go through multi-link classification, none makes a plain-text
/// grouping fed by the items parameter. Groupings that end up with no
/// items are dropped; they could never contribute tree nodes.
pub fn parse_region_list(text: &str) -> Option<RegionList> {
    let (start, end) = template_span(text)?;
    let body = &text[start + 2..end - 2];

    let mut names: BTreeMap<usize, &str> = BTreeMap::new();
    let mut items: BTreeMap<usize, &str> = BTreeMap::new();
    let mut map_image = None;

    // first segment is the template name itself
    for param in split_params(body).into_iter().skip(1) {
        let Some((key, value)) = param.split_once('=') else {
            continue;
        };
        let key = key.trim().to_lowercase();
        let value = value.trim();

        if key == "regionmap" {
            if !value.is_empty() {
                map_image = file_refs(value)
                    .into_iter()
                    .next()
                    .or_else(|| Some(value.to_string()));
            }
        } else if let Some(caps) = NAME_KEY_RE.captures(&key) {
            if let Ok(idx) = caps[1].parse::<usize>() {
                names.insert(idx, value);
            }
        } else if let Some(caps) = ITEMS_KEY_RE.captures(&key) {
            if let Ok(idx) = caps[1].parse::<usize>() {
                items.insert(idx, value);
            }
        }
    }

    let mut entries = Vec::new();
    for (idx, name_text) in &names {
        let found = extract_links(name_text);
        match found.len() {
            0 => {
                let name = strip_markup(name_text);
                if name.is_empty() {
                    continue;
                }
                let children = items
                    .get(idx)
                    .map(|text| extract_links(text))
                    .unwrap_or_default();
                entries.push(RegionEntry::grouping(name, children));
            }
            1 => entries.push(RegionEntry::linked(found[0].clone())),
            _ => entries.push(classify_multi_link(&found, name_text)),
        }
    }
    entries.retain(|entry| entry.has_link || !entry.items.is_empty());

    let extra_links = parse_bullet_links(&text[end..]);

    Some(RegionList {
        entries,
        map_image,
        extra_links,
    })
}
