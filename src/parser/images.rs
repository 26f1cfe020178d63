//! Map-image heuristics.
//!
//! Pages embed many images; only a minority are actual region maps. The
//! selection runs three ordered passes of decreasing confidence, first
//! match wins.

use std::sync::LazyLock;

use regex::Regex;

use super::regionlist;

/// Any filename with an image extension, wherever it appears: inside a
/// `[[File:...]]` link or as a bare template parameter value.
static FILE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)(\w[^\[\]{}|=:\n]*?\.(?:svg|png|jpe?g|gif))").unwrap()
});

/// Substrings that mark a filename as a map in several languages.
const STRONG_KEYWORDS: &[&str] = &["map", "karte", "carte", "mappa", "mapa"];

/// Substrings that disqualify a filename outright.
const HARD_SKIP: &[&str] = &[
    "locator", "flag", "coat", "seal", "emblem", "logo", "icon", "banner",
];

/// Additional disqualifiers for the lower-confidence passes; scenery and
/// photo collages often carry region names without being maps.
const SOFT_SKIP_EXTRA: &[&str] = &[
    "photo", "montage", "collage", "skyline", "panorama", "landscape",
    "scenery", "view", "landmark", "sunset", "beach", "street",
];

/// Administrative-division words as whole words, singular or plural.
static WEAK_WORD_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)\b(?:regions?|districts?|provinces?|prefectures?|county|counties|cantons?|oblasts?|kommuner?|comarcas?|departments?)\b",
    )
    .unwrap()
});

/// Collect every image filename referenced in the text, in order.
pub fn file_refs(text: &str) -> Vec<String> {
    FILE_RE
        .captures_iter(text)
        .filter_map(|caps| caps.get(1))
        .map(|m| m.as_str().trim().to_string())
        .collect()
}

fn has_strong_keyword(lower: &str) -> bool {
    STRONG_KEYWORDS.iter().any(|kw| lower.contains(kw))
}

fn is_hard_skipped(lower: &str) -> bool {
    HARD_SKIP.iter().any(|term| lower.contains(term))
}

fn is_soft_skipped(lower: &str) -> bool {
    is_hard_skipped(lower) || SOFT_SKIP_EXTRA.iter().any(|term| lower.contains(term))
}

fn has_extension(lower: &str, exts: &[&str]) -> bool {
    exts.iter().any(|ext| lower.ends_with(ext))
}

/// Pick the most likely region-map filename from page text.
///
/// Pass 1: any file whose name contains a strong map keyword, unless hard
/// skipped. Pass 2: any SVG/PNG naming an administrative division as a
/// whole word, unless soft skipped. Pass 3: inside the region-list template
/// only, the first SVG surviving the soft skip list.
pub fn find_map_image(text: &str) -> Option<String> {
    let refs = file_refs(text);

    for name in &refs {
        let lower = name.to_lowercase();
        if has_strong_keyword(&lower) && !is_hard_skipped(&lower) {
            return Some(name.clone());
        }
    }

    for name in &refs {
        let lower = name.to_lowercase();
        if has_extension(&lower, &[".svg", ".png"])
            && WEAK_WORD_RE.is_match(name)
            && !is_soft_skipped(&lower)
        {
            return Some(name.clone());
        }
    }

    if let Some(body) = regionlist::template_body(text) {
        for name in file_refs(body) {
            let lower = name.to_lowercase();
            if lower.ends_with(".svg") && !is_soft_skipped(&lower) {
                return Some(name);
            }
        }
    }

    None
}

/// Broad candidate collection for manual map selection downstream.
///
/// Keeps all SVG/PNG files that are not hard skipped; JPEGs only when the
/// filename carries a map-related keyword. Deduplicated in first-seen
/// order, capped at `cap`.
pub fn collect_image_candidates(text: &str, cap: usize) -> Vec<String> {
    let mut seen = std::collections::HashSet::new();
    let mut out = Vec::new();

    for name in file_refs(text) {
        if out.len() >= cap {
            break;
        }
        let lower = name.to_lowercase();
        if is_hard_skipped(&lower) {
            continue;
        }
        let keep = if has_extension(&lower, &[".svg", ".png"]) {
            true
        } else if has_extension(&lower, &[".jpg", ".jpeg"]) {
            has_strong_keyword(&lower) || WEAK_WORD_RE.is_match(&name)
        } else {
            false
        };
        if keep && seen.insert(lower) {
            out.push(name);
        }
    }

    out
}
