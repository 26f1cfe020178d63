//! Bullet-list fallback parsing.
//!
//! Pages without a structured region list usually carry their sub-regions
//! as a plain bulleted list, one region per bullet with a trailing
//! description.

use std::collections::HashSet;
use std::sync::LazyLock;

use regex::Regex;

use super::links::extract_links;

/// Bullets that merely point at content described on another page. The
/// phrase list covers the wording observed upstream; it is a heuristic,
/// kept in one place so it can grow.
static CROSS_REF_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)described\s+(?:separately|elsewhere|in\s*\[\[|as\s*\[\[)").unwrap()
});

/// Dash-style separators between a region link and its description. A bare
/// hyphen only counts when space-surrounded, so hyphenated names survive.
static DASH_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s-\s|[–—]|&mdash;|&ndash;").unwrap());

/// Extract one link per bullet line.
///
/// Only the portion before the first dash-style separator is considered.
/// A bullet matching the cross-reference phrase is skipped together with
/// every deeper-indented bullet under it, until indentation returns to or
/// above the skipped level. Results are deduplicated in first-seen order.
pub fn parse_bullet_links(text: &str) -> Vec<String> {
    let mut out = Vec::new();
    let mut seen = HashSet::new();
    let mut skip_depth: Option<usize> = None;

    for line in text.lines() {
        let trimmed = line.trim_start();
        let depth = trimmed.chars().take_while(|c| *c == '*').count();
        if depth == 0 {
            continue;
        }

        if let Some(skipped) = skip_depth {
            if depth > skipped {
                continue;
            }
            skip_depth = None;
        }

        let content = trimmed[depth..].trim();
        if CROSS_REF_RE.is_match(content) {
            skip_depth = Some(depth);
            continue;
        }

        let head = match DASH_RE.find(content) {
            Some(m) => &content[..m.start()],
            None => content,
        };

        if let Some(target) = extract_links(head).into_iter().next() {
            if seen.insert(target.clone()) {
                out.push(target);
            }
        }
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_one_link_per_bullet() {
        let text = "* [[Normandy]] — cider country\n* [[Brittany]] - the wild west";
        assert_eq!(parse_bullet_links(text), vec!["Normandy", "Brittany"]);
    }

    #[test]
    fn test_link_after_dash_ignored() {
        let text = "* [[Normandy]] — near [[Paris]]";
        assert_eq!(parse_bullet_links(text), vec!["Normandy"]);
    }

    #[test]
    fn test_hyphenated_name_survives() {
        let text = "* [[Guinea-Bissau]] is tiny";
        assert_eq!(parse_bullet_links(text), vec!["Guinea-Bissau"]);
    }

    #[test]
    fn test_cross_reference_bullet_skipped() {
        let text = "* The islands are described in [[Caribbean]]\n* [[Mexico]]";
        assert_eq!(parse_bullet_links(text), vec!["Mexico"]);
    }

    #[test]
    fn test_nested_bullets_under_skip_are_skipped() {
        let text = concat!(
            "* Described separately as [[Nordic countries]]\n",
            "** [[Sweden]]\n",
            "** [[Norway]]\n",
            "* [[Germany]]"
        );
        assert_eq!(parse_bullet_links(text), vec!["Germany"]);
    }

    #[test]
    fn test_skip_ends_at_same_level() {
        let text = concat!(
            "** Described elsewhere\n",
            "*** [[Hidden]]\n",
            "** [[Visible]]"
        );
        assert_eq!(parse_bullet_links(text), vec!["Visible"]);
    }

    #[test]
    fn test_deduplicates_preserving_order() {
        let text = "* [[Alps]]\n* [[Jura]]\n* [[Alps]] again";
        assert_eq!(parse_bullet_links(text), vec!["Alps", "Jura"]);
    }

    #[test]
    fn test_non_bullet_lines_ignored() {
        let text = "Some prose.\n* [[Andalusia]]\nMore prose.";
        assert_eq!(parse_bullet_links(text), vec!["Andalusia"]);
    }
}
