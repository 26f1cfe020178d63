//! Wiki link extraction and multi-link disambiguation.

use std::sync::LazyLock;

use regex::Regex;

use crate::models::RegionEntry;

static LINK_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\[\[([^\[\]|]+)(?:\|([^\[\]]*))?\]\]").unwrap());

static COMMENT_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?s)<!--.*?-->").unwrap());

static BOLD_ITALIC_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"'{2,}").unwrap());

/// Remove all HTML comment spans, including multi-line ones.
///
/// Runs before any other parsing so commented-out regions never leak into
/// the extracted tree.
pub fn strip_comments(text: &str) -> String {
    COMMENT_RE.replace_all(text, "").into_owned()
}

/// Extract all `[[target]]` / `[[target|label]]` link targets from text.
///
/// The display label is discarded. Targets containing a namespace separator
/// (`File:`, `Image:`, interwiki prefixes) are excluded.
pub fn extract_links(text: &str) -> Vec<String> {
    LINK_RE
        .captures_iter(text)
        .filter_map(|caps| {
            let target = caps.get(1)?.as_str().trim();
            if target.is_empty() || target.contains(':') {
                None
            } else {
                Some(target.to_string())
            }
        })
        .collect()
}

/// Reduce a text fragment to its display form: links replaced by their
/// label (or target), bold/italic quotes and stray template markup removed,
/// whitespace collapsed.
pub fn strip_markup(text: &str) -> String {
    let without_links = LINK_RE.replace_all(text, |caps: &regex::Captures| {
        let target = caps.get(1).map(|m| m.as_str().trim()).unwrap_or("");
        match caps.get(2).map(|m| m.as_str().trim()) {
            Some(label) if !label.is_empty() => label.to_string(),
            _ => target.to_string(),
        }
    });
    let without_quotes = BOLD_ITALIC_RE.replace_all(&without_links, "");
    let cleaned = without_quotes.replace("{{", " ").replace("}}", " ").replace('|', " ");
    cleaned.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Decide what a raw fragment containing two or more links stands for.
///
/// Three observed shapes:
/// - possessive, `[[Russia]]'s [[North Caucasus]]`: the last link is the
///   real target, the preceding ones are descriptive context;
/// - parenthetical, `[[Falster]] ([[Gedser]], [[Marielyst]])`: the first
///   link is the real target, the rest gloss it;
/// - anything else is a grouping whose display name is the stripped text
///   and whose children are all the links.
pub fn classify_multi_link(links: &[String], raw: &str) -> RegionEntry {
    if raw.contains("]]'s [[") {
        if let Some(last) = links.last() {
            return RegionEntry::linked(last.clone());
        }
    }
    if raw.contains("]] (") {
        if let Some(first) = links.first() {
            return RegionEntry::linked(first.clone());
        }
    }
    RegionEntry::grouping(strip_markup(raw), links.to_vec())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_links_discards_label() {
        assert_eq!(extract_links("[[France|French Republic]]"), vec!["France"]);
    }

    #[test]
    fn test_extract_links_excludes_namespaced() {
        assert_eq!(extract_links("[[File:Map.svg]] and [[Paris]]"), vec!["Paris"]);
    }

    #[test]
    fn test_extract_links_multiple() {
        assert_eq!(
            extract_links("[[France]] and [[Monaco]]"),
            vec!["France", "Monaco"]
        );
    }

    #[test]
    fn test_extract_links_trims_whitespace() {
        assert_eq!(extract_links("[[ Burgundy ]]"), vec!["Burgundy"]);
    }

    #[test]
    fn test_strip_comments_multiline() {
        let text = "before <!-- one\ntwo --> after";
        assert_eq!(strip_comments(text), "before  after");
    }

    #[test]
    fn test_strip_markup() {
        assert_eq!(
            strip_markup("'''[[France]]''' and [[Monaco|the principality]]"),
            "France and the principality"
        );
    }

    #[test]
    fn classify_possessive_takes_last_link() {
        let links = vec!["Russia".to_string(), "North Caucasus".to_string()];
        let entry = classify_multi_link(&links, "[[Russia]]'s [[North Caucasus]]");
        assert!(entry.has_link);
        assert_eq!(entry.name, "North Caucasus");
    }

    #[test]
    fn classify_parenthetical_takes_first_link() {
        let links = vec![
            "Falster".to_string(),
            "Gedser".to_string(),
            "Marielyst".to_string(),
        ];
        let entry = classify_multi_link(&links, "[[Falster]] ([[Gedser]], [[Marielyst]])");
        assert!(entry.has_link);
        assert_eq!(entry.name, "Falster");
    }

    #[test]
    fn classify_plain_conjunction_becomes_grouping() {
        let links = vec!["France".to_string(), "Monaco".to_string()];
        let entry = classify_multi_link(&links, "[[France]] and [[Monaco]]");
        assert!(!entry.has_link);
        assert_eq!(entry.name, "France and Monaco");
        assert_eq!(entry.items, vec!["France", "Monaco"]);
    }
}
