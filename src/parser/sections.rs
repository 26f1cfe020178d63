//! Region-like section lookup.

/// One entry of the section index returned by the API.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageSection {
    /// API section index, used to fetch the section's wikitext
    pub index: String,

    /// Section heading text
    pub line: String,
}

/// Heading prefixes that mark a section as a region listing.
const REGION_SECTION_PREFIXES: &[&str] = &[
    "regions",
    "countries",
    "states",
    "provinces",
    "districts",
    "islands",
    "prefectures",
    "counties",
    "subregions",
    "cantons",
    "municipalities",
];

/// Find the first section whose heading starts with a region-like prefix.
///
/// Returns the API section index, or `None` when the page has no region
/// listing (city pages, travel topics).
pub fn find_region_section(sections: &[PageSection]) -> Option<&str> {
    sections
        .iter()
        .find(|section| {
            let heading = section.line.trim().to_lowercase();
            REGION_SECTION_PREFIXES
                .iter()
                .any(|prefix| heading.starts_with(prefix))
        })
        .map(|section| section.index.as_str())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sections(lines: &[&str]) -> Vec<PageSection> {
        lines
            .iter()
            .enumerate()
            .map(|(i, line)| PageSection {
                index: (i + 1).to_string(),
                line: line.to_string(),
            })
            .collect()
    }

    #[test]
    fn test_finds_regions_heading() {
        let list = sections(&["Understand", "Regions and settlements"]);
        assert_eq!(find_region_section(&list), Some("2"));
    }

    #[test]
    fn test_no_region_heading() {
        let list = sections(&["Understand", "Cities", "Get in"]);
        assert_eq!(find_region_section(&list), None);
    }

    #[test]
    fn test_first_match_wins() {
        let list = sections(&["Provinces", "Districts"]);
        assert_eq!(find_region_section(&list), Some("1"));
    }

    #[test]
    fn test_case_and_whitespace_insensitive() {
        let list = sections(&["  COUNTRIES of the region  "]);
        assert_eq!(find_region_section(&list), Some("1"));
    }
}
