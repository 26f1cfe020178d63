// src/utils/url.rs

//! URL construction for the wiki source.

use url::Url;

/// Base used to resolve image filenames to fetchable URLs.
const FILE_PATH_BASE: &str = "https://commons.wikimedia.org/wiki/Special:FilePath/";

/// Canonical page URL for a title, derived from the API endpoint.
///
/// # Examples
/// ```
/// use region_crawler::utils::url::page_url;
///
/// assert_eq!(
///     page_url("https://en.wikivoyage.org/w/api.php", "North America"),
///     "https://en.wikivoyage.org/wiki/North_America"
/// );
/// ```
pub fn page_url(endpoint: &str, title: &str) -> String {
    let slug = title.trim().replace(' ', "_");
    if let Ok(api) = Url::parse(endpoint) {
        if let Ok(full) = api.join("/wiki/").and_then(|base| base.join(&slug)) {
            return full.to_string();
        }
    }
    format!("{endpoint}?title={slug}")
}

/// Fetchable URL for an image filename.
pub fn file_url(name: &str) -> String {
    let slug = name.trim().replace(' ', "_");
    match Url::parse(FILE_PATH_BASE).and_then(|base| base.join(&slug)) {
        Ok(full) => full.to_string(),
        Err(_) => format!("{FILE_PATH_BASE}{slug}"),
    }
}
