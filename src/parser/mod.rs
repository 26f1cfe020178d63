// src/parser/mod.rs

//! Pure wikitext parsing.
//!
//! Everything in this module is deterministic and free of I/O: raw page
//! text in, typed intermediate data out. Fetching lives in `services`.

mod bullets;
mod images;
mod links;
mod regionlist;
mod sections;

pub use bullets::parse_bullet_links;
pub use images::{collect_image_candidates, file_refs, find_map_image};
pub use links::{classify_multi_link, extract_links, strip_comments, strip_markup};
pub use regionlist::{RegionList, parse_region_list, template_body};
pub use sections::{PageSection, find_region_section};
