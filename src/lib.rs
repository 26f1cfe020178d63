// src/lib.rs

//! Region Crawler Library
//!
//! Walks a MediaWiki-style content API to extract a nested region hierarchy,
//! enriches it with Wikidata identifiers, and coordinates the whole run as a
//! cancellable, progress-reporting background pipeline.

pub mod error;
pub mod models;
pub mod parser;
pub mod pipeline;
pub mod services;
pub mod storage;
pub mod utils;
