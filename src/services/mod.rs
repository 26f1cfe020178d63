// src/services/mod.rs

//! Service layer for the extraction pipeline.
//!
//! This module contains the I/O-bearing building blocks:
//! - Raw response caching (`PageCache`)
//! - Rate-limited API access (`WikiClient`)
//! - Region tree construction (`RegionTreeBuilder`)
//! - Identifier enrichment (`WikidataEnricher`)

mod builder;
mod cache;
mod enricher;
mod fetcher;

pub use builder::{BuildOutcome, RegionTreeBuilder};
pub use cache::{PageCache, cache_key};
pub use enricher::WikidataEnricher;
pub use fetcher::{WikiClient, is_error};
