//! URL handling for crawl-swarm
//!
//! Provides canonicalization of raw URL strings into comparable dedup keys,
//! plus origin extraction for the robots cache.

mod domain;
mod normalize;

pub use domain::origin_of;
pub use normalize::normalize;
