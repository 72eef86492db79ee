//! Site-level artifacts accumulated across documents.

pub mod sitemap;
