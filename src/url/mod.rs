//! URL handling module for Shelfwalk
//!
//! Links scraped from catalog pages are mostly relative. This module turns
//! them into absolute URLs the way a browser would when reading pages that
//! sit side by side in the same directory.

mod resolve;

pub use resolve::{page_directory, resolve_link, site_root};
