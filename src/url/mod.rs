//! URL handling module for Course-Kraken
//!
//! This module provides href resolution, visited-set keys, same-origin checks,
//! and the filename/slug helpers used to build storage paths.

mod origin;
mod resolve;
mod slug;

// Re-export main functions
pub use origin::{extract_origin, same_origin};
pub use resolve::{resolve_href, visit_key};
pub use slug::{file_extension, last_segment, normalize_file_name, slugify};
