//! Portal page parsing
//!
//! This module turns fetched portal content into crawl data:
//! - Course-listing JSON into courses
//! - Course pages into block links (or tile-view course links)
//! - Resource pages into file descriptors
//!
//! Parsing is synchronous. `scraper::Html` is not `Send`, so callers parse
//! between awaits and keep only owned results.

pub mod course_page;
pub mod denylist;
pub mod file_page;
pub mod listing;
pub mod strategy;

pub use course_page::{extract_links, BlockLink, CoursePage, UNNAMED_LINK};
pub use denylist::{denied_by, is_denied, DENYLIST};
pub use file_page::{
    descriptor_from_redirect, direct_file, extract_file_descriptor, is_direct_file, FileDescriptor,
};
pub use listing::{parse_listing_page, Course, ListingPage};
pub use strategy::{first_success, Step};
