//! Course-listing endpoint responses
//!
//! The endpoint answers with JSON of the form
//! `{"courses": [{"courseurl": "...", "coursename": "<a ...>Name</a>"}], "pagination": "..."}`.
//! `coursename` and `pagination` are HTML fragments.

use crate::KrakenError;
use regex::Regex;
use scraper::Html;
use serde::Deserialize;
use std::sync::OnceLock;

/// A course as listed by the endpoint, before filtering
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Course {
    pub name: String,
    /// As returned by the endpoint; may be relative to the portal root
    pub url: String,
}

/// One decoded page of the listing
#[derive(Debug, Clone, Default)]
pub struct ListingPage {
    pub courses: Vec<Course>,
    /// Highest page index referenced by the pagination fragment
    pub max_page_index: usize,
}

#[derive(Debug, Deserialize)]
struct RawListing {
    #[serde(default)]
    courses: Vec<RawCourse>,
    #[serde(default)]
    pagination: Option<serde_json::Value>,
}

#[derive(Debug, Deserialize)]
struct RawCourse {
    courseurl: String,
    #[serde(default)]
    coursename: String,
}

/// Decodes one listing response body
pub fn parse_listing_page(body: &str) -> Result<ListingPage, KrakenError> {
    let raw: RawListing = serde_json::from_str(body)?;

    let courses = raw
        .courses
        .into_iter()
        .map(|c| Course {
            name: fragment_text(&c.coursename),
            url: c.courseurl,
        })
        .collect();

    // Some portal versions send `pagination: true` or omit it on single-page listings
    let max_page_index = match raw.pagination {
        Some(serde_json::Value::String(fragment)) => max_page_index(&fragment),
        _ => 0,
    };

    Ok(ListingPage {
        courses,
        max_page_index,
    })
}

/// Largest `page=N` reference in a pagination fragment, 0 when none
pub fn max_page_index(fragment: &str) -> usize {
    static PAGE_RE: OnceLock<Regex> = OnceLock::new();
    let re = PAGE_RE.get_or_init(|| Regex::new(r"page=(\d+)").expect("valid regex"));

    re.captures_iter(fragment)
        .filter_map(|c| c.get(1)?.as_str().parse::<usize>().ok())
        .max()
        .unwrap_or(0)
}

/// Visible text of an HTML fragment, whitespace-trimmed
pub fn fragment_text(fragment: &str) -> String {
    let parsed = Html::parse_fragment(fragment);
    let text: String = parsed.root_element().text().collect();
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}
