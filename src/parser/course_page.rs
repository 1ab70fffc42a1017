//! Course page extraction
//!
//! A course page is either a regular page of named blocks (`li.section`), each
//! holding links to resources, or a tile view that embeds further course links.

use crate::parser::denylist::denied_by;
use crate::parser::strategy::{first_success, Step};
use crate::url::resolve_href;
use crate::KrakenError;
use scraper::{ElementRef, Html, Selector};
use url::Url;

/// Display name used when no text can be found for a link
pub const UNNAMED_LINK: &str = "unnamed";

/// A file-candidate link found inside a block
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlockLink {
    pub url: Url,
    pub display_name: String,
    pub block_name: String,
}

/// What a course page turned into
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CoursePage {
    /// Tile view: the page only lists further courses
    Tiles { course_name: String, courses: Vec<Url> },

    /// Regular course page
    Blocks {
        course_name: String,
        links: Vec<BlockLink>,
        /// Blocks dropped because no title could be found
        untitled_blocks: usize,
        /// Anchors rejected by the denylist
        denied_links: usize,
    },
}

/// Extracts the links of a course page
///
/// # Rules
///
/// - The course name is the `h1` text, falling back to `<title>`
/// - `div#card-container` marks a tile view; its `li.section a[href*='course']`
///   anchors are returned as further courses and nothing else is extracted
/// - Otherwise each `li.section` is a block; blocks without a resolvable title
///   are skipped
/// - Within a block, `a[href]` anchors that are not pure fragments are candidates;
///   candidates matching the denylist are skipped
///
/// # Errors
///
/// `KrakenError::HtmlParse` when the page has no course name at all.
pub fn extract_links(html: &str, page_url: &Url) -> Result<CoursePage, KrakenError> {
    let document = Html::parse_document(html);

    let course_name = first_success(&course_name_steps(), &document)
        .map(|(_, name)| name)
        .ok_or_else(|| KrakenError::HtmlParse {
            url: page_url.to_string(),
            message: "no course name (h1 or title)".to_string(),
        })?;

    if let Some(courses) = extract_tiles(&document, page_url) {
        return Ok(CoursePage::Tiles {
            course_name,
            courses,
        });
    }

    let block_selector = selector("li.section")?;
    let anchor_selector = selector("a[href]:not([href^='#'])")?;
    let title_steps = block_title_steps(page_url);
    let name_steps = link_name_steps();

    let mut links = Vec::new();
    let mut untitled_blocks = 0;
    let mut denied_links = 0;

    for block in document.select(&block_selector) {
        let block_name = match first_success(&title_steps, &block) {
            Some((_, title)) => title,
            None => {
                untitled_blocks += 1;
                continue;
            }
        };

        for anchor in block.select(&anchor_selector) {
            let Some(href) = anchor.value().attr("href") else {
                continue;
            };
            let Some(url) = resolve_href(page_url, href) else {
                if href.contains("mailto") {
                    denied_links += 1;
                }
                continue;
            };

            if let Some(token) = denied_by(href, &url) {
                tracing::trace!("Skipping {} (matches '{}')", url, token);
                denied_links += 1;
                continue;
            }

            let display_name = first_success(&name_steps, &anchor)
                .map(|(_, name)| name)
                .unwrap_or_else(|| UNNAMED_LINK.to_string());

            links.push(BlockLink {
                url,
                display_name,
                block_name: block_name.clone(),
            });
        }
    }

    Ok(CoursePage::Blocks {
        course_name,
        links,
        untitled_blocks,
        denied_links,
    })
}

/// Nested course links of a tile view, or None for a regular page
fn extract_tiles(document: &Html, page_url: &Url) -> Option<Vec<Url>> {
    let container = Selector::parse("div#card-container").ok()?;
    document.select(&container).next()?;

    let tile_links = Selector::parse("li.section a[href*='course']").ok()?;
    let courses = document
        .select(&tile_links)
        .filter_map(|a| a.value().attr("href"))
        .filter_map(|href| resolve_href(page_url, href))
        .collect();

    Some(courses)
}

fn selector(css: &str) -> Result<Selector, KrakenError> {
    Selector::parse(css).map_err(|e| KrakenError::HtmlParse {
        url: String::new(),
        message: format!("bad selector '{}': {:?}", css, e),
    })
}

/// Trimmed text of the first element matching `css` below `element`
fn select_text(element: &ElementRef<'_>, css: &str) -> Option<String> {
    let sel = Selector::parse(css).ok()?;
    element
        .select(&sel)
        .next()
        .map(|el| el.text().collect::<String>().trim().to_string())
        .filter(|s| !s.is_empty())
}

fn document_text(document: &Html, css: &str) -> Option<String> {
    let sel = Selector::parse(css).ok()?;
    document
        .select(&sel)
        .next()
        .map(|el| el.text().collect::<String>().trim().to_string())
        .filter(|s| !s.is_empty())
}

fn course_name_steps() -> [Step<Html, String>; 2] {
    [
        Step::new("h1", |doc| document_text(doc, "h1")),
        Step::new("title", |doc| document_text(doc, "title")),
    ]
}

/// Block title lookups in order of preference
///
/// Section-scoped pages (`?section=N`) put the title in `h2.section-title`,
/// so that location is tried first there.
pub fn block_title_steps<'a>(page_url: &Url) -> Vec<Step<ElementRef<'a>, String>> {
    let heading_link = Step::new("h4 > a", |b: &ElementRef<'a>| select_text(b, "h4 > a"));
    let heading_div = Step::new("h4 div", |b: &ElementRef<'a>| select_text(b, "h4 div"));
    let section_title = Step::new("h2.section-title", |b: &ElementRef<'a>| {
        select_text(b, "h2.section-title")
    });
    let section_name = Step::new("h3.sectionname", |b: &ElementRef<'a>| {
        select_text(b, "h3.sectionname")
    });

    let section_scoped = page_url.query_pairs().any(|(key, _)| key == "section");
    if section_scoped {
        vec![section_title, heading_link, heading_div, section_name]
    } else {
        vec![heading_link, heading_div, section_title, section_name]
    }
}

/// Link display-name lookups in order of preference
pub fn link_name_steps<'a>() -> [Step<ElementRef<'a>, String>; 2] {
    [
        Step::new("anchor text", |a: &ElementRef<'a>| own_text(a)),
        Step::new("nested label", |a: &ElementRef<'a>| nested_label(a)),
    ]
}

/// Text of an anchor whose children are all plain text
fn own_text(anchor: &ElementRef<'_>) -> Option<String> {
    let mut children = anchor.children().peekable();
    children.peek()?;

    let mut text = String::new();
    for child in children {
        text.push_str(child.value().as_text()?);
    }

    let text = text.trim();
    (!text.is_empty()).then(|| text.to_string())
}

/// Direct text of the first `span` that is not an icon
fn nested_label(anchor: &ElementRef<'_>) -> Option<String> {
    let sel = Selector::parse("span:not(.fp-icon)").ok()?;
    let span = anchor.select(&sel).next()?;

    let text: String = span
        .children()
        .filter_map(|child| child.value().as_text().map(|t| String::from(&**t)))
        .collect();

    let text = text.trim();
    (!text.is_empty()).then(|| text.to_string())
}
