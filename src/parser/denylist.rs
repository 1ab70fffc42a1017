use url::Url;

/// Substrings that mark a link as a portal feature page rather than a file
///
/// Matched against the path and query of the resolved link. The list is
/// deliberately literal; broad tokens such as `data`, `page` and `user` also
/// reject some legitimate file links whose names happen to contain them.
pub const DENYLIST: &[&str] = &[
    "questionnaire",
    "forum",
    "groupselect",
    "assign",
    "page",
    "workshop",
    "data",
    "user",
    "quiz",
    "feedback",
    "choicegroup",
    "choice",
    "evaluation",
    "scorm",
    "lesson",
    "lightboxgallery",
    "glossary",
    "chat",
];

/// Returns the denylist token that rejects this link, if any
///
/// `href` is the raw attribute value; `resolved` is the same link resolved
/// against the page. Any `#` or a `mailto:` in the raw href rejects it as well.
pub fn denied_by(href: &str, resolved: &Url) -> Option<&'static str> {
    if href.contains('#') {
        return Some("#");
    }
    if href.contains("mailto") {
        return Some("mailto");
    }

    let path = resolved.path();
    let query = resolved.query().unwrap_or("");

    DENYLIST
        .iter()
        .copied()
        .find(|token| path.contains(token) || query.contains(token))
}

pub fn is_denied(href: &str, resolved: &Url) -> bool {
    denied_by(href, resolved).is_some()
}
