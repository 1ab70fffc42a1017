use url::Url;

/// Resolves a link href against the page it was found on
///
/// Returns None if the link should be excluded:
/// - empty hrefs and pure in-page fragments
/// - javascript:, mailto:, tel:, data: schemes
/// - hrefs that fail to resolve
/// - non-HTTP(S) URLs after resolution
///
/// # Examples
///
/// ```
/// use url::Url;
/// use course_kraken::url::resolve_href;
///
/// let page = Url::parse("https://portal.example.edu/course/view.php?id=7").unwrap();
/// let link = resolve_href(&page, "../mod/resource/view.php?id=2").unwrap();
/// assert_eq!(link.as_str(), "https://portal.example.edu/mod/resource/view.php?id=2");
/// ```
pub fn resolve_href(base: &Url, href: &str) -> Option<Url> {
    let href = href.trim();

    if href.is_empty() || href.starts_with('#') {
        return None;
    }

    if href.starts_with("javascript:")
        || href.starts_with("mailto:")
        || href.starts_with("tel:")
        || href.starts_with("data:")
    {
        return None;
    }

    let resolved = base.join(href).ok()?;
    if resolved.scheme() == "http" || resolved.scheme() == "https" {
        Some(resolved)
    } else {
        None
    }
}

/// Key under which a URL is recorded in the visited set
///
/// The fragment is dropped and an empty path becomes `/`; the query is kept
/// verbatim because portal pages are addressed by their `id` parameter.
pub fn visit_key(url: &Url) -> String {
    let mut key = url.clone();
    key.set_fragment(None);
    if key.path().is_empty() {
        key.set_path("/");
    }
    key.to_string()
}
