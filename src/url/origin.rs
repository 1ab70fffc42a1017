use url::Url;

/// Extracts the `host[:port]` origin of a URL
///
/// The host is lowercased and the port is the explicit port or the scheme default,
/// so `https://Portal.example.edu/` and `https://portal.example.edu:443/x` share an origin.
///
/// # Examples
///
/// ```
/// use url::Url;
/// use course_kraken::url::extract_origin;
///
/// let url = Url::parse("https://Portal.Example.edu/course/view.php?id=1").unwrap();
/// assert_eq!(extract_origin(&url), Some("portal.example.edu:443".to_string()));
/// ```
pub fn extract_origin(url: &Url) -> Option<String> {
    let host = url.host_str()?.to_lowercase();
    match url.port_or_known_default() {
        Some(port) => Some(format!("{}:{}", host, port)),
        None => Some(host),
    }
}

/// Returns true when both URLs point at the same host and port
///
/// Files are only downloaded when their URL shares the origin of the portal root;
/// everything else is a policy skip.
pub fn same_origin(a: &Url, b: &Url) -> bool {
    match (extract_origin(a), extract_origin(b)) {
        (Some(a), Some(b)) => a == b,
        _ => false,
    }
}
