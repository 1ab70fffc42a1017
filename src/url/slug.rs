use regex::Regex;
use std::sync::OnceLock;
use url::Url;

/// Directory name used when a display name slugifies to nothing
const EMPTY_SLUG: &str = "untitled";

fn strip_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"[^\w\s-]").expect("valid slug strip pattern"))
}

fn separator_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"[-\s]+").expect("valid slug separator pattern"))
}

/// Converts a display name into a single filesystem-safe path segment
///
/// Lowercases, drops everything that is not a word character, whitespace or `-`,
/// collapses runs of whitespace and dashes into `_` and trims leading/trailing
/// `-` and `_`. Unicode letters are kept.
///
/// # Examples
///
/// ```
/// use course_kraken::url::slugify;
///
/// assert_eq!(slugify("Intro to Robotics"), "intro_to_robotics");
/// assert_eq!(slugify("  Week 1: Basics -- Part A "), "week_1_basics_part_a");
/// assert_eq!(slugify("Übungen"), "übungen");
/// ```
pub fn slugify(value: &str) -> String {
    let lowered = value.to_lowercase();
    let stripped = strip_pattern().replace_all(&lowered, "");
    let joined = separator_pattern().replace_all(&stripped, "_");
    let slug = joined.trim_matches(|c| c == '-' || c == '_');

    if slug.is_empty() {
        EMPTY_SLUG.to_string()
    } else {
        slug.to_string()
    }
}

/// Returns the extension of a file name, if it has one
///
/// A leading dot (`.hidden`) is not an extension.
pub fn file_extension(name: &str) -> Option<&str> {
    let (stem, ext) = name.rsplit_once('.')?;
    if stem.is_empty() || ext.is_empty() {
        None
    } else {
        Some(ext)
    }
}

/// Normalizes a file name before it is written to disk
///
/// Spaces and path separators become `_`, and every dot before the true
/// extension becomes `_` so only the last `.` separates name from extension.
pub fn normalize_file_name(name: &str) -> String {
    let cleaned: String = name
        .trim()
        .chars()
        .map(|c| match c {
            ' ' | '/' | '\\' => '_',
            other => other,
        })
        .collect();

    match cleaned.rsplit_once('.') {
        Some((stem, ext)) if !stem.is_empty() => format!("{}.{}", stem.replace('.', "_"), ext),
        _ => cleaned,
    }
}

/// Percent-decoded last non-empty path segment of a URL
pub fn last_segment(url: &Url) -> Option<String> {
    let segment = url
        .path_segments()?
        .filter(|s| !s.is_empty())
        .last()?;

    let decoded = urlencoding::decode(segment)
        .map(|s| s.into_owned())
        .unwrap_or_else(|_| segment.to_string());

    Some(decoded)
}
