//! Resource page extraction
//!
//! Turns a resource page (or its URL alone) into the name and URL of the file
//! it offers. Folder resources are downloaded as one archive through the
//! folder's download form.

use crate::parser::strategy::{first_success, Step};
use crate::url::{file_extension, last_segment};
use scraper::{Html, Selector};
use url::Url;

/// A resolved downloadable artifact
///
/// `url` is as found on the page and may still be relative to the page URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileDescriptor {
    pub name: String,
    pub url: String,
}

/// True when the URL already points at a file rather than a portal page
///
/// The last path segment must carry an extension other than `php*`.
pub fn is_direct_file(url: &Url) -> bool {
    last_segment(url)
        .as_deref()
        .and_then(file_extension)
        .map(|ext| !ext.to_ascii_lowercase().starts_with("php"))
        .unwrap_or(false)
}

/// Descriptor for a URL that needs no parsing
pub fn direct_file(url: &Url) -> Option<FileDescriptor> {
    if !is_direct_file(url) {
        return None;
    }
    Some(FileDescriptor {
        name: last_segment(url)?,
        url: url.to_string(),
    })
}

/// Descriptor for a resource page that redirected straight to its file
pub fn descriptor_from_redirect(location: &Url) -> Option<FileDescriptor> {
    Some(FileDescriptor {
        name: last_segment(location)?,
        url: location.to_string(),
    })
}

/// True when the URL denotes a folder resource
pub fn is_folder(url: &Url) -> bool {
    url.as_str().contains("folder")
}

/// Extracts the file offered by a resource page
///
/// # Lookup order
///
/// 1. A URL that already names a file is returned as-is
/// 2. Folder resources: the `h2` title names the archive; the download URL is the
///    action of the untitled POST form plus its hidden `id` field
/// 3. Single resources: the workaround download anchor, then an anchor inside an
///    embedded `object`, then an embedded `img.resourceimage`
///
/// Returns None when nothing matches (a parse miss).
pub fn extract_file_descriptor(html: &str, source_url: &Url) -> Option<FileDescriptor> {
    if let Some(descriptor) = direct_file(source_url) {
        return Some(descriptor);
    }

    let document = Html::parse_document(html);

    if is_folder(source_url) {
        return folder_download(&document);
    }

    first_success(&resource_steps(), &document).map(|(step, descriptor)| {
        tracing::trace!("Resource on {} found via {}", source_url, step);
        descriptor
    })
}

fn folder_download(document: &Html) -> Option<FileDescriptor> {
    let name = heading(document)?.replace('/', "_");

    let form_sel = Selector::parse("form:not([id])[method=post]").ok()?;
    let action = document.select(&form_sel).next()?.value().attr("action")?;

    let id_sel = Selector::parse("input[name=id]").ok()?;
    let id = document.select(&id_sel).next()?.value().attr("value")?;

    let separator = if action.contains('?') { '&' } else { '?' };
    Some(FileDescriptor {
        name,
        url: format!("{}{}id={}", action, separator, id),
    })
}

/// Single-resource lookups in order of preference
pub fn resource_steps() -> [Step<Html, FileDescriptor>; 3] {
    [
        Step::new("workaround anchor", |doc| {
            anchor_descriptor(doc, ".resourceworkaround a[onclick], .urlworkaround a")
        }),
        Step::new("embedded object", |doc| anchor_descriptor(doc, "object a")),
        Step::new("resource image", resource_image),
    ]
}

fn anchor_descriptor(document: &Html, css: &str) -> Option<FileDescriptor> {
    let sel = Selector::parse(css).ok()?;
    let anchor = document.select(&sel).next()?;
    let href = anchor.value().attr("href")?.trim();
    if href.is_empty() {
        return None;
    }

    let text = anchor.text().collect::<String>().trim().to_string();
    let name = if text.is_empty() {
        name_from_href(href)?
    } else {
        text
    };

    Some(FileDescriptor {
        name,
        url: href.to_string(),
    })
}

fn resource_image(document: &Html) -> Option<FileDescriptor> {
    let sel = Selector::parse("img.resourceimage").ok()?;
    let src = document.select(&sel).next()?.value().attr("src")?.trim();
    if src.is_empty() {
        return None;
    }

    let name = heading(document).or_else(|| name_from_href(src))?;
    Some(FileDescriptor {
        name,
        url: src.to_string(),
    })
}

fn heading(document: &Html) -> Option<String> {
    let sel = Selector::parse("h2").ok()?;
    document
        .select(&sel)
        .next()
        .map(|el| el.text().collect::<String>().trim().to_string())
        .filter(|s| !s.is_empty())
}

/// Percent-decoded last path segment of a possibly relative href
fn name_from_href(href: &str) -> Option<String> {
    let path = href.split(['?', '#']).next()?;
    let segment = path.rsplit('/').find(|s| !s.is_empty())?;
    let decoded = urlencoding::decode(segment)
        .map(|s| s.into_owned())
        .unwrap_or_else(|_| segment.to_string());
    Some(decoded)
}
