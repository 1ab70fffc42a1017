//! Course listing through the paginated JSON endpoint

use crate::config::Config;
use crate::parser::{parse_listing_page, Course, ListingPage};
use crate::session::Session;
use crate::KrakenError;

/// Highest listing page index ever requested
const MAX_LISTING_PAGE: usize = 500;

/// Requests listing pages until the last referenced page or an empty page
///
/// # Errors
///
/// Fails only if the first page cannot be fetched or decoded. Failures on
/// later pages end the listing with the courses gathered so far.
pub async fn list_courses(session: &Session, config: &Config) -> Result<Vec<Course>, KrakenError> {
    let first = fetch_page(session, config, 0).await?;
    let max_index = last_page_index(first.max_page_index);
    let mut courses = first.courses;

    if courses.is_empty() {
        tracing::warn!("Course listing returned no courses");
        return Ok(courses);
    }

    for index in 1..=max_index {
        match fetch_page(session, config, index).await {
            Ok(page) if page.courses.is_empty() => {
                tracing::warn!("Listing page {} is empty, stopping", index);
                break;
            }
            Ok(page) => courses.extend(page.courses),
            Err(e) => {
                tracing::warn!("Listing page {} failed, stopping: {}", index, e);
                break;
            }
        }
    }

    tracing::info!("Found {} courses", courses.len());
    Ok(courses)
}

fn last_page_index(max_page_index: usize) -> usize {
    if max_page_index > MAX_LISTING_PAGE {
        tracing::warn!(
            "Listing claims {} pages, only requesting the first {}",
            max_page_index,
            MAX_LISTING_PAGE
        );
        return MAX_LISTING_PAGE;
    }
    max_page_index
}

async fn fetch_page(
    session: &Session,
    config: &Config,
    index: usize,
) -> Result<ListingPage, KrakenError> {
    let url = config.courses_page_url(index)?;

    let response = session
        .client()
        .get(url.clone())
        .send()
        .await
        .map_err(|source| KrakenError::Http {
            url: url.to_string(),
            source,
        })?;

    let status = response.status();
    if !status.is_success() {
        return Err(KrakenError::Status {
            url: url.to_string(),
            status: status.as_u16(),
        });
    }

    let body = response.text().await.map_err(|source| KrakenError::Http {
        url: url.to_string(),
        source,
    })?;
    let page = parse_listing_page(&body)
        .map_err(|e| KrakenError::Listing(format!("page {}: {}", index, e)))?;

    tracing::info!("Listing page {} returned {} courses", index, page.courses.len());
    Ok(page)
}
