//! Finds the newest monthly export on the DSIRE archive page.
//!
//! Export links look like
//! `https://ncsolarcen-prod.s3.amazonaws.com/fullexports/dsire-2024-05.zip`;
//! the month is read from the file name. The page is fetched as static HTML,
//! so links injected by scripts are not seen.

use crate::adapters::http::get_text;
use crate::utils::error::{EtlError, Result};
use chrono::NaiveDate;
use reqwest::Client;
use scraper::{Html, Selector};
use url::Url;

/// Byte range of `YYYY-MM` inside `dsire-YYYY-MM....zip`.
const MONTH_RANGE: std::ops::Range<usize> = 6..13;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchiveLink {
    pub url: String,
    pub month: NaiveDate,
}

impl ArchiveLink {
    pub fn file_name(&self) -> &str {
        self.url.rsplit('/').next().unwrap_or(&self.url)
    }
}

/// Month encoded in an export file name, as the first day of that month.
pub fn archive_month(file_name: &str) -> Option<NaiveDate> {
    let month = file_name.get(MONTH_RANGE)?;
    NaiveDate::parse_from_str(&format!("{}-01", month), "%Y-%m-%d").ok()
}

/// Picks the export link with the latest month. Relative hrefs are resolved
/// against `base_url`; on equal months the first link on the page wins.
pub fn find_latest_archive_link(html: &str, base_url: &Url, pattern: &str) -> Option<ArchiveLink> {
    let document = Html::parse_document(html);
    let selector = Selector::parse("a[href]").ok()?;

    let mut latest: Option<ArchiveLink> = None;
    for href in document
        .select(&selector)
        .filter_map(|el| el.value().attr("href"))
    {
        let Ok(resolved) = base_url.join(href.trim()) else {
            continue;
        };
        let url = resolved.as_str();
        if !url.contains(pattern) || !resolved.path().ends_with(".zip") {
            continue;
        }
        tracing::debug!("Found export candidate: {}", url);

        let file_name = resolved
            .path_segments()
            .and_then(|mut segments| segments.next_back())
            .unwrap_or_default();
        let Some(month) = archive_month(file_name) else {
            tracing::debug!("Skipping {}: no YYYY-MM in file name", url);
            continue;
        };

        if latest.as_ref().is_none_or(|current| month > current.month) {
            tracing::debug!("New latest export candidate: {}", url);
            latest = Some(ArchiveLink {
                url: url.to_string(),
                month,
            });
        }
    }

    latest
}

pub async fn discover_latest_archive(
    client: &Client,
    page_url: &str,
    pattern: &str,
) -> Result<ArchiveLink> {
    tracing::info!("Searching for latest DSIRE ZIP on: {}", page_url);
    let base_url = Url::parse(page_url).map_err(|e| EtlError::InvalidConfigValueError {
        field: "dsire.archive_page_url".to_string(),
        value: page_url.to_string(),
        reason: e.to_string(),
    })?;

    let html = get_text(client, page_url).await?;
    match find_latest_archive_link(&html, &base_url, pattern) {
        Some(link) => {
            tracing::info!("Found latest DSIRE ZIP URL: {}", link.url);
            Ok(link)
        }
        None => {
            tracing::warn!(
                "Could not find any DSIRE ZIP link matching the expected pattern; check the archive page manually for changes"
            );
            Err(EtlError::ArchiveLinkNotFound {
                page: page_url.to_string(),
                pattern: pattern.to_string(),
            })
        }
    }
}
