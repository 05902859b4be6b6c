use crate::adapters::http::{build_client, ensure_success};
use crate::config::PlacesConfig;
use crate::domain::places::{
    DetailsResponse, PlaceDetails, PlaceSummary, PlacesStatus, TextSearchResponse,
};
use crate::utils::error::{EtlError, Result};
use reqwest::Client;
use serde::de::DeserializeOwned;
use std::time::Duration;

/// Thin client for the Places text search and details endpoints.
pub struct PlacesClient {
    client: Client,
    config: PlacesConfig,
}

impl PlacesClient {
    pub fn new(config: PlacesConfig) -> Result<Self> {
        let client = build_client(
            concat!("regional-etl/", env!("CARGO_PKG_VERSION")),
            config.timeout_seconds,
        )?;
        Ok(Self { client, config })
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        url: &str,
        params: &[(&str, &str)],
    ) -> Result<T> {
        // reqwest errors carry the request URL, and with it the key.
        let response = self
            .client
            .get(url)
            .query(params)
            .query(&[("key", self.config.api_key.expose())])
            .send()
            .await
            .map_err(|e| EtlError::ApiError(e.without_url()))?;
        let response = ensure_success(response, url)?;
        response
            .json::<T>()
            .await
            .map_err(|e| EtlError::ApiError(e.without_url()))
    }

    /// One page of text search results. `ZERO_RESULTS` yields an empty page.
    pub async fn text_search(
        &self,
        query: &str,
        page_token: Option<&str>,
    ) -> Result<TextSearchResponse> {
        let params: Vec<(&str, &str)> = match page_token {
            Some(token) => vec![("pagetoken", token)],
            None => vec![("query", query)],
        };
        tracing::info!("Calling Text Search API for query: '{}'", query);

        let response: TextSearchResponse = self.get_json(&self.config.text_search_url, &params).await?;
        match PlacesStatus::from(response.status.as_str()) {
            PlacesStatus::Ok | PlacesStatus::ZeroResults => Ok(response),
            _ => Err(EtlError::PlacesApiError {
                message: response
                    .error_message
                    .unwrap_or_else(|| "No specific error message".to_string()),
                status: response.status,
            }),
        }
    }

    /// Collects up to `max_results` summaries, following `next_page_token`
    /// for at most `max_pages` pages.
    pub async fn search(
        &self,
        query: &str,
        max_results: usize,
        max_pages: usize,
    ) -> Result<Vec<PlaceSummary>> {
        let mut summaries = Vec::new();
        let mut page_token: Option<String> = None;

        for page in 1..=max_pages {
            if let Some(token) = &page_token {
                tracing::debug!("Waiting before requesting page {}", page);
                tokio::time::sleep(Duration::from_millis(self.config.page_token_delay_ms)).await;
                tracing::debug!("Using next_page_token of length {}", token.len());
            }

            let response = self.text_search(query, page_token.as_deref()).await?;
            tracing::debug!("Page {} status {} with {} results", page, response.status, response.results.len());
            summaries.extend(response.results);

            if summaries.len() >= max_results {
                break;
            }
            match response.next_page_token {
                Some(token) => page_token = Some(token),
                None => break,
            }
        }

        summaries.truncate(max_results);
        Ok(summaries)
    }

    pub async fn place_details(&self, place_id: &str) -> Result<PlaceDetails> {
        tracing::info!("Calling Place Details API for Place ID: '{}'", place_id);
        let params = [("place_id", place_id), ("fields", self.config.fields.as_str())];

        let response: DetailsResponse = self.get_json(&self.config.details_url, &params).await?;
        match (PlacesStatus::from(response.status.as_str()), response.result) {
            (PlacesStatus::Ok, Some(result)) => Ok(result),
            (_, _) => Err(EtlError::PlacesApiError {
                status: response.status,
                message: response
                    .error_message
                    .unwrap_or_else(|| "No specific error message".to_string()),
            }),
        }
    }
}
