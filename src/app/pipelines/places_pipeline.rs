use crate::adapters::places_api::PlacesClient;
use crate::config::PlacesConfig;
use crate::core::{Pipeline, Storage};
use crate::domain::places::{BusinessRow, PlaceDetails};
use crate::utils::error::{EtlError, Result};
use std::time::Duration;

/// Text search, then one details call per match, flattened into a CSV.
pub struct PlacesPipeline<S: Storage> {
    pub(crate) storage: S,
    pub(crate) config: PlacesConfig,
    pub(crate) api: PlacesClient,
    pub(crate) query: String,
}

impl<S: Storage> PlacesPipeline<S> {
    pub fn new(storage: S, config: PlacesConfig, query: impl Into<String>) -> Result<Self> {
        let api = PlacesClient::new(config.clone())?;
        Ok(Self {
            storage,
            config,
            api,
            query: query.into(),
        })
    }
}

#[async_trait::async_trait]
impl<S: Storage> Pipeline for PlacesPipeline<S> {
    type Extracted = Vec<PlaceDetails>;
    type Transformed = Vec<BusinessRow>;

    fn name(&self) -> &str {
        "Google Places"
    }

    async fn extract(&self) -> Result<Vec<PlaceDetails>> {
        let matches = self
            .api
            .search(&self.query, self.config.max_results, self.config.max_pages)
            .await?;

        if matches.is_empty() {
            tracing::info!("No results found for '{}'", self.query);
            return Ok(Vec::new());
        }
        tracing::info!(
            "Fetching detailed information for the top {} matches for '{}'",
            matches.len(),
            self.query
        );

        let mut details = Vec::with_capacity(matches.len());
        for (i, summary) in matches.iter().enumerate() {
            let Some(place_id) = summary.place_id.as_deref() else {
                tracing::warn!("Skipping result {} due to missing Place ID", i + 1);
                continue;
            };

            if i > 0 && self.config.request_delay_ms > 0 {
                tokio::time::sleep(Duration::from_millis(self.config.request_delay_ms)).await;
            }

            tracing::info!(
                "Fetching details for match {}: {} (Place ID: {})",
                i + 1,
                summary.name.as_deref().unwrap_or("N/A"),
                place_id
            );
            match self.api.place_details(place_id).await {
                Ok(place) => details.push(place),
                Err(e) => tracing::warn!("No detailed results for Place ID {}: {}", place_id, e),
            }
        }

        tracing::info!("Collected details for {} places", details.len());
        Ok(details)
    }

    async fn transform(&self, data: Vec<PlaceDetails>) -> Result<Vec<BusinessRow>> {
        let rows: Vec<BusinessRow> = data.iter().map(BusinessRow::from).collect();
        for row in &rows {
            tracing::debug!(
                "{} | {} | {} | rating {} ({} ratings) | {}, {}",
                row.name,
                row.address,
                row.phone,
                row.rating,
                row.total_ratings,
                row.latitude,
                row.longitude
            );
        }
        Ok(rows)
    }

    async fn load(&self, result: Vec<BusinessRow>) -> Result<String> {
        if result.is_empty() {
            tracing::warn!("No business data collected; nothing written");
            return Err(EtlError::NoDataError {
                message: format!("no place details collected for '{}'", self.query),
            });
        }

        let mut writer = csv::Writer::from_writer(Vec::new());
        for row in &result {
            writer.serialize(row)?;
        }
        let bytes = writer
            .into_inner()
            .map_err(|e| EtlError::IoError(e.into_error()))?;

        self.storage.write_file(&self.config.output_file, &bytes).await?;
        let location = self.storage.location(&self.config.output_file);
        tracing::info!("All collected data ({} rows) saved to '{}'", result.len(), location);
        Ok(location)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::places::NOT_AVAILABLE;
    use httpmock::prelude::*;
    use serde_json::json;
    use std::collections::HashMap;
    use std::sync::Arc;
    use tokio::sync::Mutex;

    #[derive(Clone, Default)]
    struct MockStorage {
        files: Arc<Mutex<HashMap<String, Vec<u8>>>>,
    }

    impl Storage for MockStorage {
        async fn write_file(&self, path: &str, data: &[u8]) -> Result<()> {
            self.files.lock().await.insert(path.to_string(), data.to_vec());
            Ok(())
        }

        fn location(&self, path: &str) -> String {
            path.to_string()
        }
    }

    fn config(server: &MockServer) -> PlacesConfig {
        PlacesConfig {
            api_key: "test-key".into(),
            text_search_url: server.url("/textsearch/json"),
            details_url: server.url("/details/json"),
            page_token_delay_ms: 0,
            request_delay_ms: 0,
            ..PlacesConfig::default()
        }
    }

    #[tokio::test]
    async fn test_extract_skips_missing_ids_and_failed_details() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(GET).path("/textsearch/json");
            then.status(200).json_body(json!({
                "status": "OK",
                "results": [
                    {"place_id": "good", "name": "Good"},
                    {"name": "No id"},
                    {"place_id": "bad", "name": "Bad"}
                ]
            }));
        });
        server.mock(|when, then| {
            when.method(GET).path("/details/json").query_param("place_id", "good");
            then.status(200).json_body(json!({
                "status": "OK",
                "result": {"name": "Good", "place_id": "good"}
            }));
        });
        server.mock(|when, then| {
            when.method(GET).path("/details/json").query_param("place_id", "bad");
            then.status(200).json_body(json!({
                "status": "INVALID_REQUEST",
                "error_message": "bad id"
            }));
        });

        let pipeline = PlacesPipeline::new(MockStorage::default(), config(&server), "coffee").unwrap();
        let details = pipeline.extract().await.unwrap();

        assert_eq!(details.len(), 1);
        assert_eq!(details[0].place_id.as_deref(), Some("good"));
    }

    #[tokio::test]
    async fn test_load_writes_csv_with_headers() {
        let server = MockServer::start();
        let storage = MockStorage::default();
        let pipeline = PlacesPipeline::new(storage.clone(), config(&server), "coffee").unwrap();

        let details: PlaceDetails = serde_json::from_value(json!({
            "name": "Tryon Coffee",
            "place_id": "abc",
            "rating": 4.5,
            "types": ["cafe", "store"]
        }))
        .unwrap();
        let rows = pipeline.transform(vec![details]).await.unwrap();
        let location = pipeline.load(rows).await.unwrap();

        assert_eq!(location, "google_places_multiple_results_data.csv");
        let files = storage.files.lock().await;
        let csv = String::from_utf8(files[&location].clone()).unwrap();
        let mut lines = csv.lines();
        assert_eq!(
            lines.next().unwrap(),
            "Name,Place ID,Address,Phone,Website,Rating,Total Ratings,Business Status,Types,Latitude,Longitude"
        );
        assert_eq!(
            lines.next().unwrap(),
            format!(
                "Tryon Coffee,abc,{na},{na},{na},4.5,{na},{na},\"cafe, store\",{na},{na}",
                na = NOT_AVAILABLE
            )
        );
    }

    #[tokio::test]
    async fn test_load_without_rows_is_no_data() {
        let server = MockServer::start();
        let storage = MockStorage::default();
        let pipeline = PlacesPipeline::new(storage.clone(), config(&server), "nothing").unwrap();

        let err = pipeline.load(Vec::new()).await.unwrap_err();
        assert!(matches!(err, EtlError::NoDataError { .. }));
        assert!(storage.files.lock().await.is_empty());
    }
}
