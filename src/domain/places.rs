use serde::{Deserialize, Serialize};

pub const NOT_AVAILABLE: &str = "N/A";

/// `status` field shared by the text search and details responses.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlacesStatus {
    Ok,
    ZeroResults,
    OverQueryLimit,
    RequestDenied,
    InvalidRequest,
    NotFound,
    Other(String),
}

impl From<&str> for PlacesStatus {
    fn from(status: &str) -> Self {
        match status {
            "OK" => PlacesStatus::Ok,
            "ZERO_RESULTS" => PlacesStatus::ZeroResults,
            "OVER_QUERY_LIMIT" => PlacesStatus::OverQueryLimit,
            "REQUEST_DENIED" => PlacesStatus::RequestDenied,
            "INVALID_REQUEST" => PlacesStatus::InvalidRequest,
            "NOT_FOUND" => PlacesStatus::NotFound,
            other => PlacesStatus::Other(other.to_string()),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct TextSearchResponse {
    pub status: String,
    #[serde(default)]
    pub results: Vec<PlaceSummary>,
    pub next_page_token: Option<String>,
    pub error_message: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct PlaceSummary {
    pub place_id: Option<String>,
    pub name: Option<String>,
    pub formatted_address: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DetailsResponse {
    pub status: String,
    pub result: Option<PlaceDetails>,
    pub error_message: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct PlaceDetails {
    pub name: Option<String>,
    pub place_id: Option<String>,
    pub formatted_address: Option<String>,
    pub formatted_phone_number: Option<String>,
    pub website: Option<String>,
    pub rating: Option<f64>,
    pub user_ratings_total: Option<u64>,
    pub business_status: Option<String>,
    #[serde(default)]
    pub types: Vec<String>,
    pub geometry: Option<Geometry>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct Geometry {
    pub location: Option<LatLng>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct LatLng {
    pub lat: Option<f64>,
    pub lng: Option<f64>,
}

/// One output line of the places CSV.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BusinessRow {
    #[serde(rename = "Name")]
    pub name: String,
    #[serde(rename = "Place ID")]
    pub place_id: String,
    #[serde(rename = "Address")]
    pub address: String,
    #[serde(rename = "Phone")]
    pub phone: String,
    #[serde(rename = "Website")]
    pub website: String,
    #[serde(rename = "Rating")]
    pub rating: String,
    #[serde(rename = "Total Ratings")]
    pub total_ratings: String,
    #[serde(rename = "Business Status")]
    pub business_status: String,
    #[serde(rename = "Types")]
    pub types: String,
    #[serde(rename = "Latitude")]
    pub latitude: String,
    #[serde(rename = "Longitude")]
    pub longitude: String,
}

fn or_na(value: Option<&str>) -> String {
    value.unwrap_or(NOT_AVAILABLE).to_string()
}

fn display_or_na<T: ToString>(value: Option<T>) -> String {
    value
        .map(|v| v.to_string())
        .unwrap_or_else(|| NOT_AVAILABLE.to_string())
}

impl From<&PlaceDetails> for BusinessRow {
    fn from(details: &PlaceDetails) -> Self {
        let location = details.geometry.as_ref().and_then(|g| g.location.as_ref());

        BusinessRow {
            name: or_na(details.name.as_deref()),
            place_id: or_na(details.place_id.as_deref()),
            address: or_na(details.formatted_address.as_deref()),
            phone: or_na(details.formatted_phone_number.as_deref()),
            website: or_na(details.website.as_deref()),
            rating: display_or_na(details.rating),
            total_ratings: display_or_na(details.user_ratings_total),
            business_status: or_na(details.business_status.as_deref()),
            types: details.types.join(", "),
            latitude: display_or_na(location.and_then(|l| l.lat)),
            longitude: display_or_na(location.and_then(|l| l.lng)),
        }
    }
}
