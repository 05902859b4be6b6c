use crate::utils::error::{EtlError, Result};
use crate::utils::secret::SecretString;
use crate::utils::validation::{
    validate_file_extensions, validate_non_empty_string, validate_path, validate_positive_number,
    validate_secret, validate_url, Validate,
};
use regex::Regex;
use serde::Deserialize;
use std::path::Path;
use std::sync::LazyLock;

pub const DSIRE_ARCHIVE_PAGE_URL: &str = "https://www.dsireusa.org/resources/database-archives/";
pub const DSIRE_LINK_PATTERN: &str = "ncsolarcen-prod.s3.amazonaws.com/fullexports/dsire-";
pub const PLACES_TEXT_SEARCH_URL: &str =
    "https://maps.googleapis.com/maps/api/place/textsearch/json";
pub const PLACES_DETAILS_URL: &str = "https://maps.googleapis.com/maps/api/place/details/json";
pub const DEFAULT_PLACE_DETAILS_FIELDS: &str = "name,formatted_address,geometry,rating,user_ratings_total,website,formatted_phone_number,business_status,place_id,type";
pub const BROWSER_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";

const OUTPUT_FORMATS: [&str; 2] = ["xlsx", "csv"];
const MAX_SHEET_NAME_LEN: usize = 31;

static ENV_VAR: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\$\{([^}]+)\}").expect("env pattern is valid"));

/// Whole-file configuration. Every field has a default, so an empty file (or
/// no file at all) is a valid configuration apart from the places API key.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct EtlConfig {
    pub dsire: DsireConfig,
    pub places: PlacesConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DsireConfig {
    pub archive_page_url: String,
    pub link_pattern: String,
    /// Skips archive page scraping when set.
    pub zip_url: Option<String>,
    pub fips_lookup_path: String,
    pub temp_dir: String,
    pub tables: Vec<String>,
    pub output_path: String,
    pub output_file: String,
    pub sheet_name: String,
    pub output_formats: Vec<String>,
    pub timeout_seconds: u64,
    pub user_agent: String,
}

impl Default for DsireConfig {
    fn default() -> Self {
        Self {
            archive_page_url: DSIRE_ARCHIVE_PAGE_URL.to_string(),
            link_pattern: DSIRE_LINK_PATTERN.to_string(),
            zip_url: None,
            fips_lookup_path: "appalachian_county_fips_lookup.csv".to_string(),
            temp_dir: "temp_dsire_downloads".to_string(),
            tables: vec![
                "program.csv".to_string(),
                "state_info_content.csv".to_string(),
                "contact.csv".to_string(),
            ],
            output_path: "./output".to_string(),
            output_file: "Monthly_DSIRE_Appalachian_Cleaned.xlsx".to_string(),
            sheet_name: "Appalachian_Master_DB".to_string(),
            output_formats: vec!["xlsx".to_string()],
            timeout_seconds: 60,
            user_agent: BROWSER_USER_AGENT.to_string(),
        }
    }
}

impl DsireConfig {
    /// File name for `format`, derived from `output_file` by swapping the extension.
    pub fn output_file_for(&self, format: &str) -> String {
        Path::new(&self.output_file)
            .with_extension(format)
            .to_string_lossy()
            .into_owned()
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PlacesConfig {
    pub api_key: SecretString,
    pub text_search_url: String,
    pub details_url: String,
    pub fields: String,
    pub max_results: usize,
    pub max_pages: usize,
    /// A fresh `next_page_token` is rejected by the API for a short while.
    pub page_token_delay_ms: u64,
    pub request_delay_ms: u64,
    pub timeout_seconds: u64,
    pub output_path: String,
    pub output_file: String,
}

impl Default for PlacesConfig {
    fn default() -> Self {
        Self {
            api_key: SecretString::new("${GOOGLE_PLACES_API_KEY}"),
            text_search_url: PLACES_TEXT_SEARCH_URL.to_string(),
            details_url: PLACES_DETAILS_URL.to_string(),
            fields: DEFAULT_PLACE_DETAILS_FIELDS.to_string(),
            max_results: 5,
            max_pages: 3,
            page_token_delay_ms: 2000,
            request_delay_ms: 100,
            timeout_seconds: 30,
            output_path: ".".to_string(),
            output_file: "google_places_multiple_results_data.csv".to_string(),
        }
    }
}

impl EtlConfig {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(&path).map_err(EtlError::IoError)?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        let processed_content = substitute_env_vars(content);

        toml::from_str(&processed_content).map_err(|e| EtlError::ConfigValidationError {
            field: "toml_parsing".to_string(),
            message: format!("TOML parsing error: {}", e),
        })
    }
}

/// Replaces `${VAR}` with the environment value; unset variables are left as written.
pub fn substitute_env_vars(content: &str) -> String {
    ENV_VAR
        .replace_all(content, |caps: &regex::Captures| {
            let var_name = &caps[1];
            std::env::var(var_name).unwrap_or_else(|_| format!("${{{}}}", var_name))
        })
        .into_owned()
}

impl Validate for DsireConfig {
    fn validate(&self) -> Result<()> {
        match &self.zip_url {
            Some(zip_url) => validate_url("dsire.zip_url", zip_url)?,
            None => {
                validate_url("dsire.archive_page_url", &self.archive_page_url)?;
                validate_non_empty_string("dsire.link_pattern", &self.link_pattern)?;
            }
        }

        validate_path("dsire.fips_lookup_path", &self.fips_lookup_path)?;
        validate_path("dsire.temp_dir", &self.temp_dir)?;
        validate_path("dsire.output_path", &self.output_path)?;
        validate_path("dsire.output_file", &self.output_file)?;
        validate_file_extensions("dsire.tables", &self.tables, &["csv"])?;
        validate_positive_number("dsire.timeout_seconds", self.timeout_seconds as usize, 1)?;

        validate_non_empty_string("dsire.sheet_name", &self.sheet_name)?;
        if self.sheet_name.chars().count() > MAX_SHEET_NAME_LEN {
            return Err(EtlError::InvalidConfigValueError {
                field: "dsire.sheet_name".to_string(),
                value: self.sheet_name.clone(),
                reason: format!("Sheet names are limited to {} characters", MAX_SHEET_NAME_LEN),
            });
        }

        if self.output_formats.is_empty() {
            return Err(EtlError::MissingConfigError {
                field: "dsire.output_formats".to_string(),
            });
        }
        for format in &self.output_formats {
            if !OUTPUT_FORMATS.contains(&format.as_str()) {
                return Err(EtlError::InvalidConfigValueError {
                    field: "dsire.output_formats".to_string(),
                    value: format.clone(),
                    reason: format!(
                        "Unsupported format. Valid formats: {}",
                        OUTPUT_FORMATS.join(", ")
                    ),
                });
            }
        }

        Ok(())
    }
}

impl Validate for PlacesConfig {
    fn validate(&self) -> Result<()> {
        validate_secret("places.api_key", self.api_key.expose())?;
        validate_url("places.text_search_url", &self.text_search_url)?;
        validate_url("places.details_url", &self.details_url)?;
        validate_non_empty_string("places.fields", &self.fields)?;
        validate_positive_number("places.max_results", self.max_results, 1)?;
        validate_positive_number("places.max_pages", self.max_pages, 1)?;
        validate_positive_number("places.timeout_seconds", self.timeout_seconds as usize, 1)?;
        validate_path("places.output_path", &self.output_path)?;
        validate_path("places.output_file", &self.output_file)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_empty_config_uses_defaults() {
        let config = EtlConfig::from_toml_str("").unwrap();
        assert_eq!(config.dsire.archive_page_url, DSIRE_ARCHIVE_PAGE_URL);
        assert_eq!(config.dsire.tables.len(), 3);
        assert_eq!(config.places.max_results, 5);
        assert!(config.dsire.validate().is_ok());
    }

    #[test]
    fn test_parse_partial_sections() {
        let toml_content = r#"
[dsire]
zip_url = "https://example.com/dsire-2024-05.zip"
output_formats = ["xlsx", "csv"]

[places]
api_key = "literal-key"
max_results = 2
"#;

        let config = EtlConfig::from_toml_str(toml_content).unwrap();
        assert_eq!(
            config.dsire.zip_url.as_deref(),
            Some("https://example.com/dsire-2024-05.zip")
        );
        assert_eq!(config.dsire.sheet_name, "Appalachian_Master_DB");
        assert_eq!(config.places.max_results, 2);
        assert_eq!(config.places.page_token_delay_ms, 2000);
        assert!(config.places.validate().is_ok());
    }

    #[test]
    fn test_env_var_substitution() {
        std::env::set_var("REGIONAL_ETL_TEST_KEY", "from-env");

        let config = EtlConfig::from_toml_str(
            r#"
[places]
api_key = "${REGIONAL_ETL_TEST_KEY}"
"#,
        )
        .unwrap();
        assert_eq!(config.places.api_key.expose(), "from-env");

        std::env::remove_var("REGIONAL_ETL_TEST_KEY");
    }

    #[test]
    fn test_unset_api_key_fails_validation() {
        let config = EtlConfig::from_toml_str(
            r#"
[places]
api_key = "${REGIONAL_ETL_UNSET_VARIABLE}"
"#,
        )
        .unwrap();
        assert!(matches!(
            config.places.validate(),
            Err(EtlError::MissingConfigError { .. })
        ));
    }

    #[test]
    fn test_config_validation() {
        let mut config = DsireConfig::default();
        config.output_formats = vec!["parquet".to_string()];
        assert!(config.validate().is_err());

        let mut config = DsireConfig::default();
        config.sheet_name = "x".repeat(32);
        assert!(config.validate().is_err());

        let mut config = DsireConfig::default();
        config.archive_page_url = "invalid-url".to_string();
        assert!(config.validate().is_err());
        config.zip_url = Some("https://example.com/a.zip".to_string());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_output_file_for_format() {
        let config = DsireConfig::default();
        assert_eq!(
            config.output_file_for("csv"),
            "Monthly_DSIRE_Appalachian_Cleaned.csv"
        );
        assert_eq!(config.output_file_for("xlsx"), config.output_file);
    }

    #[test]
    fn test_config_from_file() {
        let mut temp_file = NamedTempFile::new().unwrap();
        temp_file
            .write_all(b"[dsire]\nsheet_name = \"Counties\"\n")
            .unwrap();

        let config = EtlConfig::from_file(temp_file.path()).unwrap();
        assert_eq!(config.dsire.sheet_name, "Counties");
    }

    #[test]
    fn test_invalid_toml_is_config_error() {
        let err = EtlConfig::from_toml_str("[dsire\n").unwrap_err();
        assert!(matches!(err, EtlError::ConfigValidationError { .. }));
    }
}
