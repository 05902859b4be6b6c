use crate::domain::places::PlacesStatus;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum EtlError {
    #[error("Zip operation failed: {0}")]
    ZipError(#[from] zip::result::ZipError),

    #[error("API request failed: {0}")]
    ApiError(#[from] reqwest::Error),

    #[error("CSV processing error: {0}")]
    CsvError(#[from] csv::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("Spreadsheet error: {0}")]
    SpreadsheetError(#[from] rust_xlsxwriter::XlsxError),

    #[error("HTTP {status} from {url}")]
    HttpStatusError { url: String, status: u16 },

    #[error("Places API returned {status}: {message}")]
    PlacesApiError { status: String, message: String },

    #[error("No archive link matching '{pattern}' found on {page}")]
    ArchiveLinkNotFound { page: String, pattern: String },

    #[error("Required tables missing from archive: {}", tables.join(", "))]
    MissingTablesError { tables: Vec<String> },

    #[error("Column '{column}' missing from {table}")]
    MissingColumnError { table: String, column: String },

    #[error("Configuration error: {message}")]
    ConfigError { message: String },

    #[error("Configuration validation failed for '{field}': {message}")]
    ConfigValidationError { field: String, message: String },

    #[error("Missing required configuration: {field}")]
    MissingConfigError { field: String },

    #[error("Invalid value '{value}' for '{field}': {reason}")]
    InvalidConfigValueError {
        field: String,
        value: String,
        reason: String,
    },

    #[error("Data processing error: {message}")]
    ProcessingError { message: String },

    #[error("No data collected: {message}")]
    NoDataError { message: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Network,
    Archive,
    Data,
    Configuration,
    Storage,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ErrorSeverity {
    Low,
    Medium,
    High,
    Critical,
}

impl EtlError {
    pub fn category(&self) -> ErrorCategory {
        match self {
            EtlError::ApiError(_)
            | EtlError::HttpStatusError { .. }
            | EtlError::PlacesApiError { .. } => ErrorCategory::Network,
            EtlError::ZipError(_)
            | EtlError::ArchiveLinkNotFound { .. }
            | EtlError::MissingTablesError { .. } => ErrorCategory::Archive,
            EtlError::CsvError(_)
            | EtlError::SerializationError(_)
            | EtlError::MissingColumnError { .. }
            | EtlError::ProcessingError { .. }
            | EtlError::NoDataError { .. } => ErrorCategory::Data,
            EtlError::ConfigError { .. }
            | EtlError::ConfigValidationError { .. }
            | EtlError::MissingConfigError { .. }
            | EtlError::InvalidConfigValueError { .. } => ErrorCategory::Configuration,
            EtlError::IoError(_) | EtlError::SpreadsheetError(_) => ErrorCategory::Storage,
        }
    }

    pub fn severity(&self) -> ErrorSeverity {
        match self {
            EtlError::NoDataError { .. } => ErrorSeverity::Low,
            EtlError::ApiError(_)
            | EtlError::HttpStatusError { .. }
            | EtlError::PlacesApiError { .. }
            | EtlError::ArchiveLinkNotFound { .. } => ErrorSeverity::Medium,
            EtlError::IoError(_) | EtlError::SpreadsheetError(_) => ErrorSeverity::Critical,
            _ => ErrorSeverity::High,
        }
    }

    pub fn recovery_suggestion(&self) -> &'static str {
        match self {
            EtlError::ApiError(_) | EtlError::HttpStatusError { .. } => {
                "Check the URL and your internet connection"
            }
            EtlError::PlacesApiError { status, .. } => match PlacesStatus::from(status.as_str()) {
                PlacesStatus::RequestDenied => {
                    "Check that the API key is valid and the Places API is enabled for it"
                }
                PlacesStatus::OverQueryLimit => {
                    "The Places API quota is used up; wait or raise the quota, then retry"
                }
                PlacesStatus::InvalidRequest => "Check the query text and places.fields",
                PlacesStatus::NotFound => "The place no longer exists; run the search again",
                _ => "Retry later; check the Places API status if it keeps failing",
            },
            EtlError::ArchiveLinkNotFound { .. } => {
                "Check the archive page manually for changed link patterns, or pass --zip-url"
            }
            EtlError::ZipError(_) => "The downloaded file is not a valid ZIP archive; retry later",
            EtlError::MissingTablesError { .. } => {
                "Make sure the tables exist in the archive and are listed in dsire.tables"
            }
            EtlError::MissingColumnError { .. } => {
                "The lookup file needs COUNTY, State ID, STATE, FIPS and Is_Appalachian columns"
            }
            EtlError::CsvError(_) | EtlError::SerializationError(_) => {
                "Inspect the input data for malformed rows"
            }
            EtlError::IoError(_) => "Check file paths and permissions",
            EtlError::SpreadsheetError(_) => "Make sure the output file is not open elsewhere",
            EtlError::ConfigError { .. }
            | EtlError::ConfigValidationError { .. }
            | EtlError::MissingConfigError { .. }
            | EtlError::InvalidConfigValueError { .. } => {
                "Fix the configuration file or command line arguments"
            }
            EtlError::ProcessingError { .. } => "Run with --verbose to see which step failed",
            EtlError::NoDataError { .. } => "Try a broader query",
        }
    }

    pub fn user_friendly_message(&self) -> String {
        match self {
            EtlError::ApiError(e) if e.is_timeout() => "The request timed out".to_string(),
            EtlError::ApiError(e) if e.is_connect() => "Could not connect to the server".to_string(),
            EtlError::IoError(e) if e.kind() == std::io::ErrorKind::NotFound => {
                format!("File not found: {}", e)
            }
            other => other.to_string(),
        }
    }

    pub fn processing(message: impl Into<String>) -> Self {
        EtlError::ProcessingError {
            message: message.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, EtlError>;
