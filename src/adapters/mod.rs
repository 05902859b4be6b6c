// Adapters layer: concrete implementations for external systems (http, archives, spreadsheets).

pub mod archive;
pub mod http;
pub mod places_api;
pub mod xlsx;
pub mod zip_tables;
