pub mod adapters;
pub mod app;
pub mod config;
pub mod core;
pub mod domain;
pub mod utils;

pub use config::cli::LocalStorage;
#[cfg(feature = "cli")]
pub use config::CliConfig;
pub use config::{DsireConfig, EtlConfig, PlacesConfig};

pub use core::{etl::EtlEngine, DsirePipeline, PlacesPipeline};
pub use utils::error::{EtlError, Result};
