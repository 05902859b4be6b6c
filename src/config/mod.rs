pub mod cli;
pub mod toml_config;

pub use toml_config::{DsireConfig, EtlConfig, PlacesConfig};

#[cfg(feature = "cli")]
use crate::utils::error::Result;
#[cfg(feature = "cli")]
use crate::utils::secret::SecretString;
#[cfg(feature = "cli")]
use clap::{Args, Parser, Subcommand, ValueEnum};

#[cfg(feature = "cli")]
#[derive(Debug, Clone, Parser)]
#[command(name = "regional-etl")]
#[command(about = "DSIRE county incentive ETL and Google Places collector")]
pub struct CliConfig {
    /// Path to a TOML configuration file
    #[arg(short, long, global = true)]
    pub config: Option<String>,

    #[arg(short, long, global = true, help = "Enable verbose output")]
    pub verbose: bool,

    #[arg(long, global = true, help = "Log CPU and memory usage per phase")]
    pub monitor: bool,

    /// Show the resolved configuration without running anything
    #[arg(long, global = true)]
    pub dry_run: bool,

    #[arg(long, global = true, value_enum, default_value_t = LogFormat::Compact)]
    pub log_format: LogFormat,

    #[command(subcommand)]
    pub command: Command,
}

#[cfg(feature = "cli")]
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LogFormat {
    Compact,
    Json,
}

#[cfg(feature = "cli")]
#[derive(Debug, Clone, Subcommand)]
pub enum Command {
    /// Build the Appalachian county spreadsheet from the latest DSIRE export
    Dsire(DsireArgs),
    /// Search Google Places and export place details as CSV
    Places(PlacesArgs),
}

#[cfg(feature = "cli")]
#[derive(Debug, Clone, Args)]
pub struct DsireArgs {
    /// Download this archive instead of scraping the archive page
    #[arg(long)]
    pub zip_url: Option<String>,

    #[arg(long)]
    pub fips_lookup: Option<String>,

    #[arg(long)]
    pub output_path: Option<String>,

    /// Output formats, comma separated (xlsx, csv)
    #[arg(long, value_delimiter = ',')]
    pub format: Vec<String>,
}

#[cfg(feature = "cli")]
#[derive(Debug, Clone, Args)]
pub struct PlacesArgs {
    /// Search text, e.g. "Coffee shops in Tryon, NC". Prompted for when absent.
    #[arg(short, long)]
    pub query: Option<String>,

    #[arg(long, env = "GOOGLE_PLACES_API_KEY", hide_env_values = true)]
    pub api_key: Option<SecretString>,

    #[arg(long)]
    pub max_results: Option<usize>,

    #[arg(long)]
    pub output_path: Option<String>,

    #[arg(long)]
    pub output_file: Option<String>,
}

#[cfg(feature = "cli")]
impl CliConfig {
    /// Reads the configuration file when one was given, then layers the
    /// command line flags on top.
    pub fn resolve(&self) -> Result<EtlConfig> {
        let mut config = match &self.config {
            Some(path) => EtlConfig::from_file(path)?,
            None => EtlConfig::default(),
        };
        self.apply_overrides(&mut config);
        Ok(config)
    }

    pub fn apply_overrides(&self, config: &mut EtlConfig) {
        match &self.command {
            Command::Dsire(args) => {
                if let Some(zip_url) = &args.zip_url {
                    config.dsire.zip_url = Some(zip_url.clone());
                }
                if let Some(path) = &args.fips_lookup {
                    config.dsire.fips_lookup_path = path.clone();
                }
                if let Some(path) = &args.output_path {
                    config.dsire.output_path = path.clone();
                }
                if !args.format.is_empty() {
                    config.dsire.output_formats = args.format.clone();
                }
            }
            Command::Places(args) => {
                if let Some(api_key) = &args.api_key {
                    config.places.api_key = api_key.clone();
                }
                if let Some(max_results) = args.max_results {
                    config.places.max_results = max_results;
                }
                if let Some(path) = &args.output_path {
                    config.places.output_path = path.clone();
                }
                if let Some(file) = &args.output_file {
                    config.places.output_file = file.clone();
                }
            }
        }
    }
}

#[cfg(all(test, feature = "cli"))]
mod tests {
    use super::*;

    #[test]
    fn test_dsire_overrides() {
        let cli = CliConfig::parse_from([
            "regional-etl",
            "dsire",
            "--zip-url",
            "https://example.com/dsire-2024-01.zip",
            "--format",
            "xlsx,csv",
        ]);
        let mut config = EtlConfig::default();
        cli.apply_overrides(&mut config);

        assert_eq!(
            config.dsire.zip_url.as_deref(),
            Some("https://example.com/dsire-2024-01.zip")
        );
        assert_eq!(config.dsire.output_formats, vec!["xlsx", "csv"]);
        assert_eq!(config.places.max_results, 5);
    }

    #[test]
    fn test_places_overrides_and_global_flags() {
        let cli = CliConfig::parse_from([
            "regional-etl",
            "places",
            "--query",
            "coffee",
            "--api-key",
            "k",
            "--max-results",
            "1",
            "--verbose",
        ]);
        assert!(cli.verbose);
        assert_eq!(cli.log_format, LogFormat::Compact);

        let mut config = EtlConfig::default();
        cli.apply_overrides(&mut config);
        assert_eq!(config.places.api_key.expose(), "k");
        assert_eq!(config.places.max_results, 1);
    }

    #[test]
    fn test_api_key_is_redacted_in_debug_output() {
        let cli = CliConfig::parse_from([
            "regional-etl",
            "--verbose",
            "places",
            "--api-key",
            "SUPERSECRET123",
        ]);
        let mut config = EtlConfig::default();
        cli.apply_overrides(&mut config);

        assert!(!format!("{:?}", cli).contains("SUPERSECRET123"));
        assert!(!format!("{:?}", config).contains("SUPERSECRET123"));
        assert_eq!(config.places.api_key.expose(), "SUPERSECRET123");
    }
}
