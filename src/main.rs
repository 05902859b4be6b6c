use clap::Parser;
use regional_etl::config::{Command, LogFormat};
use regional_etl::utils::error::ErrorSeverity;
use regional_etl::utils::{logger, validation::Validate};
use regional_etl::{
    CliConfig, DsireConfig, DsirePipeline, EtlEngine, EtlError, LocalStorage, PlacesConfig,
    PlacesPipeline,
};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = CliConfig::parse();

    match cli.log_format {
        LogFormat::Compact => logger::init_cli_logger(cli.verbose),
        LogFormat::Json => logger::init_json_logger(),
    }

    tracing::info!("Starting regional-etl CLI");
    if cli.verbose {
        tracing::debug!("CLI arguments: {:?}", cli);
    }
    if cli.monitor {
        tracing::info!("System monitoring enabled");
    }

    let config = match cli.resolve() {
        Ok(config) => config,
        Err(e) => exit_with(&e),
    };

    let outcome = match &cli.command {
        Command::Dsire(_) => run_dsire(&cli, config.dsire).await,
        Command::Places(args) => run_places(&cli, config.places, args.query.clone()).await,
    };

    match outcome {
        Ok(Some(output_path)) => {
            tracing::info!("ETL process completed successfully");
            println!("ETL process completed successfully!");
            println!("Output saved to: {}", output_path);
        }
        Ok(None) => {}
        Err(e) => exit_with(&e),
    }

    Ok(())
}

async fn run_dsire(cli: &CliConfig, config: DsireConfig) -> regional_etl::Result<Option<String>> {
    config.validate()?;

    if cli.dry_run {
        println!("Dry run: DSIRE job");
        match &config.zip_url {
            Some(zip_url) => println!("  archive:      {}", zip_url),
            None => println!(
                "  archive page: {} (links containing '{}')",
                config.archive_page_url, config.link_pattern
            ),
        }
        println!("  tables:       {}", config.tables.join(", "));
        println!("  fips lookup:  {}", config.fips_lookup_path);
        for format in &config.output_formats {
            println!(
                "  output:       {}/{}",
                config.output_path,
                config.output_file_for(format)
            );
        }
        return Ok(None);
    }

    let storage = LocalStorage::new(config.output_path.clone());
    let pipeline = DsirePipeline::new(storage, config)?;
    let engine = EtlEngine::new_with_monitoring(pipeline, cli.monitor);
    engine.run().await.map(Some)
}

async fn run_places(
    cli: &CliConfig,
    config: PlacesConfig,
    query: Option<String>,
) -> regional_etl::Result<Option<String>> {
    config.validate()?;

    if cli.dry_run {
        println!("Dry run: Google Places job");
        println!("  query:        {}", query.as_deref().unwrap_or("(prompted)"));
        println!("  text search:  {}", config.text_search_url);
        println!("  details:      {}", config.details_url);
        println!("  max results:  {}", config.max_results);
        println!("  output:       {}/{}", config.output_path, config.output_file);
        return Ok(None);
    }

    let query = match query {
        Some(query) => query,
        None => prompt_query().await?,
    };
    let query = query.trim().to_string();
    if query.is_empty() {
        return Err(EtlError::MissingConfigError {
            field: "places.query".to_string(),
        });
    }

    let storage = LocalStorage::new(config.output_path.clone());
    let pipeline = PlacesPipeline::new(storage, config, query)?;
    let engine = EtlEngine::new_with_monitoring(pipeline, cli.monitor);
    engine.run().await.map(Some)
}

async fn prompt_query() -> regional_etl::Result<String> {
    let mut stdout = tokio::io::stdout();
    stdout
        .write_all(b"Enter the business type and location (e.g., 'Coffee shops in Tryon, NC'): ")
        .await?;
    stdout.flush().await?;

    let mut line = String::new();
    BufReader::new(tokio::io::stdin()).read_line(&mut line).await?;
    Ok(line)
}

fn exit_with(e: &EtlError) -> ! {
    tracing::error!(
        "ETL process failed: {} (Category: {:?}, Severity: {:?})",
        e,
        e.category(),
        e.severity()
    );
    tracing::error!("Recovery suggestion: {}", e.recovery_suggestion());

    eprintln!("{}", e.user_friendly_message());
    eprintln!("Suggestion: {}", e.recovery_suggestion());

    let exit_code = match e.severity() {
        ErrorSeverity::Low => 0,
        ErrorSeverity::Medium => 2,
        ErrorSeverity::High => 1,
        ErrorSeverity::Critical => 3,
    };
    std::process::exit(exit_code)
}
