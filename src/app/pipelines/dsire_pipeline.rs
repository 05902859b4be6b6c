use crate::adapters::archive::discover_latest_archive;
use crate::adapters::http::{build_client, get_bytes};
use crate::adapters::xlsx::workbook_bytes;
use crate::adapters::zip_tables::extract_tables;
use crate::config::DsireConfig;
use crate::core::{Pipeline, Storage, Table};
use crate::domain::dsire::build_appalachian_master;
use crate::utils::error::{EtlError, Result};
use reqwest::Client;
use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// Everything the DSIRE transform needs, gathered from the network and disk.
#[derive(Debug)]
pub struct DsireExtract {
    pub archive_url: String,
    pub download_path: PathBuf,
    pub tables: HashMap<String, Table>,
    pub lookup: Table,
}

pub struct DsirePipeline<S: Storage> {
    pub(crate) storage: S,
    pub(crate) config: DsireConfig,
    pub(crate) client: Client,
}

impl<S: Storage> DsirePipeline<S> {
    pub fn new(storage: S, config: DsireConfig) -> Result<Self> {
        let client = build_client(&config.user_agent, config.timeout_seconds)?;
        Ok(Self {
            storage,
            config,
            client,
        })
    }

    async fn resolve_archive_url(&self) -> Result<String> {
        if let Some(zip_url) = &self.config.zip_url {
            tracing::info!("Using configured DSIRE ZIP URL: {}", zip_url);
            return Ok(zip_url.clone());
        }
        let link = discover_latest_archive(
            &self.client,
            &self.config.archive_page_url,
            &self.config.link_pattern,
        )
        .await?;
        Ok(link.url)
    }

    /// Downloads the archive and keeps a copy under `temp_dir`.
    async fn download_archive(&self, zip_url: &str) -> Result<(PathBuf, Vec<u8>)> {
        tracing::info!("Downloading DSIRE ZIP from: {}", zip_url);
        let bytes = get_bytes(&self.client, zip_url).await?;

        let file_name = zip_url
            .split(['?', '#'])
            .next()
            .and_then(|u| u.rsplit('/').next())
            .filter(|name| !name.is_empty())
            .unwrap_or("dsire_export.zip");
        let temp_dir = Path::new(&self.config.temp_dir);
        tokio::fs::create_dir_all(temp_dir).await?;
        let download_path = temp_dir.join(file_name);
        tokio::fs::write(&download_path, &bytes).await?;

        tracing::info!(
            "Downloaded '{}' successfully ({} bytes)",
            download_path.display(),
            bytes.len()
        );
        Ok((download_path, bytes))
    }

    async fn load_fips_lookup(&self) -> Result<Table> {
        let path = &self.config.fips_lookup_path;
        let data = tokio::fs::read(path).await.map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                tracing::error!(
                    "Appalachian FIPS lookup file '{}' not found. Create it with COUNTY, State ID, STATE, FIPS, Is_Appalachian columns.",
                    path
                );
            }
            EtlError::IoError(e)
        })?;
        let lookup = Table::from_csv_bytes(&data)?;
        tracing::info!("Loaded Appalachian FIPS lookup from: {} ({} rows)", path, lookup.len());
        Ok(lookup)
    }

    async fn cleanup_temp_dir(&self) {
        let temp_dir = &self.config.temp_dir;
        tracing::info!("Cleaning up temporary directory: {}", temp_dir);
        match tokio::fs::remove_dir_all(temp_dir).await {
            Ok(()) => tracing::info!("Temporary directory cleaned"),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => tracing::error!("Error removing temporary directory {}: {}", temp_dir, e),
        }
    }

    async fn write_outputs(&self, master: &Table) -> Result<String> {
        let mut primary = None;
        for format in &self.config.output_formats {
            let file_name = self.config.output_file_for(format);
            let bytes = match format.as_str() {
                "xlsx" => workbook_bytes(master, &self.config.sheet_name)?,
                "csv" => master.to_csv_bytes()?,
                other => {
                    return Err(EtlError::InvalidConfigValueError {
                        field: "dsire.output_formats".to_string(),
                        value: other.to_string(),
                        reason: "Unsupported format".to_string(),
                    })
                }
            };

            self.storage.write_file(&file_name, &bytes).await?;
            let location = self.storage.location(&file_name);
            tracing::info!("Saved {} rows to {}", master.len(), location);
            primary.get_or_insert(location);
        }

        primary.ok_or_else(|| EtlError::MissingConfigError {
            field: "dsire.output_formats".to_string(),
        })
    }
}

#[async_trait::async_trait]
impl<S: Storage> Pipeline for DsirePipeline<S> {
    type Extracted = DsireExtract;
    type Transformed = Table;

    fn name(&self) -> &str {
        "DSIRE"
    }

    async fn extract(&self) -> Result<DsireExtract> {
        let archive_url = self.resolve_archive_url().await?;
        let (download_path, bytes) = self.download_archive(&archive_url).await?;
        let tables = extract_tables(&bytes, &self.config.tables)?;
        let lookup = self.load_fips_lookup().await?;

        Ok(DsireExtract {
            archive_url,
            download_path,
            tables,
            lookup,
        })
    }

    async fn transform(&self, data: DsireExtract) -> Result<Table> {
        tracing::info!(
            "Building master table from {} ({} tables loaded)",
            data.archive_url,
            data.tables.len()
        );
        build_appalachian_master(data.lookup, &data.tables)
    }

    async fn load(&self, result: Table) -> Result<String> {
        let written = self.write_outputs(&result).await;
        if let Err(e) = &written {
            tracing::error!("An error occurred while saving the output: {}", e);
        }
        self.cleanup_temp_dir().await;
        written
    }
}
