use crate::domain::model::Table;
use crate::utils::error::Result;
use std::collections::HashMap;
use std::io::{Cursor, Read, Seek};
use std::path::Path;
use zip::ZipArchive;

/// Table key for an archive entry: the file stem (`program.csv` -> `program`).
pub fn table_key(csv_name: &str) -> String {
    Path::new(csv_name)
        .file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_else(|| csv_name.to_string())
}

/// Exact entry name first, then any entry nested in a folder with that file name.
fn resolve_entry_name<R: Read + Seek>(archive: &ZipArchive<R>, csv_name: &str) -> Option<String> {
    if archive.index_for_name(csv_name).is_some() {
        return Some(csv_name.to_string());
    }
    let suffix = format!("/{}", csv_name);
    archive
        .file_names()
        .find(|name| name.ends_with(&suffix))
        .map(str::to_string)
}

/// Loads the named CSV files out of a ZIP archive held in memory.
///
/// An unreadable archive is an error. Individual tables that are absent or fail
/// to parse are logged and left out of the result; callers decide which tables
/// they cannot do without.
pub fn extract_tables(bytes: &[u8], csv_names: &[String]) -> Result<HashMap<String, Table>> {
    let mut archive = ZipArchive::new(Cursor::new(bytes))?;
    let mut tables = HashMap::new();

    for csv_name in csv_names {
        let Some(entry_name) = resolve_entry_name(&archive, csv_name) else {
            tracing::warn!("'{}' not found in the ZIP file. Skipping.", csv_name);
            continue;
        };

        let loaded = read_entry(&mut archive, &entry_name).and_then(|data| Table::from_csv_bytes(&data));
        match loaded {
            Ok(table) => {
                tracing::info!(
                    "Extracted and loaded '{}' ({} rows, {} columns)",
                    entry_name,
                    table.len(),
                    table.columns().len()
                );
                tables.insert(table_key(csv_name), table);
            }
            Err(e) => tracing::error!("Error loading '{}' from zip: {}", entry_name, e),
        }
    }

    Ok(tables)
}

fn read_entry<R: Read + Seek>(archive: &mut ZipArchive<R>, name: &str) -> Result<Vec<u8>> {
    let mut file = archive.by_name(name)?;
    let mut data = Vec::with_capacity(file.size() as usize);
    file.read_to_end(&mut data)?;
    Ok(data)
}
