//! Merge and clean rules that turn the DSIRE export tables plus the county
//! lookup into one row per Appalachian county.

use crate::domain::model::{Cell, Table};
use crate::utils::error::{EtlError, Result};
use crate::utils::text::{strip_html_tags, title_case, zero_fill};
use std::collections::HashMap;

pub const PROGRAM_TABLE: &str = "program";
pub const STATE_INFO_TABLE: &str = "state_info_content";
pub const CONTACT_TABLE: &str = "contact";
pub const REQUIRED_TABLES: [&str; 3] = [PROGRAM_TABLE, STATE_INFO_TABLE, CONTACT_TABLE];

pub const NOT_SPECIFIED: &str = "Not Specified";
pub const STATE_ID: &str = "State ID";
pub const SOURCE_STATE_ID: &str = "state_id";
pub const FIPS: &str = "FIPS";
pub const BUDGET: &str = "Budget";

const LOOKUP_TABLE: &str = "county lookup";
const FIPS_WIDTH: usize = 5;

const LOOKUP_RENAMES: [(&str, &str); 2] = [("COUNTY", "County"), ("STATE", "State")];
const LOOKUP_TITLE_COLUMNS: [&str; 2] = ["County", "State"];

/// How one export table is folded into the master table.
#[derive(Debug, Clone, Copy)]
pub struct SourceMerge {
    pub table: &'static str,
    pub suffix: &'static str,
    /// Source column and the output name it is renamed to.
    pub columns: &'static [(&'static str, &'static str)],
}

pub const PROGRAM_MERGE: SourceMerge = SourceMerge {
    table: PROGRAM_TABLE,
    suffix: "_program_data",
    columns: &[
        ("name", "Program Name"),
        ("code", "Code"),
        ("summary", "Program Summary"),
        ("websiteurl", "Program Website URL"),
        ("administrator", "Administrator"),
        ("fundingsource", "Funding Source"),
        ("budget", "Budget"),
    ],
};

pub const STATE_INFO_MERGE: SourceMerge = SourceMerge {
    table: STATE_INFO_TABLE,
    suffix: "_stateinfo",
    columns: &[
        ("introduction", "State Info Intro"),
        ("history", "State Info History"),
        ("renewable_portfolio_standard", "Renewable Portfolio Standard"),
        ("organizations", "Organizations"),
        ("programs", "programs"),
        ("footnotes", "footnotes"),
    ],
};

pub const CONTACT_MERGE: SourceMerge = SourceMerge {
    table: CONTACT_TABLE,
    suffix: "_contact",
    columns: &[
        ("first_name", "Contact First Name"),
        ("last_name", "Contact Last Name"),
        ("organization_name", "Contact Organization Name"),
        ("phone", "Contact Phone"),
        ("email", "Contact Email"),
        ("website_url", "Contact Website URL"),
        ("address", "Contact Address"),
        ("city", "Contact City"),
        ("zip", "Contact Zip"),
    ],
};

pub const MERGE_ORDER: [SourceMerge; 3] = [PROGRAM_MERGE, STATE_INFO_MERGE, CONTACT_MERGE];

/// Free-text columns that get tags stripped and whitespace trimmed.
pub const TEXT_COLUMNS_TO_CLEAN: [&str; 16] = [
    "State Info Intro",
    "State Info History",
    "Renewable Portfolio Standard",
    "Program Summary",
    "Organizations",
    "Program Website URL",
    "Administrator",
    "Funding Source",
    "Budget",
    "Contact Organization Name",
    "Contact Phone",
    "Contact Email",
    "Contact Website URL",
    "Contact Address",
    "Contact City",
    "Contact Zip",
];

pub const NUMERIC_ZERO_FILL_COLUMNS: [&str; 1] = [BUDGET];

pub const OUTPUT_COLUMNS: [&str; 26] = [
    "ID",
    "County",
    "State ID",
    "FIPS",
    "State",
    "Program Name",
    "Code",
    "Program Website URL",
    "Program Summary",
    "State Info Intro",
    "State Info History",
    "Renewable Portfolio Standard",
    "Administrator",
    "Funding Source",
    "Budget",
    "Organizations",
    "Contact First Name",
    "Contact Last Name",
    "Contact Organization Name",
    "Contact Phone",
    "Contact Email",
    "Contact Website URL",
    "Contact Address",
    "Contact City",
    "Contact Zip",
    "Is_Appalachian",
];

/// Normalises the raw county lookup: canonical column names, title-cased
/// names, 5-digit FIPS and integer state ids. Rows without a numeric state id
/// are dropped.
pub fn prepare_fips_lookup(mut lookup: Table) -> Result<Table> {
    lookup.rename_columns(&LOOKUP_RENAMES);

    for column in LOOKUP_TITLE_COLUMNS {
        lookup.map_column(column, |cell| match cell {
            Cell::Text(s) => Cell::Text(title_case(s.trim())),
            other => other.clone(),
        });
    }

    lookup.map_column(FIPS, |cell| match cell {
        Cell::Missing => Cell::Missing,
        other => Cell::Text(zero_fill(other.to_string().trim(), FIPS_WIDTH)),
    });

    let coerced = lookup.map_column(STATE_ID, |cell| {
        cell.coerce_int().map(Cell::Int).unwrap_or(Cell::Missing)
    });
    if !coerced {
        return Err(EtlError::MissingColumnError {
            table: LOOKUP_TABLE.to_string(),
            column: STATE_ID.to_string(),
        });
    }

    let before = lookup.len();
    let state_idx = lookup.column_index(STATE_ID).unwrap_or_default();
    lookup.retain_rows(|row| !row[state_idx].is_missing());
    if lookup.len() < before {
        tracing::warn!(
            "Dropped {} lookup rows without a numeric '{}'",
            before - lookup.len(),
            STATE_ID
        );
    }

    Ok(lookup)
}

/// Numbers the lookup rows 1..=n in a leading `ID` column.
pub fn build_master(mut lookup: Table) -> Table {
    let ids = (1..=lookup.len() as i64).map(Cell::Int).collect();
    lookup.insert_column(0, "ID", ids);
    lookup
}

/// Left-joins one export table onto the master by state id. A table without
/// `state_id` leaves the master untouched.
pub fn merge_source(master: &Table, source: &Table, merge: &SourceMerge) -> Table {
    if !source.has_column(SOURCE_STATE_ID) {
        tracing::warn!(
            "'{}' column not found in {}.csv. Skipping {} merge.",
            SOURCE_STATE_ID,
            merge.table,
            merge.table
        );
        return master.clone();
    }

    for (column, _) in merge.columns {
        if !source.has_column(column) {
            tracing::warn!(
                "Column '{}' missing from {}.csv; merged values will be empty",
                column,
                merge.table
            );
        }
    }

    let mut wanted = vec![SOURCE_STATE_ID];
    wanted.extend(merge.columns.iter().map(|(from, _)| *from));
    let mut selected = source.select(&wanted);
    selected.map_column(SOURCE_STATE_ID, |cell| Cell::Int(cell.coerce_int().unwrap_or(-1)));
    selected.rename_columns(merge.columns);
    selected.dedup_by(SOURCE_STATE_ID);

    let merged = master.left_join(STATE_ID, &selected, SOURCE_STATE_ID, merge.suffix);
    tracing::info!(
        "Merged with {} data ({} distinct states)",
        merge.table,
        selected.len()
    );
    merged
}

/// Applies the cleaning rules in order: tag stripping on free text, the
/// `Not Specified` placeholder, numeric budget, FIPS padding.
pub fn clean_master(mut master: Table) -> Table {
    for column in TEXT_COLUMNS_TO_CLEAN {
        let cleaned = master.map_column(column, |cell| {
            let text = strip_html_tags(&cell.to_string());
            let text = text.trim();
            if text == "nan" {
                Cell::text("")
            } else {
                Cell::text(text)
            }
        });
        if cleaned {
            tracing::debug!("Cleaned HTML, whitespace, and 'nan' from '{}'", column);
        }
    }

    let text_columns: Vec<String> = master
        .columns()
        .iter()
        .filter(|name| {
            master
                .column_values(name)
                .map(|cells| !cells.iter().any(|c| c.is_numeric()))
                .unwrap_or(false)
        })
        .cloned()
        .collect();
    for column in &text_columns {
        master.map_column(column, |cell| match cell {
            Cell::Missing => Cell::text(NOT_SPECIFIED),
            Cell::Text(s) if s == "nan" => Cell::text(NOT_SPECIFIED),
            other => other.clone(),
        });
    }

    for column in NUMERIC_ZERO_FILL_COLUMNS {
        if master.map_column(column, |cell| Cell::Float(cell.coerce_float().unwrap_or(0.0))) {
            tracing::debug!("Filled missing numeric values in '{}' with 0", column);
        }
    }

    if master.map_column(FIPS, |cell| {
        let padded = zero_fill(cell.to_string().trim(), FIPS_WIDTH);
        if padded == NOT_SPECIFIED {
            Cell::text("")
        } else {
            Cell::Text(padded)
        }
    }) {
        tracing::debug!("Ensured '{}' is a 5-digit string", FIPS);
    } else {
        tracing::warn!("'{}' column not found after merge; output will carry placeholders", FIPS);
    }

    master
}

/// Adds absent output columns as `Not Specified` and projects to the output order.
pub fn finalize_columns(mut master: Table) -> Table {
    for column in OUTPUT_COLUMNS {
        if !master.has_column(column) {
            master.add_column_filled(column, Cell::text(NOT_SPECIFIED));
            tracing::info!("Added missing column '{}' with '{}' values", column, NOT_SPECIFIED);
        }
    }
    master.project(&OUTPUT_COLUMNS)
}

/// Runs the full merge-and-clean sequence over already loaded tables.
pub fn build_appalachian_master(lookup: Table, tables: &HashMap<String, Table>) -> Result<Table> {
    let missing: Vec<String> = REQUIRED_TABLES
        .iter()
        .filter(|name| !tables.contains_key(**name))
        .map(|name| name.to_string())
        .collect();
    if !missing.is_empty() {
        return Err(EtlError::MissingTablesError { tables: missing });
    }

    let mut master = build_master(prepare_fips_lookup(lookup)?);
    tracing::info!(
        "Initial master table: {} counties, columns {:?}",
        master.len(),
        master.columns()
    );

    for merge in MERGE_ORDER {
        if let Some(source) = tables.get(merge.table) {
            master = merge_source(&master, source, &merge);
        }
    }
    tracing::debug!("Master columns after merges: {:?}", master.columns());

    let master = finalize_columns(clean_master(master));
    tracing::info!("Final table contains {} rows for Appalachian counties", master.len());
    Ok(master)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table(csv: &str) -> Table {
        Table::from_csv_bytes(csv.as_bytes()).unwrap()
    }

    fn lookup() -> Table {
        table(
            "COUNTY,State ID,STATE,FIPS,Is_Appalachian\n\
             \x20buncombe ,37,north carolina,37021,Yes\n\
             jefferson,1,ALABAMA,1073,Yes\n\
             unknown,n/a,nowhere,99999,No\n",
        )
    }

    fn tables() -> HashMap<String, Table> {
        let mut tables = HashMap::new();
        tables.insert(
            PROGRAM_TABLE.to_string(),
            table(
                "id,state_id,name,code,summary,websiteurl,administrator,fundingsource,budget\n\
                 10,37,NC Solar Rebate,NC01,<p>Rebates for <b>solar</b></p>,https://nc.example,NC DEQ,Utility,\"<span>5,000</span>\"\n\
                 11,37,Second NC Program,NC02,ignored,,,,\n\
                 12,x,Broken,BR,,,,,\n",
            ),
        );
        tables.insert(
            STATE_INFO_TABLE.to_string(),
            table(
                "state_id,introduction,history,renewable_portfolio_standard,organizations,programs,footnotes\n\
                 37,  <div>Intro</div>  ,nan,RPS text,<ul><li>Org</li></ul>,p,f\n",
            ),
        );
        tables.insert(
            CONTACT_TABLE.to_string(),
            table(
                "state_id,first_name,last_name,organization_name,phone,email,website_url,address,city,zip\n\
                 1,Ada,Lovelace,AL Energy,555-0100,ada@example.com,,1 Main St,Birmingham,35203\n",
            ),
        );
        tables
    }

    #[test]
    fn test_prepare_fips_lookup() {
        let prepared = prepare_fips_lookup(lookup()).unwrap();
        assert_eq!(prepared.len(), 2);
        assert_eq!(prepared.get(0, "County"), Some(&Cell::text("Buncombe")));
        assert_eq!(prepared.get(0, "State"), Some(&Cell::text("North Carolina")));
        assert_eq!(prepared.get(1, "FIPS"), Some(&Cell::text("01073")));
        assert_eq!(prepared.get(1, "State ID"), Some(&Cell::Int(1)));
    }

    #[test]
    fn test_lookup_without_state_id_is_rejected() {
        let err = prepare_fips_lookup(table("COUNTY,STATE\nx,y\n")).unwrap_err();
        assert!(matches!(err, EtlError::MissingColumnError { .. }));
    }

    #[test]
    fn test_merge_source_skips_without_state_id() {
        let master = build_master(prepare_fips_lookup(lookup()).unwrap());
        let source = table("name\nx\n");
        let merged = merge_source(&master, &source, &PROGRAM_MERGE);
        assert_eq!(merged, master);
    }

    #[test]
    fn test_merge_takes_first_program_per_state() {
        let master = build_master(prepare_fips_lookup(lookup()).unwrap());
        let merged = merge_source(&master, &tables()[PROGRAM_TABLE], &PROGRAM_MERGE);
        assert_eq!(merged.len(), 2);
        assert_eq!(merged.get(0, "Program Name"), Some(&Cell::text("NC Solar Rebate")));
        assert_eq!(merged.get(1, "Program Name"), Some(&Cell::Missing));
        assert!(!merged.has_column("state_id"));
    }

    #[test]
    fn test_non_numeric_state_ids_join_as_minus_one() {
        let lookup = table("COUNTY,State ID,STATE,FIPS,Is_Appalachian\nnowhere,-1,x,1,No\n");
        let master = build_master(prepare_fips_lookup(lookup).unwrap());
        let source = table("state_id,name\nx,Broken\n??,Other\n");

        let merged = merge_source(&master, &source, &PROGRAM_MERGE);
        assert_eq!(merged.len(), 1);
        assert_eq!(merged.get(0, "Program Name"), Some(&Cell::text("Broken")));

        let fixture = merge_source(&master, &tables()[PROGRAM_TABLE], &PROGRAM_MERGE);
        assert_eq!(fixture.get(0, "Code"), Some(&Cell::text("BR")));
    }

    #[test]
    fn test_literal_nan_outside_cleaned_columns_becomes_not_specified() {
        let mut master = Table::new(vec![
            "Program Name".to_string(),
            "Program Summary".to_string(),
        ]);
        master.push_row(vec![Cell::text("nan"), Cell::text("nan")]);
        master.push_row(vec![Cell::text("Grant"), Cell::text("<b>Text</b>")]);

        let cleaned = clean_master(master);
        assert_eq!(cleaned.get(0, "Program Name"), Some(&Cell::text(NOT_SPECIFIED)));
        assert_eq!(cleaned.get(0, "Program Summary"), Some(&Cell::text("")));
        assert_eq!(cleaned.get(1, "Program Name"), Some(&Cell::text("Grant")));
        assert_eq!(cleaned.get(1, "Program Summary"), Some(&Cell::text("Text")));
    }

    #[test]
    fn test_null_spellings_in_exports_are_missing_values() {
        let mut t = tables();
        t.insert(
            PROGRAM_TABLE.to_string(),
            table("state_id,name,code,summary\n37,NULL,NA,N/A\n"),
        );
        t.insert(
            CONTACT_TABLE.to_string(),
            table("state_id,first_name,city\n37,NULL,None\n"),
        );

        let master = build_appalachian_master(lookup(), &t).unwrap();
        assert_eq!(master.get(0, "Program Name"), Some(&Cell::text(NOT_SPECIFIED)));
        assert_eq!(master.get(0, "Code"), Some(&Cell::text(NOT_SPECIFIED)));
        assert_eq!(master.get(0, "Program Summary"), Some(&Cell::text("")));
        assert_eq!(master.get(0, "Contact First Name"), Some(&Cell::text(NOT_SPECIFIED)));
        assert_eq!(master.get(0, "Contact City"), Some(&Cell::text("")));
    }

    #[test]
    fn test_build_appalachian_master() {
        let master = build_appalachian_master(lookup(), &tables()).unwrap();
        assert_eq!(master.columns().len(), OUTPUT_COLUMNS.len());
        assert_eq!(master.columns()[0], "ID");
        assert_eq!(master.len(), 2);

        // Buncombe, NC: program, state info, no contact.
        assert_eq!(master.get(0, "ID"), Some(&Cell::Int(1)));
        assert_eq!(master.get(0, "FIPS"), Some(&Cell::text("37021")));
        assert_eq!(master.get(0, "Program Summary"), Some(&Cell::text("Rebates for solar")));
        assert_eq!(master.get(0, "State Info Intro"), Some(&Cell::text("Intro")));
        assert_eq!(master.get(0, "State Info History"), Some(&Cell::text("")));
        assert_eq!(master.get(0, "Organizations"), Some(&Cell::text("Org")));
        assert_eq!(master.get(0, "Budget"), Some(&Cell::Float(0.0)));
        assert_eq!(master.get(0, "Contact First Name"), Some(&Cell::text(NOT_SPECIFIED)));
        assert_eq!(master.get(0, "Contact Phone"), Some(&Cell::text("")));

        // Jefferson, AL: contact only.
        assert_eq!(master.get(1, "Program Name"), Some(&Cell::text(NOT_SPECIFIED)));
        assert_eq!(master.get(1, "Program Summary"), Some(&Cell::text("")));
        assert_eq!(master.get(1, "Contact City"), Some(&Cell::text("Birmingham")));
        assert_eq!(master.get(1, "Contact Zip"), Some(&Cell::text("35203")));
        assert_eq!(master.get(1, "Contact Website URL"), Some(&Cell::text("")));
        assert_eq!(master.get(1, "Is_Appalachian"), Some(&Cell::text("Yes")));
        assert_eq!(master.get(1, "State ID"), Some(&Cell::Int(1)));
    }

    #[test]
    fn test_numeric_budget_survives_cleaning() {
        let mut t = tables();
        t.insert(
            PROGRAM_TABLE.to_string(),
            table("state_id,name,budget\n37,Grant, 2500.5 \n"),
        );
        let master = build_appalachian_master(lookup(), &t).unwrap();
        assert_eq!(master.get(0, "Budget"), Some(&Cell::Float(2500.5)));
        assert_eq!(master.get(0, "Code"), Some(&Cell::text(NOT_SPECIFIED)));
    }

    #[test]
    fn test_missing_required_tables() {
        let mut t = tables();
        t.remove(CONTACT_TABLE);
        let err = build_appalachian_master(lookup(), &t).unwrap_err();
        match err {
            EtlError::MissingTablesError { tables } => assert_eq!(tables, vec!["contact"]),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_missing_fips_becomes_empty() {
        let lookup = table("COUNTY,State ID,STATE,FIPS,Is_Appalachian\nbath,51,virginia,,Yes\n");
        let master = build_appalachian_master(lookup, &tables()).unwrap();
        assert_eq!(master.get(0, "FIPS"), Some(&Cell::text("")));
    }
}
