// 🧹 Initial Cleaner - dedupe, drop no-signal rows, expand registry sources
//
// Raw registry table → typed `BrokerTable`. The set of registry-source
// flags is discovered from the data, so the schema is logged every run.

use crate::error::PipelineError;
use crate::table::{parse_number, Table};
use serde::Serialize;
use std::collections::BTreeSet;
use tracing::{debug, info, warn};

pub const NAME_COLUMN: &str = "Name";
pub const REGISTRY_SOURCE_COLUMN: &str = "RegistrySource";
pub const REGISTRY_SOURCE_PREFIX: &str = "RegistrySource_";
pub const COLLECTS_PREFIX: &str = "Collects";

// ============================================================================
// SCHEMA
// ============================================================================

/// Column layout discovered from the registry file
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct BrokerSchema {
    /// `Collects*` columns, in input order
    pub collects_columns: Vec<String>,

    /// Distinct registry source values, sorted
    pub registry_sources: Vec<String>,

    /// Every other column, in input order
    pub passthrough_columns: Vec<String>,
}

impl BrokerSchema {
    /// Flag column name for a registry source value
    pub fn source_column_name(source: &str) -> String {
        format!("{}{}", REGISTRY_SOURCE_PREFIX, source)
    }

    pub fn source_columns(&self) -> Vec<String> {
        self.registry_sources
            .iter()
            .map(|s| BrokerSchema::source_column_name(s))
            .collect()
    }

    pub fn collects_index(&self, column: &str) -> Option<usize> {
        self.collects_columns.iter().position(|c| c == column)
    }
}

// ============================================================================
// RECORDS
// ============================================================================

/// One cleaned registry row. Vectors are aligned with the `BrokerSchema`.
#[derive(Debug, Clone, PartialEq)]
pub struct BrokerRecord {
    pub name: Option<String>,

    /// One flag per `schema.registry_sources`
    pub sources: Vec<bool>,

    /// One tri-state value per `schema.collects_columns`
    pub collects: Vec<Option<f64>>,

    /// One cell per `schema.passthrough_columns`
    pub passthrough: Vec<Option<String>>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct BrokerTable {
    pub schema: BrokerSchema,
    pub records: Vec<BrokerRecord>,
}

impl BrokerTable {
    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

/// Parse a `Collects*` cell: numbers pass through, yes/no words map to 1/0
pub fn parse_collects_value(raw: &str) -> Option<f64> {
    if let Some(value) = parse_number(raw) {
        return Some(value);
    }

    match raw.trim().to_lowercase().as_str() {
        "yes" | "y" | "true" => Some(1.0),
        "no" | "n" | "false" => Some(0.0),
        _ => None,
    }
}

fn parse_collects_cells(
    table: &Table,
    row: &[Option<String>],
    collects_idx: &[usize],
    name_idx: usize,
) -> Vec<Option<f64>> {
    collects_idx
        .iter()
        .map(|&i| {
            row[i].as_deref().and_then(|raw| {
                let parsed = parse_collects_value(raw);
                if parsed.is_none() {
                    warn!(
                        "Unparseable value {:?} in {} for {:?}; treating as missing",
                        raw,
                        table.headers()[i],
                        row[name_idx]
                    );
                }
                parsed
            })
        })
        .collect()
}

// ============================================================================
// CLEANER
// ============================================================================

/// Drop exact duplicates and rows with no `Collects*` signal, then expand
/// `RegistrySource` into one boolean flag per observed value.
pub fn initial_clean_and_one_hot(table: &Table) -> Result<BrokerTable, PipelineError> {
    let name_idx = table.require_column(NAME_COLUMN)?;
    let source_idx = table.require_column(REGISTRY_SOURCE_COLUMN)?;
    let collects_idx = table.columns_with_prefix(COLLECTS_PREFIX);
    if collects_idx.is_empty() {
        return Err(PipelineError::MissingColumn(format!("{}*", COLLECTS_PREFIX)));
    }

    // 1. Exact duplicates
    let deduped = table.drop_duplicates();
    let duplicate_count = table.len() - deduped.len();

    // 2. Parse Collects cells, then drop rows where every value is missing
    let kept: Vec<(&Vec<Option<String>>, Vec<Option<f64>>)> = deduped
        .rows()
        .iter()
        .map(|row| (row, parse_collects_cells(table, row, &collects_idx, name_idx)))
        .filter(|(_, collects)| collects.iter().any(Option::is_some))
        .collect();
    let no_signal_count = deduped.len() - kept.len();

    info!(
        "Initial clean: {} rows in, {} duplicates, {} without Collects data, {} kept",
        table.len(),
        duplicate_count,
        no_signal_count,
        kept.len()
    );

    // 3. Discover registry sources from the surviving rows
    let registry_sources: Vec<String> = kept
        .iter()
        .filter_map(|(row, _)| row[source_idx].clone())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect();

    let passthrough_idx: Vec<usize> = (0..table.width())
        .filter(|&i| i != name_idx && i != source_idx && !collects_idx.contains(&i))
        .collect();

    let schema = BrokerSchema {
        collects_columns: collects_idx
            .iter()
            .map(|&i| table.headers()[i].clone())
            .collect(),
        registry_sources,
        passthrough_columns: passthrough_idx
            .iter()
            .map(|&i| table.headers()[i].clone())
            .collect(),
    };

    info!(
        "Discovered {} registry sources: {:?}",
        schema.registry_sources.len(),
        schema.source_columns()
    );
    debug!(
        "Collects columns: {:?}; passthrough columns: {:?}",
        schema.collects_columns, schema.passthrough_columns
    );

    let records = kept
        .into_iter()
        .map(|(row, collects)| {
            let source = row[source_idx].as_deref();
            let sources = schema
                .registry_sources
                .iter()
                .map(|s| Some(s.as_str()) == source)
                .collect();

            let passthrough = passthrough_idx.iter().map(|&i| row[i].clone()).collect();

            BrokerRecord {
                name: row[name_idx].clone(),
                sources,
                collects,
                passthrough,
            }
        })
        .collect();

    Ok(BrokerTable { schema, records })
}

// ============================================================================
// TESTS
// ============================================================================
