// 🚰 Cleaning Pipeline - load → clean → merge → write
//
// Read failures (missing or unreadable file) are reported and produce an
// empty result. Schema problems and write failures are returned.

use crate::cleaner::initial_clean_and_one_hot;
use crate::error::PipelineError;
use crate::merge::{merge_by_normalized_name, MergedTable};
use crate::table::Table;
use std::path::Path;
use tracing::{error, info};

/// Default registry input (relative to the project root)
pub const DEFAULT_REGISTRY_PATH: &str = "data/raw_data/Data_Broker_Full_Registry_2025.csv";

/// Default cleaned output
pub const DEFAULT_CLEANED_PATH: &str = "data/cleaned_data/uq-data-brokers.csv";

/// Load a table, turning read failures into `None` after logging them
pub fn load_or_report(path: &Path) -> Result<Option<Table>, PipelineError> {
    match Table::load_csv(path) {
        Ok(table) => Ok(Some(table)),
        Err(err) if err.is_read_failure() => {
            error!("{}", err);
            Ok(None)
        }
        Err(err) => Err(err),
    }
}

/// Clean and merge an in-memory registry table
pub fn clean_table(raw: &Table) -> Result<MergedTable, PipelineError> {
    let cleaned = initial_clean_and_one_hot(raw)?;
    Ok(merge_by_normalized_name(cleaned))
}

/// Full cleaning job. Returns an empty table when the input cannot be read;
/// the output file is only written when the input was read.
pub fn clean_data(input: &Path, output: &Path) -> Result<MergedTable, PipelineError> {
    let Some(raw) = load_or_report(input)? else {
        return Ok(MergedTable::empty());
    };

    let merged = clean_table(&raw)?;
    merged.to_table().write_csv(output)?;
    info!("File saved to {}", output.display());

    Ok(merged)
}

// ============================================================================
// TESTS
// ============================================================================
