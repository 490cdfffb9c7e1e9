// ⚠️ Error Types - data errors vs configuration errors
//
// Data errors (missing files, unreadable CSV, missing columns) are reported
// and usually short-circuit a stage with an empty result. Configuration
// errors are programming mistakes and are always fatal.

use std::path::PathBuf;
use thiserror::Error;

// ============================================================================
// PIPELINE ERRORS
// ============================================================================

#[derive(Debug, Error)]
pub enum PipelineError {
    /// Input file does not exist
    #[error("file not found at {}", .0.display())]
    NotFound(PathBuf),

    /// File exists but could not be parsed as CSV
    #[error("error reading {}: {source}", .path.display())]
    Malformed {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },

    /// File exists but could not be opened (permissions, is a directory, ...)
    #[error("error opening {}: {source}", .path.display())]
    Unreadable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// File has no header row (empty or blank file)
    #[error("no header row in {}", .0.display())]
    NoHeader(PathBuf),

    /// A column the stage depends on is absent from the table
    #[error("missing required column `{0}`")]
    MissingColumn(String),

    /// Output could not be written
    #[error("error writing {}: {source}", .path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Csv(#[from] csv::Error),
}

impl PipelineError {
    /// True for errors that mean "the input could not be read at all".
    /// Callers treat these as an empty result instead of a failure.
    pub fn is_read_failure(&self) -> bool {
        matches!(
            self,
            PipelineError::NotFound(_)
                | PipelineError::Malformed { .. }
                | PipelineError::Unreadable { .. }
                | PipelineError::NoHeader(_)
        )
    }
}

// ============================================================================
// CONFIGURATION ERRORS
// ============================================================================

#[derive(Debug, Error)]
pub enum ConfigError {
    /// Legend labels must be a list or an integer-keyed map
    #[error("legend_labels must be a list or dictionary, got {0}")]
    LegendLabelsType(String),

    /// Legend map key that is not an integer response code
    #[error("legend_labels key `{0}` is not an integer response code")]
    LegendLabelsKey(String),

    /// Question key referenced by an operation but not configured
    #[error("question `{0}` is not configured")]
    UnknownQuestion(String),
}
