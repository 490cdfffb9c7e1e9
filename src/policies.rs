// 📜 Privacy Policy Dataset - one row per distinct policy URL
//
// Prepares the cleaned broker list for policy download and LLM annotation.

use crate::error::PipelineError;
use crate::normalize::{clean_name, clean_policy_url};
use crate::table::Table;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;

pub const POLICY_URL_COLUMN: &str = "PrivacyPolicyURL";

/// Seed for the reproducible shuffle of the unique policy set
pub const SHUFFLE_SEED: u64 = 42;

pub const ALL_POLICIES_FILE: &str = "privacy_policies_cleaned.csv";
pub const UNIQUE_POLICIES_FILE: &str = "privacy_policies_unique_shuffled.csv";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PolicyRecord {
    #[serde(rename = "Name")]
    pub name: String,

    #[serde(rename = "PrivacyPolicyURL")]
    pub privacy_policy_url: String,

    #[serde(rename = "Name_Clean")]
    pub name_clean: String,

    #[serde(rename = "PrivacyPolicyURL_Clean")]
    pub url_clean: String,
}

#[derive(Debug, Clone, Default)]
pub struct PolicyDatasets {
    /// Every broker with both a name and a policy URL
    pub all: Vec<PolicyRecord>,

    /// One row per cleaned URL, shuffled with `SHUFFLE_SEED`
    pub unique_shuffled: Vec<PolicyRecord>,
}

/// Select `Name` + `PrivacyPolicyURL`, clean both, dedupe on the cleaned
/// URL (last occurrence wins) and shuffle the unique set.
pub fn prepare_privacy_policy_dataset(brokers: &Table) -> Result<PolicyDatasets, PipelineError> {
    let name_idx = brokers.require_column("Name")?;
    let url_idx = brokers.require_column(POLICY_URL_COLUMN)?;

    let all: Vec<PolicyRecord> = brokers
        .rows()
        .iter()
        .filter_map(|row| {
            let name = row[name_idx].as_deref()?;
            let url = row[url_idx].as_deref()?;
            Some(PolicyRecord {
                name: name.to_string(),
                privacy_policy_url: url.to_string(),
                name_clean: clean_name(Some(name)),
                url_clean: clean_policy_url(Some(url)),
            })
        })
        .collect();

    let mut unique = unique_by_url_keep_last(&all);
    seeded_shuffle(&mut unique, SHUFFLE_SEED);

    info!(
        "Policy dataset: {} brokers with policies, {} unique policies",
        all.len(),
        unique.len()
    );

    Ok(PolicyDatasets {
        all,
        unique_shuffled: unique,
    })
}

/// Keep the last row for each cleaned URL, preserving relative order
fn unique_by_url_keep_last(records: &[PolicyRecord]) -> Vec<PolicyRecord> {
    let last_index: HashMap<&str, usize> = records
        .iter()
        .enumerate()
        .map(|(i, record)| (record.url_clean.as_str(), i))
        .collect();

    records
        .iter()
        .enumerate()
        .filter(|(i, record)| last_index.get(record.url_clean.as_str()) == Some(i))
        .map(|(_, record)| record.clone())
        .collect()
}

/// Deterministic permutation: order by SHA-256 of seed + cleaned URL
fn seeded_shuffle(records: &mut [PolicyRecord], seed: u64) {
    records.sort_by_cached_key(|record| {
        let mut hasher = Sha256::new();
        hasher.update(seed.to_le_bytes());
        hasher.update(record.url_clean.as_bytes());
        hasher.finalize().to_vec()
    });
}

fn write_records(records: &[PolicyRecord], path: &Path) -> Result<(), PipelineError> {
    let mut wtr = csv::Writer::from_path(path).map_err(|source| PipelineError::Write {
        path: path.to_path_buf(),
        source,
    })?;
    for record in records {
        wtr.serialize(record)?;
    }
    wtr.flush()?;
    Ok(())
}

/// Write both datasets into `output_dir`, returning the two file paths
pub fn write_policy_datasets(
    datasets: &PolicyDatasets,
    output_dir: &Path,
) -> Result<(PathBuf, PathBuf), PipelineError> {
    fs::create_dir_all(output_dir)?;

    let all_path = output_dir.join(ALL_POLICIES_FILE);
    let unique_path = output_dir.join(UNIQUE_POLICIES_FILE);
    write_records(&datasets.all, &all_path)?;
    write_records(&datasets.unique_shuffled, &unique_path)?;

    Ok((all_path, unique_path))
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn brokers() -> Table {
        Table::from_rows(
            &["Name", "PrivacyPolicyURL", "CollectsX"],
            vec![
                vec![Some("Acme Data"), Some("https://Acme.com/privacy"), Some("1")],
                vec![Some("Beta"), None, Some("1")],
                vec![Some("Acme Data Two"), Some("https://acme.com/privacy "), Some("0")],
                vec![Some("Gamma"), Some("https://gamma.io/p"), Some("1")],
                vec![None, Some("https://delta.io/p"), Some("1")],
            ],
        )
    }

    #[test]
    fn test_rows_without_name_or_url_are_dropped() {
        let datasets = prepare_privacy_policy_dataset(&brokers()).unwrap();
        assert_eq!(datasets.all.len(), 3);
        assert_eq!(datasets.all[0].name_clean, "acmedata");
        assert_eq!(datasets.all[0].url_clean, "https://acme.com/privacy");
    }

    #[test]
    fn test_unique_keeps_last_occurrence() {
        let datasets = prepare_privacy_policy_dataset(&brokers()).unwrap();
        assert_eq!(datasets.unique_shuffled.len(), 2);

        let acme = datasets
            .unique_shuffled
            .iter()
            .find(|r| r.url_clean == "https://acme.com/privacy")
            .unwrap();
        assert_eq!(acme.name, "Acme Data Two");
    }

    #[test]
    fn test_shuffle_is_reproducible() {
        let a = prepare_privacy_policy_dataset(&brokers()).unwrap();
        let b = prepare_privacy_policy_dataset(&brokers()).unwrap();
        assert_eq!(a.unique_shuffled, b.unique_shuffled);
    }

    #[test]
    fn test_missing_url_column() {
        let table = Table::from_rows(&["Name"], vec![]);
        assert!(matches!(
            prepare_privacy_policy_dataset(&table),
            Err(PipelineError::MissingColumn(c)) if c == POLICY_URL_COLUMN
        ));
    }

    #[test]
    fn test_write_policy_datasets() {
        let dir = tempfile::tempdir().unwrap();
        let datasets = prepare_privacy_policy_dataset(&brokers()).unwrap();

        let (all_path, unique_path) =
            write_policy_datasets(&datasets, &dir.path().join("policies")).unwrap();

        let all = Table::load_csv(&all_path).unwrap();
        assert_eq!(
            all.headers(),
            &["Name", "PrivacyPolicyURL", "Name_Clean", "PrivacyPolicyURL_Clean"]
        );
        assert_eq!(all.len(), 3);
        assert_eq!(Table::load_csv(&unique_path).unwrap().len(), 2);
    }
}
