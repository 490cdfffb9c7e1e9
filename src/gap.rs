// 📉 Gap Analysis - broker practice vs. consumer comfort, in percent
//
// Both sides are reduced to (Category, Source, Percentage) points. Every
// category gets a point for every source that appears, with 0 filled in
// where one side has no value.

use crate::config::GapDimension;
use crate::error::PipelineError;
use crate::responses::QuestionAnalysis;
use crate::summary::order_categories;
use crate::table::{parse_number, Table};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use tracing::{debug, warn};

/// Value marking "not reported" in broker `Collects*` columns
const NOT_REPORTED: f64 = 2.0;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GapPoint {
    #[serde(rename = "Category")]
    pub category: String,

    #[serde(rename = "Source")]
    pub source: String,

    #[serde(rename = "Percentage")]
    pub percentage: f64,
}

impl GapPoint {
    pub fn new(category: &str, source: &str, percentage: f64) -> Self {
        GapPoint {
            category: category.to_string(),
            source: source.to_string(),
            percentage,
        }
    }
}

// ============================================================================
// BROKER SIDE
// ============================================================================

/// Share of brokers collecting each data type, among brokers that report it
pub fn broker_collection_percentages(brokers: &Table, dimension: &GapDimension) -> Vec<GapPoint> {
    let mut points = Vec::new();

    for category in &dimension.categories {
        let Some(col) = brokers.column_index(&category.broker_field) else {
            debug!("Broker column {} not present; skipping", category.broker_field);
            continue;
        };

        let values: Vec<Option<f64>> = (0..brokers.len())
            .map(|row| brokers.cell(row, col).and_then(parse_number))
            .collect();

        // missing values count as reported rows but add nothing to the sum
        let reported: Vec<Option<f64>> = values
            .into_iter()
            .filter(|v| *v != Some(NOT_REPORTED))
            .collect();
        if reported.is_empty() {
            continue;
        }

        let yes_count: f64 = reported.iter().flatten().sum();
        points.push(GapPoint::new(
            &category.label,
            &dimension.broker_label,
            yes_count / reported.len() as f64 * 100.0,
        ));
    }

    points
}

/// Share of `allowed` answers per use case in the data-use question
pub fn explicit_use_case_percentages(data_use: &QuestionAnalysis, dimension: &GapDimension) -> Vec<GapPoint> {
    dimension
        .categories
        .iter()
        .filter_map(|category| {
            let stats = data_use.tally(&category.broker_field)?;
            let total = stats.total();
            if total == 0 {
                return None;
            }
            Some(GapPoint::new(
                &category.label,
                &dimension.broker_label,
                stats.positive() as f64 / total as f64 * 100.0,
            ))
        })
        .collect()
}

/// Configured broker percentages, for runs without LLM data
pub fn fallback_broker_percentages(dimension: &GapDimension) -> Vec<GapPoint> {
    dimension
        .categories
        .iter()
        .filter_map(|category| {
            category
                .fallback_percentage
                .map(|pct| GapPoint::new(&category.label, &dimension.broker_label, pct))
        })
        .collect()
}

// ============================================================================
// CONSUMER SIDE
// ============================================================================

/// Share of respondents whose multi-select answer mentions each option.
/// The denominator is every respondent, including blank answers.
pub fn consumer_comfort_percentages(
    survey: &Table,
    dimension: &GapDimension,
    consumer_label: &str,
) -> Result<Vec<GapPoint>, PipelineError> {
    let col = survey.require_column(&dimension.survey_column)?;
    let respondents = survey.len();
    if respondents == 0 {
        warn!("Survey has no respondents; consumer percentages are 0");
    }

    let mut counts: Vec<usize> = vec![0; dimension.categories.len()];
    for row in 0..respondents {
        let Some(answer) = survey.cell(row, col) else {
            continue;
        };
        for (count, category) in counts.iter_mut().zip(&dimension.categories) {
            if answer.contains(category.survey_option.as_str()) {
                *count += 1;
            }
        }
    }

    Ok(dimension
        .categories
        .iter()
        .zip(counts)
        .map(|(category, count)| {
            let pct = if respondents == 0 {
                0.0
            } else {
                count as f64 / respondents as f64 * 100.0
            };
            GapPoint::new(&category.label, consumer_label, pct)
        })
        .collect())
}

// ============================================================================
// COMBINE
// ============================================================================

/// Fill missing (category, source) pairs with 0 and order the points by
/// the preferred category order, then by source name.
pub fn combine_gap_points(points: Vec<GapPoint>, sort_order: &[String]) -> Vec<GapPoint> {
    let sources: BTreeSet<String> = points.iter().map(|p| p.source.clone()).collect();

    let mut categories: Vec<String> = Vec::new();
    for point in &points {
        if !categories.contains(&point.category) {
            categories.push(point.category.clone());
        }
    }

    let values: BTreeMap<(String, String), f64> = points
        .into_iter()
        .map(|p| ((p.category, p.source), p.percentage))
        .collect();

    let mut combined = Vec::new();
    for category in order_categories(&categories, sort_order) {
        for source in &sources {
            let pct = values
                .get(&(category.clone(), source.clone()))
                .copied()
                .unwrap_or(0.0);
            combined.push(GapPoint::new(&category, source, pct));
        }
    }

    combined
}

/// Data types brokers collect vs. data types consumers are comfortable sharing
pub fn create_gap_chart_data_types(
    brokers: &Table,
    survey: &Table,
    dimension: &GapDimension,
    consumer_label: &str,
) -> Result<Vec<GapPoint>, PipelineError> {
    let mut points = broker_collection_percentages(brokers, dimension);
    points.extend(consumer_comfort_percentages(survey, dimension, consumer_label)?);
    Ok(combine_gap_points(points, &dimension.sort_order))
}

/// Use cases brokers allow vs. use cases consumers are comfortable with
pub fn create_gap_chart_use_cases(
    broker_points: Vec<GapPoint>,
    survey: &Table,
    dimension: &GapDimension,
    consumer_label: &str,
) -> Result<Vec<GapPoint>, PipelineError> {
    let mut points = broker_points;
    points.extend(consumer_comfort_percentages(survey, dimension, consumer_label)?);
    Ok(combine_gap_points(points, &dimension.sort_order))
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{AnalysisConfig, GapCategory};
    use crate::responses::analyze_data_use_practices;

    fn dimension() -> GapDimension {
        GapDimension {
            survey_column: "Comfortable".to_string(),
            broker_label: "Data Brokers (Reported)".to_string(),
            categories: vec![
                GapCategory {
                    label: "Location data".to_string(),
                    broker_field: "CollectsAddresses".to_string(),
                    survey_option: "Location data".to_string(),
                    fallback_percentage: None,
                },
                GapCategory {
                    label: "Biometric data".to_string(),
                    broker_field: "CollectsBiometricData".to_string(),
                    survey_option: "Biometric data (e.g., fingerprint)".to_string(),
                    fallback_percentage: Some(12.5),
                },
                GapCategory {
                    label: "Network data".to_string(),
                    broker_field: "CollectsNetworkData".to_string(),
                    survey_option: "Network data".to_string(),
                    fallback_percentage: None,
                },
            ],
            sort_order: vec!["Network data".to_string(), "Location data".to_string()],
        }
    }

    fn brokers() -> Table {
        Table::from_rows(
            &["Name", "CollectsAddresses", "CollectsBiometricData"],
            vec![
                vec![Some("A"), Some("1"), Some("2")],
                vec![Some("B"), Some("0"), Some("1")],
                vec![Some("C"), Some("2"), Some("2")],
                vec![Some("D"), None, Some("0")],
            ],
        )
    }

    fn survey() -> Table {
        Table::from_rows(
            &["Comfortable"],
            vec![
                vec![Some("Location data, Network data")],
                vec![Some("Biometric data (e.g., fingerprint), Location data")],
                vec![None],
                vec![Some("None of these")],
            ],
        )
    }

    #[test]
    fn test_broker_percentages_exclude_not_reported() {
        let points = broker_collection_percentages(&brokers(), &dimension());
        assert_eq!(points.len(), 2);

        // A=1, B=0, D=missing are reported; C=2 is not
        assert_eq!(points[0].category, "Location data");
        assert!((points[0].percentage - 100.0 / 3.0).abs() < 1e-9);
        // B=1, D=0 are reported
        assert!((points[1].percentage - 50.0).abs() < 1e-9);
    }

    #[test]
    fn test_consumer_percentages_over_all_respondents() {
        let points = consumer_comfort_percentages(&survey(), &dimension(), "Consumers").unwrap();
        assert_eq!(points.len(), 3);
        assert_eq!(points[0], GapPoint::new("Location data", "Consumers", 50.0));
        assert_eq!(points[1], GapPoint::new("Biometric data", "Consumers", 25.0));
        assert_eq!(points[2], GapPoint::new("Network data", "Consumers", 25.0));
    }

    #[test]
    fn test_consumer_percentages_missing_column() {
        let survey = Table::from_rows(&["Other"], vec![]);
        let err = consumer_comfort_percentages(&survey, &dimension(), "Consumers").unwrap_err();
        assert!(matches!(err, PipelineError::MissingColumn(_)));
    }

    #[test]
    fn test_no_respondents_is_zero() {
        let survey = Table::from_rows(&["Comfortable"], vec![]);
        let points = consumer_comfort_percentages(&survey, &dimension(), "Consumers").unwrap();
        assert!(points.iter().all(|p| p.percentage == 0.0));
    }

    #[test]
    fn test_data_types_chart_fills_and_orders() {
        let points =
            create_gap_chart_data_types(&brokers(), &survey(), &dimension(), "Consumers").unwrap();

        // 3 categories x 2 sources
        assert_eq!(points.len(), 6);
        let order: Vec<(&str, &str)> = points
            .iter()
            .map(|p| (p.category.as_str(), p.source.as_str()))
            .collect();
        assert_eq!(
            order,
            vec![
                ("Network data", "Consumers"),
                ("Network data", "Data Brokers (Reported)"),
                ("Location data", "Consumers"),
                ("Location data", "Data Brokers (Reported)"),
                ("Biometric data", "Consumers"),
                ("Biometric data", "Data Brokers (Reported)"),
            ]
        );
        // no broker column for network data → filled with 0
        assert_eq!(points[1].percentage, 0.0);
    }

    #[test]
    fn test_use_case_percentages_from_llm() {
        let llm = Table::from_rows(
            &["Name", "LLM Q1"],
            vec![
                vec![Some("A"), Some("[1,1,1,0,0]")],
                vec![Some("B"), Some("[1,0,2,0,0]")],
                vec![Some("C"), Some("[0,1,2,0,0]")],
                vec![Some("D"), Some("[1,1,2,0,0]")],
            ],
        );
        let config = AnalysisConfig::default();
        let data_use = analyze_data_use_practices(&llm, &config).unwrap();

        let points = explicit_use_case_percentages(&data_use, &config.gap.use_cases);
        assert_eq!(points.len(), 3);
        assert_eq!(points[0], GapPoint::new("Marketing", "Data Brokers (Explicit)", 75.0));
        assert_eq!(points[1].percentage, 75.0);
        assert_eq!(points[2], GapPoint::new("Employment decisions", "Data Brokers (Explicit)", 25.0));
    }

    #[test]
    fn test_use_cases_chart_with_fallback() {
        let config = AnalysisConfig::default();
        let dim = &config.gap.use_cases;
        let survey = Table::from_rows(
            &[dim.survey_column.as_str()],
            vec![
                vec![Some("Marketing, Personalized advertising")],
                vec![Some("Marketing")],
            ],
        );

        let points = create_gap_chart_use_cases(
            fallback_broker_percentages(dim),
            &survey,
            dim,
            &config.gap.consumer_label,
        )
        .unwrap();

        assert_eq!(points.len(), 6);
        assert_eq!(points[0], GapPoint::new("Marketing", "Consumers", 100.0));
        assert_eq!(points[1], GapPoint::new("Marketing", "Data Brokers (Explicit)", 95.5));
        assert_eq!(points[4], GapPoint::new("Employment decisions", "Consumers", 0.0));
        assert_eq!(points[5].percentage, 59.0);
    }

    #[test]
    fn test_fallback_only_where_configured() {
        let points = fallback_broker_percentages(&dimension());
        assert_eq!(points, vec![GapPoint::new("Biometric data", "Data Brokers (Reported)", 12.5)]);
    }
}
