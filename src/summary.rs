// 📊 Response Summary - wide parsed responses → long (category, response) rows
//
// share = count / labelled responses in the same (question, category),
// so shares sum to 1 for every category that has any answer.

use crate::config::{AnalysisConfig, LabelConfig};
use crate::error::PipelineError;
use crate::responses::{analyze_question, ParsedResponses};
use crate::table::Table;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::BTreeMap;
use tracing::debug;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SummaryRow {
    pub question: String,
    pub category: String,
    pub category_label: String,
    pub response: i64,
    pub response_label: String,
    pub count: usize,
    pub share: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct PolicySummary {
    pub generated_at: DateTime<Utc>,
    pub summary: Vec<SummaryRow>,
    pub response_order: Vec<String>,
    pub response_colors: Vec<String>,
}

/// Order categories by a preferred list; unknown ones follow, sorted
pub fn order_categories(present: &[String], preferred: &[String]) -> Vec<String> {
    let mut ordered: Vec<String> = preferred
        .iter()
        .filter(|p| present.contains(p))
        .cloned()
        .collect();

    let mut extra: Vec<String> = present
        .iter()
        .filter(|c| !preferred.contains(c))
        .cloned()
        .collect();
    extra.sort();
    extra.dedup();

    ordered.extend(extra);
    ordered
}

/// Long-form counts and shares for one question
pub fn build_response_summary(
    parsed: &ParsedResponses,
    question_key: &str,
    preferred_order: &[String],
    labels: &LabelConfig,
) -> Vec<SummaryRow> {
    let question = labels.question_label(question_key);
    let mut rows = Vec::new();

    for category in order_categories(&parsed.categories, preferred_order) {
        let Some(values) = parsed.column(&category) else {
            continue;
        };

        // response code → count, only for codes with a label
        let mut counts: BTreeMap<i64, (String, usize)> = BTreeMap::new();
        let mut unlabelled = 0usize;
        for value in values.into_iter().flatten() {
            match labels.response_label(value) {
                Some(label) => {
                    counts
                        .entry(value as i64)
                        .or_insert_with(|| (label.to_string(), 0))
                        .1 += 1;
                }
                None => unlabelled += 1,
            }
        }
        if unlabelled > 0 {
            debug!(
                "{} / {}: {} responses without a label left out",
                question, category, unlabelled
            );
        }

        let total: usize = counts.values().map(|(_, c)| c).sum();
        if total == 0 {
            continue;
        }

        let category_label = labels.category_title(&category);
        let mut category_rows: Vec<SummaryRow> = counts
            .into_iter()
            .map(|(response, (response_label, count))| SummaryRow {
                question: question.clone(),
                category: category.clone(),
                category_label: category_label.clone(),
                response,
                response_label,
                count,
                share: count as f64 / total as f64,
            })
            .collect();
        category_rows.sort_by_key(|r| (labels.response_rank(&r.response_label), r.response));

        rows.extend(category_rows);
    }

    rows
}

/// Summaries of every configured question, concatenated in config order
pub fn prepare_privacy_policy_summary(
    llm_data: &Table,
    config: &AnalysisConfig,
) -> Result<PolicySummary, PipelineError> {
    let mut summary = Vec::new();

    for question in &config.questions {
        let analysis = analyze_question(llm_data, question)?;
        summary.extend(build_response_summary(
            &analysis.parsed,
            &question.key,
            &question.categories,
            &config.labels,
        ));
    }

    Ok(PolicySummary {
        generated_at: Utc::now(),
        summary,
        response_order: config.labels.response_order.clone(),
        response_colors: config.labels.response_colors.clone(),
    })
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::responses::ParsedRow;

    fn s(list: &[&str]) -> Vec<String> {
        list.iter().map(|x| x.to_string()).collect()
    }

    fn parsed(categories: &[&str], rows: Vec<Vec<Option<f64>>>) -> ParsedResponses {
        ParsedResponses {
            categories: s(categories),
            rows: rows
                .into_iter()
                .map(|values| ParsedRow { name: None, values })
                .collect(),
        }
    }

    #[test]
    fn test_order_categories() {
        let ordered = order_categories(&s(&["zeta", "b", "a", "alpha"]), &s(&["a", "b", "c"]));
        assert_eq!(ordered, s(&["a", "b", "alpha", "zeta"]));
    }

    #[test]
    fn test_summary_rows_and_labels() {
        let data = parsed(
            &["marketing", "gov"],
            vec![
                vec![Some(1.0), Some(0.0)],
                vec![Some(1.0), None],
                vec![Some(2.0), Some(0.0)],
                vec![Some(0.0), Some(1.0)],
            ],
        );
        let labels = LabelConfig::default();
        let rows = build_response_summary(&data, "Q1", &s(&["marketing", "gov"]), &labels);

        let marketing: Vec<&SummaryRow> = rows.iter().filter(|r| r.category == "marketing").collect();
        assert_eq!(marketing.len(), 3);
        assert_eq!(marketing[0].response_label, "Yes");
        assert_eq!(marketing[0].count, 2);
        assert!((marketing[0].share - 0.5).abs() < 1e-9);
        assert_eq!(marketing[1].response_label, "No");
        assert_eq!(marketing[2].response_label, "Not Mentioned");
        assert_eq!(marketing[0].question, "Data Use (Q1)");
        assert_eq!(marketing[0].category_label, "Marketing");

        let gov: Vec<&SummaryRow> = rows.iter().filter(|r| r.category == "gov").collect();
        assert_eq!(gov.len(), 2);
        assert_eq!(gov[0].category_label, "Government");
    }

    #[test]
    fn test_shares_sum_to_one_per_category() {
        let data = parsed(
            &["a", "b", "c"],
            vec![
                vec![Some(1.0), Some(2.0), None],
                vec![Some(0.0), Some(2.0), None],
                vec![Some(2.0), Some(5.0), None],
                vec![Some(1.0), Some(1.0), None],
                vec![None, Some(0.0), None],
            ],
        );
        let rows = build_response_summary(&data, "Q9", &[], &LabelConfig::default());

        for category in ["a", "b"] {
            let total: f64 = rows
                .iter()
                .filter(|r| r.category == category)
                .map(|r| r.share)
                .sum();
            assert!((total - 1.0).abs() < 1e-9, "{} sums to {}", category, total);
        }
        // no labelled answers at all
        assert!(rows.iter().all(|r| r.category != "c"));
        // unknown question keys fall back to the key
        assert_eq!(rows[0].question, "Q9");
    }

    #[test]
    fn test_prepare_summary_covers_all_questions() {
        let table = Table::from_rows(
            &["Name", "LLM Q1", "LLM Q2", "LLM Q3"],
            vec![
                vec![Some("A"), Some("[1,1,0,2,2]"), Some("[1,0,2]"), Some("[1,1,1,0,0,1]")],
                vec![Some("B"), Some("[0,1,1,2,1]"), Some("[1,1,2]"), Some("[0,1,1,0,1,1]")],
            ],
        );
        let summary = prepare_privacy_policy_summary(&table, &AnalysisConfig::default()).unwrap();

        let categories: std::collections::BTreeSet<&str> =
            summary.summary.iter().map(|r| r.category.as_str()).collect();
        assert_eq!(categories.len(), 5 + 3 + 6);
        assert_eq!(summary.response_order, s(&["Yes", "No", "Not Mentioned"]));
        assert_eq!(summary.summary[0].question, "Data Use (Q1)");
        assert_eq!(summary.summary[0].category, "marketing");
        assert_eq!(summary.summary.last().unwrap().question, "User Rights (Q3)");
    }
}
