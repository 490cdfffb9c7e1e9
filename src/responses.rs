// 🧾 Response Parser - "[0, 1, 2]" → one numeric column per category
//
// Codes are assigned positionally. When every row has fewer codes than
// there are category names, the trailing categories are absent from the
// result (not filled with missing values).

use crate::config::{AnalysisConfig, QuestionSpec, ResponseScale};
use crate::error::{ConfigError, PipelineError};
use crate::table::{parse_number, Table};
use serde::Serialize;
use tracing::{debug, warn};

// ============================================================================
// PARSED RESPONSES
// ============================================================================

#[derive(Debug, Clone, PartialEq)]
pub struct ParsedRow {
    pub name: Option<String>,

    /// One value per `ParsedResponses::categories`
    pub values: Vec<Option<f64>>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ParsedResponses {
    /// Categories that received a column (may be a prefix of the requested list)
    pub categories: Vec<String>,
    pub rows: Vec<ParsedRow>,
}

impl ParsedResponses {
    pub fn has_category(&self, category: &str) -> bool {
        self.categories.iter().any(|c| c == category)
    }

    /// Values of one category, `None` if the column was never created
    pub fn column(&self, category: &str) -> Option<Vec<Option<f64>>> {
        let idx = self.categories.iter().position(|c| c == category)?;
        Some(self.rows.iter().map(|r| r.values[idx]).collect())
    }

    /// How often `code` appears in a category
    pub fn count(&self, category: &str, code: f64) -> usize {
        self.column(category)
            .map(|values| values.iter().filter(|v| **v == Some(code)).count())
            .unwrap_or(0)
    }
}

/// Split a bracketed code list into raw tokens
fn split_codes(raw: &str) -> Vec<String> {
    let inner = raw.trim().trim_start_matches('[').trim_end_matches(']');
    let squashed: String = inner.chars().filter(|c| !c.is_whitespace()).collect();
    squashed.split(',').map(str::to_string).collect()
}

/// Parse the bracketed responses in `question_col` into one numeric column
/// per category name.
pub fn parse_llm_responses(
    data: &Table,
    question_col: &str,
    category_names: &[String],
    name_col: &str,
) -> Result<ParsedResponses, PipelineError> {
    let name_idx = data.require_column(name_col)?;
    let question_idx = data.require_column(question_col)?;

    let split: Vec<Option<Vec<String>>> = data
        .rows()
        .iter()
        .map(|row| row[question_idx].as_deref().map(split_codes))
        .collect();

    let max_tokens = split.iter().flatten().map(Vec::len).max().unwrap_or(0);
    if max_tokens > category_names.len() {
        warn!(
            "{}: responses have up to {} codes but only {} categories; extra codes ignored",
            question_col,
            max_tokens,
            category_names.len()
        );
    }

    let width = max_tokens.min(category_names.len());
    if width < category_names.len() {
        debug!(
            "{}: no response has more than {} codes; categories {:?} are absent",
            question_col,
            width,
            &category_names[width..]
        );
    }

    let rows = data
        .rows()
        .iter()
        .zip(split)
        .map(|(row, tokens)| {
            let tokens = tokens.unwrap_or_default();
            let values = (0..width)
                .map(|i| tokens.get(i).and_then(|t| parse_number(t)))
                .collect();
            ParsedRow {
                name: row[name_idx].clone(),
                values,
            }
        })
        .collect();

    Ok(ParsedResponses {
        categories: category_names[..width].to_vec(),
        rows,
    })
}

// ============================================================================
// FREQUENCY TABLES
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum CategoryStats {
    TriState {
        not_allowed: usize,
        allowed: usize,
        not_mentioned: usize,
    },
    Binary {
        no_guarantee: usize,
        guaranteed: usize,
    },
}

impl CategoryStats {
    pub fn total(&self) -> usize {
        match *self {
            CategoryStats::TriState {
                not_allowed,
                allowed,
                not_mentioned,
            } => not_allowed + allowed + not_mentioned,
            CategoryStats::Binary {
                no_guarantee,
                guaranteed,
            } => no_guarantee + guaranteed,
        }
    }

    /// Count of the positive bucket (allowed / guaranteed)
    pub fn positive(&self) -> usize {
        match *self {
            CategoryStats::TriState { allowed, .. } => allowed,
            CategoryStats::Binary { guaranteed, .. } => guaranteed,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CategoryTally {
    pub category: String,
    pub stats: CategoryStats,
}

/// Parsed responses plus per-category counts for one question
#[derive(Debug, Clone)]
pub struct QuestionAnalysis {
    pub key: String,
    pub parsed: ParsedResponses,
    pub stats: Vec<CategoryTally>,
}

impl QuestionAnalysis {
    pub fn tally(&self, category: &str) -> Option<&CategoryStats> {
        self.stats
            .iter()
            .find(|t| t.category == category)
            .map(|t| &t.stats)
    }
}

/// Bucket counts for every category that received a column
pub fn summarize(parsed: &ParsedResponses, categories: &[String], scale: ResponseScale) -> Vec<CategoryTally> {
    categories
        .iter()
        .filter(|c| parsed.has_category(c))
        .map(|category| {
            let stats = match scale {
                ResponseScale::TriState => CategoryStats::TriState {
                    not_allowed: parsed.count(category, 0.0),
                    allowed: parsed.count(category, 1.0),
                    not_mentioned: parsed.count(category, 2.0),
                },
                ResponseScale::Binary => CategoryStats::Binary {
                    no_guarantee: parsed.count(category, 0.0),
                    guaranteed: parsed.count(category, 1.0),
                },
            };
            CategoryTally {
                category: category.clone(),
                stats,
            }
        })
        .collect()
}

pub fn analyze_question(llm_data: &Table, question: &QuestionSpec) -> Result<QuestionAnalysis, PipelineError> {
    let parsed = parse_llm_responses(llm_data, &question.column, &question.categories, "Name")?;
    let stats = summarize(&parsed, &question.categories, question.scale);

    Ok(QuestionAnalysis {
        key: question.key.clone(),
        parsed,
        stats,
    })
}

fn analyze_configured(llm_data: &Table, config: &AnalysisConfig, key: &str) -> anyhow::Result<QuestionAnalysis> {
    let question = config
        .question(key)
        .ok_or_else(|| ConfigError::UnknownQuestion(key.to_string()))?;
    Ok(analyze_question(llm_data, question)?)
}

/// Q1: what brokers say they use data for
pub fn analyze_data_use_practices(llm_data: &Table, config: &AnalysisConfig) -> anyhow::Result<QuestionAnalysis> {
    analyze_configured(llm_data, config, "Q1")
}

/// Q2: who brokers say they share data with
pub fn analyze_sharing_entities(llm_data: &Table, config: &AnalysisConfig) -> anyhow::Result<QuestionAnalysis> {
    analyze_configured(llm_data, config, "Q2")
}

/// Q3: which user rights brokers guarantee
pub fn analyze_user_controls(llm_data: &Table, config: &AnalysisConfig) -> anyhow::Result<QuestionAnalysis> {
    analyze_configured(llm_data, config, "Q3")
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn names(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    fn llm(rows: Vec<Vec<Option<&str>>>) -> Table {
        Table::from_rows(&["Name", "LLM Q1", "LLM Q2", "LLM Q3"], rows)
    }

    #[test]
    fn test_parse_basic() {
        let table = llm(vec![vec![Some("Acme"), Some("[0, 1, 2]"), None, None]]);
        let parsed = parse_llm_responses(&table, "LLM Q1", &names(&["a", "b", "c"]), "Name").unwrap();

        assert_eq!(parsed.categories, names(&["a", "b", "c"]));
        assert_eq!(parsed.rows[0].name.as_deref(), Some("Acme"));
        assert_eq!(parsed.rows[0].values, vec![Some(0.0), Some(1.0), Some(2.0)]);
    }

    #[test]
    fn test_short_responses_truncate_columns() {
        let table = llm(vec![vec![Some("Acme"), Some("[0,1]"), None, None]]);
        let parsed = parse_llm_responses(&table, "LLM Q1", &names(&["a", "b", "c"]), "Name").unwrap();

        assert_eq!(parsed.categories, names(&["a", "b"]));
        assert_eq!(parsed.column("a"), Some(vec![Some(0.0)]));
        assert_eq!(parsed.column("b"), Some(vec![Some(1.0)]));
        assert_eq!(parsed.column("c"), None);
    }

    #[test]
    fn test_longest_row_decides_width() {
        let table = llm(vec![
            vec![Some("Acme"), Some("[0,1]"), None, None],
            vec![Some("Beta"), Some("[1,1,1]"), None, None],
        ]);
        let parsed = parse_llm_responses(&table, "LLM Q1", &names(&["a", "b", "c"]), "Name").unwrap();

        assert_eq!(parsed.categories.len(), 3);
        assert_eq!(parsed.column("c"), Some(vec![None, Some(1.0)]));
    }

    #[test]
    fn test_bad_tokens_become_missing_without_dropping_rows() {
        let table = llm(vec![
            vec![Some("Acme"), Some("[0, x, 2]"), None, None],
            vec![Some("Beta"), None, None, None],
            vec![Some("Gamma"), Some("[]"), None, None],
        ]);
        let parsed = parse_llm_responses(&table, "LLM Q1", &names(&["a", "b", "c"]), "Name").unwrap();

        assert_eq!(parsed.rows.len(), 3);
        assert_eq!(parsed.rows[0].values, vec![Some(0.0), None, Some(2.0)]);
        assert_eq!(parsed.rows[1].values, vec![None, None, None]);
        assert_eq!(parsed.rows[2].values, vec![None, None, None]);
    }

    #[test]
    fn test_extra_tokens_are_ignored() {
        let table = llm(vec![vec![Some("Acme"), Some("[1,0,1,1]"), None, None]]);
        let parsed = parse_llm_responses(&table, "LLM Q1", &names(&["a", "b"]), "Name").unwrap();
        assert_eq!(parsed.rows[0].values, vec![Some(1.0), Some(0.0)]);
    }

    #[test]
    fn test_missing_question_column() {
        let table = Table::from_rows(&["Name"], vec![]);
        let err = parse_llm_responses(&table, "LLM Q1", &names(&["a"]), "Name").unwrap_err();
        assert!(matches!(err, PipelineError::MissingColumn(c) if c == "LLM Q1"));
    }

    #[test]
    fn test_analyze_data_use_counts() {
        let table = llm(vec![
            vec![Some("A"), Some("[1,1,0,2,2]"), None, None],
            vec![Some("B"), Some("[1,0,0,2,1]"), None, None],
            vec![Some("C"), Some("[2,1,0,2,0]"), None, None],
        ]);
        let config = AnalysisConfig::default();
        let analysis = analyze_data_use_practices(&table, &config).unwrap();

        assert_eq!(analysis.stats.len(), 5);
        assert_eq!(
            analysis.tally("marketing"),
            Some(&CategoryStats::TriState {
                not_allowed: 0,
                allowed: 2,
                not_mentioned: 1
            })
        );
        assert_eq!(analysis.tally("employment").unwrap().total(), 3);
        assert_eq!(
            analysis.tally("law_no_subpoena"),
            Some(&CategoryStats::TriState {
                not_allowed: 1,
                allowed: 1,
                not_mentioned: 1
            })
        );
    }

    #[test]
    fn test_analyze_user_controls_is_binary() {
        let table = llm(vec![
            vec![Some("A"), None, None, Some("[1,1,0,0,1,2]")],
            vec![Some("B"), None, None, Some("[0,1,0,0,1,1]")],
        ]);
        let analysis = analyze_user_controls(&table, &AnalysisConfig::default()).unwrap();

        assert_eq!(
            analysis.tally("access"),
            Some(&CategoryStats::Binary {
                no_guarantee: 1,
                guaranteed: 1
            })
        );
        // code 2 is outside the binary scale
        assert_eq!(analysis.tally("opt_out_data").unwrap().total(), 1);
    }

    #[test]
    fn test_analyze_sharing_truncated_categories_have_no_stats() {
        let table = llm(vec![vec![Some("A"), None, Some("[1,0]"), None]]);
        let analysis = analyze_sharing_entities(&table, &AnalysisConfig::default()).unwrap();

        assert_eq!(analysis.stats.len(), 2);
        assert!(analysis.tally("education_research").is_none());
    }

    #[test]
    fn test_unknown_question_is_config_error() {
        let mut config = AnalysisConfig::default();
        config.questions.retain(|q| q.key != "Q2");

        let table = llm(vec![]);
        let err = analyze_sharing_entities(&table, &config).unwrap_err();
        assert!(err.downcast_ref::<ConfigError>().is_some());
    }
}
