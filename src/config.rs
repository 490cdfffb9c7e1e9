// ⚙️ Analysis Configuration - label tables, questions, gap mappings
//
// One shared table of display labels is injected into the summary,
// report and chart steps. Defaults reproduce the research tables; a JSON
// file may override any section.

use crate::normalize::title_case;
use anyhow::{Context, Result};
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

// ============================================================================
// ROOT CONFIG
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisConfig {
    #[serde(default)]
    pub labels: LabelConfig,

    #[serde(default = "default_questions")]
    pub questions: Vec<QuestionSpec>,

    #[serde(default)]
    pub gap: GapConfig,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        AnalysisConfig {
            labels: LabelConfig::default(),
            questions: default_questions(),
            gap: GapConfig::default(),
        }
    }
}

impl AnalysisConfig {
    /// Load configuration from a JSON file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(path.as_ref())
            .with_context(|| format!("Failed to read config file: {:?}", path.as_ref()))?;

        let config: AnalysisConfig =
            serde_json::from_str(&content).context("Failed to parse config JSON")?;

        Ok(config)
    }

    /// Question definition by key ("Q1", "Q2", ...)
    pub fn question(&self, key: &str) -> Option<&QuestionSpec> {
        self.questions.iter().find(|q| q.key == key)
    }
}

// ============================================================================
// LABELS
// ============================================================================

/// Label maps in a config file are merged over the defaults: a listed key
/// replaces its default entry, unlisted defaults are kept.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LabelConfig {
    /// Category key → display label
    #[serde(default = "default_category_titles", deserialize_with = "merge_category_titles")]
    pub category_titles: BTreeMap<String, String>,

    /// Question key → display label
    #[serde(default = "default_question_labels", deserialize_with = "merge_question_labels")]
    pub question_labels: BTreeMap<String, String>,

    /// Response code → display label
    #[serde(default = "default_response_labels", deserialize_with = "merge_response_labels")]
    pub response_labels: BTreeMap<i64, String>,

    /// Display order of response labels
    #[serde(default = "default_response_order")]
    pub response_order: Vec<String>,

    /// Colors matching `response_order`
    #[serde(default = "default_response_colors")]
    pub response_colors: Vec<String>,
}

impl Default for LabelConfig {
    fn default() -> Self {
        LabelConfig {
            category_titles: default_category_titles(),
            question_labels: default_question_labels(),
            response_labels: default_response_labels(),
            response_order: default_response_order(),
            response_colors: default_response_colors(),
        }
    }
}

impl LabelConfig {
    /// Display label for a category; unknown keys are title-cased
    pub fn category_title(&self, key: &str) -> String {
        self.category_titles
            .get(key)
            .cloned()
            .unwrap_or_else(|| title_case(key))
    }

    pub fn question_label(&self, key: &str) -> String {
        self.question_labels
            .get(key)
            .cloned()
            .unwrap_or_else(|| key.to_string())
    }

    /// Label for a numeric response; `None` for non-integral or unknown codes
    pub fn response_label(&self, response: f64) -> Option<&str> {
        if response.fract() != 0.0 {
            return None;
        }
        self.response_labels
            .get(&(response as i64))
            .map(String::as_str)
    }

    /// Sort rank of a response label; unknown labels sort last
    pub fn response_rank(&self, label: &str) -> usize {
        self.response_order
            .iter()
            .position(|l| l == label)
            .unwrap_or(self.response_order.len())
    }
}

fn merge_over<'de, D, K, V>(deserializer: D, defaults: BTreeMap<K, V>) -> Result<BTreeMap<K, V>, D::Error>
where
    D: Deserializer<'de>,
    K: Ord + Deserialize<'de>,
    V: Deserialize<'de>,
{
    let overrides = BTreeMap::<K, V>::deserialize(deserializer)?;
    let mut merged = defaults;
    merged.extend(overrides);
    Ok(merged)
}

fn merge_category_titles<'de, D: Deserializer<'de>>(d: D) -> Result<BTreeMap<String, String>, D::Error> {
    merge_over(d, default_category_titles())
}

fn merge_question_labels<'de, D: Deserializer<'de>>(d: D) -> Result<BTreeMap<String, String>, D::Error> {
    merge_over(d, default_question_labels())
}

fn merge_response_labels<'de, D: Deserializer<'de>>(d: D) -> Result<BTreeMap<i64, String>, D::Error> {
    merge_over(d, default_response_labels())
}

fn default_category_titles() -> BTreeMap<String, String> {
    [
        ("marketing", "Marketing"),
        ("personalized_ads", "Personalized Ads"),
        ("employment", "Employment"),
        ("consumer_finance", "Consumer Finance"),
        ("law_no_subpoena", "Law Enforcement (No Subpoena)"),
        ("gov", "Government"),
        ("corporations", "Corporations"),
        ("education_research", "Education & Research"),
        ("access", "Access"),
        ("correct", "Correct"),
        ("delete", "Delete"),
        ("no_discrimination", "No Discrimination"),
        ("no_targeted_ads", "No Targeted Ads"),
        ("opt_out_data", "Opt-Out Sharing & Collection"),
    ]
    .into_iter()
    .map(|(k, v)| (k.to_string(), v.to_string()))
    .collect()
}

fn default_question_labels() -> BTreeMap<String, String> {
    [
        ("Q1", "Data Use (Q1)"),
        ("Q2", "Entity Sharing (Q2)"),
        ("Q3", "User Rights (Q3)"),
    ]
    .into_iter()
    .map(|(k, v)| (k.to_string(), v.to_string()))
    .collect()
}

fn default_response_labels() -> BTreeMap<i64, String> {
    [(0, "No"), (1, "Yes"), (2, "Not Mentioned")]
        .into_iter()
        .map(|(k, v)| (k, v.to_string()))
        .collect()
}

fn default_response_order() -> Vec<String> {
    vec!["Yes".to_string(), "No".to_string(), "Not Mentioned".to_string()]
}

fn default_response_colors() -> Vec<String> {
    vec![
        "#2ca02c".to_string(),
        "#d62728".to_string(),
        "#7f7f7f".to_string(),
    ]
}

// ============================================================================
// QUESTIONS
// ============================================================================

/// How the codes of a question are bucketed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResponseScale {
    /// 0 = not allowed, 1 = allowed, 2 = not mentioned
    TriState,
    /// 0 = no guarantee, 1 = guaranteed
    Binary,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuestionSpec {
    /// Short key ("Q1")
    pub key: String,

    /// Source column in the LLM results file ("LLM Q1")
    pub column: String,

    /// Category names, positionally matched to response codes
    pub categories: Vec<String>,

    pub scale: ResponseScale,

    /// Chart title
    #[serde(default)]
    pub title: String,

    /// Chart axis label for the categories
    #[serde(default)]
    pub xlabel: String,

    /// Legend labels: a list (index → label) or a map (code → label).
    /// Kept as raw JSON and checked when a chart is built.
    #[serde(default)]
    pub legend_labels: Option<serde_json::Value>,

    #[serde(default = "default_legend_title")]
    pub legend_title: String,
}

fn default_legend_title() -> String {
    "Response Type".to_string()
}

fn question(
    key: &str,
    column: &str,
    categories: &[&str],
    scale: ResponseScale,
    title: &str,
    xlabel: &str,
    legend: &[&str],
) -> QuestionSpec {
    QuestionSpec {
        key: key.to_string(),
        column: column.to_string(),
        categories: categories.iter().map(|c| c.to_string()).collect(),
        scale,
        title: title.to_string(),
        xlabel: xlabel.to_string(),
        legend_labels: Some(serde_json::json!(legend)),
        legend_title: default_legend_title(),
    }
}

fn default_questions() -> Vec<QuestionSpec> {
    vec![
        question(
            "Q1",
            "LLM Q1",
            &[
                "marketing",
                "personalized_ads",
                "employment",
                "consumer_finance",
                "law_no_subpoena",
            ],
            ResponseScale::TriState,
            "What Data Brokers Say They Use Your Data For",
            "Data Use",
            &["Not Allowed", "Allowed", "Not Mentioned"],
        ),
        question(
            "Q2",
            "LLM Q2",
            &["gov", "corporations", "education_research"],
            ResponseScale::TriState,
            "Who Data Brokers Say They Share Your Data With",
            "Entity",
            &["Not Allowed", "Allowed", "Not Mentioned"],
        ),
        question(
            "Q3",
            "LLM Q3",
            &[
                "access",
                "correct",
                "delete",
                "no_discrimination",
                "no_targeted_ads",
                "opt_out_data",
            ],
            ResponseScale::Binary,
            "User Rights Guaranteed by Data Brokers",
            "User Right",
            &["No Guarantee", "Guaranteed"],
        ),
    ]
}

// ============================================================================
// GAP ANALYSIS
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GapConfig {
    #[serde(default = "default_consumer_label")]
    pub consumer_label: String,

    #[serde(default = "default_data_types")]
    pub data_types: GapDimension,

    #[serde(default = "default_use_cases")]
    pub use_cases: GapDimension,
}

impl Default for GapConfig {
    fn default() -> Self {
        GapConfig {
            consumer_label: default_consumer_label(),
            data_types: default_data_types(),
            use_cases: default_use_cases(),
        }
    }
}

/// One broker-vs-consumer comparison (data types, use cases)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GapDimension {
    /// Multi-select survey column holding the consumer answers
    pub survey_column: String,

    /// Label of the broker side ("Data Brokers (Reported)")
    pub broker_label: String,

    pub categories: Vec<GapCategory>,

    /// Preferred plotting order; unlisted categories follow, sorted
    pub sort_order: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GapCategory {
    /// Shared display label
    pub label: String,

    /// Broker-side field: a `Collects*` column or an LLM category key
    pub broker_field: String,

    /// Survey option text searched for in each answer
    pub survey_option: String,

    /// Broker percentage used when no broker data is supplied
    #[serde(default)]
    pub fallback_percentage: Option<f64>,
}

fn default_consumer_label() -> String {
    "Consumers".to_string()
}

fn gap_category(label: &str, broker_field: &str, survey_option: &str) -> GapCategory {
    GapCategory {
        label: label.to_string(),
        broker_field: broker_field.to_string(),
        survey_option: survey_option.to_string(),
        fallback_percentage: None,
    }
}

fn default_data_types() -> GapDimension {
    GapDimension {
        survey_column: "3. Which types of your personal data are you comfortable being used for any purpose? (Select all that apply)".to_string(),
        broker_label: "Data Brokers (Reported)".to_string(),
        categories: vec![
            gap_category(
                "Commercial transactions data",
                "CollectsCommercialData",
                "Commercial data (e.g., purchasing and transaction history)",
            ),
            gap_category(
                "Employment-related data",
                "CollectsEmploymentData",
                "Employment-related data",
            ),
            // Addresses are the closest proxy for location
            gap_category("Location data", "CollectsAddresses", "Location data"),
            gap_category(
                "Biometric data",
                "CollectsBiometricData",
                "Biometric data (e.g., fingerprint, voice, facial recognition)",
            ),
            gap_category(
                "Minors' data",
                "CollectsMinorsData",
                "Personal information of individuals under 18",
            ),
            gap_category(
                "Reproductive health-related information",
                "CollectsReproductiveHealthData",
                "Reproductive health-related information",
            ),
            gap_category(
                "Social Security Number and government ID information",
                "CollectsSSNGovID",
                "Social Security Number and government ID information",
            ),
            gap_category(
                "Network data",
                "CollectsNetworkData",
                "Network data (e.g., IP address, browsing history)",
            ),
        ],
        sort_order: [
            "Commercial transactions data",
            "Employment-related data",
            "Location data",
            "Network data",
            "Minors' data",
            "Biometric data",
            "Reproductive health-related information",
            "Social Security Number and government ID information",
        ]
        .iter()
        .map(|s| s.to_string())
        .collect(),
    }
}

fn default_use_cases() -> GapDimension {
    let mut marketing = gap_category("Marketing", "marketing", "Marketing");
    marketing.fallback_percentage = Some(95.5);

    let mut ads = gap_category(
        "Personalized advertising",
        "personalized_ads",
        "Personalized advertising",
    );
    ads.fallback_percentage = Some(86.0);

    let mut employment = gap_category(
        "Employment decisions",
        "employment",
        "Employment decisions (e.g., hiring, promotions)",
    );
    employment.fallback_percentage = Some(59.0);

    GapDimension {
        survey_column: "4. What purposes are you comfortable with your personal data being used for? (Select all that apply)".to_string(),
        broker_label: "Data Brokers (Explicit)".to_string(),
        categories: vec![marketing, ads, employment],
        sort_order: vec![
            "Marketing".to_string(),
            "Personalized advertising".to_string(),
            "Employment decisions".to_string(),
        ],
    }
}

// ============================================================================
// TESTS
// ============================================================================
