// 📈 Chart Specs - Vega-Lite JSON for policy bars and gap dumbbells
//
// Charts are emitted as declarative specs; rendering is left to any
// Vega-Lite viewer.

use crate::config::{LabelConfig, QuestionSpec};
use crate::error::ConfigError;
use crate::gap::GapPoint;
use crate::responses::ParsedResponses;
use crate::table::format_number;
use anyhow::{Context, Result};
use serde_json::{json, Value};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use tracing::debug;

pub const VEGA_LITE_SCHEMA: &str = "https://vega.github.io/schema/vega-lite/v5.json";

/// Dumbbell point colors, assigned to sources in sorted order
const SOURCE_COLORS: [&str; 2] = ["#3498db", "#e74c3c"];

// ============================================================================
// LEGEND LABELS
// ============================================================================

/// Response code → legend label mapping
#[derive(Debug, Clone, PartialEq)]
pub enum LegendLabels {
    /// Label at index `i` names response code `i`
    List(Vec<String>),
    /// Explicit code → label pairs
    Map(BTreeMap<i64, String>),
}

impl LegendLabels {
    /// Accepts a JSON list of strings or an object with integer keys.
    /// Any other shape is a configuration error.
    pub fn from_value(value: &Value) -> Result<Self, ConfigError> {
        match value {
            Value::Array(items) => items
                .iter()
                .map(|item| match item {
                    Value::String(s) => Ok(s.clone()),
                    other => Err(ConfigError::LegendLabelsType(format!("list containing {}", other))),
                })
                .collect::<Result<Vec<_>, _>>()
                .map(LegendLabels::List),
            Value::Object(entries) => {
                let mut map = BTreeMap::new();
                for (key, label) in entries {
                    let code: i64 = key
                        .trim()
                        .parse()
                        .map_err(|_| ConfigError::LegendLabelsKey(key.clone()))?;
                    let label = match label {
                        Value::String(s) => s.clone(),
                        other => other.to_string(),
                    };
                    map.insert(code, label);
                }
                Ok(LegendLabels::Map(map))
            }
            other => Err(ConfigError::LegendLabelsType(json_type_name(other).to_string())),
        }
    }

    pub fn label_map(&self) -> BTreeMap<i64, String> {
        match self {
            LegendLabels::List(labels) => labels
                .iter()
                .enumerate()
                .map(|(i, label)| (i as i64, label.clone()))
                .collect(),
            LegendLabels::Map(map) => map.clone(),
        }
    }

    /// Legend order: list order, or labels by ascending code
    pub fn sort_order(&self) -> Vec<String> {
        match self {
            LegendLabels::List(labels) => labels.clone(),
            LegendLabels::Map(map) => map.values().cloned().collect(),
        }
    }
}

fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "list",
        Value::Object(_) => "dictionary",
    }
}

// ============================================================================
// POLICY ANALYSIS CHART
// ============================================================================

#[derive(Debug, Clone, Default)]
pub struct PolicyChartOptions<'a> {
    pub title: &'a str,
    pub xlabel: &'a str,
    pub legend_labels: Option<&'a Value>,
    pub legend_title: &'a str,

    /// Overrides the shared category titles when set
    pub category_labels: Option<&'a BTreeMap<String, String>>,
}

impl<'a> PolicyChartOptions<'a> {
    pub fn for_question(question: &'a QuestionSpec) -> Self {
        PolicyChartOptions {
            title: &question.title,
            xlabel: &question.xlabel,
            legend_labels: question.legend_labels.as_ref(),
            legend_title: &question.legend_title,
            category_labels: None,
        }
    }
}

/// Normalized stacked horizontal bars: one bar per category, segments by
/// response label. Responses without a legend label are left out.
pub fn create_policy_analysis_chart(
    parsed: &ParsedResponses,
    category_columns: &[String],
    options: &PolicyChartOptions<'_>,
    labels: &LabelConfig,
) -> Result<Value, ConfigError> {
    let legend = options
        .legend_labels
        .map(LegendLabels::from_value)
        .transpose()?;
    let label_map = legend.as_ref().map(LegendLabels::label_map);

    let display = |category: &str| -> String {
        options
            .category_labels
            .and_then(|m| m.get(category).cloned())
            .unwrap_or_else(|| labels.category_title(category))
    };

    let mut values = Vec::new();
    let mut dropped = 0usize;
    for category in category_columns {
        let Some(column) = parsed.column(category) else {
            continue;
        };
        let display_category = display(category);

        for response in column.into_iter().flatten() {
            let response_label = match &label_map {
                Some(map) if response.fract() == 0.0 => map.get(&(response as i64)).cloned(),
                Some(_) => None,
                None => Some(format_number(response)),
            };
            let Some(response_label) = response_label else {
                dropped += 1;
                continue;
            };
            values.push(json!({
                "category": category,
                "display_category": display_category,
                "response": response,
                "response_label": response_label,
            }));
        }
    }
    if dropped > 0 {
        debug!("{}: {} responses without a legend label left out", options.title, dropped);
    }

    let category_sort: Vec<String> = category_columns
        .iter()
        .filter(|c| parsed.has_category(c))
        .map(|c| display(c))
        .collect();
    let color_sort = legend.as_ref().map(LegendLabels::sort_order);

    Ok(json!({
        "$schema": VEGA_LITE_SCHEMA,
        "title": options.title,
        "data": { "values": values },
        "mark": "bar",
        "encoding": {
            "y": {
                "field": "display_category",
                "type": "nominal",
                "title": options.xlabel,
                "axis": { "labelAngle": 0 },
                "sort": category_sort,
            },
            "x": {
                "aggregate": "count",
                "type": "quantitative",
                "stack": "normalize",
                "axis": { "format": "%", "title": "Percentage" },
            },
            "color": {
                "field": "response_label",
                "type": "nominal",
                "title": options.legend_title,
                "sort": color_sort,
            },
            "tooltip": [
                { "field": "display_category", "type": "nominal", "title": "Category" },
                { "field": "response_label", "type": "nominal" },
                { "aggregate": "count", "type": "quantitative", "title": "Count" },
            ],
        },
    }))
}

// ============================================================================
// DUMBBELL CHART
// ============================================================================

/// Gray connector per category with one colored point per source
pub fn create_dumbbell_chart(points: &[GapPoint], title: &str, x_label: &str, y_label: &str) -> Value {
    let values: Vec<Value> = points
        .iter()
        .map(|p| {
            json!({
                "Category": p.category,
                "Source": p.source,
                "Percentage": p.percentage,
            })
        })
        .collect();

    json!({
        "$schema": VEGA_LITE_SCHEMA,
        "title": title,
        "data": { "values": values },
        "encoding": {
            "y": {
                "field": "Category",
                "type": "nominal",
                "title": y_label,
                "sort": { "field": "Category", "op": "min", "order": "descending" },
            },
        },
        "layer": [
            {
                "mark": { "type": "line", "point": true, "size": 5 },
                "encoding": {
                    "x": { "field": "Percentage", "type": "quantitative", "title": x_label },
                    "detail": { "field": "Category", "type": "nominal" },
                    "color": { "value": "lightgray" },
                },
            },
            {
                "mark": { "type": "point", "size": 100, "filled": true },
                "encoding": {
                    "x": { "field": "Percentage", "type": "quantitative", "title": x_label },
                    "color": {
                        "field": "Source",
                        "type": "nominal",
                        "legend": { "title": "Source" },
                        "scale": { "range": SOURCE_COLORS },
                    },
                    "tooltip": [
                        { "field": "Category", "type": "nominal", "title": y_label },
                        { "field": "Source", "type": "nominal" },
                        {
                            "field": "Percentage",
                            "type": "quantitative",
                            "format": ".1f",
                            "title": "Percentage (%)",
                        },
                    ],
                },
                "params": [{ "name": "grid", "select": "interval", "bind": "scales" }],
            },
        ],
    })
}

/// Write a chart spec as pretty JSON, creating parent directories
pub fn save_chart(spec: &Value, path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create directory: {:?}", parent))?;
    }
    let content = serde_json::to_string_pretty(spec).context("Failed to serialize chart")?;
    fs::write(path, content).with_context(|| format!("Failed to write chart: {:?}", path))?;
    Ok(())
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::responses::ParsedRow;

    fn parsed() -> ParsedResponses {
        ParsedResponses {
            categories: vec!["marketing".to_string(), "data_resale".to_string()],
            rows: vec![
                ParsedRow {
                    name: Some("A".to_string()),
                    values: vec![Some(1.0), Some(0.0)],
                },
                ParsedRow {
                    name: Some("B".to_string()),
                    values: vec![Some(2.0), None],
                },
                ParsedRow {
                    name: Some("C".to_string()),
                    values: vec![Some(7.0), Some(1.0)],
                },
            ],
        }
    }

    fn columns() -> Vec<String> {
        vec![
            "marketing".to_string(),
            "data_resale".to_string(),
            "never_parsed".to_string(),
        ]
    }

    #[test]
    fn test_legend_from_list_and_map() {
        let list = LegendLabels::from_value(&json!(["No", "Yes"])).unwrap();
        assert_eq!(list.label_map().get(&1), Some(&"Yes".to_string()));
        assert_eq!(list.sort_order(), vec!["No", "Yes"]);

        let map = LegendLabels::from_value(&json!({"2": "Maybe", "0": "No"})).unwrap();
        assert_eq!(map.sort_order(), vec!["No", "Maybe"]);
    }

    #[test]
    fn test_legend_wrong_type_is_fatal() {
        let err = LegendLabels::from_value(&json!("Allowed")).unwrap_err();
        assert!(matches!(err, ConfigError::LegendLabelsType(t) if t == "string"));

        assert!(matches!(
            LegendLabels::from_value(&json!({"yes": "Yes"})),
            Err(ConfigError::LegendLabelsKey(_))
        ));
    }

    #[test]
    fn test_policy_chart_with_legend() {
        let legend = json!(["Not Allowed", "Allowed", "Not Mentioned"]);
        let options = PolicyChartOptions {
            title: "Data Use",
            xlabel: "Use",
            legend_labels: Some(&legend),
            legend_title: "Response Type",
            category_labels: None,
        };
        let spec =
            create_policy_analysis_chart(&parsed(), &columns(), &options, &LabelConfig::default()).unwrap();

        let values = spec["data"]["values"].as_array().unwrap();
        // code 7 and the missing value are left out
        assert_eq!(values.len(), 4);
        assert_eq!(values[0]["display_category"], "Marketing");
        assert_eq!(values[0]["response_label"], "Allowed");
        assert_eq!(values[2]["display_category"], "Data Resale");

        assert_eq!(spec["mark"], "bar");
        assert_eq!(spec["encoding"]["x"]["stack"], "normalize");
        assert_eq!(spec["encoding"]["y"]["sort"], json!(["Marketing", "Data Resale"]));
        assert_eq!(spec["encoding"]["color"]["sort"], legend);
    }

    #[test]
    fn test_policy_chart_without_legend_uses_raw_codes() {
        let mut overrides = BTreeMap::new();
        overrides.insert("marketing".to_string(), "Ads & Marketing".to_string());
        let options = PolicyChartOptions {
            title: "t",
            category_labels: Some(&overrides),
            ..Default::default()
        };
        let spec =
            create_policy_analysis_chart(&parsed(), &columns(), &options, &LabelConfig::default()).unwrap();

        let values = spec["data"]["values"].as_array().unwrap();
        assert_eq!(values.len(), 5);
        assert_eq!(values[0]["display_category"], "Ads & Marketing");
        assert_eq!(values[2]["response_label"], "7");
        assert!(spec["encoding"]["color"]["sort"].is_null());
    }

    #[test]
    fn test_policy_chart_bad_legend_propagates() {
        let legend = json!(42);
        let options = PolicyChartOptions {
            legend_labels: Some(&legend),
            ..Default::default()
        };
        let result = create_policy_analysis_chart(&parsed(), &columns(), &options, &LabelConfig::default());
        assert!(matches!(result, Err(ConfigError::LegendLabelsType(_))));
    }

    #[test]
    fn test_dumbbell_chart_layers() {
        let points = vec![
            GapPoint::new("Marketing", "Consumers", 40.0),
            GapPoint::new("Marketing", "Data Brokers (Explicit)", 95.5),
        ];
        let spec = create_dumbbell_chart(&points, "Gap", "Percentage (%)", "Use Case");

        assert_eq!(spec["layer"].as_array().unwrap().len(), 2);
        assert_eq!(spec["data"]["values"][1]["Percentage"], 95.5);
        assert_eq!(spec["encoding"]["y"]["title"], "Use Case");
        assert_eq!(spec["layer"][1]["encoding"]["color"]["field"], "Source");
    }

    #[test]
    fn test_save_chart() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("charts").join("gap.json");
        let spec = create_dumbbell_chart(&[], "Gap", "x", "y");

        save_chart(&spec, &path).unwrap();
        let written: Value = serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(written["title"], "Gap");
    }
}
