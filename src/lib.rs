// Broker Privacy - Core Library
// Registry cleaning, entity merging, policy-response analysis, gap charts

pub mod config;
pub mod error;
pub mod table;
pub mod normalize;
pub mod cleaner;
pub mod merge;
pub mod pipeline;
pub mod policies;
pub mod responses;
pub mod summary;
pub mod report;
pub mod gap;
pub mod chart;

// Re-export commonly used types
pub use config::{
    AnalysisConfig, GapCategory, GapConfig, GapDimension, LabelConfig, QuestionSpec, ResponseScale,
};
pub use error::{ConfigError, PipelineError};
pub use table::Table;
pub use normalize::{clean_name, clean_policy_url, normalize_name, title_case};
pub use cleaner::{initial_clean_and_one_hot, BrokerRecord, BrokerSchema, BrokerTable};
pub use merge::{merge_by_normalized_name, MergedEntity, MergedTable};
pub use pipeline::{clean_data, clean_table, load_or_report, DEFAULT_CLEANED_PATH, DEFAULT_REGISTRY_PATH};
pub use policies::{prepare_privacy_policy_dataset, write_policy_datasets, PolicyDatasets, PolicyRecord};
pub use responses::{
    analyze_data_use_practices, analyze_question, analyze_sharing_entities, analyze_user_controls,
    parse_llm_responses, CategoryStats, CategoryTally, ParsedResponses, ParsedRow, QuestionAnalysis,
};
pub use summary::{build_response_summary, prepare_privacy_policy_summary, PolicySummary, SummaryRow};
pub use report::generate_analysis_report;
pub use gap::{
    create_gap_chart_data_types, create_gap_chart_use_cases, explicit_use_case_percentages,
    fallback_broker_percentages, GapPoint,
};
pub use chart::{
    create_dumbbell_chart, create_policy_analysis_chart, save_chart, LegendLabels, PolicyChartOptions,
};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
