// Only compile UI module when TUI feature is enabled
#[cfg(feature = "tui")]
mod ui;

use anyhow::{Context, Result};
use broker_privacy::{
    analyze_data_use_practices, analyze_question, analyze_sharing_entities, analyze_user_controls,
    clean_data, create_dumbbell_chart, create_gap_chart_data_types, create_gap_chart_use_cases,
    create_policy_analysis_chart, explicit_use_case_percentages, fallback_broker_percentages,
    generate_analysis_report, load_or_report, prepare_privacy_policy_dataset,
    prepare_privacy_policy_summary, save_chart, write_policy_datasets, AnalysisConfig, GapPoint,
    PolicyChartOptions, Table, DEFAULT_CLEANED_PATH, DEFAULT_REGISTRY_PATH,
};
use clap::{Parser, Subcommand};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

const DEFAULT_POLICIES_DIR: &str = "data/privacy_policies";
const DEFAULT_LLM_PATH: &str = "data/privacy_policies/llm_results.csv";
const DEFAULT_SURVEY_PATH: &str = "data/raw_data/survey/survey_results.csv";
const DEFAULT_OUTPUT_DIR: &str = "outputs";

const DATA_TYPES_TITLE: &str = "Disparity: Data Broker Collection vs. Consumer Comfort (Data Types)";
const USE_CASES_TITLE: &str = "Disparity: Data Broker Collection vs. Consumer Comfort (Use Cases)";

#[derive(Parser, Debug)]
#[command(author, version, about = "Data broker registry cleaning and privacy policy analysis", long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// JSON file overriding labels, questions and gap mappings
    #[arg(short, long, global = true, value_name = "FILE", env = "BROKER_PRIVACY_CONFIG")]
    config: Option<PathBuf>,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Clean the raw registry and merge brokers by normalized name
    Clean {
        #[arg(short, long, default_value = DEFAULT_REGISTRY_PATH)]
        input: PathBuf,

        #[arg(short, long, default_value = DEFAULT_CLEANED_PATH)]
        output: PathBuf,
    },

    /// Build the privacy policy datasets from the cleaned broker list
    Policies {
        #[arg(short, long, default_value = DEFAULT_CLEANED_PATH)]
        input: PathBuf,

        #[arg(short, long, default_value = DEFAULT_POLICIES_DIR)]
        output_dir: PathBuf,
    },

    /// Summarize LLM policy answers: summary JSON, text report, charts
    Analyze {
        #[arg(short, long, default_value = DEFAULT_LLM_PATH)]
        llm: PathBuf,

        #[arg(short, long, default_value = DEFAULT_OUTPUT_DIR)]
        output_dir: PathBuf,
    },

    /// Compare broker practices with consumer survey answers
    Gap {
        #[arg(short, long, default_value = DEFAULT_CLEANED_PATH)]
        brokers: PathBuf,

        #[arg(short, long, default_value = DEFAULT_SURVEY_PATH)]
        survey: PathBuf,

        /// LLM results for explicit use-case percentages (configured values otherwise)
        #[arg(short, long)]
        llm: Option<PathBuf>,

        #[arg(short, long, default_value = DEFAULT_OUTPUT_DIR)]
        output_dir: PathBuf,
    },

    /// Browse merged brokers, policy summary and gap charts in the terminal
    Ui {
        #[arg(short, long, default_value = DEFAULT_REGISTRY_PATH)]
        input: PathBuf,

        #[arg(short, long)]
        llm: Option<PathBuf>,

        #[arg(short, long)]
        survey: Option<PathBuf>,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let config = load_config(cli.config.as_deref())?;

    match cli.command {
        Command::Clean { input, output } => run_clean(&input, &output),
        Command::Policies { input, output_dir } => run_policies(&input, &output_dir),
        Command::Analyze { llm, output_dir } => run_analyze(&llm, &output_dir, &config),
        Command::Gap {
            brokers,
            survey,
            llm,
            output_dir,
        } => run_gap(&brokers, &survey, llm.as_deref(), &output_dir, &config),
        Command::Ui { input, llm, survey } => run_ui_mode(&input, llm.as_deref(), survey.as_deref(), &config),
    }
}

/// RUST_LOG wins over --verbose when set
fn init_logging(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .compact()
        .init();
}

fn load_config(path: Option<&Path>) -> Result<AnalysisConfig> {
    match path {
        Some(path) => {
            let config = AnalysisConfig::from_file(path)?;
            info!("Loaded configuration from {}", path.display());
            Ok(config)
        }
        None => Ok(AnalysisConfig::default()),
    }
}

/// Load an input table; read failures print a diagnostic and yield `None`
fn load_input(path: &Path, what: &str) -> Result<Option<Table>> {
    let table = load_or_report(path)?;
    if table.is_none() {
        eprintln!("❌ Could not read {} at {}", what, path.display());
    }
    Ok(table)
}

// ============================================================================
// SUBCOMMANDS
// ============================================================================

fn run_clean(input: &Path, output: &Path) -> Result<()> {
    println!("🧹 Cleaning registry: {}", input.display());

    let merged = clean_data(input, output)?;
    if !merged.has_schema() {
        println!("⚠️  Registry not read; nothing written");
        return Ok(());
    }
    if merged.is_empty() {
        println!("⚠️  Every row was filtered out; header-only file saved to {}", output.display());
        return Ok(());
    }

    let sources = merged.schema.registry_sources.join(", ");
    println!("✓ {} brokers after merge (sources: {})", merged.len(), sources);
    println!("✅ File saved to {}", output.display());
    Ok(())
}

fn run_policies(input: &Path, output_dir: &Path) -> Result<()> {
    println!("📜 Preparing privacy policy datasets from {}", input.display());

    let Some(brokers) = load_input(input, "cleaned broker list")? else {
        return Ok(());
    };

    let datasets = prepare_privacy_policy_dataset(&brokers)?;
    let (all_path, unique_path) = write_policy_datasets(&datasets, output_dir)?;

    println!("✓ {} brokers with a policy URL", datasets.all.len());
    println!("✓ {} unique policies (shuffled)", datasets.unique_shuffled.len());
    println!("✅ Saved {}", all_path.display());
    println!("✅ Saved {}", unique_path.display());
    Ok(())
}

fn run_analyze(llm_path: &Path, output_dir: &Path, config: &AnalysisConfig) -> Result<()> {
    println!("🔍 Analyzing LLM policy answers: {}", llm_path.display());

    let Some(llm) = load_input(llm_path, "LLM results")? else {
        return Ok(());
    };

    fs::create_dir_all(output_dir)
        .with_context(|| format!("Failed to create output directory: {:?}", output_dir))?;

    // Summary JSON
    let summary = prepare_privacy_policy_summary(&llm, config)?;
    let summary_path = output_dir.join("privacy_policy_summary.json");
    let content = serde_json::to_string_pretty(&summary).context("Failed to serialize summary")?;
    fs::write(&summary_path, content)
        .with_context(|| format!("Failed to write summary: {:?}", summary_path))?;
    println!("✅ Summary saved to {} ({} rows)", summary_path.display(), summary.summary.len());

    // Text report
    let data_use = analyze_data_use_practices(&llm, config)?;
    let entities = analyze_sharing_entities(&llm, config)?;
    let controls = analyze_user_controls(&llm, config)?;
    let report = generate_analysis_report(&data_use.stats, &entities.stats, &controls.stats);
    let report_path = output_dir.join("analysis_report.txt");
    fs::write(&report_path, &report).with_context(|| format!("Failed to write report: {:?}", report_path))?;
    println!("{}", report);
    println!("✅ Report saved to {}", report_path.display());

    // One stacked bar chart per question; bad legend config aborts here
    let charts_dir = output_dir.join("charts");
    for question in &config.questions {
        let analysis = analyze_question(&llm, question)?;
        let spec = create_policy_analysis_chart(
            &analysis.parsed,
            &question.categories,
            &PolicyChartOptions::for_question(question),
            &config.labels,
        )?;
        let chart_path = charts_dir.join(format!("{}_policy_chart.json", question.key.to_lowercase()));
        save_chart(&spec, &chart_path)?;
        println!("✅ Chart saved to {}", chart_path.display());
    }

    Ok(())
}

/// Broker side of the use-case gap: Q1 answers when available
fn use_case_broker_points(llm: Option<&Table>, config: &AnalysisConfig) -> Result<Vec<GapPoint>> {
    match llm {
        Some(llm) => {
            let data_use = analyze_data_use_practices(llm, config)?;
            Ok(explicit_use_case_percentages(&data_use, &config.gap.use_cases))
        }
        None => {
            warn!("No LLM results; using configured broker use-case percentages");
            Ok(fallback_broker_percentages(&config.gap.use_cases))
        }
    }
}

/// Both gap datasets, or `None` when an input cannot be read
fn compute_gaps(
    brokers_path: &Path,
    survey_path: &Path,
    llm_path: Option<&Path>,
    config: &AnalysisConfig,
) -> Result<Option<(Vec<GapPoint>, Vec<GapPoint>)>> {
    let Some(brokers) = load_input(brokers_path, "cleaned broker list")? else {
        return Ok(None);
    };
    let Some(survey) = load_input(survey_path, "survey results")? else {
        return Ok(None);
    };
    let gap = &config.gap;

    let data_types = create_gap_chart_data_types(&brokers, &survey, &gap.data_types, &gap.consumer_label)?;

    let llm = match llm_path {
        Some(path) => load_input(path, "LLM results")?,
        None => None,
    };
    let broker_points = use_case_broker_points(llm.as_ref(), config)?;
    let use_cases = create_gap_chart_use_cases(broker_points, &survey, &gap.use_cases, &gap.consumer_label)?;

    Ok(Some((data_types, use_cases)))
}

fn run_gap(
    brokers_path: &Path,
    survey_path: &Path,
    llm_path: Option<&Path>,
    output_dir: &Path,
    config: &AnalysisConfig,
) -> Result<()> {
    println!("📉 Gap analysis: {} vs. {}", brokers_path.display(), survey_path.display());

    let Some((data_types, use_cases)) = compute_gaps(brokers_path, survey_path, llm_path, config)? else {
        return Ok(());
    };

    let charts_dir = output_dir.join("charts");
    let charts = [
        ("disparity_data_types.json", DATA_TYPES_TITLE, "Data Type", &data_types),
        ("disparity_use_cases.json", USE_CASES_TITLE, "Use Case", &use_cases),
    ];
    for (file, title, y_label, points) in charts {
        for point in points.iter() {
            info!("{:<55} {:<25} {:>6.1}%", point.category, point.source, point.percentage);
        }
        let spec = create_dumbbell_chart(points, title, "Percentage (%)", y_label);
        let path = charts_dir.join(file);
        save_chart(&spec, &path)?;
        println!("✅ Saved {}", path.display());
    }

    Ok(())
}

#[cfg(feature = "tui")]
fn run_ui_mode(input: &Path, llm_path: Option<&Path>, survey_path: Option<&Path>, config: &AnalysisConfig) -> Result<()> {
    use broker_privacy::clean_table;

    println!("🖥️  Loading broker registry...\n");

    let Some(raw) = load_input(input, "broker registry")? else {
        std::process::exit(1);
    };
    let merged = clean_table(&raw)?;
    println!("✓ Loaded {} brokers", merged.len());

    // Cleaned table in memory stands in for the gap step's broker input
    let cleaned = merged.to_table();
    let mut app = ui::App::new(merged);

    let llm = match llm_path {
        Some(path) => load_input(path, "LLM results")?,
        None => None,
    };
    if let Some(llm) = &llm {
        let summary = prepare_privacy_policy_summary(llm, config)?;
        app = app.with_summary(summary.summary, summary.response_order, summary.response_colors);
    }

    if let Some(path) = survey_path {
        if let Some(survey) = load_input(path, "survey results")? {
            let gap = &config.gap;
            let data_types = create_gap_chart_data_types(&cleaned, &survey, &gap.data_types, &gap.consumer_label)?;
            let broker_points = use_case_broker_points(llm.as_ref(), config)?;
            let use_cases =
                create_gap_chart_use_cases(broker_points, &survey, &gap.use_cases, &gap.consumer_label)?;
            app = app.with_gap("Data Types", data_types).with_gap("Use Cases", use_cases);
        }
    }

    println!("Starting UI... (Press 'q' to quit)\n");
    ui::run_ui(&mut app)?;

    println!("\n✅ UI closed successfully");
    Ok(())
}

#[cfg(not(feature = "tui"))]
fn run_ui_mode(_input: &Path, _llm: Option<&Path>, _survey: Option<&Path>, _config: &AnalysisConfig) -> Result<()> {
    eprintln!("❌ TUI mode not available!");
    eprintln!("   Rebuild with: cargo build --features tui");
    std::process::exit(1);
}
