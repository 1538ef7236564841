//! CLI entry point for tabprep.

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};
use std::fs;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tabprep::decisions::{DecisionEngine, RecommendationEngine};
use tabprep::{
    read_dataset, report, write_dataset, Dataset, DateFormat, Diagnostic, Encoding, ImportOptions,
    Pipeline, Plan, PrepError, ProfileOptions, QualityReport, ReportOptions,
};
use thiserror::Error;
use tracing::{debug, error, info, warn};

/// CLI-compatible encoding enum
#[derive(Debug, Clone, Copy, ValueEnum)]
enum CliEncoding {
    /// Strict UTF-8
    Utf8,
    /// Replace invalid UTF-8 sequences
    Utf8Lossy,
}

impl From<CliEncoding> for Encoding {
    fn from(cli: CliEncoding) -> Self {
        match cli {
            CliEncoding::Utf8 => Encoding::Utf8,
            CliEncoding::Utf8Lossy => Encoding::LossyUtf8,
        }
    }
}

#[derive(Parser, Debug)]
#[command(
    name = "tabprep",
    version,
    about = "Tabular data quality profiling and cleaning",
    long_about = "Profile a tabular dataset, score its quality and apply a cleaning plan.\n\n\
                  EXIT CODES:\n  \
                  0  success\n  \
                  1  I/O or other failure\n  \
                  2  invalid plan or schema mismatch\n  \
                  3  input could not be parsed\n  \
                  4  a stage failed\n\n\
                  EXAMPLES:\n  \
                  # Quality report for a CSV file\n  \
                  tabprep profile data.csv -o report.json\n\n  \
                  # Seed a plan from the report's recommendations\n  \
                  tabprep profile data.csv --suggest-plan plan.json\n\n  \
                  # Apply a plan\n  \
                  tabprep apply data.csv plan.json -o clean.csv --diagnostics diagnostics.json"
)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long, default_value = "info", global = true)]
    log_level: String,

    /// Only show warnings and errors
    #[arg(short, long, global = true)]
    quiet: bool,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Build a quality report for a dataset
    Profile {
        /// CSV or JSON dataset
        input: PathBuf,

        /// Write the report here instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// IQR fence multiplier for outlier detection
        #[arg(long, default_value_t = 1.5)]
        fence: f64,

        /// Number of most frequent values kept per categorical column
        #[arg(long, default_value_t = 5)]
        top_k: usize,

        /// Column holding the time axis, enables carry-last recommendations
        #[arg(long)]
        time_column: Option<String>,

        /// Compare text exactly when counting duplicate rows
        #[arg(long)]
        strict_duplicates: bool,

        /// Seed for sampling large columns
        #[arg(long, default_value_t = 42)]
        seed: u64,

        /// Write a plan built from the report's recommendations
        #[arg(long)]
        suggest_plan: Option<PathBuf>,

        #[command(flatten)]
        import: ImportArgs,
    },

    /// Apply a cleaning plan to a dataset
    Apply {
        /// CSV or JSON dataset
        input: PathBuf,

        /// JSON plan document
        plan: PathBuf,

        /// Write the cleaned dataset here (format from the extension) instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Write warnings and errors as a JSON array
        #[arg(long)]
        diagnostics: Option<PathBuf>,

        #[command(flatten)]
        import: ImportArgs,
    },

    /// Check a plan, and optionally its column references against a dataset
    Validate {
        /// JSON plan document
        plan: PathBuf,

        /// Dataset to check column references against
        #[arg(long)]
        input: Option<PathBuf>,

        #[command(flatten)]
        import: ImportArgs,
    },
}

#[derive(Args, Debug)]
struct ImportArgs {
    /// Field delimiter for CSV input
    #[arg(long, default_value_t = ',')]
    delimiter: char,

    /// Text encoding of the input
    #[arg(long, value_enum, default_value = "utf8")]
    encoding: CliEncoding,

    /// Numbers use ',' as the decimal separator
    #[arg(long)]
    decimal_comma: bool,

    /// Date pattern (e.g. YYYY-MM-DD, DD/MM/YYYY) or auto
    #[arg(long, default_value = "auto", value_parser = parse_date_format)]
    date_format: DateFormat,

    /// Keep rows whose cells are all empty
    #[arg(long)]
    keep_empty_rows: bool,

    /// Keep leading and trailing whitespace in text cells
    #[arg(long)]
    no_trim: bool,

    /// The first CSV row is data, not column names
    #[arg(long)]
    no_header: bool,

    /// Read at most this many rows
    #[arg(long)]
    max_rows: Option<usize>,

    /// Only keep these columns (comma separated)
    #[arg(long, value_delimiter = ',')]
    columns: Option<Vec<String>>,
}

impl ImportArgs {
    fn options(&self) -> Result<ImportOptions> {
        let mut builder = ImportOptions::builder()
            .delimiter(self.delimiter)
            .encoding(self.encoding.into())
            .date_format(self.date_format)
            .skip_empty_rows(!self.keep_empty_rows)
            .trim_whitespace(!self.no_trim)
            .has_header(!self.no_header);
        if self.decimal_comma {
            builder = builder.decimal_comma();
        }
        if let Some(max_rows) = self.max_rows {
            builder = builder.max_rows(max_rows);
        }
        if let Some(columns) = &self.columns {
            builder = builder.select_columns(columns);
        }
        Ok(builder.build().map_err(PrepError::from)?)
    }
}

fn parse_date_format(name: &str) -> std::result::Result<DateFormat, String> {
    std::iter::once(DateFormat::Auto)
        .chain(DateFormat::PATTERNS)
        .find(|format| format.as_str().eq_ignore_ascii_case(name))
        .ok_or_else(|| format!("unknown date format '{}'", name))
}

/// A stage failed while applying a plan.
#[derive(Debug, Error)]
#[error("{0}")]
struct StageFailed(Diagnostic);

/// Initialize the tracing subscriber for logging. Logs go to stderr so
/// stdout only carries reports and datasets.
fn init_logging(level: &str, quiet: bool) {
    use tracing_subscriber::EnvFilter;

    let effective_level = if quiet { "warn" } else { level };

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(effective_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(&cli.log_level, cli.quiet);

    match run(cli.command) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{:#}", e);
            ExitCode::from(exit_code(&e))
        }
    }
}

/// Map an error onto the documented exit codes.
fn exit_code(error: &anyhow::Error) -> u8 {
    if error.chain().any(|cause| cause.is::<StageFailed>()) {
        return 4;
    }
    let Some(prep) = error.chain().find_map(|cause| cause.downcast_ref::<PrepError>()) else {
        return 1;
    };
    match prep.error_code() {
        "SCHEMA_ERROR" | "PLAN_ERROR" => 2,
        "INPUT_ERROR" => 3,
        "STAGE_ERROR" => 4,
        _ => 1,
    }
}

fn run(command: Command) -> Result<()> {
    match command {
        Command::Profile {
            input,
            output,
            fence,
            top_k,
            time_column,
            strict_duplicates,
            seed,
            suggest_plan,
            import,
        } => {
            let profile = ProfileOptions::builder()
                .fence_multiplier(fence)
                .top_k(top_k)
                .seed(seed)
                .build()
                .map_err(PrepError::from)?;
            let mut builder = ReportOptions::builder()
                .profile(profile)
                .trim_text(!strict_duplicates);
            if let Some(column) = time_column {
                builder = builder.time_column(column);
            }
            let options = builder.build().map_err(PrepError::from)?;

            let dataset = load(&input, &import)?;
            let quality = report(&dataset, &options)?;
            match output {
                Some(path) => {
                    quality.write_json(&path)?;
                    info!("Report written to: {}", path.display());
                    print_summary(&quality);
                }
                None => println!("{}", quality.to_json()?),
            }

            if let Some(path) = suggest_plan {
                let plan = RecommendationEngine::new().suggest_plan(&quality);
                plan.write_json(&path)?;
                info!("Suggested plan ({} stages) written to: {}", plan.len(), path.display());
            }
            Ok(())
        }

        Command::Apply {
            input,
            plan,
            output,
            diagnostics,
            import,
        } => {
            let plan = Plan::from_file(&plan)?;
            let dataset = load(&input, &import)?;

            let pipeline = Pipeline::builder()
                .plan(plan)
                .on_progress(|update| {
                    debug!(
                        "[{:.0}%] stage {}/{} {}: {}",
                        update.progress * 100.0,
                        update.stage_index + 1,
                        update.total_stages,
                        update.stage.display_name(),
                        update.phase
                    );
                })
                .build()?;
            let outcome = pipeline.run(&dataset)?;

            for warning in outcome.warnings() {
                warn!("{}", warning);
            }
            if let Some(path) = diagnostics {
                fs::write(&path, serde_json::to_string_pretty(&outcome.diagnostics)?)
                    .with_context(|| format!("Failed to write diagnostics to {}", path.display()))?;
                info!("Diagnostics written to: {}", path.display());
            }
            if let Some(failure) = outcome.stage_error() {
                return Err(StageFailed(failure.clone()).into());
            }

            save(&outcome.dataset, output.as_deref())
        }

        Command::Validate { plan, input, import } => {
            let checked = check_plan(&plan, input.as_deref(), &import);
            println!("{}", validation_report(&checked));
            checked.map(|_| ())
        }
    }
}

/// Load a plan and, when an input is given, check it against that dataset.
/// Returns the number of stages.
fn check_plan(plan: &Path, input: Option<&Path>, import: &ImportArgs) -> Result<usize> {
    let plan = Plan::from_file(plan)?;
    if let Some(input) = input {
        let dataset = load(input, import)?;
        plan.validate_against(&dataset)?;
        info!("Plan is valid for {} ({} stages)", input.display(), plan.len());
    } else {
        info!("Plan is valid ({} stages)", plan.len());
    }
    Ok(plan.len())
}

/// `{"valid": true, "stages": n}`, or `{"valid": false, "error": {...}}` with
/// the structured library error when there is one.
fn validation_report(checked: &Result<usize>) -> serde_json::Value {
    match checked {
        Ok(stages) => serde_json::json!({ "valid": true, "stages": stages }),
        Err(e) => {
            let error = e
                .chain()
                .find_map(|cause| cause.downcast_ref::<PrepError>())
                .and_then(|prep| serde_json::to_value(prep).ok())
                .unwrap_or_else(|| serde_json::json!({ "code": "ERROR", "message": format!("{:#}", e) }));
            serde_json::json!({ "valid": false, "error": error })
        }
    }
}

fn load(path: &Path, import: &ImportArgs) -> Result<Dataset> {
    let options = import.options()?;
    info!("Loading dataset from: {}", path.display());
    Ok(read_dataset(path, &options)?)
}

fn save(dataset: &Dataset, output: Option<&Path>) -> Result<()> {
    match output {
        Some(path) => {
            write_dataset(dataset, path)?;
            info!("Dataset written to: {}", path.display());
        }
        None => println!("{}", tabprep::io::write_json_string(dataset, tabprep::JsonShape::Records)?),
    }
    Ok(())
}

/// Print a short human-readable summary of a report.
///
/// Uses `println!` on purpose: the summary is the command's output, not a log.
fn print_summary(quality: &QualityReport) {
    println!("\n{}", "=".repeat(70));
    println!("QUALITY REPORT");
    println!("{}", "=".repeat(70));
    println!("  Rows: {}  Columns: {}  Duplicates: {}", quality.row_count, quality.column_count, quality.duplicate_count);
    println!(
        "  Completeness {:.1}  Uniqueness {:.1}  Validity {:.1}  Consistency {:.1}",
        quality.scores.completeness, quality.scores.uniqueness, quality.scores.validity, quality.scores.consistency
    );
    println!();
    println!("{:<24} {:<12} {:<10} {:<16}", "Column", "Type", "Missing %", "Recommendation");
    println!("{}", "-".repeat(70));
    for profile in &quality.columns {
        let action = quality
            .recommendation(&profile.name)
            .map(|a| a.display_name())
            .unwrap_or("-");
        println!(
            "{:<24} {:<12} {:<10.1} {:<16}",
            truncate_str(&profile.name, 23),
            profile.semantic_type.as_str(),
            profile.missing_percentage,
            action
        );
    }
    let errors = quality
        .issues
        .iter()
        .filter(|issue| issue.severity == tabprep::Severity::High)
        .count();
    if errors > 0 {
        println!("\n  {} high-severity issues", errors);
    }
    println!("{}", "=".repeat(70));
}

/// Truncate a string to max length with ellipsis
fn truncate_str(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max_len - 3).collect();
        format!("{}...", kept)
    }
}
