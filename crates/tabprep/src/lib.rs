//! Tabular Data Preparation Library
//!
//! Profiling, quality scoring and deterministic cleaning for rectangular
//! datasets of heterogeneous cells.
//!
//! # Overview
//!
//! - **Value Coercion**: raw JSON or CSV values become typed [`Cell`]s
//!   (numbers, booleans, text, UTC timestamps, missing)
//! - **Profiling**: semantic type inference and per-column statistics
//! - **Quality Report**: completeness, uniqueness, validity and consistency
//!   scores with a recommended action per column
//! - **Cleaning Pipeline**: imputation, outlier clipping, normalization,
//!   smoothing and time interpolation driven by a serializable [`Plan`]
//! - **Progress Reporting**: one update per stage phase
//!
//! # Quick Start
//!
//! ```rust,ignore
//! use tabprep::{apply, read_dataset, report, ImportOptions, Plan, ReportOptions};
//!
//! let dataset = read_dataset("data.csv", &ImportOptions::default())?;
//!
//! let quality = report(&dataset, &ReportOptions::default())?;
//! println!("completeness: {:.1}", quality.scores.completeness);
//!
//! let plan = Plan::from_file("plan.json")?;
//! let outcome = apply(&dataset, &plan)?;
//! for diagnostic in &outcome.diagnostics {
//!     eprintln!("{}", diagnostic);
//! }
//! ```
//!
//! # Plans
//!
//! Plans are JSON documents:
//!
//! ```json
//! {
//!   "version": 1,
//!   "stages": [
//!     { "kind": "ImputeMissing", "method": "median" },
//!     { "kind": "ClipOutliers", "method": "iqr", "threshold": 1.5, "target": ["price"] },
//!     { "kind": "Normalize", "method": "zscore" }
//!   ]
//! }
//! ```
//!
//! A plan can also be seeded from a report with
//! [`decisions::RecommendationEngine`].
//!
//! # Progress Reporting
//!
//! ```rust,ignore
//! use tabprep::Pipeline;
//!
//! let outcome = Pipeline::builder()
//!     .plan(plan)
//!     .on_progress(|update| {
//!         println!("[{:.0}%] {} {}", update.progress * 100.0, update.stage, update.phase);
//!     })
//!     .build()?
//!     .run(&dataset)?;
//! ```

pub mod config;
pub mod dataset;
pub mod decisions;
pub mod error;
pub mod imputers;
pub mod io;
pub mod pipeline;
pub mod profiler;
pub mod quality;
pub mod types;
pub mod utils;
pub mod value;

// Re-exports for convenient access
pub use config::{
    ConfigValidationError, Encoding, ImportOptions, ImportOptionsBuilder, ProfileOptions, ProfileOptionsBuilder,
    ReportOptions, ReportOptionsBuilder,
};
pub use dataset::{Column, Dataset};
pub use decisions::{DecisionEngine, RecommendationEngine};
pub use error::{Diagnostic, DiagnosticKind, PrepError, Result as PrepResult, ResultExt};
pub use imputers::{CarryDirection, FillImputer, StatisticalImputer};
pub use io::{read_dataset, write_dataset, FileFormat, JsonShape};
pub use pipeline::{
    apply, ApplyOutcome, ClipMethod, ClosureProgressReporter, ImputeMethod, NormalizeMethod, Pipeline,
    PipelineBuilder, Plan, ProgressReporter, ProgressUpdate, Stage, StageKind, StagePhase, Target,
};
pub use profiler::{profile, DataProfiler};
pub use quality::{report, DataQualityAnalyzer};
pub use types::{
    ColumnProfile, IssueType, QualityIssue, QualityReport, QualityScores, RecommendedAction, SemanticType,
    Severity, ValueCount,
};
pub use value::{classify, classify_with, to_number, to_timestamp, Cell, CoercionOptions, DateFormat, DecimalSeparator};
