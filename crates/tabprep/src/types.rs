use crate::value::{Cell, DateFormat};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Semantic type inferred for a column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SemanticType {
    Numeric,
    Temporal,
    Categorical,
    Mixed,
}

impl SemanticType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Numeric => "numeric",
            Self::Temporal => "temporal",
            Self::Categorical => "categorical",
            Self::Mixed => "mixed",
        }
    }

    /// Numeric and temporal columns carry descriptive statistics.
    pub fn has_statistics(&self) -> bool {
        matches!(self, Self::Numeric | Self::Temporal)
    }
}

impl fmt::Display for SemanticType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One entry of a column's most frequent values.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValueCount {
    pub value: Cell,
    pub count: usize,
}

/// Descriptive profile of a single column.
///
/// Statistics that do not apply to the column's type are `None` and
/// serialize as `null`. Temporal statistics are in epoch seconds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnProfile {
    pub name: String,
    pub semantic_type: SemanticType,

    /// Non-missing cells.
    pub count: usize,
    pub missing_count: usize,
    /// Distinct non-missing values.
    pub unique_count: usize,
    pub missing_percentage: f64,

    pub min: Option<f64>,
    pub max: Option<f64>,
    pub mean: Option<f64>,
    pub median: Option<f64>,
    pub std: Option<f64>,
    pub q1: Option<f64>,
    pub q3: Option<f64>,
    pub iqr: Option<f64>,
    pub skewness: Option<f64>,
    pub kurtosis: Option<f64>,
    pub outlier_count: Option<usize>,
    pub outlier_percentage: Option<f64>,
    /// Number of values the statistics were computed over.
    pub value_count: Option<usize>,

    pub top_values: Option<Vec<ValueCount>>,

    /// Date pattern recorded for temporal columns.
    pub date_format: Option<DateFormat>,
    /// Share of sampled values that parsed as numbers.
    pub numeric_ratio: f64,
    /// Share of sampled values that parsed as timestamps.
    pub temporal_ratio: f64,
}

impl ColumnProfile {
    /// Profile of a column with only counts filled in.
    pub fn empty(name: impl Into<String>, semantic_type: SemanticType, n_rows: usize) -> Self {
        Self {
            name: name.into(),
            semantic_type,
            count: 0,
            missing_count: n_rows,
            unique_count: 0,
            missing_percentage: if n_rows == 0 { 0.0 } else { 100.0 },
            min: None,
            max: None,
            mean: None,
            median: None,
            std: None,
            q1: None,
            q3: None,
            iqr: None,
            skewness: None,
            kurtosis: None,
            outlier_count: None,
            outlier_percentage: None,
            value_count: None,
            top_values: None,
            date_format: None,
            numeric_ratio: 0.0,
            temporal_ratio: 0.0,
        }
    }

    pub fn is_numeric(&self) -> bool {
        self.semantic_type == SemanticType::Numeric
    }

    pub fn has_missing(&self) -> bool {
        self.missing_count > 0
    }
}

/// Dataset-level quality scores, each in `[0, 100]`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct QualityScores {
    pub completeness: f64,
    pub uniqueness: f64,
    pub validity: f64,
    pub consistency: f64,
}

impl QualityScores {
    /// Unweighted mean of the four scores.
    pub fn overall(&self) -> f64 {
        (self.completeness + self.uniqueness + self.validity + self.consistency) / 4.0
    }
}

/// Remediation recommended for a column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RecommendedAction {
    DropRow,
    ImputeMedian,
    ImputeMean,
    CarryLast,
    None,
}

impl RecommendedAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::DropRow => "drop-row",
            Self::ImputeMedian => "impute-median",
            Self::ImputeMean => "impute-mean",
            Self::CarryLast => "carry-last",
            Self::None => "none",
        }
    }

    /// Get a human-readable display name for the action.
    pub fn display_name(&self) -> &'static str {
        match self {
            Self::DropRow => "Drop Rows",
            Self::ImputeMedian => "Impute Median",
            Self::ImputeMean => "Impute Mean",
            Self::CarryLast => "Carry Last Value",
            Self::None => "No Action",
        }
    }
}

impl fmt::Display for RecommendedAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Category of a detected quality issue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IssueType {
    MissingValues,
    Outliers,
    SkewedDistribution,
    MixedTypes,
    InvalidValues,
    DuplicateRows,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Low,
    Medium,
    High,
}

/// A quality problem found while building a report.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QualityIssue {
    pub issue_type: IssueType,
    pub severity: Severity,
    /// `None` for dataset-level issues.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub column: Option<String>,
    pub description: String,
    /// Number of affected cells or rows.
    pub affected: usize,
}

/// Quality report for a whole dataset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QualityReport {
    pub row_count: usize,
    pub column_count: usize,
    pub duplicate_count: usize,
    pub scores: QualityScores,
    /// Profiles in column order.
    pub columns: Vec<ColumnProfile>,
    /// Recommended action per column, in column order.
    pub recommendations: IndexMap<String, RecommendedAction>,
    pub issues: Vec<QualityIssue>,
}

impl QualityReport {
    pub fn profile(&self, column: &str) -> Option<&ColumnProfile> {
        self.columns.iter().find(|p| p.name == column)
    }

    pub fn recommendation(&self, column: &str) -> Option<RecommendedAction> {
        self.recommendations.get(column).copied()
    }

    pub fn issues_for<'a>(&'a self, column: &'a str) -> impl Iterator<Item = &'a QualityIssue> + 'a {
        self.issues
            .iter()
            .filter(move |issue| issue.column.as_deref() == Some(column))
    }
}
