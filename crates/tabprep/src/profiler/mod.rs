//! Column profiling.
//!
//! This module provides:
//! - Semantic type inference over a seeded sample of each column
//! - Descriptive statistics for numeric and temporal columns
//! - IQR outlier counts
//! - Most frequent values for categorical and mixed columns

pub mod statistics;
mod type_inference;

use crate::config::ProfileOptions;
use crate::dataset::{Column, Dataset};
use crate::types::{ColumnProfile, SemanticType, ValueCount};
use crate::utils::{percentage, sample_values, top_values, value_counts};
use crate::value::{temporal, DateFormat};
use statistics::NumericSummary;
use tracing::debug;

pub use statistics::OutlierBounds;
pub use type_inference::{MIXED_THRESHOLD, NUMERIC_THRESHOLD, TEMPORAL_THRESHOLD};

pub(crate) use type_inference::infer_semantic_type;

/// Column profiler.
pub struct DataProfiler;

impl DataProfiler {
    /// Profile every column of a dataset, in column order.
    pub fn profile_dataset(dataset: &Dataset, options: &ProfileOptions) -> Vec<ColumnProfile> {
        dataset
            .columns()
            .iter()
            .map(|column| Self::profile_column(column, options))
            .collect()
    }

    /// Profile a single column.
    pub fn profile_column(column: &Column, options: &ProfileOptions) -> ColumnProfile {
        let n = column.len();
        let missing_count = column.missing_count();
        let (semantic_type, evidence) =
            infer_semantic_type(column, options.inference_sample, options.seed);

        let mut profile = ColumnProfile::empty(column.name(), semantic_type, n);
        profile.count = n - missing_count;
        profile.missing_count = missing_count;
        profile.missing_percentage = percentage(missing_count, n);
        profile.unique_count = value_counts(column.cells()).len();
        profile.numeric_ratio = evidence.numeric_ratio;
        profile.temporal_ratio = evidence.temporal_ratio;
        profile.date_format = evidence.date_format;

        match semantic_type {
            SemanticType::Numeric | SemanticType::Temporal => {
                let values = Self::statistic_values(column, semantic_type, evidence.date_format);
                let values = match options.sample_size {
                    Some(size) => sample_values(&values, size, options.seed),
                    None => values,
                };
                Self::fill_statistics(&mut profile, &values, options.fence_multiplier);
            }
            SemanticType::Categorical | SemanticType::Mixed => {
                let top = top_values(column.cells(), options.top_k)
                    .into_iter()
                    .map(|(cell, count)| ValueCount {
                        value: cell.clone(),
                        count,
                    })
                    .collect();
                profile.top_values = Some(top);
            }
        }

        debug!(
            "Profiled column '{}': {} ({} missing, {} unique)",
            profile.name, profile.semantic_type, profile.missing_count, profile.unique_count
        );
        profile
    }

    /// Infer the semantic type of a column.
    pub fn infer_type(column: &Column, options: &ProfileOptions) -> SemanticType {
        infer_semantic_type(column, options.inference_sample, options.seed).0
    }

    /// Numeric readings of a column's cells, missing and non-numeric skipped.
    pub fn numeric_values(column: &Column) -> Vec<f64> {
        column.cells().iter().filter_map(|c| c.as_numeric()).collect()
    }

    /// Epoch seconds of a column's timestamps.
    pub fn temporal_values(column: &Column, format: DateFormat) -> Vec<f64> {
        column
            .cells()
            .iter()
            .filter_map(|c| c.to_timestamp(format))
            .map(|ts| temporal::to_epoch_seconds(&ts))
            .collect()
    }

    fn statistic_values(column: &Column, semantic_type: SemanticType, format: Option<DateFormat>) -> Vec<f64> {
        match semantic_type {
            SemanticType::Temporal => Self::temporal_values(column, format.unwrap_or_default()),
            _ => Self::numeric_values(column),
        }
    }

    fn fill_statistics(profile: &mut ColumnProfile, values: &[f64], fence_multiplier: f64) {
        let Some(summary) = NumericSummary::from_values(values) else {
            return;
        };
        let outliers = summary.fences(fence_multiplier).count_outside(values);

        profile.min = Some(summary.min);
        profile.max = Some(summary.max);
        profile.mean = Some(summary.mean);
        profile.median = Some(summary.median);
        profile.std = Some(summary.std);
        profile.q1 = Some(summary.q1);
        profile.q3 = Some(summary.q3);
        profile.iqr = Some(summary.iqr);
        profile.skewness = Some(summary.skewness);
        profile.kurtosis = Some(summary.kurtosis);
        profile.outlier_count = Some(outliers);
        profile.outlier_percentage = Some(percentage(outliers, values.len()));
        profile.value_count = Some(values.len());
    }
}

/// Profile a single column.
pub fn profile(column: &Column, options: &ProfileOptions) -> ColumnProfile {
    DataProfiler::profile_column(column, options)
}
