//! Quality report assembly and output.

use super::analyzer::DataQualityAnalyzer;
use crate::config::ReportOptions;
use crate::dataset::Dataset;
use crate::error::{PrepError, Result, ResultExt};
use crate::profiler::DataProfiler;
use crate::types::QualityReport;
use indexmap::IndexMap;
use std::fs;
use std::path::Path;
use tracing::info;

/// Build the quality report for a dataset.
///
/// Fails with a schema error when the dataset is inconsistent or the
/// configured time column does not exist.
pub fn report(dataset: &Dataset, options: &ReportOptions) -> Result<QualityReport> {
    options.validate()?;
    dataset.check_consistency()?;

    if let Some(time_column) = &options.time_column {
        if dataset.column(time_column).is_none() {
            return Err(PrepError::schema(
                Some(time_column),
                format!("time column '{}' not found", time_column),
            ));
        }
    }

    info!(
        "Building quality report for {} rows x {} columns",
        dataset.n_rows(),
        dataset.n_columns()
    );

    let profiles = DataProfiler::profile_dataset(dataset, &options.profile);
    let valid_counts: Vec<usize> = dataset
        .columns()
        .iter()
        .zip(&profiles)
        .map(|(column, profile)| DataQualityAnalyzer::valid_count(column, profile))
        .collect();
    let duplicate_count = DataQualityAnalyzer::count_duplicates(dataset, options.trim_text);

    let scores = DataQualityAnalyzer::scores(dataset, &profiles, &valid_counts, duplicate_count);
    let has_time_column = options.time_column.is_some();
    let recommendations: IndexMap<String, _> = profiles
        .iter()
        .map(|p| (p.name.clone(), DataQualityAnalyzer::recommend(p, has_time_column)))
        .collect();
    let issues = DataQualityAnalyzer::identify_issues(&profiles, &valid_counts, duplicate_count, dataset.n_rows());

    info!(
        "Quality scores: completeness {:.1}, uniqueness {:.1}, validity {:.1}, consistency {:.1} ({} issues)",
        scores.completeness,
        scores.uniqueness,
        scores.validity,
        scores.consistency,
        issues.len()
    );

    Ok(QualityReport {
        row_count: dataset.n_rows(),
        column_count: dataset.n_columns(),
        duplicate_count,
        scores,
        columns: profiles,
        recommendations,
        issues,
    })
}

impl QualityReport {
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Write the report as pretty-printed JSON.
    pub fn write_json(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        fs::write(path, self.to_json()?)
            .map_err(PrepError::from)
            .context(format!("Failed to write report to {}", path.display()))
    }
}
