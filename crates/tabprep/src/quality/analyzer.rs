use crate::dataset::{Column, Dataset};
use crate::types::{ColumnProfile, IssueType, QualityIssue, QualityScores, RecommendedAction, SemanticType, Severity};
use crate::utils::{percentage, score};
use crate::value::{Cell, CellKey};
use std::collections::HashSet;

pub struct DataQualityAnalyzer;

impl DataQualityAnalyzer {
    /// Number of records equal to an earlier record.
    pub fn count_duplicates(dataset: &Dataset, trim_text: bool) -> usize {
        let mut seen: HashSet<Vec<CellKey>> = HashSet::with_capacity(dataset.n_rows());
        for row in 0..dataset.n_rows() {
            let key = dataset
                .columns()
                .iter()
                .map(|column| column.cells()[row].key(trim_text))
                .collect();
            seen.insert(key);
        }
        dataset.n_rows() - seen.len()
    }

    /// Whether a cell reads as a value of the column's semantic type.
    /// Missing cells are never valid.
    pub fn is_valid(cell: &Cell, profile: &ColumnProfile) -> bool {
        match profile.semantic_type {
            _ if cell.is_missing() => false,
            SemanticType::Numeric => cell.as_numeric().is_some(),
            SemanticType::Temporal => cell.to_timestamp(profile.date_format.unwrap_or_default()).is_some(),
            SemanticType::Categorical | SemanticType::Mixed => true,
        }
    }

    pub fn valid_count(column: &Column, profile: &ColumnProfile) -> usize {
        column.cells().iter().filter(|c| Self::is_valid(c, profile)).count()
    }

    /// Dataset scores. `valid_counts` holds one entry per column.
    pub fn scores(
        dataset: &Dataset,
        profiles: &[ColumnProfile],
        valid_counts: &[usize],
        duplicate_count: usize,
    ) -> QualityScores {
        let total_cells = dataset.cell_count();
        let present = total_cells - dataset.missing_count();
        let distinct = dataset.n_rows() - duplicate_count;

        let (within, numeric_cells) = profiles
            .iter()
            .filter(|p| p.is_numeric())
            .filter_map(|p| Some((p.value_count?, p.outlier_count?)))
            .fold((0, 0), |(within, total), (values, outliers)| {
                (within + values - outliers, total + values)
            });

        QualityScores {
            completeness: score(present, total_cells),
            uniqueness: score(distinct, dataset.n_rows()),
            validity: score(valid_counts.iter().sum(), total_cells),
            consistency: score(within, numeric_cells),
        }
    }

    /// Recommended action for a column, first matching rule wins.
    pub fn recommend(profile: &ColumnProfile, has_time_column: bool) -> RecommendedAction {
        let heavy_outliers = profile.outlier_percentage.is_some_and(|p| p >= 20.0);
        let skewed = profile.skewness.is_some_and(|s| s.abs() > 1.0);

        if profile.missing_percentage > 50.0 {
            RecommendedAction::DropRow
        } else if heavy_outliers || skewed {
            RecommendedAction::ImputeMedian
        } else if profile.missing_percentage > 0.0 && profile.is_numeric() {
            RecommendedAction::ImputeMean
        } else if profile.semantic_type == SemanticType::Temporal || has_time_column {
            RecommendedAction::CarryLast
        } else {
            RecommendedAction::None
        }
    }

    /// Per-column and dataset-level issues.
    pub fn identify_issues(
        profiles: &[ColumnProfile],
        valid_counts: &[usize],
        duplicate_count: usize,
        n_rows: usize,
    ) -> Vec<QualityIssue> {
        let mut issues = Vec::new();

        for (profile, valid) in profiles.iter().zip(valid_counts) {
            issues.extend(Self::analyze_missing_values(profile));
            issues.extend(Self::analyze_outliers(profile));
            issues.extend(Self::analyze_skew(profile));
            issues.extend(Self::analyze_invalid_values(profile, *valid));
            if profile.semantic_type == SemanticType::Mixed {
                issues.push(QualityIssue {
                    issue_type: IssueType::MixedTypes,
                    severity: Severity::Medium,
                    column: Some(profile.name.clone()),
                    description: format!(
                        "Column '{}' mixes numbers ({:.0}% of sampled values) with text",
                        profile.name,
                        profile.numeric_ratio * 100.0
                    ),
                    affected: profile.count,
                });
            }
        }

        if duplicate_count > 0 {
            let pct = percentage(duplicate_count, n_rows);
            issues.push(QualityIssue {
                issue_type: IssueType::DuplicateRows,
                severity: if pct >= 10.0 { Severity::Medium } else { Severity::Low },
                column: None,
                description: format!("{} duplicate rows ({:.1}%)", duplicate_count, pct),
                affected: duplicate_count,
            });
        }

        issues
    }

    fn analyze_missing_values(profile: &ColumnProfile) -> Option<QualityIssue> {
        if profile.missing_count == 0 {
            return None;
        }
        let pct = profile.missing_percentage;
        let severity = if pct > 50.0 {
            Severity::High
        } else if pct > 20.0 {
            Severity::Medium
        } else {
            Severity::Low
        };
        Some(QualityIssue {
            issue_type: IssueType::MissingValues,
            severity,
            column: Some(profile.name.clone()),
            description: format!(
                "Column '{}' has {} missing values ({:.1}%)",
                profile.name, profile.missing_count, pct
            ),
            affected: profile.missing_count,
        })
    }

    fn analyze_outliers(profile: &ColumnProfile) -> Option<QualityIssue> {
        let count = profile.outlier_count.filter(|c| *c > 0)?;
        let pct = profile.outlier_percentage.unwrap_or(0.0);
        let severity = if pct >= 20.0 {
            Severity::High
        } else if pct >= 5.0 {
            Severity::Medium
        } else {
            Severity::Low
        };
        Some(QualityIssue {
            issue_type: IssueType::Outliers,
            severity,
            column: Some(profile.name.clone()),
            description: format!(
                "Column '{}' has {} values outside the IQR fences ({:.1}%)",
                profile.name, count, pct
            ),
            affected: count,
        })
    }

    fn analyze_skew(profile: &ColumnProfile) -> Option<QualityIssue> {
        if !profile.is_numeric() {
            return None;
        }
        let skewness = profile.skewness.filter(|s| s.abs() > 1.0)?;
        Some(QualityIssue {
            issue_type: IssueType::SkewedDistribution,
            severity: if skewness.abs() > 2.0 { Severity::Medium } else { Severity::Low },
            column: Some(profile.name.clone()),
            description: format!("Column '{}' is skewed (skewness {:.2})", profile.name, skewness),
            affected: profile.value_count.unwrap_or(profile.count),
        })
    }

    fn analyze_invalid_values(profile: &ColumnProfile, valid: usize) -> Option<QualityIssue> {
        if !profile.semantic_type.has_statistics() {
            return None;
        }
        let invalid = profile.count.saturating_sub(valid);
        if invalid == 0 {
            return None;
        }
        let pct = percentage(invalid, profile.count);
        Some(QualityIssue {
            issue_type: IssueType::InvalidValues,
            severity: if pct > 5.0 { Severity::Medium } else { Severity::Low },
            column: Some(profile.name.clone()),
            description: format!(
                "Column '{}' has {} values that are not {}",
                profile.name, invalid, profile.semantic_type
            ),
            affected: invalid,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ProfileOptions;
    use crate::profiler::DataProfiler;

    /// Helper to create a numeric profile for rule tests
    fn numeric_profile(missing_pct: f64, outlier_pct: f64, skewness: f64) -> ColumnProfile {
        let mut profile = ColumnProfile::empty("col", SemanticType::Numeric, 10);
        profile.missing_percentage = missing_pct;
        profile.missing_count = (missing_pct / 10.0) as usize;
        profile.outlier_percentage = Some(outlier_pct);
        profile.skewness = Some(skewness);
        profile
    }

    // ==================== recommend tests ====================

    #[test]
    fn test_recommend_drop_row_first() {
        let profile = numeric_profile(60.0, 30.0, 5.0);
        assert_eq!(DataQualityAnalyzer::recommend(&profile, true), RecommendedAction::DropRow);
    }

    #[test]
    fn test_recommend_median_for_outliers_or_skew() {
        assert_eq!(
            DataQualityAnalyzer::recommend(&numeric_profile(10.0, 20.0, 0.0), false),
            RecommendedAction::ImputeMedian
        );
        assert_eq!(
            DataQualityAnalyzer::recommend(&numeric_profile(0.0, 0.0, -1.5), false),
            RecommendedAction::ImputeMedian
        );
    }

    #[test]
    fn test_recommend_mean_for_missing_numeric() {
        assert_eq!(
            DataQualityAnalyzer::recommend(&numeric_profile(10.0, 0.0, 0.2), false),
            RecommendedAction::ImputeMean
        );
    }

    #[test]
    fn test_recommend_carry_last() {
        let temporal = ColumnProfile::empty("t", SemanticType::Temporal, 0);
        assert_eq!(DataQualityAnalyzer::recommend(&temporal, false), RecommendedAction::CarryLast);

        let categorical = ColumnProfile::empty("c", SemanticType::Categorical, 0);
        assert_eq!(DataQualityAnalyzer::recommend(&categorical, true), RecommendedAction::CarryLast);
        assert_eq!(DataQualityAnalyzer::recommend(&categorical, false), RecommendedAction::None);
    }

    #[test]
    fn test_recommend_none_for_clean_numeric() {
        assert_eq!(
            DataQualityAnalyzer::recommend(&numeric_profile(0.0, 0.0, 0.0), false),
            RecommendedAction::None
        );
    }

    // ==================== duplicates and validity ====================

    #[test]
    fn test_count_duplicates_trim_knob() {
        let dataset = Dataset::new(vec![
            Column::new(
                "name",
                vec![Cell::Text("a".into()), Cell::Text("a ".into()), Cell::Text("b".into())],
            ),
            Column::from_numbers("n", &[Some(1.0), Some(1.0), None]),
        ])
        .unwrap();

        assert_eq!(DataQualityAnalyzer::count_duplicates(&dataset, true), 1);
        assert_eq!(DataQualityAnalyzer::count_duplicates(&dataset, false), 0);
    }

    #[test]
    fn test_missing_rows_are_duplicates_of_each_other() {
        let dataset = Dataset::new(vec![Column::new("a", vec![Cell::Missing, Cell::Missing])]).unwrap();
        assert_eq!(DataQualityAnalyzer::count_duplicates(&dataset, true), 1);
    }

    #[test]
    fn test_validity_counts_missing_as_invalid() {
        let column = Column::new(
            "x",
            vec![Cell::Number(1.0), Cell::Number(2.0), Cell::Number(3.0), Cell::Text("oops".into()), Cell::Missing],
        );
        let profile = DataProfiler::profile_column(&column, &ProfileOptions::default());
        assert_eq!(profile.semantic_type, SemanticType::Mixed);

        let numeric = Column::from_numbers("y", &[Some(1.0), None]);
        let numeric_profile = DataProfiler::profile_column(&numeric, &ProfileOptions::default());
        assert_eq!(DataQualityAnalyzer::valid_count(&numeric, &numeric_profile), 1);
    }

    #[test]
    fn test_identify_issues() {
        let column = Column::from_numbers("x", &[Some(1.0), Some(2.0), Some(3.0), Some(4.0), Some(100.0), None]);
        let profile = DataProfiler::profile_column(&column, &ProfileOptions::default());
        let valid = DataQualityAnalyzer::valid_count(&column, &profile);

        let issues = DataQualityAnalyzer::identify_issues(&[profile], &[valid], 2, 6);
        let kinds: Vec<IssueType> = issues.iter().map(|i| i.issue_type).collect();

        assert!(kinds.contains(&IssueType::MissingValues));
        assert!(kinds.contains(&IssueType::Outliers));
        assert!(kinds.contains(&IssueType::SkewedDistribution));
        assert!(kinds.contains(&IssueType::DuplicateRows));
        assert!(!kinds.contains(&IssueType::InvalidValues));
    }
}
