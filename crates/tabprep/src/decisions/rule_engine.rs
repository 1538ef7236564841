//! Recommendation-driven plan seeding.

use super::DecisionEngine;
use crate::pipeline::{ImputeMethod, Plan, Stage, Target};
use crate::types::{QualityReport, RecommendedAction};
use tracing::{debug, info};

/// Maps each column's recommended action onto imputation stages.
///
/// Stages come out in a fixed order: `drop-row`, `median`, `mean`, then
/// `carry-forward` followed by `carry-backward` for carry-last columns.
/// Columns without missing values are not targeted.
#[derive(Debug, Clone, Default)]
pub struct RecommendationEngine {
    include_complete_columns: bool,
}

impl RecommendationEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Also target columns that have no missing values.
    pub fn include_complete_columns(mut self, include: bool) -> Self {
        self.include_complete_columns = include;
        self
    }

    fn columns_for(&self, report: &QualityReport, action: RecommendedAction) -> Vec<String> {
        report
            .recommendations
            .iter()
            .filter(|(_, recommended)| **recommended == action)
            .filter(|(name, _)| {
                self.include_complete_columns || report.profile(name).is_some_and(|p| p.has_missing())
            })
            .map(|(name, _)| name.clone())
            .collect()
    }
}

impl DecisionEngine for RecommendationEngine {
    fn suggest_plan(&self, report: &QualityReport) -> Plan {
        let mut plan = Plan::new();
        let steps: [(RecommendedAction, &[ImputeMethod]); 4] = [
            (RecommendedAction::DropRow, &[ImputeMethod::DropRow]),
            (RecommendedAction::ImputeMedian, &[ImputeMethod::Median]),
            (RecommendedAction::ImputeMean, &[ImputeMethod::Mean]),
            (
                RecommendedAction::CarryLast,
                &[ImputeMethod::CarryForward, ImputeMethod::CarryBackward],
            ),
        ];

        for (action, methods) in steps {
            let columns = self.columns_for(report, action);
            if columns.is_empty() {
                continue;
            }
            debug!("{} -> {:?}", action, columns);
            for method in methods {
                plan.push(Stage::impute(*method).with_target(Target::Columns(columns.clone())));
            }
        }

        info!("Suggested plan with {} stages", plan.len());
        plan
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ReportOptions;
    use crate::dataset::{Column, Dataset};
    use crate::pipeline::apply;
    use crate::quality::report;
    use crate::value::Cell;
    use pretty_assertions::assert_eq;

    fn dataset() -> Dataset {
        Dataset::new(vec![
            // mostly missing
            Column::from_numbers("sparse", &[Some(1.0), None, None, None, Some(2.0), None]),
            // skewed, one gap
            Column::from_numbers("skewed", &[Some(1.0), Some(1.0), Some(2.0), Some(1.0), Some(90.0), None]),
            Column::from_numbers("plain", &[Some(1.0), Some(2.0), Some(3.0), None, Some(5.0), Some(4.0)]),
            Column::new(
                "label",
                vec![
                    Cell::from("a"),
                    Cell::Missing,
                    Cell::from("b"),
                    Cell::from("a"),
                    Cell::from("c"),
                    Cell::from("b"),
                ],
            ),
            Column::from_numbers("full", &[Some(1.0), Some(2.0), Some(3.0), Some(4.0), Some(5.0), Some(6.0)]),
        ])
        .unwrap()
    }

    #[test]
    fn test_stage_order_and_targets() {
        let options = ReportOptions::builder().time_column("full").build().unwrap();
        let report = report(&dataset(), &options).unwrap();
        let plan = RecommendationEngine::new().suggest_plan(&report);

        let summary: Vec<(String, String)> = plan
            .stages
            .iter()
            .map(|stage| match stage {
                Stage::ImputeMissing(options) => (options.method.as_str().to_string(), options.target.to_string()),
                other => (other.kind().to_string(), String::new()),
            })
            .collect();
        assert_eq!(
            summary,
            vec![
                ("drop-row".to_string(), Target::columns(["sparse"]).to_string()),
                ("median".to_string(), Target::columns(["skewed"]).to_string()),
                ("mean".to_string(), Target::columns(["plain"]).to_string()),
                ("carry-forward".to_string(), Target::columns(["label"]).to_string()),
                ("carry-backward".to_string(), Target::columns(["label"]).to_string()),
            ]
        );
    }

    #[test]
    fn test_suggested_plan_applies() {
        let data = dataset();
        let report = report(&data, &ReportOptions::default()).unwrap();
        let plan = RecommendationEngine::new().suggest_plan(&report);
        plan.validate().unwrap();

        let outcome = apply(&data, &plan).unwrap();
        assert!(outcome.is_success());
        assert!(outcome.dataset.n_rows() <= data.n_rows());
    }

    #[test]
    fn test_complete_columns_left_out() {
        let complete = Dataset::new(vec![Column::from_numbers("x", &[Some(1.0), Some(2.0)])]).unwrap();
        let options = ReportOptions::builder().time_column("x").build().unwrap();
        let report = report(&complete, &options).unwrap();

        assert!(RecommendationEngine::new().suggest_plan(&report).is_empty());
        assert!(!RecommendationEngine::new()
            .include_complete_columns(true)
            .suggest_plan(&report)
            .is_empty());
    }
}
