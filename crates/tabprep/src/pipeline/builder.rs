//! Plan execution entry points.
//!
//! This module provides the [`Pipeline`] struct and its builder, plus the
//! plan-free [`apply`] function.

use super::executor::StageExecutor;
use super::plan::Plan;
use super::progress::{ClosureProgressReporter, ProgressReporter, ProgressUpdate};
use crate::config::ProfileOptions;
use crate::dataset::Dataset;
use crate::error::{Diagnostic, DiagnosticKind, Result};
use std::sync::Arc;
use tracing::{debug, error, info};

/// Result of applying a plan.
///
/// When a stage fails, its error is the last diagnostic and `dataset` is the
/// input of the failing stage.
#[derive(Debug, Clone, PartialEq)]
pub struct ApplyOutcome {
    pub dataset: Dataset,
    pub diagnostics: Vec<Diagnostic>,
}

impl ApplyOutcome {
    fn unchanged(dataset: Dataset) -> Self {
        Self {
            dataset,
            diagnostics: Vec::new(),
        }
    }

    /// The stage error that stopped the run, if any.
    pub fn stage_error(&self) -> Option<&Diagnostic> {
        self.diagnostics
            .last()
            .filter(|d| d.kind == DiagnosticKind::StageError)
    }

    pub fn is_success(&self) -> bool {
        self.stage_error().is_none()
    }

    pub fn warnings(&self) -> impl Iterator<Item = &Diagnostic> {
        self.diagnostics
            .iter()
            .filter(|d| d.kind == DiagnosticKind::Warning)
    }
}

/// Applies a validated plan to datasets.
///
/// Use [`Pipeline::builder()`] to create one.
///
/// # Example
///
/// ```rust,ignore
/// use tabprep::{Pipeline, Plan, Stage, ImputeMethod};
///
/// let plan = Plan::new().with_stage(Stage::impute(ImputeMethod::Median));
/// let outcome = Pipeline::builder()
///     .plan(plan)
///     .on_progress(|update| println!("{} {}", update.stage, update.phase))
///     .build()?
///     .run(&dataset)?;
/// ```
pub struct Pipeline {
    plan: Plan,
    options: ProfileOptions,
    progress_reporter: Option<Arc<dyn ProgressReporter>>,
}

static_assertions::assert_impl_all!(Pipeline: Send);
static_assertions::assert_impl_all!(Plan: Send, Sync);
static_assertions::assert_impl_all!(Dataset: Send, Sync);

impl Pipeline {
    pub fn builder() -> PipelineBuilder {
        PipelineBuilder::default()
    }

    pub fn plan(&self) -> &Plan {
        &self.plan
    }

    /// Options used to decide which columns are numeric.
    pub fn options(&self) -> &ProfileOptions {
        &self.options
    }

    /// Apply the plan to a dataset.
    ///
    /// Schema and plan errors are returned as `Err` before any stage runs.
    /// Warnings and a stage error are reported in the outcome.
    pub fn run(&self, dataset: &Dataset) -> Result<ApplyOutcome> {
        dataset.check_consistency()?;
        self.plan.validate_against(dataset)?;

        info!(
            "Applying plan with {} stages to {} rows x {} columns",
            self.plan.len(),
            dataset.n_rows(),
            dataset.n_columns()
        );

        if self.plan.is_empty() || dataset.n_rows() == 0 {
            debug!("Nothing to do, returning dataset unchanged");
            return Ok(ApplyOutcome::unchanged(dataset.clone()));
        }

        let executor = StageExecutor::new(&self.options, self.progress_reporter.as_deref(), self.plan.len());
        let mut current = dataset.clone();
        let mut diagnostics = Vec::new();

        for (index, stage) in self.plan.stages.iter().enumerate() {
            debug!("Running stage {} ({})", index, stage.kind());
            let run = executor.execute(index, stage, &current);
            diagnostics.extend(run.warnings);

            match run.result {
                Ok(next) => current = next,
                Err(e) => {
                    error!("Pipeline stopped at stage {}: {}", index, e);
                    diagnostics.extend(e.to_diagnostic());
                    return Ok(ApplyOutcome {
                        dataset: current,
                        diagnostics,
                    });
                }
            }
        }

        info!(
            "Plan applied: {} rows x {} columns, {} warnings",
            current.n_rows(),
            current.n_columns(),
            diagnostics.len()
        );
        Ok(ApplyOutcome {
            dataset: current,
            diagnostics,
        })
    }
}

/// Apply a plan to a dataset with default options and no progress reporting.
pub fn apply(dataset: &Dataset, plan: &Plan) -> Result<ApplyOutcome> {
    Pipeline::builder().plan(plan.clone()).build()?.run(dataset)
}

/// Builder for creating a [`Pipeline`] instance.
#[derive(Default)]
pub struct PipelineBuilder {
    plan: Option<Plan>,
    options: Option<ProfileOptions>,
    progress_reporter: Option<Arc<dyn ProgressReporter>>,
}

static_assertions::assert_impl_all!(PipelineBuilder: Send);

impl PipelineBuilder {
    /// Set the plan to apply. Defaults to the empty plan.
    pub fn plan(mut self, plan: Plan) -> Self {
        self.plan = Some(plan);
        self
    }

    /// Set the options used for column type inference.
    pub fn options(mut self, options: ProfileOptions) -> Self {
        self.options = Some(options);
        self
    }

    /// Set a progress reporter for receiving one update per stage phase.
    pub fn progress_reporter(mut self, reporter: Arc<dyn ProgressReporter>) -> Self {
        self.progress_reporter = Some(reporter);
        self
    }

    /// Set a progress callback closure.
    ///
    /// For more complex scenarios, use [`progress_reporter`](Self::progress_reporter).
    pub fn on_progress<F>(mut self, callback: F) -> Self
    where
        F: Fn(ProgressUpdate) + Send + Sync + 'static,
    {
        self.progress_reporter = Some(Arc::new(ClosureProgressReporter::new(callback)));
        self
    }

    /// Build the pipeline.
    ///
    /// Returns an error if the options or the plan are invalid.
    pub fn build(self) -> Result<Pipeline> {
        let options = self.options.unwrap_or_default();
        options.validate()?;
        let plan = self.plan.unwrap_or_default();
        plan.validate()?;

        Ok(Pipeline {
            plan,
            options,
            progress_reporter: self.progress_reporter,
        })
    }
}
