//! Stage execution.
//!
//! Every stage runs the same phases: parameters are computed from the
//! stage's input, a mapping is applied to produce a new dataset, and the
//! output is validated before it replaces the input. A stage that fails in
//! any phase leaves its input untouched.

use super::plan::{Stage, StageKind, Target};
use super::progress::{ProgressReporter, ProgressUpdate, StagePhase};
use crate::config::ProfileOptions;
use crate::dataset::{Column, Dataset};
use crate::error::{Diagnostic, PrepError, Result};
use crate::profiler::infer_semantic_type;
use crate::types::SemanticType;
use crate::value::DateFormat;
use tracing::{debug, warn};

/// State shared with a stage operation while it runs.
pub struct StageContext<'a> {
    index: usize,
    kind: StageKind,
    options: &'a ProfileOptions,
    warnings: Vec<Diagnostic>,
}

impl<'a> StageContext<'a> {
    pub(crate) fn new(index: usize, kind: StageKind, options: &'a ProfileOptions) -> Self {
        Self {
            index,
            kind,
            options,
            warnings: Vec::new(),
        }
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn kind(&self) -> StageKind {
        self.kind
    }

    pub fn warnings(&self) -> &[Diagnostic] {
        &self.warnings
    }

    /// Record a warning. Warnings never abort the stage.
    pub fn warn(&mut self, column: Option<&str>, message: impl Into<String>) {
        let message = message.into();
        warn!("Stage {} ({}): {}", self.index, self.kind, message);
        self.warnings
            .push(Diagnostic::warning(self.index, self.kind, column, message));
    }

    /// Build a stage error for this stage.
    pub fn error(&self, column: Option<&str>, message: impl Into<String>) -> PrepError {
        PrepError::Stage {
            stage_index: self.index,
            stage: self.kind,
            column: column.map(str::to_string),
            message: message.into(),
        }
    }

    pub fn semantic_type(&self, column: &Column) -> SemanticType {
        self.inspect(column).0
    }

    /// Semantic type of a column plus the date pattern used to read it.
    pub fn inspect(&self, column: &Column) -> (SemanticType, Option<DateFormat>) {
        let (semantic_type, evidence) =
            infer_semantic_type(column, self.options.inference_sample, self.options.seed);
        (semantic_type, evidence.date_format.or(column.date_format()))
    }

    /// Column indices a target resolves to.
    ///
    /// `all-numeric` picks every numeric column. Listed columns are kept in
    /// order when `accepts` allows their type; the rest are skipped with a
    /// warning naming `requirement`.
    pub fn resolve_target(
        &mut self,
        dataset: &Dataset,
        target: &Target,
        accepts: impl Fn(SemanticType) -> bool,
        requirement: &str,
    ) -> Result<Vec<usize>> {
        match target {
            Target::AllNumeric => {
                let indices: Vec<usize> = dataset
                    .columns()
                    .iter()
                    .enumerate()
                    .filter(|(_, column)| self.semantic_type(column) == SemanticType::Numeric)
                    .map(|(index, _)| index)
                    .collect();
                if indices.is_empty() && dataset.n_columns() > 0 {
                    self.warn(None, "dataset has no numeric columns; stage skipped");
                }
                Ok(indices)
            }
            Target::Columns(names) => {
                let mut indices = Vec::with_capacity(names.len());
                for name in names {
                    let index = dataset
                        .column_index(name)
                        .ok_or_else(|| self.error(Some(name), format!("column '{}' not found", name)))?;
                    if indices.contains(&index) {
                        continue;
                    }
                    let semantic_type = self.semantic_type(&dataset.columns()[index]);
                    if accepts(semantic_type) {
                        indices.push(index);
                    } else {
                        self.warn(
                            Some(name),
                            format!("column '{}' is {}, {}; skipped", name, semantic_type, requirement),
                        );
                    }
                }
                Ok(indices)
            }
        }
    }

    pub(crate) fn into_warnings(self) -> Vec<Diagnostic> {
        self.warnings
    }
}

/// A stage's behaviour, split into its two working phases.
pub trait StageOperation {
    /// Whatever the mapping needs, computed from the stage's input only.
    type Parameters;

    fn compute_parameters(&self, dataset: &Dataset, ctx: &mut StageContext<'_>) -> Result<Self::Parameters>;

    fn apply_mapping(
        &self,
        dataset: &Dataset,
        parameters: Self::Parameters,
        ctx: &mut StageContext<'_>,
    ) -> Result<Dataset>;

    /// Whether the stage may remove rows.
    fn may_drop_rows(&self) -> bool {
        false
    }
}

/// Result of one stage: the new dataset or the stage error, plus warnings.
pub(crate) struct StageRun {
    pub result: Result<Dataset>,
    pub warnings: Vec<Diagnostic>,
}

/// Runs single stages and reports their phases.
pub(crate) struct StageExecutor<'a> {
    options: &'a ProfileOptions,
    reporter: Option<&'a dyn ProgressReporter>,
    total_stages: usize,
}

impl<'a> StageExecutor<'a> {
    pub fn new(options: &'a ProfileOptions, reporter: Option<&'a dyn ProgressReporter>, total_stages: usize) -> Self {
        Self {
            options,
            reporter,
            total_stages,
        }
    }

    pub fn execute(&self, index: usize, stage: &Stage, input: &Dataset) -> StageRun {
        let kind = stage.kind();
        let mut ctx = StageContext::new(index, kind, self.options);
        self.report(index, kind, StagePhase::Start, kind.display_name().to_string());

        let result = match stage {
            Stage::ImputeMissing(options) => self.run(options, input, &mut ctx),
            Stage::ClipOutliers(options) => self.run(options, input, &mut ctx),
            Stage::Normalize(options) => self.run(options, input, &mut ctx),
            Stage::Smooth(options) => self.run(options, input, &mut ctx),
            Stage::InterpolateTime(options) => self.run(options, input, &mut ctx),
        }
        .map_err(|e| match e {
            PrepError::Stage { .. } => e,
            other => ctx.error(other.column(), other.to_string()),
        });

        match &result {
            Ok(output) => {
                debug!(
                    "Stage {} ({}) done: {} rows, {} warnings",
                    index,
                    kind,
                    output.n_rows(),
                    ctx.warnings().len()
                );
                self.report(index, kind, StagePhase::Done, format!("{} done", kind.display_name()));
            }
            Err(e) => self.report(index, kind, StagePhase::Failed, e.to_string()),
        }

        StageRun {
            result,
            warnings: ctx.into_warnings(),
        }
    }

    fn run<O: StageOperation>(&self, operation: &O, input: &Dataset, ctx: &mut StageContext<'_>) -> Result<Dataset> {
        let (index, kind) = (ctx.index(), ctx.kind());

        self.report(index, kind, StagePhase::ComputeParameters, "Computing parameters".to_string());
        let parameters = operation.compute_parameters(input, ctx)?;

        self.report(index, kind, StagePhase::ApplyMapping, "Applying mapping".to_string());
        let output = operation.apply_mapping(input, parameters, ctx)?;

        self.report(index, kind, StagePhase::Validate, "Validating output".to_string());
        validate_output(input, &output, operation.may_drop_rows(), ctx)?;
        Ok(output)
    }

    fn report(&self, index: usize, kind: StageKind, phase: StagePhase, message: String) {
        if let Some(reporter) = self.reporter {
            reporter.report(ProgressUpdate::new(index, self.total_stages, kind, phase, message));
        }
    }
}

/// Columns stay aligned and in place, rows are only removed by stages that
/// may drop them, and no stage turns a present cell into a missing one.
fn validate_output(input: &Dataset, output: &Dataset, may_drop_rows: bool, ctx: &StageContext<'_>) -> Result<()> {
    output
        .check_consistency()
        .map_err(|e| ctx.error(e.column(), e.to_string()))?;

    if output.column_names() != input.column_names() {
        return Err(ctx.error(None, "stage changed the column layout"));
    }

    if may_drop_rows {
        if output.n_rows() > input.n_rows() {
            return Err(ctx.error(None, "stage added rows"));
        }
        return Ok(());
    }

    if output.n_rows() != input.n_rows() {
        return Err(ctx.error(
            None,
            format!("stage changed the row count from {} to {}", input.n_rows(), output.n_rows()),
        ));
    }

    for (before, after) in input.columns().iter().zip(output.columns()) {
        if after.missing_count() > before.missing_count() {
            return Err(ctx.error(
                Some(after.name()),
                format!("stage produced non-finite values in column '{}'", after.name()),
            ));
        }
    }
    Ok(())
}
