//! Outlier clipping.
//!
//! Values outside the bounds of their column are winsorized: replaced by
//! the nearer bound. Bounds come from the column's non-missing numeric
//! values at the time the stage runs.

use super::executor::{StageContext, StageOperation};
use super::plan::{ClipMethod, ClipOptions};
use crate::dataset::Dataset;
use crate::error::Result;
use crate::profiler::statistics::NumericSummary;
use crate::profiler::{DataProfiler, OutlierBounds};
use crate::types::SemanticType;
use crate::value::Cell;
use tracing::debug;

/// Computes clipping bounds and winsorizes cells.
pub struct OutlierClipper;

impl OutlierClipper {
    /// Bounds for a set of values, `None` when there are no values or the
    /// z-score spread is zero.
    pub fn bounds(values: &[f64], method: ClipMethod, threshold: f64) -> Option<OutlierBounds> {
        let summary = NumericSummary::from_values(values)?;
        match method {
            ClipMethod::Iqr => Some(summary.fences(threshold)),
            ClipMethod::Zscore => summary.zscore_bounds(threshold),
        }
    }

    /// Clamp every numeric cell into `bounds`. Non-numeric cells are kept.
    /// Returns the new cells and the number of cells changed.
    pub fn winsorize(cells: &[Cell], bounds: &OutlierBounds) -> (Vec<Cell>, usize) {
        let mut clipped = 0;
        let cells = cells
            .iter()
            .map(|cell| match cell.as_numeric() {
                Some(value) if !bounds.contains(value) => {
                    clipped += 1;
                    Cell::number(bounds.clamp(value))
                }
                _ => cell.clone(),
            })
            .collect();
        (cells, clipped)
    }
}

impl StageOperation for ClipOptions {
    type Parameters = Vec<(usize, OutlierBounds)>;

    fn compute_parameters(&self, dataset: &Dataset, ctx: &mut StageContext<'_>) -> Result<Self::Parameters> {
        let indices = ctx.resolve_target(
            dataset,
            &self.target,
            |t| t == SemanticType::Numeric,
            "clipping needs numeric values",
        )?;
        let threshold = self.effective_threshold();

        let mut parameters = Vec::with_capacity(indices.len());
        for index in indices {
            let column = &dataset.columns()[index];
            let values = DataProfiler::numeric_values(column);
            if values.is_empty() {
                continue;
            }
            match OutlierClipper::bounds(&values, self.method, threshold) {
                Some(bounds) => parameters.push((index, bounds)),
                None => ctx.warn(
                    Some(column.name()),
                    format!(
                        "column '{}' has zero standard deviation; z-score clipping skipped",
                        column.name()
                    ),
                ),
            }
        }
        Ok(parameters)
    }

    fn apply_mapping(
        &self,
        dataset: &Dataset,
        parameters: Self::Parameters,
        _ctx: &mut StageContext<'_>,
    ) -> Result<Dataset> {
        let updates = parameters
            .into_iter()
            .map(|(index, bounds)| {
                let column = &dataset.columns()[index];
                let (cells, clipped) = OutlierClipper::winsorize(column.cells(), &bounds);
                debug!(
                    "Clipped {} values in '{}' to [{}, {}]",
                    clipped,
                    column.name(),
                    bounds.lower,
                    bounds.upper
                );
                (index, cells)
            })
            .collect();
        dataset.replace_columns(updates)
    }
}
