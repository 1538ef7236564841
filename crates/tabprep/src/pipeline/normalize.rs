//! Column normalization.

use super::executor::{StageContext, StageOperation};
use super::plan::{NormalizeMethod, NormalizeOptions};
use crate::dataset::Dataset;
use crate::error::Result;
use crate::profiler::statistics::NumericSummary;
use crate::profiler::DataProfiler;
use crate::types::SemanticType;
use crate::value::Cell;
use tracing::debug;

/// Affine map `x -> (x - center) / scale`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Scaling {
    pub center: f64,
    pub scale: f64,
}

impl Scaling {
    /// Fit a scaling to a set of values. `None` when there are no values.
    ///
    /// - `minmax`: center `min`, scale `max - min`
    /// - `zscore`: center `mean`, scale population `std`
    /// - `robust`: center `q1`, scale `iqr`
    pub fn fit(values: &[f64], method: NormalizeMethod) -> Option<Self> {
        let summary = NumericSummary::from_values(values)?;
        let (center, scale) = match method {
            NormalizeMethod::Minmax => (summary.min, summary.max - summary.min),
            NormalizeMethod::Zscore => (summary.mean, summary.std),
            NormalizeMethod::Robust => (summary.q1, summary.iqr),
        };
        Some(Self { center, scale })
    }

    /// A zero scale maps every value to 0.
    pub fn is_degenerate(&self) -> bool {
        self.scale == 0.0
    }

    #[inline]
    pub fn apply(&self, value: f64) -> f64 {
        if self.is_degenerate() {
            0.0
        } else {
            (value - self.center) / self.scale
        }
    }

    /// Map every numeric cell; missing and non-numeric cells are kept.
    pub fn apply_cells(&self, cells: &[Cell]) -> Vec<Cell> {
        cells
            .iter()
            .map(|cell| match cell.as_numeric() {
                Some(value) => Cell::number(self.apply(value)),
                None => cell.clone(),
            })
            .collect()
    }
}

impl StageOperation for NormalizeOptions {
    type Parameters = Vec<(usize, Scaling)>;

    fn compute_parameters(&self, dataset: &Dataset, ctx: &mut StageContext<'_>) -> Result<Self::Parameters> {
        let indices = ctx.resolve_target(
            dataset,
            &self.target,
            |t| t == SemanticType::Numeric,
            "normalization needs numeric values",
        )?;

        let mut parameters = Vec::with_capacity(indices.len());
        for index in indices {
            let column = &dataset.columns()[index];
            let Some(scaling) = Scaling::fit(&DataProfiler::numeric_values(column), self.method) else {
                continue;
            };
            if scaling.is_degenerate() {
                ctx.warn(
                    Some(column.name()),
                    format!(
                        "column '{}' has a zero {} spread; values set to 0",
                        column.name(),
                        self.method.as_str()
                    ),
                );
            }
            parameters.push((index, scaling));
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
            .map(|(index, scaling)| {
                let column = &dataset.columns()[index];
                debug!(
                    "Normalized '{}' ({}): center {}, scale {}",
                    column.name(),
                    self.method.as_str(),
                    scaling.center,
                    scaling.scale
                );
                (index, scaling.apply_cells(column.cells()))
            })
            .collect();
        dataset.replace_columns(updates)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ProfileOptions;
    use crate::dataset::Column;
    use crate::pipeline::{StageKind, Target};
    use pretty_assertions::assert_eq;

    fn normalize(method: NormalizeMethod, dataset: &Dataset) -> (Dataset, usize) {
        let options = NormalizeOptions {
            method,
            target: Target::AllNumeric,
            allow_repeat: false,
        };
        let profile = ProfileOptions::default();
        let mut ctx = StageContext::new(0, StageKind::Normalize, &profile);
        let parameters = options.compute_parameters(dataset, &mut ctx).unwrap();
        let output = options.apply_mapping(dataset, parameters, &mut ctx).unwrap();
        (output, ctx.warnings().len())
    }

    fn column_values(dataset: &Dataset) -> Vec<Option<f64>> {
        dataset.columns()[0].cells().iter().map(Cell::as_numeric).collect()
    }

    #[test]
    fn test_minmax() {
        let dataset = Dataset::new(vec![Column::from_numbers("x", &[Some(0.0), Some(5.0), Some(10.0)])]).unwrap();
        let (output, warnings) = normalize(NormalizeMethod::Minmax, &dataset);
        assert_eq!(warnings, 0);
        assert_eq!(column_values(&output), vec![Some(0.0), Some(0.5), Some(1.0)]);
    }

    #[test]
    fn test_zscore_keeps_missing() {
        let dataset = Dataset::new(vec![Column::from_numbers("x", &[Some(1.0), None, Some(3.0)])]).unwrap();
        let (output, _) = normalize(NormalizeMethod::Zscore, &dataset);
        assert_eq!(column_values(&output), vec![Some(-1.0), None, Some(1.0)]);
    }

    #[test]
    fn test_robust() {
        let dataset = Dataset::new(vec![Column::from_numbers(
            "x",
            &[Some(1.0), Some(2.0), Some(3.0), Some(4.0), Some(100.0)],
        )])
        .unwrap();
        let (output, _) = normalize(NormalizeMethod::Robust, &dataset);
        assert_eq!(
            column_values(&output),
            vec![Some(-0.5), Some(0.0), Some(0.5), Some(1.0), Some(49.0)]
        );
    }

    #[test]
    fn test_constant_column_maps_to_zero_with_warning() {
        let dataset = Dataset::new(vec![Column::from_numbers("x", &[Some(4.0), None, Some(4.0)])]).unwrap();
        let (output, warnings) = normalize(NormalizeMethod::Minmax, &dataset);
        assert_eq!(warnings, 1);
        assert_eq!(column_values(&output), vec![Some(0.0), None, Some(0.0)]);
    }
}
