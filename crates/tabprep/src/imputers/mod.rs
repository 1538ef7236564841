//! Missing-value imputation.
//!
//! This module provides the `ImputeMissing` stage:
//! - Statistical fills (mean, median, mode, constant)
//! - Positional fills (carry-forward, carry-backward)
//! - Row removal (drop-row)

mod fill;
mod statistical;

pub use fill::{CarryDirection, FillImputer};
pub use statistical::StatisticalImputer;

use crate::dataset::Dataset;
use crate::error::Result;
use crate::pipeline::{ImputeMethod, ImputeOptions, StageContext, StageOperation};
use crate::types::SemanticType;
use crate::value::Cell;
use tracing::debug;

/// What an imputation stage will do, per column index.
#[derive(Debug, Clone, PartialEq)]
pub enum ImputeParameters {
    /// Fill the missing cells of each column with one value.
    Fill(Vec<(usize, Cell)>),
    Carry(Vec<usize>, CarryDirection),
    /// Drop rows missing a value in any of these columns.
    Drop(Vec<usize>),
}

impl StageOperation for ImputeOptions {
    type Parameters = ImputeParameters;

    fn compute_parameters(&self, dataset: &Dataset, ctx: &mut StageContext<'_>) -> Result<ImputeParameters> {
        let parameters = match self.method {
            ImputeMethod::Mean | ImputeMethod::Median => {
                let indices = ctx.resolve_target(
                    dataset,
                    &self.target,
                    |t| matches!(t, SemanticType::Numeric | SemanticType::Temporal),
                    "mean and median need numeric or temporal values",
                )?;
                let mut fills = Vec::with_capacity(indices.len());
                for index in indices {
                    let column = &dataset.columns()[index];
                    if column.missing_count() == 0 {
                        continue;
                    }
                    let (semantic_type, format) = ctx.inspect(column);
                    let value = if self.method == ImputeMethod::Mean {
                        StatisticalImputer::mean_value(column, semantic_type, format)
                    } else {
                        StatisticalImputer::median_value(column, semantic_type, format)
                    };
                    match value {
                        Some(value) => fills.push((index, value)),
                        None => ctx.warn(
                            Some(column.name()),
                            format!(
                                "column '{}' has no values to compute a {}; missing cells left as is",
                                column.name(),
                                self.method.as_str()
                            ),
                        ),
                    }
                }
                ImputeParameters::Fill(fills)
            }
            ImputeMethod::Mode => {
                let indices = ctx.resolve_target(dataset, &self.target, |_| true, "")?;
                let mut fills = Vec::with_capacity(indices.len());
                for index in indices {
                    let column = &dataset.columns()[index];
                    if column.missing_count() == 0 {
                        continue;
                    }
                    let value = StatisticalImputer::mode_value(column).or_else(|| {
                        let (semantic_type, format) = ctx.inspect(column);
                        StatisticalImputer::mean_value(column, semantic_type, format)
                    });
                    match value {
                        Some(value) => fills.push((index, value)),
                        None => ctx.warn(
                            Some(column.name()),
                            format!("column '{}' has no values to take a mode from; missing cells left as is", column.name()),
                        ),
                    }
                }
                ImputeParameters::Fill(fills)
            }
            ImputeMethod::Constant => {
                let value = self
                    .fill_value()
                    .filter(|cell| !cell.is_missing())
                    .ok_or_else(|| ctx.error(None, "constant imputation requires a non-missing custom_value"))?;
                let indices = ctx.resolve_target(dataset, &self.target, |_| true, "")?;
                ImputeParameters::Fill(indices.into_iter().map(|index| (index, value.clone())).collect())
            }
            ImputeMethod::CarryForward | ImputeMethod::CarryBackward => {
                let direction = if self.method == ImputeMethod::CarryForward {
                    CarryDirection::Forward
                } else {
                    CarryDirection::Backward
                };
                let indices = ctx.resolve_target(dataset, &self.target, |_| true, "")?;
                ImputeParameters::Carry(indices, direction)
            }
            ImputeMethod::DropRow => ImputeParameters::Drop(ctx.resolve_target(dataset, &self.target, |_| true, "")?),
        };
        Ok(parameters)
    }

    fn apply_mapping(
        &self,
        dataset: &Dataset,
        parameters: ImputeParameters,
        _ctx: &mut StageContext<'_>,
    ) -> Result<Dataset> {
        match parameters {
            ImputeParameters::Fill(fills) => {
                let updates = fills
                    .into_iter()
                    .map(|(index, value)| {
                        let column = &dataset.columns()[index];
                        let (cells, filled) = StatisticalImputer::fill_missing(column.cells(), &value);
                        debug!(
                            "Imputed {} missing values in '{}' with {} ({})",
                            filled,
                            column.name(),
                            value,
                            self.method.as_str()
                        );
                        (index, cells)
                    })
                    .collect();
                dataset.replace_columns(updates)
            }
            ImputeParameters::Carry(indices, direction) => {
                let updates = indices
                    .into_iter()
                    .map(|index| (index, FillImputer::carry(dataset.columns()[index].cells(), direction)))
                    .collect();
                dataset.replace_columns(updates)
            }
            ImputeParameters::Drop(indices) => {
                let keep = FillImputer::complete_rows(dataset, &indices);
                let dropped = keep.iter().filter(|k| !**k).count();
                if dropped == 0 {
                    return Ok(dataset.clone());
                }
                debug!("Dropped {} rows with missing values", dropped);
                Ok(dataset.filter_rows(&keep))
            }
        }
    }

    fn may_drop_rows(&self) -> bool {
        self.method == ImputeMethod::DropRow
    }
}
