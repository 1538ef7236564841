//! Order-sensitive stages: moving-average smoothing and interpolation over a
//! time column.
//!
//! Both read the dataset in a particular order, so unlike the other stages
//! their output changes when rows are reordered.

use super::executor::{StageContext, StageOperation};
use super::plan::{InterpolateOptions, SmoothOptions};
use crate::dataset::Dataset;
use crate::error::Result;
use crate::types::SemanticType;
use crate::value::{temporal, Cell, DateFormat};
use tracing::debug;

/// Centered moving average over `window` cells.
///
/// Cells within `window / 2` of either end, missing cells and non-numeric
/// cells are kept. Each other numeric cell becomes the mean of the numeric
/// values in its window.
pub fn moving_average(cells: &[Cell], window: usize) -> Vec<Cell> {
    let half = window / 2;
    let values: Vec<Option<f64>> = cells.iter().map(Cell::as_numeric).collect();

    cells
        .iter()
        .enumerate()
        .map(|(i, cell)| {
            if i < half || i + half >= cells.len() || values[i].is_none() {
                return cell.clone();
            }
            let (sum, count) = values[i - half..=i + half]
                .iter()
                .flatten()
                .fold((0.0, 0usize), |(sum, count), v| (sum + v, count + 1));
            Cell::number(sum / count as f64)
        })
        .collect()
}

/// Position of a cell on a time axis: epoch seconds for instants, the value
/// itself for numbers. Text is read as a number or an instant.
pub fn time_key(cell: &Cell, format: DateFormat) -> Option<f64> {
    match cell {
        Cell::Timestamp(ts) => Some(temporal::to_epoch_seconds(ts)),
        Cell::Number(v) => Some(*v),
        Cell::Text(_) => cell
            .as_numeric()
            .or_else(|| cell.to_timestamp(format).map(|ts| temporal::to_epoch_seconds(&ts))),
        Cell::Missing | Cell::Boolean(_) => None,
    }
}

/// Fill the missing cells of `values` by linear interpolation in time order.
///
/// `order` lists `(row, time)` pairs sorted by time; rows absent from it are
/// left alone. Missing cells before the first or after the last known value
/// take that nearest value.
pub fn interpolate_linear(values: &[Cell], order: &[(usize, f64)]) -> (Vec<Cell>, usize) {
    let known: Vec<Option<f64>> = order
        .iter()
        .map(|(row, _)| values[*row].as_numeric())
        .collect();

    let mut previous = vec![None; order.len()];
    let mut last = None;
    for (k, value) in known.iter().enumerate() {
        if value.is_some() {
            last = Some(k);
        }
        previous[k] = last;
    }
    let mut next = vec![None; order.len()];
    let mut upcoming = None;
    for (k, value) in known.iter().enumerate().rev() {
        if value.is_some() {
            upcoming = Some(k);
        }
        next[k] = upcoming;
    }

    let mut out = values.to_vec();
    let mut filled = 0;
    for (k, &(row, t)) in order.iter().enumerate() {
        if !values[row].is_missing() {
            continue;
        }
        let point = |index: usize| (order[index].1, known[index].unwrap_or_default());
        let estimate = match (previous[k], next[k]) {
            (Some(p), Some(n)) => {
                let ((t0, v0), (t1, v1)) = (point(p), point(n));
                if t1 == t0 {
                    v0
                } else {
                    v0 + (v1 - v0) * (t - t0) / (t1 - t0)
                }
            }
            (Some(p), None) => point(p).1,
            (None, Some(n)) => point(n).1,
            (None, None) => continue,
        };
        out[row] = Cell::number(estimate);
        filled += 1;
    }
    (out, filled)
}

impl StageOperation for SmoothOptions {
    type Parameters = Vec<usize>;

    fn compute_parameters(&self, dataset: &Dataset, ctx: &mut StageContext<'_>) -> Result<Self::Parameters> {
        ctx.resolve_target(
            dataset,
            &self.target,
            |t| t == SemanticType::Numeric,
            "smoothing needs numeric values",
        )
    }

    fn apply_mapping(
        &self,
        dataset: &Dataset,
        parameters: Self::Parameters,
        _ctx: &mut StageContext<'_>,
    ) -> Result<Dataset> {
        let updates = parameters
            .into_iter()
            .map(|index| {
                let column = &dataset.columns()[index];
                debug!("Smoothing '{}' with window {}", column.name(), self.window_size);
                (index, moving_average(column.cells(), self.window_size))
            })
            .collect();
        dataset.replace_columns(updates)
    }
}

/// Value column index and the rows with a usable time, sorted by time.
pub struct TimeOrder {
    pub value_index: usize,
    pub order: Vec<(usize, f64)>,
}

impl StageOperation for InterpolateOptions {
    /// `None` when the value column is skipped.
    type Parameters = Option<TimeOrder>;

    fn compute_parameters(&self, dataset: &Dataset, ctx: &mut StageContext<'_>) -> Result<Self::Parameters> {
        let find = |name: &str| {
            dataset
                .column_index(name)
                .ok_or_else(|| ctx.error(Some(name), format!("column '{}' not found", name)))
        };
        let value_index = find(&self.value_column)?;
        let time_index = find(&self.time_column)?;

        let time_column = &dataset.columns()[time_index];
        let (_, format) = ctx.inspect(time_column);
        let format = format.unwrap_or_default();
        let mut order: Vec<(usize, f64)> = time_column
            .cells()
            .iter()
            .enumerate()
            .filter_map(|(row, cell)| time_key(cell, format).map(|t| (row, t)))
            .collect();
        if order.is_empty() {
            return Err(ctx.error(
                Some(&self.time_column),
                format!("time column '{}' has no usable times", self.time_column),
            ));
        }
        // Stable: rows with equal times keep their relative order
        order.sort_by(|a, b| a.1.total_cmp(&b.1));

        let value_type = ctx.semantic_type(&dataset.columns()[value_index]);
        if value_type != SemanticType::Numeric {
            ctx.warn(
                Some(&self.value_column),
                format!(
                    "column '{}' is {}, interpolation needs numeric values; skipped",
                    self.value_column, value_type
                ),
            );
            return Ok(None);
        }

        Ok(Some(TimeOrder { value_index, order }))
    }

    fn apply_mapping(
        &self,
        dataset: &Dataset,
        parameters: Self::Parameters,
        _ctx: &mut StageContext<'_>,
    ) -> Result<Dataset> {
        let Some(TimeOrder { value_index, order }) = parameters else {
            return Ok(dataset.clone());
        };
        let (cells, filled) = interpolate_linear(dataset.columns()[value_index].cells(), &order);
        debug!(
            "Interpolated {} values in '{}' over '{}'",
            filled, self.value_column, self.time_column
        );
        dataset.replace_columns(vec![(value_index, cells)])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ProfileOptions;
    use crate::dataset::Column;
    use crate::pipeline::{StageKind, Target};
    use pretty_assertions::assert_eq;

    fn numbers(values: &[Option<f64>]) -> Vec<Cell> {
        values.iter().map(|v| Cell::from(*v)).collect()
    }

    fn interpolate(dataset: &Dataset) -> Result<(Dataset, usize)> {
        let options = InterpolateOptions {
            value_column: "v".to_string(),
            time_column: "t".to_string(),
        };
        let profile = ProfileOptions::default();
        let mut ctx = StageContext::new(0, StageKind::InterpolateTime, &profile);
        let parameters = options.compute_parameters(dataset, &mut ctx)?;
        let output = options.apply_mapping(dataset, parameters, &mut ctx)?;
        Ok((output, ctx.warnings().len()))
    }

    // ==================== smoothing ====================

    #[test]
    fn test_moving_average_keeps_edges() {
        let out = moving_average(&numbers(&[Some(1.0), Some(2.0), Some(6.0), Some(4.0), Some(5.0)]), 3);
        assert_eq!(out, numbers(&[Some(1.0), Some(3.0), Some(4.0), Some(5.0), Some(5.0)]));
    }

    #[test]
    fn test_moving_average_skips_missing() {
        let out = moving_average(&numbers(&[Some(1.0), None, Some(3.0), Some(5.0), Some(7.0)]), 3);
        assert_eq!(out, numbers(&[Some(1.0), None, Some(4.0), Some(5.0), Some(7.0)]));
    }

    #[test]
    fn test_moving_average_short_column_unchanged() {
        let cells = numbers(&[Some(1.0), Some(9.0)]);
        assert_eq!(moving_average(&cells, 5), cells);
    }

    #[test]
    fn test_smooth_stage_skips_text_column() {
        let dataset = Dataset::new(vec![Column::new(
            "c",
            vec![Cell::from("a"), Cell::from("b"), Cell::from("c")],
        )])
        .unwrap();
        let options = SmoothOptions {
            window_size: 3,
            target: Target::columns(["c"]),
        };
        let profile = ProfileOptions::default();
        let mut ctx = StageContext::new(0, StageKind::Smooth, &profile);
        let parameters = options.compute_parameters(&dataset, &mut ctx).unwrap();
        assert!(parameters.is_empty());
        assert_eq!(ctx.warnings().len(), 1);
    }

    // ==================== interpolation ====================

    #[test]
    fn test_linear_interpolation() {
        let dataset = Dataset::new(vec![
            Column::from_numbers("t", &[Some(0.0), Some(1.0), Some(2.0), Some(3.0)]),
            Column::from_numbers("v", &[Some(10.0), None, None, Some(40.0)]),
        ])
        .unwrap();
        let (output, warnings) = interpolate(&dataset).unwrap();
        assert_eq!(warnings, 0);
        assert_eq!(
            output.columns()[1].cells(),
            numbers(&[Some(10.0), Some(20.0), Some(30.0), Some(40.0)]).as_slice()
        );
    }

    #[test]
    fn test_interpolation_follows_time_not_row_order() {
        let dataset = Dataset::new(vec![
            Column::from_numbers("t", &[Some(3.0), Some(0.0), Some(1.0)]),
            Column::from_numbers("v", &[Some(40.0), Some(10.0), None]),
        ])
        .unwrap();
        let (output, _) = interpolate(&dataset).unwrap();
        assert_eq!(output.columns()[1].cells()[2], Cell::Number(20.0));
        assert_eq!(output.columns()[0].cells(), dataset.columns()[0].cells());
    }

    #[test]
    fn test_ends_take_nearest_value() {
        let dataset = Dataset::new(vec![
            Column::from_numbers("t", &[Some(0.0), Some(1.0), Some(2.0), Some(3.0)]),
            Column::from_numbers("v", &[None, Some(5.0), Some(7.0), None]),
        ])
        .unwrap();
        let (output, _) = interpolate(&dataset).unwrap();
        assert_eq!(
            output.columns()[1].cells(),
            numbers(&[Some(5.0), Some(5.0), Some(7.0), Some(7.0)]).as_slice()
        );
    }

    #[test]
    fn test_rows_without_time_untouched() {
        let dataset = Dataset::new(vec![
            Column::from_numbers("t", &[Some(0.0), None, Some(2.0)]),
            Column::from_numbers("v", &[Some(0.0), None, Some(2.0)]),
        ])
        .unwrap();
        let (output, _) = interpolate(&dataset).unwrap();
        assert_eq!(output.columns()[1].cells()[1], Cell::Missing);
    }

    #[test]
    fn test_date_text_times() {
        let dataset = Dataset::new(vec![
            Column::new(
                "t",
                vec![Cell::from("2024-01-01"), Cell::from("2024-01-02"), Cell::from("2024-01-05")],
            ),
            Column::from_numbers("v", &[Some(0.0), None, Some(8.0)]),
        ])
        .unwrap();
        let (output, _) = interpolate(&dataset).unwrap();
        assert_eq!(output.columns()[1].cells()[1], Cell::Number(2.0));
    }

    #[test]
    fn test_dotted_dates_sort_across_month_boundary() {
        let raw: Vec<serde_json::Value> = ["30.01.2024", "31.01.2024", "01.02.2024", "02.02.2024"]
            .into_iter()
            .map(serde_json::Value::from)
            .collect();
        let dataset = Dataset::new(vec![
            Column::from_raw("t", &raw, &crate::value::CoercionOptions::default()),
            Column::from_numbers("v", &[Some(10.0), None, None, Some(40.0)]),
        ])
        .unwrap();
        let (output, _) = interpolate(&dataset).unwrap();
        assert_eq!(
            output.columns()[1].cells(),
            numbers(&[Some(10.0), Some(20.0), Some(30.0), Some(40.0)]).as_slice()
        );
    }

    #[test]
    fn test_no_usable_times_is_stage_error() {
        let dataset = Dataset::new(vec![
            Column::new("t", vec![Cell::Missing, Cell::from("soon")]),
            Column::from_numbers("v", &[Some(1.0), None]),
        ])
        .unwrap();
        let error = interpolate(&dataset).unwrap_err();
        assert_eq!(error.error_code(), "STAGE_ERROR");
        assert_eq!(error.column(), Some("t"));
    }
}
