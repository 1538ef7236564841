use crate::dataset::Column;
use crate::profiler::statistics;
use crate::profiler::DataProfiler;
use crate::types::SemanticType;
use crate::utils::value_counts;
use crate::value::{temporal, Cell, DateFormat};

/// Fill values computed from a column's own values.
pub struct StatisticalImputer;

impl StatisticalImputer {
    /// Mean of the column. Temporal columns yield the mean instant.
    pub fn mean_value(column: &Column, semantic_type: SemanticType, format: Option<DateFormat>) -> Option<Cell> {
        Self::central_value(column, semantic_type, format, statistics::mean)
    }

    /// Median of the column. Temporal columns yield the median instant.
    pub fn median_value(column: &Column, semantic_type: SemanticType, format: Option<DateFormat>) -> Option<Cell> {
        Self::central_value(column, semantic_type, format, statistics::median)
    }

    fn central_value(
        column: &Column,
        semantic_type: SemanticType,
        format: Option<DateFormat>,
        reduce: fn(&[f64]) -> Option<f64>,
    ) -> Option<Cell> {
        match semantic_type {
            SemanticType::Temporal => {
                let values = DataProfiler::temporal_values(column, format.unwrap_or_default());
                reduce(&values)
                    .and_then(temporal::from_epoch_seconds)
                    .map(Cell::Timestamp)
            }
            _ => {
                let values = DataProfiler::numeric_values(column);
                reduce(&values).map(Cell::number).filter(|cell| !cell.is_missing())
            }
        }
    }

    /// Most frequent non-missing value; ties go to the value seen first.
    pub fn mode_value(column: &Column) -> Option<Cell> {
        let mut best: Option<(&Cell, usize)> = None;
        for (cell, count) in value_counts(column.cells()).into_values() {
            if best.is_none_or(|(_, best_count)| count > best_count) {
                best = Some((cell, count));
            }
        }
        best.map(|(cell, _)| cell.clone())
    }

    /// Replace every missing cell with `value`. Returns the new cells and the
    /// number of cells filled.
    pub fn fill_missing(cells: &[Cell], value: &Cell) -> (Vec<Cell>, usize) {
        let mut filled = 0;
        let cells = cells
            .iter()
            .map(|cell| {
                if cell.is_missing() {
                    filled += 1;
                    value.clone()
                } else {
                    cell.clone()
                }
            })
            .collect();
        (cells, filled)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use pretty_assertions::assert_eq;

    fn numbers(values: &[Option<f64>]) -> Column {
        Column::from_numbers("x", values)
    }

    #[test]
    fn test_mean_value() {
        let column = numbers(&[Some(1.0), Some(2.0), None, Some(4.0), Some(5.0)]);
        assert_eq!(
            StatisticalImputer::mean_value(&column, SemanticType::Numeric, None),
            Some(Cell::Number(3.0))
        );
    }

    #[test]
    fn test_median_value_even_count() {
        let column = numbers(&[Some(1.0), Some(2.0), None, Some(3.0), Some(100.0)]);
        assert_eq!(
            StatisticalImputer::median_value(&column, SemanticType::Numeric, None),
            Some(Cell::Number(2.5))
        );
    }

    #[test]
    fn test_all_missing_has_no_value() {
        let column = numbers(&[None, None]);
        assert_eq!(StatisticalImputer::mean_value(&column, SemanticType::Numeric, None), None);
        assert_eq!(StatisticalImputer::mode_value(&column), None);
    }

    #[test]
    fn test_temporal_mean_is_an_instant() {
        let first = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let third = Utc.with_ymd_and_hms(2024, 1, 3, 0, 0, 0).unwrap();
        let column = Column::new("t", vec![Cell::Timestamp(first), Cell::Missing, Cell::Timestamp(third)]);

        let expected = Utc.with_ymd_and_hms(2024, 1, 2, 0, 0, 0).unwrap();
        assert_eq!(
            StatisticalImputer::mean_value(&column, SemanticType::Temporal, None),
            Some(Cell::Timestamp(expected))
        );
    }

    #[test]
    fn test_mode_value_ties_by_first_appearance() {
        let column = Column::new(
            "c",
            vec![
                Cell::from("b"),
                Cell::Missing,
                Cell::from("a"),
                Cell::from("a"),
                Cell::from("b"),
            ],
        );
        assert_eq!(StatisticalImputer::mode_value(&column), Some(Cell::from("b")));
    }

    #[test]
    fn test_mode_value_most_frequent() {
        let column = numbers(&[Some(1.0), Some(2.0), Some(2.0), None]);
        assert_eq!(StatisticalImputer::mode_value(&column), Some(Cell::Number(2.0)));
    }

    #[test]
    fn test_fill_missing_counts() {
        let (cells, filled) =
            StatisticalImputer::fill_missing(&[Cell::Missing, Cell::Number(1.0), Cell::Missing], &Cell::Number(0.0));
        assert_eq!(filled, 2);
        assert_eq!(cells, vec![Cell::Number(0.0), Cell::Number(1.0), Cell::Number(0.0)]);
    }
}
