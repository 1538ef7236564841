use crate::dataset::Dataset;
use crate::value::Cell;

/// Direction for carrying values into missing cells.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CarryDirection {
    Forward,
    Backward,
}

/// Positional fills and row removal.
pub struct FillImputer;

impl FillImputer {
    /// Replace each missing cell with the nearest present value before it
    /// (`Forward`) or after it (`Backward`). Cells with no such neighbour stay
    /// missing.
    pub fn carry(cells: &[Cell], direction: CarryDirection) -> Vec<Cell> {
        match direction {
            CarryDirection::Forward => Self::carry_forward(cells),
            CarryDirection::Backward => Self::carry_backward(cells),
        }
    }

    pub fn carry_forward(cells: &[Cell]) -> Vec<Cell> {
        let mut last: Option<&Cell> = None;
        cells
            .iter()
            .map(|cell| {
                if cell.is_missing() {
                    last.cloned().unwrap_or(Cell::Missing)
                } else {
                    last = Some(cell);
                    cell.clone()
                }
            })
            .collect()
    }

    pub fn carry_backward(cells: &[Cell]) -> Vec<Cell> {
        let mut next: Option<&Cell> = None;
        let mut out: Vec<Cell> = cells
            .iter()
            .rev()
            .map(|cell| {
                if cell.is_missing() {
                    next.cloned().unwrap_or(Cell::Missing)
                } else {
                    next = Some(cell);
                    cell.clone()
                }
            })
            .collect();
        out.reverse();
        out
    }

    /// `true` for rows with no missing cell in any of the given columns.
    pub fn complete_rows(dataset: &Dataset, columns: &[usize]) -> Vec<bool> {
        let columns: Vec<&[Cell]> = columns
            .iter()
            .filter_map(|&index| dataset.columns().get(index))
            .map(|column| column.cells())
            .collect();
        (0..dataset.n_rows())
            .map(|row| columns.iter().all(|cells| !cells[row].is_missing()))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::Column;
    use pretty_assertions::assert_eq;

    fn cells(values: &[Option<f64>]) -> Vec<Cell> {
        values.iter().map(|v| Cell::from(*v)).collect()
    }

    #[test]
    fn test_carry_forward_keeps_leading_missing() {
        let out = FillImputer::carry_forward(&cells(&[None, Some(1.0), None, Some(3.0)]));
        assert_eq!(out, cells(&[None, Some(1.0), Some(1.0), Some(3.0)]));
    }

    #[test]
    fn test_carry_backward_after_forward() {
        let forward = FillImputer::carry(&cells(&[None, Some(1.0), None, Some(3.0)]), CarryDirection::Forward);
        let backward = FillImputer::carry(&forward, CarryDirection::Backward);
        assert_eq!(backward, cells(&[Some(1.0), Some(1.0), Some(1.0), Some(3.0)]));
    }

    #[test]
    fn test_carry_backward_keeps_trailing_missing() {
        let out = FillImputer::carry_backward(&cells(&[Some(1.0), None, Some(2.0), None]));
        assert_eq!(out, cells(&[Some(1.0), Some(2.0), Some(2.0), None]));
    }

    #[test]
    fn test_complete_rows_any_targeted_missing() {
        let dataset = Dataset::new(vec![
            Column::from_numbers("a", &[Some(1.0), None, Some(3.0)]),
            Column::from_numbers("b", &[Some(1.0), Some(2.0), None]),
            Column::from_numbers("c", &[None, None, None]),
        ])
        .unwrap();

        assert_eq!(FillImputer::complete_rows(&dataset, &[0, 1]), vec![true, false, false]);
        assert_eq!(FillImputer::complete_rows(&dataset, &[0]), vec![true, false, true]);
        assert_eq!(FillImputer::complete_rows(&dataset, &[]), vec![true, true, true]);
    }
}
