//! Columnar dataset model.
//!
//! A [`Dataset`] is an ordered list of uniquely named [`Column`]s of equal
//! length. Cells live behind an `Arc`, so a stage that rewrites one column
//! shares every other column with its input.

use crate::error::{PrepError, Result};
use crate::value::{classify_with, is_missing_token, parse_number, temporal, Cell, CoercionOptions, DateFormat};
use indexmap::IndexSet;
use serde_json::{Map, Value};
use std::collections::HashSet;
use std::sync::Arc;

/// Cap on the number of text values examined when resolving a column's
/// date pattern.
const DATE_FORMAT_SAMPLE: usize = 100;

/// A named, ordered sequence of cells.
#[derive(Debug, Clone, PartialEq)]
pub struct Column {
    name: String,
    cells: Arc<Vec<Cell>>,
    date_format: Option<DateFormat>,
}

impl Column {
    pub fn new(name: impl Into<String>, cells: Vec<Cell>) -> Self {
        Self {
            name: name.into(),
            cells: Arc::new(cells),
            date_format: None,
        }
    }

    /// Numeric column; `None` entries are missing.
    pub fn from_numbers(name: impl Into<String>, values: &[Option<f64>]) -> Self {
        Self::new(name, values.iter().map(|v| Cell::from(*v)).collect())
    }

    /// Column from raw values, coerced with column-level date resolution.
    pub fn from_raw(name: impl Into<String>, raw: &[Value], options: &CoercionOptions) -> Self {
        let resolved = match options.date_format {
            DateFormat::Auto => resolve_date_format(raw, options),
            explicit => Some(explicit),
        };

        let cells: Vec<Cell> = match (options.date_format, resolved) {
            (DateFormat::Auto, Some(format)) => {
                let preferred = CoercionOptions {
                    date_format: format,
                    ..options.clone()
                };
                raw.iter()
                    .map(|value| match classify_with(value, &preferred) {
                        Cell::Text(_) => classify_with(value, options),
                        cell => cell,
                    })
                    .collect()
            }
            _ => raw.iter().map(|value| classify_with(value, options)).collect(),
        };

        let has_timestamps = cells.iter().any(|c| matches!(c, Cell::Timestamp(_)));
        Self {
            name: name.into(),
            cells: Arc::new(cells),
            date_format: resolved.filter(|_| has_timestamps),
        }
    }

    pub fn with_date_format(mut self, format: DateFormat) -> Self {
        self.date_format = Some(format);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn cells(&self) -> &[Cell] {
        &self.cells
    }

    /// Date pattern resolved for this column at ingestion.
    pub fn date_format(&self) -> Option<DateFormat> {
        self.date_format
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    pub fn missing_count(&self) -> usize {
        self.cells.iter().filter(|c| c.is_missing()).count()
    }

    /// Same name and date pattern, new cells.
    pub fn with_cells(&self, cells: Vec<Cell>) -> Self {
        Self {
            name: self.name.clone(),
            cells: Arc::new(cells),
            date_format: self.date_format,
        }
    }
}

/// Pick the best date pattern for the text values of a raw column.
fn resolve_date_format(raw: &[Value], options: &CoercionOptions) -> Option<DateFormat> {
    let samples: Vec<&str> = raw
        .iter()
        .filter_map(|value| match value {
            Value::String(s) => Some(s.trim()),
            _ => None,
        })
        .filter(|s| {
            !is_missing_token(s)
                && !s.eq_ignore_ascii_case("true")
                && !s.eq_ignore_ascii_case("false")
                && parse_number(s, options.decimal_separator).is_none()
        })
        .take(DATE_FORMAT_SAMPLE)
        .collect();

    temporal::infer_date_format(&samples).map(|(format, _)| format)
}

/// An ordered collection of equal-length columns.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Dataset {
    columns: Vec<Column>,
    n_rows: usize,
}

impl Dataset {
    /// Build a dataset, rejecting duplicate names and unequal lengths.
    pub fn new(columns: Vec<Column>) -> Result<Self> {
        let mut seen = HashSet::new();
        for column in &columns {
            if !seen.insert(column.name()) {
                return Err(PrepError::schema(
                    Some(column.name()),
                    format!("duplicate column name '{}'", column.name()),
                ));
            }
        }

        let n_rows = columns.first().map_or(0, Column::len);
        if let Some(column) = columns.iter().find(|c| c.len() != n_rows) {
            return Err(PrepError::schema(
                Some(column.name()),
                format!(
                    "column '{}' has {} cells, expected {}",
                    column.name(),
                    column.len(),
                    n_rows
                ),
            ));
        }

        Ok(Self { columns, n_rows })
    }

    /// Dataset from rows of records. Absent keys are missing; columns follow
    /// first appearance.
    pub fn from_records(records: &[Map<String, Value>], options: &CoercionOptions) -> Result<Self> {
        let names: IndexSet<&String> = records.iter().flat_map(|record| record.keys()).collect();

        let columns = names
            .into_iter()
            .map(|name| {
                let raw: Vec<Value> = records
                    .iter()
                    .map(|record| record.get(name).cloned().unwrap_or(Value::Null))
                    .collect();
                Column::from_raw(name.as_str(), &raw, options)
            })
            .collect();

        Self::new(columns)
    }

    /// Dataset from column names plus rows of arrays.
    pub fn from_rows(names: Vec<String>, rows: &[Vec<Value>], options: &CoercionOptions) -> Result<Self> {
        if let Some((index, row)) = rows.iter().enumerate().find(|(_, row)| row.len() != names.len()) {
            return Err(PrepError::schema(
                None,
                format!("row {} has {} values, expected {}", index, row.len(), names.len()),
            ));
        }

        let raw_columns = (0..names.len())
            .map(|i| rows.iter().map(|row| row[i].clone()).collect())
            .collect();
        Self::from_raw_columns(names, raw_columns, options)
    }

    /// Dataset from column names plus raw column values.
    pub fn from_raw_columns(
        names: Vec<String>,
        raw_columns: Vec<Vec<Value>>,
        options: &CoercionOptions,
    ) -> Result<Self> {
        if names.len() != raw_columns.len() {
            return Err(PrepError::schema(
                None,
                format!("{} column names for {} columns", names.len(), raw_columns.len()),
            ));
        }

        let columns = names
            .into_iter()
            .zip(raw_columns)
            .map(|(name, raw)| Column::from_raw(name, &raw, options))
            .collect();
        Self::new(columns)
    }

    /// Rows of records, keys in column order.
    pub fn to_records(&self) -> Vec<Map<String, Value>> {
        (0..self.n_rows)
            .map(|row| {
                self.columns
                    .iter()
                    .map(|column| (column.name().to_string(), column.cells()[row].to_json()))
                    .collect()
            })
            .collect()
    }

    /// Column names plus rows of arrays.
    pub fn to_rows(&self) -> (Vec<String>, Vec<Vec<Value>>) {
        let names = self.column_names().into_iter().map(str::to_string).collect();
        let rows = (0..self.n_rows)
            .map(|row| self.columns.iter().map(|c| c.cells()[row].to_json()).collect())
            .collect();
        (names, rows)
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.name() == name)
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c.name() == name)
    }

    pub fn column_names(&self) -> Vec<&str> {
        self.columns.iter().map(Column::name).collect()
    }

    pub fn n_rows(&self) -> usize {
        self.n_rows
    }

    pub fn n_columns(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.n_rows == 0
    }

    /// Total number of cells.
    pub fn cell_count(&self) -> usize {
        self.n_rows * self.columns.len()
    }

    pub fn missing_count(&self) -> usize {
        self.columns.iter().map(Column::missing_count).sum()
    }

    /// Cells of row `index`, in column order.
    pub fn record(&self, index: usize) -> Option<Vec<&Cell>> {
        (index < self.n_rows).then(|| self.columns.iter().map(|c| &c.cells()[index]).collect())
    }

    /// Keep the named columns, in the given order.
    pub fn select(&self, names: &[String]) -> Result<Self> {
        let columns = names
            .iter()
            .map(|name| {
                self.column(name)
                    .cloned()
                    .ok_or_else(|| PrepError::schema(Some(name), format!("column '{}' not found", name)))
            })
            .collect::<Result<Vec<_>>>()?;
        Self::new(columns)
    }

    /// Keep the rows whose mask entry is `true`.
    pub fn filter_rows(&self, keep: &[bool]) -> Self {
        let indices: Vec<usize> = keep
            .iter()
            .enumerate()
            .filter_map(|(i, keep)| keep.then_some(i))
            .collect();
        self.take_rows(&indices)
    }

    /// New dataset made of the given rows, in the given order.
    pub fn take_rows(&self, indices: &[usize]) -> Self {
        let indices: Vec<usize> = indices.iter().copied().filter(|&i| i < self.n_rows).collect();
        let columns = self
            .columns
            .iter()
            .map(|column| column.with_cells(indices.iter().map(|&i| column.cells()[i].clone()).collect()))
            .collect();
        Self {
            columns,
            n_rows: indices.len(),
        }
    }

    /// Replace whole columns by index; untouched columns are shared.
    pub fn replace_columns(&self, updates: Vec<(usize, Vec<Cell>)>) -> Result<Self> {
        let mut columns = self.columns.clone();
        for (index, cells) in updates {
            let column = columns.get_mut(index).ok_or_else(|| {
                PrepError::schema(None, format!("column index {} out of range", index))
            })?;
            *column = column.with_cells(cells);
        }
        Self::new(columns).map(|mut dataset| {
            if dataset.columns.is_empty() {
                dataset.n_rows = self.n_rows;
            }
            dataset
        })
    }

    /// Check that every column has exactly `n_rows` cells.
    pub fn check_consistency(&self) -> Result<()> {
        match self.columns.iter().find(|c| c.len() != self.n_rows) {
            Some(column) => Err(PrepError::schema(
                Some(column.name()),
                format!(
                    "column '{}' has {} cells, expected {}",
                    column.name(),
                    column.len(),
                    self.n_rows
                ),
            )),
            None => Ok(()),
        }
    }
}
