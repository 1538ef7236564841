//! Dataset import and export.
//!
//! Files are read into a [`RawTable`] of uncoerced JSON values, trimmed
//! according to [`ImportOptions`], and only then coerced into a [`Dataset`].
//! The format is picked from the file extension: `.csv`, `.tsv` and `.txt`
//! are delimited text, `.json` is JSON.

mod csv;
mod json;

pub use self::csv::{read_csv, read_csv_str, write_csv, write_csv_string};
pub use self::json::{read_json, read_json_str, write_json, write_json_string, JsonShape};

use crate::config::ImportOptions;
use crate::dataset::Dataset;
use crate::error::{PrepError, Result};
use crate::value::is_missing_token;
use serde_json::Value;
use std::path::Path;
use tracing::debug;

/// Supported file formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileFormat {
    Csv,
    Json,
}

impl FileFormat {
    /// Format for a path, from its extension.
    pub fn from_path(path: &Path) -> Result<Self> {
        let extension = path
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_ascii_lowercase);
        match extension.as_deref() {
            Some("csv" | "tsv" | "txt") => Ok(Self::Csv),
            Some("json") => Ok(Self::Json),
            _ => Err(PrepError::Input(format!(
                "cannot tell the format of '{}', expected a .csv, .tsv, .txt or .json file",
                path.display()
            ))),
        }
    }
}

/// Column names plus raw column values, before coercion.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct RawTable {
    pub names: Vec<String>,
    pub columns: Vec<Vec<Value>>,
}

impl RawTable {
    pub fn n_rows(&self) -> usize {
        self.columns.first().map_or(0, Vec::len)
    }

    /// Apply the row and column options, then coerce every value.
    ///
    /// Empty rows are skipped before `max_rows` is applied, so `max_rows`
    /// counts kept rows.
    pub fn into_dataset(self, options: &ImportOptions) -> Result<Dataset> {
        options.validate()?;

        let mut table = self;
        if options.skip_empty_rows {
            table = table.without_empty_rows();
        }
        if let Some(max_rows) = options.max_rows {
            table = table.truncated(max_rows);
        }
        if let Some(selected) = &options.selected_columns {
            table = table.select(selected)?;
        }

        debug!(
            "Coercing {} rows x {} columns",
            table.n_rows(),
            table.names.len()
        );
        Dataset::from_raw_columns(table.names, table.columns, &options.coercion())
    }

    fn without_empty_rows(self) -> Self {
        let keep: Vec<bool> = (0..self.n_rows())
            .map(|row| !self.columns.iter().all(|column| is_blank(&column[row])))
            .collect();
        if keep.iter().all(|k| *k) {
            return self;
        }
        let columns = self
            .columns
            .into_iter()
            .map(|column| {
                column
                    .into_iter()
                    .zip(&keep)
                    .filter_map(|(value, keep)| keep.then_some(value))
                    .collect()
            })
            .collect();
        Self {
            names: self.names,
            columns,
        }
    }

    fn truncated(mut self, max_rows: usize) -> Self {
        for column in &mut self.columns {
            column.truncate(max_rows);
        }
        self
    }

    fn select(mut self, selected: &[String]) -> Result<Self> {
        if let Some(name) = selected.iter().enumerate().find_map(|(i, n)| selected[..i].contains(n).then_some(n)) {
            return Err(PrepError::schema(Some(name), format!("column '{}' selected twice", name)));
        }
        let mut columns = Vec::with_capacity(selected.len());
        for name in selected {
            let index = self
                .names
                .iter()
                .position(|n| n == name)
                .ok_or_else(|| PrepError::schema(Some(name), format!("selected column '{}' not found", name)))?;
            columns.push(std::mem::take(&mut self.columns[index]));
        }
        Ok(Self {
            names: selected.to_vec(),
            columns,
        })
    }
}

fn is_blank(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(s) => is_missing_token(s),
        _ => false,
    }
}

/// Read a dataset from a CSV or JSON file.
pub fn read_dataset(path: impl AsRef<Path>, options: &ImportOptions) -> Result<Dataset> {
    let path = path.as_ref();
    match FileFormat::from_path(path)? {
        FileFormat::Csv => read_csv(path, options),
        FileFormat::Json => read_json(path, options),
    }
}

/// Write a dataset as CSV or JSON records, by file extension.
pub fn write_dataset(dataset: &Dataset, path: impl AsRef<Path>) -> Result<()> {
    let path = path.as_ref();
    match FileFormat::from_path(path)? {
        FileFormat::Csv => write_csv(dataset, path, b','),
        FileFormat::Json => write_json(dataset, path, JsonShape::Records),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::Cell;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn table() -> RawTable {
        RawTable {
            names: vec!["a".to_string(), "b".to_string()],
            columns: vec![
                vec![json!("1"), json!(""), json!("3"), json!("4")],
                vec![json!("x"), Value::Null, json!(" "), json!("z")],
            ],
        }
    }

    #[test]
    fn test_skip_empty_rows_before_max_rows() {
        let options = ImportOptions::builder().max_rows(2).build().unwrap();
        let dataset = table().into_dataset(&options).unwrap();

        assert_eq!(dataset.n_rows(), 2);
        assert_eq!(dataset.columns()[0].cells(), &[Cell::Number(1.0), Cell::Number(3.0)]);
    }

    #[test]
    fn test_keep_empty_rows() {
        let options = ImportOptions::builder().skip_empty_rows(false).build().unwrap();
        let dataset = table().into_dataset(&options).unwrap();
        assert_eq!(dataset.n_rows(), 4);
        assert_eq!(dataset.missing_count(), 3);
    }

    #[test]
    fn test_select_columns_reorders() {
        let options = ImportOptions::builder().select_columns(["b", "a"]).build().unwrap();
        let dataset = table().into_dataset(&options).unwrap();
        assert_eq!(dataset.column_names(), vec!["b", "a"]);
    }

    #[test]
    fn test_select_unknown_column() {
        let options = ImportOptions::builder().select_columns(["c"]).build().unwrap();
        let error = table().into_dataset(&options).unwrap_err();
        assert_eq!(error.error_code(), "SCHEMA_ERROR");
        assert_eq!(error.column(), Some("c"));
    }

    #[test]
    fn test_format_from_extension() {
        assert_eq!(FileFormat::from_path(Path::new("data.CSV")).unwrap(), FileFormat::Csv);
        assert_eq!(FileFormat::from_path(Path::new("data.json")).unwrap(), FileFormat::Json);
        let error = FileFormat::from_path(Path::new("data.parquet")).unwrap_err();
        assert_eq!(error.error_code(), "INPUT_ERROR");
    }
}
