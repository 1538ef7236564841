//! JSON datasets: an array of records, or `{ "columns": [...], "rows": [[...]] }`.

use super::RawTable;
use crate::config::ImportOptions;
use crate::dataset::Dataset;
use crate::error::{PrepError, Result, ResultExt};
use indexmap::IndexSet;
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use std::fs;
use std::path::Path;
use tracing::info;

/// Layout of a JSON dataset document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JsonShape {
    /// `[{"a": 1, "b": "x"}, ...]`
    #[default]
    Records,
    /// `{"columns": ["a", "b"], "rows": [[1, "x"], ...]}`
    Rows,
}

/// Read a JSON dataset file.
pub fn read_json(path: impl AsRef<Path>, options: &ImportOptions) -> Result<Dataset> {
    let path = path.as_ref();
    let text = fs::read_to_string(path)
        .map_err(PrepError::from)
        .context(format!("Failed to read {}", path.display()))?;
    let dataset = read_json_str(&text, options)?;
    info!(
        "Loaded {}: {} rows x {} columns",
        path.display(),
        dataset.n_rows(),
        dataset.n_columns()
    );
    Ok(dataset)
}

/// Read a JSON dataset document held in memory.
pub fn read_json_str(text: &str, options: &ImportOptions) -> Result<Dataset> {
    let document: Value =
        serde_json::from_str(text).map_err(|e| PrepError::Input(format!("invalid JSON: {}", e)))?;
    let table = match document {
        Value::Array(records) => records_table(records)?,
        Value::Object(object) => rows_table(object)?,
        _ => {
            return Err(PrepError::Input(
                "expected an array of records or an object with 'columns' and 'rows'".to_string(),
            ));
        }
    };
    table.into_dataset(options)
}

fn records_table(records: Vec<Value>) -> Result<RawTable> {
    let records = records
        .into_iter()
        .enumerate()
        .map(|(index, record)| match record {
            Value::Object(fields) => Ok(fields),
            other => Err(PrepError::Input(format!(
                "record {} is not an object: {}",
                index, other
            ))),
        })
        .collect::<Result<Vec<Map<String, Value>>>>()?;

    let names: IndexSet<String> = records.iter().flat_map(|r| r.keys().cloned()).collect();
    let columns = names
        .iter()
        .map(|name| {
            records
                .iter()
                .map(|record| record.get(name).cloned().unwrap_or(Value::Null))
                .collect()
        })
        .collect();
    Ok(RawTable {
        names: names.into_iter().collect(),
        columns,
    })
}

fn rows_table(mut object: Map<String, Value>) -> Result<RawTable> {
    let names = match object.remove("columns") {
        Some(Value::Array(names)) => names
            .into_iter()
            .map(|name| match name {
                Value::String(name) => Ok(name),
                other => Err(PrepError::Input(format!("column name {} is not a string", other))),
            })
            .collect::<Result<Vec<String>>>()?,
        _ => return Err(PrepError::Input("'columns' must be an array of names".to_string())),
    };
    let rows = match object.remove("rows") {
        Some(Value::Array(rows)) => rows,
        _ => return Err(PrepError::Input("'rows' must be an array of arrays".to_string())),
    };
    if let Some(key) = object.keys().next() {
        return Err(PrepError::Input(format!("unexpected key '{}'", key)));
    }

    let mut columns: Vec<Vec<Value>> = vec![Vec::with_capacity(rows.len()); names.len()];
    for (index, row) in rows.into_iter().enumerate() {
        let Value::Array(values) = row else {
            return Err(PrepError::Input(format!("row {} is not an array", index)));
        };
        if values.len() != names.len() {
            return Err(PrepError::Input(format!(
                "row {} has {} values, expected {}",
                index,
                values.len(),
                names.len()
            )));
        }
        for (column, value) in columns.iter_mut().zip(values) {
            column.push(value);
        }
    }
    Ok(RawTable { names, columns })
}

/// Render a dataset as pretty-printed JSON.
pub fn write_json_string(dataset: &Dataset, shape: JsonShape) -> Result<String> {
    let document = match shape {
        JsonShape::Records => Value::Array(dataset.to_records().into_iter().map(Value::Object).collect()),
        JsonShape::Rows => {
            let (columns, rows) = dataset.to_rows();
            json!({ "columns": columns, "rows": rows })
        }
    };
    Ok(serde_json::to_string_pretty(&document)?)
}

/// Write a dataset as a JSON file.
pub fn write_json(dataset: &Dataset, path: impl AsRef<Path>, shape: JsonShape) -> Result<()> {
    let path = path.as_ref();
    fs::write(path, write_json_string(dataset, shape)?)
        .map_err(PrepError::from)
        .context(format!("Failed to write {}", path.display()))?;
    info!("Dataset saved: {}", path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::Cell;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_records_and_rows_give_same_dataset() {
        let options = ImportOptions::default();
        let records = read_json_str(r#"[{"a": 1, "b": "x"}, {"b": "y"}, {"a": 3, "c": true}]"#, &options).unwrap();
        let rows = read_json_str(
            r#"{"columns": ["a", "b", "c"], "rows": [[1, "x", null], [null, "y", null], [3, null, true]]}"#,
            &options,
        )
        .unwrap();

        assert_eq!(records, rows);
        assert_eq!(records.column_names(), vec!["a", "b", "c"]);
        assert_eq!(records.columns()[0].cells()[1], Cell::Missing);
    }

    #[test]
    fn test_rejects_ragged_rows() {
        let error = read_json_str(r#"{"columns": ["a"], "rows": [[1, 2]]}"#, &ImportOptions::default()).unwrap_err();
        assert_eq!(error.error_code(), "INPUT_ERROR");
    }

    #[test]
    fn test_rejects_scalar_records() {
        let error = read_json_str("[1, 2]", &ImportOptions::default()).unwrap_err();
        assert_eq!(error.error_code(), "INPUT_ERROR");
        assert!(read_json_str("not json", &ImportOptions::default()).is_err());
    }

    #[test]
    fn test_write_both_shapes() {
        let dataset = read_json_str(r#"[{"a": 1.5, "b": null}]"#, &ImportOptions::default()).unwrap();

        let records: Value = serde_json::from_str(&write_json_string(&dataset, JsonShape::Records).unwrap()).unwrap();
        assert_eq!(records, json!([{"a": 1.5, "b": null}]));

        let rows: Value = serde_json::from_str(&write_json_string(&dataset, JsonShape::Rows).unwrap()).unwrap();
        assert_eq!(rows, json!({"columns": ["a", "b"], "rows": [[1.5, null]]}));
    }

    #[test]
    fn test_file_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("data.json");
        let dataset = read_json_str(r#"[{"a": 1, "b": "x"}, {"a": null, "b": "y"}]"#, &ImportOptions::default())
            .unwrap();

        write_json(&dataset, &path, JsonShape::Rows).unwrap();
        assert_eq!(read_json(&path, &ImportOptions::default()).unwrap(), dataset);
    }
}
