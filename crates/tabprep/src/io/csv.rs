//! Delimited text through the polars CSV reader and writer.
//!
//! Every field is read as text (no schema inference) so that values are
//! coerced by the crate's own rules rather than polars' dtypes.

use super::RawTable;
use crate::config::{Encoding, ImportOptions};
use crate::dataset::Dataset;
use crate::error::{PrepError, Result, ResultExt};
use polars::prelude::*;
use serde_json::Value;
use std::fs::File;
use std::io::Cursor;
use std::path::Path;
use tracing::info;

fn read_options(options: &ImportOptions) -> CsvReadOptions {
    let encoding = match options.encoding {
        Encoding::Utf8 => CsvEncoding::Utf8,
        Encoding::LossyUtf8 => CsvEncoding::LossyUtf8,
    };
    CsvReadOptions::default()
        .with_has_header(options.has_header)
        .with_infer_schema_length(Some(0))
        .with_parse_options(
            CsvParseOptions::default()
                .with_separator(options.delimiter_byte())
                .with_quote_char(Some(b'"'))
                .with_encoding(encoding),
        )
}

/// Read a CSV file.
pub fn read_csv(path: impl AsRef<Path>, options: &ImportOptions) -> Result<Dataset> {
    let path = path.as_ref();
    options.validate()?;
    let df = read_options(options)
        .try_into_reader_with_file_path(Some(path.to_path_buf()))
        .context(format!("Failed to open {}", path.display()))?
        .finish()
        .map_err(|e| PrepError::Input(format!("{}: {}", path.display(), e)))?;

    let dataset = raw_table(&df)?.into_dataset(options)?;
    info!(
        "Loaded {}: {} rows x {} columns",
        path.display(),
        dataset.n_rows(),
        dataset.n_columns()
    );
    Ok(dataset)
}

/// Read CSV text held in memory.
pub fn read_csv_str(text: &str, options: &ImportOptions) -> Result<Dataset> {
    options.validate()?;
    let df = read_options(options)
        .into_reader_with_file_handle(Cursor::new(text.as_bytes().to_vec()))
        .finish()
        .map_err(|e| PrepError::Input(e.to_string()))?;
    raw_table(&df)?.into_dataset(options)
}

fn raw_table(df: &DataFrame) -> Result<RawTable> {
    let mut table = RawTable::default();
    for column in df.get_columns() {
        let text = column.cast(&DataType::String)?;
        let values = text
            .as_materialized_series()
            .str()?
            .into_iter()
            .map(|value| value.map_or(Value::Null, |s| Value::String(s.to_string())))
            .collect();
        table.names.push(column.name().to_string());
        table.columns.push(values);
    }
    Ok(table)
}

fn data_frame(dataset: &Dataset) -> Result<DataFrame> {
    let columns = dataset
        .columns()
        .iter()
        .map(|column| {
            let values: Vec<Option<String>> = column.cells().iter().map(|cell| cell.to_plain_string()).collect();
            Series::new(column.name().into(), values).into_column()
        })
        .collect();
    Ok(DataFrame::new(columns)?)
}

/// Write a dataset as CSV with a header line. Missing cells are empty fields.
pub fn write_csv(dataset: &Dataset, path: impl AsRef<Path>, delimiter: u8) -> Result<()> {
    let path = path.as_ref();
    let mut df = data_frame(dataset)?;
    let mut file = File::create(path)
        .map_err(PrepError::from)
        .context(format!("Failed to create {}", path.display()))?;

    CsvWriter::new(&mut file)
        .include_header(true)
        .with_separator(delimiter)
        .with_quote_char(b'"')
        .finish(&mut df)
        .context(format!("Failed to write {}", path.display()))?;

    info!("Dataset saved: {}", path.display());
    Ok(())
}

/// Render a dataset as CSV text.
pub fn write_csv_string(dataset: &Dataset, delimiter: u8) -> Result<String> {
    let mut df = data_frame(dataset)?;
    let mut buffer = Vec::new();
    CsvWriter::new(&mut buffer)
        .include_header(true)
        .with_separator(delimiter)
        .finish(&mut df)?;
    String::from_utf8(buffer).map_err(|e| PrepError::Input(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::{Cell, DecimalSeparator};
    use pretty_assertions::assert_eq;

    #[test]
    fn test_read_csv_str_coerces_cells() {
        let text = "id,price,when,flag\n1,9.5,2024-01-02,true\n2,,2024-01-03,false\n";
        let dataset = read_csv_str(text, &ImportOptions::default()).unwrap();

        assert_eq!(dataset.column_names(), vec!["id", "price", "when", "flag"]);
        assert_eq!(dataset.n_rows(), 2);
        assert_eq!(dataset.columns()[1].cells(), &[Cell::Number(9.5), Cell::Missing]);
        assert!(matches!(dataset.columns()[2].cells()[0], Cell::Timestamp(_)));
        assert_eq!(dataset.columns()[3].cells()[1], Cell::Boolean(false));
    }

    #[test]
    fn test_semicolon_and_decimal_comma() {
        let text = "name;amount\n\"a\";\"1,5\"\n\"b\";\"2,25\"\n";
        let options = ImportOptions::builder().delimiter(';').decimal_comma().build().unwrap();
        let dataset = read_csv_str(text, &options).unwrap();

        assert_eq!(options.decimal_separator, Some(DecimalSeparator::Comma));
        assert_eq!(dataset.columns()[1].cells(), &[Cell::Number(1.5), Cell::Number(2.25)]);
    }

    #[test]
    fn test_no_header() {
        let options = ImportOptions::builder().has_header(false).build().unwrap();
        let dataset = read_csv_str("1,2\n3,4\n", &options).unwrap();
        assert_eq!(dataset.n_rows(), 2);
        assert_eq!(dataset.n_columns(), 2);
    }

    #[test]
    fn test_file_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("data.csv");
        let dataset = read_csv_str("x,label\n1,a\n,b\n3.5,\n", &ImportOptions::default()).unwrap();

        write_csv(&dataset, &path, b',').unwrap();
        let back = read_csv(&path, &ImportOptions::default()).unwrap();
        assert_eq!(back, dataset);
    }

    #[test]
    fn test_missing_file_is_error() {
        let error = read_csv("/definitely/not/here.csv", &ImportOptions::default()).unwrap_err();
        assert!(error.to_string().contains("here.csv"));
    }
}
