//! Configuration types for profiling, reporting and dataset import.
//!
//! Every options struct has a builder with a fluent API. Builders validate
//! on `build()`, so a built value is always usable.

use crate::error::PrepError;
use crate::value::{CoercionOptions, DateFormat, DecimalSeparator};
use serde::{Deserialize, Serialize};

/// Default IQR fence multiplier.
pub const DEFAULT_FENCE_MULTIPLIER: f64 = 1.5;
/// Default number of most frequent values kept for categorical columns.
pub const DEFAULT_TOP_K: usize = 5;
/// Default number of non-missing values examined for type inference.
pub const DEFAULT_INFERENCE_SAMPLE: usize = 100;
/// Default seed for deterministic sampling.
pub const DEFAULT_SEED: u64 = 42;

/// Options for profiling a single column.
///
/// # Example
///
/// ```rust
/// use tabprep::config::ProfileOptions;
///
/// let options = ProfileOptions::builder()
///     .fence_multiplier(3.0)
///     .top_k(10)
///     .build()
///     .unwrap();
/// assert_eq!(options.top_k, 10);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProfileOptions {
    /// Multiplier `k` of the IQR fences `[q1 - k*iqr, q3 + k*iqr]`.
    /// Default: 1.5
    pub fence_multiplier: f64,

    /// Number of most frequent values reported for categorical columns.
    /// Default: 5
    pub top_k: usize,

    /// Number of values statistics are computed over. `None` uses all values.
    /// Default: None
    pub sample_size: Option<usize>,

    /// Number of non-missing values examined for type inference.
    /// Default: 100
    pub inference_sample: usize,

    /// Seed for sampling when a column has more values than a sample size.
    /// Default: 42
    pub seed: u64,
}

impl Default for ProfileOptions {
    fn default() -> Self {
        Self {
            fence_multiplier: DEFAULT_FENCE_MULTIPLIER,
            top_k: DEFAULT_TOP_K,
            sample_size: None,
            inference_sample: DEFAULT_INFERENCE_SAMPLE,
            seed: DEFAULT_SEED,
        }
    }
}

impl ProfileOptions {
    pub fn builder() -> ProfileOptionsBuilder {
        ProfileOptionsBuilder::default()
    }

    pub fn validate(&self) -> Result<(), ConfigValidationError> {
        if !self.fence_multiplier.is_finite() || self.fence_multiplier <= 0.0 {
            return Err(ConfigValidationError::InvalidFenceMultiplier(
                self.fence_multiplier,
            ));
        }
        if self.top_k == 0 {
            return Err(ConfigValidationError::InvalidTopK(self.top_k));
        }
        if self.sample_size == Some(0) {
            return Err(ConfigValidationError::InvalidSampleSize {
                field: "sample_size".to_string(),
            });
        }
        if self.inference_sample == 0 {
            return Err(ConfigValidationError::InvalidSampleSize {
                field: "inference_sample".to_string(),
            });
        }
        Ok(())
    }
}

/// Builder for [`ProfileOptions`].
#[derive(Debug, Default)]
pub struct ProfileOptionsBuilder {
    fence_multiplier: Option<f64>,
    top_k: Option<usize>,
    sample_size: Option<usize>,
    inference_sample: Option<usize>,
    seed: Option<u64>,
}

impl ProfileOptionsBuilder {
    pub fn fence_multiplier(mut self, k: f64) -> Self {
        self.fence_multiplier = Some(k);
        self
    }

    pub fn top_k(mut self, k: usize) -> Self {
        self.top_k = Some(k);
        self
    }

    /// Compute statistics over a seeded sample of this many values.
    pub fn sample_size(mut self, size: usize) -> Self {
        self.sample_size = Some(size);
        self
    }

    pub fn inference_sample(mut self, size: usize) -> Self {
        self.inference_sample = Some(size);
        self
    }

    pub fn seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    pub fn build(self) -> Result<ProfileOptions, ConfigValidationError> {
        let options = ProfileOptions {
            fence_multiplier: self.fence_multiplier.unwrap_or(DEFAULT_FENCE_MULTIPLIER),
            top_k: self.top_k.unwrap_or(DEFAULT_TOP_K),
            sample_size: self.sample_size,
            inference_sample: self.inference_sample.unwrap_or(DEFAULT_INFERENCE_SAMPLE),
            seed: self.seed.unwrap_or(DEFAULT_SEED),
        };
        options.validate()?;
        Ok(options)
    }
}

/// Options for building a quality report.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReportOptions {
    pub profile: ProfileOptions,

    /// Time column associated with the dataset. When set, every column is
    /// a candidate for carry-last imputation.
    /// Default: None
    pub time_column: Option<String>,

    /// Compare text cells after trimming when counting duplicate records.
    /// Default: true
    pub trim_text: bool,
}

impl Default for ReportOptions {
    fn default() -> Self {
        Self {
            profile: ProfileOptions::default(),
            time_column: None,
            trim_text: true,
        }
    }
}

impl ReportOptions {
    pub fn builder() -> ReportOptionsBuilder {
        ReportOptionsBuilder::default()
    }

    pub fn validate(&self) -> Result<(), ConfigValidationError> {
        self.profile.validate()?;
        if let Some(column) = &self.time_column {
            if column.trim().is_empty() {
                return Err(ConfigValidationError::EmptyColumnName {
                    field: "time_column".to_string(),
                });
            }
        }
        Ok(())
    }
}

/// Builder for [`ReportOptions`].
#[derive(Debug, Default)]
pub struct ReportOptionsBuilder {
    profile: Option<ProfileOptions>,
    time_column: Option<String>,
    trim_text: Option<bool>,
}

impl ReportOptionsBuilder {
    pub fn profile(mut self, profile: ProfileOptions) -> Self {
        self.profile = Some(profile);
        self
    }

    pub fn time_column(mut self, column: impl Into<String>) -> Self {
        self.time_column = Some(column.into());
        self
    }

    /// Strict duplicate detection compares text exactly.
    pub fn trim_text(mut self, trim: bool) -> Self {
        self.trim_text = Some(trim);
        self
    }

    pub fn build(self) -> Result<ReportOptions, ConfigValidationError> {
        let options = ReportOptions {
            profile: self.profile.unwrap_or_default(),
            time_column: self.time_column,
            trim_text: self.trim_text.unwrap_or(true),
        };
        options.validate()?;
        Ok(options)
    }
}

/// Text encoding of an input file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Encoding {
    /// Strict UTF-8; invalid bytes fail the import.
    #[default]
    #[serde(rename = "utf8")]
    Utf8,
    /// Invalid UTF-8 sequences are replaced.
    #[serde(rename = "utf8-lossy")]
    LossyUtf8,
}

/// Options for importing a dataset from CSV or JSON.
///
/// # Example
///
/// ```rust
/// use tabprep::config::ImportOptions;
///
/// let options = ImportOptions::builder()
///     .delimiter(';')
///     .decimal_comma()
///     .max_rows(1000)
///     .build()
///     .unwrap();
/// assert_eq!(options.delimiter, ';');
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ImportOptions {
    /// Field delimiter for CSV input. Must be ASCII.
    /// Default: ','
    pub delimiter: char,

    /// Default: utf8
    pub encoding: Encoding,

    /// Fixed decimal separator; `None` detects it per value.
    pub decimal_separator: Option<DecimalSeparator>,

    /// Date pattern used for text cells. Default: auto
    pub date_format: DateFormat,

    /// Drop rows whose cells are all missing.
    /// Default: true
    pub skip_empty_rows: bool,

    /// Trim surrounding whitespace from text cells.
    /// Default: true
    pub trim_whitespace: bool,

    /// Whether the first CSV line holds column names.
    /// Default: true
    pub has_header: bool,

    /// Keep at most this many rows.
    pub max_rows: Option<usize>,

    /// Keep only these columns, in this order.
    pub selected_columns: Option<Vec<String>>,
}

impl Default for ImportOptions {
    fn default() -> Self {
        Self {
            delimiter: ',',
            encoding: Encoding::Utf8,
            decimal_separator: None,
            date_format: DateFormat::Auto,
            skip_empty_rows: true,
            trim_whitespace: true,
            has_header: true,
            max_rows: None,
            selected_columns: None,
        }
    }
}

impl ImportOptions {
    pub fn builder() -> ImportOptionsBuilder {
        ImportOptionsBuilder::default()
    }

    pub fn validate(&self) -> Result<(), ConfigValidationError> {
        if !self.delimiter.is_ascii() || matches!(self.delimiter, '\n' | '\r' | '"') {
            return Err(ConfigValidationError::InvalidDelimiter(self.delimiter));
        }
        if self.max_rows == Some(0) {
            return Err(ConfigValidationError::InvalidMaxRows(0));
        }
        if let Some(columns) = &self.selected_columns {
            if columns.is_empty() {
                return Err(ConfigValidationError::EmptyColumnSelection);
            }
            if columns.iter().any(|c| c.trim().is_empty()) {
                return Err(ConfigValidationError::EmptyColumnName {
                    field: "selected_columns".to_string(),
                });
            }
        }
        Ok(())
    }

    /// Delimiter as a byte, for the CSV reader.
    pub fn delimiter_byte(&self) -> u8 {
        u8::try_from(self.delimiter).unwrap_or(b',')
    }

    /// Cell coercion settings derived from these options.
    pub fn coercion(&self) -> CoercionOptions {
        CoercionOptions {
            decimal_separator: self.decimal_separator,
            date_format: self.date_format,
            trim_whitespace: self.trim_whitespace,
        }
    }
}

/// Builder for [`ImportOptions`].
#[derive(Debug, Default)]
pub struct ImportOptionsBuilder {
    options: ImportOptions,
}

impl ImportOptionsBuilder {
    pub fn delimiter(mut self, delimiter: char) -> Self {
        self.options.delimiter = delimiter;
        self
    }

    pub fn encoding(mut self, encoding: Encoding) -> Self {
        self.options.encoding = encoding;
        self
    }

    pub fn decimal_separator(mut self, separator: DecimalSeparator) -> Self {
        self.options.decimal_separator = Some(separator);
        self
    }

    /// Shorthand for a `,` decimal separator.
    pub fn decimal_comma(self) -> Self {
        self.decimal_separator(DecimalSeparator::Comma)
    }

    pub fn date_format(mut self, format: DateFormat) -> Self {
        self.options.date_format = format;
        self
    }

    pub fn skip_empty_rows(mut self, skip: bool) -> Self {
        self.options.skip_empty_rows = skip;
        self
    }

    pub fn trim_whitespace(mut self, trim: bool) -> Self {
        self.options.trim_whitespace = trim;
        self
    }

    pub fn has_header(mut self, has_header: bool) -> Self {
        self.options.has_header = has_header;
        self
    }

    pub fn max_rows(mut self, max_rows: usize) -> Self {
        self.options.max_rows = Some(max_rows);
        self
    }

    pub fn select_columns<I, S>(mut self, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.options.selected_columns = Some(columns.into_iter().map(Into::into).collect());
        self
    }

    pub fn build(self) -> Result<ImportOptions, ConfigValidationError> {
        self.options.validate()?;
        Ok(self.options)
    }
}

/// Errors that can occur during configuration validation.
#[derive(Debug, thiserror::Error)]
pub enum ConfigValidationError {
    #[error("Invalid fence multiplier: {0} (must be finite and greater than 0)")]
    InvalidFenceMultiplier(f64),

    #[error("Invalid top-k: {0} (must be at least 1)")]
    InvalidTopK(usize),

    #[error("Invalid '{field}': must be at least 1")]
    InvalidSampleSize { field: String },

    #[error("Invalid delimiter {0:?} (must be a single ASCII character other than a quote or newline)")]
    InvalidDelimiter(char),

    #[error("Invalid max rows: {0} (must be at least 1)")]
    InvalidMaxRows(usize),

    #[error("Column selection is empty")]
    EmptyColumnSelection,

    #[error("Empty column name in '{field}'")]
    EmptyColumnName { field: String },
}

impl From<ConfigValidationError> for PrepError {
    fn from(error: ConfigValidationError) -> Self {
        PrepError::InvalidConfig(error.to_string())
    }
}
