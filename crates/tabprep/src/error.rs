//! Error types for profiling, plan validation and pipeline execution.
//!
//! The library distinguishes four kinds of problems:
//!
//! - **SchemaError**: duplicate column names, unequal column lengths, or a plan
//!   referencing a column that does not exist.
//! - **PlanError**: unknown stage kind, missing or out-of-range option, or two
//!   incompatible normalizations chained on the same column.
//! - **StageError**: a stage failed its own precondition at runtime.
//! - **Warning**: a stage was a no-op for a reason the caller should know.
//!
//! Schema and plan errors are raised before any stage runs and surface as
//! [`PrepError`]. Stage errors and warnings are reported as [`Diagnostic`]
//! records in the pipeline outcome.
//!
//! Errors are serializable so they can be written as structured documents by
//! the CLI or sent to a frontend.

use crate::pipeline::StageKind;
use serde::ser::SerializeStruct;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// The main error type for the data preparation core.
#[derive(Error, Debug)]
pub enum PrepError {
    /// The dataset shape or a column reference is invalid.
    #[error("{message}")]
    Schema {
        column: Option<String>,
        message: String,
    },

    /// The plan is malformed or violates a plan-level rule.
    #[error("{message}")]
    Plan {
        stage_index: Option<usize>,
        column: Option<String>,
        message: String,
    },

    /// A stage failed at runtime.
    #[error("stage {stage_index} ({stage}) failed: {message}")]
    Stage {
        stage_index: usize,
        stage: StageKind,
        column: Option<String>,
        message: String,
    },

    /// Input data could not be parsed into a dataset.
    #[error("Failed to parse input: {0}")]
    Input(String),

    /// Invalid options provided.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// IO error wrapper.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Polars error wrapper (CSV reading and writing).
    #[error("Polars error: {0}")]
    Polars(#[from] polars::error::PolarsError),

    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Generic error with context.
    #[error("{context}: {source}")]
    WithContext {
        context: String,
        #[source]
        source: Box<PrepError>,
    },
}

impl PrepError {
    pub fn schema(column: Option<&str>, message: impl Into<String>) -> Self {
        Self::Schema {
            column: column.map(str::to_string),
            message: message.into(),
        }
    }

    pub fn plan(stage_index: Option<usize>, column: Option<&str>, message: impl Into<String>) -> Self {
        Self::Plan {
            stage_index,
            column: column.map(str::to_string),
            message: message.into(),
        }
    }

    /// Add context to an error.
    pub fn with_context(self, context: impl Into<String>) -> Self {
        PrepError::WithContext {
            context: context.into(),
            source: Box::new(self),
        }
    }

    /// Stable, machine-readable error code.
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::Schema { .. } => "SCHEMA_ERROR",
            Self::Plan { .. } => "PLAN_ERROR",
            Self::Stage { .. } => "STAGE_ERROR",
            Self::Input(_) => "INPUT_ERROR",
            Self::InvalidConfig(_) => "INVALID_CONFIG",
            Self::Io(_) => "IO_ERROR",
            Self::Polars(polars::error::PolarsError::IO { .. }) => "IO_ERROR",
            Self::Polars(_) => "INPUT_ERROR",
            Self::Json(_) => "JSON_ERROR",
            Self::WithContext { source, .. } => source.error_code(),
        }
    }

    /// Diagnostic kind for schema, plan and stage errors.
    pub fn kind(&self) -> Option<DiagnosticKind> {
        match self {
            Self::Schema { .. } => Some(DiagnosticKind::SchemaError),
            Self::Plan { .. } => Some(DiagnosticKind::PlanError),
            Self::Stage { .. } => Some(DiagnosticKind::StageError),
            Self::WithContext { source, .. } => source.kind(),
            _ => None,
        }
    }

    /// Column the error refers to, if any.
    pub fn column(&self) -> Option<&str> {
        match self {
            Self::Schema { column, .. } | Self::Plan { column, .. } | Self::Stage { column, .. } => {
                column.as_deref()
            }
            Self::WithContext { source, .. } => source.column(),
            _ => None,
        }
    }

    /// Stage the error was raised in, for stage errors.
    pub fn stage(&self) -> Option<(usize, StageKind)> {
        match self {
            Self::Stage { stage_index, stage, .. } => Some((*stage_index, *stage)),
            Self::WithContext { source, .. } => source.stage(),
            _ => None,
        }
    }

    /// Check if this error was raised before any stage ran.
    pub fn is_pre_execution(&self) -> bool {
        matches!(
            self.kind(),
            Some(DiagnosticKind::SchemaError | DiagnosticKind::PlanError)
        )
    }

    /// Convert schema, plan and stage errors into a surface diagnostic.
    pub fn to_diagnostic(&self) -> Option<Diagnostic> {
        match self {
            Self::Schema { column, message } => Some(Diagnostic {
                kind: DiagnosticKind::SchemaError,
                stage_index: None,
                stage: None,
                column: column.clone(),
                message: message.clone(),
            }),
            Self::Plan {
                stage_index,
                column,
                message,
            } => Some(Diagnostic {
                kind: DiagnosticKind::PlanError,
                stage_index: *stage_index,
                stage: None,
                column: column.clone(),
                message: message.clone(),
            }),
            Self::Stage {
                stage_index,
                stage,
                column,
                message,
            } => Some(Diagnostic {
                kind: DiagnosticKind::StageError,
                stage_index: Some(*stage_index),
                stage: Some(*stage),
                column: column.clone(),
                message: message.clone(),
            }),
            Self::WithContext { source, .. } => source.to_diagnostic(),
            _ => None,
        }
    }
}

/// Errors are serialized with `code` and `message` fields, plus the
/// offending column and stage when there are some.
impl Serialize for PrepError {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        let column = self.column();
        let stage = self.stage();
        let len = 2 + usize::from(column.is_some()) + usize::from(stage.is_some()) * 2;
        let mut state = serializer.serialize_struct("PrepError", len)?;
        state.serialize_field("code", &self.error_code())?;
        state.serialize_field("message", &self.to_string())?;
        if let Some(column) = column {
            state.serialize_field("column", column)?;
        }
        if let Some((index, kind)) = stage {
            state.serialize_field("stage_index", &index)?;
            state.serialize_field("stage", &kind)?;
        }
        state.end()
    }
}

/// Result type alias for library operations.
pub type Result<T> = std::result::Result<T, PrepError>;

/// Extension trait for adding context to Results.
pub trait ResultExt<T> {
    /// Add context to an error result.
    fn context(self, context: impl Into<String>) -> Result<T>;
}

impl<T> ResultExt<T> for Result<T> {
    fn context(self, context: impl Into<String>) -> Result<T> {
        self.map_err(|e| e.with_context(context))
    }
}

impl<T> ResultExt<T> for std::result::Result<T, polars::error::PolarsError> {
    fn context(self, context: impl Into<String>) -> Result<T> {
        self.map_err(|e| PrepError::Polars(e).with_context(context))
    }
}

/// Machine-readable kind of a surface diagnostic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DiagnosticKind {
    SchemaError,
    PlanError,
    StageError,
    Warning,
}

impl DiagnosticKind {
    pub fn is_error(&self) -> bool {
        !matches!(self, Self::Warning)
    }
}

impl fmt::Display for DiagnosticKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::SchemaError => "SchemaError",
            Self::PlanError => "PlanError",
            Self::StageError => "StageError",
            Self::Warning => "Warning",
        };
        f.write_str(name)
    }
}

/// A warning or error record produced while applying a plan.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Diagnostic {
    pub kind: DiagnosticKind,
    /// Zero-based index of the stage in the plan.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stage_index: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stage: Option<StageKind>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub column: Option<String>,
    pub message: String,
}

impl Diagnostic {
    pub fn warning(
        stage_index: usize,
        stage: StageKind,
        column: Option<&str>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            kind: DiagnosticKind::Warning,
            stage_index: Some(stage_index),
            stage: Some(stage),
            column: column.map(str::to_string),
            message: message.into(),
        }
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}]", self.kind)?;
        if let (Some(index), Some(stage)) = (self.stage_index, self.stage) {
            write!(f, " stage {} ({})", index, stage)?;
        }
        if let Some(column) = &self.column {
            write!(f, " column '{}'", column)?;
        }
        write!(f, ": {}", self.message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_code() {
        assert_eq!(
            PrepError::schema(Some("x"), "duplicate column").error_code(),
            "SCHEMA_ERROR"
        );
        assert_eq!(
            PrepError::plan(Some(0), None, "unknown kind").error_code(),
            "PLAN_ERROR"
        );
        assert_eq!(PrepError::Input("bad".to_string()).error_code(), "INPUT_ERROR");
    }

    #[test]
    fn test_is_pre_execution() {
        assert!(PrepError::schema(None, "x").is_pre_execution());
        assert!(PrepError::plan(None, None, "x").is_pre_execution());
        let stage = PrepError::Stage {
            stage_index: 0,
            stage: StageKind::InterpolateTime,
            column: Some("t".to_string()),
            message: "no timestamps".to_string(),
        };
        assert!(!stage.is_pre_execution());
        assert_eq!(stage.kind(), Some(DiagnosticKind::StageError));
    }

    #[test]
    fn test_error_serialization() {
        let error = PrepError::schema(Some("Age"), "Column 'Age' not found");
        let json = serde_json::to_string(&error).unwrap();
        assert!(json.contains("SCHEMA_ERROR"));
        assert!(json.contains("\"column\":\"Age\""));
    }

    #[test]
    fn test_stage_error_serialization() {
        let error = PrepError::Stage {
            stage_index: 1,
            stage: StageKind::Smooth,
            column: None,
            message: "non-finite result".to_string(),
        };
        let value = serde_json::to_value(&error).unwrap();
        assert_eq!(value["code"], "STAGE_ERROR");
        assert_eq!(value["stage_index"], 1);
        assert_eq!(value["stage"], "Smooth");
        assert!(value.get("column").is_none());
    }

    #[test]
    fn test_with_context() {
        let error = PrepError::plan(Some(1), Some("x"), "window size must be odd")
            .with_context("While loading plan");
        assert!(error.to_string().contains("While loading plan"));
        assert_eq!(error.error_code(), "PLAN_ERROR");
        assert_eq!(error.column(), Some("x"));
    }

    #[test]
    fn test_stage_error_to_diagnostic() {
        let error = PrepError::Stage {
            stage_index: 2,
            stage: StageKind::InterpolateTime,
            column: Some("t".to_string()),
            message: "no usable timestamps".to_string(),
        };
        let diagnostic = error.to_diagnostic().unwrap();
        assert_eq!(diagnostic.kind, DiagnosticKind::StageError);
        assert_eq!(diagnostic.stage_index, Some(2));
        assert_eq!(diagnostic.column.as_deref(), Some("t"));
        assert!(diagnostic.to_string().contains("InterpolateTime"));
    }

    #[test]
    fn test_io_error_has_no_diagnostic() {
        let error = PrepError::Io(std::io::Error::other("disk"));
        assert!(error.to_diagnostic().is_none());
        assert!(error.kind().is_none());
    }
}
