//! Cleaning plans.
//!
//! A plan is an ordered list of stages. It is pure data: loading and
//! validating a plan never touches a dataset, and the same plan applied to
//! the same dataset always yields the same result.
//!
//! Plan documents look like:
//!
//! ```json
//! {
//!   "version": 1,
//!   "stages": [
//!     { "kind": "ClipOutliers", "method": "iqr", "threshold": 1.5 },
//!     { "kind": "ImputeMissing", "method": "median", "target": ["price"] }
//!   ]
//! }
//! ```

use crate::dataset::Dataset;
use crate::error::{PrepError, Result, ResultExt};
use crate::value::{classify, Cell};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::fmt;
use std::fs;
use std::path::Path;

/// Current plan document version.
pub const PLAN_VERSION: u32 = 1;

/// Kind of a pipeline stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum StageKind {
    ImputeMissing,
    ClipOutliers,
    Normalize,
    Smooth,
    InterpolateTime,
}

impl StageKind {
    pub const ALL: [StageKind; 5] = [
        StageKind::ImputeMissing,
        StageKind::ClipOutliers,
        StageKind::Normalize,
        StageKind::Smooth,
        StageKind::InterpolateTime,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ImputeMissing => "ImputeMissing",
            Self::ClipOutliers => "ClipOutliers",
            Self::Normalize => "Normalize",
            Self::Smooth => "Smooth",
            Self::InterpolateTime => "InterpolateTime",
        }
    }

    /// Returns a human-readable name for the stage.
    pub fn display_name(&self) -> &'static str {
        match self {
            Self::ImputeMissing => "Imputing Missing Values",
            Self::ClipOutliers => "Clipping Outliers",
            Self::Normalize => "Normalizing",
            Self::Smooth => "Smoothing",
            Self::InterpolateTime => "Interpolating Over Time",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.as_str() == name)
    }
}

impl fmt::Display for StageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Missing-value imputation method.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ImputeMethod {
    Mean,
    Median,
    Mode,
    DropRow,
    CarryForward,
    CarryBackward,
    Constant,
}

impl ImputeMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Mean => "mean",
            Self::Median => "median",
            Self::Mode => "mode",
            Self::DropRow => "drop-row",
            Self::CarryForward => "carry-forward",
            Self::CarryBackward => "carry-backward",
            Self::Constant => "constant",
        }
    }
}

/// Outlier clipping method.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ClipMethod {
    Iqr,
    Zscore,
}

impl ClipMethod {
    pub fn default_threshold(&self) -> f64 {
        match self {
            Self::Iqr => 1.5,
            Self::Zscore => 3.0,
        }
    }
}

/// Normalization method.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NormalizeMethod {
    Minmax,
    Zscore,
    Robust,
}

impl NormalizeMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Minmax => "minmax",
            Self::Zscore => "zscore",
            Self::Robust => "robust",
        }
    }
}

/// Columns a stage applies to.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(try_from = "TargetRepr", into = "TargetRepr")]
pub enum Target {
    /// Every column inferred as numeric when the stage runs.
    #[default]
    AllNumeric,
    Columns(Vec<String>),
}

impl Target {
    pub fn columns<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Target::Columns(names.into_iter().map(Into::into).collect())
    }

    /// First column both targets may touch. `Some(None)` when either side
    /// is `all-numeric`.
    fn overlap(&self, other: &Target) -> Option<Option<&str>> {
        match (self, other) {
            (Target::AllNumeric, _) | (_, Target::AllNumeric) => Some(None),
            (Target::Columns(a), Target::Columns(b)) => {
                a.iter().find(|name| b.contains(name)).map(|name| Some(name.as_str()))
            }
        }
    }
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Target::AllNumeric => f.write_str("all-numeric"),
            Target::Columns(names) => write!(f, "[{}]", names.join(", ")),
        }
    }
}

#[derive(Clone, Serialize, Deserialize)]
#[serde(untagged)]
enum TargetRepr {
    Keyword(String),
    Columns(Vec<String>),
}

impl TryFrom<TargetRepr> for Target {
    type Error = String;

    fn try_from(repr: TargetRepr) -> std::result::Result<Self, Self::Error> {
        match repr {
            TargetRepr::Keyword(keyword) if keyword == "all-numeric" => Ok(Target::AllNumeric),
            TargetRepr::Keyword(other) => Err(format!(
                "invalid target '{}', expected \"all-numeric\" or a list of column names",
                other
            )),
            TargetRepr::Columns(names) => Ok(Target::Columns(names)),
        }
    }
}

impl From<Target> for TargetRepr {
    fn from(target: Target) -> Self {
        match target {
            Target::AllNumeric => TargetRepr::Keyword("all-numeric".to_string()),
            Target::Columns(names) => TargetRepr::Columns(names),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ImputeOptions {
    pub method: ImputeMethod,
    /// Raw fill value for `constant`, coerced like any input value.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub custom_value: Option<Value>,
    #[serde(default)]
    pub target: Target,
}

impl ImputeOptions {
    /// The coerced constant fill value, if one was given.
    pub fn fill_value(&self) -> Option<Cell> {
        self.custom_value.as_ref().map(classify)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ClipOptions {
    pub method: ClipMethod,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub threshold: Option<f64>,
    #[serde(default)]
    pub target: Target,
}

impl ClipOptions {
    pub fn effective_threshold(&self) -> f64 {
        self.threshold.unwrap_or_else(|| self.method.default_threshold())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct NormalizeOptions {
    pub method: NormalizeMethod,
    #[serde(default)]
    pub target: Target,
    /// Allow this normalization to follow one of the same method on the
    /// same columns.
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub allow_repeat: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SmoothOptions {
    pub window_size: usize,
    #[serde(default)]
    pub target: Target,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct InterpolateOptions {
    pub value_column: String,
    pub time_column: String,
}

/// A single pipeline stage with its options.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind")]
pub enum Stage {
    ImputeMissing(ImputeOptions),
    ClipOutliers(ClipOptions),
    Normalize(NormalizeOptions),
    Smooth(SmoothOptions),
    InterpolateTime(InterpolateOptions),
}

impl Stage {
    pub fn impute(method: ImputeMethod) -> Self {
        Stage::ImputeMissing(ImputeOptions {
            method,
            custom_value: None,
            target: Target::AllNumeric,
        })
    }

    pub fn impute_constant(value: impl Into<Value>) -> Self {
        Stage::ImputeMissing(ImputeOptions {
            method: ImputeMethod::Constant,
            custom_value: Some(value.into()),
            target: Target::AllNumeric,
        })
    }

    pub fn clip(method: ClipMethod) -> Self {
        Stage::ClipOutliers(ClipOptions {
            method,
            threshold: None,
            target: Target::AllNumeric,
        })
    }

    pub fn normalize(method: NormalizeMethod) -> Self {
        Stage::Normalize(NormalizeOptions {
            method,
            target: Target::AllNumeric,
            allow_repeat: false,
        })
    }

    pub fn smooth(window_size: usize) -> Self {
        Stage::Smooth(SmoothOptions {
            window_size,
            target: Target::AllNumeric,
        })
    }

    pub fn interpolate(value_column: impl Into<String>, time_column: impl Into<String>) -> Self {
        Stage::InterpolateTime(InterpolateOptions {
            value_column: value_column.into(),
            time_column: time_column.into(),
        })
    }

    /// Restrict the stage to a target. `InterpolateTime` names its columns
    /// directly and is returned unchanged.
    pub fn with_target(mut self, new_target: Target) -> Self {
        if let Some(target) = self.target_mut() {
            *target = new_target;
        }
        self
    }

    /// Set the clipping threshold; other stages are returned unchanged.
    pub fn with_threshold(mut self, threshold: f64) -> Self {
        if let Stage::ClipOutliers(options) = &mut self {
            options.threshold = Some(threshold);
        }
        self
    }

    /// Permit a repeated normalization; other stages are returned unchanged.
    pub fn allowing_repeat(mut self) -> Self {
        if let Stage::Normalize(options) = &mut self {
            options.allow_repeat = true;
        }
        self
    }

    pub fn kind(&self) -> StageKind {
        match self {
            Stage::ImputeMissing(_) => StageKind::ImputeMissing,
            Stage::ClipOutliers(_) => StageKind::ClipOutliers,
            Stage::Normalize(_) => StageKind::Normalize,
            Stage::Smooth(_) => StageKind::Smooth,
            Stage::InterpolateTime(_) => StageKind::InterpolateTime,
        }
    }

    pub fn target(&self) -> Option<&Target> {
        match self {
            Stage::ImputeMissing(o) => Some(&o.target),
            Stage::ClipOutliers(o) => Some(&o.target),
            Stage::Normalize(o) => Some(&o.target),
            Stage::Smooth(o) => Some(&o.target),
            Stage::InterpolateTime(_) => None,
        }
    }

    fn target_mut(&mut self) -> Option<&mut Target> {
        match self {
            Stage::ImputeMissing(o) => Some(&mut o.target),
            Stage::ClipOutliers(o) => Some(&mut o.target),
            Stage::Normalize(o) => Some(&mut o.target),
            Stage::Smooth(o) => Some(&mut o.target),
            Stage::InterpolateTime(_) => None,
        }
    }

    /// Column names the stage refers to explicitly.
    pub fn referenced_columns(&self) -> Vec<&str> {
        match self {
            Stage::InterpolateTime(o) => vec![o.value_column.as_str(), o.time_column.as_str()],
            _ => match self.target() {
                Some(Target::Columns(names)) => names.iter().map(String::as_str).collect(),
                _ => Vec::new(),
            },
        }
    }

    /// Only `drop-row` imputation changes the number of rows.
    pub fn may_drop_rows(&self) -> bool {
        matches!(
            self,
            Stage::ImputeMissing(ImputeOptions {
                method: ImputeMethod::DropRow,
                ..
            })
        )
    }

    /// Check the stage's own options.
    fn validate(&self, index: usize) -> Result<()> {
        let invalid = |column: Option<&str>, message: String| Err(PrepError::plan(Some(index), column, message));

        if let Some(Target::Columns(names)) = self.target() {
            if names.is_empty() {
                return invalid(None, "target lists no columns".to_string());
            }
        }

        match self {
            Stage::ImputeMissing(options) if options.method == ImputeMethod::Constant => {
                match options.fill_value() {
                    None => invalid(None, "constant imputation requires custom_value".to_string()),
                    Some(Cell::Missing) => invalid(None, "custom_value must not be a missing value".to_string()),
                    Some(_) => Ok(()),
                }
            }
            Stage::ClipOutliers(options) => match options.threshold {
                Some(t) if !t.is_finite() || t <= 0.0 => invalid(
                    None,
                    format!("threshold must be finite and greater than 0, got {}", t),
                ),
                _ => Ok(()),
            },
            Stage::Smooth(options) if options.window_size < 3 || options.window_size % 2 == 0 => invalid(
                None,
                format!(
                    "window_size must be an odd integer of at least 3, got {}",
                    options.window_size
                ),
            ),
            Stage::InterpolateTime(options) if options.value_column == options.time_column => invalid(
                Some(&options.value_column),
                format!(
                    "value_column and time_column must differ, both are '{}'",
                    options.value_column
                ),
            ),
            _ => Ok(()),
        }
    }
}

/// An ordered list of stages.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Plan {
    pub version: u32,
    pub stages: Vec<Stage>,
}

impl Default for Plan {
    fn default() -> Self {
        Self {
            version: PLAN_VERSION,
            stages: Vec::new(),
        }
    }
}

impl Plan {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_stage(mut self, stage: Stage) -> Self {
        self.stages.push(stage);
        self
    }

    pub fn push(&mut self, stage: Stage) {
        self.stages.push(stage);
    }

    pub fn len(&self) -> usize {
        self.stages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stages.is_empty()
    }

    /// Load and validate a plan document.
    pub fn from_json(json: &str) -> Result<Self> {
        let value: Value = serde_json::from_str(json)
            .map_err(|e| PrepError::plan(None, None, format!("plan is not valid JSON: {}", e)))?;
        Self::from_value(value)
    }

    /// Load and validate a plan document from a parsed JSON value.
    pub fn from_value(value: Value) -> Result<Self> {
        let Value::Object(mut fields) = value else {
            return Err(PrepError::plan(None, None, "plan must be a JSON object"));
        };

        if let Some(key) = fields.keys().find(|k| !matches!(k.as_str(), "version" | "stages")) {
            return Err(PrepError::plan(None, None, format!("unknown plan key '{}'", key)));
        }

        let version = match fields.remove("version") {
            Some(Value::Number(n)) => n
                .as_u64()
                .and_then(|v| u32::try_from(v).ok())
                .ok_or_else(|| PrepError::plan(None, None, format!("invalid plan version {}", n)))?,
            Some(other) => {
                return Err(PrepError::plan(None, None, format!("invalid plan version {}", other)));
            }
            None => return Err(PrepError::plan(None, None, "plan is missing 'version'")),
        };
        if version != PLAN_VERSION {
            return Err(PrepError::plan(
                None,
                None,
                format!("unsupported plan version {} (expected {})", version, PLAN_VERSION),
            ));
        }

        let raw_stages = match fields.remove("stages") {
            Some(Value::Array(stages)) => stages,
            Some(_) => return Err(PrepError::plan(None, None, "'stages' must be an array")),
            None => return Err(PrepError::plan(None, None, "plan is missing 'stages'")),
        };

        let stages = raw_stages
            .into_iter()
            .enumerate()
            .map(|(index, raw)| parse_stage(index, raw))
            .collect::<Result<Vec<_>>>()?;

        let plan = Plan { version, stages };
        plan.validate()?;
        Ok(plan)
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let json = fs::read_to_string(path)
            .map_err(PrepError::from)
            .context(format!("Failed to read plan {}", path.display()))?;
        Self::from_json(&json)
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn write_json(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        fs::write(path, self.to_json()?)
            .map_err(PrepError::from)
            .context(format!("Failed to write plan to {}", path.display()))
    }

    /// Check plan-level rules that do not depend on a dataset.
    pub fn validate(&self) -> Result<()> {
        if self.version != PLAN_VERSION {
            return Err(PrepError::plan(
                None,
                None,
                format!("unsupported plan version {} (expected {})", self.version, PLAN_VERSION),
            ));
        }
        for (index, stage) in self.stages.iter().enumerate() {
            stage.validate(index)?;
        }
        self.check_repeated_normalization()
    }

    /// Check plan-level rules plus every column reference against a dataset.
    pub fn validate_against(&self, dataset: &Dataset) -> Result<()> {
        self.validate()?;
        for (index, stage) in self.stages.iter().enumerate() {
            if let Some(column) = stage
                .referenced_columns()
                .into_iter()
                .find(|name| dataset.column(name).is_none())
            {
                return Err(PrepError::schema(
                    Some(column),
                    format!("stage {} ({}) references unknown column '{}'", index, stage.kind(), column),
                ));
            }
        }
        Ok(())
    }

    /// Two normalizations of the same method must not share a column unless
    /// the later one allows repeats. `all-numeric` is treated as touching
    /// every column.
    fn check_repeated_normalization(&self) -> Result<()> {
        for (index, stage) in self.stages.iter().enumerate() {
            let Stage::Normalize(current) = stage else {
                continue;
            };
            if current.allow_repeat {
                continue;
            }
            for (earlier_index, earlier) in self.stages[..index].iter().enumerate() {
                if let Stage::Normalize(previous) = earlier
                    && previous.method == current.method
                    && let Some(column) = previous.target.overlap(&current.target)
                {
                    let subject = column.map_or("all numeric columns".to_string(), |c| format!("column '{}'", c));
                    return Err(PrepError::plan(
                        Some(index),
                        column,
                        format!(
                            "{} normalization of {} repeats stage {}; set allow_repeat to permit it",
                            current.method.as_str(),
                            subject,
                            earlier_index
                        ),
                    ));
                }
            }
        }
        Ok(())
    }
}

impl<'de> Deserialize<'de> for Plan {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = Value::deserialize(deserializer)?;
        Plan::from_value(value).map_err(serde::de::Error::custom)
    }
}

fn parse_stage(index: usize, raw: Value) -> Result<Stage> {
    let Value::Object(mut fields) = raw else {
        return Err(PrepError::plan(Some(index), None, "stage must be a JSON object"));
    };

    let kind = match fields.remove("kind") {
        Some(Value::String(kind)) => kind,
        Some(_) => return Err(PrepError::plan(Some(index), None, "stage 'kind' must be a string")),
        None => return Err(PrepError::plan(Some(index), None, "stage is missing 'kind'")),
    };
    let kind = StageKind::from_name(&kind)
        .ok_or_else(|| PrepError::plan(Some(index), None, format!("unknown stage kind '{}'", kind)))?;

    let options = Value::Object(fields);
    let stage = match kind {
        StageKind::ImputeMissing => Stage::ImputeMissing(parse_options(index, kind, options)?),
        StageKind::ClipOutliers => Stage::ClipOutliers(parse_options(index, kind, options)?),
        StageKind::Normalize => Stage::Normalize(parse_options(index, kind, options)?),
        StageKind::Smooth => Stage::Smooth(parse_options(index, kind, options)?),
        StageKind::InterpolateTime => Stage::InterpolateTime(parse_options(index, kind, options)?),
    };
    Ok(stage)
}

fn parse_options<T: DeserializeOwned>(index: usize, kind: StageKind, options: Value) -> Result<T> {
    serde_json::from_value(options)
        .map_err(|e| PrepError::plan(Some(index), None, format!("invalid {} options: {}", kind, e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::Column;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn plan_error_message(json: Value) -> String {
        let error = Plan::from_value(json).unwrap_err();
        assert_eq!(error.error_code(), "PLAN_ERROR", "unexpected error: {}", error);
        error.to_string()
    }

    // =========================================================================
    // Loading
    // =========================================================================

    #[test]
    fn test_load_full_plan() {
        let plan = Plan::from_value(json!({
            "version": 1,
            "stages": [
                {"kind": "ClipOutliers", "method": "iqr", "threshold": 1.5},
                {"kind": "ImputeMissing", "method": "median", "target": ["price"]},
                {"kind": "Normalize", "method": "robust", "target": "all-numeric"},
                {"kind": "Smooth", "window_size": 3},
                {"kind": "InterpolateTime", "value_column": "v", "time_column": "t"}
            ]
        }))
        .unwrap();

        assert_eq!(plan.len(), 5);
        assert_eq!(plan.stages[0], Stage::clip(ClipMethod::Iqr).with_threshold(1.5));
        assert_eq!(
            plan.stages[1],
            Stage::impute(ImputeMethod::Median).with_target(Target::columns(["price"]))
        );
        assert_eq!(plan.stages[4].kind(), StageKind::InterpolateTime);
    }

    #[test]
    fn test_defaults_applied() {
        let plan = Plan::from_json(r#"{"version": 1, "stages": [{"kind": "ClipOutliers", "method": "zscore"}]}"#)
            .unwrap();
        let Stage::ClipOutliers(options) = &plan.stages[0] else {
            panic!("expected ClipOutliers");
        };
        assert_eq!(options.target, Target::AllNumeric);
        assert_eq!(options.effective_threshold(), 3.0);
    }

    #[test]
    fn test_unknown_keys_rejected() {
        let message = plan_error_message(json!({"version": 1, "stages": [], "extra": true}));
        assert!(message.contains("extra"));

        let message = plan_error_message(json!({
            "version": 1,
            "stages": [{"kind": "Smooth", "window_size": 3, "window": 5}]
        }));
        assert!(message.contains("window"));
    }

    #[test]
    fn test_unknown_kind_and_version() {
        let message = plan_error_message(json!({"version": 1, "stages": [{"kind": "Explode"}]}));
        assert!(message.contains("Explode"));

        let message = plan_error_message(json!({"version": 2, "stages": []}));
        assert!(message.contains("version"));

        plan_error_message(json!({"stages": []}));
    }

    #[test]
    fn test_missing_required_option() {
        let message = plan_error_message(json!({"version": 1, "stages": [{"kind": "ImputeMissing"}]}));
        assert!(message.contains("method"));
    }

    #[test]
    fn test_invalid_target_keyword() {
        let message = plan_error_message(json!({
            "version": 1,
            "stages": [{"kind": "Normalize", "method": "minmax", "target": "everything"}]
        }));
        assert!(message.contains("all-numeric"));
    }

    #[test]
    fn test_error_carries_stage_index() {
        let error = Plan::from_value(json!({
            "version": 1,
            "stages": [
                {"kind": "Smooth", "window_size": 3},
                {"kind": "Smooth", "window_size": 4}
            ]
        }))
        .unwrap_err();
        let diagnostic = error.to_diagnostic().unwrap();
        assert_eq!(diagnostic.stage_index, Some(1));
    }

    #[test]
    fn test_invalid_json_is_plan_error() {
        let error = Plan::from_json("{not json").unwrap_err();
        assert_eq!(error.error_code(), "PLAN_ERROR");
    }

    // =========================================================================
    // Option validation
    // =========================================================================

    #[test]
    fn test_constant_requires_value() {
        let message = plan_error_message(json!({
            "version": 1,
            "stages": [{"kind": "ImputeMissing", "method": "constant"}]
        }));
        assert!(message.contains("custom_value"));

        let message = plan_error_message(json!({
            "version": 1,
            "stages": [{"kind": "ImputeMissing", "method": "constant", "custom_value": "NaN"}]
        }));
        assert!(message.contains("missing"));
    }

    #[test]
    fn test_threshold_must_be_positive() {
        let plan = Plan::new().with_stage(Stage::clip(ClipMethod::Iqr).with_threshold(0.0));
        assert!(plan.validate().is_err());
        let plan = Plan::new().with_stage(Stage::clip(ClipMethod::Iqr).with_threshold(f64::INFINITY));
        assert!(plan.validate().is_err());
    }

    #[test]
    fn test_window_size_rules() {
        for window in [0, 1, 2, 4] {
            assert!(Plan::new().with_stage(Stage::smooth(window)).validate().is_err());
        }
        assert!(Plan::new().with_stage(Stage::smooth(5)).validate().is_ok());
    }

    #[test]
    fn test_interpolate_columns_must_differ() {
        let error = Plan::new()
            .with_stage(Stage::interpolate("t", "t"))
            .validate()
            .unwrap_err();
        assert_eq!(error.error_code(), "PLAN_ERROR");
        assert_eq!(error.column(), Some("t"));
    }

    #[test]
    fn test_empty_target_list() {
        let plan = Plan::new().with_stage(Stage::normalize(NormalizeMethod::Minmax).with_target(Target::Columns(vec![])));
        assert!(plan.validate().is_err());
    }

    // =========================================================================
    // Repeated normalization
    // =========================================================================

    #[test]
    fn test_repeated_normalization_rejected() {
        let plan = Plan::new()
            .with_stage(Stage::normalize(NormalizeMethod::Zscore).with_target(Target::columns(["a", "b"])))
            .with_stage(Stage::normalize(NormalizeMethod::Zscore).with_target(Target::columns(["b"])));
        let error = plan.validate().unwrap_err();
        assert_eq!(error.column(), Some("b"));
    }

    #[test]
    fn test_repeated_normalization_all_numeric_conflicts() {
        let plan = Plan::new()
            .with_stage(Stage::normalize(NormalizeMethod::Minmax))
            .with_stage(Stage::normalize(NormalizeMethod::Minmax).with_target(Target::columns(["x"])));
        assert!(plan.validate().is_err());
    }

    #[test]
    fn test_repeated_normalization_allowed() {
        let different_methods = Plan::new()
            .with_stage(Stage::normalize(NormalizeMethod::Minmax))
            .with_stage(Stage::normalize(NormalizeMethod::Zscore));
        assert!(different_methods.validate().is_ok());

        let disjoint = Plan::new()
            .with_stage(Stage::normalize(NormalizeMethod::Minmax).with_target(Target::columns(["a"])))
            .with_stage(Stage::normalize(NormalizeMethod::Minmax).with_target(Target::columns(["b"])));
        assert!(disjoint.validate().is_ok());

        let opted_in = Plan::new()
            .with_stage(Stage::normalize(NormalizeMethod::Minmax))
            .with_stage(Stage::normalize(NormalizeMethod::Minmax).allowing_repeat());
        assert!(opted_in.validate().is_ok());
    }

    // =========================================================================
    // Schema checks and serialization
    // =========================================================================

    #[test]
    fn test_validate_against_unknown_column() {
        let dataset = Dataset::new(vec![Column::from_numbers("a", &[Some(1.0)])]).unwrap();
        let plan = Plan::new().with_stage(Stage::impute(ImputeMethod::Mean).with_target(Target::columns(["b"])));

        let error = plan.validate_against(&dataset).unwrap_err();
        assert_eq!(error.error_code(), "SCHEMA_ERROR");
        assert_eq!(error.column(), Some("b"));
    }

    #[test]
    fn test_plan_serializes_back_to_same_shape() {
        let document = json!({
            "version": 1,
            "stages": [
                {"kind": "ImputeMissing", "method": "constant", "custom_value": 0, "target": ["a"]},
                {"kind": "ClipOutliers", "method": "iqr", "target": "all-numeric"},
                {"kind": "Normalize", "method": "minmax", "target": "all-numeric", "allow_repeat": true},
                {"kind": "InterpolateTime", "value_column": "v", "time_column": "t"}
            ]
        });
        let plan = Plan::from_value(document.clone()).unwrap();
        assert_eq!(serde_json::to_value(&plan).unwrap(), document);

        let reparsed: Plan = serde_json::from_str(&plan.to_json().unwrap()).unwrap();
        assert_eq!(reparsed, plan);
    }
}
