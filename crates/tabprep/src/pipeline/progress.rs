//! Progress reporting for plan execution.
//!
//! Each stage moves through the phases
//! `start → compute-parameters → apply-mapping → validate → done | failed`
//! and the pipeline emits one [`ProgressUpdate`] per phase.
//!
//! # Example
//!
//! ```rust,ignore
//! use tabprep::{Pipeline, Plan};
//!
//! let outcome = Pipeline::builder()
//!     .plan(plan)
//!     .on_progress(|update| {
//!         println!("[{:.0}%] {}", update.progress * 100.0, update.message);
//!     })
//!     .build()?
//!     .run(&dataset)?;
//! ```

use super::plan::StageKind;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Phase of a single stage's execution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum StagePhase {
    Start,
    ComputeParameters,
    ApplyMapping,
    Validate,
    Done,
    Failed,
}

impl StagePhase {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Start => "start",
            Self::ComputeParameters => "compute-parameters",
            Self::ApplyMapping => "apply-mapping",
            Self::Validate => "validate",
            Self::Done => "done",
            Self::Failed => "failed",
        }
    }

    /// Fraction of the stage completed once this phase is reached.
    pub fn fraction(&self) -> f32 {
        match self {
            Self::Start => 0.0,
            Self::ComputeParameters => 0.25,
            Self::ApplyMapping => 0.5,
            Self::Validate => 0.75,
            Self::Done | Self::Failed => 1.0,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Done | Self::Failed)
    }
}

impl fmt::Display for StagePhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A progress update for one stage phase.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProgressUpdate {
    /// Zero-based index of the stage in the plan
    pub stage_index: usize,

    /// Number of stages in the plan
    pub total_stages: usize,

    pub stage: StageKind,

    pub phase: StagePhase,

    /// Overall progress (0.0 - 1.0)
    pub progress: f32,

    /// Human-readable message describing current activity
    pub message: String,
}

impl ProgressUpdate {
    pub fn new(
        stage_index: usize,
        total_stages: usize,
        stage: StageKind,
        phase: StagePhase,
        message: impl Into<String>,
    ) -> Self {
        let progress = if total_stages == 0 {
            1.0
        } else {
            ((stage_index as f32 + phase.fraction()) / total_stages as f32).clamp(0.0, 1.0)
        };
        Self {
            stage_index,
            total_stages,
            stage,
            phase,
            progress,
            message: message.into(),
        }
    }
}

/// Receives progress updates while a plan runs.
///
/// Implementations must be `Send + Sync` so a pipeline can be moved to a
/// worker thread together with its reporter.
pub trait ProgressReporter: Send + Sync {
    /// Called once per stage phase.
    fn report(&self, update: ProgressUpdate);
}

/// Wrapper that implements [`ProgressReporter`] using a closure.
pub struct ClosureProgressReporter<F>
where
    F: Fn(ProgressUpdate) + Send + Sync,
{
    callback: F,
}

impl<F> ClosureProgressReporter<F>
where
    F: Fn(ProgressUpdate) + Send + Sync,
{
    pub fn new(callback: F) -> Self {
        Self { callback }
    }
}

impl<F> ProgressReporter for ClosureProgressReporter<F>
where
    F: Fn(ProgressUpdate) + Send + Sync,
{
    fn report(&self, update: ProgressUpdate) {
        (self.callback)(update);
    }
}

static_assertions::assert_impl_all!(ProgressUpdate: Send, Sync);
