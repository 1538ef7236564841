//! Cleaning pipeline.
//!
//! This module contains the plan model, the stage executor, the stage
//! implementations that live outside [`crate::imputers`], and the
//! [`Pipeline`] entry point.

mod builder;
mod executor;
mod normalize;
mod outliers;
mod plan;
mod progress;
mod timeseries;

pub use builder::{apply, ApplyOutcome, Pipeline, PipelineBuilder};
pub use executor::{StageContext, StageOperation};
pub use normalize::Scaling;
pub use outliers::OutlierClipper;
pub use plan::{
    ClipMethod, ClipOptions, ImputeMethod, ImputeOptions, InterpolateOptions, NormalizeMethod, NormalizeOptions,
    Plan, SmoothOptions, Stage, StageKind, Target, PLAN_VERSION,
};
pub use progress::{ClosureProgressReporter, ProgressReporter, ProgressUpdate, StagePhase};
pub use timeseries::{interpolate_linear, moving_average, time_key, TimeOrder};
