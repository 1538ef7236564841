//! Data quality reporting.
//!
//! This module scores a dataset on completeness, uniqueness, validity and
//! consistency, recommends an action per column and lists the quality issues
//! it found.

mod analyzer;
mod report;

pub use analyzer::DataQualityAnalyzer;
pub use report::report;
