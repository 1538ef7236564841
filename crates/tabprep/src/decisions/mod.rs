//! Turning a quality report into a cleaning plan.
//!
//! The report recommends one action per column; a [`DecisionEngine`] maps
//! those recommendations onto plan stages that can be reviewed, edited and
//! then applied.

mod rule_engine;

pub use rule_engine::RecommendationEngine;

use crate::pipeline::Plan;
use crate::types::QualityReport;

/// Builds a plan from a quality report.
pub trait DecisionEngine: Send + Sync {
    fn suggest_plan(&self, report: &QualityReport) -> Plan;
}
