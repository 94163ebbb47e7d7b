//! Analysis reports built on the traversal and metrics engine.
//!
//! Every report is a plain serde record; nothing here renders text for
//! humans beyond the `message` fields of gaps and risks.

pub mod coverage;
pub mod impact;
pub mod traceability;

use serde::{Deserialize, Serialize};

pub use coverage::{coverage_report, CoverageGap, CoverageReport, GapType};
pub use impact::{analyze_impact, dependency_report, DependencyResult, ImpactReport, ImpactedNode};
pub use traceability::{
    traceability_report, RiskType, TraceEntry, TraceabilityCoverage, TraceabilityReport,
    TraceabilityRisk,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Low,
    Medium,
    High,
    Critical,
}

/// `numerator / denominator`, or `empty` when there is nothing to divide.
pub(crate) fn ratio(numerator: usize, denominator: usize, empty: f64) -> f64 {
    if denominator == 0 {
        empty
    } else {
        numerator as f64 / denominator as f64
    }
}
