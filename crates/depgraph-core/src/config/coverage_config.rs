//! Test coverage gap thresholds.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct CoverageConfig {
    /// Complexity at which a declaration counts as complex. Default: 10.
    pub high_complexity: Option<u32>,
    /// Complexity at which a gap becomes critical. Default: 20.
    pub critical_complexity: Option<u32>,
    /// Tests a complex declaration needs to avoid a gap. Default: 2.
    pub min_tests_for_complex: Option<u32>,
    /// Module coverage below this is flagged. Default: 0.5.
    pub low_coverage: Option<f64>,
}

impl CoverageConfig {
    pub fn effective_high_complexity(&self) -> u32 {
        self.high_complexity.unwrap_or(10)
    }

    pub fn effective_critical_complexity(&self) -> u32 {
        self.critical_complexity.unwrap_or(20)
    }

    pub fn effective_min_tests_for_complex(&self) -> u32 {
        self.min_tests_for_complex.unwrap_or(2)
    }

    pub fn effective_low_coverage(&self) -> f64 {
        self.low_coverage.unwrap_or(0.5)
    }

    pub(crate) fn merge_from(&mut self, other: &CoverageConfig) {
        if other.high_complexity.is_some() {
            self.high_complexity = other.high_complexity;
        }
        if other.critical_complexity.is_some() {
            self.critical_complexity = other.critical_complexity;
        }
        if other.min_tests_for_complex.is_some() {
            self.min_tests_for_complex = other.min_tests_for_complex;
        }
        if other.low_coverage.is_some() {
            self.low_coverage = other.low_coverage;
        }
    }
}
