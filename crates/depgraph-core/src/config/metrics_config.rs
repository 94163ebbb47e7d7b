//! Heuristic weights for coupling and complexity scoring.
//!
//! None of these values is a correctness invariant; they only shape scores.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct MetricsConfig {
    /// Direct-dependency count that maps to coupling 1.0. Default: 10.0.
    pub coupling_normalization: Option<f64>,
    /// Default: 0.3.
    pub direct_weight: Option<f64>,
    /// Default: 0.2.
    pub transitive_weight: Option<f64>,
    /// Default: 10.0.
    pub cycle_weight: Option<f64>,
    /// Default: 0.5.
    pub coupling_weight: Option<f64>,
}

impl MetricsConfig {
    pub fn effective_coupling_normalization(&self) -> f64 {
        self.coupling_normalization.unwrap_or(10.0)
    }

    pub fn effective_direct_weight(&self) -> f64 {
        self.direct_weight.unwrap_or(0.3)
    }

    pub fn effective_transitive_weight(&self) -> f64 {
        self.transitive_weight.unwrap_or(0.2)
    }

    pub fn effective_cycle_weight(&self) -> f64 {
        self.cycle_weight.unwrap_or(10.0)
    }

    pub fn effective_coupling_weight(&self) -> f64 {
        self.coupling_weight.unwrap_or(0.5)
    }

    pub(crate) fn merge_from(&mut self, other: &MetricsConfig) {
        if other.coupling_normalization.is_some() {
            self.coupling_normalization = other.coupling_normalization;
        }
        if other.direct_weight.is_some() {
            self.direct_weight = other.direct_weight;
        }
        if other.transitive_weight.is_some() {
            self.transitive_weight = other.transitive_weight;
        }
        if other.cycle_weight.is_some() {
            self.cycle_weight = other.cycle_weight;
        }
        if other.coupling_weight.is_some() {
            self.coupling_weight = other.coupling_weight;
        }
    }
}
