//! Graph builder and traversal configuration.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct GraphConfig {
    /// Path segments / module-name prefixes marking test modules.
    /// Default: `["Tests", "Тесты"]`.
    pub test_markers: Vec<String>,
    /// Default traversal depth bound. Default: 10.
    pub max_depth: Option<u32>,
    /// DFS step budget for cycle detection. Default: 100_000.
    pub cycle_step_budget: Option<usize>,
}

impl GraphConfig {
    pub fn effective_test_markers(&self) -> Vec<String> {
        if self.test_markers.is_empty() {
            vec!["Tests".to_string(), "Тесты".to_string()]
        } else {
            self.test_markers.clone()
        }
    }

    pub fn effective_max_depth(&self) -> u32 {
        self.max_depth.unwrap_or(10)
    }

    pub fn effective_cycle_step_budget(&self) -> usize {
        self.cycle_step_budget.unwrap_or(100_000)
    }

    pub(crate) fn merge_from(&mut self, other: &GraphConfig) {
        if !other.test_markers.is_empty() {
            self.test_markers = other.test_markers.clone();
        }
        if other.max_depth.is_some() {
            self.max_depth = other.max_depth;
        }
        if other.cycle_step_budget.is_some() {
            self.cycle_step_budget = other.cycle_step_budget;
        }
    }
}
