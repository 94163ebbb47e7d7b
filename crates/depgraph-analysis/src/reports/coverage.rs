//! Test coverage estimation.
//!
//! Code coverage is the fraction of declarations with at least one
//! `TESTED_BY` edge. Branch coverage is approximated as
//! `Σ min(tests, complexity) / Σ complexity`: every test is assumed to
//! exercise one more branch, which over-counts for redundant tests.

use depgraph_core::config::CoverageConfig;
use depgraph_core::errors::GraphError;
use depgraph_core::types::{Direction, EdgeKind, Node, NodeId, NodeKind, PropValue};
use serde::{Deserialize, Serialize};

use super::{ratio, Severity};
use crate::graph::Traversal;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GapType {
    HighComplexityLowTests,
    UntestedExport,
    LowModuleCoverage,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CoverageGap {
    pub gap_type: GapType,
    pub severity: Severity,
    pub message: String,
    pub node_id: NodeId,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CoverageReport {
    pub node_id: NodeId,
    pub code_coverage: f64,
    pub branch_coverage: f64,
    pub gaps: Vec<CoverageGap>,
}

struct Subject {
    id: NodeId,
    name: String,
    complexity: u32,
    is_export: bool,
    tests: usize,
}

fn is_declaration(kind: NodeKind) -> bool {
    kind.is_code() || kind == NodeKind::TestCase
}

/// Declarations a coverage report is computed over: the node itself for a
/// declaration, the contained declarations for a module, and the
/// declarations of every contained module for a metadata object.
fn declarations_under(traversal: &Traversal, root: &Node) -> Result<Vec<Node>, GraphError> {
    if is_declaration(root.kind) {
        return Ok(vec![root.clone()]);
    }
    let mut out = Vec::new();
    let mut frontier = vec![root.id.clone()];
    // Configuration → object → module → declaration at most.
    for _ in 0..3 {
        let mut next = Vec::new();
        for id in &frontier {
            for child in traversal.related(id, EdgeKind::Contains, Direction::Outgoing)? {
                if is_declaration(child.kind) {
                    if child.kind != NodeKind::TestCase {
                        out.push(traversal.require_node(&child.id)?);
                    }
                } else {
                    next.push(child.id);
                }
            }
        }
        if next.is_empty() {
            break;
        }
        frontier = next;
    }
    out.sort_by(|a, b| a.id.cmp(&b.id));
    out.dedup_by(|a, b| a.id == b.id);
    Ok(out)
}

pub fn coverage_report(
    traversal: &Traversal,
    node_id: &NodeId,
    config: &CoverageConfig,
) -> Result<CoverageReport, GraphError> {
    let root = traversal.require_node(node_id)?;
    let mut subjects = Vec::new();
    for decl in declarations_under(traversal, &root)? {
        let tests = traversal
            .related(&decl.id, EdgeKind::TestedBy, Direction::Outgoing)?
            .len();
        subjects.push(Subject {
            complexity: decl
                .prop("complexity")
                .and_then(PropValue::as_int)
                .and_then(|c| u32::try_from(c).ok())
                .unwrap_or(1)
                .max(1),
            is_export: decl
                .prop("is_export")
                .and_then(PropValue::as_bool)
                .unwrap_or(false),
            name: decl.display_name,
            id: decl.id,
            tests,
        });
    }

    let tested = subjects.iter().filter(|s| s.tests > 0).count();
    let code_coverage = ratio(tested, subjects.len(), 1.0);
    let total_complexity: u64 = subjects.iter().map(|s| u64::from(s.complexity)).sum();
    let covered_branches: u64 = subjects
        .iter()
        .map(|s| (s.tests as u64).min(u64::from(s.complexity)))
        .sum();
    let branch_coverage = if total_complexity == 0 {
        1.0
    } else {
        covered_branches as f64 / total_complexity as f64
    };

    let high = config.effective_high_complexity();
    let critical = config.effective_critical_complexity();
    let min_tests = config.effective_min_tests_for_complex() as usize;
    let mut gaps = Vec::new();
    for s in &subjects {
        if s.complexity >= high && s.tests < min_tests {
            gaps.push(CoverageGap {
                gap_type: GapType::HighComplexityLowTests,
                severity: if s.complexity >= critical {
                    Severity::Critical
                } else {
                    Severity::High
                },
                message: format!(
                    "{} has complexity {} but only {} test(s)",
                    s.name, s.complexity, s.tests
                ),
                node_id: s.id.clone(),
            });
        }
        if s.is_export && s.tests == 0 {
            gaps.push(CoverageGap {
                gap_type: GapType::UntestedExport,
                severity: Severity::Medium,
                message: format!("exported {} has no tests", s.name),
                node_id: s.id.clone(),
            });
        }
    }
    let threshold = config.effective_low_coverage();
    if !subjects.is_empty() && !is_declaration(root.kind) && code_coverage < threshold {
        gaps.push(CoverageGap {
            gap_type: GapType::LowModuleCoverage,
            severity: if tested == 0 { Severity::High } else { Severity::Medium },
            message: format!(
                "{} covers {:.0}% of declarations, below {:.0}%",
                root.display_name,
                code_coverage * 100.0,
                threshold * 100.0
            ),
            node_id: node_id.clone(),
        });
    }

    Ok(CoverageReport {
        node_id: node_id.clone(),
        code_coverage,
        branch_coverage,
        gaps,
    })
}
