//! Requirement → code → test → incident matrix.

use std::collections::{BTreeMap, BTreeSet};

use depgraph_core::errors::GraphError;
use depgraph_core::traits::Deadline;
use depgraph_core::types::{Direction, EdgeKind, NodeId, NodeKind};
use serde::{Deserialize, Serialize};

use super::{ratio, Severity};
use crate::graph::Traversal;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TraceEntry {
    pub code: Vec<NodeId>,
    pub tests: Vec<NodeId>,
    pub incidents: Vec<NodeId>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TraceabilityCoverage {
    pub total_requirements: usize,
    pub implemented: usize,
    pub tested: usize,
    pub with_incidents: usize,
    pub implementation_rate: f64,
    pub test_rate: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RiskType {
    ImplementationGap,
    CoverageGap,
    IncidentCorrelation,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TraceabilityRisk {
    pub risk_type: RiskType,
    pub requirement_id: NodeId,
    pub severity: Severity,
    pub message: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TraceabilityReport {
    pub matrix: BTreeMap<NodeId, TraceEntry>,
    pub coverage: TraceabilityCoverage,
    pub risks: Vec<TraceabilityRisk>,
    pub partial: bool,
}

fn trace(traversal: &Traversal, requirement: &NodeId) -> Result<TraceEntry, GraphError> {
    let code: BTreeSet<NodeId> = traversal
        .related(requirement, EdgeKind::Implements, Direction::Outgoing)?
        .into_iter()
        .map(|n| n.id)
        .collect();
    let mut tests = BTreeSet::new();
    let mut incidents = BTreeSet::new();
    for id in &code {
        for test in traversal.related(id, EdgeKind::TestedBy, Direction::Outgoing)? {
            tests.insert(test.id);
        }
        for incident in traversal.related(id, EdgeKind::TriggersIncident, Direction::Outgoing)? {
            incidents.insert(incident.id);
        }
    }
    for id in &tests {
        for incident in traversal.related(id, EdgeKind::TriggersIncident, Direction::Outgoing)? {
            incidents.insert(incident.id);
        }
    }
    Ok(TraceEntry {
        code: code.into_iter().collect(),
        tests: tests.into_iter().collect(),
        incidents: incidents.into_iter().collect(),
    })
}

fn risks_for(requirement: &NodeId, entry: &TraceEntry) -> Vec<TraceabilityRisk> {
    let mut risks = Vec::new();
    if entry.code.is_empty() {
        risks.push(TraceabilityRisk {
            risk_type: RiskType::ImplementationGap,
            requirement_id: requirement.clone(),
            severity: Severity::High,
            message: format!("{requirement} has no implementing code"),
        });
    } else if entry.tests.is_empty() {
        risks.push(TraceabilityRisk {
            risk_type: RiskType::CoverageGap,
            requirement_id: requirement.clone(),
            severity: Severity::Medium,
            message: format!(
                "{requirement} is implemented by {} declaration(s) with no tests",
                entry.code.len()
            ),
        });
    }
    if !entry.incidents.is_empty() {
        risks.push(TraceabilityRisk {
            risk_type: RiskType::IncidentCorrelation,
            requirement_id: requirement.clone(),
            severity: if entry.tests.is_empty() {
                Severity::Critical
            } else {
                Severity::High
            },
            message: format!("{requirement} is linked to {} incident(s)", entry.incidents.len()),
        });
    }
    risks
}

/// Matrix over every requirement in the graph.
pub fn traceability_report(
    traversal: &Traversal,
    deadline: &Deadline,
) -> Result<TraceabilityReport, GraphError> {
    let mut report = TraceabilityReport::default();
    let requirements = traversal.nodes_of_kind(NodeKind::Requirement)?;

    for requirement in &requirements {
        if deadline.expired() {
            report.partial = true;
            break;
        }
        let entry = trace(traversal, &requirement.id)?;
        report.risks.extend(risks_for(&requirement.id, &entry));
        report.matrix.insert(requirement.id.clone(), entry);
    }

    let total = report.matrix.len();
    let implemented = report.matrix.values().filter(|e| !e.code.is_empty()).count();
    let tested = report.matrix.values().filter(|e| !e.tests.is_empty()).count();
    let with_incidents = report.matrix.values().filter(|e| !e.incidents.is_empty()).count();
    report.coverage = TraceabilityCoverage {
        total_requirements: total,
        implemented,
        tested,
        with_incidents,
        implementation_rate: ratio(implemented, total, 0.0),
        test_rate: ratio(tested, total, 0.0),
    };
    Ok(report)
}
