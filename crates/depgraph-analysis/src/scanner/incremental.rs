//! Incremental change detection against a previous scan's hashes.

use depgraph_core::types::collections::{FxHashMap, FxHashSet};

use super::types::{ScanDiff, SourceUnit};

/// `path → content hash` for every unit of a scan.
pub fn snapshot(units: &[SourceUnit]) -> FxHashMap<String, u64> {
    units.iter().map(|u| (u.path.clone(), u.hash)).collect()
}

/// Classify `units` as added / modified / unchanged and list paths that
/// were in `previous` but are gone. All lists are sorted.
pub fn compute_diff(units: &[SourceUnit], previous: &FxHashMap<String, u64>) -> ScanDiff {
    let mut diff = ScanDiff::default();
    let mut seen: FxHashSet<&str> = FxHashSet::default();

    for unit in units {
        seen.insert(unit.path.as_str());
        match previous.get(&unit.path) {
            None => diff.added.push(unit.path.clone()),
            Some(&hash) if hash == unit.hash => diff.unchanged.push(unit.path.clone()),
            Some(_) => diff.modified.push(unit.path.clone()),
        }
    }
    for path in previous.keys() {
        if !seen.contains(path.as_str()) {
            diff.removed.push(path.clone());
        }
    }

    diff.added.sort();
    diff.modified.sort();
    diff.unchanged.sort();
    diff.removed.sort();
    diff
}
