//! Source reader. Walks an exported tree and classifies its files.
//!
//! Produces one `SourceUnit` per metadata descriptor or `.bsl` module.
//! Unreadable files are skipped and recorded; only an invalid root is fatal.

pub mod classify;
pub mod hasher;
pub mod incremental;
pub mod scanner;
pub mod types;
pub mod walker;

pub use scanner::Scanner;
pub use types::{ScanDiff, ScanOutput, ScanStats, SkippedUnit, SourceUnit, UnitKind};
