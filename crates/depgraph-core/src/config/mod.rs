//! Configuration system for depgraph.
//! TOML-based, layered resolution: CLI > env > project > user > defaults.

pub mod coverage_config;
pub mod depgraph_config;
pub mod graph_config;
pub mod metrics_config;
pub mod parser_config;
pub mod scan_config;

pub use coverage_config::CoverageConfig;
pub use depgraph_config::{CliOverrides, DepgraphConfig};
pub use graph_config::GraphConfig;
pub use metrics_config::MetricsConfig;
pub use parser_config::ParserConfig;
pub use scan_config::ScanConfig;
