//! Top-level depgraph configuration with layered resolution.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use super::{CoverageConfig, GraphConfig, MetricsConfig, ParserConfig, ScanConfig};
use crate::errors::ConfigError;

/// Resolution order (highest priority first):
/// 1. CLI flags (applied via `apply_cli_overrides`)
/// 2. Environment variables (`DEPGRAPH_*`)
/// 3. Project config (`depgraph.toml` in the ingestion root)
/// 4. User config (`~/.depgraph/config.toml`)
/// 5. Compiled defaults
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct DepgraphConfig {
    pub scan: ScanConfig,
    pub parser: ParserConfig,
    pub graph: GraphConfig,
    pub metrics: MetricsConfig,
    pub coverage: CoverageConfig,
}

/// CLI override arguments that can be applied to a config.
#[derive(Debug, Clone, Default)]
pub struct CliOverrides {
    pub scan_max_file_size: Option<u64>,
    pub parser_parallelism: Option<usize>,
    pub deep_parse: Option<bool>,
    pub max_depth: Option<u32>,
}

impl DepgraphConfig {
    pub fn load(root: &Path, cli_overrides: Option<&CliOverrides>) -> Result<Self, ConfigError> {
        let mut config = Self::default();

        if let Some(user_config_path) = user_config_path() {
            if user_config_path.exists() {
                match Self::merge_toml_file(&mut config, &user_config_path) {
                    Ok(()) => {}
                    Err(e @ ConfigError::ParseError { .. }) => return Err(e),
                    Err(e) => {
                        tracing::warn!(error = %e, "ignoring unreadable user config");
                    }
                }
            }
        }

        let project_config_path = root.join("depgraph.toml");
        if project_config_path.exists() {
            Self::merge_toml_file(&mut config, &project_config_path)?;
        }

        Self::apply_env_overrides(&mut config);

        if let Some(cli) = cli_overrides {
            Self::apply_cli_overrides(&mut config, cli);
        }

        Self::validate(&config)?;
        Ok(config)
    }

    /// Load configuration from a TOML string.
    pub fn from_toml(toml_str: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(toml_str).map_err(|e| ConfigError::ParseError {
            path: "<string>".to_string(),
            message: e.to_string(),
        })?;
        Self::validate(&config)?;
        Ok(config)
    }

    pub fn validate(config: &DepgraphConfig) -> Result<(), ConfigError> {
        if config.scan.max_file_size == Some(0) {
            return Err(ConfigError::ValidationFailed {
                field: "scan.max_file_size".to_string(),
                message: "must be greater than 0".to_string(),
            });
        }
        if config.parser.parallelism == Some(0) {
            return Err(ConfigError::ValidationFailed {
                field: "parser.parallelism".to_string(),
                message: "must be at least 1".to_string(),
            });
        }
        if config.parser.deep_workers == Some(0) {
            return Err(ConfigError::ValidationFailed {
                field: "parser.deep_workers".to_string(),
                message: "must be at least 1".to_string(),
            });
        }
        if config.graph.max_depth == Some(0) {
            return Err(ConfigError::ValidationFailed {
                field: "graph.max_depth".to_string(),
                message: "must be at least 1".to_string(),
            });
        }
        if let Some(n) = config.metrics.coupling_normalization {
            if !(n > 0.0) {
                return Err(ConfigError::ValidationFailed {
                    field: "metrics.coupling_normalization".to_string(),
                    message: "must be positive".to_string(),
                });
            }
        }
        if let Some(t) = config.coverage.low_coverage {
            if !(0.0..=1.0).contains(&t) {
                return Err(ConfigError::ValidationFailed {
                    field: "coverage.low_coverage".to_string(),
                    message: "must be between 0.0 and 1.0".to_string(),
                });
            }
        }
        Ok(())
    }

    /// Unknown keys are ignored (forward-compatible).
    fn merge_toml_file(config: &mut DepgraphConfig, path: &Path) -> Result<(), ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|_| ConfigError::FileNotFound {
            path: path.display().to_string(),
        })?;
        let file_config: DepgraphConfig =
            toml::from_str(&content).map_err(|e| ConfigError::ParseError {
                path: path.display().to_string(),
                message: e.to_string(),
            })?;
        config.merge(&file_config);
        Ok(())
    }

    /// Values set in `other` override `self`.
    pub fn merge(&mut self, other: &DepgraphConfig) {
        self.scan.merge_from(&other.scan);
        self.parser.merge_from(&other.parser);
        self.graph.merge_from(&other.graph);
        self.metrics.merge_from(&other.metrics);
        self.coverage.merge_from(&other.coverage);
    }

    /// Pattern: `DEPGRAPH_<SECTION>_<FIELD>`. Unparseable values are ignored.
    fn apply_env_overrides(config: &mut DepgraphConfig) {
        if let Some(v) = env_parse::<u64>("DEPGRAPH_SCAN_MAX_FILE_SIZE") {
            config.scan.max_file_size = Some(v);
        }
        if let Some(v) = env_parse::<usize>("DEPGRAPH_SCAN_THREADS") {
            config.scan.threads = Some(v);
        }
        if let Some(v) = env_parse::<usize>("DEPGRAPH_PARSER_PARALLELISM") {
            config.parser.parallelism = Some(v);
        }
        if let Some(v) = env_parse::<bool>("DEPGRAPH_PARSER_DEEP_PARSE") {
            config.parser.deep_parse = Some(v);
        }
        if let Some(v) = env_parse::<u64>("DEPGRAPH_PARSER_DEEP_TIMEOUT_MS") {
            config.parser.deep_timeout_ms = Some(v);
        }
        if let Some(v) = env_parse::<usize>("DEPGRAPH_PARSER_DEEP_WORKERS") {
            config.parser.deep_workers = Some(v);
        }
        if let Some(v) = env_parse::<u32>("DEPGRAPH_GRAPH_MAX_DEPTH") {
            config.graph.max_depth = Some(v);
        }
        if let Some(v) = env_parse::<f64>("DEPGRAPH_METRICS_COUPLING_NORMALIZATION") {
            config.metrics.coupling_normalization = Some(v);
        }
    }

    fn apply_cli_overrides(config: &mut DepgraphConfig, cli: &CliOverrides) {
        if let Some(v) = cli.scan_max_file_size {
            config.scan.max_file_size = Some(v);
        }
        if let Some(v) = cli.parser_parallelism {
            config.parser.parallelism = Some(v);
        }
        if let Some(v) = cli.deep_parse {
            config.parser.deep_parse = Some(v);
        }
        if let Some(v) = cli.max_depth {
            config.graph.max_depth = Some(v);
        }
    }

    pub fn to_toml(&self) -> Result<String, ConfigError> {
        toml::to_string_pretty(self).map_err(|e| ConfigError::ParseError {
            path: "<serialization>".to_string(),
            message: e.to_string(),
        })
    }
}

fn env_parse<T: std::str::FromStr>(key: &str) -> Option<T> {
    std::env::var(key).ok().and_then(|v| v.parse::<T>().ok())
}

/// `~/.depgraph/config.toml`.
fn user_config_path() -> Option<PathBuf> {
    std::env::var_os("HOME")
        .or_else(|| std::env::var_os("USERPROFILE"))
        .map(|h| PathBuf::from(h).join(".depgraph").join("config.toml"))
}
