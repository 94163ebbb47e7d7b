//! Tests for layered configuration loading.

use std::sync::Mutex;

use depgraph_core::config::{CliOverrides, DepgraphConfig};
use depgraph_core::errors::ConfigError;

/// Serializes tests that touch process environment variables.
static ENV_MUTEX: Mutex<()> = Mutex::new(());

fn clear_env() {
    for key in [
        "DEPGRAPH_SCAN_MAX_FILE_SIZE",
        "DEPGRAPH_SCAN_THREADS",
        "DEPGRAPH_PARSER_PARALLELISM",
        "DEPGRAPH_PARSER_DEEP_PARSE",
        "DEPGRAPH_PARSER_DEEP_TIMEOUT_MS",
        "DEPGRAPH_PARSER_DEEP_WORKERS",
        "DEPGRAPH_GRAPH_MAX_DEPTH",
        "DEPGRAPH_METRICS_COUPLING_NORMALIZATION",
    ] {
        std::env::remove_var(key);
    }
}

/// Points HOME at an empty directory so a developer's user config never leaks in.
fn isolated_home() -> tempfile::TempDir {
    let home = tempfile::TempDir::new().unwrap();
    std::env::set_var("HOME", home.path());
    home
}

#[test]
fn layers_resolve_cli_over_env_over_project() {
    let _lock = ENV_MUTEX.lock().unwrap();
    clear_env();
    let _home = isolated_home();

    let dir = tempfile::TempDir::new().unwrap();
    std::fs::write(
        dir.path().join("depgraph.toml"),
        r#"
[scan]
max_file_size = 2_000_000

[graph]
max_depth = 4

[parser]
parallelism = 2
"#,
    )
    .unwrap();

    std::env::set_var("DEPGRAPH_SCAN_MAX_FILE_SIZE", "5000000");
    std::env::set_var("DEPGRAPH_GRAPH_MAX_DEPTH", "6");

    let cli = CliOverrides {
        max_depth: Some(8),
        ..Default::default()
    };
    let config = DepgraphConfig::load(dir.path(), Some(&cli)).unwrap();

    assert_eq!(config.scan.max_file_size, Some(5_000_000));
    assert_eq!(config.graph.max_depth, Some(8));
    assert_eq!(config.parser.parallelism, Some(2));

    clear_env();
}

#[test]
fn user_config_is_lowest_file_layer() {
    let _lock = ENV_MUTEX.lock().unwrap();
    clear_env();
    let home = isolated_home();

    std::fs::create_dir_all(home.path().join(".depgraph")).unwrap();
    std::fs::write(
        home.path().join(".depgraph").join("config.toml"),
        "[metrics]\ncoupling_normalization = 20.0\n[graph]\nmax_depth = 3\n",
    )
    .unwrap();

    let dir = tempfile::TempDir::new().unwrap();
    std::fs::write(dir.path().join("depgraph.toml"), "[graph]\nmax_depth = 5\n").unwrap();

    let config = DepgraphConfig::load(dir.path(), None).unwrap();
    assert_eq!(config.graph.max_depth, Some(5));
    assert_eq!(config.metrics.effective_coupling_normalization(), 20.0);
}

#[test]
fn missing_files_fall_back_to_defaults() {
    let _lock = ENV_MUTEX.lock().unwrap();
    clear_env();
    let _home = isolated_home();

    let dir = tempfile::TempDir::new().unwrap();
    let config = DepgraphConfig::load(dir.path(), None).unwrap();

    assert_eq!(config.scan.effective_max_file_size(), 4 * 1024 * 1024);
    assert_eq!(config.graph.effective_max_depth(), 10);
    assert_eq!(config.graph.effective_test_markers(), vec!["Tests", "Тесты"]);
    assert!(!config.parser.effective_deep_parse());
    assert_eq!(config.metrics.effective_direct_weight(), 0.3);
    assert_eq!(config.coverage.effective_low_coverage(), 0.5);
}

#[test]
fn unparseable_env_values_are_ignored() {
    let _lock = ENV_MUTEX.lock().unwrap();
    clear_env();
    let _home = isolated_home();

    std::env::set_var("DEPGRAPH_PARSER_DEEP_PARSE", "maybe");
    let dir = tempfile::TempDir::new().unwrap();
    let config = DepgraphConfig::load(dir.path(), None).unwrap();
    assert_eq!(config.parser.deep_parse, None);

    clear_env();
}

#[test]
fn malformed_project_toml_is_a_parse_error() {
    let _lock = ENV_MUTEX.lock().unwrap();
    clear_env();
    let _home = isolated_home();

    let dir = tempfile::TempDir::new().unwrap();
    std::fs::write(dir.path().join("depgraph.toml"), "[scan\nmax_file_size = ").unwrap();
    let err = DepgraphConfig::load(dir.path(), None).unwrap_err();
    assert!(matches!(err, ConfigError::ParseError { .. }));
}

#[test]
fn validation_rejects_out_of_range_values() {
    let err = DepgraphConfig::from_toml("[coverage]\nlow_coverage = 1.5\n").unwrap_err();
    assert!(
        matches!(err, ConfigError::ValidationFailed { ref field, .. } if field == "coverage.low_coverage")
    );

    let err = DepgraphConfig::from_toml("[parser]\nparallelism = 0\n").unwrap_err();
    assert!(matches!(err, ConfigError::ValidationFailed { .. }));

    let err = DepgraphConfig::from_toml("[parser]\ndeep_workers = 0\n").unwrap_err();
    assert!(
        matches!(err, ConfigError::ValidationFailed { ref field, .. } if field == "parser.deep_workers")
    );

    let err = DepgraphConfig::from_toml("[metrics]\ncoupling_normalization = 0.0\n").unwrap_err();
    assert!(matches!(err, ConfigError::ValidationFailed { .. }));
}

#[test]
fn unknown_keys_are_tolerated() {
    let config = DepgraphConfig::from_toml("[scan]\nfuture_knob = true\nthreads = 3\n").unwrap();
    assert_eq!(config.scan.effective_threads(), 3);
}

#[test]
fn toml_serialization_survives_reload() {
    let config = DepgraphConfig::from_toml(
        "[graph]\ntest_markers = [\"Spec\"]\nmax_depth = 7\n[parser]\ndeep_parse = true\n",
    )
    .unwrap();
    let text = config.to_toml().unwrap();
    let again = DepgraphConfig::from_toml(&text).unwrap();
    assert_eq!(again.graph.effective_test_markers(), vec!["Spec"]);
    assert_eq!(again.graph.max_depth, Some(7));
    assert!(again.parser.effective_deep_parse());
}
