//! Tracing subscriber setup.

use std::sync::Once;

use tracing_subscriber::EnvFilter;

static INIT: Once = Once::new();

/// Environment variable holding the `EnvFilter` directives.
pub const LOG_ENV: &str = "DEPGRAPH_LOG";

/// Install a `fmt` subscriber filtered by `DEPGRAPH_LOG`
/// (default `depgraph=info`). Safe to call more than once; a subscriber
/// installed elsewhere wins.
pub fn init_tracing() {
    INIT.call_once(|| {
        let filter = EnvFilter::try_from_env(LOG_ENV)
            .unwrap_or_else(|_| EnvFilter::new("depgraph=info"));
        let _ = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(true)
            .try_init();
    });
}
