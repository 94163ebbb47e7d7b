//! V001: property graph tables and the parse cache.
//!
//! `kind` columns hold `NodeKind::tag()` / `EdgeKind::as_str()`; `props`
//! columns hold the property bag as a JSON object.

pub const MIGRATION_SQL: &str = r#"
CREATE TABLE IF NOT EXISTS nodes (
    id TEXT PRIMARY KEY,
    kind TEXT NOT NULL,
    display_name TEXT NOT NULL,
    props TEXT NOT NULL DEFAULT '{}'
) STRICT;

CREATE INDEX IF NOT EXISTS idx_nodes_kind ON nodes(kind);

CREATE TABLE IF NOT EXISTS edges (
    source_id TEXT NOT NULL REFERENCES nodes(id) ON DELETE CASCADE,
    target_id TEXT NOT NULL REFERENCES nodes(id) ON DELETE CASCADE,
    kind TEXT NOT NULL,
    props TEXT NOT NULL DEFAULT '{}',
    PRIMARY KEY (source_id, target_id, kind)
) STRICT;

CREATE INDEX IF NOT EXISTS idx_edges_target ON edges(target_id);

CREATE TABLE IF NOT EXISTS parse_cache (
    content_hash INTEGER NOT NULL,
    unit_kind TEXT NOT NULL,
    record_json TEXT NOT NULL,
    created_at INTEGER NOT NULL DEFAULT (unixepoch()),
    PRIMARY KEY (content_hash, unit_kind)
) STRICT;
"#;
