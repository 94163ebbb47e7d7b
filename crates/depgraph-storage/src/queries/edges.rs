//! edges table queries.

use depgraph_core::errors::StorageError;
use depgraph_core::types::{Edge, EdgeKey, EdgeKind, Node, NodeId};
use rusqlite::{params, Connection, Row};

use super::nodes::NodeColumns;
use super::{decode_props, encode_props};
use crate::sqlite_err;

struct EdgeColumns {
    source_id: String,
    target_id: String,
    kind: String,
    props: String,
}

impl EdgeColumns {
    fn read(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            source_id: row.get(0)?,
            target_id: row.get(1)?,
            kind: row.get(2)?,
            props: row.get(3)?,
        })
    }

    fn decode(self) -> Result<Edge, StorageError> {
        let kind: EdgeKind = self.kind.parse().map_err(|message| StorageError::CorruptRow {
            table: "edges".to_string(),
            message,
        })?;
        Ok(Edge {
            source_id: NodeId::new(self.source_id),
            target_id: NodeId::new(self.target_id),
            kind,
            props: decode_props("edges", &self.props)?,
        })
    }
}

pub fn upsert_edge(conn: &Connection, edge: &Edge) -> Result<(), StorageError> {
    let props = encode_props("edges", &edge.props)?;
    let mut stmt = conn
        .prepare_cached(
            "INSERT INTO edges (source_id, target_id, kind, props) VALUES (?1, ?2, ?3, ?4)
             ON CONFLICT(source_id, target_id, kind) DO UPDATE SET props = excluded.props",
        )
        .map_err(sqlite_err)?;
    stmt.execute(params![
        edge.source_id.as_str(),
        edge.target_id.as_str(),
        edge.kind.as_str(),
        props,
    ])
    .map_err(sqlite_err)?;
    Ok(())
}

pub fn delete_edge(conn: &Connection, key: &EdgeKey) -> Result<usize, StorageError> {
    let mut stmt = conn
        .prepare_cached("DELETE FROM edges WHERE source_id = ?1 AND target_id = ?2 AND kind = ?3")
        .map_err(sqlite_err)?;
    stmt.execute(params![
        key.source_id.as_str(),
        key.target_id.as_str(),
        key.kind.as_str(),
    ])
    .map_err(sqlite_err)
}

pub fn count_edges(conn: &Connection) -> Result<usize, StorageError> {
    let n: i64 = conn
        .query_row("SELECT COUNT(*) FROM edges", [], |row| row.get(0))
        .map_err(sqlite_err)?;
    Ok(n as usize)
}

/// Every edge, in storage order. Callers sort by `EdgeKey`.
pub fn list_edges(conn: &Connection) -> Result<Vec<Edge>, StorageError> {
    let mut stmt = conn
        .prepare_cached("SELECT source_id, target_id, kind, props FROM edges")
        .map_err(sqlite_err)?;
    let rows = stmt.query_map([], EdgeColumns::read).map_err(sqlite_err)?;
    let mut out = Vec::new();
    for row in rows {
        out.push(row.map_err(sqlite_err)?.decode()?);
    }
    Ok(out)
}

fn edges_with_nodes(conn: &Connection, sql: &str, id: &NodeId) -> Result<Vec<(Edge, Node)>, StorageError> {
    let mut stmt = conn.prepare_cached(sql).map_err(sqlite_err)?;
    let rows = stmt
        .query_map(params![id.as_str()], |row| {
            Ok((EdgeColumns::read(row)?, NodeColumns::read(row, 4)?))
        })
        .map_err(sqlite_err)?;
    let mut out = Vec::new();
    for row in rows {
        let (edge, node) = row.map_err(sqlite_err)?;
        out.push((edge.decode()?, node.decode()?));
    }
    Ok(out)
}

/// Edges leaving `id`, each with its target node.
pub fn outgoing(conn: &Connection, id: &NodeId) -> Result<Vec<(Edge, Node)>, StorageError> {
    edges_with_nodes(
        conn,
        "SELECT e.source_id, e.target_id, e.kind, e.props,
                n.id, n.kind, n.display_name, n.props
         FROM edges e JOIN nodes n ON n.id = e.target_id
         WHERE e.source_id = ?1",
        id,
    )
}

/// Edges arriving at `id`, each with its source node.
pub fn incoming(conn: &Connection, id: &NodeId) -> Result<Vec<(Edge, Node)>, StorageError> {
    edges_with_nodes(
        conn,
        "SELECT e.source_id, e.target_id, e.kind, e.props,
                n.id, n.kind, n.display_name, n.props
         FROM edges e JOIN nodes n ON n.id = e.source_id
         WHERE e.target_id = ?1",
        id,
    )
}
