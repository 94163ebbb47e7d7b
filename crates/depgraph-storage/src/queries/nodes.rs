//! nodes table queries.

use depgraph_core::errors::StorageError;
use depgraph_core::types::{Node, NodeId, NodeKind};
use rusqlite::{params, Connection, OptionalExtension, Row};

use super::{decode_props, encode_props};
use crate::sqlite_err;

/// Raw column values of one node row.
pub(crate) struct NodeColumns {
    pub id: String,
    pub kind: String,
    pub display_name: String,
    pub props: String,
}

impl NodeColumns {
    /// Read four consecutive columns starting at `offset`.
    pub(crate) fn read(row: &Row<'_>, offset: usize) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(offset)?,
            kind: row.get(offset + 1)?,
            display_name: row.get(offset + 2)?,
            props: row.get(offset + 3)?,
        })
    }

    pub(crate) fn decode(self) -> Result<Node, StorageError> {
        let kind: NodeKind = self.kind.parse().map_err(|message| StorageError::CorruptRow {
            table: "nodes".to_string(),
            message,
        })?;
        Ok(Node {
            id: NodeId::new(self.id),
            kind,
            display_name: self.display_name,
            props: decode_props("nodes", &self.props)?,
        })
    }
}

pub fn get_node(conn: &Connection, id: &NodeId) -> Result<Option<Node>, StorageError> {
    let mut stmt = conn
        .prepare_cached("SELECT id, kind, display_name, props FROM nodes WHERE id = ?1")
        .map_err(sqlite_err)?;
    let columns = stmt
        .query_row(params![id.as_str()], |row| NodeColumns::read(row, 0))
        .optional()
        .map_err(sqlite_err)?;
    columns.map(NodeColumns::decode).transpose()
}

/// Stored kind tag of a node, if present.
pub fn node_kind_tag(conn: &Connection, id: &NodeId) -> Result<Option<String>, StorageError> {
    let mut stmt = conn
        .prepare_cached("SELECT kind FROM nodes WHERE id = ?1")
        .map_err(sqlite_err)?;
    stmt.query_row(params![id.as_str()], |row| row.get(0))
        .optional()
        .map_err(sqlite_err)
}

/// All nodes, optionally of one kind, ordered by id.
pub fn list_nodes(conn: &Connection, kind: Option<NodeKind>) -> Result<Vec<Node>, StorageError> {
    let mut out = Vec::new();
    match kind {
        Some(kind) => {
            let mut stmt = conn
                .prepare_cached(
                    "SELECT id, kind, display_name, props FROM nodes
                     WHERE kind = ?1 ORDER BY id",
                )
                .map_err(sqlite_err)?;
            let rows = stmt
                .query_map(params![kind.tag()], |row| NodeColumns::read(row, 0))
                .map_err(sqlite_err)?;
            for row in rows {
                out.push(row.map_err(sqlite_err)?.decode()?);
            }
        }
        None => {
            let mut stmt = conn
                .prepare_cached("SELECT id, kind, display_name, props FROM nodes ORDER BY id")
                .map_err(sqlite_err)?;
            let rows = stmt
                .query_map([], |row| NodeColumns::read(row, 0))
                .map_err(sqlite_err)?;
            for row in rows {
                out.push(row.map_err(sqlite_err)?.decode()?);
            }
        }
    }
    Ok(out)
}

/// Insert a node or update name and props in place. Never `INSERT OR
/// REPLACE`: a replace deletes the row first and would cascade its edges.
pub fn upsert_node(conn: &Connection, node: &Node) -> Result<(), StorageError> {
    let props = encode_props("nodes", &node.props)?;
    let mut stmt = conn
        .prepare_cached(
            "INSERT INTO nodes (id, kind, display_name, props) VALUES (?1, ?2, ?3, ?4)
             ON CONFLICT(id) DO UPDATE SET
                display_name = excluded.display_name,
                props = excluded.props",
        )
        .map_err(sqlite_err)?;
    stmt.execute(params![node.id.as_str(), node.kind.tag(), node.display_name, props])
        .map_err(sqlite_err)?;
    Ok(())
}

/// Delete a node; its edges go with it through the foreign keys.
pub fn delete_node(conn: &Connection, id: &NodeId) -> Result<usize, StorageError> {
    let mut stmt = conn
        .prepare_cached("DELETE FROM nodes WHERE id = ?1")
        .map_err(sqlite_err)?;
    stmt.execute(params![id.as_str()]).map_err(sqlite_err)
}

pub fn count_nodes(conn: &Connection) -> Result<usize, StorageError> {
    let n: i64 = conn
        .query_row("SELECT COUNT(*) FROM nodes", [], |row| row.get(0))
        .map_err(sqlite_err)?;
    Ok(n as usize)
}
