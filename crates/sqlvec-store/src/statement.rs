//! Structured SQL statements
//!
//! Every statement the store issues is built here as a value, rendered to
//! SQL text with `?` placeholders plus an ordered list of bind parameters.
//! Caller-supplied values are never spliced into the SQL text; only
//! validated identifiers and integer limits are.
//!
//! Author: hephaex@gmail.com

use sqlvec_core::{DistanceFunction, Metadata, Result, SqlvecError};

use crate::vector::format_vector;

/// Longest identifier accepted by MySQL-compatible servers
pub const MAX_IDENTIFIER_LEN: usize = 64;

// ============================================================================
// Identifiers
// ============================================================================

/// A validated table or index name
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Identifier(String);

impl Identifier {
    /// Validate a name: ASCII letter or underscore first, then letters, digits, underscores
    pub fn new(name: impl Into<String>) -> Result<Self> {
        let name = name.into();
        let mut chars = name.chars();
        let valid_start = chars
            .next()
            .map(|c| c.is_ascii_alphabetic() || c == '_')
            .unwrap_or(false);
        let valid_rest = chars.all(|c| c.is_ascii_alphanumeric() || c == '_');

        if !valid_start || !valid_rest || name.len() > MAX_IDENTIFIER_LEN {
            return Err(SqlvecError::ConfigError(format!(
                "Invalid SQL identifier: {name:?}"
            )));
        }
        Ok(Self(name))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Back-quoted form used in SQL text
    pub fn quoted(&self) -> String {
        format!("`{}`", self.0)
    }
}

impl std::fmt::Display for Identifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

// ============================================================================
// Parameters and rows
// ============================================================================

/// A bind parameter
#[derive(Debug, Clone, PartialEq)]
pub enum Param {
    Int(i64),
    Text(String),
    /// Nullable text (namespace and metadata columns)
    OptText(Option<String>),
}

/// Column values for one document row
#[derive(Debug, Clone, PartialEq)]
pub struct RowValues {
    pub content: String,
    pub embedding: Vec<f32>,
    pub namespace: Option<String>,
    pub metadata: Option<Metadata>,
}

impl RowValues {
    fn params(&self) -> Vec<Param> {
        vec![
            Param::Text(self.content.clone()),
            Param::Text(format_vector(&self.embedding)),
            Param::OptText(self.namespace.clone()),
            Param::OptText(self.metadata.as_ref().map(metadata_json)),
        ]
    }
}

fn metadata_json(metadata: &Metadata) -> String {
    // A JSON object of JSON values always serializes
    serde_json::Value::Object(metadata.clone()).to_string()
}

// ============================================================================
// Search Query
// ============================================================================

/// Nearest-neighbour query with the approximate-search hint
#[derive(Debug, Clone, PartialEq)]
pub struct SearchQuery {
    pub table: Identifier,
    pub embedding: Vec<f32>,
    pub distance: DistanceFunction,
    pub namespace: Option<String>,
    pub limit: usize,
}

impl SearchQuery {
    /// Render SQL text
    ///
    /// The distance expression is projected as `distance` and repeated in
    /// `ORDER BY`, followed by `APPROXIMATE LIMIT k` so the server answers
    /// from its vector index.
    pub fn sql(&self) -> String {
        let expr = format!("{}(vectors, ?)", self.distance.sql_function());
        let mut sql = format!(
            "SELECT content, metadata, {expr} AS distance FROM {}",
            self.table.quoted()
        );
        if self.namespace.is_some() {
            sql.push_str(" WHERE namespace = ?");
        }
        sql.push_str(&format!(" ORDER BY {expr} APPROXIMATE LIMIT {}", self.limit));
        sql
    }

    /// Bind parameters in placeholder order
    pub fn params(&self) -> Vec<Param> {
        let literal = format_vector(&self.embedding);
        let mut params = vec![Param::Text(literal.clone())];
        if let Some(namespace) = &self.namespace {
            params.push(Param::Text(namespace.clone()));
        }
        params.push(Param::Text(literal));
        params
    }
}

// ============================================================================
// Statements
// ============================================================================

/// Every statement the vector store sends to the database
#[derive(Debug, Clone, PartialEq)]
pub enum Statement {
    CreateTable {
        table: Identifier,
        dimension: usize,
    },
    CreateIndex {
        table: Identifier,
        index: Identifier,
        distance: DistanceFunction,
    },
    DropTable {
        table: Identifier,
    },
    /// Insert with an auto-assigned id
    Insert {
        table: Identifier,
        row: RowValues,
    },
    /// Replace-if-exists by id
    Upsert {
        table: Identifier,
        id: i64,
        row: RowValues,
    },
    Delete {
        table: Identifier,
        ids: Vec<i64>,
    },
    Search(SearchQuery),
}

impl Statement {
    /// Short name used in logs
    pub fn kind(&self) -> &'static str {
        match self {
            Self::CreateTable { .. } => "create_table",
            Self::CreateIndex { .. } => "create_index",
            Self::DropTable { .. } => "drop_table",
            Self::Insert { .. } => "insert",
            Self::Upsert { .. } => "upsert",
            Self::Delete { .. } => "delete",
            Self::Search(_) => "search",
        }
    }

    /// Render SQL text with `?` placeholders
    pub fn sql(&self) -> String {
        match self {
            Self::CreateTable { table, dimension } => format!(
                "CREATE TABLE IF NOT EXISTS {} (\
                 id BIGINT PRIMARY KEY AUTO_INCREMENT, \
                 content TEXT, \
                 vectors VECTOR({dimension}), \
                 namespace VARCHAR(255) NULL, \
                 metadata JSON NULL)",
                table.quoted()
            ),
            Self::CreateIndex {
                table,
                index,
                distance,
            } => format!(
                "CREATE VECTOR INDEX {} ON {} (vectors) WITH (distance={}, type=hnsw, lib=vsag)",
                index.quoted(),
                table.quoted(),
                distance.index_metric()
            ),
            Self::DropTable { table } => format!("DROP TABLE IF EXISTS {}", table.quoted()),
            Self::Insert { table, .. } => format!(
                "INSERT INTO {} (content, vectors, namespace, metadata) VALUES (?, ?, ?, ?)",
                table.quoted()
            ),
            Self::Upsert { table, .. } => format!(
                "REPLACE INTO {} (id, content, vectors, namespace, metadata) VALUES (?, ?, ?, ?, ?)",
                table.quoted()
            ),
            Self::Delete { table, ids } => {
                let placeholders = vec!["?"; ids.len()].join(", ");
                format!(
                    "DELETE FROM {} WHERE id IN ({placeholders})",
                    table.quoted()
                )
            }
            Self::Search(query) => query.sql(),
        }
    }

    /// Bind parameters in placeholder order
    pub fn params(&self) -> Vec<Param> {
        match self {
            Self::CreateTable { .. } | Self::CreateIndex { .. } | Self::DropTable { .. } => {
                Vec::new()
            }
            Self::Insert { row, .. } => row.params(),
            Self::Upsert { id, row, .. } => {
                let mut params = vec![Param::Int(*id)];
                params.extend(row.params());
                params
            }
            Self::Delete { ids, .. } => ids.iter().map(|id| Param::Int(*id)).collect(),
            Self::Search(query) => query.params(),
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
