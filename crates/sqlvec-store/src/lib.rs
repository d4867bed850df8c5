//! sqlvec Store - Vector store over SQL databases with native VECTOR columns
//!
//! Stores texts with their embeddings in a MySQL-compatible database and
//! retrieves nearest neighbours through the server's approximate vector index.

use async_trait::async_trait;
use sqlvec_core::{Document, Metadata, Result, ScoredDocument};

pub mod database;
pub mod prompt;
pub mod statement;
pub mod store;
pub mod vector;

pub use database::{MySqlDatabase, SearchRow, VectorDatabase};
pub use prompt::PromptBuilder;
pub use statement::{Identifier, Param, RowValues, SearchQuery, Statement};
pub use store::{SqlVectorStore, StoreOptions};
pub use vector::{format_vector, parse_vector};

/// Trait for vector store operations
#[async_trait]
pub trait VectorStore: Send + Sync {
    /// Embed and store texts; returns ids in input order
    ///
    /// Without `ids` every text is inserted under a generated id. With `ids`
    /// each text replaces the row with the matching id.
    async fn add_texts(
        &self,
        texts: &[String],
        ids: Option<&[i64]>,
        metadata: Option<&[Metadata]>,
    ) -> Result<Vec<i64>>;

    /// Overwrite the rows with the given ids
    async fn update_texts(
        &self,
        texts: &[String],
        ids: &[i64],
        metadata: Option<&[Metadata]>,
    ) -> Result<Vec<i64>> {
        self.add_texts(texts, Some(ids), metadata).await
    }

    /// Delete rows by id; returns the number deleted
    async fn remove_texts(&self, ids: &[i64]) -> Result<u64>;

    /// Embed the query and search by vector
    async fn similarity_search(&self, query: &str, k: usize) -> Result<Vec<Document>>;

    /// Search for the `k` nearest documents
    async fn similarity_search_by_vector(
        &self,
        embedding: &[f32],
        k: usize,
    ) -> Result<Vec<Document>>;

    /// Search by vector, keeping the computed distances
    async fn similarity_search_with_score_by_vector(
        &self,
        embedding: &[f32],
        k: usize,
    ) -> Result<Vec<ScoredDocument>>;
}
