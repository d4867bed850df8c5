//! SQL implementation of the vector store
//!
//! Translates store operations into structured statements executed through
//! a [`VectorDatabase`], and shapes search rows into documents.
//!
//! Author: hephaex@gmail.com

use async_trait::async_trait;
use sqlvec_core::{
    AppConfig, AskResponse, ChatClient, ChatMessage, DistanceFunction, Document, EmbeddingClient,
    Metadata, Result, ScoredDocument, SqlvecError, StoreConfig,
};
use std::sync::Arc;

use crate::database::{MySqlDatabase, SearchRow, VectorDatabase};
use crate::prompt::{PromptBuilder, CONTEXT_SEPARATOR, DEFAULT_SYSTEM_INSTRUCTION};
use crate::statement::{
    Identifier, RowValues, SearchQuery, Statement, MAX_IDENTIFIER_LEN,
};
use crate::VectorStore;

const INDEX_SUFFIX: &str = "_vectors_idx";

/// Static configuration of a store instance
#[derive(Debug, Clone)]
pub struct StoreOptions {
    /// Table name
    pub table: String,

    /// Distance function for ranking and for the index
    pub distance: DistanceFunction,

    /// Namespace written on insert and required on search
    pub namespace: Option<String>,
}

impl Default for StoreOptions {
    fn default() -> Self {
        StoreConfig::default().into()
    }
}

impl From<StoreConfig> for StoreOptions {
    fn from(config: StoreConfig) -> Self {
        Self {
            table: config.table,
            distance: config.distance,
            namespace: config.namespace,
        }
    }
}

impl StoreOptions {
    /// Create options for a table with cosine distance and no namespace
    pub fn new(table: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            ..Default::default()
        }
    }

    /// Set distance function
    pub fn with_distance(mut self, distance: DistanceFunction) -> Self {
        self.distance = distance;
        self
    }

    /// Scope the store to a namespace
    pub fn with_namespace(mut self, namespace: impl Into<String>) -> Self {
        self.namespace = Some(namespace.into());
        self
    }
}

/// Vector store backed by a SQL table with a VECTOR column
pub struct SqlVectorStore {
    db: Arc<dyn VectorDatabase>,
    embedder: Arc<dyn EmbeddingClient>,
    chat: Option<Arc<dyn ChatClient>>,
    table: Identifier,
    index: Identifier,
    distance: DistanceFunction,
    namespace: Option<String>,
    system_instruction: String,
}

impl SqlVectorStore {
    /// Create a store over an existing database handle and embedding provider
    pub fn new(
        db: Arc<dyn VectorDatabase>,
        embedder: Arc<dyn EmbeddingClient>,
        options: StoreOptions,
    ) -> Result<Self> {
        let table = Identifier::new(options.table)?;
        let index = index_name(&table)?;

        Ok(Self {
            db,
            embedder,
            chat: None,
            table,
            index,
            distance: options.distance,
            namespace: options.namespace,
            system_instruction: DEFAULT_SYSTEM_INSTRUCTION.to_string(),
        })
    }

    /// Connect using application config: MySQL pool, embedding and chat providers
    pub async fn connect(config: &AppConfig) -> Result<Self> {
        let db = MySqlDatabase::from_config(&config.database).await?;
        let embedder = sqlvec_llm::create_embedding_client(&config.llm)?;
        let chat = sqlvec_llm::create_chat_client(&config.llm)?;

        Ok(Self::new(
            Arc::new(db),
            Arc::from(embedder),
            config.store.clone().into(),
        )?
        .with_chat_client(Arc::from(chat)))
    }

    /// Set the chat model used by [`ask`](Self::ask)
    pub fn with_chat_client(mut self, chat: Arc<dyn ChatClient>) -> Self {
        self.chat = Some(chat);
        self
    }

    /// Replace the system instruction sent with every question
    pub fn with_system_instruction(mut self, instruction: impl Into<String>) -> Self {
        self.system_instruction = instruction.into();
        self
    }

    pub fn table(&self) -> &str {
        self.table.as_str()
    }

    pub fn distance(&self) -> DistanceFunction {
        self.distance
    }

    pub fn namespace(&self) -> Option<&str> {
        self.namespace.as_deref()
    }

    /// Create the table and its vector index
    ///
    /// Safe to call repeatedly: an index that already exists counts as success.
    pub async fn create_default_schema(&self) -> Result<()> {
        let dimension = self.embedder.dimension();
        self.db
            .execute(&Statement::CreateTable {
                table: self.table.clone(),
                dimension,
            })
            .await?;

        let create_index = Statement::CreateIndex {
            table: self.table.clone(),
            index: self.index.clone(),
            distance: self.distance,
        };
        match self.db.execute(&create_index).await {
            Ok(_) => {
                tracing::info!(
                    table = %self.table,
                    index = %self.index,
                    dimension,
                    distance = %self.distance,
                    "Created vector table and index"
                );
            }
            Err(SqlvecError::AlreadyExists(msg)) => {
                tracing::info!(index = %self.index, %msg, "Vector index already exists");
            }
            Err(e) => return Err(e),
        }

        Ok(())
    }

    /// Drop the table if it exists
    pub async fn destroy_default_schema(&self) -> Result<()> {
        self.db
            .execute(&Statement::DropTable {
                table: self.table.clone(),
            })
            .await?;
        tracing::info!(table = %self.table, "Dropped vector table");
        Ok(())
    }

    /// Replace-by-id for every text
    pub async fn upsert_texts(
        &self,
        texts: &[String],
        ids: &[i64],
        metadata: Option<&[Metadata]>,
    ) -> Result<Vec<i64>> {
        self.add_texts(texts, Some(ids), metadata).await
    }

    /// Embed the query and search, keeping the computed distances
    pub async fn similarity_search_with_score(
        &self,
        query: &str,
        k: usize,
    ) -> Result<Vec<ScoredDocument>> {
        let embedding = self.embedder.embed(query).await?;
        self.similarity_search_with_score_by_vector(&embedding, k)
            .await
    }

    /// Answer a question from the `k` nearest documents
    pub async fn ask(&self, question: &str, k: usize) -> Result<AskResponse> {
        let chat = self
            .chat
            .as_ref()
            .ok_or_else(|| SqlvecError::ConfigError("No chat client configured".to_string()))?;

        let documents = self.similarity_search(question, k).await?;
        let context = documents
            .iter()
            .map(|d| d.content.as_str())
            .collect::<Vec<_>>()
            .join(CONTEXT_SEPARATOR);

        let mut builder = PromptBuilder::new().question(question);
        if !context.is_empty() {
            builder = builder.add_context(context.clone());
        }
        let messages = [
            ChatMessage::system(self.system_instruction.clone()),
            ChatMessage::user(builder.build()),
        ];

        tracing::info!(
            documents = documents.len(),
            context_chars = context.len(),
            "Calling chat model"
        );
        let answer = chat.chat(&messages).await?;

        Ok(AskResponse {
            answer,
            context,
            documents,
        })
    }

    fn row(&self, content: &str, embedding: Vec<f32>, metadata: Option<Metadata>) -> RowValues {
        RowValues {
            content: content.to_string(),
            embedding,
            namespace: self.namespace.clone(),
            metadata,
        }
    }
}

/// Name of the vector index: `<table>_vectors_idx`, with the table part cut so
/// the whole name stays within the identifier length limit
fn index_name(table: &Identifier) -> Result<Identifier> {
    let keep = MAX_IDENTIFIER_LEN - INDEX_SUFFIX.len();
    // Identifiers are ASCII, so any byte offset is a char boundary
    let prefix = &table.as_str()[..table.as_str().len().min(keep)];
    Identifier::new(format!("{prefix}{INDEX_SUFFIX}"))
}

/// Shape a raw row into the uniform document form
fn shape_row(row: SearchRow) -> ScoredDocument {
    let metadata = match row.metadata.map(|json| json.0) {
        Some(serde_json::Value::Object(map)) => map,
        _ => Metadata::new(),
    };

    ScoredDocument {
        document: Document {
            content: row.content.unwrap_or_default(),
            metadata,
        },
        distance: row.distance.unwrap_or(f64::INFINITY),
    }
}

fn check_len(what: &str, expected: usize, actual: usize) -> Result<()> {
    if expected != actual {
        return Err(SqlvecError::ValidationError(format!(
            "Expected {expected} {what}, got {actual}"
        )));
    }
    Ok(())
}

#[async_trait]
impl VectorStore for SqlVectorStore {
    async fn add_texts(
        &self,
        texts: &[String],
        ids: Option<&[i64]>,
        metadata: Option<&[Metadata]>,
    ) -> Result<Vec<i64>> {
        if let Some(ids) = ids {
            check_len("ids", texts.len(), ids.len())?;
        }
        if let Some(metadata) = metadata {
            check_len("metadata entries", texts.len(), metadata.len())?;
        }

        let mut result = Vec::with_capacity(texts.len());
        for (i, text) in texts.iter().enumerate() {
            let embedding = self.embedder.embed(text).await?;
            let row = self.row(text, embedding, metadata.map(|m| m[i].clone()));

            let id = match ids {
                Some(ids) => {
                    self.db
                        .execute(&Statement::Upsert {
                            table: self.table.clone(),
                            id: ids[i],
                            row,
                        })
                        .await?;
                    ids[i]
                }
                None => {
                    self.db
                        .insert(&Statement::Insert {
                            table: self.table.clone(),
                            row,
                        })
                        .await?
                }
            };
            result.push(id);
        }

        tracing::info!(
            table = %self.table,
            count = result.len(),
            upsert = ids.is_some(),
            "Stored texts"
        );
        Ok(result)
    }

    async fn remove_texts(&self, ids: &[i64]) -> Result<u64> {
        if ids.is_empty() {
            return Ok(0);
        }

        let deleted = self
            .db
            .execute(&Statement::Delete {
                table: self.table.clone(),
                ids: ids.to_vec(),
            })
            .await?;

        tracing::info!(table = %self.table, requested = ids.len(), deleted, "Removed texts");
        Ok(deleted)
    }

    async fn similarity_search(&self, query: &str, k: usize) -> Result<Vec<Document>> {
        let embedding = self.embedder.embed(query).await?;
        self.similarity_search_by_vector(&embedding, k).await
    }

    async fn similarity_search_by_vector(
        &self,
        embedding: &[f32],
        k: usize,
    ) -> Result<Vec<Document>> {
        Ok(self
            .similarity_search_with_score_by_vector(embedding, k)
            .await?
            .into_iter()
            .map(|hit| hit.document)
            .collect())
    }

    async fn similarity_search_with_score_by_vector(
        &self,
        embedding: &[f32],
        k: usize,
    ) -> Result<Vec<ScoredDocument>> {
        if k == 0 {
            return Ok(Vec::new());
        }

        let query = SearchQuery {
            table: self.table.clone(),
            embedding: embedding.to_vec(),
            distance: self.distance,
            namespace: self.namespace.clone(),
            limit: k,
        };
        let rows = self.db.search(&query).await?;
        tracing::debug!(k, returned = rows.len(), "Vector search completed");

        Ok(rows.into_iter().take(k).map(shape_row).collect())
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::statement::Param;
    use sqlx::types::Json;
    use std::sync::Mutex;

    /// Records statements and replays canned results
    #[derive(Default)]
    struct RecordingDatabase {
        statements: Mutex<Vec<Statement>>,
        next_id: Mutex<i64>,
        rows: Vec<SearchRow>,
        index_exists: bool,
        fail_index: bool,
    }

    impl RecordingDatabase {
        fn statements(&self) -> Vec<Statement> {
            self.statements.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl VectorDatabase for RecordingDatabase {
        async fn execute(&self, statement: &Statement) -> Result<u64> {
            self.statements.lock().unwrap().push(statement.clone());
            match statement {
                Statement::CreateIndex { .. } if self.fail_index => {
                    Err(SqlvecError::DatabaseError("disk full".to_string()))
                }
                Statement::CreateIndex { .. } if self.index_exists => Err(
                    SqlvecError::AlreadyExists("Duplicate key name".to_string()),
                ),
                Statement::Delete { ids, .. } => Ok(ids.len() as u64),
                _ => Ok(1),
            }
        }

        async fn insert(&self, statement: &Statement) -> Result<i64> {
            self.statements.lock().unwrap().push(statement.clone());
            let mut next = self.next_id.lock().unwrap();
            *next += 1;
            Ok(*next + 100)
        }

        async fn search(&self, query: &SearchQuery) -> Result<Vec<SearchRow>> {
            self.statements
                .lock()
                .unwrap()
                .push(Statement::Search(query.clone()));
            Ok(self.rows.clone())
        }
    }

    /// Embeds every text as `[len, 1.0]`
    struct LengthEmbedder;

    #[async_trait]
    impl EmbeddingClient for LengthEmbedder {
        async fn embed(&self, text: &str) -> Result<Vec<f32>> {
            Ok(vec![text.len() as f32, 1.0])
        }

        async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
            let mut out = Vec::new();
            for text in texts {
                out.push(self.embed(text).await?);
            }
            Ok(out)
        }

        fn dimension(&self) -> usize {
            2
        }
    }

    struct EchoChat;

    #[async_trait]
    impl ChatClient for EchoChat {
        async fn chat(&self, messages: &[ChatMessage]) -> Result<String> {
            Ok(format!("{} messages", messages.len()))
        }
    }

    fn store(db: Arc<RecordingDatabase>, options: StoreOptions) -> SqlVectorStore {
        SqlVectorStore::new(db, Arc::new(LengthEmbedder), options).unwrap()
    }

    fn texts(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_invalid_table_name_rejected() {
        let result = SqlVectorStore::new(
            Arc::new(RecordingDatabase::default()),
            Arc::new(LengthEmbedder),
            StoreOptions::new("docs; DROP TABLE x"),
        );
        assert!(matches!(result, Err(SqlvecError::ConfigError(_))));
    }

    #[tokio::test]
    async fn test_longest_table_name_gets_fitting_index_name() {
        let name = "t".repeat(64);
        let db = Arc::new(RecordingDatabase::default());
        let store = store(db.clone(), StoreOptions::new(name.clone()));
        assert_eq!(store.table(), name);

        store.create_default_schema().await.unwrap();
        match &db.statements()[1] {
            Statement::CreateIndex { index, .. } => {
                assert_eq!(index.as_str().len(), 64);
                assert_eq!(index.as_str(), format!("{}_vectors_idx", "t".repeat(52)));
            }
            other => panic!("unexpected statement: {other:?}"),
        }
    }

    #[test]
    fn test_short_table_index_name_is_untruncated() {
        let table = Identifier::new("docs").unwrap();
        assert_eq!(index_name(&table).unwrap().as_str(), "docs_vectors_idx");
    }

    #[test]
    fn test_options_from_config() {
        let options: StoreOptions = StoreConfig {
            table: "kb".to_string(),
            namespace: Some("ns".to_string()),
            distance: DistanceFunction::InnerProduct,
        }
        .into();
        assert_eq!(options.table, "kb");
        assert_eq!(options.namespace.as_deref(), Some("ns"));
        assert_eq!(options.distance, DistanceFunction::InnerProduct);
    }

    #[tokio::test]
    async fn test_add_texts_without_ids_inserts_in_order() {
        let db = Arc::new(RecordingDatabase::default());
        let store = store(db.clone(), StoreOptions::new("docs").with_namespace("tenant"));

        let ids = store
            .add_texts(&texts(&["a", "bb", "ccc"]), None, None)
            .await
            .unwrap();
        assert_eq!(ids, vec![101, 102, 103]);

        let statements = db.statements();
        assert_eq!(statements.len(), 3);
        match &statements[1] {
            Statement::Insert { row, .. } => {
                assert_eq!(row.content, "bb");
                assert_eq!(row.embedding, vec![2.0, 1.0]);
                assert_eq!(row.namespace.as_deref(), Some("tenant"));
                assert!(row.metadata.is_none());
            }
            other => panic!("unexpected statement: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_add_texts_with_ids_upserts() {
        let db = Arc::new(RecordingDatabase::default());
        let store = store(db.clone(), StoreOptions::new("docs"));

        let mut meta = Metadata::new();
        meta.insert("page".to_string(), serde_json::json!(3));
        let metadata = vec![Metadata::new(), meta];

        let ids = store
            .add_texts(&texts(&["x", "y"]), Some(&[7, 3][..]), Some(metadata.as_slice()))
            .await
            .unwrap();
        assert_eq!(ids, vec![7, 3]);

        let statements = db.statements();
        assert!(statements
            .iter()
            .all(|s| matches!(s, Statement::Upsert { .. })));
        assert_eq!(statements[1].params()[0], Param::Int(3));
        assert_eq!(
            statements[1].params()[4],
            Param::OptText(Some(r#"{"page":3}"#.to_string()))
        );
    }

    #[tokio::test]
    async fn test_update_texts_is_upsert() {
        let db = Arc::new(RecordingDatabase::default());
        let store = store(db.clone(), StoreOptions::new("docs"));

        let ids = store.update_texts(&texts(&["z"]), &[9], None).await.unwrap();
        assert_eq!(ids, vec![9]);
        assert!(matches!(
            db.statements()[0],
            Statement::Upsert { id: 9, .. }
        ));
    }

    #[tokio::test]
    async fn test_add_texts_length_mismatch() {
        let db = Arc::new(RecordingDatabase::default());
        let store = store(db.clone(), StoreOptions::new("docs"));

        let err = store
            .add_texts(&texts(&["a", "b"]), Some(&[1][..]), None)
            .await
            .unwrap_err();
        assert!(matches!(err, SqlvecError::ValidationError(_)));
        assert!(db.statements().is_empty());
    }

    #[tokio::test]
    async fn test_remove_texts() {
        let db = Arc::new(RecordingDatabase::default());
        let store = store(db.clone(), StoreOptions::new("docs").with_namespace("tenant"));

        assert_eq!(store.remove_texts(&[1, 2]).await.unwrap(), 2);
        assert_eq!(
            db.statements()[0].sql(),
            "DELETE FROM `docs` WHERE id IN (?, ?)"
        );

        assert_eq!(store.remove_texts(&[]).await.unwrap(), 0);
        assert_eq!(db.statements().len(), 1);
    }

    #[tokio::test]
    async fn test_search_shapes_rows() {
        let db = Arc::new(RecordingDatabase {
            rows: vec![
                SearchRow {
                    content: Some("first".to_string()),
                    metadata: Some(Json(serde_json::json!({"lang": "en"}))),
                    distance: Some(0.1),
                },
                SearchRow {
                    content: Some("second".to_string()),
                    metadata: None,
                    distance: Some(0.4),
                },
            ],
            ..Default::default()
        });
        let store = store(
            db.clone(),
            StoreOptions::new("docs")
                .with_namespace("tenant")
                .with_distance(DistanceFunction::L2Distance),
        );

        let hits = store.similarity_search_with_score("hello", 2).await.unwrap();
        assert_eq!(hits.len(), 2);
        assert_eq!(hits[0].document.content, "first");
        assert_eq!(
            hits[0].document.metadata.get("lang"),
            Some(&serde_json::json!("en"))
        );
        assert!(hits[1].document.metadata.is_empty());
        assert!(hits[0].distance < hits[1].distance);

        match &db.statements()[0] {
            Statement::Search(query) => {
                assert_eq!(query.embedding, vec![5.0, 1.0]);
                assert_eq!(query.namespace.as_deref(), Some("tenant"));
                assert_eq!(query.distance, DistanceFunction::L2Distance);
                assert_eq!(query.limit, 2);
            }
            other => panic!("unexpected statement: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_search_zero_k_skips_database() {
        let db = Arc::new(RecordingDatabase::default());
        let store = store(db.clone(), StoreOptions::new("docs"));

        let docs = store.similarity_search_by_vector(&[1.0, 0.0], 0).await.unwrap();
        assert!(docs.is_empty());
        assert!(db.statements().is_empty());
    }

    #[tokio::test]
    async fn test_create_default_schema() {
        let db = Arc::new(RecordingDatabase::default());
        let store = store(
            db.clone(),
            StoreOptions::new("docs").with_distance(DistanceFunction::InnerProduct),
        );

        store.create_default_schema().await.unwrap();
        let statements = db.statements();
        assert_eq!(
            statements[0],
            Statement::CreateTable {
                table: Identifier::new("docs").unwrap(),
                dimension: 2,
            }
        );
        assert!(statements[1].sql().contains("distance=inner_product"));
        assert!(statements[1].sql().contains("`docs_vectors_idx`"));
    }

    #[tokio::test]
    async fn test_create_default_schema_is_idempotent() {
        let db = Arc::new(RecordingDatabase {
            index_exists: true,
            ..Default::default()
        });
        let store = store(db.clone(), StoreOptions::new("docs"));

        tokio_test::assert_ok!(store.create_default_schema().await);
        tokio_test::assert_ok!(store.create_default_schema().await);
        assert_eq!(db.statements().len(), 4);
    }

    #[tokio::test]
    async fn test_create_default_schema_propagates_other_errors() {
        let db = Arc::new(RecordingDatabase {
            fail_index: true,
            ..Default::default()
        });
        let store = store(db, StoreOptions::new("docs"));

        let err = store.create_default_schema().await.unwrap_err();
        assert!(matches!(err, SqlvecError::DatabaseError(_)));
    }

    #[tokio::test]
    async fn test_destroy_default_schema() {
        let db = Arc::new(RecordingDatabase::default());
        let store = store(db.clone(), StoreOptions::new("docs"));

        store.destroy_default_schema().await.unwrap();
        assert_eq!(db.statements()[0].sql(), "DROP TABLE IF EXISTS `docs`");
    }

    #[tokio::test]
    async fn test_ask_requires_chat_client() {
        let store = store(Arc::new(RecordingDatabase::default()), StoreOptions::new("docs"));
        let err = store.ask("why?", 3).await.unwrap_err();
        assert!(matches!(err, SqlvecError::ConfigError(_)));
    }

    #[tokio::test]
    async fn test_ask_attaches_context() {
        let db = Arc::new(RecordingDatabase {
            rows: vec![
                SearchRow {
                    content: Some("alpha".to_string()),
                    ..Default::default()
                },
                SearchRow {
                    content: Some("beta".to_string()),
                    ..Default::default()
                },
            ],
            ..Default::default()
        });
        let store = store(db, StoreOptions::new("docs")).with_chat_client(Arc::new(EchoChat));

        let response = store.ask("what?", 2).await.unwrap();
        assert_eq!(response.answer, "2 messages");
        assert_eq!(response.context, "alpha\n\nbeta");
        assert_eq!(response.documents.len(), 2);
    }
}
