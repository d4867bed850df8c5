//! sqlvec Core - Domain models, traits, and shared types
//!
//! This crate defines the core abstractions used throughout sqlvec:
//! - Document and search result models
//! - Distance functions understood by the vector database
//! - Common error types
//! - Provider traits for embedding and chat models
//! - Configuration management

pub mod config;

pub use config::{
    AppConfig, ConfigError, DatabaseConfig, LlmConfig, LlmProvider, LoggingConfig, StoreConfig,
};

use serde::{Deserialize, Serialize};
use thiserror::Error;

// ============================================================================
// Error Types
// ============================================================================

/// Core error types for sqlvec operations
#[derive(Error, Debug)]
pub enum SqlvecError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Database error: {0}")]
    DatabaseError(String),

    /// The database rejected a CREATE because the object is already there
    #[error("Already exists: {0}")]
    AlreadyExists(String),

    #[error("LLM error: {0}")]
    LlmError(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl From<ConfigError> for SqlvecError {
    fn from(err: ConfigError) -> Self {
        Self::ConfigError(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, SqlvecError>;

// ============================================================================
// Distance Functions
// ============================================================================

/// Distance function used to rank results and to build the ANN index
///
/// The caller-facing names double as the SQL function names:
/// - `cosine_distance` (default)
/// - `l2_distance`
/// - `inner_product`
/// - `negative_inner_product`
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DistanceFunction {
    #[default]
    CosineDistance,
    L2Distance,
    InnerProduct,
    NegativeInnerProduct,
}

impl DistanceFunction {
    pub const ALL: [DistanceFunction; 4] = [
        Self::CosineDistance,
        Self::L2Distance,
        Self::InnerProduct,
        Self::NegativeInnerProduct,
    ];

    /// SQL function evaluated in queries
    pub fn sql_function(&self) -> &'static str {
        match self {
            Self::CosineDistance => "cosine_distance",
            Self::L2Distance => "l2_distance",
            Self::InnerProduct => "inner_product",
            Self::NegativeInnerProduct => "negative_inner_product",
        }
    }

    /// Metric name in the vector index vocabulary
    pub fn index_metric(&self) -> &'static str {
        match self {
            Self::CosineDistance => "cosine",
            Self::L2Distance => "l2",
            Self::InnerProduct => "inner_product",
            Self::NegativeInnerProduct => "negative_inner_product",
        }
    }
}

impl std::fmt::Display for DistanceFunction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.sql_function())
    }
}

impl std::str::FromStr for DistanceFunction {
    type Err = ConfigError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "cosine_distance" => Ok(Self::CosineDistance),
            "l2_distance" => Ok(Self::L2Distance),
            "inner_product" => Ok(Self::InnerProduct),
            "negative_inner_product" => Ok(Self::NegativeInnerProduct),
            _ => Err(ConfigError::InvalidValue {
                key: "distance".to_string(),
                value: s.to_string(),
            }),
        }
    }
}

// ============================================================================
// Document Models
// ============================================================================

/// Free-form metadata stored as a JSON object alongside each document
pub type Metadata = serde_json::Map<String, serde_json::Value>;

/// A stored text as returned by similarity search
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Document {
    /// Text content
    pub content: String,

    /// Metadata saved with the text (empty when none was stored)
    pub metadata: Metadata,
}

impl Document {
    /// Create a document without metadata
    pub fn new(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            metadata: Metadata::new(),
        }
    }

    /// Attach a metadata entry
    pub fn with_metadata(
        mut self,
        key: impl Into<String>,
        value: impl Into<serde_json::Value>,
    ) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }
}

/// A search hit together with the distance computed by the database
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoredDocument {
    pub document: Document,

    /// Distance to the query under the configured function (lower ranks first)
    pub distance: f64,
}

/// Result of a retrieval-augmented question
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AskResponse {
    /// Answer produced by the chat model
    pub answer: String,

    /// Retrieved context exactly as it was sent to the model
    pub context: String,

    /// Documents the context was built from
    pub documents: Vec<Document>,
}

// ============================================================================
// Chat Types
// ============================================================================

/// Role of a chat message author
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    System,
    User,
    Assistant,
}

/// A single chat message
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: ChatRole,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::User,
            content: content.into(),
        }
    }
}

// ============================================================================
// Traits
// ============================================================================

/// Trait for embedding generation
#[async_trait::async_trait]
pub trait EmbeddingClient: Send + Sync {
    /// Generate embedding for a single text
    async fn embed(&self, text: &str) -> Result<Vec<f32>>;

    /// Generate embeddings for multiple texts (batch)
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>>;

    /// Declared output dimensionality
    fn dimension(&self) -> usize;
}

/// Trait for chat-capable language models
#[async_trait::async_trait]
pub trait ChatClient: Send + Sync {
    /// Send a conversation and return the assistant reply
    async fn chat(&self, messages: &[ChatMessage]) -> Result<String>;
}

// ============================================================================
// Tests
// ============================================================================
