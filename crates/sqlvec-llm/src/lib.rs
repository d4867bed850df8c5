//! sqlvec LLM - Embedding and chat providers
//!
//! HTTP clients for the external models the vector store relies on:
//! embeddings for indexing and querying, chat completion for `ask`.
//!
//! Author: hephaex@gmail.com

use sqlvec_core::{LlmConfig, Result, SqlvecError};
use std::time::Duration;

pub mod chat;
pub mod embedding;

pub use chat::{create_chat_client, OllamaChat, OpenAiChat};
pub use embedding::{create_embedding_client, OllamaEmbedding, OpenAiEmbedding};

pub(crate) const OPENAI_BASE_URL: &str = "https://api.openai.com/v1";

/// Build an HTTP client honouring the configured request timeout
pub(crate) fn http_client(config: &LlmConfig) -> Result<reqwest::Client> {
    reqwest::Client::builder()
        .timeout(Duration::from_secs(config.timeout_secs))
        .build()
        .map_err(|e| SqlvecError::LlmError(format!("Failed to build HTTP client: {e}")))
}
