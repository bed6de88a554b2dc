pub mod gemini;

use async_trait::async_trait;
use serde::Deserialize;
use std::sync::Arc;
use thiserror::Error;
use super::LlmConfig;
use self::gemini::GeminiChatClient;

#[derive(Deserialize, Debug, Clone)]
pub struct CompletionResponse {
    pub response: String,
}

#[derive(Debug, Error)]
pub enum ChatError {
    #[error("chat backend is not configured: {0}")]
    NotConfigured(String),
    #[error("chat backend request failed: {0}")]
    Request(String),
}

/// One instruction in, one text out. Implementations own their transient-fault handling.
#[async_trait]
pub trait ChatClient: Send + Sync {
    async fn complete(
        &self,
        prompt: &str,
        temperature: f32
    ) -> Result<CompletionResponse, ChatError>;

    /// Model ids the configured key can see.
    async fn list_models(&self) -> Result<Vec<String>, ChatError>;

    fn get_model(&self) -> String;
}

pub fn new_client(config: &LlmConfig) -> Result<Arc<dyn ChatClient>, ChatError> {
    let client = GeminiChatClient::from_config(config)?;
    Ok(Arc::new(client))
}
