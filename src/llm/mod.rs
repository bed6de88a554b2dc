pub mod chat;

use std::time::Duration;
use crate::cli::Args;

#[derive(Debug, Clone)]
pub struct LlmConfig {
    pub api_key: Option<String>,
    pub completion_model: Option<String>,
    pub base_url: Option<String>,
    pub temperature: f32,
    pub max_retries: u32,
    pub retry_delay: Duration,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            completion_model: None,
            base_url: None,
            temperature: 0.1,
            max_retries: 1,
            retry_delay: Duration::from_millis(500),
        }
    }
}

impl LlmConfig {
    pub fn from_args(args: &Args) -> Self {
        Self {
            api_key: args.gemini_api_key
                .clone()
                .map(|k| k.trim().to_string())
                .filter(|k| !k.is_empty()),
            completion_model: args.chat_model.clone().filter(|m| !m.trim().is_empty()),
            base_url: args.chat_base_url.clone().filter(|u| !u.trim().is_empty()),
            temperature: args.temperature,
            max_retries: args.chat_max_retries,
            retry_delay: Duration::from_millis(args.chat_retry_delay_ms),
        }
    }
}
