use async_trait::async_trait;
use log::{ debug, info, warn };
use std::future::Future;
use std::time::Duration;

use super::{ ChatClient, ChatError, CompletionResponse };
use crate::llm::LlmConfig;
use rllm::chat::{ ChatMessage, ChatRole, MessageType };
use rllm::builder::{ LLMBackend, LLMBuilder };
use rllm::LLMProvider;

pub const DEFAULT_GEMINI_MODEL: &str = "gemini-1.5-flash";

pub struct GeminiChatClient {
    llm: Box<dyn LLMProvider>,
    api_key: String,
    model: String,
    base_url: Option<String>,
    temperature: f32,
    max_retries: u32,
    retry_delay: Duration,
}

fn build_provider(
    api_key: &str,
    model: &str,
    base_url: Option<&str>,
    temperature: f32
) -> Result<Box<dyn LLMProvider>, ChatError> {
    let mut builder = LLMBuilder::new()
        .backend(LLMBackend::Google)
        .api_key(api_key.to_string())
        .model(model)
        .temperature(temperature)
        .stream(false);

    if let Some(url) = base_url {
        builder = builder.base_url(url);
    }

    builder.build().map_err(|e| ChatError::NotConfigured(e.to_string()))
}

/// Calls `call` until it succeeds, fails with something other than a request
/// error, or has been retried `max_retries` times.
async fn retry_requests<T, F, Fut>(
    max_retries: u32,
    retry_delay: Duration,
    mut call: F
) -> Result<T, ChatError>
    where F: FnMut() -> Fut, Fut: Future<Output = Result<T, ChatError>>
{
    let mut attempt = 0;
    loop {
        match call().await {
            Err(ChatError::Request(reason)) if attempt < max_retries => {
                attempt += 1;
                warn!(
                    "Gemini request failed ({}), retry {}/{} in {:?}",
                    reason,
                    attempt,
                    max_retries,
                    retry_delay
                );
                tokio::time::sleep(retry_delay).await;
            }
            other => {
                return other;
            }
        }
    }
}

impl GeminiChatClient {
    pub fn new(
        api_key: String,
        model: Option<String>,
        base_url: Option<String>,
        temperature: f32
    ) -> Result<Self, ChatError> {
        if api_key.trim().is_empty() {
            return Err(ChatError::NotConfigured("Gemini API key is empty".to_string()));
        }
        let chat_model = model.unwrap_or_else(|| DEFAULT_GEMINI_MODEL.to_string());
        let llm = build_provider(&api_key, &chat_model, base_url.as_deref(), temperature)?;

        Ok(Self {
            llm,
            api_key,
            model: chat_model,
            base_url,
            temperature,
            max_retries: 0,
            retry_delay: Duration::ZERO,
        })
    }

    pub fn with_retries(mut self, max_retries: u32, retry_delay: Duration) -> Self {
        self.max_retries = max_retries;
        self.retry_delay = retry_delay;
        self
    }

    pub fn from_config(config: &LlmConfig) -> Result<Self, ChatError> {
        let api_key = config.api_key
            .clone()
            .ok_or_else(|| ChatError::NotConfigured("GEMINI_API_KEY is not set".to_string()))?;

        Ok(
            Self::new(
                api_key,
                config.completion_model.clone(),
                config.base_url.clone(),
                config.temperature
            )?.with_retries(config.max_retries, config.retry_delay)
        )
    }

    async fn chat_once(&self, prompt: &str, temperature: f32) -> Result<String, ChatError> {
        let messages = vec![ChatMessage {
            role: ChatRole::User,
            content: prompt.to_string(),
            message_type: MessageType::Text,
        }];

        // The configured provider covers the usual case; any other temperature gets a one-off provider.
        let one_off;
        let provider: &dyn LLMProvider = if (temperature - self.temperature).abs() <= f32::EPSILON {
            &*self.llm
        } else {
            one_off = build_provider(
                &self.api_key,
                &self.model,
                self.base_url.as_deref(),
                temperature
            )?;
            &*one_off
        };

        let resp = provider.chat(&messages).await.map_err(|e| ChatError::Request(e.to_string()))?;
        let text = resp
            .text()
            .map(|s| s.to_string())
            .unwrap_or_else(|| resp.to_string());
        Ok(text)
    }
}

#[async_trait]
impl ChatClient for GeminiChatClient {
    async fn complete(
        &self,
        prompt: &str,
        temperature: f32
    ) -> Result<CompletionResponse, ChatError> {
        info!(
            "GeminiChatClient::complete() → model={} base_url={:?} temperature={}",
            self.model,
            self.base_url,
            temperature
        );

        let text = retry_requests(self.max_retries, self.retry_delay, || {
            self.chat_once(prompt, temperature)
        }).await?;
        debug!("Gemini returned {} bytes", text.len());
        Ok(CompletionResponse { response: text })
    }

    async fn list_models(&self) -> Result<Vec<String>, ChatError> {
        let listing = self.llm
            .list_models(None).await
            .map_err(|e| ChatError::Request(e.to_string()))?;
        Ok(listing.get_models())
    }

    fn get_model(&self) -> String {
        self.model.clone()
    }
}
