use crate::channel::MessageTransport;
use crate::cli::Args;
use crate::config::prompt::InstructionCompiler;
use crate::config::skip::{ SkipClassifier, SkipPolicy };
use crate::history::{ initialize_history_store, HistoryStore };
use crate::llm::chat::{ new_client as new_chat_client, ChatClient, ChatError };
use crate::llm::LlmConfig;
use crate::models::chat::{ Exchange, TranslationRequest };

use log::{ debug, error, info, warn };
use std::error::Error;
use std::sync::Arc;
use thiserror::Error;

pub const DEFAULT_PLACEHOLDER: &str = "翻譯中，請稍候...";
pub const DEFAULT_APOLOGY: &str = "抱歉，翻譯時發生了一點問題，請稍後再試。";
pub const DEFAULT_TEMPERATURE: f32 = 0.1;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TranslationError {
    #[error("translation backend is not configured: {0}")]
    NotConfigured(String),
    #[error("translation backend call failed: {0}")]
    BackendCallFailure(String),
    #[error("translation backend returned an empty response")]
    EmptyResponse,
    #[error("could not deliver the placeholder message: {0}")]
    Transport(String),
}

impl TranslationError {
    pub fn kind(&self) -> &'static str {
        match self {
            TranslationError::NotConfigured(_) => "NotConfigured",
            TranslationError::BackendCallFailure(_) => "BackendCallFailure",
            TranslationError::EmptyResponse => "EmptyResponse",
            TranslationError::Transport(_) => "Transport",
        }
    }
}

impl From<ChatError> for TranslationError {
    fn from(err: ChatError) -> Self {
        match err {
            ChatError::NotConfigured(msg) => TranslationError::NotConfigured(msg),
            ChatError::Request(msg) => TranslationError::BackendCallFailure(msg),
        }
    }
}

/// What happened to one inbound message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Skipped,
    Translated(String),
    Failed(TranslationError),
}

/// Rejects blank output so it never reaches the user or the history.
pub fn validate_response(raw: &str) -> Result<(), TranslationError> {
    if raw.trim().is_empty() {
        return Err(TranslationError::EmptyResponse);
    }
    Ok(())
}

/// Trims and decodes HTML character entities the backend sometimes emits.
pub fn sanitize_response(raw: &str) -> String {
    html_escape::decode_html_entities(raw.trim()).trim().to_string()
}

pub struct TranslationAgent {
    chat_client: Arc<dyn ChatClient>,
    history_store: Arc<dyn HistoryStore>,
    skip_classifier: SkipClassifier,
    compiler: InstructionCompiler,
    temperature: f32,
    placeholder_text: String,
    apology_text: String,
}

impl TranslationAgent {
    pub fn new(chat_client: Arc<dyn ChatClient>, history_store: Arc<dyn HistoryStore>) -> Self {
        Self {
            chat_client,
            history_store,
            skip_classifier: SkipClassifier::default(),
            compiler: InstructionCompiler::new(),
            temperature: DEFAULT_TEMPERATURE,
            placeholder_text: DEFAULT_PLACEHOLDER.to_string(),
            apology_text: DEFAULT_APOLOGY.to_string(),
        }
    }

    /// Builds the agent from process configuration. A missing key is fatal here,
    /// never a per-message error.
    pub fn from_args(args: &Args) -> Result<Self, Box<dyn Error + Send + Sync>> {
        let llm_config = LlmConfig::from_args(args);
        let chat_client = new_chat_client(&llm_config).map_err(TranslationError::from)?;
        info!(
            "Chat client configured: Model={}, BaseURL={:?}",
            chat_client.get_model(),
            llm_config.base_url.as_deref().unwrap_or("adapter default")
        );
        let history_store = initialize_history_store(args)?;
        debug!("Prompts carry up to {} prior exchanges", history_store.window());

        let mut policy = SkipPolicy::default();
        if let Some(words) = &args.skip_words {
            policy = policy.with_filler_words(words);
        }

        Ok(
            Self::new(chat_client, history_store)
                .with_skip_policy(policy)
                .with_temperature(args.temperature)
                .with_texts(args.placeholder_text.clone(), args.apology_text.clone())
        )
    }

    pub fn with_skip_policy(mut self, policy: SkipPolicy) -> Self {
        self.skip_classifier = SkipClassifier::new(policy);
        self
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    pub fn with_texts(mut self, placeholder: impl Into<String>, apology: impl Into<String>) -> Self {
        self.placeholder_text = placeholder.into();
        self.apology_text = apology.into();
        self
    }

    /// Waits for any in-flight translation of the conversation, then forgets it.
    pub async fn clear_history(&self, conversation_id: &str) -> bool {
        let cleared = self.history_store.clear(conversation_id).await;
        info!("History clear requested for {}: cleared={}", conversation_id, cleared);
        cleared
    }

    /// Handles one inbound message end to end. Never panics or propagates an
    /// error; every failure ends as the apology text in the conversation.
    pub async fn handle(
        &self,
        conversation_id: &str,
        source_text: &str,
        transport: &dyn MessageTransport
    ) -> Outcome {
        if self.skip_classifier.should_skip(source_text) {
            debug!("Skipping message in {}: nothing to translate", conversation_id);
            return Outcome::Skipped;
        }

        let placeholder = match transport.send_message(conversation_id, &self.placeholder_text).await {
            Ok(handle) => handle,
            Err(e) => {
                let err = TranslationError::Transport(e.to_string());
                error!("Translation failed for {} [{}]: {}", conversation_id, err.kind(), err);
                return Outcome::Failed(err);
            }
        };

        let _guard = self.history_store.lock(conversation_id).await;

        match self.translate(conversation_id, source_text).await {
            Ok(translation) => {
                if
                    let Err(e) = transport.edit_message(
                        conversation_id,
                        &placeholder,
                        &translation
                    ).await
                {
                    warn!("Could not replace placeholder in {}: {}", conversation_id, e);
                }
                self.history_store.append(conversation_id, Exchange::new(source_text, &translation));
                Outcome::Translated(translation)
            }
            Err(err) => {
                error!("Translation failed for {} [{}]: {}", conversation_id, err.kind(), err);
                if
                    let Err(e) = transport.edit_message(
                        conversation_id,
                        &placeholder,
                        &self.apology_text
                    ).await
                {
                    warn!("Could not show apology in {}: {}", conversation_id, e);
                }
                Outcome::Failed(err)
            }
        }
    }

    async fn translate(
        &self,
        conversation_id: &str,
        source_text: &str
    ) -> Result<String, TranslationError> {
        let request = TranslationRequest {
            conversation_id,
            source_text,
            history: self.history_store.get(conversation_id),
        };
        let instruction = self.compiler.compile(request.source_text, &request.history);
        debug!(
            "Compiled instruction for {} ({} history exchanges, {} bytes)",
            request.conversation_id,
            request.history.len(),
            instruction.len()
        );

        let resp = self.chat_client
            .complete(&instruction, self.temperature).await
            .map_err(|e| TranslationError::BackendCallFailure(e.to_string()))?;

        validate_response(&resp.response)?;
        let sanitized = sanitize_response(&resp.response);
        validate_response(&sanitized)?;
        Ok(sanitized)
    }
}
