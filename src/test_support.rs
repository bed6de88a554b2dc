//! Scripted collaborators shared by the async tests.

use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::Mutex;
use std::time::Duration;

use crate::channel::{ ChannelError, MessageTransport };
use crate::llm::chat::{ ChatClient, ChatError, CompletionResponse };
use crate::models::channel::MessageHandle;

pub enum Scripted {
    Reply(String),
    Fail(String),
}

/// Returns scripted replies in order and records every prompt it receives.
pub struct FakeChatClient {
    script: Mutex<VecDeque<Scripted>>,
    fallback: String,
    delay: Duration,
    models: Option<Vec<String>>,
    pub prompts: Mutex<Vec<String>>,
    pub temperatures: Mutex<Vec<f32>>,
}

impl FakeChatClient {
    pub fn replying(reply: &str) -> Self {
        Self::scripted(Vec::new(), reply)
    }

    pub fn failing(reason: &str) -> Self {
        Self::scripted(vec![Scripted::Fail(reason.to_string())], "")
    }

    pub fn scripted(script: Vec<Scripted>, fallback: &str) -> Self {
        Self {
            script: Mutex::new(script.into()),
            fallback: fallback.to_string(),
            delay: Duration::ZERO,
            models: Some(vec!["fake-model".to_string()]),
            prompts: Mutex::new(Vec::new()),
            temperatures: Mutex::new(Vec::new()),
        }
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    /// `None` makes model listing fail.
    pub fn with_models(mut self, models: Option<&[&str]>) -> Self {
        self.models = models.map(|ids| ids.iter().map(|id| id.to_string()).collect());
        self
    }

    pub fn calls(&self) -> usize {
        self.prompts.lock().unwrap().len()
    }
}

#[async_trait]
impl ChatClient for FakeChatClient {
    async fn complete(
        &self,
        prompt: &str,
        temperature: f32
    ) -> Result<CompletionResponse, ChatError> {
        self.prompts.lock().unwrap().push(prompt.to_string());
        self.temperatures.lock().unwrap().push(temperature);
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        let next = self.script.lock().unwrap().pop_front();
        match next {
            Some(Scripted::Reply(text)) => Ok(CompletionResponse { response: text }),
            Some(Scripted::Fail(reason)) => Err(ChatError::Request(reason)),
            None => Ok(CompletionResponse { response: self.fallback.clone() }),
        }
    }

    async fn list_models(&self) -> Result<Vec<String>, ChatError> {
        self.models
            .clone()
            .ok_or_else(|| ChatError::Request("403 PERMISSION_DENIED".to_string()))
    }

    fn get_model(&self) -> String {
        "fake-model".to_string()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportEvent {
    Sent {
        conversation_id: String,
        text: String,
        handle: MessageHandle,
    },
    Edited {
        conversation_id: String,
        handle: MessageHandle,
        text: String,
    },
}

/// Records sends and edits; hands out increasing message ids.
#[derive(Default)]
pub struct RecordingTransport {
    pub events: Mutex<Vec<TransportEvent>>,
    fail_sends: bool,
}

impl RecordingTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing_sends() -> Self {
        Self {
            events: Mutex::new(Vec::new()),
            fail_sends: true,
        }
    }

    pub fn events(&self) -> Vec<TransportEvent> {
        self.events.lock().unwrap().clone()
    }

    pub fn sent_texts(&self) -> Vec<String> {
        self.events()
            .into_iter()
            .filter_map(|e| match e {
                TransportEvent::Sent { text, .. } => Some(text),
                TransportEvent::Edited { .. } => None,
            })
            .collect()
    }
}

#[async_trait]
impl MessageTransport for RecordingTransport {
    async fn send_message(
        &self,
        conversation_id: &str,
        text: &str
    ) -> Result<MessageHandle, ChannelError> {
        if self.fail_sends {
            return Err(ChannelError::Api("Forbidden: bot was blocked by the user".to_string()));
        }
        let mut events = self.events.lock().unwrap();
        let handle = MessageHandle { id: (events.len() as i64) + 1 };
        events.push(TransportEvent::Sent {
            conversation_id: conversation_id.to_string(),
            text: text.to_string(),
            handle,
        });
        Ok(handle)
    }

    async fn edit_message(
        &self,
        conversation_id: &str,
        handle: &MessageHandle,
        text: &str
    ) -> Result<(), ChannelError> {
        self.events.lock().unwrap().push(TransportEvent::Edited {
            conversation_id: conversation_id.to_string(),
            handle: *handle,
            text: text.to_string(),
        });
        Ok(())
    }
}
