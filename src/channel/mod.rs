//! Chat transports.
//!
//! The orchestrator only needs to post a message and later replace its text;
//! receiving is transport specific and lives on the concrete channel.

pub mod telegram;

use async_trait::async_trait;
use thiserror::Error;

use crate::models::channel::MessageHandle;

#[derive(Debug, Error)]
pub enum ChannelError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("API error: {0}")]
    Api(String),
    #[error("invalid conversation id: {0}")]
    InvalidConversation(String),
}

#[async_trait]
pub trait MessageTransport: Send + Sync {
    /// Posts a new message and returns a handle that can be edited later.
    async fn send_message(
        &self,
        conversation_id: &str,
        text: &str
    ) -> Result<MessageHandle, ChannelError>;

    /// Replaces the text of a message previously returned by `send_message`.
    async fn edit_message(
        &self,
        conversation_id: &str,
        handle: &MessageHandle,
        text: &str
    ) -> Result<(), ChannelError>;
}
