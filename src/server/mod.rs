pub mod api;

use crate::agent::{ Outcome, TranslationAgent };
use crate::channel::telegram::TelegramChannel;
use crate::channel::MessageTransport;
use crate::models::channel::{ Command, InboundMessage };
use futures::StreamExt;
use log::{ debug, error, info, warn };
use std::error::Error;
use std::sync::Arc;

pub const WELCOME_TEXT: &str =
    "您好！我是您的中文-高棉文-英文三向翻譯助理。\n\n請直接傳送任何這三種語言的句子給我。\n輸入 /clear 可清除對話記錄。";
pub const CLEARED_TEXT: &str = "已清除對話記錄。";
pub const NOTHING_TO_CLEAR_TEXT: &str = "目前沒有對話記錄可清除。";

pub struct Server {
    http_addr: String,
    agent: Arc<TranslationAgent>,
    channel: Arc<TelegramChannel>,
}

impl Server {
    pub fn new(http_addr: String, agent: Arc<TranslationAgent>, channel: Arc<TelegramChannel>) -> Self {
        Self {
            http_addr,
            agent,
            channel,
        }
    }

    pub async fn run(&self) -> Result<(), Box<dyn Error + Send + Sync>> {
        api::start_http_server(&self.http_addr).await?;

        let me = self.channel
            .test_connection().await
            .map_err(|e| format!("Telegram token rejected: {}", e))?;
        info!("Connected to Telegram as @{}", me.username.as_deref().unwrap_or("unknown"));

        let mut inbound = self.channel.start_receiving();
        loop {
            tokio::select! {
                message = inbound.next() => {
                    match message {
                        Some(message) => self.dispatch(message),
                        None => {
                            warn!("Inbound stream closed");
                            break;
                        }
                    }
                }
                _ = tokio::signal::ctrl_c() => {
                    info!("Shutdown requested");
                    break;
                }
            }
        }
        self.channel.stop_polling();
        Ok(())
    }

    /// One task per message, so slow translations never hold up other conversations.
    fn dispatch(&self, message: InboundMessage) {
        let agent = Arc::clone(&self.agent);
        let transport: Arc<dyn MessageTransport> = self.channel.clone();
        tokio::spawn(async move {
            handle_inbound(&agent, transport.as_ref(), message).await;
        });
    }
}

/// Routes one inbound message to a command or to the translator.
pub async fn handle_inbound(
    agent: &TranslationAgent,
    transport: &dyn MessageTransport,
    message: InboundMessage
) {
    let conversation_id = message.conversation_id.as_str();

    match message.command() {
        Some(Command::Start) | Some(Command::Help) => {
            reply(transport, conversation_id, WELCOME_TEXT).await;
        }
        Some(Command::Clear) => {
            let text = if agent.clear_history(conversation_id).await {
                CLEARED_TEXT
            } else {
                NOTHING_TO_CLEAR_TEXT
            };
            reply(transport, conversation_id, text).await;
        }
        Some(Command::Unknown(name)) => {
            debug!("Ignoring unknown command /{} in {}", name, conversation_id);
        }
        None => {
            match agent.handle(conversation_id, &message.text, transport).await {
                Outcome::Translated(_) => info!("Translated message {} in {}", message.id, conversation_id),
                Outcome::Skipped => debug!("Skipped message {} in {}", message.id, conversation_id),
                Outcome::Failed(err) =>
                    warn!("Message {} in {} failed: {}", message.id, conversation_id, err.kind()),
            }
        }
    }
}

async fn reply(transport: &dyn MessageTransport, conversation_id: &str, text: &str) {
    if let Err(e) = transport.send_message(conversation_id, text).await {
        error!("Failed to reply in {}: {}", conversation_id, e);
    }
}
