//! Telegram Bot API transport.
//!
//! Sends and edits messages, and receives text messages through `getUpdates`
//! long polling.

use async_trait::async_trait;
use futures::Stream;
use log::{ debug, error, info, warn };
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::pin::Pin;
use std::sync::atomic::{ AtomicBool, AtomicI64, Ordering };
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio_stream::wrappers::UnboundedReceiverStream;

use super::{ ChannelError, MessageTransport };
use crate::cli::Args;
use crate::models::channel::{ InboundMessage, MessageHandle };

pub const DEFAULT_API_BASE: &str = "https://api.telegram.org";
const API_TIMEOUT_SECS: u64 = 30;
const POLL_ERROR_BACKOFF_SECS: u64 = 5;

#[derive(Debug, Clone)]
pub struct TelegramConfig {
    pub bot_token: String,
    pub api_base: String,
    pub polling_timeout: u32,
}

impl TelegramConfig {
    pub fn new(bot_token: impl Into<String>) -> Self {
        Self {
            bot_token: bot_token.into(),
            api_base: DEFAULT_API_BASE.to_string(),
            polling_timeout: 30,
        }
    }

    pub fn with_api_base(mut self, api_base: impl Into<String>) -> Self {
        self.api_base = api_base.into();
        self
    }

    pub fn with_polling_timeout(mut self, timeout: u32) -> Self {
        self.polling_timeout = timeout;
        self
    }
}

#[derive(Debug, Deserialize)]
struct TelegramResponse<T> {
    ok: bool,
    result: Option<T>,
    description: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TelegramUser {
    pub id: i64,
    #[serde(default)]
    pub is_bot: bool,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub username: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TelegramChat {
    pub id: i64,
    #[serde(rename = "type")]
    pub chat_type: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TelegramMessage {
    pub message_id: i64,
    pub chat: TelegramChat,
    pub from: Option<TelegramUser>,
    pub text: Option<String>,
    pub message_thread_id: Option<i64>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TelegramUpdate {
    pub update_id: i64,
    pub message: Option<TelegramMessage>,
}

#[derive(Clone)]
pub struct TelegramChannel {
    config: TelegramConfig,
    client: Client,
    polling_active: Arc<AtomicBool>,
    last_update_id: Arc<AtomicI64>,
}

impl TelegramChannel {
    pub fn new(config: TelegramConfig) -> Self {
        Self {
            config,
            client: Client::new(),
            polling_active: Arc::new(AtomicBool::new(false)),
            last_update_id: Arc::new(AtomicI64::new(0)),
        }
    }

    pub fn from_args(args: &Args) -> Option<Self> {
        let token = args.telegram_bot_token
            .as_deref()
            .map(str::trim)
            .filter(|t| !t.is_empty())?;
        Some(
            Self::new(
                TelegramConfig::new(token)
                    .with_api_base(args.telegram_api_base.clone())
                    .with_polling_timeout(args.telegram_polling_timeout)
            )
        )
    }

    pub fn last_update_id(&self) -> i64 {
        self.last_update_id.load(Ordering::SeqCst)
    }

    /// Format: "chat_id" or "chat_id:thread_id"
    fn parse_conversation_id(conversation_id: &str) -> (String, Option<i64>) {
        match conversation_id.split_once(':') {
            Some((chat_id, thread)) => (chat_id.to_string(), thread.parse::<i64>().ok()),
            None => (conversation_id.to_string(), None),
        }
    }

    fn build_conversation_id(chat_id: i64, message_thread_id: Option<i64>) -> String {
        match message_thread_id {
            Some(thread_id) => format!("{}:{}", chat_id, thread_id),
            None => chat_id.to_string(),
        }
    }

    fn api_url(&self, method: &str) -> String {
        format!(
            "{}/bot{}/{}",
            self.config.api_base.trim_end_matches('/'),
            self.config.bot_token,
            method
        )
    }

    async fn call<T: DeserializeOwned>(
        &self,
        method: &str,
        params: &serde_json::Value,
        timeout: Duration
    ) -> Result<T, ChannelError> {
        let response = self.client
            .post(self.api_url(method))
            .json(params)
            .timeout(timeout)
            .send().await?;

        let body: TelegramResponse<T> = response.json().await?;
        if !body.ok {
            return Err(ChannelError::Api(body.description.unwrap_or_default()));
        }
        body.result.ok_or_else(|| ChannelError::Api(format!("{} returned ok but no result", method)))
    }

    /// Checks the token by calling getMe.
    pub async fn test_connection(&self) -> Result<TelegramUser, ChannelError> {
        self.call("getMe", &serde_json::json!({}), Duration::from_secs(API_TIMEOUT_SECS)).await
    }

    async fn poll_updates(&self) -> Result<Vec<TelegramUpdate>, ChannelError> {
        let offset = self.last_update_id();
        let params =
            serde_json::json!({
            "offset": if offset > 0 { offset + 1 } else { 0 },
            "timeout": self.config.polling_timeout,
            "allowed_updates": ["message"],
        });
        let timeout = Duration::from_secs((self.config.polling_timeout as u64) + 10);
        let updates: Vec<TelegramUpdate> = self.call("getUpdates", &params, timeout).await?;

        if let Some(last) = updates.last() {
            self.last_update_id.store(last.update_id, Ordering::SeqCst);
        }
        Ok(updates)
    }

    /// Text messages only; everything else (stickers, photos, joins) is dropped.
    pub fn convert_update(update: TelegramUpdate) -> Option<InboundMessage> {
        let message = update.message?;
        let text = message.text?;
        let from = message.from?;
        if from.is_bot {
            return None;
        }

        let conversation_id = Self::build_conversation_id(
            message.chat.id,
            message.message_thread_id
        );
        let sender_name = from.username.clone().or_else(|| {
            let full = format!(
                "{} {}",
                from.first_name.as_deref().unwrap_or(""),
                from.last_name.as_deref().unwrap_or("")
            );
            let full = full.trim().to_string();
            if full.is_empty() { None } else { Some(full) }
        });

        let inbound = InboundMessage::new(
            format!("tg_{}", message.message_id),
            conversation_id,
            from.id.to_string(),
            text
        );
        Some(match sender_name {
            Some(name) => inbound.with_sender_name(name),
            None => inbound,
        })
    }

    /// Spawns the polling loop and returns the stream of inbound text messages.
    pub fn start_receiving(&self) -> Pin<Box<dyn Stream<Item = InboundMessage> + Send>> {
        let (tx, rx) = mpsc::unbounded_channel();
        let channel = self.clone();

        tokio::spawn(async move {
            channel.polling_active.store(true, Ordering::SeqCst);
            info!("Starting Telegram polling");

            while channel.polling_active.load(Ordering::SeqCst) {
                match channel.poll_updates().await {
                    Ok(updates) => {
                        for update in updates {
                            if let Some(message) = Self::convert_update(update) {
                                debug!(
                                    "Received Telegram message {} in conversation {}",
                                    message.id,
                                    message.conversation_id
                                );
                                if tx.send(message).is_err() {
                                    warn!("Message receiver dropped, stopping polling");
                                    channel.polling_active.store(false, Ordering::SeqCst);
                                    break;
                                }
                            }
                        }
                    }
                    Err(e) => {
                        error!("Telegram polling error: {}", e);
                        tokio::time::sleep(Duration::from_secs(POLL_ERROR_BACKOFF_SECS)).await;
                    }
                }
            }
            info!("Telegram polling stopped");
        });

        Box::pin(UnboundedReceiverStream::new(rx))
    }

    pub fn stop_polling(&self) {
        self.polling_active.store(false, Ordering::SeqCst);
    }
}

#[async_trait]
impl MessageTransport for TelegramChannel {
    async fn send_message(
        &self,
        conversation_id: &str,
        text: &str
    ) -> Result<MessageHandle, ChannelError> {
        let (chat_id, thread_id) = Self::parse_conversation_id(conversation_id);
        if chat_id.is_empty() {
            return Err(ChannelError::InvalidConversation(conversation_id.to_string()));
        }
        let mut params = serde_json::json!({
            "chat_id": chat_id,
            "text": text,
        });
        if let Some(thread_id) = thread_id {
            params["message_thread_id"] = serde_json::Value::Number(thread_id.into());
        }

        let sent: TelegramMessage = self.call(
            "sendMessage",
            &params,
            Duration::from_secs(API_TIMEOUT_SECS)
        ).await?;
        Ok(MessageHandle { id: sent.message_id })
    }

    async fn edit_message(
        &self,
        conversation_id: &str,
        handle: &MessageHandle,
        text: &str
    ) -> Result<(), ChannelError> {
        let (chat_id, _) = Self::parse_conversation_id(conversation_id);
        let params =
            serde_json::json!({
            "chat_id": chat_id,
            "message_id": handle.id,
            "text": text,
        });

        // editMessageText answers with the message, or `true` for inline messages.
        match
            self.call::<serde_json::Value>(
                "editMessageText",
                &params,
                Duration::from_secs(API_TIMEOUT_SECS)
            ).await
        {
            Ok(_) => Ok(()),
            Err(ChannelError::Api(description)) if description.contains("message is not modified") => {
                debug!("Message {} already shows the requested text", handle.id);
                Ok(())
            }
            Err(e) => Err(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::StreamExt;
    use serde_json::json;
    use wiremock::matchers::{ body_partial_json, method, path };
    use wiremock::{ Mock, MockServer, ResponseTemplate };

    fn update(value: serde_json::Value) -> TelegramUpdate {
        serde_json::from_value(value).unwrap()
    }

    async fn channel_for(server: &MockServer) -> TelegramChannel {
        TelegramChannel::new(
            TelegramConfig::new("test-token").with_api_base(server.uri()).with_polling_timeout(0)
        )
    }

    #[test]
    fn test_conversation_id_round_trip_with_thread() {
        assert_eq!(TelegramChannel::build_conversation_id(42, None), "42");
        assert_eq!(TelegramChannel::build_conversation_id(-100, Some(7)), "-100:7");
        assert_eq!(
            TelegramChannel::parse_conversation_id("-100:7"),
            ("-100".to_string(), Some(7))
        );
        assert_eq!(TelegramChannel::parse_conversation_id("42"), ("42".to_string(), None));
    }

    #[test]
    fn test_api_url_trims_trailing_slash() {
        let channel = TelegramChannel::new(
            TelegramConfig::new("abc").with_api_base("http://localhost:9000/")
        );
        assert_eq!(channel.api_url("getMe"), "http://localhost:9000/botabc/getMe");
    }

    #[test]
    fn test_from_args_requires_non_blank_token() {
        use clap::Parser;

        let args = Args::try_parse_from(["trilingual-relay", "--telegram-bot-token", "  "]).unwrap();
        assert!(TelegramChannel::from_args(&args).is_none());

        let args = Args::try_parse_from(["trilingual-relay", "--telegram-bot-token", "abc"]).unwrap();
        let channel = TelegramChannel::from_args(&args).expect("token is set");
        assert!(channel.api_url("getMe").ends_with("/botabc/getMe"));
    }

    #[test]
    fn test_convert_text_update() {
        let inbound = TelegramChannel::convert_update(
            update(
                json!({
                "update_id": 10,
                "message": {
                    "message_id": 5,
                    "chat": { "id": 99, "type": "private" },
                    "from": { "id": 7, "is_bot": false, "first_name": "Sokha", "last_name": "Chan" },
                    "text": "你好"
                }
            })
            )
        ).unwrap();

        assert_eq!(inbound.id, "tg_5");
        assert_eq!(inbound.conversation_id, "99");
        assert_eq!(inbound.sender_id, "7");
        assert_eq!(inbound.sender_name.as_deref(), Some("Sokha Chan"));
        assert_eq!(inbound.text, "你好");
    }

    #[test]
    fn test_convert_skips_non_text_and_bots() {
        let sticker = update(
            json!({
            "update_id": 11,
            "message": { "message_id": 6, "chat": { "id": 1 }, "from": { "id": 2 } }
        })
        );
        assert!(TelegramChannel::convert_update(sticker).is_none());

        let from_bot = update(
            json!({
            "update_id": 12,
            "message": {
                "message_id": 7,
                "chat": { "id": 1 },
                "from": { "id": 3, "is_bot": true, "username": "otherbot" },
                "text": "hello"
            }
        })
        );
        assert!(TelegramChannel::convert_update(from_bot).is_none());

        let no_message = update(json!({ "update_id": 13 }));
        assert!(TelegramChannel::convert_update(no_message).is_none());
    }

    #[test]
    fn test_convert_forum_topic_message() {
        let inbound = TelegramChannel::convert_update(
            update(
                json!({
                "update_id": 14,
                "message": {
                    "message_id": 8,
                    "chat": { "id": -100123, "type": "supergroup" },
                    "message_thread_id": 4,
                    "from": { "id": 2, "username": "dara" },
                    "text": "hello"
                }
            })
            )
        ).unwrap();
        assert_eq!(inbound.conversation_id, "-100123:4");
        assert_eq!(inbound.sender_name.as_deref(), Some("dara"));
    }

    #[tokio::test]
    async fn test_send_message_returns_handle() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/bottest-token/sendMessage"))
            .and(body_partial_json(json!({ "chat_id": "99", "text": "翻譯中，請稍候..." })))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(
                    json!({
                    "ok": true,
                    "result": { "message_id": 42, "chat": { "id": 99, "type": "private" } }
                })
                )
            )
            .expect(1)
            .mount(&server).await;

        let channel = channel_for(&server).await;
        let handle = channel.send_message("99", "翻譯中，請稍候...").await.unwrap();
        assert_eq!(handle, MessageHandle { id: 42 });
    }

    #[tokio::test]
    async fn test_send_message_into_thread() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/bottest-token/sendMessage"))
            .and(body_partial_json(json!({ "chat_id": "-100", "message_thread_id": 7 })))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(
                    json!({
                    "ok": true,
                    "result": { "message_id": 3, "chat": { "id": -100 } }
                })
                )
            )
            .expect(1)
            .mount(&server).await;

        let channel = channel_for(&server).await;
        let handle = channel.send_message("-100:7", "hi").await.unwrap();
        assert_eq!(handle.id, 3);
    }

    #[tokio::test]
    async fn test_edit_message() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/bottest-token/editMessageText"))
            .and(body_partial_json(json!({ "chat_id": "99", "message_id": 42, "text": "សួស្តី\nHello" })))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(
                    json!({
                    "ok": true,
                    "result": { "message_id": 42, "chat": { "id": 99 } }
                })
                )
            )
            .expect(1)
            .mount(&server).await;

        let channel = channel_for(&server).await;
        channel.edit_message("99", &MessageHandle { id: 42 }, "សួស្តី\nHello").await.unwrap();
    }

    #[tokio::test]
    async fn test_edit_not_modified_is_ok() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/bottest-token/editMessageText"))
            .respond_with(
                ResponseTemplate::new(400).set_body_json(
                    json!({
                    "ok": false,
                    "error_code": 400,
                    "description": "Bad Request: message is not modified"
                })
                )
            )
            .mount(&server).await;

        let channel = channel_for(&server).await;
        assert!(channel.edit_message("99", &MessageHandle { id: 1 }, "same").await.is_ok());
    }

    #[tokio::test]
    async fn test_api_error_is_reported() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/bottest-token/sendMessage"))
            .respond_with(
                ResponseTemplate::new(403).set_body_json(
                    json!({
                    "ok": false,
                    "error_code": 403,
                    "description": "Forbidden: bot was blocked by the user"
                })
                )
            )
            .mount(&server).await;

        let channel = channel_for(&server).await;
        match channel.send_message("99", "hi").await {
            Err(ChannelError::Api(description)) => assert!(description.contains("blocked")),
            other => panic!("expected API error, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_get_me() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/bottest-token/getMe"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(
                    json!({
                    "ok": true,
                    "result": { "id": 1, "is_bot": true, "first_name": "Tri", "username": "tri_bot" }
                })
                )
            )
            .mount(&server).await;

        let channel = channel_for(&server).await;
        let me = channel.test_connection().await.unwrap();
        assert_eq!(me.username.as_deref(), Some("tri_bot"));
        assert!(me.is_bot);
    }

    #[tokio::test]
    async fn test_polling_yields_text_messages_and_advances_offset() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/bottest-token/getUpdates"))
            .and(body_partial_json(json!({ "offset": 0 })))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(
                    json!({
                    "ok": true,
                    "result": [
                        { "update_id": 100, "message": {
                            "message_id": 1, "chat": { "id": 5 }, "from": { "id": 9 }, "text": "Good morning"
                        } },
                        { "update_id": 101, "message": {
                            "message_id": 2, "chat": { "id": 5 }, "from": { "id": 9 }
                        } }
                    ]
                })
                )
            )
            .mount(&server).await;
        Mock::given(method("POST"))
            .and(path("/bottest-token/getUpdates"))
            .and(body_partial_json(json!({ "offset": 102 })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "ok": true, "result": [] })))
            .mount(&server).await;

        let channel = channel_for(&server).await;
        let mut inbound = channel.start_receiving();
        let first = tokio::time
            ::timeout(Duration::from_secs(5), inbound.next()).await
            .expect("message within timeout")
            .expect("stream open");
        channel.stop_polling();

        assert_eq!(first.text, "Good morning");
        assert_eq!(first.conversation_id, "5");
        assert_eq!(channel.last_update_id(), 101);
    }
}
