mod memory;

pub use memory::MemoryHistoryStore;

use async_trait::async_trait;
use log::info;
use std::error::Error;
use std::sync::Arc;
use tokio::sync::OwnedMutexGuard;
use crate::cli::Args;
use crate::models::chat::{ ConversationHistory, Exchange };

/// Held for the read-compile-call-append span of one message. Dropping it
/// lets the next message of the same conversation proceed.
pub type ConversationGuard = OwnedMutexGuard<()>;

#[async_trait]
pub trait HistoryStore: Send + Sync {
    /// Returns the stored history, or an empty one for an unknown conversation.
    fn get(&self, conversation_id: &str) -> ConversationHistory;

    /// Appends one exchange and evicts the oldest entries beyond the window.
    fn append(&self, conversation_id: &str, exchange: Exchange);

    /// Drops all history of a conversation once no message of it is being
    /// translated. Returns `false` if there was nothing to drop.
    async fn clear(&self, conversation_id: &str) -> bool;

    /// Waits for exclusive use of a conversation. Distinct ids never contend.
    async fn lock(&self, conversation_id: &str) -> ConversationGuard;

    fn window(&self) -> usize;
}

pub fn initialize_history_store(
    args: &Args
) -> Result<Arc<dyn HistoryStore>, Box<dyn Error + Send + Sync>> {
    if args.history_window == 0 {
        return Err("HISTORY_WINDOW must be at least 1".into());
    }
    info!("Chat history kept in memory, last {} exchanges per conversation", args.history_window);
    Ok(Arc::new(MemoryHistoryStore::new(args.history_window)))
}

pub fn format_history_for_prompt(history: &ConversationHistory) -> String {
    if history.is_empty() {
        return String::new();
    }
    let mut result = String::new();
    for (index, exchange) in history.exchanges.iter().enumerate() {
        result.push_str(&format!("[{}]\n", index + 1));
        result.push_str(&format!("Source: {}\n", exchange.source));
        result.push_str(&format!("Translation:\n{}\n", exchange.translation));
    }
    result
}
