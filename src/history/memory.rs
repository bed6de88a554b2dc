use async_trait::async_trait;
use log::debug;
use std::collections::{ HashMap, VecDeque };
use std::sync::{ Arc, Mutex, MutexGuard };
use tokio::sync::Mutex as AsyncMutex;

use crate::history::{ ConversationGuard, HistoryStore };
use crate::models::chat::{ ConversationHistory, Exchange };

/// Process-lifetime history, keyed by conversation id. Nothing survives a restart.
pub struct MemoryHistoryStore {
    window: usize,
    conversations: Mutex<HashMap<String, VecDeque<Exchange>>>,
    locks: Mutex<HashMap<String, Arc<AsyncMutex<()>>>>,
}

fn guard<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

impl MemoryHistoryStore {
    pub fn new(window: usize) -> Self {
        Self {
            window: window.max(1),
            conversations: Mutex::new(HashMap::new()),
            locks: Mutex::new(HashMap::new()),
        }
    }
}

#[async_trait]
impl HistoryStore for MemoryHistoryStore {
    fn get(&self, conversation_id: &str) -> ConversationHistory {
        let conversations = guard(&self.conversations);
        ConversationHistory {
            id: conversation_id.to_string(),
            exchanges: conversations
                .get(conversation_id)
                .map(|entries| entries.iter().cloned().collect())
                .unwrap_or_default(),
        }
    }

    fn append(&self, conversation_id: &str, exchange: Exchange) {
        let mut conversations = guard(&self.conversations);
        let entries = conversations.entry(conversation_id.to_string()).or_default();
        entries.push_back(exchange);
        while entries.len() > self.window {
            entries.pop_front();
        }
        debug!("Conversation {} now holds {} exchanges", conversation_id, entries.len());
    }

    async fn clear(&self, conversation_id: &str) -> bool {
        let removed = {
            let _held = self.lock(conversation_id).await;
            guard(&self.conversations)
                .remove(conversation_id)
                .map(|entries| !entries.is_empty())
                .unwrap_or(false)
        };

        let mut locks = guard(&self.locks);
        if let Some(lock) = locks.get(conversation_id) {
            // Only the map holds it, so nobody is inside or waiting.
            if Arc::strong_count(lock) == 1 {
                locks.remove(conversation_id);
            }
        }
        removed
    }

    async fn lock(&self, conversation_id: &str) -> ConversationGuard {
        let lock = {
            let mut locks = guard(&self.locks);
            locks
                .entry(conversation_id.to_string())
                .or_insert_with(|| Arc::new(AsyncMutex::new(())))
                .clone()
        };
        lock.lock_owned().await
    }

    fn window(&self) -> usize {
        self.window
    }
}
