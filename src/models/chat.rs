use chrono::Utc;
use serde::{ Deserialize, Serialize };

/// One user message paired with the translation that was sent back for it.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Exchange {
    pub source: String,
    pub translation: String,
    pub timestamp: i64,
}

impl Exchange {
    pub fn new(source: impl Into<String>, translation: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            translation: translation.into(),
            timestamp: Utc::now().timestamp(),
        }
    }
}

/// Recent exchanges of a conversation, oldest first.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct ConversationHistory {
    pub id: String,
    pub exchanges: Vec<Exchange>,
}

impl ConversationHistory {
    pub fn empty(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            exchanges: Vec::new(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.exchanges.is_empty()
    }

    pub fn len(&self) -> usize {
        self.exchanges.len()
    }
}

/// Everything needed to compile one instruction. Built per call, never stored.
#[derive(Debug)]
pub struct TranslationRequest<'a> {
    pub conversation_id: &'a str,
    pub source_text: &'a str,
    pub history: ConversationHistory,
}
