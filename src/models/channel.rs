use serde::{ Deserialize, Serialize };

/// Reference to a message the bot has sent, used to edit it later.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageHandle {
    pub id: i64,
}

/// Bot commands understood by the relay.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Command {
    Start,
    Help,
    Clear,
    Unknown(String),
}

impl Command {
    /// Parses `/name`, `/name@BotName` and `/name args`. Returns `None` for
    /// anything that is not a command.
    pub fn parse(text: &str) -> Option<Self> {
        let rest = text.trim_start().strip_prefix('/')?;
        let token = rest.split(char::is_whitespace).next().unwrap_or("");
        let name = token.split('@').next().unwrap_or("").to_lowercase();
        if name.is_empty() {
            return None;
        }
        Some(match name.as_str() {
            "start" => Command::Start,
            "help" => Command::Help,
            "clear" | "reset" => Command::Clear,
            _ => Command::Unknown(name),
        })
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct InboundMessage {
    pub id: String,
    pub conversation_id: String,
    pub sender_id: String,
    pub sender_name: Option<String>,
    pub text: String,
}

impl InboundMessage {
    pub fn new(
        id: impl Into<String>,
        conversation_id: impl Into<String>,
        sender_id: impl Into<String>,
        text: impl Into<String>
    ) -> Self {
        Self {
            id: id.into(),
            conversation_id: conversation_id.into(),
            sender_id: sender_id.into(),
            sender_name: None,
            text: text.into(),
        }
    }

    pub fn with_sender_name(mut self, name: impl Into<String>) -> Self {
        self.sender_name = Some(name.into());
        self
    }

    pub fn command(&self) -> Option<Command> {
        Command::parse(&self.text)
    }
}
