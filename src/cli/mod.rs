use clap::Parser;

#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    // --- Credentials ---
    /// Telegram bot token issued by @BotFather. Required unless running --diagnose.
    #[arg(long, env = "TELEGRAM_BOT_TOKEN", hide_env_values = true)]
    pub telegram_bot_token: Option<String>,

    /// API key for the Gemini generation backend. Always required.
    #[arg(long, env = "GEMINI_API_KEY", hide_env_values = true)]
    pub gemini_api_key: Option<String>,

    // --- Chat LLM Provider Args ---
    /// Model name for translation (e.g., gemini-1.5-flash)
    #[arg(long, env = "CHAT_MODEL")] // No default, rely on adapter defaults if None
    pub chat_model: Option<String>,

    /// Base URL override for the Gemini API
    #[arg(long, env = "CHAT_BASE_URL")]
    pub chat_base_url: Option<String>,

    /// Sampling temperature for every translation call. Keep it near zero.
    #[arg(long, env = "CHAT_TEMPERATURE", default_value = "0.1")]
    pub temperature: f32,

    /// How many times a failed backend call is retried before giving up.
    #[arg(long, env = "CHAT_MAX_RETRIES", default_value = "1")]
    pub chat_max_retries: u32,

    /// Delay between backend retries, in milliseconds.
    #[arg(long, env = "CHAT_RETRY_DELAY_MS", default_value = "500")]
    pub chat_retry_delay_ms: u64,

    // --- History Args ---
    /// Number of past exchanges kept per conversation as translation context.
    #[arg(long, env = "HISTORY_WINDOW", default_value = "3")]
    pub history_window: usize,

    // --- Skip Heuristic Args ---
    /// Comma-separated filler words that are never translated (replaces the built-in list).
    #[arg(long, env = "SKIP_WORDS", value_delimiter = ',')]
    pub skip_words: Option<Vec<String>>,

    // --- Telegram Args ---
    /// Base URL of the Telegram Bot API.
    #[arg(long, env = "TELEGRAM_API_BASE", default_value = "https://api.telegram.org")]
    pub telegram_api_base: String,

    /// Long-polling timeout for getUpdates, in seconds.
    #[arg(long, env = "TELEGRAM_POLLING_TIMEOUT", default_value = "30")]
    pub telegram_polling_timeout: u32,

    // --- User-facing Texts ---
    /// Placeholder shown while a translation is in progress.
    #[arg(long, env = "PLACEHOLDER_TEXT", default_value = "翻譯中，請稍候...")]
    pub placeholder_text: String,

    /// Message shown when a translation fails for any reason.
    #[arg(long, env = "APOLOGY_TEXT", default_value = "抱歉，翻譯時發生了一點問題，請稍後再試。")]
    pub apology_text: String,

    // --- General App Args ---
    /// Host address and port for the liveness HTTP endpoint.
    #[arg(long, env = "HTTP_ADDR", default_value = "0.0.0.0:8080")]
    pub http_addr: String,

    /// List the models the key can see, send one sample translation, report the result and exit.
    #[arg(long, default_value = "false")]
    pub diagnose: bool,

    /// Enable debug logging/output
    #[arg(long, env = "DEBUG", default_value = "false")]
    pub debug: bool,
}

/// Masks a secret for log output, keeping only its last four characters.
pub fn mask_secret(secret: Option<&str>) -> String {
    match secret.map(str::trim) {
        None | Some("") => "<not set>".to_string(),
        Some(value) => {
            let tail: String = value
                .chars()
                .rev()
                .take(4)
                .collect::<Vec<_>>()
                .into_iter()
                .rev()
                .collect();
            format!("****{}", tail)
        }
    }
}
