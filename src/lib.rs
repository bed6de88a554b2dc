pub mod agent;
pub mod channel;
pub mod cli;
pub mod config;
pub mod diagnose;
pub mod history;
pub mod llm;
pub mod models;
pub mod server;

#[cfg(test)]
pub(crate) mod test_support;

use agent::{ TranslationAgent, TranslationError };
use channel::telegram::TelegramChannel;
use cli::{ mask_secret, Args };
use log::info;
use server::Server;
use std::error::Error;
use std::sync::Arc;

pub async fn run(args: Args) -> Result<(), Box<dyn Error + Send + Sync>> {
    info!("--- Core Configuration ---");
    info!("Telegram Bot Token: {}", mask_secret(args.telegram_bot_token.as_deref()));
    info!("Gemini API Key: {}", mask_secret(args.gemini_api_key.as_deref()));
    info!("Chat Model: {}", args.chat_model.as_deref().unwrap_or("adapter default"));
    info!("Temperature: {}", args.temperature);
    info!("Backend Retries: {} (delay {} ms)", args.chat_max_retries, args.chat_retry_delay_ms);
    info!("History Window: {}", args.history_window);
    info!("Custom Skip Words: {}", args.skip_words.as_ref().map_or(0, |w| w.len()));
    info!("Liveness Address: {}", args.http_addr);
    info!("-------------------------");

    if args.diagnose {
        return diagnose::run_diagnostic(&args).await;
    }

    let agent = Arc::new(TranslationAgent::from_args(&args)?);
    let channel = TelegramChannel::from_args(&args).ok_or_else(|| {
        TranslationError::NotConfigured("TELEGRAM_BOT_TOKEN is not set".to_string())
    })?;

    info!("Starting relay");
    let server = Server::new(args.http_addr.clone(), agent, Arc::new(channel));
    server.run().await?;

    Ok(())
}
