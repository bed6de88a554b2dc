//! One-shot backend check: are the key and model usable right now?

use log::{ error, info, warn };
use std::error::Error;

use crate::agent::{ sanitize_response, validate_response, TranslationError };
use crate::cli::Args;
use crate::llm::chat::{ new_client, ChatClient };
use crate::llm::LlmConfig;

pub const SAMPLE_TEXT: &str = "這是一句測試。";

/// Lists the models the key can see. An empty list is reported but not fatal.
pub async fn list_available_models(client: &dyn ChatClient) -> Result<Vec<String>, TranslationError> {
    let models = client.list_models().await?;
    if models.is_empty() {
        warn!("No models are available to this API key");
    }
    Ok(models)
}

/// Sends the sample text once and returns the sanitized reply.
pub async fn translate_sample(
    client: &dyn ChatClient,
    temperature: f32
) -> Result<String, TranslationError> {
    let resp = client.complete(SAMPLE_TEXT, temperature).await?;
    validate_response(&resp.response)?;
    Ok(sanitize_response(&resp.response))
}

/// Both steps against an already built client; returns the sample reply.
pub async fn check_backend(
    client: &dyn ChatClient,
    temperature: f32
) -> Result<String, TranslationError> {
    info!("Step 1: listing models available to the key");
    let models = list_available_models(client).await?;
    for model in &models {
        println!("  - {}", model);
    }

    info!("Step 2: sending sample text to '{}'", client.get_model());
    translate_sample(client, temperature).await
}

pub async fn run_diagnostic(args: &Args) -> Result<(), Box<dyn Error + Send + Sync>> {
    info!("--- Backend Diagnostic ---");
    let config = LlmConfig::from_args(args);
    let client = new_client(&config).map_err(TranslationError::from)?;

    match check_backend(client.as_ref(), config.temperature).await {
        Ok(reply) => {
            info!("[OK] The key works with model '{}'", client.get_model());
            println!("{}", reply);
            Ok(())
        }
        Err(e) => {
            error!("[FAILED] {} ({})", e, e.kind());
            Err(e.into())
        }
    }
}
