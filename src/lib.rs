pub mod cli;
pub mod client;
pub mod config;
pub mod error;
pub mod llm;
pub mod models;
pub mod relay;
pub mod server;

use cli::Args;
use config::prompt::{ self, PromptConfig };
use llm::{ LlmConfig, LlmType };
use llm::chat::new_client as new_chat_client;
use log::info;
use relay::ChatRelay;
use server::Server;
use std::error::Error;
use std::sync::Arc;
use std::time::Duration;

/// Builds the shared relay (model client and preamble) once for the lifetime
/// of the process.
pub fn build_relay(args: &Args) -> Result<ChatRelay, Box<dyn Error + Send + Sync>> {
    let llm_type: LlmType = args.chat_llm_type.parse()?;
    let chat_api_key = if !args.chat_api_key.is_empty() {
        Some(args.chat_api_key.clone())
    } else {
        None
    };
    let chat_config = LlmConfig {
        llm_type,
        api_key: chat_api_key,
        completion_model: args.chat_model.clone(),
        base_url: args.chat_base_url.clone(),
        max_tokens: args.max_output_tokens,
        temperature: args.temperature,
    };
    let chat_client = new_chat_client(&chat_config)?;
    info!(
        "Chat client configured: Type={}, Model={}, BaseURL={:?}",
        llm_type,
        chat_client.get_model(),
        chat_client.get_base_url().as_deref().unwrap_or("adapter default")
    );

    let prompt_config = match &args.prompts_path {
        Some(path) => prompt::load_prompts(path)?,
        None => {
            info!("Using built-in insurance preamble");
            Arc::new(PromptConfig::default())
        }
    };

    Ok(ChatRelay::new(chat_client, prompt_config, Duration::from_secs(args.upstream_timeout_secs)))
}

pub async fn run(args: Args) -> Result<(), Box<dyn Error + Send + Sync>> {
    info!("--- Core Configuration ---");
    info!("Listen Address: {}:{}", args.host, args.port);
    info!("Chat LLM Type: {}", args.chat_llm_type);
    info!("Chat API Key Set: {}", !args.chat_api_key.is_empty());
    info!("Max Output Tokens: {}", args.max_output_tokens);
    info!("Temperature: {}", args.temperature);
    info!("Upstream Timeout: {}s", args.upstream_timeout_secs);
    info!("Prompts Path: {}", args.prompts_path.as_deref().unwrap_or("built-in"));
    info!("Allowed Origins: {}", if args.allowed_origins.is_empty() { "any".to_string() } else { args.allowed_origins.join(", ") });
    info!("Requests Per Second: {}", args.requests_per_second);
    info!("TLS Enabled: {}", args.enable_tls);
    info!("-------------------------");

    let relay = Arc::new(build_relay(&args)?);
    let server = Server::new(relay, args)?;
    server.run().await?;

    Ok(())
}
