pub mod gemini;
pub mod ollama;

use async_trait::async_trait;
use serde::Deserialize;
use std::error::Error as StdError;
use std::sync::Arc;
use super::{ LlmConfig, LlmType };
use self::gemini::GeminiChatClient;
use self::ollama::OllamaClient;

#[derive(Deserialize, Debug, Clone)]
pub struct CompletionResponse {
    pub response: String,
}

/// A stateless text-completion backend. Implementations are built once and
/// shared across requests.
#[async_trait]
pub trait ChatClient: Send + Sync {
    async fn complete(
        &self,
        prompt: &str
    ) -> Result<CompletionResponse, Box<dyn StdError + Send + Sync>>;

    fn get_model(&self) -> String;
    fn get_base_url(&self) -> Option<String>;
}

pub fn new_client(
    config: &LlmConfig
) -> Result<Arc<dyn ChatClient>, Box<dyn StdError + Send + Sync>> {
    let client: Arc<dyn ChatClient> = match config.llm_type {
        LlmType::Gemini => {
            let specific_client = GeminiChatClient::from_config(config)?;
            Arc::new(specific_client)
        }
        LlmType::Ollama => {
            let specific_client = OllamaClient::from_config(config)?;
            Arc::new(specific_client)
        }
    };
    Ok(client)
}
