use async_trait::async_trait;
use std::error::Error as StdError;
use log::{ debug, info };

use super::{ ChatClient, CompletionResponse };
use crate::llm::LlmConfig;
use rllm::chat::{ ChatMessage, ChatRole, MessageType };
use rllm::builder::{ LLMBackend, LLMBuilder };
use rllm::LLMProvider;

const DEFAULT_GEMINI_MODEL: &str = "gemini-1.5-flash";

pub struct GeminiChatClient {
    llm: Box<dyn LLMProvider + Send + Sync>,
    model: String,
    base_url: Option<String>,
}

impl GeminiChatClient {
    pub fn new(
        api_key: String,
        model: Option<String>,
        base_url: Option<String>,
        max_tokens: u32,
        temperature: f32
    ) -> Result<Self, Box<dyn StdError + Send + Sync>> {
        let chat_model = model.unwrap_or_else(|| DEFAULT_GEMINI_MODEL.to_string());

        let mut builder = LLMBuilder::new()
            .backend(LLMBackend::Google)
            .api_key(api_key)
            .model(&chat_model)
            .max_tokens(max_tokens)
            .temperature(temperature)
            .stream(false);

        if let Some(url) = &base_url {
            builder = builder.base_url(url);
        }

        let llm_provider = builder.build()?;
        info!(
            "Gemini client ready: model={} max_tokens={} temperature={}",
            chat_model,
            max_tokens,
            temperature
        );

        Ok(Self {
            llm: llm_provider,
            model: chat_model,
            base_url,
        })
    }

    pub fn from_config(config: &LlmConfig) -> Result<Self, Box<dyn StdError + Send + Sync>> {
        let api_key = config.api_key
            .clone()
            .filter(|k| !k.trim().is_empty())
            .ok_or_else(|| "Google API key is required for GeminiChatClient (set API_KEY)".to_string())?;

        Self::new(
            api_key,
            config.completion_model.clone(),
            config.base_url.clone(),
            config.max_tokens,
            config.temperature
        )
    }
}

#[async_trait]
impl ChatClient for GeminiChatClient {
    async fn complete(
        &self,
        prompt: &str
    ) -> Result<CompletionResponse, Box<dyn StdError + Send + Sync>> {
        let messages = vec![ChatMessage {
            role: ChatRole::User,
            content: prompt.to_string(),
            message_type: MessageType::Text,
        }];
        debug!("GeminiChatClient::complete() → model={} prompt_chars={}", self.model, prompt.len());
        let resp = self.llm.chat(&messages).await?;
        let text = resp
            .text()
            .map(|s| s.to_string())
            .filter(|s| !s.trim().is_empty())
            .ok_or("Gemini returned no text candidate")?;
        Ok(CompletionResponse { response: text })
    }

    fn get_model(&self) -> String {
        self.model.clone()
    }

    fn get_base_url(&self) -> Option<String> {
        self.base_url.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_key_is_rejected() {
        let config = LlmConfig {
            api_key: Some("   ".to_string()),
            ..LlmConfig::default()
        };
        assert!(GeminiChatClient::from_config(&config).is_err());
    }
}
