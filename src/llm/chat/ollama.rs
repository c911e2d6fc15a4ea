use reqwest::Client as HttpClient;
use serde::{ Deserialize, Serialize };
use async_trait::async_trait;
use std::error::Error as StdError;
use super::{ ChatClient, CompletionResponse };
use crate::llm::{ LlmConfig, LlmType };
use log::debug;

const DEFAULT_OLLAMA_URL: &str = "http://localhost:11434";
const DEFAULT_OLLAMA_MODEL: &str = "llama3";

#[derive(Debug)]
pub struct OllamaClient {
    http: HttpClient,
    base_url: String,
    completion_model: String,
    max_tokens: u32,
    temperature: f32,
}

#[derive(Serialize)]
struct GenerateOptions {
    num_predict: u32,
    temperature: f32,
}

#[derive(Serialize)]
struct GenerateRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    stream: bool,
    options: GenerateOptions,
}

#[derive(Deserialize)]
struct GenerateResponse {
    response: String,
}

impl OllamaClient {
    pub fn new(
        base_url: Option<String>,
        completion_model: Option<String>,
        max_tokens: u32,
        temperature: f32
    ) -> Self {
        let model = completion_model.unwrap_or_else(|| DEFAULT_OLLAMA_MODEL.to_string());
        let url = base_url.unwrap_or_else(|| DEFAULT_OLLAMA_URL.into());

        Self {
            http: HttpClient::new(),
            base_url: url,
            completion_model: model,
            max_tokens,
            temperature,
        }
    }

    pub fn from_config(config: &LlmConfig) -> Result<Self, Box<dyn StdError + Send + Sync>> {
        if config.llm_type != LlmType::Ollama {
            return Err("Invalid config type for OllamaClient".into());
        }

        Ok(
            Self::new(
                config.base_url.clone(),
                config.completion_model.clone(),
                config.max_tokens,
                config.temperature
            )
        )
    }
}

#[async_trait]
impl ChatClient for OllamaClient {
    async fn complete(
        &self,
        prompt: &str
    ) -> Result<CompletionResponse, Box<dyn StdError + Send + Sync>> {
        let url = format!("{}/api/generate", self.base_url.trim_end_matches('/'));
        let body = GenerateRequest {
            model: &self.completion_model,
            prompt,
            stream: false,
            options: GenerateOptions {
                num_predict: self.max_tokens,
                temperature: self.temperature,
            },
        };
        debug!("OllamaClient::complete() → {} model={}", url, self.completion_model);

        let resp = self.http.post(&url).json(&body).send().await?.error_for_status()?;
        let parsed: GenerateResponse = resp.json().await?;
        if parsed.response.trim().is_empty() {
            return Err("Ollama returned an empty response".into());
        }
        Ok(CompletionResponse { response: parsed.response })
    }

    fn get_model(&self) -> String {
        self.completion_model.clone()
    }

    fn get_base_url(&self) -> Option<String> {
        Some(self.base_url.clone())
    }
}
