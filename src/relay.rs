use crate::config::prompt::{ assemble_prompt, PromptConfig };
use crate::error::RelayError;
use crate::llm::chat::ChatClient;
use crate::models::chat::{ ChatRequest, ChatResponse };

use log::{ error, info, warn };
use std::sync::Arc;
use std::time::{ Duration, Instant };

pub const DEFAULT_UPSTREAM_TIMEOUT: Duration = Duration::from_secs(30);

/// Turns one chat request into one upstream completion. Holds no
/// per-conversation state; the caller always sends the full history.
#[derive(Clone)]
pub struct ChatRelay {
    chat_client: Arc<dyn ChatClient>,
    prompt_config: Arc<PromptConfig>,
    upstream_timeout: Duration,
}

impl ChatRelay {
    pub fn new(
        chat_client: Arc<dyn ChatClient>,
        prompt_config: Arc<PromptConfig>,
        upstream_timeout: Duration
    ) -> Self {
        Self {
            chat_client,
            prompt_config,
            upstream_timeout,
        }
    }

    /// Returns the user's text, or a validation error when it is missing or blank.
    pub fn validate(request: &ChatRequest) -> Result<&str, RelayError> {
        match request.user_response.as_deref() {
            Some(text) if !text.trim().is_empty() => Ok(text),
            _ => {
                warn!("Rejected chat request with empty user response");
                Err(
                    RelayError::Validation(
                        "User response is empty. Please provide a valid response.".to_string()
                    )
                )
            }
        }
    }

    pub async fn handle_chat(&self, request: ChatRequest) -> Result<ChatResponse, RelayError> {
        let user_response = Self::validate(&request)?;
        let history = &request.chat_history;

        let prompt = assemble_prompt(&self.prompt_config, history, user_response);
        info!(
            "Relaying turn to model={} history_len={} prompt_chars={}",
            self.chat_client.get_model(),
            history.len(),
            prompt.len()
        );

        let started = Instant::now();
        let completion = match
            tokio::time::timeout(self.upstream_timeout, self.chat_client.complete(&prompt)).await
        {
            Ok(Ok(completion)) => completion,
            Ok(Err(e)) => {
                error!("Error generating AI response: {}", e);
                return Err(RelayError::upstream(e.to_string()));
            }
            Err(_) => {
                error!("Model call timed out after {:?}", self.upstream_timeout);
                return Err(
                    RelayError::upstream(
                        format!("upstream model did not answer within {:?}", self.upstream_timeout)
                    )
                );
            }
        };
        info!("Model answered in {:?}", started.elapsed());

        let chat_history = history.with_exchange(user_response, &completion.response);
        Ok(ChatResponse {
            ai_response: completion.response,
            chat_history,
        })
    }
}
