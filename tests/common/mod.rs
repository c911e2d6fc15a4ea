#![allow(dead_code)]

use async_trait::async_trait;
use axum::Router;
use policy_chat_relay::config::prompt::PromptConfig;
use policy_chat_relay::llm::chat::{ ChatClient, CompletionResponse };
use policy_chat_relay::relay::{ ChatRelay, DEFAULT_UPSTREAM_TIMEOUT };
use policy_chat_relay::server::api::{ build_router, AppState };
use std::error::Error as StdError;
use std::sync::atomic::{ AtomicUsize, Ordering };
use std::sync::Arc;

/// Stands in for the hosted model: answers with a fixed reply or fails.
pub struct ScriptedChatClient {
    calls: AtomicUsize,
    reply: Option<String>,
}

impl ScriptedChatClient {
    pub fn replying(reply: &str) -> Arc<Self> {
        Arc::new(Self { calls: AtomicUsize::new(0), reply: Some(reply.to_string()) })
    }

    pub fn failing() -> Arc<Self> {
        Arc::new(Self { calls: AtomicUsize::new(0), reply: None })
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ChatClient for ScriptedChatClient {
    async fn complete(
        &self,
        _prompt: &str
    ) -> Result<CompletionResponse, Box<dyn StdError + Send + Sync>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match &self.reply {
            Some(reply) => Ok(CompletionResponse { response: reply.clone() }),
            None => Err("model API unavailable".into()),
        }
    }

    fn get_model(&self) -> String {
        "scripted".to_string()
    }

    fn get_base_url(&self) -> Option<String> {
        None
    }
}

pub fn router_with(client: Arc<ScriptedChatClient>, requests_per_second: u32, origins: &[String]) -> Router {
    let relay = ChatRelay::new(client, Arc::new(PromptConfig::default()), DEFAULT_UPSTREAM_TIMEOUT);
    build_router(AppState::new(Arc::new(relay), requests_per_second), origins).unwrap()
}

pub fn router(client: Arc<ScriptedChatClient>) -> Router {
    router_with(client, 0, &[])
}
