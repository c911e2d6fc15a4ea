//! Client half of the relay: one in-memory conversation per session and at
//! most one outstanding request.

use crate::models::chat::{ ChatRequest, ChatResponse, Conversation, Turn };
use async_trait::async_trait;
use log::{ debug, warn };
use std::sync::{ Arc, Mutex, MutexGuard };
use std::time::Duration;
use thiserror::Error;

pub const FALLBACK_REPLY: &str = "Sorry, something went wrong!";
pub const DEFAULT_GREETING: &str =
    "I'm Tina. I help you to choose the right insurance policy. May I ask you a few personal questions?";
pub const DEFAULT_MAX_WAIT: Duration = Duration::from_secs(60);

#[derive(Debug, Error)]
pub enum TransportError {
    #[error("relay unreachable: {0}")]
    Http(#[from] reqwest::Error),

    #[error("relay answered {status}: {body}")]
    Status {
        status: u16,
        body: String,
    },

    #[error("unreadable relay response: {0}")]
    Decode(String),
}

#[async_trait]
pub trait RelayTransport: Send + Sync {
    async fn send(&self, request: &ChatRequest) -> Result<ChatResponse, TransportError>;
}

/// Calls `POST {base_url}/api/chat` over HTTP.
pub struct HttpRelayTransport {
    http: reqwest::Client,
    endpoint: String,
}

impl HttpRelayTransport {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, TransportError> {
        let http = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            http,
            endpoint: format!("{}/api/chat", base_url.trim_end_matches('/')),
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[async_trait]
impl RelayTransport for HttpRelayTransport {
    async fn send(&self, request: &ChatRequest) -> Result<ChatResponse, TransportError> {
        let resp = self.http.post(&self.endpoint).json(request).send().await?;
        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(TransportError::Status { status: status.as_u16(), body });
        }
        resp.json::<ChatResponse>().await.map_err(|e| TransportError::Decode(e.to_string()))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Idle,
    AwaitingResponse,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmitOutcome {
    /// The relay replied; both turns were appended.
    Answered(String),
    /// The turn failed and the fallback reply was appended.
    Failed,
    /// A request was already in flight.
    Ignored,
    /// Blank input.
    Rejected,
}

struct SessionInner {
    conversation: Conversation,
    state: SessionState,
}

pub struct ChatSession {
    transport: Arc<dyn RelayTransport>,
    inner: Mutex<SessionInner>,
    max_wait: Duration,
}

impl ChatSession {
    pub fn new(transport: Arc<dyn RelayTransport>, greeting: &str) -> Self {
        Self::with_conversation(transport, Conversation::new().with_turn(Turn::assistant(greeting)))
    }

    pub fn with_conversation(transport: Arc<dyn RelayTransport>, conversation: Conversation) -> Self {
        Self {
            transport,
            inner: Mutex::new(SessionInner {
                conversation,
                state: SessionState::Idle,
            }),
            max_wait: DEFAULT_MAX_WAIT,
        }
    }

    pub fn max_wait(mut self, max_wait: Duration) -> Self {
        self.max_wait = max_wait;
        self
    }

    pub fn state(&self) -> SessionState {
        lock(&self.inner).state
    }

    pub fn conversation(&self) -> Conversation {
        lock(&self.inner).conversation.clone()
    }

    /// Sends one user turn. The lock is released for the round trip, so a
    /// concurrent call sees `AwaitingResponse` and returns `Ignored`.
    pub async fn submit(&self, text: &str) -> SubmitOutcome {
        if text.trim().is_empty() {
            return SubmitOutcome::Rejected;
        }

        let in_flight = {
            let mut inner = lock(&self.inner);
            if inner.state == SessionState::AwaitingResponse {
                debug!("Submit ignored, a request is already in flight");
                return SubmitOutcome::Ignored;
            }
            inner.state = SessionState::AwaitingResponse;
            InFlight {
                inner: &self.inner,
                prior: inner.conversation.clone(),
                settled: false,
            }
        };

        let request = ChatRequest::new(text, in_flight.prior.clone());
        let result = tokio::time::timeout(self.max_wait, self.transport.send(&request)).await;

        match result {
            Ok(Ok(response)) => {
                let conversation = in_flight.prior.with_exchange(text, &response.ai_response);
                in_flight.settle(conversation);
                SubmitOutcome::Answered(response.ai_response)
            }
            Ok(Err(e)) => {
                warn!("Error sending response: {}", e);
                in_flight.fail();
                SubmitOutcome::Failed
            }
            Err(_) => {
                warn!("Relay did not answer within {:?}", self.max_wait);
                in_flight.fail();
                SubmitOutcome::Failed
            }
        }
    }
}

fn lock(inner: &Mutex<SessionInner>) -> MutexGuard<'_, SessionInner> {
    inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Owns the `AwaitingResponse` state for one round trip. Dropping it
/// unsettled (the submit future was cancelled) records a failed turn and
/// returns the session to `Idle`.
struct InFlight<'a> {
    inner: &'a Mutex<SessionInner>,
    prior: Conversation,
    settled: bool,
}

impl InFlight<'_> {
    fn settle(mut self, conversation: Conversation) {
        let mut inner = lock(self.inner);
        inner.conversation = conversation;
        inner.state = SessionState::Idle;
        self.settled = true;
    }

    fn fail(self) {
        let conversation = self.prior.with_turn(Turn::assistant(FALLBACK_REPLY));
        self.settle(conversation);
    }
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        if self.settled {
            return;
        }
        warn!("Submit dropped before the relay answered");
        let mut inner = lock(self.inner);
        inner.conversation = self.prior.with_turn(Turn::assistant(FALLBACK_REPLY));
        inner.state = SessionState::Idle;
    }
}
