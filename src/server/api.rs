use crate::error::RelayError;
use crate::models::chat::{ ChatRequest, ChatResponse };
use crate::relay::ChatRelay;
use std::error::Error;
use std::num::NonZeroU32;
use std::sync::Arc;
use std::time::Instant;
use axum::{
    body::Bytes,
    extract::{ Request, State },
    http::{ HeaderValue, Method, StatusCode },
    middleware::{ self, Next },
    response::{ IntoResponse, Response },
    routing::{ get, post },
    Json,
    Router,
};
use governor::{ RateLimiter, Quota, state::{ InMemoryState, NotKeyed }, clock::DefaultClock };
use tower::ServiceBuilder;
use tower_http::cors::{ AllowOrigin, Any, CorsLayer };
use uuid::Uuid;
use log::{ info, warn };

type ChatLimiter = RateLimiter<NotKeyed, InMemoryState, DefaultClock>;

#[derive(Clone)]
pub struct AppState {
    relay: Arc<ChatRelay>,
    limiter: Option<Arc<ChatLimiter>>,
}

impl AppState {
    /// `requests_per_second == 0` leaves chat requests unthrottled.
    pub fn new(relay: Arc<ChatRelay>, requests_per_second: u32) -> Self {
        let limiter = NonZeroU32::new(requests_per_second).map(|rps| {
            info!("Chat requests limited to {} per second", rps);
            Arc::new(RateLimiter::direct(Quota::per_second(rps)))
        });
        Self { relay, limiter }
    }
}

fn cors_layer(allowed_origins: &[String]) -> Result<CorsLayer, Box<dyn Error + Send + Sync>> {
    let cors = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers(Any);

    if allowed_origins.is_empty() {
        return Ok(cors.allow_origin(Any));
    }

    let origins = allowed_origins
        .iter()
        .map(|origin| {
            HeaderValue::from_str(origin.trim()).map_err(|e|
                format!("Invalid origin '{}' in ALLOWED_ORIGINS: {}", origin, e)
            )
        })
        .collect::<Result<Vec<_>, _>>()?;
    info!("CORS restricted to {:?}", allowed_origins);
    Ok(cors.allow_origin(AllowOrigin::list(origins)))
}

pub fn build_router(
    state: AppState,
    allowed_origins: &[String]
) -> Result<Router, Box<dyn Error + Send + Sync>> {
    let cors = cors_layer(allowed_origins)?;

    let app = Router::new()
        .route("/", get(root_handler).fallback(not_found_handler))
        .route("/api/chat", post(chat_handler).fallback(not_found_handler))
        .fallback(not_found_handler)
        .layer(ServiceBuilder::new().layer(middleware::from_fn(log_request)).layer(cors))
        .with_state(state);

    Ok(app)
}

async fn log_request(req: Request, next: Next) -> Response {
    let request_id = Uuid::new_v4();
    let method = req.method().clone();
    let path = req.uri().path().to_string();
    let started = Instant::now();
    info!("[{}] {} request received to {}", request_id, method, path);

    let response = next.run(req).await;

    info!(
        "[{}] {} {} -> {} in {:?}",
        request_id,
        method,
        path,
        response.status().as_u16(),
        started.elapsed()
    );
    response
}

async fn root_handler() -> &'static str {
    "Insurance chat relay is running"
}

async fn not_found_handler() -> impl IntoResponse {
    (StatusCode::NOT_FOUND, "Endpoint not found")
}

async fn chat_handler(
    State(state): State<AppState>,
    body: Bytes
) -> Result<Json<ChatResponse>, RelayError> {
    let request: ChatRequest = serde_json::from_slice(&body).map_err(|e| {
        warn!("Unreadable chat request body: {}", e);
        RelayError::Validation(
            "Request body must be a JSON object with a userResponse string.".to_string()
        )
    })?;
    ChatRelay::validate(&request)?;

    if let Some(limiter) = &state.limiter {
        if limiter.check().is_err() {
            warn!("Chat request quota exceeded");
            return Err(RelayError::RateLimited);
        }
    }

    let response = state.relay.handle_chat(request).await?;
    Ok(Json(response))
}
