use axum::{ http::StatusCode, response::{ IntoResponse, Response }, Json };
use serde::Serialize;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum RelayError {
    #[error("{0}")]
    Validation(String),

    #[error("{message}")]
    Upstream {
        message: String,
        details: Option<String>,
    },

    #[error("Too many requests. Please slow down and try again.")]
    RateLimited,
}

impl RelayError {
    pub fn upstream(details: impl Into<String>) -> Self {
        RelayError::Upstream {
            message: "Failed to generate response.".to_string(),
            details: Some(details.into()),
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            RelayError::Validation(_) => StatusCode::BAD_REQUEST,
            RelayError::Upstream { .. } => StatusCode::INTERNAL_SERVER_ERROR,
            RelayError::RateLimited => StatusCode::TOO_MANY_REQUESTS,
        }
    }
}

#[derive(Serialize)]
struct ErrorBody {
    error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    details: Option<String>,
}

impl IntoResponse for RelayError {
    fn into_response(self) -> Response {
        let status = self.status();
        let details = match &self {
            RelayError::Upstream { details, .. } => details.clone(),
            _ => None,
        };
        let body = ErrorBody {
            error: self.to_string(),
            details,
        };
        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validation_maps_to_bad_request() {
        let e = RelayError::Validation("User response is empty.".into());
        assert_eq!(e.status(), StatusCode::BAD_REQUEST);
        assert_eq!(e.to_string(), "User response is empty.");
    }

    #[test]
    fn upstream_keeps_generic_message() {
        let e = RelayError::upstream("quota exceeded");
        assert_eq!(e.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(e.to_string(), "Failed to generate response.");
        match e {
            RelayError::Upstream { details, .. } => {
                assert_eq!(details.as_deref(), Some("quota exceeded"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn rate_limited_maps_to_429() {
        assert_eq!(RelayError::RateLimited.status(), StatusCode::TOO_MANY_REQUESTS);
    }
}
