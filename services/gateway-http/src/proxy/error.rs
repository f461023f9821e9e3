use crate::auth::AuthError;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use thiserror::Error;
use tracing::error;

#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("Authentication failed: {0}")]
    Auth(#[from] AuthError),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Unprocessable entity: {0}")]
    Unprocessable(String),

    #[error("Body too large: exceeds limit of {limit} bytes")]
    BodyTooLarge { limit: usize },

    #[error("Upstream unavailable: {0}")]
    UpstreamUnavailable(String),

    #[error("Upstream request timed out")]
    UpstreamTimeout,

    #[error("Invalid upstream response: {0}")]
    InvalidUpstreamResponse(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl GatewayError {
    /// Logs an unexpected local failure against the operation it happened in.
    /// The detail stays in the log; clients only see a generic message.
    pub fn internal(operation: &str, err: impl std::fmt::Display) -> Self {
        error!(operation, error = %err, "Internal gateway failure");
        GatewayError::Internal(err.to_string())
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            GatewayError::Auth(_) => StatusCode::UNAUTHORIZED,
            GatewayError::Forbidden(_) => StatusCode::FORBIDDEN,
            GatewayError::BadRequest(_) => StatusCode::BAD_REQUEST,
            GatewayError::Unprocessable(_) => StatusCode::UNPROCESSABLE_ENTITY,
            GatewayError::BodyTooLarge { .. } => StatusCode::PAYLOAD_TOO_LARGE,
            GatewayError::UpstreamUnavailable(_)
            | GatewayError::UpstreamTimeout
            | GatewayError::InvalidUpstreamResponse(_) => StatusCode::BAD_GATEWAY,
            GatewayError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_code(&self) -> &'static str {
        match self {
            GatewayError::Auth(AuthError::NoCredential) => "NO_CREDENTIAL",
            GatewayError::Auth(AuthError::Unauthenticated(_)) => "UNAUTHENTICATED",
            GatewayError::Forbidden(_) => "FORBIDDEN",
            GatewayError::BadRequest(_) => "BAD_REQUEST",
            GatewayError::Unprocessable(_) => "VALIDATION_ERROR",
            GatewayError::BodyTooLarge { .. } => "BODY_TOO_LARGE",
            GatewayError::UpstreamUnavailable(_) | GatewayError::InvalidUpstreamResponse(_) => {
                "UPSTREAM_UNAVAILABLE"
            }
            GatewayError::UpstreamTimeout => "UPSTREAM_TIMEOUT",
            GatewayError::Internal(_) => "INTERNAL_ERROR",
        }
    }

    fn public_message(&self) -> String {
        match self {
            GatewayError::UpstreamUnavailable(_) | GatewayError::InvalidUpstreamResponse(_) => {
                "Upstream service unavailable".to_string()
            }
            GatewayError::Internal(_) => "Internal server error".to_string(),
            other => other.to_string(),
        }
    }
}

impl IntoResponse for GatewayError {
    fn into_response(self) -> Response {
        let body = json!({
            "error": self.error_code(),
            "message": self.public_message(),
        });

        (self.status_code(), Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::TokenError;

    #[test]
    fn taxonomy_maps_to_status_codes() {
        let cases = [
            (GatewayError::Auth(AuthError::NoCredential), 401),
            (
                GatewayError::Auth(AuthError::Unauthenticated(TokenError::Expired)),
                401,
            ),
            (GatewayError::Forbidden("not yours".into()), 403),
            (GatewayError::BadRequest("bad id".into()), 400),
            (GatewayError::Unprocessable("too long".into()), 422),
            (GatewayError::BodyTooLarge { limit: 16 }, 413),
            (GatewayError::UpstreamUnavailable("refused".into()), 502),
            (GatewayError::UpstreamTimeout, 502),
            (GatewayError::InvalidUpstreamResponse("eof".into()), 502),
            (GatewayError::Internal("boom".into()), 500),
        ];

        for (err, status) in cases {
            assert_eq!(err.status_code().as_u16(), status, "{err}");
            assert_eq!(err.into_response().status().as_u16(), status);
        }
    }

    #[test]
    fn internal_details_are_not_exposed() {
        let err = GatewayError::Internal("signing key exploded".into());
        assert_eq!(err.public_message(), "Internal server error");

        let err = GatewayError::UpstreamUnavailable("tcp connect to 10.0.0.7 failed".into());
        assert!(!err.public_message().contains("10.0.0.7"));
    }
}
