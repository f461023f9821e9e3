use std::sync::Arc;

use axum::extract::DefaultBodyLimit;
use axum::http::header::{AUTHORIZATION, CONTENT_TYPE};
use axum::http::{HeaderName, HeaderValue, Method};
use axum::{
    routing::{delete, get, post},
    Router,
};
use tower::ServiceBuilder;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer};
use tower_http::trace::TraceLayer;
use tracing::warn;

use super::handlers;
use crate::proxy::GatewayState;

pub fn create_router(state: Arc<GatewayState>) -> Router {
    let body_limit = state.config.max_body_size_bytes;
    let cors = cors_layer(&state.config.cors_allowed_origins);

    let middleware = ServiceBuilder::new()
        .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
        .layer(TraceLayer::new_for_http())
        .layer(PropagateRequestIdLayer::x_request_id())
        .layer(RequestBodyLimitLayer::new(body_limit));

    let router = Router::new()
        .route("/user/signup", post(handlers::sign_up))
        .route("/user/login", post(handlers::login))
        .route("/user/logout", get(handlers::logout))
        .route("/user/delete", delete(handlers::delete_user))
        .route("/user", get(handlers::get_user))
        .route("/mehms", get(handlers::list_content))
        .route("/mehms/add", post(handlers::add_content))
        .route("/mehms/:id", get(handlers::get_content_item))
        .route("/mehms/:id/like", post(handlers::like_content))
        .route("/mehms/:id/remove", post(handlers::remove_content))
        .route("/mehms/:id/update", post(handlers::edit_content))
        .route("/comments/new", post(handlers::new_comment))
        .route("/comments/update", post(handlers::edit_comment))
        .route("/comments/remove", post(handlers::delete_comment))
        .route("/comments/:id", get(handlers::get_comment))
        .route("/health", get(handlers::health_check))
        .fallback(handlers::not_found)
        .with_state(state)
        .layer(DefaultBodyLimit::max(body_limit));

    let router = match cors {
        Some(cors) => router.layer(cors),
        None => router,
    };

    router.layer(middleware)
}

/// Credentialed CORS for the configured origins; disabled when none are set.
fn cors_layer(origins: &[String]) -> Option<CorsLayer> {
    let origins: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| match origin.parse::<HeaderValue>() {
            Ok(value) => Some(value),
            Err(e) => {
                warn!(origin = %origin, error = %e, "Skipping invalid CORS origin");
                None
            }
        })
        .collect();

    if origins.is_empty() {
        return None;
    }

    Some(
        CorsLayer::new()
            .allow_origin(AllowOrigin::list(origins))
            .allow_methods([Method::GET, Method::POST, Method::DELETE, Method::OPTIONS])
            .allow_headers([CONTENT_TYPE, AUTHORIZATION])
            .expose_headers([HeaderName::from_static("x-request-id")])
            .allow_credentials(true),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cors_is_disabled_without_origins() {
        assert!(cors_layer(&[]).is_none());
        assert!(cors_layer(&["https://app.example.com".to_string()]).is_some());
    }
}
