use std::sync::Arc;

use axum::body::{Body, Bytes};
use axum::extract::rejection::BytesRejection;
use axum::extract::{Path, Query, State};
use axum::http::header::CONTENT_TYPE;
use axum::http::{HeaderMap, HeaderValue, Method, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use axum_extra::extract::CookieJar;
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{info, warn};

use crate::auth::{AuthError, Identity, ResolvedCredential};
use crate::proxy::{relay, ForwardArgs, GatewayError, GatewayState, Operation, OutboundBody};

use super::catalog;
use super::session::{expired_cookie, session_cookie};
use super::types::{
    comment_length_ok, CommentUpdate, ContentItem, ContentUpdate, DeleteUserInput, Genre,
    LoggedIn, NewComment, MAX_COMMENT_CHARS,
};

type ApiResult = Result<Response, GatewayError>;

type RawBody = Result<Bytes, BytesRejection>;

pub async fn sign_up(
    State(state): State<Arc<GatewayState>>,
    method: Method,
    headers: HeaderMap,
    jar: CookieJar,
    body: RawBody,
) -> ApiResult {
    open_session(&state, &catalog::SIGN_UP, method, headers, jar, body).await
}

pub async fn login(
    State(state): State<Arc<GatewayState>>,
    method: Method,
    headers: HeaderMap,
    jar: CookieJar,
    body: RawBody,
) -> ApiResult {
    open_session(&state, &catalog::LOGIN, method, headers, jar, body).await
}

/// Forwards credentials to the user service and, on success, issues a token
/// for the returned user, caches it and sets the session cookie.
async fn open_session(
    state: &GatewayState,
    op: &Operation,
    method: Method,
    headers: HeaderMap,
    jar: CookieJar,
    body: RawBody,
) -> ApiResult {
    let bytes = read_body(body, state.config.max_body_size_bytes)?;
    let content_type = headers
        .get(CONTENT_TYPE)
        .cloned()
        .unwrap_or_else(|| HeaderValue::from_static("application/json"));

    let args = ForwardArgs::new(&method, &headers).body(OutboundBody::Buffered {
        bytes,
        content_type: Some(content_type),
    });

    let response = state.send(op, args).await?;
    if !response.status().is_success() {
        return Ok(relay(response));
    }

    let identity: Identity = decode_upstream(op, response).await?;
    let issued = state
        .resolver
        .codec()
        .issue(&identity)
        .map_err(|e| GatewayError::internal(op.name, e))?;

    let identity = Arc::new(identity);
    state.resolver.remember(&issued, Arc::clone(&identity));

    info!(operation = op.name, user_id = %identity.id, "Session opened");

    let jar = jar.add(session_cookie(&state.config, issued.token.clone()));
    Ok((jar, Json(LoggedIn::new(&identity, issued.token))).into_response())
}

pub async fn logout(
    State(state): State<Arc<GatewayState>>,
    headers: HeaderMap,
    jar: CookieJar,
) -> ApiResult {
    let credential = required(state.authenticate(&catalog::LOGOUT, &headers)?)?;

    state.resolver.forget(&credential.token);
    info!(user_id = %credential.identity.id, "Session closed");

    let jar = jar.add(expired_cookie(&state.config));
    Ok((jar, StatusCode::OK).into_response())
}

pub async fn delete_user(
    State(state): State<Arc<GatewayState>>,
    method: Method,
    headers: HeaderMap,
    jar: CookieJar,
    body: RawBody,
) -> ApiResult {
    let op = &catalog::DELETE_USER;
    let credential = required(state.authenticate(op, &headers)?)?;
    let caller = credential.identity.as_ref();

    let bytes = read_body(body, state.config.max_body_size_bytes)?;
    let input: DeleteUserInput = parse_json(&bytes, GatewayError::Unprocessable)?;

    if !caller.may_act_for(&input.id) {
        info!(user_id = %caller.id, target_id = %input.id, "Rejected deletion of another user");
        return Err(GatewayError::Forbidden(
            "users may only delete themselves".to_string(),
        ));
    }

    let args = ForwardArgs::new(&method, &headers)
        .caller(Some(caller))
        .param("id", input.id.clone());
    let response = state.send(op, args).await?;

    if !response.status().is_success() || caller.id != input.id {
        return Ok(relay(response));
    }

    state.resolver.forget(&credential.token);
    info!(user_id = %caller.id, "User deleted themselves, session closed");

    let jar = jar.add(expired_cookie(&state.config));
    Ok((jar, relay(response)).into_response())
}

pub async fn get_user(
    State(state): State<Arc<GatewayState>>,
    method: Method,
    headers: HeaderMap,
) -> ApiResult {
    let op = &catalog::GET_USER;
    let credential = required(state.authenticate(op, &headers)?)?;
    let caller = credential.identity.as_ref();

    let args = ForwardArgs::new(&method, &headers)
        .caller(Some(caller))
        .param("id", caller.id.clone());
    state.forward(op, args).await
}

pub async fn list_content(
    State(state): State<Arc<GatewayState>>,
    method: Method,
    headers: HeaderMap,
    Query(query): Query<Vec<(String, String)>>,
) -> ApiResult {
    let op = &catalog::LIST_CONTENT;
    state.authenticate(op, &headers)?;

    for (key, value) in &query {
        if key == "genre" && !value.is_empty() {
            value.parse::<Genre>().map_err(GatewayError::BadRequest)?;
        }
    }

    let args = ForwardArgs::new(&method, &headers).query(query);
    state.forward(op, args).await
}

pub async fn get_content_item(
    State(state): State<Arc<GatewayState>>,
    method: Method,
    headers: HeaderMap,
    Path(raw_id): Path<String>,
) -> ApiResult {
    let op = &catalog::GET_CONTENT_ITEM;
    let id = positive_id(&raw_id, "content")?;
    let credential = state.authenticate(op, &headers)?;

    let args = ForwardArgs::new(&method, &headers)
        .caller(credential.as_ref().map(|c| c.identity.as_ref()))
        .path_id(id.to_string());
    state.forward(op, args).await
}

pub async fn like_content(
    State(state): State<Arc<GatewayState>>,
    method: Method,
    headers: HeaderMap,
    Path(raw_id): Path<String>,
) -> ApiResult {
    let op = &catalog::LIKE_CONTENT;
    let credential = required(state.authenticate(op, &headers)?)?;
    let id = positive_id(&raw_id, "content")?;

    let args = ForwardArgs::new(&method, &headers)
        .caller(Some(credential.identity.as_ref()))
        .path_id(id.to_string());
    state.forward(op, args).await
}

/// The upload body is streamed to the content service as it arrives.
pub async fn add_content(
    State(state): State<Arc<GatewayState>>,
    method: Method,
    headers: HeaderMap,
    body: Body,
) -> ApiResult {
    let op = &catalog::ADD_CONTENT;
    let credential = required(state.authenticate(op, &headers)?)?;

    let args = ForwardArgs::new(&method, &headers)
        .caller(Some(credential.identity.as_ref()))
        .body(OutboundBody::Streamed {
            body,
            content_type: headers.get(CONTENT_TYPE).cloned(),
        });
    state.forward(op, args).await
}

/// Admins may remove any item; everyone else only items they authored, which
/// is checked against the content service before the removal is forwarded.
pub async fn remove_content(
    State(state): State<Arc<GatewayState>>,
    method: Method,
    headers: HeaderMap,
    Path(raw_id): Path<String>,
) -> ApiResult {
    let op = &catalog::REMOVE_CONTENT;
    let credential = required(state.authenticate(op, &headers)?)?;
    let caller = credential.identity.as_ref();
    let id = positive_id(&raw_id, "content")?;

    if !caller.admin {
        let lookup = &catalog::LOOKUP_CONTENT_AUTHOR;
        let args = ForwardArgs::new(&method, &headers)
            .caller(Some(caller))
            .path_id(id.to_string());

        let response = state.send(lookup, args).await?;
        if !response.status().is_success() {
            return Ok(relay(response));
        }

        let item: ContentItem = decode_upstream(lookup, response).await?;
        if !item.is_authored_by(caller) {
            info!(user_id = %caller.id, content_id = id, "Rejected removal by non-author");
            return Err(GatewayError::Forbidden(
                "only the author or an administrator may remove this item".to_string(),
            ));
        }
    }

    let args = ForwardArgs::new(&method, &headers)
        .caller(Some(caller))
        .path_id(id.to_string());
    state.forward(op, args).await
}

pub async fn edit_content(
    State(state): State<Arc<GatewayState>>,
    method: Method,
    headers: HeaderMap,
    Path(raw_id): Path<String>,
    body: RawBody,
) -> ApiResult {
    let op = &catalog::EDIT_CONTENT;
    let credential = required(state.authenticate(op, &headers)?)?;
    let id = positive_id(&raw_id, "content")?;

    let bytes = read_body(body, state.config.max_body_size_bytes)?;
    let update: ContentUpdate = parse_json(&bytes, GatewayError::Unprocessable)?;

    let args = ForwardArgs::new(&method, &headers)
        .caller(Some(credential.identity.as_ref()))
        .path_id(id.to_string())
        .body(to_json_body(op, &update)?);
    state.forward(op, args).await
}

pub async fn get_comment(
    State(state): State<Arc<GatewayState>>,
    method: Method,
    headers: HeaderMap,
    Path(raw_id): Path<String>,
) -> ApiResult {
    let op = &catalog::GET_COMMENT;
    let id = positive_id(&raw_id, "comment")?;
    state.authenticate(op, &headers)?;

    let args = ForwardArgs::new(&method, &headers).path_id(id.to_string());
    state.forward(op, args).await
}

pub async fn new_comment(
    State(state): State<Arc<GatewayState>>,
    method: Method,
    headers: HeaderMap,
    body: RawBody,
) -> ApiResult {
    let op = &catalog::NEW_COMMENT;
    let credential = required(state.authenticate(op, &headers)?)?;

    let bytes = read_body(body, state.config.max_body_size_bytes)?;
    let comment: NewComment = parse_json(&bytes, GatewayError::BadRequest)?;

    if comment.mehm_id < 1 {
        return Err(GatewayError::Unprocessable(format!(
            "mehmId {} does not exist",
            comment.mehm_id
        )));
    }
    if !comment_length_ok(&comment.comment) {
        return Err(GatewayError::Unprocessable(format!(
            "comment must be 1-{} characters",
            MAX_COMMENT_CHARS
        )));
    }

    let args = ForwardArgs::new(&method, &headers)
        .caller(Some(credential.identity.as_ref()))
        .body(to_json_body(op, &comment)?);
    state.forward(op, args).await
}

pub async fn edit_comment(
    State(state): State<Arc<GatewayState>>,
    method: Method,
    headers: HeaderMap,
    body: RawBody,
) -> ApiResult {
    let op = &catalog::EDIT_COMMENT;
    let credential = required(state.authenticate(op, &headers)?)?;

    let bytes = read_body(body, state.config.max_body_size_bytes)?;
    let update: CommentUpdate = parse_json(&bytes, GatewayError::Unprocessable)?;

    if !comment_length_ok(&update.comment) {
        return Err(GatewayError::Unprocessable(format!(
            "comment must be 1-{} characters",
            MAX_COMMENT_CHARS
        )));
    }

    let args = ForwardArgs::new(&method, &headers)
        .caller(Some(credential.identity.as_ref()))
        .body(to_json_body(op, &update)?);
    state.forward(op, args).await
}

pub async fn delete_comment(
    State(state): State<Arc<GatewayState>>,
    method: Method,
    headers: HeaderMap,
    Query(query): Query<Vec<(String, String)>>,
) -> ApiResult {
    let op = &catalog::DELETE_COMMENT;
    let credential = required(state.authenticate(op, &headers)?)?;

    let raw_id = query
        .iter()
        .find(|(key, _)| key == "commentId")
        .map(|(_, value)| value.as_str())
        .unwrap_or_default();
    let id = positive_id(raw_id, "comment")?;

    let args = ForwardArgs::new(&method, &headers)
        .caller(Some(credential.identity.as_ref()))
        .param("commentId", id.to_string());
    state.forward(op, args).await
}

pub async fn health_check() -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": "healthy",
        "service": "gateway-http"
    }))
}

pub async fn not_found() -> Response {
    (
        StatusCode::NOT_FOUND,
        Json(serde_json::json!({
            "error": "NOT_FOUND",
            "message": "route not found"
        })),
    )
        .into_response()
}

/// `authenticate` only yields `None` for non-required operations.
fn required(credential: Option<ResolvedCredential>) -> Result<ResolvedCredential, GatewayError> {
    credential.ok_or(GatewayError::Auth(AuthError::NoCredential))
}

fn positive_id(raw: &str, kind: &str) -> Result<i64, GatewayError> {
    match raw.trim().parse::<i64>() {
        Ok(id) if id >= 1 => Ok(id),
        _ => Err(GatewayError::BadRequest(format!("invalid {} id {:?}", kind, raw))),
    }
}

fn read_body(body: RawBody, limit: usize) -> Result<Bytes, GatewayError> {
    body.map_err(|rejection| {
        if rejection.status() == StatusCode::PAYLOAD_TOO_LARGE {
            GatewayError::BodyTooLarge { limit }
        } else {
            GatewayError::BadRequest(rejection.body_text())
        }
    })
}

fn parse_json<T: DeserializeOwned>(
    bytes: &[u8],
    reject: fn(String) -> GatewayError,
) -> Result<T, GatewayError> {
    serde_json::from_slice(bytes).map_err(|e| reject(format!("invalid request body: {}", e)))
}

fn to_json_body<T: Serialize>(op: &Operation, value: &T) -> Result<OutboundBody, GatewayError> {
    serde_json::to_vec(value)
        .map(OutboundBody::json)
        .map_err(|e| GatewayError::internal(op.name, e))
}

async fn decode_upstream<T: DeserializeOwned>(
    op: &Operation,
    response: reqwest::Response,
) -> Result<T, GatewayError> {
    let bytes = response
        .bytes()
        .await
        .map_err(|e| GatewayError::InvalidUpstreamResponse(e.to_string()))?;

    serde_json::from_slice(&bytes).map_err(|e| {
        warn!(operation = op.name, error = %e, "Undecodable upstream body");
        GatewayError::InvalidUpstreamResponse(e.to_string())
    })
}
