use super::upstream::{relay, OutboundBody, OutboundRequest, Upstream, REQUEST_ID_HEADER};
use super::{GatewayError, GatewayState};
use crate::auth::{Identity, ResolvedCredential};
use axum::response::Response;
use http::{HeaderMap, HeaderValue, Method};
use tracing::{info, warn};

/// Query keys that only the gateway may set; client-supplied values are dropped.
pub const RESERVED_QUERY_KEYS: &[&str] = &["userId", "isAdmin"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthRequirement {
    /// No credential is looked at.
    Public,
    /// A valid credential is used when present; anything else is anonymous.
    Optional,
    /// Missing or invalid credentials are rejected with 401.
    Required,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Access {
    Anyone,
    Admin,
}

/// Which caller-derived query parameters are appended upstream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IdentityParams {
    None,
    UserId,
    UserIdAndAdmin,
}

/// Describes one gateway operation: how it authenticates and which upstream
/// call it turns into.
#[derive(Debug, Clone)]
pub struct Operation {
    pub name: &'static str,
    pub upstream: Upstream,
    /// `None` copies the inbound method.
    pub method: Option<Method>,
    /// Upstream path; `{id}` is replaced by the path parameter.
    pub path: &'static str,
    pub auth: AuthRequirement,
    pub access: Access,
    pub identity_params: IdentityParams,
}

impl Operation {
    pub fn render_path(&self, id: Option<&str>) -> String {
        match id {
            Some(id) => self.path.replace("{id}", id),
            None => self.path.to_string(),
        }
    }
}

/// Everything a handler contributes to an outbound call.
pub struct ForwardArgs<'a> {
    pub inbound_method: Method,
    pub request_id: Option<HeaderValue>,
    pub caller: Option<&'a Identity>,
    pub path_id: Option<String>,
    pub query: Vec<(String, String)>,
    pub body: OutboundBody,
}

impl<'a> ForwardArgs<'a> {
    pub fn new(inbound_method: &Method, headers: &HeaderMap) -> Self {
        Self {
            inbound_method: inbound_method.clone(),
            request_id: headers.get(REQUEST_ID_HEADER).cloned(),
            caller: None,
            path_id: None,
            query: Vec::new(),
            body: OutboundBody::Empty,
        }
    }

    pub fn caller(mut self, caller: Option<&'a Identity>) -> Self {
        self.caller = caller;
        self
    }

    pub fn path_id(mut self, id: impl Into<String>) -> Self {
        self.path_id = Some(id.into());
        self
    }

    pub fn query(mut self, pairs: Vec<(String, String)>) -> Self {
        self.query.extend(pairs);
        self
    }

    pub fn param(mut self, key: &str, value: impl Into<String>) -> Self {
        self.query.push((key.to_string(), value.into()));
        self
    }

    pub fn body(mut self, body: OutboundBody) -> Self {
        self.body = body;
        self
    }
}

impl GatewayState {
    /// Applies the operation's authentication and blanket access rule. Nothing
    /// has been sent upstream when this fails.
    pub fn authenticate(
        &self,
        op: &Operation,
        headers: &HeaderMap,
    ) -> Result<Option<ResolvedCredential>, GatewayError> {
        let credential = match op.auth {
            AuthRequirement::Public => None,
            AuthRequirement::Optional => self.resolver.resolve_optional(headers),
            AuthRequirement::Required => {
                let credential = self.resolver.resolve(headers).map_err(|e| {
                    info!(operation = op.name, error = %e, "Rejected unauthenticated request");
                    e
                })?;
                Some(credential)
            }
        };

        if op.access == Access::Admin {
            let is_admin = credential
                .as_ref()
                .map(|c| c.identity.admin)
                .unwrap_or(false);
            if !is_admin {
                info!(operation = op.name, "Rejected non-admin caller");
                return Err(GatewayError::Forbidden(
                    "administrator privileges required".to_string(),
                ));
            }
        }

        Ok(credential)
    }

    /// Builds and executes the outbound request for `op`, returning the raw
    /// upstream response whatever its status.
    pub async fn send(
        &self,
        op: &Operation,
        args: ForwardArgs<'_>,
    ) -> Result<reqwest::Response, GatewayError> {
        let ForwardArgs {
            inbound_method,
            request_id,
            caller,
            path_id,
            query,
            body,
        } = args;

        let mut query: Vec<(String, String)> = query
            .into_iter()
            .filter(|(key, _)| !RESERVED_QUERY_KEYS.contains(&key.as_str()))
            .collect();
        query.extend(identity_query(op.identity_params, caller));

        let request = OutboundRequest {
            method: op.method.clone().unwrap_or(inbound_method),
            upstream: op.upstream,
            path: op.render_path(path_id.as_deref()),
            query,
            body,
            request_id,
        };

        let start = std::time::Instant::now();
        let response = self.upstream_client.send(request).await?;
        let status = response.status();

        if status.is_success() {
            info!(
                operation = op.name,
                status = status.as_u16(),
                latency_ms = start.elapsed().as_millis(),
                "Operation forwarded"
            );
        } else {
            warn!(
                operation = op.name,
                status = status.as_u16(),
                latency_ms = start.elapsed().as_millis(),
                "Upstream returned an error status, relaying it"
            );
        }

        Ok(response)
    }

    /// [`send`](Self::send) followed by relaying the upstream response.
    pub async fn forward(
        &self,
        op: &Operation,
        args: ForwardArgs<'_>,
    ) -> Result<Response, GatewayError> {
        let response = self.send(op, args).await?;
        Ok(relay(response))
    }
}

fn identity_query(params: IdentityParams, caller: Option<&Identity>) -> Vec<(String, String)> {
    let Some(caller) = caller else {
        return Vec::new();
    };

    match params {
        IdentityParams::None => Vec::new(),
        IdentityParams::UserId => vec![("userId".to_string(), caller.id.clone())],
        IdentityParams::UserIdAndAdmin => vec![
            ("userId".to_string(), caller.id.clone()),
            ("isAdmin".to_string(), caller.admin.to_string()),
        ],
    }
}
