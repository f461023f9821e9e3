use super::GatewayError;
use crate::config::GatewayConfig;
use axum::body::Body;
use axum::response::Response;
use bytes::Bytes;
use http::header::CONTENT_TYPE;
use http::{HeaderValue, Method};
use reqwest::Client;
use std::time::Duration;
use tracing::{debug, info, instrument, warn};
use url::Url;

pub const REQUEST_ID_HEADER: &str = "x-request-id";

const RETRY_BACKOFF: Duration = Duration::from_millis(100);

/// The two fixed upstream services.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Upstream {
    Users,
    Content,
}

pub enum OutboundBody {
    Empty,
    Buffered {
        bytes: Bytes,
        content_type: Option<HeaderValue>,
    },
    Streamed {
        body: Body,
        content_type: Option<HeaderValue>,
    },
}

impl OutboundBody {
    pub fn json(bytes: impl Into<Bytes>) -> Self {
        OutboundBody::Buffered {
            bytes: bytes.into(),
            content_type: Some(HeaderValue::from_static("application/json")),
        }
    }

    fn is_replayable(&self) -> bool {
        !matches!(self, OutboundBody::Streamed { .. })
    }
}

pub struct OutboundRequest {
    pub method: Method,
    pub upstream: Upstream,
    pub path: String,
    pub query: Vec<(String, String)>,
    pub body: OutboundBody,
    pub request_id: Option<HeaderValue>,
}

pub struct UpstreamClient {
    http_client: Client,
    users_base_url: String,
    content_base_url: String,
    get_retries: u32,
}

impl UpstreamClient {
    pub fn new(config: &GatewayConfig) -> anyhow::Result<Self> {
        let http_client = Client::builder()
            .timeout(config.request_timeout())
            .pool_max_idle_per_host(20)
            .build()?;

        Ok(Self {
            http_client,
            users_base_url: config.users_url.trim_end_matches('/').to_string(),
            content_base_url: config.content_url.trim_end_matches('/').to_string(),
            get_retries: config.upstream_get_retries,
        })
    }

    fn base_url(&self, upstream: Upstream) -> &str {
        match upstream {
            Upstream::Users => &self.users_base_url,
            Upstream::Content => &self.content_base_url,
        }
    }

    pub fn url_for(
        &self,
        upstream: Upstream,
        path: &str,
        query: &[(String, String)],
    ) -> Result<Url, GatewayError> {
        let raw = format!("{}{}", self.base_url(upstream), path);
        let mut url = Url::parse(&raw)
            .map_err(|e| GatewayError::internal("build_upstream_url", format!("{raw}: {e}")))?;

        if !query.is_empty() {
            url.query_pairs_mut().extend_pairs(query.iter());
        }

        Ok(url)
    }

    /// Extra attempts allowed after a transport failure. Only GETs with a body
    /// that can be sent again qualify.
    fn retry_budget(&self, method: &Method, body: &OutboundBody) -> u32 {
        if *method == Method::GET && body.is_replayable() {
            self.get_retries
        } else {
            0
        }
    }

    #[instrument(skip_all, fields(upstream = ?req.upstream, method = %req.method, path = %req.path))]
    pub async fn send(&self, req: OutboundRequest) -> Result<reqwest::Response, GatewayError> {
        let url = self.url_for(req.upstream, &req.path, &req.query)?;

        let retries = self.retry_budget(&req.method, &req.body);

        let OutboundRequest {
            method,
            body,
            request_id,
            ..
        } = req;

        // Only replayable bodies are ever retried, so a streamed body is
        // consumed by the single attempt below.
        let (mut streamed, replayable) = match body {
            OutboundBody::Streamed { body, content_type } => (Some((body, content_type)), None),
            other => (None, Some(other)),
        };

        let mut attempt = 0;
        loop {
            let mut builder = self.http_client.request(method.clone(), url.clone());

            if let Some(id) = &request_id {
                builder = builder.header(REQUEST_ID_HEADER, id.clone());
            }

            match (&replayable, streamed.take()) {
                (_, Some((body, content_type))) => {
                    if let Some(ct) = content_type {
                        builder = builder.header(CONTENT_TYPE, ct);
                    }
                    builder = builder.body(reqwest::Body::wrap_stream(body.into_data_stream()));
                }
                (
                    Some(OutboundBody::Buffered {
                        bytes,
                        content_type,
                    }),
                    None,
                ) => {
                    if let Some(ct) = content_type {
                        builder = builder.header(CONTENT_TYPE, ct.clone());
                    }
                    builder = builder.body(bytes.clone());
                }
                _ => {}
            }

            debug!(url = %url, attempt, "Forwarding request to upstream");
            let start = std::time::Instant::now();

            match builder.send().await {
                Ok(response) => {
                    info!(
                        status = response.status().as_u16(),
                        latency_ms = start.elapsed().as_millis(),
                        "Upstream response received"
                    );
                    return Ok(response);
                }
                Err(e) if is_transient(&e) && attempt < retries => {
                    attempt += 1;
                    warn!(error = %e, attempt, "Upstream transport failed, retrying");
                    tokio::time::sleep(RETRY_BACKOFF * attempt).await;
                }
                Err(e) if e.is_timeout() => {
                    warn!(error = %e, "Upstream request timed out");
                    return Err(GatewayError::UpstreamTimeout);
                }
                Err(e) => {
                    warn!(error = %e, "Upstream request failed");
                    return Err(GatewayError::UpstreamUnavailable(e.to_string()));
                }
            }
        }
    }
}

/// Connection failures and connections dropped before a response arrived.
/// Timeouts are final.
fn is_transient(err: &reqwest::Error) -> bool {
    !err.is_timeout() && (err.is_connect() || err.is_request())
}

/// Streams an upstream response back to the caller: status, `Content-Type` and
/// body are passed through untouched, whatever the status.
pub fn relay(upstream: reqwest::Response) -> Response {
    let status = upstream.status();
    let content_type = upstream.headers().get(CONTENT_TYPE).cloned();

    let mut response = Response::new(Body::from_stream(upstream.bytes_stream()));
    *response.status_mut() = status;
    if let Some(ct) = content_type {
        response.headers_mut().insert(CONTENT_TYPE, ct);
    }

    response
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client() -> UpstreamClient {
        let config = GatewayConfig {
            users_url: "http://users.local/".to_string(),
            content_url: "http://content.local:9000".to_string(),
            secret_key: "secret".to_string(),
            ..GatewayConfig::default()
        };
        UpstreamClient::new(&config).unwrap()
    }

    #[test]
    fn urls_join_base_path_and_encoded_query() {
        let client = client();

        let url = client.url_for(Upstream::Users, "/resolve", &[]).unwrap();
        assert_eq!(url.as_str(), "http://users.local/resolve");

        let url = client
            .url_for(
                Upstream::Content,
                "/list",
                &[
                    ("genre".to_string(), "DHBW".to_string()),
                    ("q".to_string(), "a&b c".to_string()),
                ],
            )
            .unwrap();
        assert_eq!(url.as_str(), "http://content.local:9000/list?genre=DHBW&q=a%26b+c");
    }

    #[test]
    fn only_gets_with_replayable_bodies_are_retried() {
        let client = client();
        assert_eq!(client.retry_budget(&Method::GET, &OutboundBody::Empty), 1);
        assert_eq!(client.retry_budget(&Method::GET, &OutboundBody::json("{}")), 1);
        assert_eq!(client.retry_budget(&Method::POST, &OutboundBody::Empty), 0);
        assert_eq!(client.retry_budget(&Method::DELETE, &OutboundBody::Empty), 0);
        assert_eq!(
            client.retry_budget(
                &Method::GET,
                &OutboundBody::Streamed {
                    body: Body::empty(),
                    content_type: None
                }
            ),
            0
        );
    }

    #[test]
    fn only_buffered_bodies_are_replayable() {
        assert!(OutboundBody::Empty.is_replayable());
        assert!(OutboundBody::json("{}").is_replayable());
        assert!(!OutboundBody::Streamed {
            body: Body::empty(),
            content_type: None
        }
        .is_replayable());
    }
}
