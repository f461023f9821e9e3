use super::{AuthError, IdentityCache, IssuedToken, TokenCodec, AUTHORIZATION_HEADER, BEARER_PREFIX};
use super::Identity;
use crate::config::{CredentialSource, GatewayConfig};
use axum_extra::extract::CookieJar;
use http::HeaderMap;
use std::sync::Arc;
use tracing::{debug, warn};

/// A credential that was located on a request and resolved to an identity.
#[derive(Debug, Clone)]
pub struct ResolvedCredential {
    pub token: String,
    pub identity: Arc<Identity>,
}

/// Turns the credential on an inbound request into an [`Identity`], consulting
/// the identity cache before falling back to token verification.
pub struct AuthResolver {
    codec: Arc<TokenCodec>,
    cache: Arc<dyn IdentityCache>,
    source: CredentialSource,
    cookie_name: String,
}

impl AuthResolver {
    pub fn new(
        codec: Arc<TokenCodec>,
        cache: Arc<dyn IdentityCache>,
        source: CredentialSource,
        cookie_name: impl Into<String>,
    ) -> Self {
        Self {
            codec,
            cache,
            source,
            cookie_name: cookie_name.into(),
        }
    }

    pub fn from_config(
        config: &GatewayConfig,
        codec: Arc<TokenCodec>,
        cache: Arc<dyn IdentityCache>,
    ) -> Self {
        Self::new(codec, cache, config.credential_source, config.cookie_name.clone())
    }

    pub fn codec(&self) -> &TokenCodec {
        &self.codec
    }

    pub fn cookie_name(&self) -> &str {
        &self.cookie_name
    }

    /// Locates the raw token. With [`CredentialSource::Either`] the cookie wins
    /// over the `Authorization` header.
    pub fn extract_credential(&self, headers: &HeaderMap) -> Option<String> {
        match self.source {
            CredentialSource::Cookie => self.cookie_token(headers),
            CredentialSource::Bearer => bearer_token(headers),
            CredentialSource::Either => self
                .cookie_token(headers)
                .or_else(|| bearer_token(headers)),
        }
    }

    pub fn resolve(&self, headers: &HeaderMap) -> Result<ResolvedCredential, AuthError> {
        let token = self
            .extract_credential(headers)
            .ok_or(AuthError::NoCredential)?;

        if let Some(identity) = self.cache.get(&token) {
            debug!(user_id = %identity.id, "Identity served from cache");
            return Ok(ResolvedCredential { token, identity });
        }

        let verified = self.codec.verify(&token).map_err(|e| {
            warn!(error = %e, "Token verification failed");
            AuthError::Unauthenticated(e)
        })?;

        let identity = Arc::new(verified.identity);
        self.cache
            .put(&token, Arc::clone(&identity), verified.expires_at);

        debug!(user_id = %identity.id, "Token verified and cached");
        Ok(ResolvedCredential { token, identity })
    }

    /// Soft authentication: any failure means "anonymous".
    pub fn resolve_optional(&self, headers: &HeaderMap) -> Option<ResolvedCredential> {
        match self.resolve(headers) {
            Ok(resolved) => Some(resolved),
            Err(AuthError::NoCredential) => None,
            Err(e) => {
                debug!(error = %e, "Ignoring invalid credential on public route");
                None
            }
        }
    }

    /// Seeds the cache with a token the gateway has just issued.
    pub fn remember(&self, issued: &IssuedToken, identity: Arc<Identity>) {
        self.cache.put(&issued.token, identity, issued.expires_at);
    }

    pub fn forget(&self, token: &str) {
        self.cache.clear(token);
    }

    fn cookie_token(&self, headers: &HeaderMap) -> Option<String> {
        CookieJar::from_headers(headers)
            .get(&self.cookie_name)
            .map(|cookie| cookie.value().trim().to_string())
            .filter(|token| !token.is_empty())
    }
}

fn bearer_token(headers: &HeaderMap) -> Option<String> {
    let value = headers.get(AUTHORIZATION_HEADER)?.to_str().ok()?;
    let token = value.strip_prefix(BEARER_PREFIX)?.trim();

    if token.is_empty() {
        None
    } else {
        Some(token.to_string())
    }
}
