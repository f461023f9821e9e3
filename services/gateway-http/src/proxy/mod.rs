mod error;
mod operation;
mod upstream;

pub use error::GatewayError;
pub use operation::{
    Access, AuthRequirement, ForwardArgs, IdentityParams, Operation, RESERVED_QUERY_KEYS,
};
pub use upstream::{relay, OutboundBody, OutboundRequest, Upstream, UpstreamClient, REQUEST_ID_HEADER};

use crate::auth::{AuthResolver, Clock, IdentityCache, MemoryIdentityCache, SystemClock, TokenCodec};
use crate::config::GatewayConfig;
use std::sync::Arc;

/// Shared handles injected into every handler.
#[derive(Clone)]
pub struct GatewayState {
    pub config: Arc<GatewayConfig>,
    pub resolver: Arc<AuthResolver>,
    pub identity_cache: Arc<dyn IdentityCache>,
    pub upstream_client: Arc<UpstreamClient>,
}

impl GatewayState {
    pub fn new(config: GatewayConfig) -> anyhow::Result<Self> {
        let clock: Arc<dyn Clock> = Arc::new(SystemClock);
        let cache = Arc::new(MemoryIdentityCache::new(Arc::clone(&clock)));
        Self::with_cache(config, cache, clock)
    }

    /// Builds the state around a caller-supplied cache, e.g. one a test keeps
    /// a handle to.
    pub fn with_cache(
        config: GatewayConfig,
        identity_cache: Arc<dyn IdentityCache>,
        clock: Arc<dyn Clock>,
    ) -> anyhow::Result<Self> {
        let codec = Arc::new(TokenCodec::from_config(&config, clock));
        let resolver = Arc::new(AuthResolver::from_config(
            &config,
            codec,
            Arc::clone(&identity_cache),
        ));
        let upstream_client = Arc::new(UpstreamClient::new(&config)?);

        Ok(Self {
            config: Arc::new(config),
            resolver,
            identity_cache,
            upstream_client,
        })
    }
}
