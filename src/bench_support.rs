use mehm_gateway_http::auth::{
    Clock, Identity, IdentityCache, MemoryIdentityCache, SystemClock, TokenCodec,
};
use mehm_gateway_http::config::JwtAlgorithm;
use rand::Rng;
use std::sync::Arc;

// Re-export the gateway crate for benches
pub use mehm_gateway_http;

/// A codec plus a warm identity cache holding `user_count` issued tokens.
pub struct AuthBenchFixture {
    pub codec: Arc<TokenCodec>,
    pub cache: Arc<MemoryIdentityCache>,
    pub tokens: Vec<String>,
}

impl AuthBenchFixture {
    pub fn new(user_count: usize) -> Self {
        let clock: Arc<dyn Clock> = Arc::new(SystemClock);
        let codec = Arc::new(TokenCodec::new(
            "bench-secret",
            JwtAlgorithm::HS256,
            chrono::Duration::hours(2),
            Arc::clone(&clock),
        ));
        let cache = Arc::new(MemoryIdentityCache::new(clock));

        let tokens = (0..user_count.max(1))
            .map(|n| {
                let identity = Identity::new(
                    n.to_string(),
                    format!("user-{n}"),
                    format!("user-{n}@bench.local"),
                );
                let issued = codec.issue(&identity).expect("issue bench token");
                cache.put(&issued.token, Arc::new(identity), issued.expires_at);
                issued.token
            })
            .collect();

        Self {
            codec,
            cache,
            tokens,
        }
    }

    pub fn random_token(&self) -> &str {
        let index = rand::thread_rng().gen_range(0..self.tokens.len());
        &self.tokens[index]
    }
}
