use crate::api::create_router;
use crate::auth::start_sweeper;
use crate::config::GatewayConfig;
use crate::proxy::GatewayState;
use anyhow::{Context, Result};
use axum::Router;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::info;

pub struct GatewayServer {
    state: Arc<GatewayState>,
}

impl GatewayServer {
    /// Create a new gateway server
    pub fn new(config: GatewayConfig) -> Result<Self> {
        let state = GatewayState::new(config).context("Failed to build gateway state")?;
        Ok(Self::from_state(state))
    }

    pub fn from_state(state: GatewayState) -> Self {
        Self {
            state: Arc::new(state),
        }
    }

    pub fn state(&self) -> &Arc<GatewayState> {
        &self.state
    }

    pub fn router(&self) -> Router {
        create_router(Arc::clone(&self.state))
    }

    /// Run the gateway until the listener fails
    pub async fn run(self) -> Result<()> {
        let addr: SocketAddr = self
            .state
            .config
            .listen_addr()
            .parse()
            .context("Invalid listen address")?;

        let listener = TcpListener::bind(&addr)
            .await
            .context(format!("Failed to bind to {}", addr))?;

        self.serve(listener).await
    }

    /// Serve on an already bound listener.
    pub async fn serve(self, listener: TcpListener) -> Result<()> {
        let addr = listener.local_addr().context("Listener has no local address")?;

        let sweeper = start_sweeper(
            Arc::clone(&self.state.identity_cache),
            self.state.config.cache_sweep_interval(),
        );

        info!(
            "Gateway listening on {} (users: {}, content: {})",
            addr, self.state.config.users_url, self.state.config.content_url
        );

        let result = axum::serve(listener, self.router())
            .await
            .context("Gateway server error");

        sweeper.abort();
        result
    }
}
