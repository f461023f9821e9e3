use anyhow::{Context, Result};
use mehm_gateway_http::config::GatewayConfig;
use mehm_gateway_http::server::GatewayServer;
use tokio::signal;
use tracing::{error, info, warn};
use tracing_subscriber::{fmt, EnvFilter};

#[tokio::main]
async fn main() -> Result<()> {
    let config = GatewayConfig::from_env().context("Failed to load configuration")?;
    init_tracing(&config.log_level);

    if let Err(e) = config.validate() {
        error!("Refusing to start: {:#}", e);
        return Err(e);
    }
    log_gateway_settings(&config);

    let server = GatewayServer::new(config).context("Failed to create gateway server")?;

    tokio::select! {
        result = server.run() => result?,
        _ = shutdown_signal() => info!("Gateway stopping; in-flight forwards are dropped"),
    }

    Ok(())
}

/// Logs the effective settings. The signing secret is never logged.
fn log_gateway_settings(config: &GatewayConfig) {
    info!(
        users = %config.users_url,
        content = %config.content_url,
        timeout_secs = config.request_timeout_secs,
        get_retries = config.upstream_get_retries,
        "Upstreams"
    );
    info!(
        source = ?config.credential_source,
        algorithm = ?config.jwt_algorithm,
        ttl_secs = config.token_ttl_secs,
        cookie = %config.cookie_name,
        secure_cookie = config.cookie_secure,
        "Credentials"
    );
    info!(
        sweep_interval_secs = config.cache_sweep_interval_secs,
        max_body_bytes = config.max_body_size_bytes,
        "Identity cache and body limits"
    );

    if config.cors_allowed_origins.is_empty() {
        info!("CORS disabled");
    } else {
        info!(origins = ?config.cors_allowed_origins, "CORS enabled");
    }
    if !config.cookie_secure && config.cors_allowed_origins.iter().any(|o| o.starts_with("https://")) {
        warn!("HTTPS origins allowed but the credential cookie is not marked Secure");
    }
}

fn init_tracing(log_level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(log_level));

    fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_line_number(true)
        .compact()
        .init();
}

/// Resolves on Ctrl+C or, on unix, SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Ctrl+C handler unavailable: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                error!("SIGTERM handler unavailable: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
