//! auth-svc
//!
//! Serves `/healthz` and `/db/ping` on `0.0.0.0:$PORT`.

use std::net::SocketAddr;
use std::sync::Arc;

use integrations_vault_database::{router, AppState, Bootstrap, LoggingConfig, ServiceConfig};
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;

#[tokio::main]
async fn main() {
    if let Err(e) = LoggingConfig::from_env().init() {
        eprintln!("failed to initialize logging: {}", e);
    }

    let config = match ServiceConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            tracing::error!(error = %e, "invalid configuration");
            std::process::exit(1);
        }
    };

    if let Err(e) = run(config).await {
        tracing::error!(error = %e, "auth-svc terminated");
        std::process::exit(1);
    }
}

async fn run(config: ServiceConfig) -> Result<(), Box<dyn std::error::Error>> {
    tracing::info!(
        vault = %config.vault.address,
        db_host = %config.database.host,
        db_port = config.database.port,
        db_name = %config.database.database,
        db_tls = config.database.tls_enabled,
        "configuration loaded"
    );

    let bootstrap = Arc::new(Bootstrap::from_config(&config)?);
    let shutdown = CancellationToken::new();
    let app = router(AppState {
        bootstrap,
        shutdown: shutdown.clone(),
        request_deadline: config.bootstrap_timeout,
    });

    let addr = SocketAddr::from(([0, 0, 0, 0], config.listen_port));
    let listener = TcpListener::bind(addr).await?;
    tracing::info!(address = %listener.local_addr()?, "auth-svc listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::warn!(error = %e, "failed to listen for shutdown signal");
                std::future::pending::<()>().await;
            }
            tracing::info!("shutting down");
            shutdown.cancel();
        })
        .await?;

    tracing::info!("shutdown complete");
    Ok(())
}
