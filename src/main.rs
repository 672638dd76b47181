use tokio::signal;
use tracing::{error, info, warn};

use rippletide_gateway::config::GatewayConfig;
use rippletide_gateway::routes;
use rippletide_gateway::service::relay_service::RelayService;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present (development convenience)
    dotenvy::dotenv().ok();

    // Initialise tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "rippletide_gateway=debug,tower_http=info".into()),
        )
        .init();
    rippletide_gateway::middleware::install_panic_hook();

    // ── Configuration ─────────────────────────────────────────────────────────
    let config = GatewayConfig::from_env()?;
    match config.credentials.credentials() {
        Ok(creds) => info!("Relaying to {} as agent {}", config.base_url, creds.agent_id),
        Err(e) => warn!("{e}; every request will be rejected until it is set"),
    }

    // ── Router ────────────────────────────────────────────────────────────────
    let service = RelayService::from_config(&config)?;
    let app = routes::router(service);

    // ── Listen ────────────────────────────────────────────────────────────────
    let addr = config.bind_addr();
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!("Listening on http://{addr}/");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to install Ctrl+C handler: {e}");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                error!("Failed to install SIGTERM handler: {e}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received Ctrl+C, shutting down"),
        _ = terminate => info!("Received terminate signal, shutting down"),
    }
}
