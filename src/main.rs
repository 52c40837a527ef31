//! Application entry point.

use std::sync::Arc;

use anyhow::{Context, Result};
use dotenvy::dotenv;
use tokio::signal;
use tracing::info;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

use nft_role_reconciler::app::{ReconciliationService, spawn_worker};
use nft_role_reconciler::config::Config;
use nft_role_reconciler::infra::{
    EvmOwnershipReader, HttpRecordSource, RpcClientConfig, WebhookRoleRevoker,
};

fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer())
        .init();
}

async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received Ctrl+C"),
        _ = terminate => info!("Received SIGTERM"),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenv().ok();
    init_tracing();

    info!("NFT Role Reconciler v{}", env!("CARGO_PKG_VERSION"));

    let config = Config::from_env().context("Invalid configuration")?;

    info!("Initializing clients...");

    let source = HttpRecordSource::new(config.database_url, config.http_timeout)
        .context("Failed to create record source client")?;
    info!("   ✓ Record source: {}", source.display_host());

    let reader = EvmOwnershipReader::new(RpcClientConfig {
        timeout: config.http_timeout,
    })
    .context("Failed to create RPC client")?;
    for (network, binding) in config.bindings.iter() {
        info!(
            "   ✓ {}: {} (contract {})",
            network,
            binding.display_host(),
            binding.contract_address
        );
    }

    let revoker = WebhookRoleRevoker::new(config.bot_url.clone(), config.http_timeout)
        .context("Failed to create webhook client")?;
    info!("   ✓ Revoke webhook configured");

    let service = Arc::new(ReconciliationService::new(
        Arc::new(source),
        Arc::new(reader),
        Arc::new(revoker),
        config.bindings.clone(),
    ));

    let healthy = service.check_endpoints().await;
    info!(
        "   ✓ {}/{} RPC endpoints reachable",
        healthy,
        service.bindings().len()
    );

    let (worker_handle, shutdown_tx) = spawn_worker(Arc::clone(&service), config.worker.clone());
    info!(
        "🚀 Reconciliation worker started (interval: {}s)",
        config.worker.interval.as_secs()
    );

    shutdown_signal().await;

    // Stops between cycles; a running cycle finishes first
    let _ = shutdown_tx.send(true);
    let cycles = worker_handle.await.context("Worker task panicked")?;

    info!(cycles = cycles, "Shutdown complete");
    Ok(())
}
