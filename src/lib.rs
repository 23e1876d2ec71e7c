pub mod api;
pub mod config;
pub mod error;
pub mod logging;
pub mod state;

use std::sync::Arc;

use tokio::net::TcpListener;
use zion_sdk::{ElectrumBackend, LwkWallet, SwapEngine, TradeService};

pub use error::{ApiError, Error};
pub use state::AppState;

use config::Config;

/// Open the wallet, serve the API on `config.listen` and return once a
/// shutdown signal arrives.
pub async fn run(config: Config) -> Result<(), Error> {
    let engine_config = config.engine_config()?;
    let electrum_url = config.electrum_url();
    tracing::info!(
        network = %config.network,
        electrum = %electrum_url,
        market = ?engine_config.market,
        "starting market maker"
    );

    let wallet = {
        let mnemonic = config.mnemonic.clone();
        let datadir = config.datadir.clone();
        let network = config.network;
        let url = electrum_url.clone();
        tokio::task::spawn_blocking(move || {
            let wallet = LwkWallet::new(&mnemonic, network, &url, &datadir)?;
            // Queries and proposals refresh the wallet again before reading it.
            if let Err(e) = wallet.sync() {
                tracing::warn!(error = %e, "initial wallet sync failed");
            }
            Ok::<_, zion_sdk::Error>(wallet)
        })
        .await??
    };

    let engine = SwapEngine::new(
        engine_config,
        Arc::new(wallet),
        ElectrumBackend::new(&electrum_url),
    );
    let app = api::router(AppState::new(TradeService::new(engine)));

    let listener = TcpListener::bind(config.listen).await?;
    tracing::info!(addr = %listener.local_addr()?, "listening");
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    tracing::info!("shut down");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "cannot listen for ctrl-c");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "cannot listen for SIGTERM");
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
    tracing::info!("shutdown signal received");
}
