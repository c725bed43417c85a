//! OS signal handling.
//!
//! SIGINT and SIGTERM run the registered shutdown hooks. A second signal
//! during shutdown is not handled specially.

use std::sync::Arc;
use tokio::task::JoinHandle;

use crate::lifecycle::hooks::ShutdownHooks;

/// Spawn a task that runs `hooks` once the process receives SIGINT or SIGTERM.
pub fn install_signal_handler(hooks: Arc<ShutdownHooks>) -> JoinHandle<()> {
    tokio::spawn(async move {
        wait_for_termination().await;
        hooks.run_all().await;
    })
}

#[cfg(unix)]
async fn wait_for_termination() {
    use tokio::signal::unix::{signal, SignalKind};

    let mut sigterm = match signal(SignalKind::terminate()) {
        Ok(sigterm) => sigterm,
        Err(e) => {
            tracing::error!(error = %e, "Failed to install SIGTERM handler, listening for Ctrl+C only");
            wait_for_ctrl_c().await;
            return;
        }
    };

    tokio::select! {
        _ = sigterm.recv() => {
            tracing::info!("Received SIGTERM, initiating shutdown");
        }
        _ = wait_for_ctrl_c() => {}
    }
}

#[cfg(not(unix))]
async fn wait_for_termination() {
    wait_for_ctrl_c().await;
}

async fn wait_for_ctrl_c() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => tracing::info!("Received SIGINT, initiating shutdown"),
        Err(e) => {
            tracing::error!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    }
}
