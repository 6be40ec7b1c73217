//! Signal handling for graceful shutdown

use signal_hook_tokio::Signals;
use futures::stream::StreamExt;
use tracing::info;

/// Wait for shutdown signals (SIGTERM, SIGINT)
///
/// The running snapshot is already on disk at this point (it is rewritten
/// on every tick), so shutdown needs no extra persistence step.
pub async fn shutdown_signal() {
    let mut signals = Signals::new(&[
        signal_hook::consts::SIGTERM,
        signal_hook::consts::SIGINT,
    ]).expect("Failed to create signal handler");

    while let Some(signal) = signals.next().await {
        info!("Received signal {}, shutting down", signal);
        break;
    }
}
