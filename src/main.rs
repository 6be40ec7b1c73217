//! Punchclock - A state-managed timer service for topic time tracking
//!
//! This is the main entry point for the punchclock application.

use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::info;

use punchclock::{
    config::Config,
    services::{CommandNotifier, FileSnapshotStore, HttpTimeEntrySink},
    state::{AppState, RestoreOutcome, TimerMachine},
    api::create_router,
    utils::shutdown_signal,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::parse();

    // Initialize tracing with appropriate log level
    tracing_subscriber::fmt()
        .with_env_filter(format!("punchclock={},tower_http=info", config.log_level()))
        .init();

    info!("Starting punchclock server v{}", env!("CARGO_PKG_VERSION"));
    info!(
        "Configuration: host={}, port={}, entries_url={}",
        config.host, config.port, config.entries_url
    );

    let snapshot_file = config.snapshot_file();
    info!("Timer snapshots at {}", snapshot_file.display());

    // Wire the machine to its store and sinks
    let store = Arc::new(FileSnapshotStore::new(snapshot_file));
    let entries = Arc::new(HttpTimeEntrySink::from_env(config.entries_url.clone()));
    let notifier = Arc::new(CommandNotifier::new(
        config.on_start_cmd.clone(),
        config.on_complete_cmd.clone(),
    ));
    let machine = TimerMachine::new(store, entries, notifier);

    // Create application state
    let state = Arc::new(AppState::new(machine, config.port, config.host.clone()));

    // Recover any session persisted by a previous run
    match state.clone().restore_session().await {
        RestoreOutcome::Idle => info!("No previous session to restore"),
        RestoreOutcome::Running(activation) => {
            info!("Restored running session at {}", activation.view.display)
        }
        RestoreOutcome::Paused(view) => info!("Restored paused session at {}", view.display),
        RestoreOutcome::Completed { .. } => {
            info!("Previous count-down finished while the server was down")
        }
    }

    // Create HTTP router with all endpoints
    let app = create_router(state);

    // Bind to the specified address
    let addr = config.address();
    let listener = TcpListener::bind(&addr).await?;

    info!("Server running on http://{}", addr);
    info!("Endpoints:");
    info!("  POST /start  - Begin a tracking session");
    info!("  POST /pause  - Freeze the running session");
    info!("  POST /resume - Continue a paused session");
    info!("  POST /stop   - Finish the session and submit its time entry");
    info!("  POST /reset  - Drop the session without submitting");
    info!("  GET  /status - Check current timer and server status");
    info!("  GET  /health - Health check");

    // Setup graceful shutdown
    let server = axum::serve(listener, app);

    tokio::select! {
        result = server => {
            if let Err(e) = result {
                tracing::error!("Server error: {}", e);
            }
        }
        _ = shutdown_signal() => {
            info!("Shutdown signal received");
        }
    }

    info!("Server shutdown complete");
    Ok(())
}
