//! Session ticker background task

use std::{sync::Arc, time::Duration};
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tracing::{debug, info};

use crate::state::machine::TickOutcome;
use crate::state::AppState;

/// Spawn a tick source bound to one session. The token identifies the
/// session; once the machine moves on, ticks carrying this token become
/// stale and the task shuts itself down.
pub fn spawn_ticker(state: Arc<AppState>, token: u64) -> JoinHandle<()> {
    tokio::spawn(session_ticker_task(state, token))
}

/// Background task that advances the running session once per second
pub async fn session_ticker_task(state: Arc<AppState>, token: u64) {
    debug!("Starting session ticker (token {})", token);

    let period = Duration::from_secs(1);
    // first tick lands a full second after activation, not immediately
    let mut interval = interval_at(Instant::now() + period, period);
    // missed ticks are dropped, never replayed in a burst; recovery
    // re-anchors from the persisted snapshot instead
    interval.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        interval.tick().await;

        match state.run_tick(token).await {
            TickOutcome::Ticked(_) => {}
            TickOutcome::Completed { .. } => {
                info!("Session ticker finished: count-down completed");
                break;
            }
            TickOutcome::Stale => {
                debug!("Session ticker superseded (token {}), shutting down", token);
                break;
            }
        }
    }
}
