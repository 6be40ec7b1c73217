//! Main application state management

use std::{
    sync::{Arc, Mutex},
    time::Instant,
};

use chrono::{DateTime, Utc};
use tokio::sync::{watch, Mutex as AsyncMutex};
use tokio::task::JoinHandle;
use tracing::warn;

use crate::error::TimerError;
use crate::state::machine::{Finished, RestoreOutcome, TickOutcome, TimerMachine};
use crate::state::session::{StartPolicy, StartRequest, TimerView};
use crate::tasks;

/// Main application state: the timer machine plus everything the HTTP
/// surface reports.
///
/// The machine sits behind an async mutex and every command runs under it,
/// so transitions are strictly serialized. The ticker slot holds the handle
/// of the one live tick source and is only swapped while the machine lock
/// is held, which keeps the stored handle and the machine's session token
/// in step.
pub struct AppState {
    /// The consolidated timer state machine
    machine: AsyncMutex<TimerMachine>,
    /// Handle of the currently armed tick source, if any
    ticker: Mutex<Option<JoinHandle<()>>>,
    /// Server metadata
    pub start_time: Instant,
    pub port: u16,
    pub host: String,
    /// Errors surfaced to clients via the status endpoint
    errors: Mutex<Vec<String>>,
    /// Last action tracking
    last_action: Mutex<Option<String>>,
    last_action_time: Mutex<Option<DateTime<Utc>>>,
    /// Channel for timer view updates
    timer_update_tx: watch::Sender<TimerView>,
    /// Keep the receiver alive to prevent channel closure
    _timer_update_rx: watch::Receiver<TimerView>,
}

impl AppState {
    /// Create a new AppState around a machine
    pub fn new(machine: TimerMachine, port: u16, host: String) -> Self {
        let (timer_update_tx, timer_update_rx) = watch::channel(TimerView::idle());

        Self {
            machine: AsyncMutex::new(machine),
            ticker: Mutex::new(None),
            start_time: Instant::now(),
            port,
            host,
            errors: Mutex::new(Vec::new()),
            last_action: Mutex::new(None),
            last_action_time: Mutex::new(None),
            timer_update_tx,
            _timer_update_rx: timer_update_rx,
        }
    }

    /// Begin a new tracking session and arm a tick source for it.
    pub async fn start_session(
        self: Arc<Self>,
        req: StartRequest,
        policy: StartPolicy,
    ) -> Result<TimerView, TimerError> {
        let mut machine = self.machine.lock().await;
        let activation = machine.start(req, policy, Utc::now()).await?;
        Self::arm_ticker(&self, activation.token);
        drop(machine);

        self.clear_errors();
        if let Some(e) = activation.prior_submission_error {
            self.add_error(format!("Prior session's time entry failed: {}", e));
        }
        self.publish(activation.view.clone());
        self.set_last_action("start");
        Ok(activation.view)
    }

    /// Freeze the running session and cancel its tick source.
    pub async fn pause_session(&self) -> Result<TimerView, TimerError> {
        let mut machine = self.machine.lock().await;
        let view = machine.pause(Utc::now())?;
        self.disarm_ticker();
        drop(machine);

        self.publish(view.clone());
        self.set_last_action("pause");
        Ok(view)
    }

    /// Continue a paused session under a fresh tick source.
    pub async fn resume_session(self: Arc<Self>) -> Result<TimerView, TimerError> {
        let mut machine = self.machine.lock().await;
        let activation = machine.resume(Utc::now())?;
        Self::arm_ticker(&self, activation.token);
        drop(machine);

        self.publish(activation.view.clone());
        self.set_last_action("resume");
        Ok(activation.view)
    }

    /// Finish the session, submitting its time entry.
    pub async fn stop_session(&self) -> Result<Finished, TimerError> {
        let mut machine = self.machine.lock().await;
        let finished = machine.stop(Utc::now()).await?;
        self.disarm_ticker();
        drop(machine);

        if let Some(e) = &finished.submission_error {
            self.add_error(format!("Time entry submission failed: {}", e));
        }
        self.publish(finished.view.clone());
        self.set_last_action("stop");
        Ok(finished)
    }

    /// Drop the session without submitting anything.
    pub async fn reset_session(&self) -> TimerView {
        let mut machine = self.machine.lock().await;
        let view = machine.reset();
        self.disarm_ticker();
        drop(machine);

        self.publish(view.clone());
        self.set_last_action("reset");
        view
    }

    /// Recover a persisted session at startup, re-arming the tick source
    /// when it comes back running.
    pub async fn restore_session(self: Arc<Self>) -> RestoreOutcome {
        let mut machine = self.machine.lock().await;
        let outcome = machine.restore(Utc::now()).await;
        if let RestoreOutcome::Running(activation) = &outcome {
            Self::arm_ticker(&self, activation.token);
        }
        drop(machine);

        match &outcome {
            RestoreOutcome::Idle => {}
            RestoreOutcome::Running(activation) => self.publish(activation.view.clone()),
            RestoreOutcome::Paused(view) => self.publish(view.clone()),
            RestoreOutcome::Completed {
                view,
                submission_error,
            } => {
                if let Some(e) = submission_error {
                    self.add_error(format!("Time entry submission failed: {}", e));
                }
                self.publish(view.clone());
            }
        }
        outcome
    }

    /// Advance the machine by one second on behalf of a tick source.
    pub async fn run_tick(&self, token: u64) -> TickOutcome {
        let mut machine = self.machine.lock().await;
        let outcome = machine.tick(token, Utc::now()).await;
        drop(machine);

        match &outcome {
            TickOutcome::Ticked(view) => self.publish(view.clone()),
            TickOutcome::Completed {
                view,
                submission_error,
            } => {
                if let Some(e) = submission_error {
                    self.add_error(format!("Time entry submission failed: {}", e));
                }
                self.publish(view.clone());
                self.set_last_action("complete");
            }
            TickOutcome::Stale => {}
        }
        outcome
    }

    /// Get the current timer view
    pub async fn get_timer_view(&self) -> TimerView {
        self.machine.lock().await.view()
    }

    /// Subscribe to timer view updates (one message per transition or tick)
    pub fn subscribe_timer(&self) -> watch::Receiver<TimerView> {
        self.timer_update_tx.subscribe()
    }

    /// Add an error for client visibility
    pub fn add_error(&self, error: String) {
        warn!("Adding error to state: {}", error);
        if let Ok(mut errors) = self.errors.lock() {
            errors.push(error);
        }
    }

    /// Get current errors
    pub fn get_errors(&self) -> Vec<String> {
        self.errors
            .lock()
            .map(|errors| errors.clone())
            .unwrap_or_default()
    }

    fn clear_errors(&self) {
        if let Ok(mut errors) = self.errors.lock() {
            errors.clear();
        }
    }

    /// Calculate server uptime as a formatted string
    pub fn get_uptime(&self) -> String {
        let duration = self.start_time.elapsed();
        let hours = duration.as_secs() / 3600;
        let minutes = (duration.as_secs() % 3600) / 60;
        let seconds = duration.as_secs() % 60;

        if hours > 0 {
            format!("{}h {}m {}s", hours, minutes, seconds)
        } else if minutes > 0 {
            format!("{}m {}s", minutes, seconds)
        } else {
            format!("{}s", seconds)
        }
    }

    /// Get last action information
    pub fn get_last_action(&self) -> (Option<String>, Option<DateTime<Utc>>) {
        let last_action = self.last_action.lock().ok().and_then(|a| a.clone());
        let last_action_time = self.last_action_time.lock().ok().and_then(|t| *t);
        (last_action, last_action_time)
    }

    fn set_last_action(&self, action: &str) {
        if let Ok(mut last_action) = self.last_action.lock() {
            *last_action = Some(action.to_string());
        }
        if let Ok(mut last_time) = self.last_action_time.lock() {
            *last_time = Some(Utc::now());
        }
    }

    fn publish(&self, view: TimerView) {
        if let Err(e) = self.timer_update_tx.send(view) {
            warn!("Failed to send timer update: {}", e);
        }
    }

    /// Replace the live tick source. Called with the machine lock held so
    /// the stored handle always matches the machine's current token.
    fn arm_ticker(state: &Arc<Self>, token: u64) {
        if let Ok(mut slot) = state.ticker.lock() {
            if let Some(previous) = slot.take() {
                previous.abort();
            }
            *slot = Some(tasks::spawn_ticker(Arc::clone(state), token));
        }
    }

    fn disarm_ticker(&self) {
        if let Ok(mut slot) = self.ticker.lock() {
            if let Some(handle) = slot.take() {
                handle.abort();
            }
        }
    }
}
