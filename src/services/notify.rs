//! Fire-and-forget session notifications
//!
//! Start and completion signals are side channels for the user (a sound, a
//! desktop popup). They must never block or fail a timer operation, so the
//! command runner spawns and forgets, logging failures at warn.

use tokio::process::Command;
use tracing::{debug, warn};

/// Port for session start/completion signals.
#[cfg_attr(test, mockall::automock)]
pub trait Notifier: Send + Sync {
    fn timer_started(&self);
    fn timer_completed(&self);
}

/// Runs a user-configured shell command per signal, e.g. a `paplay` call.
pub struct CommandNotifier {
    on_start: Option<String>,
    on_complete: Option<String>,
}

impl CommandNotifier {
    pub fn new(on_start: Option<String>, on_complete: Option<String>) -> Self {
        Self {
            on_start,
            on_complete,
        }
    }

    fn run(label: &'static str, command: Option<&String>) {
        let Some(command) = command else {
            debug!("No {} notification configured", label);
            return;
        };

        let command = command.clone();
        tokio::spawn(async move {
            match Command::new("sh").arg("-c").arg(&command).status().await {
                Ok(status) if status.success() => {}
                Ok(status) => warn!("{} notification exited with {}", label, status),
                Err(e) => warn!("{} notification failed to spawn: {}", label, e),
            }
        });
    }
}

impl Notifier for CommandNotifier {
    fn timer_started(&self) {
        Self::run("start", self.on_start.as_ref());
    }

    fn timer_completed(&self) {
        Self::run("completion", self.on_complete.as_ref());
    }
}

/// No-op notifier for headless deployments and tests.
#[derive(Debug, Default)]
pub struct NullNotifier;

impl Notifier for NullNotifier {
    fn timer_started(&self) {}
    fn timer_completed(&self) {}
}
