//! The timer state machine
//!
//! One consolidated implementation of the tracking-session lifecycle:
//! idle -> running <-> paused -> completed -> idle. The machine owns the
//! three injected capabilities (snapshot store, time-entry sink,
//! notification sink) and every operation takes an explicit `now` so
//! transitions are deterministic under test.
//!
//! Tick sources identify themselves with a session token. Any operation
//! that stops or replaces the running session bumps the token, so a tick
//! from a cancelled source can never mutate a successor session.

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use tracing::{debug, info, warn};

use crate::error::TimerError;
use crate::services::notify::Notifier;
use crate::services::snapshot_store::SnapshotStore;
use crate::services::time_entry::{NewTimeEntry, SubmitError, TimeEntrySink};
use crate::state::session::{
    StartPolicy, StartRequest, TimerMode, TimerSnapshot, TimerStatus, TimerView,
};

/// Sessions shorter than this are dropped instead of submitted, keeping
/// no-op sessions out of the tracking history.
const MIN_ENTRY_SECONDS: u64 = 1;

/// Result of an operation that armed the tick source.
#[derive(Debug)]
pub struct Activation {
    pub view: TimerView,
    /// Token the new tick source must present on every tick.
    pub token: u64,
    /// Set when a finish-policy `start` submitted the prior session's entry
    /// and the write failed. The new session starts regardless.
    pub prior_submission_error: Option<SubmitError>,
}

/// Result of a manual `stop`.
#[derive(Debug)]
pub struct Finished {
    pub view: TimerView,
    /// Set when the entry could not be submitted. The session is finished
    /// locally either way.
    pub submission_error: Option<SubmitError>,
}

/// What a single tick did.
#[derive(Debug)]
pub enum TickOutcome {
    /// Normal advance; the updated view should be published.
    Ticked(TimerView),
    /// A count-down reached zero and the session finished.
    Completed {
        view: TimerView,
        submission_error: Option<SubmitError>,
    },
    /// The tick came from a cancelled source and changed nothing.
    Stale,
}

/// What `restore` found at startup.
#[derive(Debug)]
pub enum RestoreOutcome {
    /// Nothing persisted, or the snapshot was unreadable. Timer is idle.
    Idle,
    /// A running session picked up where it left off; arm a tick source.
    Running(Activation),
    /// A paused session restored with its frozen value.
    Paused(TimerView),
    /// A count-down ran out while unobserved and was finalized.
    Completed {
        view: TimerView,
        submission_error: Option<SubmitError>,
    },
}

/// State machine for the single active tracking session.
pub struct TimerMachine {
    store: Arc<dyn SnapshotStore>,
    entries: Arc<dyn TimeEntrySink>,
    notifier: Arc<dyn Notifier>,
    session: Option<TimerSnapshot>,
    token: u64,
}

impl TimerMachine {
    pub fn new(
        store: Arc<dyn SnapshotStore>,
        entries: Arc<dyn TimeEntrySink>,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        Self {
            store,
            entries,
            notifier,
            session: None,
            token: 0,
        }
    }

    pub fn status(&self) -> TimerStatus {
        self.session
            .as_ref()
            .map(|s| s.status)
            .unwrap_or(TimerStatus::Idle)
    }

    pub fn view(&self) -> TimerView {
        match &self.session {
            Some(snapshot) => TimerView::from_snapshot(snapshot),
            None => TimerView::idle(),
        }
    }

    /// Token the current tick source must present. Bumped on every
    /// transition that stops or replaces the session.
    pub fn session_token(&self) -> u64 {
        self.token
    }

    /// Begin a new tracking session.
    ///
    /// Input validation happens before any transition: an empty topic or a
    /// count-down without a positive duration leaves the machine untouched.
    /// While a session is active the caller's `StartPolicy` decides whether
    /// to reject, discard, or finish it first.
    pub async fn start(
        &mut self,
        req: StartRequest,
        policy: StartPolicy,
        now: DateTime<Utc>,
    ) -> Result<Activation, TimerError> {
        if req.topic_id.trim().is_empty() {
            return Err(TimerError::MissingTopic);
        }
        let total_seconds = match req.mode {
            TimerMode::CountDown => match req.duration_seconds {
                Some(d) if d > 0 => Some(d),
                _ => return Err(TimerError::InvalidDuration),
            },
            TimerMode::CountUp => None,
        };

        let mut prior_submission_error = None;
        if self.status().is_active() {
            match policy {
                StartPolicy::Reject => {
                    return Err(TimerError::SessionActive {
                        status: self.status(),
                    })
                }
                StartPolicy::Discard => {
                    info!("Discarding {} session before new start", self.status());
                    self.reset();
                }
                StartPolicy::Finish => {
                    info!("Finishing {} session before new start", self.status());
                    let finished = self.stop(now).await?;
                    prior_submission_error = finished.submission_error;
                }
            }
        }

        let snapshot = TimerSnapshot {
            mode: req.mode,
            seconds: total_seconds.unwrap_or(0),
            total_seconds,
            started_at: now,
            last_persisted_at: now,
            topic_id: req.topic_id,
            description: req.description,
            status: TimerStatus::Running,
        };
        self.persist(&snapshot);
        info!(
            "Started {} tracking for topic {}",
            snapshot.mode, snapshot.topic_id
        );
        self.session = Some(snapshot);
        self.token += 1;
        self.notifier.timer_started();

        Ok(Activation {
            view: self.view(),
            token: self.token,
            prior_submission_error,
        })
    }

    /// Advance the running session by one second.
    ///
    /// A stale token is the signature of a cancelled tick source; the call
    /// is a no-op so N elapsed seconds always mean exactly N ticks applied.
    /// The snapshot is persisted on every tick, so an unexpected exit loses
    /// at most the in-flight second.
    pub async fn tick(&mut self, token: u64, now: DateTime<Utc>) -> TickOutcome {
        if token != self.token {
            return TickOutcome::Stale;
        }
        let Some(session) = self.session.as_mut() else {
            return TickOutcome::Stale;
        };
        if session.status != TimerStatus::Running {
            return TickOutcome::Stale;
        }

        match session.mode {
            TimerMode::CountUp => {
                session.seconds = session.seconds.saturating_add(1);
            }
            TimerMode::CountDown => {
                session.seconds = session.seconds.saturating_sub(1);
                if session.seconds == 0 {
                    let snapshot = session.clone();
                    let (view, submission_error) = self.complete_naturally(snapshot, now).await;
                    return TickOutcome::Completed {
                        view,
                        submission_error,
                    };
                }
            }
        }
        session.last_persisted_at = now;
        let snapshot = session.clone();
        self.persist(&snapshot);
        TickOutcome::Ticked(self.view())
    }

    /// Freeze the running session. Valid only from `running`.
    pub fn pause(&mut self, now: DateTime<Utc>) -> Result<TimerView, TimerError> {
        let status = self.status();
        let Some(session) = self.session.as_mut() else {
            return Err(TimerError::InvalidCommand { op: "pause", status });
        };
        if session.status != TimerStatus::Running {
            return Err(TimerError::InvalidCommand { op: "pause", status });
        }

        session.status = TimerStatus::Paused;
        session.last_persisted_at = now;
        let snapshot = session.clone();
        self.token += 1;
        self.persist(&snapshot);
        info!("Paused tracking for topic {}", snapshot.topic_id);
        Ok(self.view())
    }

    /// Continue a paused session. Valid only from `paused`.
    ///
    /// `started_at` is re-anchored so that `now - started_at` equals the
    /// session's active seconds again; the pause interval never reaches a
    /// submitted duration.
    pub fn resume(&mut self, now: DateTime<Utc>) -> Result<Activation, TimerError> {
        let status = self.status();
        let Some(session) = self.session.as_mut() else {
            return Err(TimerError::InvalidCommand {
                op: "resume",
                status,
            });
        };
        if session.status != TimerStatus::Paused {
            return Err(TimerError::InvalidCommand {
                op: "resume",
                status,
            });
        }

        session.status = TimerStatus::Running;
        session.started_at = now - Duration::seconds(session.active_seconds() as i64);
        session.last_persisted_at = now;
        let snapshot = session.clone();
        self.token += 1;
        self.persist(&snapshot);
        info!("Resumed tracking for topic {}", snapshot.topic_id);
        Ok(Activation {
            view: self.view(),
            token: self.token,
            prior_submission_error: None,
        })
    }

    /// Finish the session now, submitting the wall-clock delta as its
    /// duration regardless of mode. Valid from `running` and `paused`.
    pub async fn stop(&mut self, now: DateTime<Utc>) -> Result<Finished, TimerError> {
        let status = self.status();
        if !status.is_active() {
            return Err(TimerError::InvalidCommand { op: "stop", status });
        }
        let Some(mut snapshot) = self.session.clone() else {
            return Err(TimerError::InvalidCommand { op: "stop", status });
        };
        self.token += 1;

        if snapshot.status == TimerStatus::Paused {
            // stopping straight out of a pause: the tail pause must not count
            snapshot.started_at = now - Duration::seconds(snapshot.active_seconds() as i64);
        }
        let duration = (now - snapshot.started_at).num_seconds().max(0) as u64;
        let submission_error = self.submit_entry(&snapshot, now, duration).await;
        self.clear_store();
        snapshot.status = TimerStatus::Completed;
        info!(
            "Stopped tracking for topic {} after {}s",
            snapshot.topic_id, duration
        );
        self.session = Some(snapshot);

        Ok(Finished {
            view: self.view(),
            submission_error,
        })
    }

    /// Drop the session without submitting anything and return to idle.
    /// Valid from any state.
    pub fn reset(&mut self) -> TimerView {
        self.token += 1;
        self.session = None;
        self.clear_store();
        debug!("Timer reset to idle");
        self.view()
    }

    /// Recover the persisted session at startup.
    ///
    /// Recovery is anchored on `last_persisted_at`: the unobserved gap is
    /// applied to the stored value, so pauses before the restart are never
    /// double-counted. A count-down whose remaining time ran out while
    /// unobserved is finalized exactly as a live natural completion would
    /// be. Unreadable or implausible snapshots fail closed to idle.
    pub async fn restore(&mut self, now: DateTime<Utc>) -> RestoreOutcome {
        let snapshot = match self.store.load() {
            Ok(Some(snapshot)) => snapshot,
            Ok(None) => {
                debug!("No timer snapshot to restore");
                return RestoreOutcome::Idle;
            }
            Err(e) => {
                warn!("Failed to read timer snapshot, starting idle: {}", e);
                self.clear_store();
                return RestoreOutcome::Idle;
            }
        };

        if !Self::plausible(&snapshot) {
            warn!("Discarding implausible timer snapshot");
            self.clear_store();
            return RestoreOutcome::Idle;
        }

        match snapshot.status {
            TimerStatus::Paused => {
                info!(
                    "Restored paused session for topic {} at {}",
                    snapshot.topic_id,
                    snapshot.display()
                );
                self.session = Some(snapshot);
                RestoreOutcome::Paused(self.view())
            }
            TimerStatus::Running => {
                let gap = (now - snapshot.last_persisted_at).num_seconds().max(0) as u64;
                self.restore_running(snapshot, gap, now).await
            }
            TimerStatus::Idle | TimerStatus::Completed => {
                // never written by this machine; stale garbage from elsewhere
                warn!("Dropping {} snapshot left in the store", snapshot.status);
                self.clear_store();
                RestoreOutcome::Idle
            }
        }
    }

    async fn restore_running(
        &mut self,
        mut snapshot: TimerSnapshot,
        gap: u64,
        now: DateTime<Utc>,
    ) -> RestoreOutcome {
        match snapshot.mode {
            TimerMode::CountUp => {
                snapshot.seconds = snapshot.seconds.saturating_add(gap);
            }
            TimerMode::CountDown => {
                snapshot.seconds = snapshot.seconds.saturating_sub(gap);
                if snapshot.seconds == 0 {
                    info!(
                        "Count-down for topic {} ran out while unobserved",
                        snapshot.topic_id
                    );
                    let (view, submission_error) = self.complete_naturally(snapshot, now).await;
                    return RestoreOutcome::Completed {
                        view,
                        submission_error,
                    };
                }
            }
        }

        snapshot.last_persisted_at = now;
        self.persist(&snapshot);
        info!(
            "Restored running session for topic {} at {}",
            snapshot.topic_id,
            snapshot.display()
        );
        self.session = Some(snapshot);
        self.token += 1;
        RestoreOutcome::Running(Activation {
            view: self.view(),
            token: self.token,
            prior_submission_error: None,
        })
    }

    /// Finalize a count-down that reached zero: the submitted duration is
    /// the configured total, not a wall-clock recomputation, so throttled
    /// or missed ticks never under-report a completed session.
    async fn complete_naturally(
        &mut self,
        mut snapshot: TimerSnapshot,
        now: DateTime<Utc>,
    ) -> (TimerView, Option<SubmitError>) {
        self.token += 1;
        snapshot.seconds = 0;
        let duration = snapshot.total_seconds.unwrap_or(0);
        let submission_error = self.submit_entry(&snapshot, now, duration).await;
        self.clear_store();
        snapshot.status = TimerStatus::Completed;
        info!(
            "Completed count-down for topic {} ({}s)",
            snapshot.topic_id, duration
        );
        self.session = Some(snapshot);
        self.notifier.timer_completed();
        (self.view(), submission_error)
    }

    async fn submit_entry(
        &self,
        snapshot: &TimerSnapshot,
        end_time: DateTime<Utc>,
        duration: u64,
    ) -> Option<SubmitError> {
        if duration < MIN_ENTRY_SECONDS {
            debug!("Session under {}s, skipping time entry", MIN_ENTRY_SECONDS);
            return None;
        }
        let entry = NewTimeEntry {
            topic_id: snapshot.topic_id.clone(),
            description: snapshot.description.clone(),
            start_time: snapshot.started_at,
            end_time,
            duration,
        };
        match self.entries.submit(&entry).await {
            Ok(()) => None,
            Err(e) => {
                warn!("Time entry submission failed: {}", e);
                Some(e)
            }
        }
    }

    fn persist(&self, snapshot: &TimerSnapshot) {
        if let Err(e) = self.store.save(snapshot) {
            warn!("Failed to persist timer snapshot: {}", e);
        }
    }

    fn clear_store(&self) {
        if let Err(e) = self.store.clear() {
            warn!("Failed to clear timer snapshot: {}", e);
        }
    }

    fn plausible(snapshot: &TimerSnapshot) -> bool {
        if snapshot.topic_id.trim().is_empty() {
            return false;
        }
        match snapshot.mode {
            TimerMode::CountDown => match snapshot.total_seconds {
                Some(total) => total > 0 && snapshot.seconds <= total,
                None => false,
            },
            TimerMode::CountUp => snapshot.total_seconds.is_none(),
        }
    }
}
