//! Timer session data types and persisted snapshot shape

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Direction a tracking session counts in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TimerMode {
    /// No fixed target; elapsed seconds grow until the session is stopped.
    CountUp,
    /// Fixed target duration; remaining seconds shrink to zero.
    CountDown,
}

impl TimerMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            TimerMode::CountUp => "count_up",
            TimerMode::CountDown => "count_down",
        }
    }
}

impl std::fmt::Display for TimerMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Lifecycle of a tracking session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TimerStatus {
    Idle,
    Running,
    Paused,
    Completed,
}

impl TimerStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TimerStatus::Idle => "idle",
            TimerStatus::Running => "running",
            TimerStatus::Paused => "paused",
            TimerStatus::Completed => "completed",
        }
    }

    /// Running and paused sessions hold the single active slot.
    pub fn is_active(&self) -> bool {
        matches!(self, TimerStatus::Running | TimerStatus::Paused)
    }
}

impl std::fmt::Display for TimerStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What `start` does when a session is already running or paused.
///
/// The single-active-timer invariant is enforced by the machine, not by
/// caller discipline, so replacing a live session is always an explicit
/// choice.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StartPolicy {
    /// Refuse to start and leave the active session untouched.
    #[default]
    Reject,
    /// Reset the active session without submitting a time entry, then start.
    Discard,
    /// Stop the active session (submitting its entry), then start.
    Finish,
}

/// Parameters for starting a session. Durations are whole seconds here;
/// the HTTP boundary accepts whole minutes and converts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StartRequest {
    pub topic_id: String,
    pub description: Option<String>,
    pub mode: TimerMode,
    /// Target duration for count-down sessions. Ignored for count-up.
    pub duration_seconds: Option<u64>,
}

/// The persisted form of the active session.
///
/// Exactly one snapshot exists per client instance (single-slot store). It
/// is written on start, on every tick, and on pause/resume transitions, and
/// cleared once the session ends, so recovery after an unexpected exit loses
/// at most the in-flight second.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimerSnapshot {
    pub mode: TimerMode,
    /// Remaining seconds when counting down, elapsed seconds when counting up.
    pub seconds: u64,
    /// Configured target duration; present iff `mode` is count-down.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total_seconds: Option<u64>,
    /// Wall-clock anchor such that `now - started_at` equals the session's
    /// active time. Re-anchored on resume so paused intervals never count.
    pub started_at: DateTime<Utc>,
    /// Wall clock at the last snapshot write; recovery gaps are measured
    /// from here.
    pub last_persisted_at: DateTime<Utc>,
    pub topic_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub status: TimerStatus,
}

impl TimerSnapshot {
    /// Seconds the session has actually been running, excluding pauses.
    pub fn active_seconds(&self) -> u64 {
        match self.mode {
            TimerMode::CountUp => self.seconds,
            TimerMode::CountDown => self
                .total_seconds
                .unwrap_or(0)
                .saturating_sub(self.seconds),
        }
    }

    /// The value shown to the UI, formatted as `HH:MM:SS`.
    pub fn display(&self) -> String {
        format_hms(self.seconds)
    }
}

/// Observable timer state published to the UI layer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimerView {
    /// `HH:MM:SS` rendering of remaining (count-down) or elapsed (count-up)
    /// seconds.
    pub display: String,
    pub status: TimerStatus,
    pub mode: Option<TimerMode>,
    pub topic_id: Option<String>,
    pub description: Option<String>,
}

impl TimerView {
    pub fn idle() -> Self {
        Self {
            display: format_hms(0),
            status: TimerStatus::Idle,
            mode: None,
            topic_id: None,
            description: None,
        }
    }

    pub fn from_snapshot(snapshot: &TimerSnapshot) -> Self {
        Self {
            display: snapshot.display(),
            status: snapshot.status,
            mode: Some(snapshot.mode),
            topic_id: Some(snapshot.topic_id.clone()),
            description: snapshot.description.clone(),
        }
    }
}

impl Default for TimerView {
    fn default() -> Self {
        Self::idle()
    }
}

/// Format a second count as `HH:MM:SS`. Hours widen past two digits rather
/// than wrap, so long count-up sessions stay unambiguous.
pub fn format_hms(total_seconds: u64) -> String {
    let hours = total_seconds / 3600;
    let minutes = (total_seconds % 3600) / 60;
    let seconds = total_seconds % 60;
    format!("{:02}:{:02}:{:02}", hours, minutes, seconds)
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;
    use rstest::rstest;

    use super::*;

    #[rstest]
    #[case(0, "00:00:00")]
    #[case(1, "00:00:01")]
    #[case(59, "00:00:59")]
    #[case(60, "00:01:00")]
    #[case(300, "00:05:00")]
    #[case(3661, "01:01:01")]
    #[case(86_399, "23:59:59")]
    #[case(90_000, "25:00:00")]
    fn formats_hms(#[case] seconds: u64, #[case] expected: &str) {
        assert_eq!(format_hms(seconds), expected);
    }

    fn snapshot(mode: TimerMode, seconds: u64, total: Option<u64>) -> TimerSnapshot {
        let at = Utc.with_ymd_and_hms(2025, 6, 1, 9, 0, 0).unwrap();
        TimerSnapshot {
            mode,
            seconds,
            total_seconds: total,
            started_at: at,
            last_persisted_at: at,
            topic_id: "topic-1".to_string(),
            description: None,
            status: TimerStatus::Running,
        }
    }

    #[test]
    fn active_seconds_counts_up_directly() {
        let snap = snapshot(TimerMode::CountUp, 42, None);
        assert_eq!(snap.active_seconds(), 42);
    }

    #[test]
    fn active_seconds_inverts_count_down() {
        let snap = snapshot(TimerMode::CountDown, 180, Some(300));
        assert_eq!(snap.active_seconds(), 120);
    }

    #[test]
    fn snapshot_round_trips_as_camel_case_json() {
        let snap = snapshot(TimerMode::CountDown, 299, Some(300));
        let json = serde_json::to_value(&snap).unwrap();

        assert_eq!(json["mode"], "count_down");
        assert_eq!(json["seconds"], 299);
        assert_eq!(json["totalSeconds"], 300);
        assert_eq!(json["topicId"], "topic-1");
        assert_eq!(json["status"], "running");
        // camelCase timestamps, absent description omitted entirely
        assert!(json.get("startedAt").is_some());
        assert!(json.get("lastPersistedAt").is_some());
        assert!(json.get("description").is_none());

        let back: TimerSnapshot = serde_json::from_value(json).unwrap();
        assert_eq!(back, snap);
    }

    #[test]
    fn view_reflects_snapshot() {
        let snap = snapshot(TimerMode::CountDown, 65, Some(300));
        let view = TimerView::from_snapshot(&snap);
        assert_eq!(view.display, "00:01:05");
        assert_eq!(view.status, TimerStatus::Running);
        assert_eq!(view.mode, Some(TimerMode::CountDown));
        assert_eq!(view.topic_id.as_deref(), Some("topic-1"));
    }

    #[test]
    fn idle_view_is_zeroed() {
        let view = TimerView::idle();
        assert_eq!(view.display, "00:00:00");
        assert_eq!(view.status, TimerStatus::Idle);
        assert!(view.mode.is_none());
        assert!(view.topic_id.is_none());
    }
}
