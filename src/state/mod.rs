//! State management module
//!
//! This module contains all state-related structures and their management logic.

pub mod app_state;
pub mod machine;
pub mod session;

// Re-export main types
pub use app_state::AppState;
pub use machine::{Activation, Finished, RestoreOutcome, TickOutcome, TimerMachine};
pub use session::{
    format_hms, StartPolicy, StartRequest, TimerMode, TimerSnapshot, TimerStatus, TimerView,
};
