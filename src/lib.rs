//! Punchclock - A state-managed timer service for topic time tracking
//!
//! This library provides a single-slot tracking timer (count-up or
//! count-down) with crash-safe snapshot recovery and time-entry submission
//! when a session finishes.

pub mod config;
pub mod error;
pub mod state;
pub mod api;
pub mod services;
pub mod tasks;
pub mod utils;

// Re-export commonly used types
pub use config::Config;
pub use error::TimerError;
pub use state::AppState;
pub use api::create_router;
pub use utils::signals::shutdown_signal;
