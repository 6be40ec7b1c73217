//! External collaborator adapters
//!
//! The timer core talks to three injected capabilities: the snapshot store,
//! the time-entry sink, and the notification sink. Each lives here as a
//! trait with the production implementation beside it.

pub mod notify;
pub mod snapshot_store;
pub mod time_entry;

pub use notify::{CommandNotifier, Notifier, NullNotifier};
pub use snapshot_store::{FileSnapshotStore, MemorySnapshotStore, SnapshotError, SnapshotStore};
pub use time_entry::{HttpTimeEntrySink, NewTimeEntry, SubmitError, TimeEntrySink};
