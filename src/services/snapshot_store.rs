//! Snapshot persistence for the active timer session
//!
//! Single-slot, overwrite semantics: the store holds at most one snapshot
//! per client instance. Persistence is best-effort: the machine treats a
//! failed read as "no snapshot" and logs failed writes without propagating
//! them.

use std::io::ErrorKind;
use std::path::PathBuf;
use std::sync::Mutex;

use thiserror::Error;

use crate::state::session::TimerSnapshot;

/// Snapshot read/write failure. Never fatal to the timer.
#[derive(Debug, Error)]
pub enum SnapshotError {
    #[error("snapshot io: {0}")]
    Io(#[from] std::io::Error),
    #[error("snapshot decode: {0}")]
    Decode(#[from] serde_json::Error),
}

/// Key-value style persistence for the single active snapshot.
#[cfg_attr(test, mockall::automock)]
pub trait SnapshotStore: Send + Sync {
    /// Load the stored snapshot, if any. `Ok(None)` when nothing is stored.
    fn load(&self) -> Result<Option<TimerSnapshot>, SnapshotError>;
    /// Save a snapshot, replacing any previous one.
    fn save(&self, snapshot: &TimerSnapshot) -> Result<(), SnapshotError>;
    /// Remove the stored snapshot. Removing an empty slot is not an error.
    fn clear(&self) -> Result<(), SnapshotError>;
}

/// JSON-file snapshot store, one file per client instance.
#[derive(Debug)]
pub struct FileSnapshotStore {
    path: PathBuf,
}

impl FileSnapshotStore {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    fn tmp_path(&self) -> PathBuf {
        let mut tmp = self.path.as_os_str().to_owned();
        tmp.push(".tmp");
        PathBuf::from(tmp)
    }
}

impl SnapshotStore for FileSnapshotStore {
    fn load(&self) -> Result<Option<TimerSnapshot>, SnapshotError> {
        let raw = match std::fs::read_to_string(&self.path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        let snapshot = serde_json::from_str(&raw)?;
        Ok(Some(snapshot))
    }

    fn save(&self, snapshot: &TimerSnapshot) -> Result<(), SnapshotError> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let raw = serde_json::to_vec(snapshot)?;
        // write beside the slot, then rename over it; a crash mid-write
        // leaves the previous snapshot intact
        let tmp = self.tmp_path();
        std::fs::write(&tmp, raw)?;
        std::fs::rename(&tmp, &self.path)?;
        Ok(())
    }

    fn clear(&self) -> Result<(), SnapshotError> {
        match std::fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

/// In-memory store for tests and for simulating a second tab sharing the
/// same slot.
#[derive(Debug, Default)]
pub struct MemorySnapshotStore {
    slot: Mutex<Option<TimerSnapshot>>,
}

impl MemorySnapshotStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Peek at the slot without going through the trait.
    pub fn current(&self) -> Option<TimerSnapshot> {
        self.slot.lock().expect("snapshot slot poisoned").clone()
    }
}

impl SnapshotStore for MemorySnapshotStore {
    fn load(&self) -> Result<Option<TimerSnapshot>, SnapshotError> {
        Ok(self.current())
    }

    fn save(&self, snapshot: &TimerSnapshot) -> Result<(), SnapshotError> {
        *self.slot.lock().expect("snapshot slot poisoned") = Some(snapshot.clone());
        Ok(())
    }

    fn clear(&self) -> Result<(), SnapshotError> {
        *self.slot.lock().expect("snapshot slot poisoned") = None;
        Ok(())
    }
}
