use chrono::Utc;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing::{error, info, warn};

use crate::error::StateError;
use crate::models::slot::{PersistedState, Snapshot, StoredState};

/// File-backed store holding only the most recent snapshot.
///
/// Every save replaces the whole document. Loading never fails: a missing or
/// unreadable file is reported as "no previous state" so the run proceeds as
/// a first run.
pub struct StateStore {
    path: PathBuf,
    file_mutex: Mutex<()>,
}

impl StateStore {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            file_mutex: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn load(&self) -> Option<Snapshot> {
        let _lock = self.file_mutex.lock().ok()?;

        let contents = match fs::read_to_string(&self.path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                info!("No previous state found at {} (first run)", self.path.display());
                return None;
            }
            Err(e) => {
                warn!(
                    "Failed to read previous state from {}: {} - treating as first run",
                    self.path.display(),
                    e
                );
                return None;
            }
        };

        match serde_json::from_str::<StoredState>(&contents) {
            Ok(stored) => {
                let snapshot = stored.into_snapshot(Utc::now());
                info!(
                    "Loaded previous state with {} available slots",
                    snapshot.len()
                );
                Some(snapshot)
            }
            Err(e) => {
                warn!(
                    "Previous state at {} is corrupt ({}) - treating as first run",
                    self.path.display(),
                    e
                );
                None
            }
        }
    }

    pub fn save(&self, snapshot: &Snapshot) -> Result<(), StateError> {
        let _lock = self
            .file_mutex
            .lock()
            .map_err(|_| std::io::Error::other("state file mutex poisoned"))?;

        let json = serde_json::to_string_pretty(&PersistedState::from(snapshot))?;

        // Write beside the target then rename so readers never see a partial file
        let tmp_path = self.path.with_extension("json.tmp");
        let result = (|| -> Result<(), StateError> {
            let mut file = fs::File::create(&tmp_path)?;
            file.write_all(json.as_bytes())?;
            file.sync_all()?;
            fs::rename(&tmp_path, &self.path)?;
            Ok(())
        })();

        match &result {
            Ok(()) => info!(
                "Saved current state ({} slots) to {}",
                snapshot.len(),
                self.path.display()
            ),
            Err(e) => {
                error!("Error saving state to {}: {}", self.path.display(), e);
                let _ = fs::remove_file(&tmp_path);
            }
        }

        result
    }
}
