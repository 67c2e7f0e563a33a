use std::io::Write;
use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use crate::domain::error::StoreError;
use crate::domain::ports::{CredentialStore, PersistedSession};

/// JSON file holding the persisted session.
///
/// Writes go to a temporary file in the same directory which is then renamed
/// over the target, so readers see either the old or the new record.
pub struct JsonFileCredentialStore {
    path: PathBuf,
}

impl JsonFileCredentialStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn display(&self) -> String {
        self.path.to_string_lossy().to_string()
    }

    fn parent_dir(&self) -> &Path {
        match self.path.parent() {
            Some(p) if !p.as_os_str().is_empty() => p,
            _ => Path::new("."),
        }
    }
}

impl CredentialStore for JsonFileCredentialStore {
    fn load(&self) -> Option<PersistedSession> {
        let bytes = match std::fs::read(&self.path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return None,
            Err(e) => {
                warn!(path = %self.display(), error = %e, "session file unreadable; treating as absent");
                return None;
            }
        };

        match serde_json::from_slice::<PersistedSession>(&bytes) {
            Ok(record) if record.is_valid() => Some(record),
            Ok(_) => {
                warn!(path = %self.display(), "session file structurally invalid; treating as absent");
                None
            }
            Err(e) => {
                warn!(path = %self.display(), error = %e, "session file corrupt; treating as absent");
                None
            }
        }
    }

    fn write(&self, record: &PersistedSession) -> Result<(), StoreError> {
        let dir = self.parent_dir();
        std::fs::create_dir_all(dir)
            .map_err(|e| StoreError::io(dir.to_string_lossy(), e))?;

        let mut tmp = tempfile::NamedTempFile::new_in(dir)
            .map_err(|e| StoreError::io(dir.to_string_lossy(), e))?;
        serde_json::to_writer_pretty(&mut tmp, record)?;
        tmp.flush().map_err(|e| StoreError::io(self.display(), e))?;
        tmp.as_file()
            .sync_all()
            .map_err(|e| StoreError::io(self.display(), e))?;
        tmp.persist(&self.path)
            .map_err(|e| StoreError::io(self.display(), e.error))?;

        debug!(path = %self.display(), delegated = record.original_credential.is_some(), "session persisted");
        Ok(())
    }

    fn clear(&self) -> Result<(), StoreError> {
        match std::fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(StoreError::io(self.display(), e)),
        }
    }
}
