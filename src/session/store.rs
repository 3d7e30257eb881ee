//! Persistence backends for the current [`Session`].

use std::fmt;
use std::fs;
use std::io::ErrorKind as IoErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use super::Session;
use crate::error::ClientError;

/// Device-local storage for at most one session.
pub trait SessionStore: Send + Sync + fmt::Debug {
    /// Reads the stored session, if any.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::Storage`] if the backing store is unreadable
    /// or holds malformed data.
    fn load(&self) -> Result<Option<Session>, ClientError>;

    /// Replaces the stored session.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::Storage`] if the write fails.
    fn save(&self, session: &Session) -> Result<(), ClientError>;

    /// Removes the stored session. Clearing an empty store succeeds.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::Storage`] if the removal fails.
    fn clear(&self) -> Result<(), ClientError>;
}

/// Stores the session as a JSON file.
#[derive(Debug, Clone)]
pub struct FileSessionStore {
    path: PathBuf,
}

impl FileSessionStore {
    /// Creates a store backed by the file at `path`.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Location of the session file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl SessionStore for FileSessionStore {
    fn load(&self) -> Result<Option<Session>, ClientError> {
        let raw = match fs::read_to_string(&self.path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == IoErrorKind::NotFound => return Ok(None),
            Err(e) => {
                return Err(ClientError::Storage(format!(
                    "reading {}: {e}",
                    self.path.display()
                )));
            }
        };
        serde_json::from_str(&raw)
            .map(Some)
            .map_err(|e| ClientError::Storage(format!("parsing {}: {e}", self.path.display())))
    }

    fn save(&self, session: &Session) -> Result<(), ClientError> {
        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent).map_err(|e| {
                ClientError::Storage(format!("creating {}: {e}", parent.display()))
            })?;
        }
        let json = serde_json::to_string_pretty(session)?;
        fs::write(&self.path, json)
            .map_err(|e| ClientError::Storage(format!("writing {}: {e}", self.path.display())))
    }

    fn clear(&self) -> Result<(), ClientError> {
        match fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == IoErrorKind::NotFound => Ok(()),
            Err(e) => Err(ClientError::Storage(format!(
                "removing {}: {e}",
                self.path.display()
            ))),
        }
    }
}

/// Keeps the session in memory only. Useful for tests and short-lived tools.
#[derive(Debug, Default)]
pub struct MemorySessionStore {
    slot: Mutex<Option<Session>>,
}

impl MemorySessionStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn slot(&self) -> Result<std::sync::MutexGuard<'_, Option<Session>>, ClientError> {
        self.slot
            .lock()
            .map_err(|_| ClientError::Storage("session slot poisoned".to_string()))
    }
}

impl SessionStore for MemorySessionStore {
    fn load(&self) -> Result<Option<Session>, ClientError> {
        Ok(self.slot()?.clone())
    }

    fn save(&self, session: &Session) -> Result<(), ClientError> {
        *self.slot()? = Some(session.clone());
        Ok(())
    }

    fn clear(&self) -> Result<(), ClientError> {
        *self.slot()? = None;
        Ok(())
    }
}
