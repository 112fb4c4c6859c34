use std::{
    fs,
    io::{ErrorKind, Write},
    path::{Path, PathBuf},
};

use rocket::serde::json::serde_json;
use thiserror::Error;

use super::Session;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error("Corrupt session data: {0}")]
    Format(#[from] serde_json::Error),
}

/// Somewhere to keep a session between runs: the local-storage of a
/// [`SessionStore`](super::SessionStore).
pub trait SessionStorage {
    /// The stored session, if there is one.
    fn load(&self) -> Result<Option<Session>, StorageError>;

    fn save(&mut self, session: &Session) -> Result<(), StorageError>;

    /// Forget the stored session. Clearing an empty storage succeeds.
    fn clear(&mut self) -> Result<(), StorageError>;
}

/// Keeps the session in memory only.
#[derive(Debug, Clone, Default)]
pub struct MemoryStorage {
    session: Option<Session>,
}

impl MemoryStorage {
    pub fn with_session(session: Session) -> Self {
        Self {
            session: Some(session),
        }
    }
}

impl SessionStorage for MemoryStorage {
    fn load(&self) -> Result<Option<Session>, StorageError> {
        Ok(self.session.clone())
    }

    fn save(&mut self, session: &Session) -> Result<(), StorageError> {
        self.session = Some(session.clone());
        Ok(())
    }

    fn clear(&mut self) -> Result<(), StorageError> {
        self.session = None;
        Ok(())
    }
}

/// Keeps the session as JSON in a file readable only by its owner.
#[derive(Debug, Clone)]
pub struct FileStorage {
    path: PathBuf,
}

impl FileStorage {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl SessionStorage for FileStorage {
    fn load(&self) -> Result<Option<Session>, StorageError> {
        match fs::read(&self.path) {
            Ok(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn save(&mut self, session: &Session) -> Result<(), StorageError> {
        let mut options = fs::OpenOptions::new();
        options.write(true).create(true).truncate(true);
        #[cfg(unix)]
        {
            use std::os::unix::fs::OpenOptionsExt;
            options.mode(0o600);
        }
        let mut file = options.open(&self.path)?;
        file.write_all(&serde_json::to_vec(session)?)?;
        Ok(())
    }

    fn clear(&mut self) -> Result<(), StorageError> {
        match fs::remove_file(&self.path) {
            Err(e) if e.kind() != ErrorKind::NotFound => Err(e.into()),
            _ => Ok(()),
        }
    }
}
