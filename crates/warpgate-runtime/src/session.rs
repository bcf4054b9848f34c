//! Session-scoped "gate already seen" flag.
//!
//! The gate remembers, for the lifetime of a browsing session, that it has
//! already revealed the main content. This module provides the
//! [`StorageBackend`] abstraction over the session store and the
//! [`SessionFlag`] that reads it once and writes it once.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                        SessionFlag                            │
//! │   - One key, value "done" or absent                           │
//! │   - Read at controller construction                           │
//! │   - Written once, when the gate reveals content               │
//! └──────────────────────────────────────────────────────────────┘
//!                              │
//!                              ▼
//! ┌──────────────────────────────────────────────────────────────┐
//! │                     StorageBackend                            │
//! │   - MemoryStorage: in-memory (tests, sessionStorage bridge)   │
//! │   - FileStorage: JSON file (requires state-persistence)       │
//! └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Design Invariants
//!
//! 1. **Graceful degradation**: Storage failures never panic and never block
//!    the gate. A failed read means "show the gate"; a failed write means
//!    "not remembered".
//! 2. **Exact match**: only the value `"done"` counts as set.
//! 3. **Atomic writes**: File storage uses write-rename pattern to prevent corruption.
//!
//! # Failure Modes
//!
//! | Failure | Cause | Behavior |
//! |---------|-------|----------|
//! | `StorageError::Io` | File I/O failure | Flag treated as absent / not written |
//! | `StorageError::Serialization` | JSON encode/decode | Flag treated as absent |
//! | `StorageError::Corruption` | Poisoned lock, bad format | Flag treated as absent |
//! | Missing entry | First visit in session | Gate is shown |

use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, RwLock};

/// Value stored under the session key once the gate has been passed.
pub const DONE: &str = "done";

// ─────────────────────────────────────────────────────────────────────────────
// Error Types
// ─────────────────────────────────────────────────────────────────────────────

/// Errors that can occur during storage operations.
#[derive(Debug)]
pub enum StorageError {
    /// I/O error during file operations.
    Io(std::io::Error),
    /// Serialization or deserialization error.
    #[cfg(feature = "state-persistence")]
    Serialization(String),
    /// Storage is corrupted or in an invalid state.
    Corruption(String),
    /// Backend is not available (e.g., storage disabled by the browser).
    Unavailable(String),
}

impl fmt::Display for StorageError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StorageError::Io(e) => write!(f, "I/O error: {e}"),
            #[cfg(feature = "state-persistence")]
            StorageError::Serialization(msg) => write!(f, "serialization error: {msg}"),
            StorageError::Corruption(msg) => write!(f, "storage corruption: {msg}"),
            StorageError::Unavailable(msg) => write!(f, "storage unavailable: {msg}"),
        }
    }
}

impl std::error::Error for StorageError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            StorageError::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl From<std::io::Error> for StorageError {
    fn from(e: std::io::Error) -> Self {
        StorageError::Io(e)
    }
}

/// Result type for storage operations.
pub type StorageResult<T> = Result<T, StorageError>;

// ─────────────────────────────────────────────────────────────────────────────
// Storage Backend Trait
// ─────────────────────────────────────────────────────────────────────────────

/// A string key/value store scoped to one browsing session.
///
/// Mirrors the subset of the Web Storage API the gate needs.
pub trait StorageBackend: Send + Sync {
    /// Human-readable name for logging.
    fn name(&self) -> &str;

    /// Read a value. `Ok(None)` when the key is absent.
    fn get(&self, key: &str) -> StorageResult<Option<String>>;

    /// Write a value, replacing any previous one.
    fn set(&self, key: &str, value: &str) -> StorageResult<()>;

    /// Remove a key. Removing an absent key is not an error.
    fn remove(&self, key: &str) -> StorageResult<()>;

    /// Check if the backend is available and functional.
    fn is_available(&self) -> bool {
        true
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Memory Storage (always available)
// ─────────────────────────────────────────────────────────────────────────────

/// In-memory storage backend.
///
/// Lives as long as the process, which matches session scope for a single
/// page. Also the backend of choice for tests.
#[derive(Default)]
pub struct MemoryStorage {
    data: RwLock<HashMap<String, String>>,
}

impl MemoryStorage {
    /// Create a new empty memory storage.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create memory storage pre-populated with one entry.
    #[must_use]
    pub fn with_entry(key: impl Into<String>, value: impl Into<String>) -> Self {
        let mut data = HashMap::new();
        data.insert(key.into(), value.into());
        Self {
            data: RwLock::new(data),
        }
    }
}

impl StorageBackend for MemoryStorage {
    fn name(&self) -> &str {
        "MemoryStorage"
    }

    fn get(&self, key: &str) -> StorageResult<Option<String>> {
        let guard = self
            .data
            .read()
            .map_err(|_| StorageError::Corruption("lock poisoned".into()))?;
        Ok(guard.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> StorageResult<()> {
        let mut guard = self
            .data
            .write()
            .map_err(|_| StorageError::Corruption("lock poisoned".into()))?;
        guard.insert(key.to_owned(), value.to_owned());
        Ok(())
    }

    fn remove(&self, key: &str) -> StorageResult<()> {
        let mut guard = self
            .data
            .write()
            .map_err(|_| StorageError::Corruption("lock poisoned".into()))?;
        guard.remove(key);
        Ok(())
    }
}

impl fmt::Debug for MemoryStorage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let count = self.data.read().map(|g| g.len()).unwrap_or(0);
        f.debug_struct("MemoryStorage")
            .field("entries", &count)
            .finish()
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// File Storage (requires state-persistence feature)
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(feature = "state-persistence")]
mod file_storage {
    use super::*;
    use serde::{Deserialize, Serialize};
    use std::fs::{self, File};
    use std::io::{BufReader, BufWriter, Write};
    use std::path::{Path, PathBuf};

    /// On-disk format.
    #[derive(Serialize, Deserialize)]
    struct SessionFile {
        /// Format version for future migrations.
        format_version: u32,
        entries: HashMap<String, String>,
    }

    impl SessionFile {
        const FORMAT_VERSION: u32 = 1;

        fn new() -> Self {
            Self {
                format_version: Self::FORMAT_VERSION,
                entries: HashMap::new(),
            }
        }
    }

    /// File-based storage backend using JSON.
    ///
    /// Lets a native host (a kiosk shell, a terminal demo) keep the flag
    /// across process restarts within one logical session.
    ///
    /// # File Format
    ///
    /// ```json
    /// {
    ///   "format_version": 1,
    ///   "entries": { "intro:seen": "done" }
    /// }
    /// ```
    ///
    /// # Atomic Writes
    ///
    /// 1. Write to `{path}.tmp`
    /// 2. Flush and sync
    /// 3. Rename `{path}.tmp` -> `{path}`
    pub struct FileStorage {
        path: PathBuf,
        lock: RwLock<()>,
    }

    impl FileStorage {
        /// Create a file storage at the given path.
        ///
        /// The file does not need to exist; it will be created on first write.
        #[must_use]
        pub fn new(path: impl AsRef<Path>) -> Self {
            Self {
                path: path.as_ref().to_path_buf(),
                lock: RwLock::new(()),
            }
        }

        /// Path of the backing file.
        #[must_use]
        pub fn path(&self) -> &Path {
            &self.path
        }

        fn temp_path(&self) -> PathBuf {
            let mut tmp = self.path.clone();
            tmp.set_extension("json.tmp");
            tmp
        }

        fn load(&self) -> StorageResult<SessionFile> {
            if !self.path.exists() {
                return Ok(SessionFile::new());
            }
            let reader = BufReader::new(File::open(&self.path)?);
            let file: SessionFile = serde_json::from_reader(reader).map_err(|e| {
                StorageError::Serialization(format!("failed to parse session file: {e}"))
            })?;
            if file.format_version != SessionFile::FORMAT_VERSION {
                tracing::warn!(
                    stored = file.format_version,
                    expected = SessionFile::FORMAT_VERSION,
                    "session file format version mismatch, ignoring stored entries"
                );
                return Ok(SessionFile::new());
            }
            Ok(file)
        }

        fn store(&self, file: &SessionFile) -> StorageResult<()> {
            if let Some(parent) = self.path.parent() {
                fs::create_dir_all(parent)?;
            }
            let tmp_path = self.temp_path();
            {
                let mut writer = BufWriter::new(File::create(&tmp_path)?);
                serde_json::to_writer_pretty(&mut writer, file).map_err(|e| {
                    StorageError::Serialization(format!("failed to serialize session file: {e}"))
                })?;
                writer.flush()?;
                writer.get_ref().sync_all()?;
            }
            fs::rename(&tmp_path, &self.path)?;
            tracing::debug!(
                path = %self.path.display(),
                entries = file.entries.len(),
                "saved session file"
            );
            Ok(())
        }

        fn locked<T>(&self, f: impl FnOnce() -> StorageResult<T>) -> StorageResult<T> {
            let _guard = self
                .lock
                .write()
                .map_err(|_| StorageError::Corruption("lock poisoned".into()))?;
            f()
        }
    }

    impl StorageBackend for FileStorage {
        fn name(&self) -> &str {
            "FileStorage"
        }

        fn get(&self, key: &str) -> StorageResult<Option<String>> {
            self.locked(|| Ok(self.load()?.entries.get(key).cloned()))
        }

        fn set(&self, key: &str, value: &str) -> StorageResult<()> {
            self.locked(|| {
                let mut file = self.load()?;
                file.entries.insert(key.to_owned(), value.to_owned());
                self.store(&file)
            })
        }

        fn remove(&self, key: &str) -> StorageResult<()> {
            self.locked(|| {
                let mut file = self.load()?;
                if file.entries.remove(key).is_some() {
                    self.store(&file)?;
                }
                Ok(())
            })
        }

        fn is_available(&self) -> bool {
            match self.path.parent() {
                Some(parent) if !parent.as_os_str().is_empty() => {
                    parent.exists() || fs::create_dir_all(parent).is_ok()
                }
                _ => true,
            }
        }
    }

    impl fmt::Debug for FileStorage {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            f.debug_struct("FileStorage")
                .field("path", &self.path)
                .finish()
        }
    }
}

#[cfg(feature = "state-persistence")]
pub use file_storage::FileStorage;

// ─────────────────────────────────────────────────────────────────────────────
// Session Flag
// ─────────────────────────────────────────────────────────────────────────────

/// The single "gate already passed" flag.
pub struct SessionFlag {
    backend: Arc<dyn StorageBackend>,
    key: String,
    written: bool,
}

impl SessionFlag {
    /// Bind the flag to `key` in `backend`.
    #[must_use]
    pub fn new(backend: Arc<dyn StorageBackend>, key: impl Into<String>) -> Self {
        Self {
            backend,
            key: key.into(),
            written: false,
        }
    }

    /// Storage key.
    #[must_use]
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Whether the session store holds exactly `"done"`.
    ///
    /// Storage failures are logged and read as "absent".
    #[must_use]
    pub fn is_done(&self) -> bool {
        if !self.backend.is_available() {
            tracing::debug!(
                backend = self.backend.name(),
                key = %self.key,
                "session storage unavailable, showing gate"
            );
            return false;
        }
        match self.backend.get(&self.key) {
            Ok(value) => value.as_deref() == Some(DONE),
            Err(err) => {
                tracing::warn!(
                    backend = self.backend.name(),
                    key = %self.key,
                    error = %err,
                    "session flag read failed, showing gate"
                );
                false
            }
        }
    }

    /// Write `"done"` once.
    ///
    /// Returns `Ok(true)` if this call wrote the value and `Ok(false)` if it
    /// had already been written by this flag.
    pub fn mark_done(&mut self) -> StorageResult<bool> {
        if self.written {
            return Ok(false);
        }
        if !self.backend.is_available() {
            return Err(StorageError::Unavailable(format!(
                "{} is not available",
                self.backend.name()
            )));
        }
        self.backend.set(&self.key, DONE)?;
        self.written = true;
        tracing::debug!(backend = self.backend.name(), key = %self.key, "session flag written");
        Ok(true)
    }

    /// Whether this flag has written the value.
    #[must_use]
    pub const fn is_written(&self) -> bool {
        self.written
    }
}

impl fmt::Debug for SessionFlag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionFlag")
            .field("backend", &self.backend.name())
            .field("key", &self.key)
            .field("written", &self.written)
            .finish()
    }
}
