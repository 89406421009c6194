mod lock;
pub mod models;

use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

use lock::{LockMode, StoreLock};
use models::Document;
use tempfile::NamedTempFile;
use tracing::{debug, error, info, trace, warn};

/// Structured error type for store I/O.
///
/// Only raw [`Store::save`] and the async task plumbing surface these; the
/// transactional helpers log persistence failures and carry on.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    /// Reading or writing the store file failed.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// The document could not be serialized.
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    /// The temporary file could not be moved over the store file.
    #[error("persist error: {0}")]
    Persist(#[from] tempfile::PersistError),

    /// The advisory lock could not be taken.
    #[error("lock error: {0}")]
    Lock(String),

    /// A `spawn_blocking` task panicked or was cancelled.
    #[error("task error: {0}")]
    Task(#[from] tokio::task::JoinError),
}

/// Handle to the on-disk document. Cheap to clone; holds no cached state.
#[derive(Debug, Clone)]
pub struct Store {
    path: PathBuf,
    hash_cost: u32,
}

struct Loaded {
    document: Document,
    origin: Origin,
}

/// Where a loaded document came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Origin {
    Missing,
    Parsed,
    Corrupt,
    /// The file exists but could not be read; it must not be overwritten.
    Unreadable,
}

impl Store {
    pub fn open(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            hash_cost: bcrypt::DEFAULT_COST,
        }
    }

    /// bcrypt cost for newly stored passwords.
    pub fn with_hash_cost(mut self, cost: u32) -> Self {
        self.hash_cost = cost;
        self
    }

    pub(crate) fn hash_cost(&self) -> u32 {
        self.hash_cost
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read the document without locking. Never fails: a file that is absent
    /// or cannot be used yields an empty document.
    pub fn load(&self) -> Document {
        self.load_inner().document
    }

    /// Write the whole document through a temporary file and an atomic
    /// rename, so a concurrent reader sees either the old or the new file.
    pub fn save(&self, doc: &Document) -> Result<(), StorageError> {
        let dir = parent_dir(&self.path);
        std::fs::create_dir_all(dir)?;
        let mut tmp = NamedTempFile::new_in(dir)?;
        serde_json::to_writer_pretty(&mut tmp, doc)?;
        tmp.write_all(b"\n")?;
        tmp.as_file().sync_all()?;
        tmp.persist(&self.path)?;
        trace!(path=%self.path.display(), "store: saved");
        Ok(())
    }

    /// Run `f` against the current document under a shared lock.
    pub fn read_blocking<T>(&self, f: impl FnOnce(&Document) -> T) -> T {
        let _lock = self.lock(LockMode::Shared);
        let loaded = self.load_inner();
        f(&loaded.document)
    }

    /// One load -> mutate -> save transaction under the exclusive lock.
    ///
    /// A failed save is logged and the result of `f` is still returned: the
    /// change happened in memory but is not durable.
    pub fn update_blocking<T>(&self, f: impl FnOnce(&mut Document) -> T) -> T {
        self.update_durable_blocking(f).0
    }

    /// Like [`Store::update_blocking`], also reporting whether the document
    /// on disk reflects the change afterwards.
    ///
    /// A store file that exists but cannot be read is never overwritten: `f`
    /// runs against an empty document and nothing is saved.
    pub fn update_durable_blocking<T>(&self, f: impl FnOnce(&mut Document) -> T) -> (T, bool) {
        let _lock = self.lock(LockMode::Exclusive);
        let Loaded {
            mut document,
            origin,
        } = self.load_inner();
        if origin == Origin::Unreadable {
            let out = f(&mut document);
            error!(
                path=%self.path.display(),
                "store: file unreadable; change kept in memory only"
            );
            return (out, false);
        }
        if origin == Origin::Corrupt {
            self.quarantine();
        }
        let before = document.clone();
        let out = f(&mut document);
        if document == before && origin != Origin::Corrupt {
            trace!(path=%self.path.display(), "store: no changes to save");
            return (out, true);
        }
        match self.save(&document) {
            Ok(()) => (out, true),
            Err(e) => {
                error!(
                    path=%self.path.display(),
                    error=%e,
                    "store: save failed; change kept in memory only"
                );
                (out, false)
            }
        }
    }

    pub async fn read<T, F>(&self, f: F) -> Result<T, StorageError>
    where
        F: FnOnce(&Document) -> T + Send + 'static,
        T: Send + 'static,
    {
        let store = self.clone();
        Ok(tokio::task::spawn_blocking(move || store.read_blocking(f)).await?)
    }

    pub async fn update<T, F>(&self, f: F) -> Result<T, StorageError>
    where
        F: FnOnce(&mut Document) -> T + Send + 'static,
        T: Send + 'static,
    {
        let store = self.clone();
        Ok(tokio::task::spawn_blocking(move || store.update_blocking(f)).await?)
    }

    pub async fn update_durable<T, F>(&self, f: F) -> Result<(T, bool), StorageError>
    where
        F: FnOnce(&mut Document) -> T + Send + 'static,
        T: Send + 'static,
    {
        let store = self.clone();
        Ok(tokio::task::spawn_blocking(move || store.update_durable_blocking(f)).await?)
    }

    fn lock(&self, mode: LockMode) -> Option<StoreLock> {
        match StoreLock::acquire(&self.path, mode) {
            Ok(l) => Some(l),
            Err(e) => {
                warn!(
                    path=%self.path.display(),
                    error=%e,
                    ?mode,
                    "store: lock unavailable; continuing without it"
                );
                None
            }
        }
    }

    fn load_inner(&self) -> Loaded {
        let bytes = match std::fs::read(&self.path) {
            Ok(b) => b,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                debug!(path=%self.path.display(), "store: no file yet; starting empty");
                return Loaded {
                    document: Document::default(),
                    origin: Origin::Missing,
                };
            }
            Err(e) => {
                warn!(path=%self.path.display(), error=%e, "store: read failed");
                return Loaded {
                    document: Document::default(),
                    origin: Origin::Unreadable,
                };
            }
        };
        match serde_json::from_slice::<Document>(&bytes) {
            Ok(document) => Loaded {
                document,
                origin: Origin::Parsed,
            },
            Err(e) => {
                warn!(path=%self.path.display(), error=%e, "store: corrupt document; resetting to empty");
                Loaded {
                    document: Document::default(),
                    origin: Origin::Corrupt,
                }
            }
        }
    }

    /// Keep a copy of an unreadable file next to the store before it is
    /// overwritten.
    fn quarantine(&self) {
        let suffix = chrono::Utc::now().timestamp();
        let mut name = self
            .path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_default();
        name.push(format!(".corrupt.{suffix}"));
        let target = self.path.with_file_name(name);
        match std::fs::copy(&self.path, &target) {
            Ok(_) => info!(from=%self.path.display(), to=%target.display(), "store: kept corrupt copy"),
            Err(e) => warn!(path=%self.path.display(), error=%e, "store: could not keep corrupt copy"),
        }
    }
}

fn parent_dir(path: &Path) -> &Path {
    match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    }
}
