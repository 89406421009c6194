use std::ffi::OsString;
use std::fs::{File, OpenOptions};
use std::path::{Path, PathBuf};

use super::StorageError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum LockMode {
    Shared,
    Exclusive,
}

/// Advisory lock on `<store>.lock`, released on drop.
pub(crate) struct StoreLock {
    #[cfg(unix)]
    _guard: nix::fcntl::Flock<File>,
    #[cfg(not(unix))]
    _file: File,
}

impl StoreLock {
    pub(crate) fn acquire(store_path: &Path, mode: LockMode) -> Result<Self, StorageError> {
        let path = lock_path(store_path);
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent)?;
        }
        let file = OpenOptions::new()
            .create(true)
            .truncate(false)
            .read(true)
            .write(true)
            .open(&path)?;
        Self::lock_file(file, mode)
    }

    #[cfg(unix)]
    fn lock_file(file: File, mode: LockMode) -> Result<Self, StorageError> {
        use nix::fcntl::{Flock, FlockArg};
        let arg = match mode {
            LockMode::Shared => FlockArg::LockShared,
            LockMode::Exclusive => FlockArg::LockExclusive,
        };
        let guard = Flock::lock(file, arg)
            .map_err(|(_, errno)| StorageError::Lock(errno.to_string()))?;
        Ok(Self { _guard: guard })
    }

    // No cross-process lock here; atomic rename still keeps readers consistent.
    #[cfg(not(unix))]
    fn lock_file(file: File, _mode: LockMode) -> Result<Self, StorageError> {
        Ok(Self { _file: file })
    }
}

pub(crate) fn lock_path(store_path: &Path) -> PathBuf {
    let mut name: OsString = store_path
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_else(|| OsString::from("store"));
    name.push(".lock");
    store_path.with_file_name(name)
}
