//! # Workspace Lock
//!
//! A lock file guards the workspace metadata against interleaved writes by
//! concurrent invocations. The lock is the only cross-process coordination
//! point; clones themselves are protected by git's own locking.
//!
//! The lock file is created with `create_new` so acquisition is atomic on
//! every filesystem. A lock older than [`LOCK_LIFETIME`] is considered
//! stale (its owner died) and is broken.

use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant, SystemTime};

use log::warn;

use crate::error::{Error, Result};

/// Age after which a lock file is considered abandoned.
const LOCK_LIFETIME: Duration = Duration::from_secs(300);

/// How long acquisition waits before giving up.
const LOCK_TIMEOUT: Duration = Duration::from_secs(30);

const LOCK_POLL: Duration = Duration::from_millis(100);

/// Held workspace lock. Released on drop.
#[derive(Debug)]
pub struct WorkspaceLock {
    lock_path: PathBuf,
}

impl WorkspaceLock {
    /// Acquire the lock file inside `dir`, waiting up to [`LOCK_TIMEOUT`].
    pub fn acquire(dir: &Path) -> Result<WorkspaceLock> {
        std::fs::create_dir_all(dir)?;
        let lock_path = dir.join(".lock");
        let started = Instant::now();
        loop {
            match OpenOptions::new()
                .write(true)
                .create_new(true)
                .open(&lock_path)
            {
                Ok(mut file) => {
                    let _ = write!(file, "{}", std::process::id());
                    return Ok(WorkspaceLock { lock_path });
                }
                Err(err) if err.kind() == std::io::ErrorKind::AlreadyExists => {
                    if Self::is_stale(&lock_path) {
                        warn!("breaking stale lock {}", lock_path.display());
                        let _ = std::fs::remove_file(&lock_path);
                        continue;
                    }
                    if started.elapsed() > LOCK_TIMEOUT {
                        return Err(Error::Lock {
                            path: lock_path,
                            message: "timed out waiting for another invocation".to_string(),
                        });
                    }
                    std::thread::sleep(LOCK_POLL);
                }
                Err(err) => return Err(err.into()),
            }
        }
    }

    fn is_stale(lock_path: &Path) -> bool {
        let Ok(metadata) = std::fs::metadata(lock_path) else {
            return false;
        };
        let Ok(modified) = metadata.modified() else {
            return false;
        };
        SystemTime::now()
            .duration_since(modified)
            .map(|age| age > LOCK_LIFETIME)
            .unwrap_or(false)
    }
}

impl Drop for WorkspaceLock {
    fn drop(&mut self) {
        let _ = std::fs::remove_file(&self.lock_path);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_acquire_and_release() {
        let dir = tempfile::tempdir().unwrap();
        let lock_path = dir.path().join(".lock");
        {
            let _lock = WorkspaceLock::acquire(dir.path()).unwrap();
            assert!(lock_path.exists());
        }
        assert!(!lock_path.exists());
    }

    #[test]
    fn test_stale_lock_is_broken() {
        let dir = tempfile::tempdir().unwrap();
        let lock_path = dir.path().join(".lock");
        std::fs::write(&lock_path, "0").unwrap();
        // Backdate the lock beyond its lifetime.
        let stale = SystemTime::now() - LOCK_LIFETIME - Duration::from_secs(60);
        let file = OpenOptions::new().write(true).open(&lock_path).unwrap();
        file.set_modified(stale).unwrap();
        drop(file);

        let _lock = WorkspaceLock::acquire(dir.path()).unwrap();
        assert!(lock_path.exists());
    }
}
