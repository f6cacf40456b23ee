//! Cross-process writer lock for the session store.
//!
//! Every hook invocation is its own process, so mutual exclusion has to live
//! on disk. Writers take an exclusive `flock` on `<db>.lock` before touching
//! the database; readers never take it and rely on SQLite WAL snapshots.
//!
//! `flock` locks belong to the open file description, so two handles opened
//! by different threads of the same process exclude each other just like two
//! processes do. No extra in-process mutex is needed.
//!
//! Acquisition polls with jitter until the configured timeout and then fails
//! with [`RadiusError::LockTimeout`]. The lock is released when the returned
//! guard is dropped, including on early `?` returns.

use std::fs::{File, OpenOptions};
use std::io;
use std::path::{Path, PathBuf};
use std::thread;
use std::time::{Duration, Instant};

use crate::error::{RadiusError, Result};

const POLL_INTERVAL: Duration = Duration::from_millis(25);
const POLL_JITTER_MS: u64 = 25;

/// Path and timeout for the store writer lock.
#[derive(Debug, Clone)]
pub struct StoreLock {
    path: PathBuf,
    timeout: Duration,
}

/// Held writer lock. Dropping it unlocks and closes the lock file.
#[derive(Debug)]
pub struct StoreLockGuard {
    file: File,
    path: PathBuf,
}

impl StoreLock {
    pub fn new(path: impl Into<PathBuf>, timeout: Duration) -> Self {
        Self {
            path: path.into(),
            timeout,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Blocks until the lock is held or the timeout elapses.
    pub fn acquire(&self) -> Result<StoreLockGuard> {
        let start = Instant::now();
        loop {
            if let Some(guard) = self.try_acquire()? {
                tracing::trace!(
                    path = %self.path.display(),
                    waited_ms = start.elapsed().as_millis() as u64,
                    "Store lock acquired"
                );
                return Ok(guard);
            }
            let waited = start.elapsed();
            if waited >= self.timeout {
                return Err(RadiusError::LockTimeout {
                    path: self.path.clone(),
                    waited,
                });
            }
            let jitter_ms = rand::random::<u64>() % (POLL_JITTER_MS + 1);
            thread::sleep(POLL_INTERVAL + Duration::from_millis(jitter_ms));
        }
    }

    /// Non-blocking attempt. `Ok(None)` means another holder has it.
    pub fn try_acquire(&self) -> Result<Option<StoreLockGuard>> {
        let file = OpenOptions::new()
            .create(true)
            .read(true)
            .write(true)
            .truncate(false)
            .open(&self.path)
            .map_err(|source| self.lock_error(source))?;

        match try_flock_exclusive(&file) {
            Ok(true) => Ok(Some(StoreLockGuard {
                file,
                path: self.path.clone(),
            })),
            Ok(false) => Ok(None),
            Err(source) => Err(self.lock_error(source)),
        }
    }

    fn lock_error(&self, source: io::Error) -> RadiusError {
        RadiusError::Lock {
            path: self.path.clone(),
            source,
        }
    }
}

impl Drop for StoreLockGuard {
    fn drop(&mut self) {
        if let Err(err) = unlock(&self.file) {
            tracing::warn!(
                path = %self.path.display(),
                error = %err,
                "Failed to release store lock; closing descriptor"
            );
        }
    }
}

fn try_flock_exclusive(file: &File) -> io::Result<bool> {
    #[cfg(unix)]
    {
        use std::os::unix::io::AsRawFd;
        // SAFETY: `file` owns a valid descriptor for the duration of the call.
        #[allow(unsafe_code)]
        let result = unsafe { libc::flock(file.as_raw_fd(), libc::LOCK_EX | libc::LOCK_NB) };
        if result == 0 {
            return Ok(true);
        }
        let err = io::Error::last_os_error();
        if err.kind() == io::ErrorKind::WouldBlock || err.raw_os_error() == Some(libc::EWOULDBLOCK)
        {
            return Ok(false);
        }
        Err(err)
    }
    #[cfg(not(unix))]
    {
        let _ = file;
        Err(io::Error::new(
            io::ErrorKind::Unsupported,
            "store lock requires flock",
        ))
    }
}

fn unlock(file: &File) -> io::Result<()> {
    #[cfg(unix)]
    {
        use std::os::unix::io::AsRawFd;
        // SAFETY: `file` owns a valid descriptor for the duration of the call.
        #[allow(unsafe_code)]
        let result = unsafe { libc::flock(file.as_raw_fd(), libc::LOCK_UN) };
        if result == 0 {
            Ok(())
        } else {
            Err(io::Error::last_os_error())
        }
    }
    #[cfg(not(unix))]
    {
        let _ = file;
        Ok(())
    }
}
