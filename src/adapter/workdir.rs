//! `WorkingDir`: scoped change of the process working directory.

use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard, PoisonError};

use tracing::{error, trace};

use crate::error::{CouplingError, CouplingResult};

/// Serializes every scoped directory change in the process. The working
/// directory is process-wide state; holding this lock for the lifetime of a
/// [`WorkingDir`] guarantees restorations never interleave.
static CWD_LOCK: Mutex<()> = Mutex::new(());

/// Guard that runs a block of code inside a model's working directory.
///
/// The previous directory is restored when the guard is dropped, on every
/// exit path: normal return, `?` propagation, or unwinding. Guards do not
/// nest; a second `enter` on the same thread while one is alive deadlocks.
pub struct WorkingDir {
    previous: Option<PathBuf>,
    _lock: MutexGuard<'static, ()>,
}

impl WorkingDir {
    /// Change into `dir`, remembering the current directory.
    pub fn enter(dir: &Path) -> CouplingResult<WorkingDir> {
        let lock = CWD_LOCK.lock().unwrap_or_else(PoisonError::into_inner);
        let to_err = |source| CouplingError::WorkingDirectory {
            path: dir.to_path_buf(),
            source,
        };

        let current = std::env::current_dir().map_err(to_err)?;
        let previous = if current.as_path() == dir {
            None
        } else {
            std::env::set_current_dir(dir).map_err(to_err)?;
            trace!(from = %current.display(), to = %dir.display(), "entered working directory");
            Some(current)
        };

        Ok(WorkingDir {
            previous,
            _lock: lock,
        })
    }

    /// The directory that will be restored, if a change was made.
    pub fn previous(&self) -> Option<&Path> {
        self.previous.as_deref()
    }
}

impl Drop for WorkingDir {
    fn drop(&mut self) {
        if let Some(previous) = self.previous.take() {
            if let Err(e) = std::env::set_current_dir(&previous) {
                error!(dir = %previous.display(), error = %e, "failed to restore working directory");
            }
        }
    }
}

/// Read the working directory while no scoped change is in flight.
#[cfg(test)]
pub(crate) fn settled_current_dir() -> PathBuf {
    let _lock = CWD_LOCK.lock().unwrap_or_else(PoisonError::into_inner);
    std::env::current_dir().unwrap()
}
