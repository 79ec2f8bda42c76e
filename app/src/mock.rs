//! The command interceptor.
//!
//! [`ShellCommandMock`] holds the commands to fake; [`ShellCommandMock::activate`]
//! writes one script per command into a fresh temp dir, puts that dir first
//! on `PATH` and returns a [`MockSession`]. Dropping the session (normally or
//! while a panic unwinds) restores `PATH` and removes the temp dir unless it
//! was asked to be kept.
//!
//! `PATH` belongs to the whole process, so only one session may be active at
//! a time. Sessions opened on other threads wait for the current one to end;
//! opening a second session on the same thread fails with
//! [`MockError::SessionActive`]. Code that spawns commands on another thread
//! while a session is active still sees the mocked `PATH`.

use std::cell::Cell;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard, OnceLock};

use tempfile::TempDir;

use crate::behavior::{normalize_behavior, MockSpec};
use crate::config;
use crate::error::{MockError, Result};
use crate::path_env::PathGuard;
use crate::script;

const TEMP_DIR_PREFIX: &str = "ShellCommandMock_";

static SESSION_MUTEX: OnceLock<Mutex<()>> = OnceLock::new();

thread_local! {
    static SESSION_ON_THREAD: Cell<bool> = const { Cell::new(false) };
}

/// Exclusive right to mutate `PATH`, held for the lifetime of a session.
struct SessionLock {
    _guard: MutexGuard<'static, ()>,
}

impl SessionLock {
    fn acquire() -> Result<Self> {
        if SESSION_ON_THREAD.with(Cell::get) {
            return Err(MockError::SessionActive);
        }
        // A panic inside an earlier session poisons the mutex, but that
        // session's Drop has already put PATH back.
        let guard = SESSION_MUTEX
            .get_or_init(|| Mutex::new(()))
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        SESSION_ON_THREAD.with(|active| active.set(true));
        Ok(SessionLock { _guard: guard })
    }
}

impl std::fmt::Debug for SessionLock {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("SessionLock")
    }
}

impl Drop for SessionLock {
    fn drop(&mut self) {
        SESSION_ON_THREAD.with(|active| active.set(false));
    }
}

/// Commands to fake and how to clean up after them.
#[derive(Debug, Clone, Default)]
pub struct ShellCommandMock {
    commands: MockSpec,
    keep_temp_dir: bool,
}

impl ShellCommandMock {
    pub fn new(commands: MockSpec) -> Self {
        ShellCommandMock {
            commands,
            keep_temp_dir: false,
        }
    }

    /// Leave the temp dir on disk after the session ends and print where it
    /// is. `SHMOCK_KEEP_TEMP_DIR=1` has the same effect for every session.
    pub fn keep_temp_dir(mut self, keep: bool) -> Self {
        self.keep_temp_dir = keep;
        self
    }

    pub fn commands(&self) -> &MockSpec {
        &self.commands
    }

    /// Install the mocked commands and shadow `PATH` until the returned
    /// session is dropped.
    ///
    /// If writing a script fails, the half-built session is dropped before
    /// the error is returned, so `PATH` is already restored.
    pub fn activate(&self) -> Result<MockSession> {
        let lock = SessionLock::acquire()?;
        let keep_temp_dir = self.keep_temp_dir || config::keep_temp_dir_from_env();
        let temp_dir = tempfile::Builder::new()
            .prefix(TEMP_DIR_PREFIX)
            .tempdir()
            .map_err(MockError::TempDir)?;
        let dir = temp_dir.path().to_path_buf();

        let mut session = MockSession {
            path_guard: Some(PathGuard::prepend(&dir)?),
            temp_dir: Some(temp_dir),
            dir,
            keep_temp_dir,
            scripts: BTreeMap::new(),
            _lock: lock,
        };

        for (name, behavior) in self.commands.iter() {
            let normalized = normalize_behavior(behavior);
            let path = script::install_script(&session.dir, name, &normalized)?;
            session.scripts.insert(name.to_string(), path);
        }

        tracing::debug!(
            "activated {} mocked command(s) in {}",
            session.scripts.len(),
            session.dir.display()
        );
        Ok(session)
    }
}

/// An active set of mocked commands.
///
/// Not `Send`: the session must end on the thread that started it.
#[derive(Debug)]
pub struct MockSession {
    path_guard: Option<PathGuard>,
    temp_dir: Option<TempDir>,
    dir: PathBuf,
    keep_temp_dir: bool,
    scripts: BTreeMap<String, PathBuf>,
    // Released last, after PATH and the temp dir are dealt with.
    _lock: SessionLock,
}

impl MockSession {
    /// Directory holding the generated scripts.
    pub fn temp_dir(&self) -> &Path {
        &self.dir
    }

    /// Path of the script generated for `command`.
    pub fn script_path(&self, command: &str) -> Option<&Path> {
        self.scripts.get(command).map(PathBuf::as_path)
    }

    pub fn keeps_temp_dir(&self) -> bool {
        self.keep_temp_dir
    }

    /// End the session now. Returns the temp dir if it was kept.
    pub fn finish(mut self) -> Option<PathBuf> {
        self.deactivate()
    }

    fn deactivate(&mut self) -> Option<PathBuf> {
        drop(self.path_guard.take());
        let temp_dir = self.temp_dir.take()?;

        if self.keep_temp_dir {
            let kept = temp_dir.keep();
            eprintln!("Temp dir of ShellCommandMock is at {}", kept.display());
            tracing::info!("keeping mock dir {}", kept.display());
            return Some(kept);
        }

        if let Err(e) = temp_dir.close() {
            tracing::warn!("failed to remove mock dir {}: {}", self.dir.display(), e);
        }
        None
    }
}

impl Drop for MockSession {
    fn drop(&mut self) {
        self.deactivate();
    }
}

/// Run `f` with `commands` mocked. The session ends when `f` returns or
/// panics.
pub fn with_mocks<R>(commands: MockSpec, f: impl FnOnce(&MockSession) -> R) -> Result<R> {
    let session = ShellCommandMock::new(commands).activate()?;
    Ok(f(&session))
}
