pub mod admin;
pub mod auth;
pub mod channels;
pub mod clock;
pub mod deferred;
pub mod dms;
pub mod error;
pub mod jobs;
pub mod messages;
pub mod models;
pub mod notifications;
pub mod snapshot;
pub mod standups;
pub mod users;
pub mod workspace;

use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};

use tracing::info;

pub use auth::NewUser;
pub use clock::Clock;
pub use error::{Error, Result};
pub use jobs::{Job, JobOutcome, ScheduledJob};
pub use workspace::Workspace;

/// Shared owner of the workspace. Every request and every scheduler job runs
/// its whole check-then-act sequence under the one lock.
pub struct Store {
    workspace: Mutex<Workspace>,
    /// Serialises snapshot writes so they land in the order they were taken.
    save_lock: Mutex<()>,
    clock: Clock,
    snapshot_path: Option<PathBuf>,
}

impl Store {
    /// Restores the snapshot at `path` if there is one. Standups that were
    /// running when it was taken are closed: their flush timers are gone.
    pub fn open(path: &Path, default_profile_img_url: &str) -> anyhow::Result<Self> {
        let clock = Clock::new();
        let workspace = match snapshot::load(path)? {
            Some(mut ws) => {
                ws.set_default_profile_img_url(default_profile_img_url);
                ws.reset_stale_standups();
                ws
            }
            None => {
                info!("No snapshot at {}, starting empty", path.display());
                Workspace::new(default_profile_img_url, clock.now())
            }
        };

        Ok(Self {
            workspace: Mutex::new(workspace),
            save_lock: Mutex::new(()),
            clock,
            snapshot_path: Some(path.to_path_buf()),
        })
    }

    /// A store that never touches disk.
    pub fn in_memory(default_profile_img_url: &str) -> Self {
        Self::in_memory_with_clock(default_profile_img_url, Clock::new())
    }

    pub fn in_memory_with_clock(default_profile_img_url: &str, clock: Clock) -> Self {
        Self {
            workspace: Mutex::new(Workspace::new(default_profile_img_url, clock.now())),
            save_lock: Mutex::new(()),
            clock,
            snapshot_path: None,
        }
    }

    pub fn clock(&self) -> Clock {
        self.clock
    }

    pub fn now(&self) -> i64 {
        self.clock.now()
    }

    /// Runs `f` against the workspace with the current time. A panic in an
    /// earlier holder does not lock everyone out: every operation validates
    /// before it mutates, so the state is still consistent.
    pub fn with_workspace<F, T>(&self, f: F) -> T
    where
        F: FnOnce(&Workspace, i64) -> T,
    {
        let ws = self.workspace.lock().unwrap_or_else(PoisonError::into_inner);
        f(&ws, self.clock.now())
    }

    pub fn with_workspace_mut<F, T>(&self, f: F) -> T
    where
        F: FnOnce(&mut Workspace, i64) -> T,
    {
        let mut ws = self.workspace.lock().unwrap_or_else(PoisonError::into_inner);
        f(&mut ws, self.clock.now())
    }

    /// Writes the whole workspace to the snapshot file, if there is one.
    /// Blocking; call from a blocking context.
    pub fn save(&self) -> anyhow::Result<()> {
        let Some(path) = &self.snapshot_path else {
            return Ok(());
        };
        let _guard = self.save_lock.lock().unwrap_or_else(PoisonError::into_inner);
        let bytes = self.with_workspace(|ws, _| snapshot::encode(ws))?;
        snapshot::write(path, &bytes)
    }
}
