//! Reaping SteamCMD, by force if it has to be.

use std::io;
use std::time::Duration;

use log::{debug, warn};
use tokio::task::{self, JoinError, JoinHandle};

use crate::error::{InstallerError, ProcessError, Result};
use crate::process::{ChildProcess, ProcessExit, ProcessKiller};

/// Owns a running SteamCMD process until it has been waited on.
///
/// The exit status is collected on the blocking pool from the moment the
/// process starts. Dropping an unreaped `Reaper` force-kills the process.
pub(super) struct Reaper {
    killer: Box<dyn ProcessKiller>,
    waiter: JoinHandle<io::Result<ProcessExit>>,
    reaped: bool,
}

impl Reaper {
    /// Start waiting on `child`. Must be called inside a tokio runtime.
    pub(super) fn spawn(mut child: Box<dyn ChildProcess>) -> Self {
        let killer = child.killer();
        let waiter = task::spawn_blocking(move || child.wait());
        Self {
            killer,
            waiter,
            reaped: false,
        }
    }

    /// Wait for the process to exit on its own.
    pub(super) async fn wait(&mut self) -> Result<ProcessExit> {
        let exit = (&mut self.waiter).await;
        self.reaped = true;
        settle(exit)
    }

    /// Hang up on the process, kill it outright if it is still there after
    /// `grace`, and wait for it.
    pub(super) async fn terminate(&mut self, grace: Duration) -> Result<ProcessExit> {
        debug!("hanging up on SteamCMD");
        if let Err(e) = self.killer.kill() {
            warn!("failed to hang up on SteamCMD: {}", e);
        }

        let exit = match tokio::time::timeout(grace, &mut self.waiter).await {
            Ok(exit) => exit,
            Err(_) => {
                warn!("SteamCMD still running {:?} after hangup, killing it", grace);
                if let Err(e) = self.killer.force_kill() {
                    warn!("failed to kill SteamCMD: {}", e);
                }
                (&mut self.waiter).await
            }
        };
        self.reaped = true;
        settle(exit)
    }
}

impl Drop for Reaper {
    fn drop(&mut self) {
        if !self.reaped {
            debug!("killing unreaped SteamCMD process");
            let _ = self.killer.force_kill();
        }
    }
}

fn settle(exit: std::result::Result<io::Result<ProcessExit>, JoinError>) -> Result<ProcessExit> {
    match exit {
        Ok(exit) => exit.map_err(|e| ProcessError::Wait(e).into()),
        Err(e) => Err(InstallerError::TaskFailed(e.to_string()).into()),
    }
}
