//! Starting SteamCMD on a pseudo-terminal.

use std::io::{self, Read, Write};

use log::debug;
use portable_pty::{Child, ChildKiller, CommandBuilder, MasterPty, PtySize, native_pty_system};

use super::command::SteamCommand;
use crate::error::{Result, TerminalError};

/// Exit status of a finished process.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProcessExit {
    code: u32,
}

impl ProcessExit {
    /// Create an exit status from an exit code.
    pub fn new(code: u32) -> Self {
        Self { code }
    }

    /// The exit code.
    pub fn code(&self) -> u32 {
        self.code
    }

    /// Whether the process exited with code 0.
    pub fn success(&self) -> bool {
        self.code == 0
    }
}

/// A running process.
pub trait ChildProcess: Send {
    /// Block until the process exits.
    fn wait(&mut self) -> io::Result<ProcessExit>;

    /// Get a handle that can kill the process from another thread.
    fn killer(&self) -> Box<dyn ProcessKiller>;
}

/// Kills a running process.
pub trait ProcessKiller: Send + Sync {
    /// Ask the process to terminate (a hangup on a PTY). Killing an exited
    /// process is not an error.
    fn kill(&mut self) -> io::Result<()>;

    /// Terminate the process in a way it cannot ignore.
    fn force_kill(&mut self) -> io::Result<()> {
        self.kill()
    }
}

/// A process started on a terminal, with both ends of that terminal.
pub struct SpawnedProcess {
    /// Terminal output.
    pub reader: Box<dyn Read + Send>,

    /// Terminal input.
    pub writer: Box<dyn Write + Send>,

    /// The process itself.
    pub child: Box<dyn ChildProcess>,
}

/// Trait for starting SteamCMD - a real PTY by default, swappable in tests.
pub trait ProcessRunner: Send + Sync {
    /// Start `command` attached to a fresh terminal of the given size.
    fn spawn(&self, command: &SteamCommand, cols: u16, rows: u16) -> Result<SpawnedProcess>;
}

/// Runs programs on a native pseudo-terminal.
#[derive(Debug, Default, Clone, Copy)]
pub struct PtyRunner;

impl PtyRunner {
    /// Create a new PTY runner.
    pub fn new() -> Self {
        Self
    }
}

impl ProcessRunner for PtyRunner {
    fn spawn(&self, command: &SteamCommand, cols: u16, rows: u16) -> Result<SpawnedProcess> {
        let spawn_failed = |message: String| TerminalError::SpawnFailed {
            program: command.program().to_string(),
            message,
        };

        let pair = native_pty_system()
            .openpty(PtySize {
                rows,
                cols,
                pixel_width: 0,
                pixel_height: 0,
            })
            .map_err(|e| spawn_failed(e.to_string()))?;

        let mut builder = CommandBuilder::new(command.program());
        builder.args(command.to_args());
        builder.cwd(command.dir());
        builder.env("TERM", "xterm");

        let child = pair
            .slave
            .spawn_command(builder)
            .map_err(|e| spawn_failed(e.to_string()))?;

        // Drop the slave so reads see end-of-stream once the child exits
        drop(pair.slave);

        let reader = pair
            .master
            .try_clone_reader()
            .map_err(|e| spawn_failed(e.to_string()))?;
        let writer = pair
            .master
            .take_writer()
            .map_err(|e| spawn_failed(e.to_string()))?;

        debug!(
            "spawned {:?} in {} (pid {:?})",
            command.program(),
            command.dir().display(),
            child.process_id()
        );

        Ok(SpawnedProcess {
            reader: Box::new(PtyReader(reader)),
            writer,
            child: Box::new(PtyChild {
                child,
                _master: pair.master,
            }),
        })
    }
}

/// PTY master reader that reports a closed slave as end-of-stream.
///
/// Linux returns `EIO` from the master once every slave descriptor is
/// closed, which is how a finished child looks from this side.
struct PtyReader(Box<dyn Read + Send>);

impl Read for PtyReader {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        match self.0.read(buf) {
            #[cfg(unix)]
            Err(e) if e.raw_os_error() == Some(libc::EIO) => Ok(0),
            other => other,
        }
    }
}

/// Child on a PTY. Keeps the master open for as long as the child is waited on.
struct PtyChild {
    child: Box<dyn Child + Send + Sync>,
    _master: Box<dyn MasterPty + Send>,
}

impl ChildProcess for PtyChild {
    fn wait(&mut self) -> io::Result<ProcessExit> {
        let status = self.child.wait()?;
        Ok(ProcessExit::new(status.exit_code()))
    }

    fn killer(&self) -> Box<dyn ProcessKiller> {
        Box::new(PtyKiller {
            killer: self.child.clone_killer(),
            pid: self.child.process_id(),
        })
    }
}

struct PtyKiller {
    killer: Box<dyn ChildKiller + Send + Sync>,
    pid: Option<u32>,
}

impl ProcessKiller for PtyKiller {
    fn kill(&mut self) -> io::Result<()> {
        already_gone_is_ok(self.killer.kill())
    }

    #[cfg(unix)]
    fn force_kill(&mut self) -> io::Result<()> {
        let Some(pid) = self.pid.and_then(|pid| libc::pid_t::try_from(pid).ok()) else {
            return self.kill();
        };

        // The child leads its own session on the PTY; its process group
        // holds whatever it started (steamcmd.sh runs the real binary).
        // SAFETY: killpg/kill only take integer arguments.
        if unsafe { libc::killpg(pid, libc::SIGKILL) } == 0 {
            return Ok(());
        }
        if unsafe { libc::kill(pid, libc::SIGKILL) } == 0 {
            return Ok(());
        }
        already_gone_is_ok(Err(io::Error::last_os_error()))
    }
}

fn already_gone_is_ok(result: io::Result<()>) -> io::Result<()> {
    match result {
        Err(e) if e.kind() == io::ErrorKind::InvalidInput => Ok(()),
        #[cfg(unix)]
        Err(e) if e.raw_os_error() == Some(libc::ESRCH) => Ok(()),
        other => other,
    }
}
