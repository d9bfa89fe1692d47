//! Test doubles for the terminal and process layers.

use std::collections::VecDeque;
use std::io::{self, Read, Write};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::mpsc;
use std::sync::{Arc, Mutex, Once};

use log::{LevelFilter, Log, Metadata, Record};

use crate::error::{InstallerError, Result, TerminalError};
use crate::process::{
    Bootstrap, ChildProcess, ClientConfig, ProcessExit, ProcessKiller, ProcessRunner,
    SpawnedProcess, SteamCommand,
};

/// Exit code a fake process reports when killed.
const KILLED: u32 = 137;

/// Logger that keeps every record at every level.
struct Captured(Mutex<Vec<String>>);

static CAPTURED: Captured = Captured(Mutex::new(Vec::new()));

impl Log for Captured {
    fn enabled(&self, _metadata: &Metadata<'_>) -> bool {
        true
    }

    fn log(&self, record: &Record<'_>) {
        let line = format!("{} {}: {}", record.level(), record.target(), record.args());
        self.0.lock().unwrap().push(line);
    }

    fn flush(&self) {}
}

/// Route this test binary's logs, down to trace, into memory.
pub(crate) fn capture_logs() {
    static INSTALL: Once = Once::new();
    INSTALL.call_once(|| {
        log::set_logger(&CAPTURED).unwrap();
        log::set_max_level(LevelFilter::Trace);
    });
}

/// Every line logged since [`capture_logs`], from all tests in the binary.
pub(crate) fn captured_logs() -> Vec<String> {
    CAPTURED.0.lock().unwrap().clone()
}

/// Reader that hands out one scripted chunk per `read`, then end-of-stream.
pub(crate) struct ScriptedReader {
    chunks: VecDeque<io::Result<Vec<u8>>>,
}

impl ScriptedReader {
    pub(crate) fn new(chunks: &[&[u8]]) -> Self {
        Self {
            chunks: chunks.iter().map(|c| Ok(c.to_vec())).collect(),
        }
    }

    pub(crate) fn then_fail(mut self, kind: io::ErrorKind) -> Self {
        self.chunks
            .push_back(Err(io::Error::new(kind, "scripted failure")));
        self
    }
}

impl Read for ScriptedReader {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        match self.chunks.pop_front() {
            None => Ok(0),
            Some(Err(e)) => Err(e),
            Some(Ok(chunk)) => {
                buf[..chunk.len()].copy_from_slice(&chunk);
                Ok(chunk.len())
            }
        }
    }
}

/// Writer that records everything typed into the terminal.
#[derive(Clone, Default)]
pub(crate) struct Typed(Arc<Mutex<Vec<u8>>>);

impl Typed {
    pub(crate) fn contents(&self) -> Vec<u8> {
        self.0.lock().unwrap().clone()
    }
}

impl Write for Typed {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// Process runner that plays back terminal output instead of running SteamCMD.
#[derive(Clone)]
pub(crate) struct FakeRunner {
    output: Vec<Vec<u8>>,
    exit: Option<u32>,
    fail: bool,
    ignore_hangup: bool,
    typed: Typed,
    spawns: Arc<AtomicUsize>,
    kills: Arc<AtomicUsize>,
    force_kills: Arc<AtomicUsize>,
    args: Arc<Mutex<Vec<String>>>,
}

impl FakeRunner {
    /// A process that prints `output` and exits with code 0.
    pub(crate) fn new(output: &[&[u8]]) -> Self {
        Self {
            output: output.iter().map(|c| c.to_vec()).collect(),
            exit: Some(0),
            fail: false,
            ignore_hangup: false,
            typed: Typed::default(),
            spawns: Arc::new(AtomicUsize::new(0)),
            kills: Arc::new(AtomicUsize::new(0)),
            force_kills: Arc::new(AtomicUsize::new(0)),
            args: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub(crate) fn exit_code(mut self, code: u32) -> Self {
        self.exit = Some(code);
        self
    }

    /// The process never exits on its own.
    pub(crate) fn until_killed(mut self) -> Self {
        self.exit = None;
        self
    }

    /// The process never exits on its own and survives a hangup.
    pub(crate) fn ignoring_hangup(mut self) -> Self {
        self.exit = None;
        self.ignore_hangup = true;
        self
    }

    /// Terminal allocation fails.
    pub(crate) fn failing(mut self) -> Self {
        self.fail = true;
        self
    }

    pub(crate) fn typed(&self) -> Vec<u8> {
        self.typed.contents()
    }

    pub(crate) fn spawns(&self) -> usize {
        self.spawns.load(Ordering::SeqCst)
    }

    pub(crate) fn kills(&self) -> usize {
        self.kills.load(Ordering::SeqCst)
    }

    pub(crate) fn force_kills(&self) -> usize {
        self.force_kills.load(Ordering::SeqCst)
    }

    pub(crate) fn args(&self) -> Vec<String> {
        self.args.lock().unwrap().clone()
    }

    /// A child process on its own, without a terminal.
    pub(crate) fn child(&self) -> Box<dyn ChildProcess> {
        let (exit_tx, exit_rx) = mpsc::channel();
        if let Some(code) = self.exit {
            let _ = exit_tx.send(code);
        }

        Box::new(FakeChild {
            exit_rx,
            exit_tx,
            ignore_hangup: self.ignore_hangup,
            kills: Arc::clone(&self.kills),
            force_kills: Arc::clone(&self.force_kills),
        })
    }
}

impl ProcessRunner for FakeRunner {
    fn spawn(&self, command: &SteamCommand, _cols: u16, _rows: u16) -> Result<SpawnedProcess> {
        if self.fail {
            return Err(TerminalError::SpawnFailed {
                program: command.program().to_string(),
                message: "out of pseudo-terminals".to_string(),
            }
            .into());
        }

        self.spawns.fetch_add(1, Ordering::SeqCst);
        *self.args.lock().unwrap() = command.to_args();

        let chunks: Vec<&[u8]> = self.output.iter().map(Vec::as_slice).collect();
        Ok(SpawnedProcess {
            reader: Box::new(ScriptedReader::new(&chunks)),
            writer: Box::new(self.typed.clone()),
            child: self.child(),
        })
    }
}

struct FakeChild {
    exit_rx: mpsc::Receiver<u32>,
    exit_tx: mpsc::Sender<u32>,
    ignore_hangup: bool,
    kills: Arc<AtomicUsize>,
    force_kills: Arc<AtomicUsize>,
}

impl ChildProcess for FakeChild {
    fn wait(&mut self) -> io::Result<ProcessExit> {
        self.exit_rx
            .recv()
            .map(ProcessExit::new)
            .map_err(|_| io::Error::other("fake child vanished"))
    }

    fn killer(&self) -> Box<dyn ProcessKiller> {
        Box::new(FakeKiller {
            exit_tx: self.exit_tx.clone(),
            ignore_hangup: self.ignore_hangup,
            kills: Arc::clone(&self.kills),
            force_kills: Arc::clone(&self.force_kills),
        })
    }
}

struct FakeKiller {
    exit_tx: mpsc::Sender<u32>,
    ignore_hangup: bool,
    kills: Arc<AtomicUsize>,
    force_kills: Arc<AtomicUsize>,
}

impl ProcessKiller for FakeKiller {
    fn kill(&mut self) -> io::Result<()> {
        self.kills.fetch_add(1, Ordering::SeqCst);
        if !self.ignore_hangup {
            let _ = self.exit_tx.send(KILLED);
        }
        Ok(())
    }

    fn force_kill(&mut self) -> io::Result<()> {
        self.force_kills.fetch_add(1, Ordering::SeqCst);
        let _ = self.exit_tx.send(KILLED);
        Ok(())
    }
}

/// Bootstrap that records calls instead of running a script.
#[derive(Clone, Default)]
pub(crate) struct FakeBootstrap {
    fail: bool,
    calls: Arc<AtomicUsize>,
}

impl FakeBootstrap {
    pub(crate) fn failing() -> Self {
        Self {
            fail: true,
            ..Default::default()
        }
    }

    pub(crate) fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl Bootstrap for FakeBootstrap {
    fn provision(&self, _config: &ClientConfig) -> Result<()> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail {
            return Err(InstallerError::BootstrapFailed {
                message: "script exited with exit status: 100".to_string(),
            }
            .into());
        }
        Ok(())
    }
}
