//! Read loop between the pseudo-terminal and the interview session.

use std::io::{self, Read, Write};
use std::sync::Arc;

use log::{debug, trace, warn};
use tokio::runtime::Handle;
use tokio::task::JoinHandle;

use super::matcher::match_chunk;
use super::registry::QuestionRegistry;
use super::session::InterviewSession;
use crate::error::{Result, TerminalError};

/// Maximum number of bytes read from the terminal at once.
pub const CHUNK_SIZE: usize = 32 * 1024;

/// Feeds terminal output to the matcher and types answers back.
///
/// Each read is matched on its own. When a chunk matches a registered
/// question the bridge asks the session, waits for the answer and writes
/// it followed by a newline, as if typed on the keyboard.
pub struct PtyBridge {
    registry: Arc<QuestionRegistry>,
    session: Arc<InterviewSession>,
    runtime: Handle,
}

impl PtyBridge {
    /// Create a bridge for `session`, using the current tokio runtime.
    ///
    /// # Panics
    ///
    /// Panics if called outside of a tokio runtime.
    pub fn new(registry: Arc<QuestionRegistry>, session: Arc<InterviewSession>) -> Self {
        Self::with_runtime(registry, session, Handle::current())
    }

    /// Create a bridge that asks questions on the given runtime.
    pub fn with_runtime(
        registry: Arc<QuestionRegistry>,
        session: Arc<InterviewSession>,
        runtime: Handle,
    ) -> Self {
        Self {
            registry,
            session,
            runtime,
        }
    }

    /// Run the read loop on the blocking thread pool.
    pub fn spawn<R, W>(self, reader: R, writer: W) -> JoinHandle<Result<()>>
    where
        R: Read + Send + 'static,
        W: Write + Send + 'static,
    {
        let runtime = self.runtime.clone();
        runtime.spawn_blocking(move || self.run(reader, writer))
    }

    /// Run the read loop on the current thread until the terminal closes.
    ///
    /// Returns `Ok(())` at end-of-stream. A read or write error, or a
    /// session that closed while a question was pending, ends the loop with
    /// an error. Must not be called from inside an async context.
    pub fn run<R: Read, W: Write>(&self, mut reader: R, mut writer: W) -> Result<()> {
        let mut buf = vec![0u8; CHUNK_SIZE];

        loop {
            let n = match reader.read(&mut buf) {
                Ok(0) => {
                    debug!("terminal reached end of stream");
                    return Ok(());
                }
                Ok(n) => n,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => {
                    warn!("terminal read failed: {}", e);
                    return Err(TerminalError::Io(e).into());
                }
            };

            let chunk = &buf[..n];
            // The terminal echoes typed answers, so chunk contents stay out of the log.
            trace!("terminal chunk ({} bytes)", n);

            let Some(question) = match_chunk(&self.registry, chunk) else {
                continue;
            };

            let answer = self.session.blocking_ask(
                &self.runtime,
                question.text(),
                question.is_sensitive(),
            )?;

            let mut line = answer.into_bytes();
            line.push(b'\n');
            writer
                .write_all(&line)
                .and_then(|()| writer.flush())
                .map_err(|e| {
                    warn!("terminal write failed: {}", e);
                    TerminalError::Io(e)
                })?;
        }
    }
}
