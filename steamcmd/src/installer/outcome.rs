//! Result of a finished interview.

use std::time::Duration;

use crate::app::AppId;
use crate::interview::Exchange;
use crate::process::ProcessExit;

/// A SteamCMD run that exited successfully.
#[derive(Debug, Clone)]
pub struct InstallOutcome {
    /// The application that was installed or updated.
    pub app: AppId,

    /// Exit status of SteamCMD.
    pub exit: ProcessExit,

    /// Questions asked during the run, with their (masked) answers.
    pub exchanges: Vec<Exchange>,

    /// Total time, including time spent waiting for answers.
    pub elapsed: Duration,
}

impl InstallOutcome {
    /// Number of questions asked.
    pub fn questions_asked(&self) -> usize {
        self.exchanges.len()
    }

    /// The questions asked, in order.
    pub fn questions(&self) -> impl Iterator<Item = &str> {
        self.exchanges.iter().map(|e| e.question.message.as_str())
    }
}
