//! Builder for creating installers.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use super::Installer;
use super::state::RunState;
use crate::interview::QuestionRegistry;
use crate::process::{Bootstrap, ClientConfig, ProcessRunner, PtyRunner, ScriptBootstrap};

/// Builder for constructing an [`Installer`].
///
/// # Example
///
/// ```rust
/// use steamcmd::InstallerBuilder;
/// use std::time::Duration;
///
/// let installer = InstallerBuilder::new()
///     .steamcmd_dir("/opt/steam/cmd")
///     .apps_dir("/srv/games")
///     .anonymous(true)
///     .timeout(Duration::from_secs(3600))
///     .build();
///
/// assert!(!installer.running());
/// ```
pub struct InstallerBuilder {
    config: ClientConfig,
    anonymous: bool,
    registry: Option<Arc<QuestionRegistry>>,
    runner: Option<Arc<dyn ProcessRunner>>,
    bootstrap: Option<Arc<dyn Bootstrap>>,
}

impl Default for InstallerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl InstallerBuilder {
    /// Create a new installer builder with the default configuration.
    pub fn new() -> Self {
        Self {
            config: ClientConfig::default(),
            anonymous: false,
            registry: None,
            runner: None,
            bootstrap: None,
        }
    }

    /// Replace the whole client configuration.
    pub fn config(mut self, config: ClientConfig) -> Self {
        self.config = config;
        self
    }

    /// Set the SteamCMD directory (default: `/opt/steam/cmd`).
    pub fn steamcmd_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config.steamcmd_dir = dir.into();
        self
    }

    /// Set the directory applications are installed under (default: `/opt/steam/apps`).
    pub fn apps_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config.apps_dir = dir.into();
        self
    }

    /// Set the program to run (default: `./steamcmd.sh`).
    pub fn program(mut self, program: impl Into<String>) -> Self {
        self.config.program = program.into();
        self
    }

    /// Give up on an interview after `timeout`.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.config.timeout = Some(timeout);
        self
    }

    /// Time SteamCMD gets to exit after a hangup before it is killed
    /// outright (default: two seconds).
    pub fn kill_grace(mut self, grace: Duration) -> Self {
        self.config.kill_grace = grace;
        self
    }

    /// Log in anonymously instead of asking for a username and password.
    pub fn anonymous(mut self, anonymous: bool) -> Self {
        self.anonymous = anonymous;
        self
    }

    /// Use this question registry (default: [`QuestionRegistry::global`]).
    pub fn registry(mut self, registry: Arc<QuestionRegistry>) -> Self {
        self.registry = Some(registry);
        self
    }

    /// Use a custom process runner (default: [`PtyRunner`]).
    pub fn runner(mut self, runner: impl ProcessRunner + 'static) -> Self {
        self.runner = Some(Arc::new(runner));
        self
    }

    /// Use a custom bootstrap (default: [`ScriptBootstrap`]).
    pub fn bootstrap(mut self, bootstrap: impl Bootstrap + 'static) -> Self {
        self.bootstrap = Some(Arc::new(bootstrap));
        self
    }

    /// Build the installer.
    pub fn build(self) -> Installer {
        Installer {
            state: Arc::new(RunState::new()),
            anonymous: self.anonymous,
            config: Arc::new(self.config),
            registry: self.registry.unwrap_or_else(QuestionRegistry::global),
            runner: self.runner.unwrap_or_else(|| Arc::new(PtyRunner::new())),
            bootstrap: self
                .bootstrap
                .unwrap_or_else(|| Arc::new(ScriptBootstrap::default())),
        }
    }
}
