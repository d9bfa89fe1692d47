//! Single-flight installer that drives SteamCMD through an interview.
//!
//! An [`Installer`] runs at most one SteamCMD process at a time. Starting an
//! install or update returns an [`InterviewHandle`] right away; the
//! application answers the questions that come out of it (credentials,
//! Steam Guard codes) and then waits for the [`InstallOutcome`].
//!
//! # Example
//!
//! ```rust,no_run
//! use steamcmd::{AppId, Installer};
//!
//! # async fn example() -> Result<(), steamcmd::Error> {
//! let installer = Installer::builder()
//!     .steamcmd_dir("/opt/steam/cmd")
//!     .apps_dir("/srv/games")
//!     .build();
//!
//! let mut handle = installer.install(AppId::new(740))?;
//! while let Some(question) = handle.next_question().await {
//!     let answer = prompt_user(&question.message);
//!     handle.answer(answer).await?;
//! }
//!
//! let outcome = handle.wait().await?;
//! println!("installed {} in {:?}", outcome.app, outcome.elapsed);
//! # Ok(())
//! # }
//! # fn prompt_user(_: &str) -> String { String::new() }
//! ```

mod builder;
mod outcome;
mod reaper;
mod state;

pub use builder::InstallerBuilder;
pub use outcome::InstallOutcome;
pub use state::{Phase, RunState};

use std::future::Future;
use std::sync::Arc;
use std::time::Instant;

use log::{debug, info, warn};
use tokio::runtime::Handle;
use tokio::sync::oneshot;
use tokio::task::{self, JoinError, JoinHandle};
use tokio::time;

use reaper::Reaper;

use crate::app::{App, AppId};
use crate::error::{InstallerError, ProcessError, Result};
use crate::interview::{InterviewSession, PtyBridge, Question, QuestionRegistry, Respondent};
use crate::process::{
    Bootstrap, ClientConfig, Login, Operation, ProcessRunner, SpawnedProcess, SteamCommand,
};

/// Question asked for the Steam account name before a non-anonymous run.
pub const USERNAME_QUESTION: &str = "What is your Steam username?";

/// Question asked for the Steam account password before a non-anonymous run.
pub const PASSWORD_QUESTION: &str = "What is your Steam password?";

/// Installs and updates Steam applications, one at a time.
pub struct Installer {
    state: Arc<RunState>,
    anonymous: bool,
    config: Arc<ClientConfig>,
    registry: Arc<QuestionRegistry>,
    runner: Arc<dyn ProcessRunner>,
    bootstrap: Arc<dyn Bootstrap>,
}

impl Installer {
    /// Create an installer with `config` and the default collaborators.
    pub fn new(config: ClientConfig) -> Self {
        InstallerBuilder::new().config(config).build()
    }

    /// Create a builder for an installer.
    pub fn builder() -> InstallerBuilder {
        InstallerBuilder::new()
    }

    /// Check if an install or update is in progress.
    pub fn running(&self) -> bool {
        self.state.is_running()
    }

    /// Current phase.
    pub fn phase(&self) -> Phase {
        self.state.phase()
    }

    /// Whether runs log in anonymously.
    pub fn is_anonymous(&self) -> bool {
        self.anonymous
    }

    /// The client configuration.
    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Install an application into `<apps_dir>/<id>`.
    ///
    /// Fails with [`InstallerError::AlreadyRunning`] if another run is in
    /// progress. Everything that goes wrong after the run starts is
    /// reported by [`InterviewHandle::wait`].
    pub fn install(&self, id: AppId) -> Result<InterviewHandle> {
        self.start(Operation::Install(id))
    }

    /// Update an installed application in its own directory.
    ///
    /// The application must have an id and a directory; nothing is started
    /// otherwise.
    pub fn update(&self, app: &App) -> Result<InterviewHandle> {
        if app.id().is_unset() {
            return Err(InstallerError::MissingAppId.into());
        }
        if app.dir().as_os_str().is_empty() {
            return Err(InstallerError::MissingAppDir.into());
        }
        self.start(Operation::Update(app.clone()))
    }

    fn start(&self, operation: Operation) -> Result<InterviewHandle> {
        let runtime =
            Handle::try_current().map_err(|e| InstallerError::NoRuntime(e.to_string()))?;

        if !self.state.try_start() {
            debug!("refusing to start app {}: already running", operation.app_id());
            return Err(InstallerError::AlreadyRunning.into());
        }

        let (session, respondent) = InterviewSession::open_for(Arc::clone(&self.state));
        let (outcome_tx, outcome_rx) = oneshot::channel();

        let run = Run {
            anonymous: self.anonymous,
            config: Arc::clone(&self.config),
            registry: Arc::clone(&self.registry),
            runner: Arc::clone(&self.runner),
            bootstrap: Arc::clone(&self.bootstrap),
            session: Arc::clone(&session),
            operation,
        };

        info!("starting SteamCMD for app {}", run.operation.app_id());
        runtime.spawn(async move {
            // Closing the session returns the installer to idle, so it must
            // happen before the outcome is observable.
            let sentinel = scopeguard::guard(session, |session| session.close());
            let result = run.execute().await;
            drop(sentinel);

            match &result {
                Ok(outcome) => info!(
                    "app {} done in {:?} ({} question(s))",
                    outcome.app,
                    outcome.elapsed,
                    outcome.questions_asked()
                ),
                Err(e) => warn!("SteamCMD run failed: {}", e),
            }
            let _ = outcome_tx.send(result);
        });

        Ok(InterviewHandle {
            respondent,
            outcome: PendingOutcome(outcome_rx),
        })
    }
}

/// Everything one run needs, moved into its task.
struct Run {
    anonymous: bool,
    config: Arc<ClientConfig>,
    registry: Arc<QuestionRegistry>,
    runner: Arc<dyn ProcessRunner>,
    bootstrap: Arc<dyn Bootstrap>,
    session: Arc<InterviewSession>,
    operation: Operation,
}

impl Run {
    async fn execute(self) -> Result<InstallOutcome> {
        let started = Instant::now();
        let deadline = self.config.timeout.map(|limit| time::Instant::now() + limit);

        // Nothing is running yet if the deadline passes while launching
        let Some(launched) = until(deadline, self.launch()).await else {
            return Err(self.timed_out());
        };
        let (mut reaper, mut bridge) = launched?;

        let Some(bridged) = until(deadline, &mut bridge).await else {
            self.stop(&mut reaper).await;
            return Err(self.timed_out());
        };
        if let Err(e) = joined(bridged) {
            debug!("interview ended early ({}), stopping SteamCMD", e);
            self.stop(&mut reaper).await;
            return Err(e);
        }

        // SteamCMD is reaped before the sentinel lets another run start
        let Some(exit) = until(deadline, reaper.wait()).await else {
            self.stop(&mut reaper).await;
            return Err(self.timed_out());
        };
        let exit = exit?;
        if !exit.success() {
            return Err(ProcessError::Exit { code: exit.code() }.into());
        }

        Ok(InstallOutcome {
            app: self.operation.app_id(),
            exit,
            exchanges: self.session.exchanges(),
            elapsed: started.elapsed(),
        })
    }

    /// Get credentials, provision SteamCMD, and start it with the bridge
    /// attached to its terminal.
    async fn launch(&self) -> Result<(Reaper, JoinHandle<Result<()>>)> {
        let login = self.login().await?;
        self.provision().await?;

        let command = SteamCommand::new(&self.config, login, &self.operation);
        debug!("spawning {:?}", command);
        let SpawnedProcess {
            reader,
            writer,
            child,
        } = self.runner.spawn(
            &command,
            self.config.terminal_width,
            self.config.terminal_height,
        )?;

        let reaper = Reaper::spawn(child);
        let bridge = PtyBridge::new(Arc::clone(&self.registry), Arc::clone(&self.session))
            .spawn(reader, writer);
        Ok((reaper, bridge))
    }

    async fn stop(&self, reaper: &mut Reaper) {
        if let Err(e) = reaper.terminate(self.config.kill_grace).await {
            warn!("failed to reap SteamCMD: {}", e);
        }
    }

    fn timed_out(&self) -> crate::error::Error {
        let limit = self.config.timeout.unwrap_or_default();
        warn!("SteamCMD run timed out after {:?}", limit);
        InstallerError::Timeout(limit).into()
    }

    async fn login(&self) -> Result<Login> {
        if self.anonymous {
            return Ok(Login::Anonymous);
        }

        let username = self.session.ask(USERNAME_QUESTION, false).await?;
        if username.trim().is_empty() {
            debug!("no username given, logging in anonymously");
            return Ok(Login::Anonymous);
        }

        let password = self.session.ask(PASSWORD_QUESTION, true).await?;
        Ok(Login::user(username, password))
    }

    async fn provision(&self) -> Result<()> {
        if self.config.steamcmd_dir.exists() {
            return Ok(());
        }

        info!(
            "SteamCMD not found in {}, provisioning",
            self.config.steamcmd_dir.display()
        );
        let bootstrap = Arc::clone(&self.bootstrap);
        let config = Arc::clone(&self.config);
        joined(task::spawn_blocking(move || bootstrap.provision(&config)).await)
    }
}

/// Run `future` to completion, or until `deadline` passes (`None`).
async fn until<F: Future>(deadline: Option<time::Instant>, future: F) -> Option<F::Output> {
    match deadline {
        Some(deadline) => time::timeout_at(deadline, future).await.ok(),
        None => Some(future.await),
    }
}

fn joined<T>(result: std::result::Result<Result<T>, JoinError>) -> Result<T> {
    match result {
        Ok(inner) => inner,
        Err(e) => Err(task_failed(e)),
    }
}

fn task_failed(e: JoinError) -> crate::error::Error {
    InstallerError::TaskFailed(e.to_string()).into()
}

/// The application's side of a running install or update.
///
/// Questions must be answered for the run to make progress. Dropping the
/// handle abandons the run: pending questions fail and SteamCMD is killed.
#[derive(Debug)]
pub struct InterviewHandle {
    respondent: Respondent,
    outcome: PendingOutcome,
}

impl InterviewHandle {
    /// Wait for the next question. Returns `None` once the run is over.
    pub async fn next_question(&mut self) -> Option<Question> {
        self.respondent.next_question().await
    }

    /// Answer the question most recently received.
    pub async fn answer(&mut self, answer: impl Into<String>) -> Result<()> {
        self.respondent.answer(answer).await
    }

    /// Answer every question with `respond`, then wait for the outcome.
    pub async fn run_with<F>(mut self, respond: F) -> Result<InstallOutcome>
    where
        F: FnMut(&Question) -> String,
    {
        self.respondent.answer_all(respond).await;
        self.outcome.wait().await
    }

    /// Wait for the run to finish.
    ///
    /// Stops answering first: a question asked after this point fails the
    /// run with [`SessionError::Closed`](crate::error::SessionError::Closed).
    pub async fn wait(self) -> Result<InstallOutcome> {
        let Self {
            respondent,
            outcome,
        } = self;
        drop(respondent);
        outcome.wait().await
    }

    /// Split into the respondent and the pending outcome, so questions can
    /// be answered from a different task than the one waiting.
    pub fn split(self) -> (Respondent, PendingOutcome) {
        (self.respondent, self.outcome)
    }
}

/// The eventual result of a run.
#[derive(Debug)]
pub struct PendingOutcome(oneshot::Receiver<Result<InstallOutcome>>);

impl PendingOutcome {
    /// Wait for the run to finish.
    pub async fn wait(self) -> Result<InstallOutcome> {
        self.0.await.unwrap_or_else(|_| {
            Err(InstallerError::TaskFailed("run ended without a result".to_string()).into())
        })
    }
}
