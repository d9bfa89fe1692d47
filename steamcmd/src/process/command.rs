//! SteamCMD command line.

use std::fmt;
use std::path::{Path, PathBuf};

use secrecy::{ExposeSecret, SecretString};

use super::config::ClientConfig;
use crate::app::{App, AppId};

/// How SteamCMD logs in.
pub enum Login {
    /// `+login anonymous`, enough for most dedicated servers.
    Anonymous,

    /// `+login <username> <password>`.
    User {
        username: String,
        password: SecretString,
    },
}

impl Login {
    /// Log in with a Steam account.
    pub fn user(username: impl Into<String>, password: impl Into<String>) -> Self {
        Login::User {
            username: username.into(),
            password: SecretString::from(password.into()),
        }
    }
}

impl fmt::Debug for Login {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Login::Anonymous => write!(f, "Anonymous"),
            Login::User { username, .. } => f
                .debug_struct("User")
                .field("username", username)
                .field("password", &"********")
                .finish(),
        }
    }
}

/// What SteamCMD should do once logged in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Operation {
    /// Install an application into `<apps_dir>/<id>`.
    Install(AppId),

    /// Update an application in its existing directory.
    Update(App),
}

impl Operation {
    /// The application this operation targets.
    pub fn app_id(&self) -> AppId {
        match self {
            Operation::Install(id) => *id,
            Operation::Update(app) => app.id(),
        }
    }
}

/// A fully laid out SteamCMD invocation.
///
/// Arguments are `+login ...`, the operation's arguments, then `+quit`.
/// `Debug` output never contains the password.
pub struct SteamCommand {
    program: String,
    dir: PathBuf,
    login: Login,
    args: Vec<String>,
}

impl SteamCommand {
    /// Lay out the command for `operation`.
    pub fn new(config: &ClientConfig, login: Login, operation: &Operation) -> Self {
        let (install_dir, id) = match operation {
            Operation::Install(id) => (config.app_dir(*id), *id),
            Operation::Update(app) => (app.dir().to_path_buf(), app.id()),
        };

        let args = vec![
            "+force_install_dir".to_string(),
            install_dir.display().to_string(),
            "+app_update".to_string(),
            id.to_string(),
            "validate".to_string(),
        ];

        Self {
            program: config.program.clone(),
            dir: config.steamcmd_dir.clone(),
            login,
            args,
        }
    }

    /// Program to run.
    pub fn program(&self) -> &str {
        &self.program
    }

    /// Working directory.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// The login in use.
    pub fn login(&self) -> &Login {
        &self.login
    }

    /// Full argument list, including credentials.
    pub fn to_args(&self) -> Vec<String> {
        let mut args = Vec::with_capacity(self.args.len() + 4);
        args.push("+login".to_string());
        match &self.login {
            Login::Anonymous => args.push("anonymous".to_string()),
            Login::User { username, password } => {
                args.push(username.clone());
                args.push(password.expose_secret().to_string());
            }
        }
        args.extend(self.args.iter().cloned());
        args.push("+quit".to_string());
        args
    }
}

impl fmt::Debug for SteamCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SteamCommand")
            .field("program", &self.program)
            .field("dir", &self.dir)
            .field("login", &self.login)
            .field("args", &self.args)
            .finish()
    }
}
