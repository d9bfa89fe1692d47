//! SteamCMD process layer.
//!
//! This module knows how to lay out the SteamCMD command line, start it on
//! a pseudo-terminal, and provision SteamCMD itself on a fresh machine.

mod bootstrap;
pub mod config;
mod command;
mod runner;

pub use bootstrap::{Bootstrap, STEAMCMD_SCRIPT, ScriptBootstrap};
pub use command::{Login, Operation, SteamCommand};
pub use config::{ClientConfig, DEFAULT_APPS_DIR, DEFAULT_KILL_GRACE, DEFAULT_STEAMCMD_DIR};
pub use runner::{ChildProcess, ProcessExit, ProcessKiller, ProcessRunner, PtyRunner, SpawnedProcess};
