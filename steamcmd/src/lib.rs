//! # steamcmd
//!
//! Async driver for Valve's SteamCMD that installs and updates dedicated
//! servers and other Steam applications.
//!
//! SteamCMD is interactive: depending on the account it may ask for a Steam
//! Guard or two-factor code halfway through a download. steamcmd runs it on
//! a pseudo-terminal, recognizes those questions in its output, and relays
//! them to the application one at a time.
//!
//! ## Features
//!
//! - Single-flight installer: one SteamCMD process per installer at a time
//! - Registry of recognized prompts, extensible at runtime
//! - Escape-code tolerant prompt matching
//! - Credentials asked through the same interview as Steam Guard codes
//! - Optional SteamCMD provisioning on first use
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use steamcmd::{AppId, Installer};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), steamcmd::Error> {
//!     let installer = Installer::builder()
//!         .apps_dir("/srv/games")
//!         .anonymous(true)
//!         .build();
//!
//!     let outcome = installer
//!         .install(AppId::new(740))?
//!         .run_with(|question| {
//!             eprintln!("{}", question);
//!             String::new()
//!         })
//!         .await?;
//!
//!     println!("installed app {} in {:?}", outcome.app, outcome.elapsed);
//!     Ok(())
//! }
//! ```

pub mod app;
pub mod error;
pub mod installer;
pub mod interview;
pub mod process;

#[cfg(test)]
pub(crate) mod testing;

// Re-export main types for convenience
pub use app::{App, AppId};
pub use error::{Error, Result};
pub use installer::{
    InstallOutcome, Installer, InstallerBuilder, InterviewHandle, PendingOutcome,
};
pub use interview::{Question, QuestionRegistry};
pub use process::ClientConfig;
