//! Provisioning SteamCMD on a machine that doesn't have it yet.

use std::process::Command;

use log::{debug, info, warn};

use super::config::ClientConfig;
use crate::error::{InstallerError, Result};

/// Script that installs SteamCMD on a Debian/Ubuntu host.
///
/// SteamCMD is a 32 bit program, so 32 bit libc, ncurses and libstdc++ are
/// installed first.
pub const STEAMCMD_SCRIPT: &[&str] = &[
    "set -ux",
    "dpkg --add-architecture i386",
    "apt-get update",
    "apt-get install -y libc6:i386 libncurses5:i386 libstdc++6:i386",
    "wget http://media.steampowered.com/client/steamcmd_linux.tar.gz",
    "tar -xvzf steamcmd_linux.tar.gz",
    "rm steamcmd_linux.tar.gz",
];

/// Makes SteamCMD available in `config.steamcmd_dir`.
pub trait Bootstrap: Send + Sync {
    /// Provision SteamCMD. Blocking; runs on the blocking thread pool.
    fn provision(&self, config: &ClientConfig) -> Result<()>;
}

/// Provisions SteamCMD by running a shell script in its directory.
#[derive(Debug, Clone)]
pub struct ScriptBootstrap {
    shell: String,
    lines: Vec<String>,
}

impl Default for ScriptBootstrap {
    fn default() -> Self {
        Self::new(STEAMCMD_SCRIPT.iter().copied())
    }
}

impl ScriptBootstrap {
    /// Run the given script lines with `bash`.
    pub fn new<I, S>(lines: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            shell: "bash".to_string(),
            lines: lines.into_iter().map(Into::into).collect(),
        }
    }

    /// Use a different shell.
    pub fn with_shell(mut self, shell: impl Into<String>) -> Self {
        self.shell = shell.into();
        self
    }

    /// The script as one string.
    pub fn script(&self) -> String {
        self.lines.join("\n")
    }
}

impl Bootstrap for ScriptBootstrap {
    fn provision(&self, config: &ClientConfig) -> Result<()> {
        let dir = &config.steamcmd_dir;
        let failed = |message: String| InstallerError::BootstrapFailed { message };

        std::fs::create_dir_all(dir)
            .map_err(|e| failed(format!("cannot create {}: {}", dir.display(), e)))?;

        info!("provisioning SteamCMD in {}", dir.display());
        let output = Command::new(&self.shell)
            .arg("-c")
            .arg(self.script())
            .current_dir(dir)
            .output()
            .map_err(|e| failed(format!("cannot run {}: {}", self.shell, e)))?;

        for line in String::from_utf8_lossy(&output.stdout).lines() {
            debug!("bootstrap: {}", line);
        }
        for line in String::from_utf8_lossy(&output.stderr).lines() {
            debug!("bootstrap stderr: {}", line);
        }

        if !output.status.success() {
            warn!("SteamCMD bootstrap failed: {}", output.status);
            return Err(failed(format!("script exited with {}", output.status)).into());
        }

        Ok(())
    }
}
