//! SteamCMD client configuration.

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Deserializer};

use crate::app::{App, AppId};

/// Default SteamCMD installation directory.
pub const DEFAULT_STEAMCMD_DIR: &str = "/opt/steam/cmd";

/// Default directory applications are installed under.
pub const DEFAULT_APPS_DIR: &str = "/opt/steam/apps";

/// Default time between hanging up on SteamCMD and killing it.
pub const DEFAULT_KILL_GRACE: Duration = Duration::from_secs(2);

/// Where SteamCMD lives, where applications go, and how to run it.
///
/// Every field has a default, so the config can be embedded in an
/// application's own config file and only the interesting fields given.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// SteamCMD installation directory (working directory of the process).
    pub steamcmd_dir: PathBuf,

    /// Directory under which each application gets `<apps_dir>/<app id>`.
    pub apps_dir: PathBuf,

    /// Program to run, relative to `steamcmd_dir` unless absolute.
    pub program: String,

    /// Give up on an interview after this long (seconds in config files).
    #[serde(deserialize_with = "deserialize_secs")]
    pub timeout: Option<Duration>,

    /// How long SteamCMD gets to exit after a hangup before it is killed
    /// outright (seconds in config files).
    #[serde(deserialize_with = "deserialize_grace")]
    pub kill_grace: Duration,

    /// Terminal width for the PTY.
    pub terminal_width: u16,

    /// Terminal height for the PTY.
    pub terminal_height: u16,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            steamcmd_dir: PathBuf::from(DEFAULT_STEAMCMD_DIR),
            apps_dir: PathBuf::from(DEFAULT_APPS_DIR),
            program: "./steamcmd.sh".to_string(),
            timeout: None,
            kill_grace: DEFAULT_KILL_GRACE,
            terminal_width: 80,
            terminal_height: 24,
        }
    }
}

impl ClientConfig {
    /// Install directory for an application.
    pub fn app_dir(&self, id: AppId) -> PathBuf {
        self.apps_dir.join(id.to_string())
    }

    /// The installed application with this id, or `None` if it is not installed.
    pub fn app(&self, id: AppId) -> Option<App> {
        let dir = self.app_dir(id);
        dir.is_dir().then(|| App::new(id, dir))
    }
}

fn deserialize_secs<'de, D>(deserializer: D) -> Result<Option<Duration>, D::Error>
where
    D: Deserializer<'de>,
{
    Option::<f64>::deserialize(deserializer)?
        .map(|secs| Duration::try_from_secs_f64(secs).map_err(serde::de::Error::custom))
        .transpose()
}

fn deserialize_grace<'de, D>(deserializer: D) -> Result<Duration, D::Error>
where
    D: Deserializer<'de>,
{
    let secs = f64::deserialize(deserializer)?;
    Duration::try_from_secs_f64(secs).map_err(serde::de::Error::custom)
}
