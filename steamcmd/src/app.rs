//! Steam application identifiers and installed applications.

use std::fmt;
use std::io;
use std::num::ParseIntError;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Numeric Steam application id (e.g. `740` for the CS:GO dedicated server).
///
/// The canonical string form is the plain decimal number. Id `0` is not a
/// valid Steam application and is treated as "no id".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AppId(u32);

impl AppId {
    /// Create an id from its numeric value.
    pub const fn new(id: u32) -> Self {
        Self(id)
    }

    /// Parse an id, falling back to `0` when the text is not a number.
    pub fn from_str_lossy(id: &str) -> Self {
        id.trim().parse().unwrap_or_default()
    }

    /// The numeric value.
    pub const fn get(self) -> u32 {
        self.0
    }

    /// Whether this id is unset (`0`).
    pub const fn is_unset(self) -> bool {
        self.0 == 0
    }
}

impl From<u32> for AppId {
    fn from(id: u32) -> Self {
        Self(id)
    }
}

impl FromStr for AppId {
    type Err = ParseIntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.trim().parse().map(Self)
    }
}

impl fmt::Display for AppId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// An application installed (or to be installed) in a directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct App {
    id: AppId,
    dir: PathBuf,
}

impl App {
    /// Create an application handle.
    pub fn new(id: impl Into<AppId>, dir: impl Into<PathBuf>) -> Self {
        Self {
            id: id.into(),
            dir: dir.into(),
        }
    }

    /// The Steam application id.
    pub fn id(&self) -> AppId {
        self.id
    }

    /// The install directory.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Remove the application by deleting its install directory.
    pub fn remove(&self) -> io::Result<()> {
        match std::fs::remove_dir_all(&self.dir) {
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            other => other,
        }
    }
}
