use std::fmt;
use std::io;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum DirTreeError {
    // Root
    #[error("root path not found: {}", .0.display())]
    RootNotFound(PathBuf),

    // Traversal
    #[error("failed to list directory {}", path.display())]
    Listing {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to stat {}", path.display())]
    Stat {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    // Config
    #[error("invalid skip pattern: {0}")]
    InvalidPattern(String),
}

impl DirTreeError {
    /// The path this error occurred at, if applicable.
    pub fn path(&self) -> Option<&Path> {
        match self {
            Self::RootNotFound(p)
            | Self::Listing { path: p, .. }
            | Self::Stat { path: p, .. } => Some(p),
            Self::InvalidPattern(_) => None,
        }
    }

    /// Whether an [`ErrorPolicy`] could have suppressed this error.
    ///
    /// Listing and stat failures are subject to policy; a missing root and
    /// a bad skip pattern always fail the walk.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, Self::Listing { .. } | Self::Stat { .. })
    }
}

// ---------------------------------------------------------------------------
// Error records
// ---------------------------------------------------------------------------

/// Which filesystem operation an [`ErrorRecord`] came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ErrorKind {
    /// Enumerating a directory's entries failed.
    Listing,

    /// Retrieving metadata for a single entry failed.
    Stat,
}

/// A suppressed filesystem error, collected under [`ErrorPolicy::Record`].
#[derive(Debug)]
pub struct ErrorRecord {
    pub kind:  ErrorKind,
    pub path:  PathBuf,
    pub error: io::Error,
}

impl ErrorRecord {
    /// Convert the record into the error the walk would have failed with
    /// under [`ErrorPolicy::Throw`].
    pub fn into_error(self) -> DirTreeError {
        match self.kind {
            ErrorKind::Listing => DirTreeError::Listing { path: self.path, source: self.error },
            ErrorKind::Stat    => DirTreeError::Stat { path: self.path, source: self.error },
        }
    }
}

impl fmt::Display for ErrorRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?} error at {}: {}", self.kind, self.path.display(), self.error)
    }
}

// ---------------------------------------------------------------------------
// ErrorPolicy
// ---------------------------------------------------------------------------

/// How the walker treats a listing or stat failure.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ErrorPolicy {
    /// Drop the error; the failed entry is silently missing from the tree.
    #[default]
    Ignore,

    /// Append an [`ErrorRecord`] to [`Tree::errors`](crate::Tree::errors) and keep going.
    Record,

    /// Fail the branch that hit the error, and with it the whole walk.
    /// Siblings already in flight still run to completion.
    Throw,
}

impl FromStr for ErrorPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "ignore" => Ok(Self::Ignore),
            "record" => Ok(Self::Record),
            "throw"  => Ok(Self::Throw),
            other    => Err(format!("unknown error policy '{other}' (expected ignore, record or throw)")),
        }
    }
}

impl fmt::Display for ErrorPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Ignore => "ignore",
            Self::Record => "record",
            Self::Throw  => "throw",
        })
    }
}
