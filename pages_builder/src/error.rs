//! Build failures reported to the completion of a site build.
//!
//! The rendered text is what lands in the public `build.log`, so the
//! wording of the command failures is kept stable.

use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum BuildError {
    /// The initial `git clone` exited non-zero.
    #[error("Error: failed to clone {repo} with exit code {exit_code} from command: {command}")]
    CloneFailed {
        repo: String,
        exit_code: i32,
        command: String,
    },

    /// Any later pipeline command exited non-zero.
    #[error("Error: rebuild failed for {repo} with exit code {exit_code} from command: {command}")]
    RebuildFailed {
        repo: String,
        exit_code: i32,
        command: String,
    },

    #[error("Error: failed to start {command} for {repo}: {source}")]
    Spawn {
        repo: String,
        command: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Error: failed to {action} {path}: {source}")]
    ConfigIo {
        action: &'static str,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Error: failed to acquire update lock {path}: {source}")]
    LockAcquisition {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Error: failed to open build log {path}: {source}")]
    LogOpen {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Error moving build log from {from} to {to}: {source}")]
    LogRelocation {
        from: PathBuf,
        to: PathBuf,
        #[source]
        source: std::io::Error,
    },
}
