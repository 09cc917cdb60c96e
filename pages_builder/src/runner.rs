//! External command execution.
//!
//! Every pipeline step that shells out goes through [`CommandRunner`], so
//! the site builder can be driven by a scripted runner in tests.

use std::fmt;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::process::Command;

/// One external program invocation: program, arguments, working directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandLine {
    pub program: String,
    pub args: Vec<String>,
    pub cwd: PathBuf,
}

impl CommandLine {
    pub fn new<I, S>(program: impl Into<String>, args: I, cwd: impl AsRef<Path>) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            program: program.into(),
            args: args.into_iter().map(Into::into).collect(),
            cwd: cwd.as_ref().to_path_buf(),
        }
    }
}

/// Renders as `program arg1 arg2 ...`, the form quoted in build errors.
impl fmt::Display for CommandLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.program)?;
        for arg in &self.args {
            write!(f, " {arg}")?;
        }
        Ok(())
    }
}

#[async_trait]
pub trait CommandRunner: Send + Sync {
    /// Run the command to completion and return its exit code.
    ///
    /// A process killed by a signal reports `-1`. `Err` means the program
    /// could not be started at all.
    async fn run(&self, command: &CommandLine) -> std::io::Result<i32>;
}

/// Runs commands as child processes sharing the server's stdout/stderr.
#[derive(Debug, Clone, Default)]
pub struct ProcessRunner;

#[async_trait]
impl CommandRunner for ProcessRunner {
    async fn run(&self, command: &CommandLine) -> std::io::Result<i32> {
        tracing::debug!(command = %command, cwd = %command.cwd.display(), "Running command");

        let status = Command::new(&command.program)
            .args(&command.args)
            .current_dir(&command.cwd)
            .status()
            .await?;

        Ok(status.code().unwrap_or(-1))
    }
}
