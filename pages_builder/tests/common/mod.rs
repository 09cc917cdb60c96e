//! Shared fixtures for pipeline tests.

#![allow(dead_code)]

use std::collections::VecDeque;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use pages_builder::{BuildLogger, BuilderOptions, CommandLine, CommandRunner, SiteTools};
use tempfile::TempDir;

type Effect = Box<dyn FnOnce(&CommandLine) + Send>;

struct Scripted {
    exit_code: std::io::Result<i32>,
    effect: Option<Effect>,
}

/// Records every command and answers with queued exit codes (0 once the
/// queue is empty). A queued entry may carry a side effect run in place of
/// the real program, e.g. creating the directory `git clone` would create.
#[derive(Default)]
pub struct ScriptedRunner {
    calls: Mutex<Vec<CommandLine>>,
    script: Mutex<VecDeque<Scripted>>,
}

impl ScriptedRunner {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn then_exit(&self, exit_code: i32) -> &Self {
        self.push(Ok(exit_code), None)
    }

    pub fn then_run(
        &self,
        exit_code: i32,
        effect: impl FnOnce(&CommandLine) + Send + 'static,
    ) -> &Self {
        self.push(Ok(exit_code), Some(Box::new(effect)))
    }

    pub fn then_fail_to_start(&self) -> &Self {
        self.push(
            Err(std::io::Error::new(std::io::ErrorKind::NotFound, "no such program")),
            None,
        )
    }

    fn push(&self, exit_code: std::io::Result<i32>, effect: Option<Effect>) -> &Self {
        self.script
            .lock()
            .unwrap()
            .push_back(Scripted { exit_code, effect });
        self
    }

    pub fn commands(&self) -> Vec<CommandLine> {
        self.calls.lock().unwrap().clone()
    }

    /// Command lines as they are quoted in build errors.
    pub fn calls(&self) -> Vec<String> {
        self.commands().iter().map(ToString::to_string).collect()
    }
}

#[async_trait]
impl CommandRunner for ScriptedRunner {
    async fn run(&self, command: &CommandLine) -> std::io::Result<i32> {
        self.calls.lock().unwrap().push(command.clone());
        let next = self.script.lock().unwrap().pop_front();
        match next {
            Some(Scripted { exit_code, effect }) => {
                if let Some(effect) = effect {
                    effect(command);
                }
                exit_code
            }
            None => Ok(0),
        }
    }
}

/// Scratch repository and destination roots for one test.
pub struct Fixture {
    pub root: TempDir,
    pub opts: BuilderOptions,
}

impl Fixture {
    pub fn new() -> Self {
        let root = tempfile::tempdir().unwrap();
        let repo_dir = root.path().join("repos");
        let dest_dir = root.path().join("dest");
        std::fs::create_dir_all(&repo_dir).unwrap();

        let tools = SiteTools {
            git: "git".to_string(),
            bundler: "bundle".to_string(),
            jekyll: "jekyll".to_string(),
            rsync: "rsync".to_string(),
            rsync_opts: vec![
                "-vaxp".to_string(),
                "--delete".to_string(),
                "--ignore-errors".to_string(),
            ],
        };
        let opts = BuilderOptions::new(repo_dir, dest_dir, "repo_name", "18f-pages", tools);
        Self { root, opts }
    }

    pub fn site_path(&self) -> &Path {
        &self.opts.site_path
    }

    pub fn site_file(&self, name: &str) -> PathBuf {
        self.opts.site_path.join(name)
    }

    /// An existing working copy of a generator-built site.
    pub fn create_site(&self) {
        create_site_dir(self.site_path());
    }

    pub fn create_site_with(&self, name: &str, contents: &str) {
        self.create_site();
        std::fs::write(self.site_file(name), contents).unwrap();
    }

    pub fn logger(&self) -> BuildLogger {
        BuildLogger::new(self.root.path().join("test-build.log"))
    }

    pub fn log_lines(&self) -> Vec<String> {
        std::fs::read_to_string(self.root.path().join("test-build.log"))
            .unwrap_or_default()
            .lines()
            .map(str::to_string)
            .collect()
    }

    pub fn default_destination(&self) -> String {
        self.opts.build_destination.display().to_string()
    }

    pub fn jekyll_build(&self, destination: &str) -> String {
        format!(
            "jekyll build --trace --destination {destination} --config _config.yml,_config_18f_pages.yml"
        )
    }
}

pub fn create_site_dir(path: &Path) {
    std::fs::create_dir_all(path).unwrap();
    std::fs::write(path.join("_config.yml"), "").unwrap();
}

pub const CLONE_COMMAND: &str = "git clone git@github.com:18F/repo_name.git --branch 18f-pages";
