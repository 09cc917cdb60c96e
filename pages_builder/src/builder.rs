//! Site builder: the state machine that syncs, configures, and publishes one site.
//!
//! One [`SiteBuilder`] drives one build. Each [`Step`] is executed by
//! [`SiteBuilder::transition`], which returns the next step or a terminal
//! error. Whatever the outcome, [`SiteBuilder::build`] finishes by removing
//! a generated override config.

use std::path::PathBuf;
use std::sync::Arc;

use crate::error::BuildError;
use crate::logger::BuildLogger;
use crate::options::BuilderOptions;
use crate::runner::{CommandLine, CommandRunner};
use crate::site_config::{ConfigResolver, GEMFILE, JEKYLL_CONFIG, PAGES_CONFIG};

/// States of a site build, in pipeline order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    Start,
    CloneRepo,
    SyncRepo,
    DetectBuildMode,
    PlainSync,
    CheckDependencyManifest,
    InstallDependencies,
    ResolveConfig,
    RunGenerator,
    Done,
}

/// Mutable state of one build, owned by the running pipeline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildState {
    pub uses_bundler: bool,
    pub generated_config: bool,
    pub build_destination: PathBuf,
}

impl BuildState {
    pub fn new(opts: &BuilderOptions) -> Self {
        Self {
            uses_bundler: false,
            generated_config: false,
            build_destination: opts.build_destination.clone(),
        }
    }
}

pub struct SiteBuilder {
    opts: BuilderOptions,
    logger: BuildLogger,
    runner: Arc<dyn CommandRunner>,
    config: ConfigResolver,
}

impl SiteBuilder {
    pub fn new(opts: BuilderOptions, logger: BuildLogger, runner: Arc<dyn CommandRunner>) -> Self {
        let config = ConfigResolver::new(&opts);
        Self {
            opts,
            logger,
            runner,
            config,
        }
    }

    /// Run the whole pipeline. Returns `Ok(())` when the site was published.
    pub async fn build(&self) -> Result<(), BuildError> {
        let mut state = BuildState::new(&self.opts);
        let mut step = Step::Start;

        let result = loop {
            match self.transition(step, &mut state).await {
                Ok(Step::Done) => break Ok(()),
                Ok(next) => {
                    tracing::debug!(repo = %self.opts.repo_name, from = ?step, to = ?next, "Build step");
                    step = next;
                }
                Err(e) => {
                    tracing::warn!(repo = %self.opts.repo_name, step = ?step, "Build step failed");
                    break Err(e);
                }
            }
        };

        self.finalize(&state).await;
        result
    }

    /// Execute a single step against `state`, returning the step to run next.
    pub async fn transition(&self, step: Step, state: &mut BuildState) -> Result<Step, BuildError> {
        match step {
            Step::Start => {
                let exists = tokio::fs::try_exists(&self.opts.site_path)
                    .await
                    .unwrap_or(false);
                Ok(if exists { Step::SyncRepo } else { Step::CloneRepo })
            }
            Step::CloneRepo => {
                self.clone_repo().await?;
                Ok(Step::DetectBuildMode)
            }
            Step::SyncRepo => {
                self.sync_repo().await?;
                Ok(Step::DetectBuildMode)
            }
            Step::DetectBuildMode => {
                if self.config.check_for_file(JEKYLL_CONFIG).await {
                    Ok(Step::CheckDependencyManifest)
                } else {
                    Ok(Step::PlainSync)
                }
            }
            Step::PlainSync => {
                let mut args = self.opts.tools.rsync_opts.clone();
                args.push("./".to_string());
                args.push(state.build_destination.display().to_string());
                self.spawn(&self.opts.tools.rsync, args).await?;
                Ok(Step::Done)
            }
            Step::CheckDependencyManifest => {
                state.uses_bundler = self.config.check_for_file(GEMFILE).await;
                Ok(if state.uses_bundler {
                    Step::InstallDependencies
                } else {
                    Step::ResolveConfig
                })
            }
            Step::InstallDependencies => {
                self.spawn(&self.opts.tools.bundler, ["install"]).await?;
                Ok(Step::ResolveConfig)
            }
            Step::ResolveConfig => {
                let exists = self.config.check_for_file(PAGES_CONFIG).await;
                if exists {
                    self.logger.log(&format!("using existing {PAGES_CONFIG}")).await;
                } else {
                    self.logger.log(&format!("generating {PAGES_CONFIG}")).await;
                }

                let resolution = self.config.resolve_config(exists).await?;
                state.generated_config = resolution.generated;
                if let Some(destination) = resolution.destination {
                    state.build_destination = destination;
                }
                Ok(Step::RunGenerator)
            }
            Step::RunGenerator => {
                let (program, args) = self.generator_command(state);
                self.spawn(&program, args).await?;
                Ok(Step::Done)
            }
            Step::Done => Ok(Step::Done),
        }
    }

    /// Remove a generated override config. Failures are logged and never
    /// change the build outcome.
    pub async fn finalize(&self, state: &BuildState) {
        if !state.generated_config {
            return;
        }
        self.logger
            .log(&format!("removing generated {PAGES_CONFIG}"))
            .await;
        if let Err(e) = self.config.remove_generated().await {
            self.logger.error(&e.to_string()).await;
        }
    }

    async fn clone_repo(&self) -> Result<(), BuildError> {
        self.logger
            .log(&format!(
                "cloning {} into {}",
                self.opts.repo_name,
                self.opts.site_path.display()
            ))
            .await;

        let command = CommandLine::new(
            &self.opts.tools.git,
            [
                "clone".to_string(),
                self.opts.clone_url(),
                "--branch".to_string(),
                self.opts.branch.clone(),
            ],
            &self.opts.repo_dir,
        );
        let exit_code = self.execute(&command).await?;
        if exit_code != 0 {
            return Err(BuildError::CloneFailed {
                repo: self.opts.repo_name.clone(),
                exit_code,
                command: command.to_string(),
            });
        }
        Ok(())
    }

    /// Discard local modifications, then pull. Both failures surface as
    /// [`BuildError::RebuildFailed`].
    async fn sync_repo(&self) -> Result<(), BuildError> {
        self.logger
            .log(&format!("syncing repo: {}", self.opts.repo_name))
            .await;
        self.spawn(&self.opts.tools.git, ["stash"]).await?;
        self.spawn(&self.opts.tools.git, ["pull"]).await
    }

    fn generator_command(&self, state: &BuildState) -> (String, Vec<String>) {
        let tools = &self.opts.tools;
        let mut args = vec![
            "build".to_string(),
            "--trace".to_string(),
            "--destination".to_string(),
            state.build_destination.display().to_string(),
            "--config".to_string(),
            format!("{JEKYLL_CONFIG},{PAGES_CONFIG}"),
        ];

        if state.uses_bundler {
            let mut wrapped = vec!["exec".to_string(), "jekyll".to_string()];
            wrapped.append(&mut args);
            (tools.bundler.clone(), wrapped)
        } else {
            (tools.jekyll.clone(), args)
        }
    }

    /// Run a command in the site directory; non-zero exit is a rebuild failure.
    async fn spawn<I, S>(&self, program: &str, args: I) -> Result<(), BuildError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let command = CommandLine::new(program, args, &self.opts.site_path);
        let exit_code = self.execute(&command).await?;
        if exit_code != 0 {
            return Err(BuildError::RebuildFailed {
                repo: self.opts.repo_name.clone(),
                exit_code,
                command: command.to_string(),
            });
        }
        Ok(())
    }

    async fn execute(&self, command: &CommandLine) -> Result<i32, BuildError> {
        self.runner
            .run(command)
            .await
            .map_err(|source| BuildError::Spawn {
                repo: self.opts.repo_name.clone(),
                command: command.to_string(),
                source,
            })
    }
}
