//! Per-build options: where a site lives, where it publishes, which tools build it.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::request::BuildRequest;

pub const DEFAULT_REMOTE_PREFIX: &str = "git@github.com:18F";
pub const DEFAULT_ASSET_ROOT: &str = "/guides-template";
pub const DEFAULT_RSYNC_OPTS: [&str; 3] = ["-vaxp", "--delete", "--ignore-errors"];

/// External programs used by a build.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SiteTools {
    pub git: String,
    pub bundler: String,
    pub jekyll: String,
    pub rsync: String,
    pub rsync_opts: Vec<String>,
}

impl Default for SiteTools {
    fn default() -> Self {
        Self {
            git: "git".to_string(),
            bundler: "bundle".to_string(),
            jekyll: "jekyll".to_string(),
            rsync: "rsync".to_string(),
            rsync_opts: DEFAULT_RSYNC_OPTS.iter().map(|s| s.to_string()).collect(),
        }
    }
}

/// A branch that triggers publishing, with its own working and output roots.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuilderProfile {
    pub branch: String,
    pub repository_dir: PathBuf,
    pub generated_site_dir: PathBuf,
}

/// Everything one site build needs. Immutable for the life of the build.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuilderOptions {
    pub repo_dir: PathBuf,
    pub repo_name: String,
    pub site_path: PathBuf,
    pub branch: String,
    pub dest_dir: PathBuf,
    pub build_destination: PathBuf,
    pub remote_prefix: String,
    pub asset_root: String,
    pub tools: SiteTools,
}

impl BuilderOptions {
    pub fn new(
        repo_dir: impl Into<PathBuf>,
        dest_dir: impl Into<PathBuf>,
        repo_name: &str,
        branch: &str,
        tools: SiteTools,
    ) -> Self {
        let repo_dir = repo_dir.into();
        let dest_dir = dest_dir.into();
        Self {
            site_path: repo_dir.join(repo_name),
            build_destination: dest_dir.join(repo_name),
            repo_dir,
            dest_dir,
            repo_name: repo_name.to_string(),
            branch: branch.to_string(),
            remote_prefix: DEFAULT_REMOTE_PREFIX.to_string(),
            asset_root: DEFAULT_ASSET_ROOT.to_string(),
            tools,
        }
    }

    pub fn for_request(request: &BuildRequest, profile: &BuilderProfile, tools: SiteTools) -> Self {
        Self::new(
            &profile.repository_dir,
            &profile.generated_site_dir,
            &request.repo_name,
            &request.branch,
            tools,
        )
    }

    pub fn with_remote_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.remote_prefix = prefix.into();
        self
    }

    pub fn with_asset_root(mut self, asset_root: impl Into<String>) -> Self {
        self.asset_root = asset_root.into();
        self
    }

    /// Clone address, e.g. `git@github.com:18F/<repo>.git`.
    pub fn clone_url(&self) -> String {
        format!(
            "{}/{}.git",
            self.remote_prefix.trim_end_matches('/'),
            self.repo_name
        )
    }

    /// Temporary build log next to the working copy.
    pub fn build_log_path(&self) -> PathBuf {
        let mut log = self.site_path.clone().into_os_string();
        log.push(".log");
        PathBuf::from(log)
    }

    /// Stable, publicly served location of the finished build log.
    pub fn published_log_path(&self) -> PathBuf {
        self.dest_dir.join(&self.repo_name).join("build.log")
    }
}
