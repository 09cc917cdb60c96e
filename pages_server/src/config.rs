//! Server configuration: builder profiles and tool locations.
//!
//! Defaults derive from the `--home` and `--rbenv` roots; an optional JSON
//! file can replace the profiles and override clone/config settings.

use std::path::Path;

use anyhow::Context;
use pages_builder::options::{DEFAULT_ASSET_ROOT, DEFAULT_REMOTE_PREFIX};
use pages_builder::{BuildRequest, BuilderOptions, BuilderProfile, SiteTools};
use serde::Deserialize;

pub const PRODUCTION_BRANCH: &str = "18f-pages";
pub const STAGING_BRANCH: &str = "18f-pages-staging";

#[derive(Clone, Debug)]
pub struct PagesConfig {
    /// Publishing branches and their working/output roots.
    pub profiles: Vec<BuilderProfile>,
    pub tools: SiteTools,
    /// Clone addresses are `<remote_prefix>/<repo>.git`.
    pub remote_prefix: String,
    /// `asset_root` written into generated override configs.
    pub asset_root: String,
}

/// Optional JSON overrides, e.g.
///
/// ```json
/// { "profiles": [{ "branch": "18f-pages", "repository_dir": "/srv/repos",
///                  "generated_site_dir": "/srv/sites" }],
///   "remote_prefix": "git@github.com:18F" }
/// ```
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ConfigFile {
    pub profiles: Option<Vec<BuilderProfile>>,
    pub remote_prefix: Option<String>,
    pub asset_root: Option<String>,
    pub rsync_opts: Option<Vec<String>>,
}

impl PagesConfig {
    pub fn new(home: &Path, rbenv: &Path, git: &str, rsync: &str) -> Self {
        let shims = rbenv.join("shims");
        let tools = SiteTools {
            git: git.to_string(),
            bundler: shims.join("bundle").display().to_string(),
            jekyll: shims.join("jekyll").display().to_string(),
            rsync: rsync.to_string(),
            ..SiteTools::default()
        };

        Self {
            profiles: vec![
                BuilderProfile {
                    branch: PRODUCTION_BRANCH.to_string(),
                    repository_dir: home.join("pages-repos"),
                    generated_site_dir: home.join("pages-generated"),
                },
                BuilderProfile {
                    branch: STAGING_BRANCH.to_string(),
                    repository_dir: home.join("pages-repos-staging"),
                    generated_site_dir: home.join("pages-staging"),
                },
            ],
            tools,
            remote_prefix: DEFAULT_REMOTE_PREFIX.to_string(),
            asset_root: DEFAULT_ASSET_ROOT.to_string(),
        }
    }

    pub fn with_file(mut self, path: &Path) -> anyhow::Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("reading config file {}", path.display()))?;
        let file: ConfigFile = serde_json::from_str(&raw)
            .with_context(|| format!("parsing config file {}", path.display()))?;
        self.apply(file);
        Ok(self)
    }

    pub fn apply(&mut self, file: ConfigFile) {
        if let Some(profiles) = file.profiles {
            self.profiles = profiles;
        }
        if let Some(prefix) = file.remote_prefix {
            self.remote_prefix = prefix;
        }
        if let Some(asset_root) = file.asset_root {
            self.asset_root = asset_root;
        }
        if let Some(opts) = file.rsync_opts {
            self.tools.rsync_opts = opts;
        }
    }

    pub fn profile_for_branch(&self, branch: &str) -> Option<&BuilderProfile> {
        self.profiles.iter().find(|p| p.branch == branch)
    }

    /// Options for building `request`, if its branch publishes anywhere.
    pub fn options_for(&self, request: &BuildRequest) -> Option<BuilderOptions> {
        let profile = self.profile_for_branch(&request.branch)?;
        Some(
            BuilderOptions::for_request(request, profile, self.tools.clone())
                .with_remote_prefix(&self.remote_prefix)
                .with_asset_root(&self.asset_root),
        )
    }

    /// Create every profile's repository and output roots.
    pub fn ensure_directories(&self) -> anyhow::Result<()> {
        for profile in &self.profiles {
            for dir in [&profile.repository_dir, &profile.generated_site_dir] {
                create_dir(dir)?;
            }
        }
        Ok(())
    }
}

fn create_dir(dir: &Path) -> anyhow::Result<()> {
    std::fs::create_dir_all(dir).with_context(|| format!("creating {}", dir.display()))
}
