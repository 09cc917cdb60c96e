//! Generator configuration discovery for a site's working copy.
//!
//! A site may carry its own `_config_18f_pages.yml`; its `baseurl` then
//! decides where the generated site is published. Otherwise a minimal one
//! is written for the duration of the build and removed afterwards.

use std::path::{Component, Path, PathBuf};
use std::sync::LazyLock;

use regex::Regex;

use crate::error::BuildError;
use crate::options::BuilderOptions;

/// Marks a site as generator-built; without it the site is synced as-is.
pub const JEKYLL_CONFIG: &str = "_config.yml";
/// Pipeline-managed override layered on top of [`JEKYLL_CONFIG`].
pub const PAGES_CONFIG: &str = "_config_18f_pages.yml";
pub const GEMFILE: &str = "Gemfile";

static BASEURL_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?m)^baseurl:(.*)$").unwrap());

/// Outcome of resolving the override config.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConfigResolution {
    /// Destination taken from an existing config's `baseurl`, if any.
    pub destination: Option<PathBuf>,
    /// Whether [`PAGES_CONFIG`] was written by this build.
    pub generated: bool,
}

#[derive(Debug, Clone)]
pub struct ConfigResolver {
    site_path: PathBuf,
    dest_dir: PathBuf,
    repo_name: String,
    asset_root: String,
}

impl ConfigResolver {
    pub fn new(opts: &BuilderOptions) -> Self {
        Self {
            site_path: opts.site_path.clone(),
            dest_dir: opts.dest_dir.clone(),
            repo_name: opts.repo_name.clone(),
            asset_root: opts.asset_root.clone(),
        }
    }

    pub fn config_path(&self) -> PathBuf {
        self.site_path.join(PAGES_CONFIG)
    }

    /// Whether `relative_path` exists inside the working copy. Errors count
    /// as absent.
    ///
    /// The answer can go stale before the caller acts on it; nothing in the
    /// pipeline depends on it for safety.
    pub async fn check_for_file(&self, relative_path: impl AsRef<Path>) -> bool {
        tokio::fs::try_exists(self.site_path.join(relative_path))
            .await
            .unwrap_or(false)
    }

    /// Read the existing override config, or write a default one.
    pub async fn resolve_config(&self, exists: bool) -> Result<ConfigResolution, BuildError> {
        let path = self.config_path();

        if exists {
            let data = tokio::fs::read_to_string(&path)
                .await
                .map_err(|source| BuildError::ConfigIo {
                    action: "read",
                    path: path.clone(),
                    source,
                })?;
            return Ok(ConfigResolution {
                destination: parse_destination(&data, &self.dest_dir),
                generated: false,
            });
        }

        // Written aside and renamed into place: a partial file left under
        // the config's name would pass for the site's own on the next build.
        let staging = self.site_path.join(format!(".{PAGES_CONFIG}.tmp"));
        let written = match tokio::fs::write(&staging, self.default_config()).await {
            Ok(()) => tokio::fs::rename(&staging, &path).await,
            Err(e) => Err(e),
        };
        if let Err(source) = written {
            let _ = tokio::fs::remove_file(&staging).await;
            return Err(BuildError::ConfigIo {
                action: "write",
                path,
                source,
            });
        }

        Ok(ConfigResolution {
            destination: None,
            generated: true,
        })
    }

    /// Delete a config this build generated.
    pub async fn remove_generated(&self) -> Result<(), BuildError> {
        let path = self.config_path();
        tokio::fs::remove_file(&path)
            .await
            .map_err(|source| BuildError::ConfigIo {
                action: "remove",
                path,
                source,
            })
    }

    pub fn default_config(&self) -> String {
        format!(
            "baseurl: /{}\nasset_root: {}\n",
            self.repo_name, self.asset_root
        )
    }
}

/// Destination named by the first `baseurl:` line of a config.
///
/// A value that is empty or only slashes means "not set". So does one with
/// `.`/`..` segments or any other component that could name a directory
/// outside a child of `dest_dir`.
pub fn parse_destination(config_data: &str, dest_dir: &Path) -> Option<PathBuf> {
    let value = BASEURL_REGEX.captures(config_data)?.get(1)?.as_str().trim();
    let relative = Path::new(value.trim_start_matches('/'));
    if relative.as_os_str().is_empty()
        || !relative
            .components()
            .all(|c| matches!(c, Component::Normal(_)))
    {
        return None;
    }
    Some(dest_dir.join(relative))
}
