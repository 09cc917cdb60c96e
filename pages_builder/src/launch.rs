//! Entry point for one webhook-triggered build.
//!
//! Wraps a [`SiteBuilder`] run in the site's [`UpdateLock`] and manages the
//! build log: written next to the working copy while the build runs, then
//! moved to `<dest_dir>/<repo>/build.log` where it is served publicly.

use std::path::Path;
use std::sync::Arc;

use crate::builder::SiteBuilder;
use crate::error::BuildError;
use crate::lock::UpdateLock;
use crate::logger::BuildLogger;
use crate::options::BuilderOptions;
use crate::request::BuildRequest;
use crate::runner::CommandRunner;

/// Build and publish the site named by `request`.
///
/// The whole log lifecycle runs under the site's lock, so a queued build of
/// the same site never truncates or moves the log of the one in progress.
pub async fn launch_builder(
    request: &BuildRequest,
    opts: BuilderOptions,
    runner: Arc<dyn CommandRunner>,
) -> Result<(), BuildError> {
    let lock = UpdateLock::new(&opts.repo_dir, &opts.repo_name);
    let repo_name = opts.repo_name.clone();

    let result = lock
        .run_exclusive(|| run_logged_build(request, opts, runner))
        .await;

    if let Err(e @ BuildError::LockAcquisition { .. }) = &result {
        tracing::error!(repo = %repo_name, "Build not started: {e}");
    }
    result
}

async fn run_logged_build(
    request: &BuildRequest,
    opts: BuilderOptions,
    runner: Arc<dyn CommandRunner>,
) -> Result<(), BuildError> {
    let build_log = opts.build_log_path();
    let published_log = opts.published_log_path();
    let repo_name = opts.repo_name.clone();

    let logger = BuildLogger::create(&build_log).await?;
    log_commit(&logger, request).await;

    let builder = SiteBuilder::new(opts, logger.clone(), runner);
    let result = builder.build().await;

    match &result {
        Ok(()) => logger.log(&format!("{repo_name}: build successful")).await,
        Err(e) => {
            logger.error(&e.to_string()).await;
            logger.error(&format!("{repo_name}: build failed")).await;
        }
    }

    if let Err(e) = relocate_log(&build_log, &published_log).await {
        tracing::error!(repo = %repo_name, "{e}");
    }

    result
}

async fn log_commit(logger: &BuildLogger, request: &BuildRequest) {
    let commit = &request.commit;
    logger
        .log(&format!(
            "{}: starting build at commit {}",
            request.repo_full_name, commit.id
        ))
        .await;
    logger.log(&format!("description: {}", commit.message)).await;
    logger.log(&format!("timestamp: {}", commit.timestamp)).await;
    logger
        .log(&format!("committer: {}", commit.committer_email))
        .await;
    logger
        .log(&format!(
            "pusher: {} {}",
            request.pusher_name, request.pusher_email
        ))
        .await;
    logger.log(&format!("sender: {}", request.sender)).await;
}

/// Move a finished build log to its public location.
///
/// The destination directory is created if the build never got as far as
/// producing it. A failed rename (e.g. across filesystems) falls back to
/// copy and remove.
pub async fn relocate_log(from: &Path, to: &Path) -> Result<(), BuildError> {
    let relocation_error = |source| BuildError::LogRelocation {
        from: from.to_path_buf(),
        to: to.to_path_buf(),
        source,
    };

    if let Some(parent) = to.parent() {
        tokio::fs::create_dir_all(parent)
            .await
            .map_err(relocation_error)?;
    }

    if tokio::fs::rename(from, to).await.is_ok() {
        return Ok(());
    }

    tokio::fs::copy(from, to).await.map_err(relocation_error)?;
    tokio::fs::remove_file(from)
        .await
        .map_err(relocation_error)
}
