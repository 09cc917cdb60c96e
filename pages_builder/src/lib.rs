//! Pages builder: rebuilds and publishes static sites from git pushes.
//!
//! A push to a publishing branch becomes a [`BuildRequest`]. [`launch_builder`]
//! takes the site's [`UpdateLock`], runs the [`SiteBuilder`] state machine
//! (clone or sync, dependency install, config resolution, generate or sync)
//! and publishes the build log next to the generated site.

pub mod builder;
pub mod error;
pub mod launch;
pub mod lock;
pub mod logger;
pub mod options;
pub mod request;
pub mod runner;
pub mod site_config;

pub use builder::{BuildState, SiteBuilder, Step};
pub use error::BuildError;
pub use launch::launch_builder;
pub use lock::UpdateLock;
pub use logger::BuildLogger;
pub use options::{BuilderOptions, BuilderProfile, SiteTools};
pub use request::BuildRequest;
pub use runner::{CommandLine, CommandRunner, ProcessRunner};
