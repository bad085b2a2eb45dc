//! Turns parsed CLI arguments into a validated run configuration.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use sonic_mirror::download::default_worker_count;
use sonic_mirror::{
    Credentials, RunParameters, ServerLocation, StreamOptions, resolve_credentials,
};
use tracing::debug;

use crate::app::validation;
use crate::cli::Args;

/// Everything a run needs, checked before any network or traversal work.
#[derive(Debug)]
pub(crate) struct RunConfig {
    pub(crate) location: ServerLocation,
    pub(crate) credentials: Credentials,
    pub(crate) destination: PathBuf,
    pub(crate) workers: usize,
    pub(crate) force: bool,
    pub(crate) params: Arc<RunParameters>,
}

/// Validates `args` into a [`RunConfig`].
///
/// Order: server address, credentials, destination directory.
pub(crate) fn resolve_config(args: &Args) -> Result<RunConfig> {
    let location = ServerLocation::parse(&args.source).context("unable to parse server address")?;

    let credentials = resolve_credentials(
        &location,
        args.netrc_file.as_deref(),
        args.user.as_deref(),
        args.password.as_deref(),
    )
    .context("unable to get user and password from netrc file or arguments")?;

    let destination = validation::ensure_destination_dir(&args.destination)?;

    let workers = args.threads.unwrap_or_else(default_worker_count);
    let params = Arc::new(RunParameters {
        stream: StreamOptions {
            bitrate: args.bitrate,
            format: args.format.clone(),
        },
        extension_override: args.extension.clone(),
    });

    debug!(
        server = %location,
        destination = %destination.display(),
        workers,
        force = args.force,
        "configuration resolved"
    );

    Ok(RunConfig {
        location,
        credentials,
        destination,
        workers,
        force: args.force,
        params,
    })
}

/// Maps the `-V` count to a tracing level.
///
/// No flag means `info`; one flag shows only the most severe messages, and
/// each further flag widens the filter.
pub(crate) fn resolve_default_log_level(verbosity: u8) -> &'static str {
    match verbosity {
        0 | 4 => "info",
        1 | 2 => "error",
        3 => "warn",
        5 => "debug",
        _ => "trace",
    }
}

/// An explicit `-V` overrides `RUST_LOG`.
pub(crate) fn should_force_cli_log_level(verbosity: u8) -> bool {
    verbosity > 0
}

/// Whether info-level messages (song titles, progress) are shown.
pub(crate) fn admits_info(level: &str) -> bool {
    matches!(level, "info" | "debug" | "trace")
}
