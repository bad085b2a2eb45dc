use std::io::{self, IsTerminal};
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use sonic_mirror::download::ShutdownStage;
use sonic_mirror::{
    CatalogSource, CatalogWalker, ContentSniffer, DownloadOrchestrator, DownloadTask,
    PathResolver, ProgressObserver, RunReport, ShutdownSignal, SubsonicClient,
};
use tracing::{debug, info, warn};

use crate::ProcessExit;
use crate::app::{config_runtime, exit_handler, progress_manager, terminal};
use crate::cli::Args;

pub(crate) async fn run_mirror() -> Result<ProcessExit> {
    let args = match Args::try_parse() {
        Ok(args) => args,
        Err(err) => {
            let _ = err.print();
            return Ok(if err.use_stderr() {
                ProcessExit::Failure
            } else {
                ProcessExit::Success
            });
        }
    };

    let default_level = config_runtime::resolve_default_log_level(args.verbosity);
    let force_cli_log_level = config_runtime::should_force_cli_log_level(args.verbosity);
    let no_color = terminal::is_no_color_requested(args.no_color);
    terminal::init_tracing(default_level, force_cli_log_level, no_color);

    debug!(?args, "CLI arguments parsed");

    let config = config_runtime::resolve_config(&args)?;
    info!(server = %config.location, "sonic-mirror starting");

    let shutdown = ShutdownSignal::new();
    spawn_interrupt_listener(shutdown.clone());

    let client = Arc::new(SubsonicClient::new(&config.location, config.credentials.clone())?);
    let resolver = PathResolver::default();
    let discovery = async {
        client
            .ping()
            .await
            .with_context(|| format!("unable to log in to {}", config.location))?;
        CatalogWalker::new(client.as_ref(), &config.destination, resolver, config.force)
            .discover()
            .await
            .map_err(anyhow::Error::from)
    };
    let Some(songs) = until_stopped(discovery, &shutdown).await else {
        warn!("interrupted before downloading started; nothing was downloaded");
        return Ok(ProcessExit::Failure);
    };
    let songs = songs?;

    if songs.is_empty() {
        info!("nothing to download");
        return Ok(ProcessExit::Success);
    }

    let tasks = DownloadTask::batch(songs, &config.params);
    let total = tasks.len();

    let show_progress = terminal::should_show_progress(
        io::stderr().is_terminal(),
        args.non_interactive,
        terminal::is_dumb_terminal(),
        config_runtime::admits_info(default_level),
    );
    let reporter = show_progress.then(|| Arc::new(progress_manager::ProgressReporter::new(total)));
    let observer = reporter
        .clone()
        .map(|reporter| reporter as Arc<dyn ProgressObserver>);

    let engine = DownloadOrchestrator::new(
        config.workers,
        &config.destination,
        resolver,
        Arc::new(ContentSniffer::new()),
    )?;
    let source: Arc<dyn CatalogSource> = client;
    let report = engine.run(source, tasks, observer, &shutdown).await?;

    if let Some(reporter) = reporter {
        reporter.finish();
    }
    log_summary(&report);

    if report.was_interrupted() {
        warn!(
            written = report.written(),
            total, "interrupted; run again to fetch the remaining songs"
        );
    }

    Ok(exit_handler::determine_exit_outcome(&report))
}

/// First Ctrl-C stops new work, the second abandons in-flight downloads.
/// Installed before login so every phase reports the interrupt.
fn spawn_interrupt_listener(shutdown: ShutdownSignal) {
    tokio::spawn(async move {
        while tokio::signal::ctrl_c().await.is_ok() {
            match shutdown.escalate() {
                ShutdownStage::Draining => warn!(
                    "interrupted; finishing in-flight work, you may need to interrupt again"
                ),
                ShutdownStage::Abandoning => {
                    warn!("interrupted again; abandoning in-flight downloads");
                    break;
                }
            }
        }
    });
}

/// Runs `work` unless a stop is requested first; `None` means interrupted.
async fn until_stopped<T>(work: impl Future<Output = T>, shutdown: &ShutdownSignal) -> Option<T> {
    tokio::select! {
        biased;
        () = shutdown.stopped() => None,
        output = work => Some(output),
    }
}

fn log_summary(report: &RunReport) {
    for (task, error) in report.failures() {
        warn!(song = task.song.title(), error = %error, "song not downloaded");
    }
    info!(
        written = report.written(),
        failed = report.failed(),
        cancelled = report.cancelled(),
        bytes = report.bytes_written(),
        "mirror complete"
    );
}
