//! Bounded worker pool running download tasks.
//!
//! The orchestrator spawns one Tokio task per song, gated by a semaphore so
//! at most `max_workers` downloads run at once. Per-song failures are
//! recorded in that song's outcome and never stop the batch.
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use sonic_mirror::catalog::CatalogSource;
//! use sonic_mirror::download::{
//!     ContentSniffer, DownloadOrchestrator, DownloadTask, PathResolver, ShutdownSignal,
//! };
//!
//! # async fn example(source: Arc<dyn CatalogSource>, tasks: Vec<DownloadTask>)
//! #     -> Result<(), Box<dyn std::error::Error>> {
//! let engine = DownloadOrchestrator::new(
//!     4,
//!     "/music",
//!     PathResolver::default(),
//!     Arc::new(ContentSniffer::new()),
//! )?;
//! let report = engine.run(source, tasks, None, &ShutdownSignal::new()).await?;
//! println!("written: {}, failed: {}", report.written(), report.failed());
//! # Ok(())
//! # }
//! ```

use std::path::PathBuf;
use std::sync::Arc;

use tokio::sync::Semaphore;
use tokio::task::JoinHandle;
use tracing::{debug, info, instrument, warn};

use crate::catalog::CatalogSource;

use super::DownloadError;
use super::error::{EngineError, MAX_WORKERS, MIN_WORKERS};
use super::observer::ProgressObserver;
use super::path::PathResolver;
use super::sniff::ContentSniffer;
use super::task::{DownloadTask, Outcome, TaskContext, TaskOutcome, process_download_task};

/// Default worker count: the available hardware parallelism.
#[must_use]
pub fn default_worker_count() -> usize {
    std::thread::available_parallelism().map_or(MIN_WORKERS, std::num::NonZeroUsize::get)
}

/// Outcomes of a batch, one per task, in task order.
#[derive(Debug, Default)]
pub struct RunReport {
    outcomes: Vec<TaskOutcome>,
}

impl RunReport {
    #[must_use]
    pub fn outcomes(&self) -> &[TaskOutcome] {
        &self.outcomes
    }

    #[must_use]
    pub fn into_outcomes(self) -> Vec<TaskOutcome> {
        self.outcomes
    }

    /// Number of tasks in the batch.
    #[must_use]
    pub fn total(&self) -> usize {
        self.outcomes.len()
    }

    #[must_use]
    pub fn written(&self) -> usize {
        self.count(Outcome::is_written)
    }

    #[must_use]
    pub fn failed(&self) -> usize {
        self.count(Outcome::is_failed)
    }

    #[must_use]
    pub fn cancelled(&self) -> usize {
        self.count(Outcome::is_cancelled)
    }

    /// Total bytes written across all successful tasks.
    #[must_use]
    pub fn bytes_written(&self) -> u64 {
        self.outcomes
            .iter()
            .map(|o| match o.outcome {
                Outcome::Written { bytes, .. } => bytes,
                _ => 0,
            })
            .sum()
    }

    /// Returns true if a shutdown left at least one task unfinished. A stop
    /// requested after every task already ran does not count.
    #[must_use]
    pub fn was_interrupted(&self) -> bool {
        self.cancelled() > 0
    }

    /// Iterates over the failed tasks.
    pub fn failures(&self) -> impl Iterator<Item = (&TaskOutcome, &DownloadError)> {
        self.outcomes.iter().filter_map(|o| match &o.outcome {
            Outcome::Failed(error) => Some((o, error)),
            _ => None,
        })
    }

    fn count(&self, predicate: impl Fn(&Outcome) -> bool) -> usize {
        self.outcomes
            .iter()
            .filter(|o| predicate(&o.outcome))
            .count()
    }
}

/// Runs download tasks on a bounded pool of workers.
#[derive(Debug)]
pub struct DownloadOrchestrator {
    semaphore: Arc<Semaphore>,
    max_workers: usize,
    ctx: TaskContext,
}

impl DownloadOrchestrator {
    /// Creates an orchestrator writing below `root`.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::InvalidWorkerCount`] if `max_workers` is zero.
    /// Counts above [`MAX_WORKERS`] are clamped with a warning.
    #[instrument(level = "debug", skip(root, resolver, sniffer))]
    pub fn new(
        max_workers: usize,
        root: impl Into<PathBuf>,
        resolver: PathResolver,
        sniffer: Arc<ContentSniffer>,
    ) -> Result<Self, EngineError> {
        if max_workers < MIN_WORKERS {
            return Err(EngineError::InvalidWorkerCount { value: max_workers });
        }
        let max_workers = if max_workers > MAX_WORKERS {
            warn!(
                requested = max_workers,
                used = MAX_WORKERS, "worker count too large, clamping"
            );
            MAX_WORKERS
        } else {
            max_workers
        };
        debug!(max_workers, "creating download orchestrator");

        Ok(Self {
            semaphore: Arc::new(Semaphore::new(max_workers)),
            max_workers,
            ctx: TaskContext {
                root: root.into(),
                resolver,
                sniffer,
            },
        })
    }

    #[must_use]
    pub fn max_workers(&self) -> usize {
        self.max_workers
    }

    /// Runs every task and returns one outcome per task.
    ///
    /// After [`ShutdownSignal::request_stop`] no further task is submitted and
    /// in-flight tasks drain. After [`ShutdownSignal::abandon`] in-flight tasks
    /// are aborted. Tasks that never ran or were aborted are reported as
    /// [`Outcome::Cancelled`].
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::SemaphoreClosed`] if the semaphore is closed.
    /// Individual download failures do not cause this method to error.
    ///
    /// [`ShutdownSignal::request_stop`]: super::ShutdownSignal::request_stop
    /// [`ShutdownSignal::abandon`]: super::ShutdownSignal::abandon
    #[instrument(skip_all, fields(tasks = tasks.len(), root = %self.ctx.root.display()))]
    pub async fn run(
        &self,
        source: Arc<dyn CatalogSource>,
        tasks: Vec<DownloadTask>,
        observer: Option<Arc<dyn ProgressObserver>>,
        shutdown: &super::ShutdownSignal,
    ) -> Result<RunReport, EngineError> {
        let mut slots: Vec<Option<Outcome>> = tasks.iter().map(|_| None).collect();
        let mut handles: Vec<(usize, JoinHandle<Outcome>)> = Vec::with_capacity(tasks.len());

        info!(max_workers = self.max_workers, "starting downloads");

        for (index, task) in tasks.iter().enumerate() {
            if shutdown.is_stop_requested() {
                break;
            }

            // Race the permit against the stop request so an interrupt while
            // every worker is busy takes effect immediately.
            let permit = tokio::select! {
                biased;
                () = shutdown.stopped() => None,
                result = Arc::clone(&self.semaphore).acquire_owned() => {
                    Some(result.map_err(|_| EngineError::SemaphoreClosed)?)
                }
            };
            let Some(permit) = permit else {
                break;
            };

            debug!(song_id = task.song().id(), "submitting download");
            let source = Arc::clone(&source);
            let observer = observer.clone();
            let ctx = self.ctx.clone();
            let task = task.clone();
            handles.push((
                index,
                tokio::spawn(async move {
                    let _permit = permit;
                    let outcome = process_download_task(source.as_ref(), &task, &ctx).await;
                    if let Some(observer) = observer {
                        observer.on_task_completed(task.song().title(), &outcome);
                    }
                    outcome
                }),
            ));
        }

        if shutdown.is_stop_requested() {
            warn!(
                in_flight = handles.len(),
                "no new downloads will be started; waiting for in-flight downloads"
            );
        }

        for (index, mut handle) in handles {
            let joined = tokio::select! {
                biased;
                joined = &mut handle => joined,
                () = shutdown.abandoned() => {
                    handle.abort();
                    handle.await
                }
            };
            slots[index] = Some(match joined {
                Ok(outcome) => outcome,
                Err(e) if e.is_cancelled() => Outcome::Cancelled,
                Err(e) => {
                    let song = tasks[index].song();
                    warn!(song_id = song.id(), error = %e, "download task panicked");
                    let outcome = Outcome::Failed(DownloadError::Panicked {
                        song_id: song.id().to_string(),
                        message: e.to_string(),
                    });
                    if let Some(observer) = &observer {
                        observer.on_task_completed(song.title(), &outcome);
                    }
                    outcome
                }
            });
        }

        let outcomes = tasks
            .into_iter()
            .zip(slots)
            .map(|(task, slot)| TaskOutcome {
                song: task.song().clone(),
                outcome: slot.unwrap_or(Outcome::Cancelled),
            })
            .collect();
        let report = RunReport { outcomes };

        info!(
            written = report.written(),
            failed = report.failed(),
            cancelled = report.cancelled(),
            total = report.total(),
            "downloads complete"
        );
        Ok(report)
    }
}
