//! Song download pipeline.
//!
//! Turns a discovered work list into files on disk:
//!
//! - [`PathResolver`] maps catalog names onto a safe relative path
//! - [`SkipFilter`] detects songs already present under any extension
//! - [`ContentSniffer`] infers the extension from the downloaded bytes
//! - [`DownloadOrchestrator`] runs the tasks on a bounded worker pool
//! - [`ShutdownSignal`] carries the two-stage interrupt into the pool

mod engine;
mod error;
mod observer;
pub mod path;
mod shutdown;
mod skip;
pub mod sniff;
mod task;

pub use engine::{DownloadOrchestrator, RunReport, default_worker_count};
pub use error::{DownloadError, EngineError, MAX_WORKERS, MIN_WORKERS};
pub use observer::ProgressObserver;
pub use path::{PathError, PathResolver, SanitizeRules};
pub use shutdown::{ShutdownSignal, ShutdownStage};
pub use skip::SkipFilter;
pub use sniff::ContentSniffer;
pub use task::{DownloadTask, Outcome, RunParameters, TaskOutcome};
