//! Task completion notifications.

use super::task::Outcome;

/// Receives a callback each time a download task finishes.
///
/// Called from worker tasks, possibly concurrently; implementations must not
/// block for long.
pub trait ProgressObserver: Send + Sync {
    /// Called once per finished task with the song title and its outcome.
    fn on_task_completed(&self, title: &str, outcome: &Outcome);
}
