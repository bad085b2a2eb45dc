//! Progress bar for download runs, and the log writer that keeps log lines
//! from tearing through it.

use std::io::{self, Write};
use std::sync::{Mutex, PoisonError};

use indicatif::{ProgressBar, ProgressStyle};
use sonic_mirror::{Outcome, ProgressObserver};
use tracing_subscriber::fmt::MakeWriter;

/// Bar currently on screen, if any.
static ACTIVE_BAR: Mutex<Option<ProgressBar>> = Mutex::new(None);

fn active_bar() -> Option<ProgressBar> {
    ACTIVE_BAR
        .lock()
        .unwrap_or_else(PoisonError::into_inner)
        .clone()
}

fn set_active_bar(bar: Option<ProgressBar>) {
    *ACTIVE_BAR.lock().unwrap_or_else(PoisonError::into_inner) = bar;
}

/// `tracing` writer for stderr that hides the active bar while a log line
/// is printed.
#[derive(Debug, Clone, Copy, Default)]
pub(crate) struct BarAwareStderr;

impl<'a> MakeWriter<'a> for BarAwareStderr {
    type Writer = BufferedLine;

    fn make_writer(&'a self) -> Self::Writer {
        BufferedLine(Vec::new())
    }
}

/// Collects one formatted event and emits it on drop.
pub(crate) struct BufferedLine(Vec<u8>);

impl Write for BufferedLine {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl Drop for BufferedLine {
    fn drop(&mut self) {
        if self.0.is_empty() {
            return;
        }
        let emit = || {
            let _ = io::stderr().write_all(&self.0);
        };
        match active_bar() {
            Some(bar) => bar.suspend(emit),
            None => emit(),
        }
    }
}

/// indicatif bar advanced once per finished song; titles scroll above it.
#[derive(Debug)]
pub(crate) struct ProgressReporter {
    bar: ProgressBar,
    on_screen: bool,
}

impl ProgressReporter {
    /// Creates the on-screen bar; log lines are routed around it until
    /// [`Self::finish`].
    pub(crate) fn new(total: usize) -> Self {
        let mut reporter = Self::with_bar(ProgressBar::new(total as u64));
        set_active_bar(Some(reporter.bar.clone()));
        reporter.on_screen = true;
        reporter
    }

    fn with_bar(bar: ProgressBar) -> Self {
        bar.set_style(
            ProgressStyle::with_template("{bar:40} {pos}/{len}")
                .unwrap_or_else(|_| ProgressStyle::default_bar()),
        );
        bar.println("downloading songs:");
        Self {
            bar,
            on_screen: false,
        }
    }

    pub(crate) fn finish(&self) {
        if self.on_screen {
            set_active_bar(None);
        }
        self.bar.finish_and_clear();
    }
}

impl ProgressObserver for ProgressReporter {
    fn on_task_completed(&self, title: &str, outcome: &Outcome) {
        match outcome {
            Outcome::Written { .. } => self.bar.println(title),
            Outcome::Failed(_) => self.bar.println(format!("{title} (failed)")),
            Outcome::Cancelled => {}
        }
        self.bar.inc(1);
    }
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use super::*;

    #[test]
    fn test_reporter_advances_once_per_task() {
        let reporter = ProgressReporter::with_bar(ProgressBar::hidden());
        reporter.bar.set_length(3);

        let written = Outcome::Written {
            path: PathBuf::from("A/B/E.mp3"),
            bytes: 4,
        };
        reporter.on_task_completed("E", &written);
        reporter.on_task_completed("F", &Outcome::Cancelled);

        assert_eq!(reporter.bar.position(), 2);
        reporter.finish();
        assert!(reporter.bar.is_finished());
    }

    #[test]
    fn test_log_lines_route_around_registered_bar() {
        let reporter = ProgressReporter::new(2);
        assert!(active_bar().is_some());

        // Printing while the bar is registered goes through `suspend`.
        let mut line = BarAwareStderr.make_writer();
        line.write_all(b"WARN song download failed\n").unwrap();
        assert_eq!(line.0, b"WARN song download failed\n");
        drop(line);

        reporter.finish();
        assert!(active_bar().is_none());
    }
}
