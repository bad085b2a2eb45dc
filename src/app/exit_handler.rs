//! Exit code logic for the mirror process.
//!
//! Single responsibility: map a finished run to the process exit outcome.

use sonic_mirror::RunReport;

use crate::ProcessExit;

/// Interrupted runs fail; otherwise the written/failed split decides.
pub(crate) fn determine_exit_outcome(report: &RunReport) -> ProcessExit {
    if report.was_interrupted() {
        return ProcessExit::Failure;
    }
    exit_for_counts(report.written(), report.failed())
}

fn exit_for_counts(written: usize, failed: usize) -> ProcessExit {
    if failed == 0 {
        ProcessExit::Success
    } else if written > 0 {
        ProcessExit::Partial
    } else {
        ProcessExit::Failure
    }
}
