//! CLI entry point for sonic-mirror.

use std::process::ExitCode;

use tracing::error;

mod app;
mod cli;

/// Process exit outcome: `0` success, `1` failure, `2` partial.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ProcessExit {
    Success,
    Failure,
    Partial,
}

impl ProcessExit {
    pub(crate) fn code(self) -> u8 {
        match self {
            Self::Success => 0,
            Self::Failure => 1,
            Self::Partial => 2,
        }
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    match app::runtime::run_mirror().await {
        Ok(exit) => ExitCode::from(exit.code()),
        Err(err) => {
            error!("{err:#}");
            ExitCode::from(ProcessExit::Failure.code())
        }
    }
}
