//! Terminal capability checks and tracing setup.

pub(crate) fn no_color_env_requested() -> bool {
    std::env::var_os("NO_COLOR").is_some_and(|value| !value.is_empty())
}

pub(crate) fn is_dumb_terminal() -> bool {
    std::env::var("TERM")
        .map(|value| value.eq_ignore_ascii_case("dumb"))
        .unwrap_or(false)
}

pub(crate) fn should_disable_color(
    no_color_flag: bool,
    no_color_env: bool,
    dumb_terminal: bool,
) -> bool {
    no_color_flag || no_color_env || dumb_terminal
}

pub(crate) fn is_no_color_requested(no_color_flag: bool) -> bool {
    should_disable_color(no_color_flag, no_color_env_requested(), is_dumb_terminal())
}

/// The progress bar needs a real terminal, an info-level log and an
/// interactive run.
pub(crate) fn should_show_progress(
    stderr_is_terminal: bool,
    non_interactive: bool,
    dumb_terminal: bool,
    shows_info: bool,
) -> bool {
    stderr_is_terminal && !non_interactive && !dumb_terminal && shows_info
}

/// Installs the global subscriber. Log lines go to stderr around any
/// progress bar.
pub(crate) fn init_tracing(default_level: &str, force_cli_level: bool, no_color: bool) {
    let filter = if force_cli_level {
        tracing_subscriber::EnvFilter::new(default_level)
    } else {
        tracing_subscriber::EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level))
    };
    let _ = tracing_subscriber::fmt()
        .with_writer(crate::app::progress_manager::BarAwareStderr)
        .with_ansi(!no_color)
        .with_target(false)
        .with_env_filter(filter)
        .try_init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_color_disabled_by_any_source() {
        assert!(!should_disable_color(false, false, false));
        assert!(should_disable_color(true, false, false));
        assert!(should_disable_color(false, true, false));
        assert!(should_disable_color(false, false, true));
    }

    #[test]
    fn test_progress_requires_every_condition() {
        assert!(should_show_progress(true, false, false, true));
        assert!(!should_show_progress(false, false, false, true));
        assert!(!should_show_progress(true, true, false, true));
        assert!(!should_show_progress(true, false, true, true));
        assert!(!should_show_progress(true, false, false, false));
    }
}
