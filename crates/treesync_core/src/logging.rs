//! Console logging setup.

use tracing_subscriber::EnvFilter;

/// Maps a verbosity count to a filter directive.
///
/// `0` shows warnings and errors, `1` adds info, `2` or more adds debug.
#[must_use]
pub fn verbosity_directive(verbosity: u8) -> &'static str {
    match verbosity {
        0 => "warn",
        1 => "info",
        _ => "debug",
    }
}

/// Installs a console subscriber for `tracing` events.
///
/// Returns `false` if a global subscriber was already installed, in which
/// case the existing one is left in place.
pub fn enable_console_logging(verbosity: u8) -> bool {
    let filter = EnvFilter::new(verbosity_directive(verbosity));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .try_init()
        .is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn verbosity_levels() {
        assert_eq!(verbosity_directive(0), "warn");
        assert_eq!(verbosity_directive(1), "info");
        assert_eq!(verbosity_directive(2), "debug");
        assert_eq!(verbosity_directive(9), "debug");
    }

    #[test]
    fn second_install_is_refused() {
        enable_console_logging(0);
        assert!(!enable_console_logging(2));
    }
}
