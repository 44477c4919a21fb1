//! Logging initialization.
//!
//! Log output goes to stderr; stdout carries command output (summaries,
//! JSON reports) so it can be piped.

use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Install the global subscriber.
///
/// `RUST_LOG`, when set, wins over `level`. Library crates other than
/// tagcheck stay at `warn` so HTTP client chatter doesn't drown the output.
pub fn init(level: &str, json_format: bool) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directives(level)));

    if json_format {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(
                fmt::layer()
                    .with_target(false)
                    .with_writer(std::io::stderr)
                    .with_ansi(true),
            )
            .init();
    }
}

/// Initialize logging from the `[logging]` config section.
///
/// `-v` forces debug; `--json-logs` forces JSON.
pub fn init_from_config(
    config: &tagcheck_core::Config,
    verbose_override: bool,
    json_logs_override: bool,
) {
    let level = effective_level(&config.logging.level, verbose_override);
    let json_format = json_logs_override || config.logging.format == "json";
    init(level, json_format);
}

fn effective_level(configured: &str, verbose: bool) -> &str {
    match (verbose, configured) {
        (true, "trace") => "trace",
        (true, _) => "debug",
        (false, level) => level,
    }
}

fn default_directives(level: &str) -> String {
    format!("warn,tagcheck={level},tagcheck_core={level}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn verbose_raises_to_debug_but_keeps_trace() {
        assert_eq!(effective_level("info", true), "debug");
        assert_eq!(effective_level("trace", true), "trace");
        assert_eq!(effective_level("warn", false), "warn");
    }

    #[test]
    fn directives_scope_level_to_our_crates() {
        assert_eq!(
            default_directives("debug"),
            "warn,tagcheck=debug,tagcheck_core=debug"
        );
        assert!(EnvFilter::try_new(default_directives("info")).is_ok());
    }
}
