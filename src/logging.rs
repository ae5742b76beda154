//! Diagnostic logging to stderr.
//!
//! User-facing progress goes through [`crate::output`]; this is only for
//! `--debug` style diagnostics. `RUST_LOG` overrides everything.

use log::LevelFilter;

/// Pick the level from CLI flags first, then the configured `log_level`.
pub fn resolve_level(debug: bool, quiet: bool, configured: &str) -> LevelFilter {
    if debug {
        return LevelFilter::Debug;
    }
    if quiet {
        return LevelFilter::Error;
    }
    parse_level(configured).unwrap_or(LevelFilter::Warn)
}

fn parse_level(level: &str) -> Option<LevelFilter> {
    match level.trim().to_lowercase().as_str() {
        "off" => Some(LevelFilter::Off),
        "error" => Some(LevelFilter::Error),
        "warn" | "warning" => Some(LevelFilter::Warn),
        "info" => Some(LevelFilter::Info),
        "debug" => Some(LevelFilter::Debug),
        "trace" => Some(LevelFilter::Trace),
        _ => None,
    }
}

/// Install the global logger. Safe to call more than once; later calls are ignored.
pub fn init(level: LevelFilter) {
    let mut builder = env_logger::Builder::new();
    builder
        .filter_level(level)
        .format_timestamp(None)
        .format_target(level >= LevelFilter::Debug);
    // RUST_LOG wins over flags and config
    if let Ok(spec) = std::env::var("RUST_LOG") {
        builder.parse_filters(&spec);
    }
    if builder.try_init().is_err() {
        log::debug!("Logger already initialised");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flags_take_precedence_over_config() {
        assert_eq!(resolve_level(true, true, "error"), LevelFilter::Debug);
        assert_eq!(resolve_level(false, true, "trace"), LevelFilter::Error);
        assert_eq!(resolve_level(false, false, "info"), LevelFilter::Info);
    }

    #[test]
    fn test_unknown_level_falls_back_to_warn() {
        assert_eq!(resolve_level(false, false, "loud"), LevelFilter::Warn);
        assert_eq!(parse_level(" WARNING "), Some(LevelFilter::Warn));
    }
}
