//! Logging initialisation via tracing-subscriber.
//!
//! Call [`init`] once at startup, before configuration resolution so the
//! resolver's events are captured.

use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;

use crate::error::AppError;

/// Filter used when neither `-v` nor `RUST_LOG` says otherwise.
const DEFAULT_FILTER: &str = "info";

/// Install the global subscriber, writing to stderr.
///
/// A non-zero `verbosity` (the number of `-v` flags) selects the level and
/// overrides `RUST_LOG`. Without it, `RUST_LOG` is used when set and valid,
/// falling back to `info`.
pub fn init(verbosity: u8) -> Result<(), AppError> {
    let filter = match level_for_verbosity(verbosity) {
        Some(level) => EnvFilter::builder()
            .with_default_directive(level.into())
            .parse_lossy(""),
        None => EnvFilter::try_from_default_env()
            .or_else(|_| EnvFilter::try_new(DEFAULT_FILTER))
            .map_err(|e| AppError::Logger(format!("invalid filter '{DEFAULT_FILTER}': {e}")))?,
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init()
        .map_err(|e| AppError::Logger(format!("failed to set subscriber: {e}")))
}

///   -v      → warn   (warnings and errors only)
///   -vv     → info   (normal startup output)
///   -vvv    → debug  (per-field resolution events)
///   -vvvv+  → trace
fn level_for_verbosity(verbosity: u8) -> Option<LevelFilter> {
    match verbosity {
        0 => None,
        1 => Some(LevelFilter::WARN),
        2 => Some(LevelFilter::INFO),
        3 => Some(LevelFilter::DEBUG),
        _ => Some(LevelFilter::TRACE),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn verbosity_tiers() {
        assert_eq!(level_for_verbosity(0), None);
        assert_eq!(level_for_verbosity(1), Some(LevelFilter::WARN));
        assert_eq!(level_for_verbosity(2), Some(LevelFilter::INFO));
        assert_eq!(level_for_verbosity(3), Some(LevelFilter::DEBUG));
        assert_eq!(level_for_verbosity(9), Some(LevelFilter::TRACE));
    }

    #[test]
    fn init_with_verbosity_succeeds_or_already_init() {
        // May already be set by a prior test in the same process.
        match init(3) {
            Ok(()) => {}
            Err(AppError::Logger(msg)) if msg.contains("set subscriber") => {}
            Err(e) => panic!("unexpected error: {e}"),
        }
    }
}
