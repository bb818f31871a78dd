//! Logging setup.

use tracing::Level;

/// Installs the global `tracing` subscriber at `level`.
///
/// Safe to call more than once; only the first call takes effect.
pub fn init(level: &str) {
    let _ = tracing_subscriber::fmt()
        .with_max_level(parse_level(level))
        .with_target(false)
        .try_init();
}

/// Parses a level name such as `"debug"` or `"WARN"`, falling back to
/// `INFO` for anything unrecognised.
pub fn parse_level(level: &str) -> Level {
    level.trim().parse().unwrap_or(Level::INFO)
}
