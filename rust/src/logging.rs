//! Logging setup with verbosity level control.
//!
//! Library code logs through `tracing`; this module only decides what a
//! host process sees. Verbosity levels:
//! - 0: SILENT (errors only)
//! - 1: CHANGES (library loads, compile summaries, dropped ids)
//! - 2: CHECKS (flags, waivers, matrix slots)
//! - 3: DEBUG (full algorithm internals)

use tracing_subscriber::EnvFilter;

/// Verbosity level constants.
pub const VERBOSITY_SILENT: u8 = 0;
pub const VERBOSITY_CHANGES: u8 = 1;
pub const VERBOSITY_CHECKS: u8 = 2;
pub const VERBOSITY_DEBUG: u8 = 3;

/// `EnvFilter` directive for a verbosity level. Levels above DEBUG clamp.
pub fn filter_directive(verbosity: u8) -> &'static str {
    match verbosity {
        VERBOSITY_SILENT => "error",
        VERBOSITY_CHANGES => "warn,biocompat_roadmap=info",
        VERBOSITY_CHECKS => "info,biocompat_roadmap=debug",
        _ => "debug,biocompat_roadmap=trace",
    }
}

/// Install a global fmt subscriber writing to stderr. `RUST_LOG`, when
/// set, wins over `verbosity`. Returns false if a subscriber was already
/// installed.
pub fn init_logging(verbosity: u8) -> bool {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(filter_directive(verbosity)));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(true)
        .try_init()
        .is_ok()
}
