//! Process-wide logging setup shared by the costbook binaries.

pub mod logging;

pub use logging::{LogFormat, LogSettings};

/// Install the global subscriber with default settings (`info`, JSON).
///
/// Safe to call more than once; later calls are no-ops.
pub fn init() {
    logging::init(&LogSettings::default());
}
