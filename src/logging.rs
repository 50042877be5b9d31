//! Logging setup
//!
//! Library code only emits `tracing` events. Hosts call [`init`] once to get
//! compact stderr output filtered by `RUST_LOG` and a verbosity level.

use tracing::Level;
use tracing_subscriber::EnvFilter;

/// Install a stderr subscriber; later calls are ignored
///
/// Verbosity maps 0 to WARN, 1 to INFO, 2 to DEBUG and anything higher to TRACE.
pub fn init(verbosity: u8) {
    let level = match verbosity {
        0 => Level::WARN,
        1 => Level::INFO,
        2 => Level::DEBUG,
        _ => Level::TRACE,
    };

    let env_filter = EnvFilter::from_default_env().add_directive(level.into());

    // Ignore error if already set in tests or by the host
    let _ = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .compact()
        .try_init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init_twice_is_harmless() {
        init(2);
        init(0);
        tracing::debug!("logging initialized");
    }
}
