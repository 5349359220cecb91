//! Logging setup.
//!
//! The library only emits `tracing` events; embedding applications decide
//! where they go. [`init`] is a convenience for binaries and tests.

use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Install a global subscriber.
///
/// Logs at `debug` when `verbose` is set and at `warn` otherwise, unless
/// `RUST_LOG` is set. Returns `false` if a global subscriber already exists.
pub fn init(verbose: bool) -> bool {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| if verbose { EnvFilter::new("debug") } else { EnvFilter::new("warn") });

    tracing_subscriber::registry().with(fmt::layer().with_target(false)).with(filter).try_init().is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init_twice_is_harmless() {
        init(false);
        assert!(!init(true));
    }
}
