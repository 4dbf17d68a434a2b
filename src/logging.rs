//! Logging and tracing utilities.
//!
//! All logs go to **stderr** so that stdout stays free for the engine that
//! drives the provider.
//!
//! # Environment Variables
//!
//! - `RUST_LOG`: Controls log levels (e.g., `info`, `couchbase_capella_provider=debug`)
//!
//! ```bash
//! # Trace every request and poll tick
//! RUST_LOG=couchbase_capella_provider=debug ./my-engine
//! ```

use tracing_subscriber::{fmt, prelude::*, util::TryInitError, EnvFilter};

/// Install the registry: `EnvFilter` from `RUST_LOG` (or `default_level`)
/// plus a compact stderr formatter.
fn install(default_level: &str) -> Result<(), TryInitError> {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::registry()
        .with(filter)
        .with(
            fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(true)
                .with_thread_ids(false)
                .with_file(false)
                .with_line_number(false),
        )
        .try_init()
}

/// Initialize the default logging subscriber.
///
/// Respects `RUST_LOG` and defaults to `info`.
///
/// # Panics
///
/// Panics if a global subscriber has already been set.
pub fn init_logging() {
    init_logging_with_default("info");
}

/// Initialize logging with a custom default level, used when `RUST_LOG` is unset.
///
/// # Panics
///
/// Panics if a global subscriber has already been set.
pub fn init_logging_with_default(default_level: &str) {
    if let Err(err) = install(default_level) {
        panic!("failed to install tracing subscriber: {}", err);
    }
}

/// Try to initialize logging, returning false if already initialized.
///
/// Useful in tests where several cases may race to install the subscriber.
pub fn try_init_logging() -> bool {
    install("info").is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_env_filter_parsing() {
        assert!(EnvFilter::try_new("info").is_ok());
        assert!(EnvFilter::try_new("couchbase_capella_provider=debug").is_ok());
        assert!(EnvFilter::try_new("warn,couchbase_capella_provider::poll=trace").is_ok());
    }

    #[test]
    fn test_try_init_twice() {
        // The first call may lose to another test; the second never wins.
        let _ = try_init_logging();
        assert!(!try_init_logging());
    }
}
