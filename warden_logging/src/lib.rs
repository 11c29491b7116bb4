//! Log setup for the warden binaries and tests.
//!
//! Library crates log through the `log` facade with `target: "warden"`; the subscriber
//! installed here collects those records. `RUST_LOG` overrides [`DEFAULT_FILTER`].

pub use tracing::{self, debug, error, info, trace, warn};
use tracing_subscriber::fmt::format::FmtSpan;
use tracing_subscriber::fmt::SubscriberBuilder;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

/// Used when `RUST_LOG` is unset or unreadable
pub const DEFAULT_FILTER: &str = "warn,warden=info";

/// Sets up the logging for the service. A panic is logged, then ends the process
pub fn setup_log() {
    std::panic::set_hook(Box::new(|info| {
        error!(target: "warden", "Panic occurred: {}", info);
        std::process::exit(1);
    }));

    setup_log_no_panic_hook()
}

/// Installs the subscriber without replacing the panic hook. Tests call this so
/// assertion failures still unwind normally. Later calls are no-ops
pub fn setup_log_no_panic_hook() {
    let _ = SubscriberBuilder::default()
        .with_line_number(true)
        .with_file(true)
        .with_target(true)
        .with_span_events(FmtSpan::NONE)
        .with_env_filter(env_filter())
        .finish()
        .try_init();
}

fn env_filter() -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn repeated_setup_is_harmless() {
        setup_log_no_panic_hook();
        setup_log_no_panic_hook();
        info!(target: "warden", "still logging");
    }

    #[test]
    fn default_filter_parses() {
        assert!(EnvFilter::try_new(DEFAULT_FILTER).is_ok());
    }
}
