use tracing_subscriber::{EnvFilter, fmt, prelude::*};

/// Filter applied when `RUST_LOG` is unset.
const DEFAULT_DIRECTIVES: &str = "info";

/// Quieter filter for test runs; traversal detail is available via `RUST_LOG`.
const TEST_DIRECTIVES: &str = "warn";

/// Install a global tracing subscriber for binaries that embed the fetcher.
///
/// The level comes from `RUST_LOG`, defaulting to `info`. Fails if a
/// global subscriber is already set.
pub fn init() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let fmt_layer = fmt::layer()
        .with_target(true)
        .with_level(true)
        .with_line_number(true)
        .compact();

    tracing_subscriber::registry()
        .with(filter(DEFAULT_DIRECTIVES)?)
        .with(fmt_layer)
        .try_init()?;

    Ok(())
}

/// Send fetcher logs to the test harness's captured output.
///
/// Safe to call from every test: only the first call in a process installs
/// a subscriber, later calls are no-ops.
pub fn init_for_tests() {
    let Ok(filter_layer) = filter(TEST_DIRECTIVES) else {
        return;
    };
    let _ = tracing_subscriber::registry()
        .with(filter_layer)
        .with(fmt::layer().with_test_writer().compact())
        .try_init();
}

fn filter(default: &str) -> Result<EnvFilter, tracing_subscriber::filter::ParseError> {
    EnvFilter::try_from_default_env().or_else(|_| EnvFilter::try_new(default))
}
