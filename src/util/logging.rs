use tracing_subscriber::{fmt::SubscriberBuilder, EnvFilter};

/// Install the global subscriber: fmt output on stderr, filtered by
/// `RUST_LOG` or `default_filter` when unset.
///
/// Stdout is reserved for the binaries' JSON reports. `LOG_COMPACT=1` switches
/// to single-line events without source lines.
pub fn init_tracing(default_filter: &str) -> Result<(), anyhow::Error> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));
    let compact = crate::util::env::env_opt("LOG_COMPACT").is_some_and(|v| v.trim() == "1");

    let builder = SubscriberBuilder::default()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(true);

    let installed = if compact {
        builder.compact().with_line_number(false).try_init()
    } else {
        builder.with_line_number(true).try_init()
    };
    installed.map_err(|e| anyhow::anyhow!("failed to initialize tracing: {}", e))
}
