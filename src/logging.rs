use tracing_subscriber::{fmt::SubscriberBuilder, EnvFilter};

/// Output layout for the global subscriber.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    /// Target, file and line on every event. Used by the server.
    Full,
    /// One short line per event. Used by the CLI.
    Compact,
}

/// Sets up the global tracing subscriber with a fmt formatter and env filter.
///
/// `RUST_LOG` wins when set; otherwise `default_filter` applies. Logs go to
/// stderr so CLI output on stdout stays machine readable.
pub fn init_tracing(default_filter: &str, format: LogFormat) -> Result<(), anyhow::Error> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));
    let builder = SubscriberBuilder::default()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);

    let res = match format {
        LogFormat::Full => builder
            .with_target(true)
            .with_line_number(true)
            .with_file(true)
            .try_init(),
        LogFormat::Compact => builder.with_target(false).compact().try_init(),
    };
    res.map_err(|e| anyhow::anyhow!("failed to initialize tracing: {}", e))
}
