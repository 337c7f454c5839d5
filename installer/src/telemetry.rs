use anyhow::Result;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Initializes tracing with the CLI log level as the default directive.
/// `RUST_LOG` still wins when set, so a single component can be turned up
/// without touching the flag.
pub fn init(log_level: &str, debug: bool) -> Result<()> {
    let default_directive = if debug { "debug" } else { log_level };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directive));
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();
    Ok(())
}
