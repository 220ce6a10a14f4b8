use tracing::level_filters::LevelFilter;
use tracing_subscriber::{EnvFilter, fmt};

/// Installs the global fmt subscriber. `RUST_LOG` wins over the configured
/// level. Logs go to stderr so stdout stays clean for rendered messages.
pub fn initialize_tracing(level: &str) {
    let _ = fmt::fmt()
        .with_env_filter(build_env_filter(level))
        .with_target(false)
        .with_level(true)
        .with_writer(std::io::stderr)
        .try_init();
}

fn build_env_filter(level: &str) -> EnvFilter {
    let default_level = level.parse::<LevelFilter>().unwrap_or(LevelFilter::INFO);

    EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::builder()
            .with_default_directive(default_level.into())
            .from_env_lossy()
    })
}
