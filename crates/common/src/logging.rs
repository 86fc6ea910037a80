//! Logging and tracing initialization.
//!
//! Logs go to stderr so the CLI can keep stdout for clip summaries.

use crate::config::LoggingConfig;

/// Initialize the tracing subscriber with the given configuration.
///
/// `RUST_LOG` takes precedence over `config.level`.
pub fn init_logging(config: &LoggingConfig) {
    use tracing_subscriber::{fmt, EnvFilter};

    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.level));

    if config.json {
        let subscriber = fmt::Subscriber::builder()
            .with_env_filter(env_filter)
            .with_writer(std::io::stderr)
            .json()
            .finish();
        tracing::subscriber::set_global_default(subscriber).ok();
    } else {
        let subscriber = fmt::Subscriber::builder()
            .with_env_filter(env_filter)
            .with_writer(std::io::stderr)
            .with_target(false)
            .without_time()
            .finish();
        tracing::subscriber::set_global_default(subscriber).ok();
    }
}

/// Initialize logging for the CLI; `verbose` raises the level to debug.
pub fn init_cli_logging(config: &LoggingConfig, verbose: bool) {
    if verbose {
        init_logging(&LoggingConfig {
            level: "debug".to_string(),
            json: config.json,
        });
    } else {
        init_logging(config);
    }
}
