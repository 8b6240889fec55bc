//! Tracing subscriber setup.
//!
//! The library itself only emits `tracing` events; hosts call
//! [`init_tracing`] once at startup to route them somewhere.

use crate::config::{LogFormat, LoggingConfig};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

/// `EnvFilter` directives for the configured levels.
///
/// Component keys are module paths below `converge::`, emitted in sorted
/// order so the same config always yields the same filter.
///
/// ```
/// use converge::config::LoggingConfig;
/// use converge::logging::build_filter_directives;
///
/// let config: LoggingConfig = toml::from_str(r#"
///     level = "warn"
///     [component_levels]
///     "families::teams" = "debug"
/// "#).unwrap();
///
/// assert_eq!(build_filter_directives(&config), "warn,converge::families::teams=debug");
/// ```
pub fn build_filter_directives(config: &LoggingConfig) -> String {
    let mut overrides: Vec<(&String, &String)> = config
        .component_levels
        .iter()
        .flat_map(|levels| levels.iter())
        .collect();
    overrides.sort();

    overrides
        .into_iter()
        .fold(config.level.clone(), |mut directives, (module, level)| {
            directives.push_str(&format!(",converge::{}={}", module, level));
            directives
        })
}

/// Install the global subscriber. `RUST_LOG` wins over the configured levels.
pub fn init_tracing(config: &LoggingConfig) -> Result<(), Box<dyn std::error::Error>> {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(build_filter_directives(config)));

    match config.format {
        LogFormat::Pretty => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_subscriber::fmt::layer().pretty())
                .try_init()?;
        }
        LogFormat::Json => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_subscriber::fmt::layer().json())
                .try_init()?;
        }
    }

    Ok(())
}
