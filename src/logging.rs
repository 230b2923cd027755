use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, fmt};

/// Options for the tracing subscriber.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogConfig {
    pub verbose: bool,
    pub json_format: bool,
}

impl LogConfig {
    /// `LOG_FORMAT=json` switches to JSON lines.
    pub fn from_env(verbose: bool) -> Self {
        Self {
            verbose,
            json_format: std::env::var("LOG_FORMAT")
                .map(|v| v.eq_ignore_ascii_case("json"))
                .unwrap_or(false),
        }
    }

    fn default_directives(&self) -> &'static str {
        if self.verbose {
            "info,gigboard=debug"
        } else {
            "warn,gigboard=info"
        }
    }
}

/// Installs the global subscriber. `RUST_LOG` overrides the default filter.
/// Logs go to stderr so command output stays clean.
pub fn init_tracing(config: LogConfig) {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.default_directives()));

    let result = if config.json_format {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(
                fmt::layer()
                    .json()
                    .with_target(true)
                    .with_writer(std::io::stderr),
            )
            .try_init()
    } else {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(
                fmt::layer()
                    .with_target(false)
                    .with_writer(std::io::stderr),
            )
            .try_init()
    };

    if result.is_ok() {
        tracing::debug!(
            verbose = config.verbose,
            json_format = config.json_format,
            "tracing initialized"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn verbose_raises_crate_level() {
        let quiet = LogConfig::default();
        let loud = LogConfig {
            verbose: true,
            ..Default::default()
        };
        assert_eq!(quiet.default_directives(), "warn,gigboard=info");
        assert_eq!(loud.default_directives(), "info,gigboard=debug");
    }

    #[test]
    fn init_twice_does_not_panic() {
        init_tracing(LogConfig::default());
        init_tracing(LogConfig::default());
    }
}
