use tracing::Level;

use crate::config::{LogFormat, LoggingConfig};

/// Installs the global tracing subscriber for the configured level and
/// format. Safe to call more than once; later calls are no-ops.
pub fn init_logging(config: &LoggingConfig) {
    let level = config.level.parse::<Level>().unwrap_or(Level::INFO);

    let result = match config.format {
        LogFormat::Compact => {
            tracing_subscriber::fmt().with_target(false).with_max_level(level).compact().try_init()
        }
        LogFormat::Pretty => {
            tracing_subscriber::fmt().with_target(false).with_max_level(level).pretty().try_init()
        }
        LogFormat::Json => {
            tracing_subscriber::fmt().with_target(false).with_max_level(level).json().try_init()
        }
    };

    if result.is_err() {
        tracing::debug!("tracing subscriber was already installed");
    }
}

#[cfg(test)]
mod tests {
    use crate::config::{LogFormat, LoggingConfig};

    use super::init_logging;

    #[test]
    fn repeated_initialization_is_harmless() {
        let config = LoggingConfig { level: "debug".to_string(), format: LogFormat::Compact };
        init_logging(&config);
        init_logging(&config);
    }
}
