use clap::ValueEnum;
use tracing_subscriber::filter::{LevelFilter, Targets};

#[derive(Debug, Clone, ValueEnum, Default)]
pub enum LogLevel {
    Trace,
    Debug,
    Info,
    #[default]
    Warn,
    Error,
    Silent,
}

impl LogLevel {
    pub fn to_tracing_level(&self) -> Option<tracing::Level> {
        match self {
            LogLevel::Trace => Some(tracing::Level::TRACE),
            LogLevel::Debug => Some(tracing::Level::DEBUG),
            LogLevel::Info => Some(tracing::Level::INFO),
            LogLevel::Warn => Some(tracing::Level::WARN),
            LogLevel::Error => Some(tracing::Level::ERROR),
            LogLevel::Silent => None,
        }
    }

    /// Logs of this crate at the chosen level; dependencies never below `warn`.
    pub fn to_target_filter(&self) -> Option<Targets> {
        let level = LevelFilter::from_level(self.to_tracing_level()?);
        Some(
            Targets::new()
                .with_target(env!("CARGO_CRATE_NAME"), level)
                .with_default(level.min(LevelFilter::WARN)),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::*;

    #[rstest]
    #[case(LogLevel::Trace, Some(tracing::Level::TRACE))]
    #[case(LogLevel::Warn, Some(tracing::Level::WARN))]
    #[case(LogLevel::Silent, None)]
    fn maps_to_tracing_level(#[case] level: LogLevel, #[case] expected: Option<tracing::Level>) {
        assert_eq!(level.to_tracing_level(), expected);
    }

    #[test]
    fn dependencies_stay_quiet_below_warn() {
        let filter = LogLevel::Debug.to_target_filter().unwrap();

        assert!(filter.would_enable("fsnap::executor", &tracing::Level::DEBUG));
        assert!(!filter.would_enable("compio_runtime", &tracing::Level::DEBUG));
        assert!(filter.would_enable("compio_runtime", &tracing::Level::WARN));
    }

    #[test]
    fn error_level_applies_everywhere() {
        let filter = LogLevel::Error.to_target_filter().unwrap();

        assert!(!filter.would_enable("fsnap", &tracing::Level::WARN));
        assert!(!filter.would_enable("compio_runtime", &tracing::Level::WARN));
        assert!(LogLevel::Silent.to_target_filter().is_none());
    }
}
