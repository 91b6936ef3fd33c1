use tracing::Subscriber;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt};

use crate::logger::{
    config::LogConfig,
    error::{LoggerError, LoggerResult},
    object::LogTimer,
};

pub(crate) fn text(cfg: &LogConfig) -> LoggerResult<()> {
    let layer = fmt::layer()
        .with_ansi(cfg.should_use_color())
        .with_target(cfg.with_targets)
        .with_timer(LogTimer::new(cfg.tz));

    install(
        tracing_subscriber::registry()
            .with(cfg.level.to_env_filter())
            .with(layer),
    )
}

pub(crate) fn json(cfg: &LogConfig) -> LoggerResult<()> {
    let layer = fmt::layer()
        .json()
        .with_ansi(false)
        .with_target(cfg.with_targets)
        .with_current_span(false)
        .with_timer(LogTimer::new(cfg.tz));

    install(
        tracing_subscriber::registry()
            .with(cfg.level.to_env_filter())
            .with(layer),
    )
}

#[cfg(target_os = "linux")]
pub(crate) fn journald(cfg: &LogConfig) -> LoggerResult<()> {
    let layer =
        tracing_journald::layer().map_err(|e| LoggerError::JournaldInitFailed(e.to_string()))?;

    install(
        tracing_subscriber::registry()
            .with(cfg.level.to_env_filter())
            .with(layer),
    )
}

#[cfg(not(target_os = "linux"))]
pub(crate) fn journald(_cfg: &LogConfig) -> LoggerResult<()> {
    Err(LoggerError::JournaldNotSupported)
}

fn install<S>(subscriber: S) -> LoggerResult<()>
where
    S: Subscriber + Send + Sync + 'static,
{
    subscriber
        .try_init()
        .map_err(|_| LoggerError::AlreadyInitialized)
}

#[cfg(test)]
mod tests {
    use super::*;

    // Only one global subscriber per test binary, so a single test covers both calls.
    #[test]
    fn second_install_is_rejected() {
        let cfg = LogConfig {
            use_color: false,
            ..Default::default()
        };

        let first = text(&cfg);
        let second = json(&cfg);

        assert!(first.is_ok() || matches!(first, Err(LoggerError::AlreadyInitialized)));
        assert!(matches!(second, Err(LoggerError::AlreadyInitialized)));
    }

    #[test]
    #[cfg(not(target_os = "linux"))]
    fn journald_is_linux_only() {
        let result = journald(&LogConfig::default());
        assert!(matches!(result, Err(LoggerError::JournaldNotSupported)));
    }
}
