mod config;
mod error;
mod install;
mod object;

pub use config::LogConfig;
pub use error::{LoggerError, LoggerResult};
pub use object::{LogFormat, LogLevel, LogTimeZone, LogTimer, init_local_offset};

/// Install the global tracing subscriber described by `cfg`.
///
/// Must be called once; a second call returns [`LoggerError::AlreadyInitialized`].
/// When `cfg.tz` is [`LogTimeZone::Local`], call [`init_local_offset`] first,
/// before the async runtime spawns its worker threads.
///
/// # Examples
/// ```no_run
/// use cadence_observe::{LogConfig, init_logger};
///
/// init_logger(&LogConfig::default()).expect("logger");
/// tracing::info!("ready");
/// ```
pub fn init_logger(cfg: &LogConfig) -> LoggerResult<()> {
    match cfg.format {
        LogFormat::Text => install::text(cfg),
        LogFormat::Json => install::json(cfg),
        LogFormat::Journald => install::journald(cfg),
    }
}
