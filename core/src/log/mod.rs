//! Logger initialization on top of `log4rs`.
//!
//! Library crates log through the `log` facade only; binaries and test harnesses call [`init_logger`] once.

mod appender;
mod consts;
mod logger;

use appender::AppenderSpec;
use consts::{DEFAULT_LOGGER_ENV, ERR_LOG_FILE_NAME, LOG_FILE_NAME};
use log::LevelFilter;
use log4rs::{Config, config::Root};
use thiserror::Error;

pub use consts::LOG_LINE_PATTERN;

const CONSOLE_APPENDER: &str = "stdout";
const LOG_FILE_APPENDER: &str = "log_file";
const ERR_LOG_FILE_APPENDER: &str = "err_log_file";

#[derive(Clone, Debug, Error)]
pub enum LogError {
    #[error("logger spec parsing error: {0}")]
    ParseLoggerSpec(String),

    #[error("log directory {0} is not valid unicode")]
    InvalidLogDir(String),

    #[error("failed building appender {0}: {1}")]
    Appender(&'static str, String),

    #[error("invalid logger config: {0}")]
    Config(String),

    #[error("a logger is already installed: {0}")]
    AlreadyInitialized(String),
}

/// Installs the global logger. The root level defaults to `info`, then `RUST_LOG` and finally `filters`
/// (an `env_logger`-like expression) are applied on top. With a `log_dir`, all records also go to a rolling
/// log file and warnings and errors additionally go to a dedicated error log file.
pub fn init_logger(log_dir: Option<&str>, filters: &str) -> Result<(), LogError> {
    let loggers = logger::Builder::new().root_level(LevelFilter::Info).parse_env(DEFAULT_LOGGER_ENV).parse_expression(filters).build();

    let mut appenders = vec![AppenderSpec::console(CONSOLE_APPENDER, None)];
    if let Some(log_dir) = log_dir {
        appenders.push(AppenderSpec::roller(LOG_FILE_APPENDER, None, log_dir, LOG_FILE_NAME)?);
        appenders.push(AppenderSpec::roller(ERR_LOG_FILE_APPENDER, Some(LevelFilter::Warn), log_dir, ERR_LOG_FILE_NAME)?);
    }

    let names: Vec<&'static str> = appenders.iter().map(|x| x.name).collect();
    let config = Config::builder()
        .appenders(appenders.into_iter().map(|x| x.into_appender()))
        .loggers(loggers.items())
        .build(Root::builder().appenders(names).build(loggers.root_level()))
        .map_err(|err| LogError::Config(err.to_string()))?;

    log4rs::init_config(config).map_err(|err| LogError::AlreadyInitialized(err.to_string()))?;
    Ok(())
}

/// Console-only logger for tests and tools. A logger installed earlier in the process is kept.
pub fn try_init_logger(filters: &str) {
    if let Err(err @ (LogError::ParseLoggerSpec(_) | LogError::Config(_))) = init_logger(None, filters) {
        eprintln!("logger was not initialized: {}", err);
    }
}
