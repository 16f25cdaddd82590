use log::LevelFilter;
use log4rs::config::Logger;
use std::{collections::HashMap, env, mem};

use super::LogError;

#[derive(Clone)]
pub(super) struct LoggerSpec {
    pub name: String,
    pub level: LevelFilter,
}

impl LoggerSpec {
    pub fn logger(&self) -> Logger {
        Logger::builder().build(self.name.clone(), self.level)
    }
}

pub(super) struct Loggers {
    loggers: Vec<LoggerSpec>,
    root_level: LevelFilter,
}

impl Loggers {
    pub fn root_level(&self) -> LevelFilter {
        self.root_level
    }

    pub fn items(&self) -> impl Iterator<Item = Logger> + '_ {
        self.loggers.iter().map(|x| x.logger())
    }

    #[cfg(test)]
    pub fn level_of(&self, name: &str) -> Option<LevelFilter> {
        self.loggers.iter().find(|x| x.name == name).map(|x| x.level)
    }
}

/// Collects logger levels from `env_logger`-like expressions: `info,stake_consensus=trace,stake_database=warn`
#[derive(Default)]
pub(super) struct Builder {
    loggers: HashMap<String, LevelFilter>,
    root_level: Option<LevelFilter>,
}

impl Builder {
    pub fn new() -> Builder {
        Self::default()
    }

    pub fn parse_env(&mut self, env: &str) -> &mut Self {
        self.parse_expression(&env::var(env).unwrap_or_default())
    }

    pub fn parse_expression(&mut self, expression: &str) -> &mut Self {
        for spec in expression.split(',').map(|x| x.trim()).filter(|x| !x.is_empty()) {
            match parse_spec(spec) {
                Ok((Some(name), level)) => self.logger(name.to_owned(), level),
                Ok((None, level)) => self.root_level(level),
                Err(err) => {
                    // The logger is not installed yet
                    eprintln!("Ignoring invalid logging spec '{}': {}", spec, err);
                    &mut *self
                }
            };
        }
        self
    }

    pub fn root_level(&mut self, root_level: LevelFilter) -> &mut Self {
        self.root_level.replace(root_level);
        self
    }

    pub fn logger(&mut self, name: String, level: LevelFilter) -> &mut Self {
        self.loggers.insert(name, level);
        self
    }

    pub fn build(&mut self) -> Loggers {
        let loggers = mem::take(&mut self.loggers).into_iter().map(|(name, level)| LoggerSpec { name, level }).collect();
        Loggers { loggers, root_level: self.root_level.take().unwrap_or(LevelFilter::Error) }
    }
}

fn parse_spec(spec: &str) -> Result<(Option<&str>, LevelFilter), LogError> {
    let mut parts = spec.split('=');
    match (parts.next(), parts.next().map(|x| x.trim()), parts.next()) {
        // A single argument is either a level (for the root) or a module name (at max level)
        (Some(part0), None, None) => match part0.parse() {
            Ok(level) => Ok((None, level)),
            Err(_) => Ok((Some(part0), LevelFilter::max())),
        },
        (Some(part0), Some(""), None) => Ok((Some(part0), LevelFilter::max())),
        (Some(part0), Some(part1), None) => {
            part1.parse().map(|level| (Some(part0), level)).map_err(|_| LogError::ParseLoggerSpec(part1.to_owned()))
        }
        _ => Err(LogError::ParseLoggerSpec(spec.to_owned())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_expression() {
        let loggers = Builder::new().parse_expression("info, stake_consensus=trace,stake_database=,bad=level,a=b=c").build();
        assert_eq!(loggers.root_level(), LevelFilter::Info);
        assert_eq!(loggers.level_of("stake_consensus"), Some(LevelFilter::Trace));
        assert_eq!(loggers.level_of("stake_database"), Some(LevelFilter::max()));
        assert_eq!(loggers.level_of("bad"), None);
        assert_eq!(loggers.level_of("a"), None);
    }

    #[test]
    fn test_default_root_level() {
        let loggers = Builder::new().parse_expression("stake_core").build();
        assert_eq!(loggers.root_level(), LevelFilter::Error);
        assert_eq!(loggers.level_of("stake_core"), Some(LevelFilter::max()));
    }

    #[test]
    fn test_later_specs_override() {
        let loggers = Builder::new().root_level(LevelFilter::Info).parse_expression("warn,x=debug,x=error").build();
        assert_eq!(loggers.root_level(), LevelFilter::Warn);
        assert_eq!(loggers.level_of("x"), Some(LevelFilter::Error));
    }
}
