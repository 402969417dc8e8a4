use std::{collections::HashMap, env, path::PathBuf, time::Duration};

use thiserror::Error;

const DEFAULT_POLL_INTERVAL_SECS: u64 = 5;

/// Everything the bot needs from the environment, resolved once at startup.
#[derive(Debug, Clone)]
pub struct Config {
    pub praktikum_token: String,
    pub telegram_token: String,
    pub chat_id: String,
    pub poll_interval: Duration,
    pub log_dir: PathBuf,
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("environment variable {0} is not set")]
    Missing(&'static str),
    #[error("{name} must be a positive number of seconds, got {value:?}")]
    InvalidInterval { name: &'static str, value: String },
}

impl Config {
    /// Loads `.env` if present, then reads the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        let _ = dotenvy::dotenv();
        Self::from_vars(env::vars())
    }

    fn from_vars(vars: impl Iterator<Item = (String, String)>) -> Result<Self, ConfigError> {
        let vars: HashMap<String, String> = vars.collect();

        let required = |name: &'static str| -> Result<String, ConfigError> {
            vars.get(name)
                .filter(|value| !value.is_empty())
                .cloned()
                .ok_or(ConfigError::Missing(name))
        };

        let poll_interval = match vars.get("POLL_INTERVAL_SECS") {
            None => Duration::from_secs(DEFAULT_POLL_INTERVAL_SECS),
            Some(value) => match value.parse::<u64>() {
                Ok(secs) if secs > 0 => Duration::from_secs(secs),
                _ => {
                    return Err(ConfigError::InvalidInterval {
                        name: "POLL_INTERVAL_SECS",
                        value: value.clone(),
                    });
                }
            },
        };

        Ok(Config {
            praktikum_token: required("PRAKTIKUM_TOKEN")?,
            telegram_token: required("TELEGRAM_TOKEN")?,
            chat_id: required("TELEGRAM_CHAT_ID")?,
            poll_interval,
            log_dir: vars
                .get("LOG_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from(".")),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base_vars() -> Vec<(String, String)> {
        [
            ("PRAKTIKUM_TOKEN", "praktikum-token"),
            ("TELEGRAM_TOKEN", "telegram-token"),
            ("TELEGRAM_CHAT_ID", "12345"),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
    }

    #[test]
    fn defaults_apply_when_optional_vars_are_absent() {
        let config = Config::from_vars(base_vars().into_iter()).unwrap();

        assert_eq!(config.poll_interval, Duration::from_secs(5));
        assert_eq!(config.log_dir, PathBuf::from("."));
        assert_eq!(config.chat_id, "12345");
    }

    #[test]
    fn optional_vars_override_defaults() {
        let mut vars = base_vars();
        vars.push(("POLL_INTERVAL_SECS".into(), "60".into()));
        vars.push(("LOG_DIR".into(), "/var/log/homewatch".into()));

        let config = Config::from_vars(vars.into_iter()).unwrap();

        assert_eq!(config.poll_interval, Duration::from_secs(60));
        assert_eq!(config.log_dir, PathBuf::from("/var/log/homewatch"));
    }

    #[test]
    fn missing_token_is_an_error() {
        let vars = base_vars()
            .into_iter()
            .filter(|(k, _)| k != "TELEGRAM_TOKEN");

        let err = Config::from_vars(vars).unwrap_err();

        assert!(matches!(err, ConfigError::Missing("TELEGRAM_TOKEN")));
    }

    #[test]
    fn empty_token_counts_as_missing() {
        let mut vars = base_vars();
        vars.retain(|(k, _)| k != "PRAKTIKUM_TOKEN");
        vars.push(("PRAKTIKUM_TOKEN".into(), "".into()));

        let err = Config::from_vars(vars.into_iter()).unwrap_err();

        assert!(matches!(err, ConfigError::Missing("PRAKTIKUM_TOKEN")));
    }

    #[test]
    fn zero_or_garbage_interval_is_rejected() {
        for bad in ["0", "-1", "soon"] {
            let mut vars = base_vars();
            vars.push(("POLL_INTERVAL_SECS".into(), bad.into()));

            let err = Config::from_vars(vars.into_iter()).unwrap_err();

            assert!(matches!(err, ConfigError::InvalidInterval { .. }));
        }
    }
}
