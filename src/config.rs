//! Runtime Configuration
//! 
//! Read from the environment (a `.env` file is honoured by the binary).

use anyhow::{Context, Result};
use std::env;
use std::path::PathBuf;
use std::str::FromStr;
use std::sync::Arc;

use crate::notify::{LogDispatcher, NotificationDispatcher, PushDispatcher, DEFAULT_BATCH_SIZE};

pub const DEFAULT_PUSH_URL: &str = "https://exp.host/--/api/v2/push/send";

#[derive(Debug, Clone, PartialEq)]
pub struct SchedulerConfig {
    /// SQLite database file
    pub db_path: PathBuf,
    /// Address the HTTP trigger listens on
    pub bind_addr: String,
    pub push_url: String,
    pub push_batch_size: usize,
    /// Log notifications instead of sending them
    pub push_dry_run: bool,
    /// Cron expressions (sec min hour dom month dow, UTC)
    pub create_cron: String,
    pub overdue_cron: String,
    pub reminder_cron: String,
    /// Export spans over OTLP in addition to console logging
    pub otlp: bool,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            db_path: PathBuf::from("bakery.db"),
            bind_addr: "0.0.0.0:8080".to_string(),
            push_url: DEFAULT_PUSH_URL.to_string(),
            push_batch_size: DEFAULT_BATCH_SIZE,
            push_dry_run: false,
            create_cron: "0 0 8 * * Sun".to_string(),
            overdue_cron: "0 0 0 * * Mon".to_string(),
            reminder_cron: "0 0 5,10 * * *".to_string(),
            otlp: false,
        }
    }
}

fn parse_var<T>(lookup: &impl Fn(&str) -> Option<String>, key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match lookup(key) {
        Some(raw) => raw.trim().parse().with_context(|| format!("{} has an invalid value '{}'", key, raw)),
        None => Ok(default),
    }
}

impl SchedulerConfig {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let defaults = Self::default();
        let config = Self {
            db_path: lookup("BAKERY_DB_PATH").map(PathBuf::from).unwrap_or(defaults.db_path),
            bind_addr: lookup("BAKERY_BIND_ADDR").unwrap_or(defaults.bind_addr),
            push_url: lookup("BAKERY_PUSH_URL").unwrap_or(defaults.push_url),
            push_batch_size: parse_var(&lookup, "BAKERY_PUSH_BATCH_SIZE", defaults.push_batch_size)?,
            push_dry_run: parse_var(&lookup, "BAKERY_PUSH_DRY_RUN", defaults.push_dry_run)?,
            create_cron: lookup("BAKERY_CREATE_CRON").unwrap_or(defaults.create_cron),
            overdue_cron: lookup("BAKERY_OVERDUE_CRON").unwrap_or(defaults.overdue_cron),
            reminder_cron: lookup("BAKERY_REMINDER_CRON").unwrap_or(defaults.reminder_cron),
            otlp: parse_var(&lookup, "BAKERY_OTLP", defaults.otlp)?,
        };

        if config.push_batch_size == 0 {
            anyhow::bail!("BAKERY_PUSH_BATCH_SIZE must be at least 1");
        }
        Ok(config)
    }

    pub fn dispatcher(&self) -> Arc<dyn NotificationDispatcher> {
        if self.push_dry_run {
            Arc::new(LogDispatcher)
        } else {
            Arc::new(PushDispatcher::new(self.push_url.clone()).with_batch_size(self.push_batch_size))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
        move |key: &str| vars.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = SchedulerConfig::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config, SchedulerConfig::default());
        assert_eq!(config.push_batch_size, 100);
    }

    #[test]
    fn test_overrides() {
        let config = SchedulerConfig::from_lookup(lookup(&[
            ("BAKERY_DB_PATH", "/var/lib/bakery/ops.db"),
            ("BAKERY_PUSH_BATCH_SIZE", "25"),
            ("BAKERY_PUSH_DRY_RUN", "true"),
        ]))
        .unwrap();
        assert_eq!(config.db_path, PathBuf::from("/var/lib/bakery/ops.db"));
        assert_eq!(config.push_batch_size, 25);
        assert!(config.push_dry_run);
    }

    #[test]
    fn test_invalid_values_are_rejected() {
        let err = SchedulerConfig::from_lookup(lookup(&[("BAKERY_PUSH_BATCH_SIZE", "lots")])).unwrap_err();
        assert!(err.to_string().contains("BAKERY_PUSH_BATCH_SIZE"));
        assert!(SchedulerConfig::from_lookup(lookup(&[("BAKERY_PUSH_BATCH_SIZE", "0")])).is_err());
        assert!(SchedulerConfig::from_lookup(lookup(&[("BAKERY_OTLP", "maybe")])).is_err());
    }
}
