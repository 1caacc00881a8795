use std::path::PathBuf;
use std::str::FromStr;

use anyhow::{Context, Result};
use cron::Schedule;

const DEFAULT_MAIL_FROM: &str = "Activity Tracker <noreply@activitytracker.com>";
const DEFAULT_DAILY_CRON: &str = "0 0 9 * * *";
const DEFAULT_WEEKLY_CRON: &str = "0 0 9 * * Mon";

/// Application configuration loaded from environment variables.
/// Startup fails if required variables are missing or malformed.
#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub jwt_secret: String,
    pub token_ttl_hours: i64,
    pub upload_dir: PathBuf,
    pub admin_initial_password: String,
    /// When unset, outgoing mail is logged instead of delivered.
    pub mail_relay_url: Option<String>,
    pub mail_from: String,
    pub daily_reminder_cron: String,
    pub weekly_reminder_cron: String,
    pub port: u16,
    pub rust_log: String,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing

        let config = Config {
            database_url: require_env("DATABASE_URL")?,
            jwt_secret: require_env("JWT_SECRET")?,
            token_ttl_hours: optional_env("TOKEN_TTL_HOURS")
                .unwrap_or_else(|| "24".to_string())
                .parse::<i64>()
                .context("TOKEN_TTL_HOURS must be a whole number of hours")?,
            upload_dir: optional_env("UPLOAD_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from("uploads")),
            admin_initial_password: optional_env("ADMIN_INITIAL_PASSWORD")
                .unwrap_or_else(|| "admin123".to_string()),
            mail_relay_url: optional_env("MAIL_RELAY_URL"),
            mail_from: optional_env("MAIL_FROM").unwrap_or_else(|| DEFAULT_MAIL_FROM.to_string()),
            daily_reminder_cron: optional_env("DAILY_REMINDER_CRON")
                .unwrap_or_else(|| DEFAULT_DAILY_CRON.to_string()),
            weekly_reminder_cron: optional_env("WEEKLY_REMINDER_CRON")
                .unwrap_or_else(|| DEFAULT_WEEKLY_CRON.to_string()),
            port: optional_env("PORT")
                .unwrap_or_else(|| "3000".to_string())
                .parse::<u16>()
                .context("PORT must be a valid port number")?,
            rust_log: optional_env("RUST_LOG").unwrap_or_else(|| "info".to_string()),
        };

        parse_schedule(&config.daily_reminder_cron).context("DAILY_REMINDER_CRON is invalid")?;
        parse_schedule(&config.weekly_reminder_cron).context("WEEKLY_REMINDER_CRON is invalid")?;

        Ok(config)
    }

    pub fn uses_default_admin_password(&self) -> bool {
        self.admin_initial_password == "admin123"
    }
}

pub fn parse_schedule(expression: &str) -> Result<Schedule> {
    Schedule::from_str(expression)
        .map_err(|e| anyhow::anyhow!("invalid cron expression '{expression}': {e}"))
}

fn require_env(key: &str) -> Result<String> {
    std::env::var(key).with_context(|| format!("Required environment variable '{key}' is not set"))
}

fn optional_env(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_reminder_schedules_parse() {
        assert!(parse_schedule(DEFAULT_DAILY_CRON).is_ok());
        assert!(parse_schedule(DEFAULT_WEEKLY_CRON).is_ok());
    }

    #[test]
    fn garbage_schedule_is_rejected() {
        let err = parse_schedule("every morning").unwrap_err();
        assert!(err.to_string().contains("every morning"));
    }
}
