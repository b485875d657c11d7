use std::str::FromStr;
use std::time::Duration;

use peoplehub_core::{AppError, AppResult};
use peoplehub_infrastructure::SmtpEmailConfig;

/// Where notification e-mails go.
#[derive(Clone)]
pub enum EmailProvider {
    /// Log messages instead of sending them.
    Console,
    /// Send through an SMTP relay.
    Smtp(SmtpEmailConfig),
}

/// Notification worker settings read from the environment.
#[derive(Clone)]
pub struct WorkerConfig {
    /// PostgreSQL connection string.
    pub database_url: String,
    /// Pool size.
    pub database_max_connections: u32,
    /// Name recorded on claimed outbox rows.
    pub worker_id: String,
    /// Outbox rows claimed per poll.
    pub batch_size: usize,
    /// Pause after an empty poll.
    pub poll_interval: Duration,
    /// E-mail transport.
    pub email_provider: EmailProvider,
}

impl WorkerConfig {
    /// Loads settings from process environment variables.
    pub fn from_env() -> AppResult<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Loads settings through `lookup`, which returns a variable's value when set.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> AppResult<Self> {
        let value = |name: &str| {
            lookup(name)
                .map(|value| value.trim().to_owned())
                .filter(|value| !value.is_empty())
        };

        let database_url = value("DATABASE_URL")
            .ok_or_else(|| AppError::Validation("DATABASE_URL is required".to_owned()))?;
        let database_max_connections =
            positive("DATABASE_MAX_CONNECTIONS", value("DATABASE_MAX_CONNECTIONS"), 5_u32)?;
        let worker_id = value("NOTIFIER_WORKER_ID")
            .unwrap_or_else(|| format!("notifier-{}", uuid::Uuid::new_v4()));
        let batch_size = positive("NOTIFIER_BATCH_SIZE", value("NOTIFIER_BATCH_SIZE"), 25_usize)?;
        let poll_interval_ms = positive(
            "NOTIFIER_POLL_INTERVAL_MS",
            value("NOTIFIER_POLL_INTERVAL_MS"),
            2_000_u64,
        )?;

        let email_provider = match value("EMAIL_PROVIDER").as_deref() {
            None | Some("console") => EmailProvider::Console,
            Some("smtp") => EmailProvider::Smtp(SmtpEmailConfig {
                host: value("SMTP_HOST").ok_or_else(|| {
                    AppError::Validation("SMTP_HOST is required for smtp email".to_owned())
                })?,
                port: parse("SMTP_PORT", value("SMTP_PORT"), 587_u16)?,
                username: value("SMTP_USERNAME"),
                password: value("SMTP_PASSWORD"),
                from_address: value("SMTP_FROM_ADDRESS").ok_or_else(|| {
                    AppError::Validation(
                        "SMTP_FROM_ADDRESS is required for smtp email".to_owned(),
                    )
                })?,
            }),
            Some(other) => {
                return Err(AppError::Validation(format!(
                    "invalid EMAIL_PROVIDER value '{other}', expected 'console' or 'smtp'"
                )));
            }
        };

        Ok(Self {
            database_url,
            database_max_connections,
            worker_id,
            batch_size,
            poll_interval: Duration::from_millis(poll_interval_ms),
            email_provider,
        })
    }
}

fn parse<T>(name: &str, raw: Option<String>, default: T) -> AppResult<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match raw {
        Some(value) => value.parse::<T>().map_err(|error| {
            AppError::Validation(format!("invalid {name} value '{value}': {error}"))
        }),
        None => Ok(default),
    }
}

fn positive<T>(name: &str, raw: Option<String>, default: T) -> AppResult<T>
where
    T: FromStr + PartialEq + Default,
    T::Err: std::fmt::Display,
{
    let value = parse(name, raw, default)?;
    if value == T::default() {
        return Err(AppError::Validation(format!(
            "{name} must be greater than zero"
        )));
    }
    Ok(value)
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::time::Duration;

    use peoplehub_core::AppError;

    use super::{EmailProvider, WorkerConfig};

    fn load(pairs: &[(&str, &str)]) -> Result<WorkerConfig, AppError> {
        let variables: HashMap<String, String> = pairs
            .iter()
            .map(|(name, value)| ((*name).to_owned(), (*value).to_owned()))
            .collect();
        WorkerConfig::from_lookup(|name| variables.get(name).cloned())
    }

    #[test]
    fn defaults_apply_when_only_the_database_is_set() {
        let config = load(&[("DATABASE_URL", "postgres://localhost/peoplehub")]);
        let Ok(config) = config else {
            panic!("config should load");
        };

        assert_eq!(config.database_max_connections, 5);
        assert_eq!(config.batch_size, 25);
        assert_eq!(config.poll_interval, Duration::from_millis(2_000));
        assert!(config.worker_id.starts_with("notifier-"));
        assert!(matches!(config.email_provider, EmailProvider::Console));
    }

    #[test]
    fn missing_database_url_is_rejected() {
        assert!(matches!(load(&[]), Err(AppError::Validation(_))));
    }

    #[test]
    fn zero_or_garbage_numbers_are_rejected() {
        for (name, value) in [
            ("NOTIFIER_BATCH_SIZE", "0"),
            ("NOTIFIER_POLL_INTERVAL_MS", "soon"),
            ("DATABASE_MAX_CONNECTIONS", "-1"),
        ] {
            let result = load(&[("DATABASE_URL", "postgres://db"), (name, value)]);
            assert!(
                matches!(result, Err(AppError::Validation(_))),
                "{name}={value} should be rejected"
            );
        }
    }

    #[test]
    fn smtp_provider_requires_host_and_sender() {
        let missing_sender = load(&[
            ("DATABASE_URL", "postgres://db"),
            ("EMAIL_PROVIDER", "smtp"),
            ("SMTP_HOST", "smtp.example.com"),
        ]);
        assert!(matches!(missing_sender, Err(AppError::Validation(_))));

        let complete = load(&[
            ("DATABASE_URL", "postgres://db"),
            ("EMAIL_PROVIDER", "smtp"),
            ("SMTP_HOST", "smtp.example.com"),
            ("SMTP_PORT", "2525"),
            ("SMTP_USERNAME", "mailer"),
            ("SMTP_FROM_ADDRESS", "hr@example.com"),
        ]);
        assert!(matches!(
            complete,
            Ok(WorkerConfig { email_provider: EmailProvider::Smtp(ref smtp), .. })
                if smtp.port == 2525
                    && smtp.username.as_deref() == Some("mailer")
                    && smtp.password.is_none()
        ));
    }

    #[test]
    fn unknown_provider_is_rejected() {
        let result = load(&[("DATABASE_URL", "postgres://db"), ("EMAIL_PROVIDER", "pigeon")]);
        assert!(matches!(result, Err(AppError::Validation(_))));
    }
}
