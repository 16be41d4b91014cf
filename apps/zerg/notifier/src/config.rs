use core_config::{
    database::DatabaseConfig, env_optional, env_or_default, env_parse, env_required,
    server::ServerConfig, ConfigError, Environment, FromEnv,
};
use domain_notifications::{
    retry::DEFAULT_SWEEP_BATCH, tracking::DEFAULT_RETENTION_DAYS, SendGridConfig, SmtpConfig,
};

pub const DEFAULT_RETRY_SWEEP_CRON: &str = "*/30 * * * * *";
pub const DEFAULT_CLEANUP_CRON: &str = "0 0 3 * * *";

/// Which transport the mailer talks to
#[derive(Clone, Debug, PartialEq)]
pub enum ProviderConfig {
    Smtp(SmtpConfig),
    SendGrid(SendGridConfig),
}

/// Background job settings
#[derive(Clone, Debug, PartialEq)]
pub struct JobsConfig {
    pub retry_sweep_cron: String,
    pub cleanup_cron: String,
    pub retention_days: u32,
    pub sweep_batch: u64,
}

impl FromEnv for JobsConfig {
    fn from_env() -> Result<Self, ConfigError> {
        Ok(Self {
            retry_sweep_cron: env_or_default("NOTIFIER_RETRY_SWEEP_CRON", DEFAULT_RETRY_SWEEP_CRON),
            cleanup_cron: env_or_default("NOTIFIER_CLEANUP_CRON", DEFAULT_CLEANUP_CRON),
            retention_days: env_parse("NOTIFIER_RETENTION_DAYS", DEFAULT_RETENTION_DAYS)?,
            sweep_batch: env_parse("NOTIFIER_SWEEP_BATCH", DEFAULT_SWEEP_BATCH)?,
        })
    }
}

#[derive(Clone, Debug)]
pub struct NotifierConfig {
    pub environment: Environment,
    pub server: ServerConfig,
    /// `None` runs against the in-memory store
    pub database: Option<DatabaseConfig>,
    pub provider: ProviderConfig,
    pub jobs: JobsConfig,
}

impl FromEnv for NotifierConfig {
    fn from_env() -> Result<Self, ConfigError> {
        let environment = Environment::from_env();
        let database = match env_optional("DATABASE_URL") {
            Some(_) => Some(DatabaseConfig::from_env()?),
            None => None,
        };
        let provider = provider_from_env(&environment)?;

        Ok(Self {
            server: ServerConfig::from_env()?,
            database,
            provider,
            jobs: JobsConfig::from_env()?,
            environment,
        })
    }
}

/// SendGrid in production, SMTP (MailHog/Mailpit by default) everywhere else.
fn provider_from_env(environment: &Environment) -> Result<ProviderConfig, ConfigError> {
    if environment.is_production() {
        let config = SendGridConfig::new(
            env_required("SENDGRID_API_KEY")?,
            env_required("SENDGRID_FROM_EMAIL")?,
            env_or_default("SENDGRID_FROM_NAME", "Zerg Notifications"),
        );
        return Ok(ProviderConfig::SendGrid(config));
    }

    let defaults = SmtpConfig::mailhog();
    let mut config = SmtpConfig::new(
        env_or_default("SMTP_HOST", &defaults.host),
        env_parse("SMTP_PORT", defaults.port)?,
        env_or_default("SMTP_FROM_EMAIL", &defaults.from_email),
        env_or_default("SMTP_FROM_NAME", &defaults.from_name),
    )
    .with_tls(env_parse("SMTP_USE_TLS", false)?);

    if let (Some(username), Some(password)) =
        (env_optional("SMTP_USERNAME"), env_optional("SMTP_PASSWORD"))
    {
        config = config.with_credentials(username, password);
    }

    Ok(ProviderConfig::Smtp(config))
}

#[cfg(test)]
mod tests {
    use super::*;

    const UNSET: [(&str, Option<&str>); 12] = [
        ("APP_ENV", None),
        ("DATABASE_URL", None),
        ("SMTP_HOST", None),
        ("SMTP_PORT", None),
        ("SMTP_USERNAME", None),
        ("SMTP_PASSWORD", None),
        ("SMTP_USE_TLS", None),
        ("SENDGRID_API_KEY", None),
        ("SENDGRID_FROM_EMAIL", None),
        ("NOTIFIER_RETENTION_DAYS", None),
        ("NOTIFIER_SWEEP_BATCH", None),
        ("NOTIFIER_RETRY_SWEEP_CRON", None),
    ];

    #[test]
    fn test_development_defaults() {
        temp_env::with_vars(UNSET, || {
            let config = NotifierConfig::from_env().unwrap();

            assert!(config.environment.is_development());
            assert!(config.database.is_none());
            assert_eq!(config.provider, ProviderConfig::Smtp(SmtpConfig::mailhog()));
            assert_eq!(config.jobs.retry_sweep_cron, DEFAULT_RETRY_SWEEP_CRON);
            assert_eq!(config.jobs.retention_days, 90);
            assert_eq!(config.jobs.sweep_batch, 50);
        });
    }

    #[test]
    fn test_smtp_overrides() {
        temp_env::with_vars(
            [
                ("APP_ENV", None),
                ("SMTP_HOST", Some("smtp.internal")),
                ("SMTP_PORT", Some("587")),
                ("SMTP_USE_TLS", Some("true")),
                ("SMTP_USERNAME", Some("relay")),
                ("SMTP_PASSWORD", Some("secret")),
            ],
            || {
                let ProviderConfig::Smtp(smtp) = NotifierConfig::from_env().unwrap().provider
                else {
                    panic!("expected smtp provider");
                };
                assert_eq!(smtp.host, "smtp.internal");
                assert_eq!(smtp.port, 587);
                assert!(smtp.use_tls);
                assert_eq!(smtp.username.as_deref(), Some("relay"));
            },
        );
    }

    #[test]
    fn test_production_requires_sendgrid_key() {
        temp_env::with_vars(
            [
                ("APP_ENV", Some("production")),
                ("SENDGRID_API_KEY", None),
                ("SENDGRID_FROM_EMAIL", Some("ops@example.com")),
            ],
            || {
                let err = NotifierConfig::from_env().unwrap_err();
                assert!(err.to_string().contains("SENDGRID_API_KEY"));
            },
        );
    }

    #[test]
    fn test_production_uses_sendgrid() {
        temp_env::with_vars(
            [
                ("APP_ENV", Some("production")),
                ("SENDGRID_API_KEY", Some("SG.key")),
                ("SENDGRID_FROM_EMAIL", Some("ops@example.com")),
                ("SENDGRID_FROM_NAME", None),
            ],
            || {
                let config = NotifierConfig::from_env().unwrap();
                assert_eq!(
                    config.provider,
                    ProviderConfig::SendGrid(SendGridConfig::new(
                        "SG.key".to_string(),
                        "ops@example.com".to_string(),
                        "Zerg Notifications".to_string(),
                    ))
                );
            },
        );
    }

    #[test]
    fn test_database_enabled_by_url() {
        temp_env::with_vars(
            [
                ("APP_ENV", None),
                ("DATABASE_URL", Some("postgres://localhost/notifications")),
            ],
            || {
                let database = NotifierConfig::from_env().unwrap().database.unwrap();
                assert_eq!(database.url, "postgres://localhost/notifications");
            },
        );
    }

    #[test]
    fn test_malformed_retention_fails() {
        temp_env::with_vars(
            [("APP_ENV", None), ("NOTIFIER_RETENTION_DAYS", Some("forever"))],
            || {
                let err = NotifierConfig::from_env().unwrap_err();
                assert!(err.to_string().contains("NOTIFIER_RETENTION_DAYS"));
            },
        );
    }
}
