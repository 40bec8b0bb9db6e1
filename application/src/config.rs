//! [`Config`]-related definitions.

use std::time;

use common::money::Currency;
use config::{builder::DefaultState, ConfigBuilder, ConfigError};
use rust_decimal::Decimal;
use secrecy::{ExposeSecret as _, SecretString};
use serde::Deserialize;
use service::domain::billing;
use smart_default::SmartDefault;

/// Application configuration.
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Server configuration.
    pub server: Server,

    /// Service configuration.
    pub service: Service,

    /// Postgres configuration.
    pub postgres: Postgres,

    /// Log configuration.
    pub log: Log,
}

impl Config {
    /// Creates a new [`Config`] by:
    /// - loading it from the provided `path` (if any);
    /// - merging it with the environment variables (if any);
    /// - using default values for missing fields.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid.
    pub fn new(path: impl AsRef<str>) -> Result<Self, ConfigError> {
        ConfigBuilder::<DefaultState>::default()
            .add_source(config::File::with_name(path.as_ref()).required(false))
            .add_source(config::Environment::with_prefix("CONF").separator("."))
            .build()?
            .try_deserialize()
    }
}

/// Server configuration.
#[derive(Clone, Debug, Deserialize, SmartDefault)]
#[serde(default)]
pub struct Server {
    /// Host to bind the server to.
    #[default("0.0.0.0".to_owned())]
    pub host: String,

    /// Port to bind the server to.
    #[default(8080)]
    pub port: u16,

    /// [CORS] configuration.
    ///
    /// [CORS]: https://developer.mozilla.org/en-US/docs/Web/HTTP/CORS
    pub cors: Cors,
}

/// [CORS] configuration.
///
/// [CORS]: https://developer.mozilla.org/en-US/docs/Web/HTTP/CORS
#[derive(Clone, Debug, Deserialize, SmartDefault)]
#[serde(default)]
pub struct Cors {
    /// List of allowed origins.
    #[default(vec!["*".to_owned()])]
    pub origins: Vec<String>,
}

/// Service configuration.
#[derive(Clone, Debug, Deserialize, SmartDefault)]
#[serde(default)]
pub struct Service {
    /// [JWT] secret.
    ///
    /// [JWT]: https://wikipedia.org/wiki/JSON_Web_Token
    #[default(SecretString::from("secret".to_owned()))]
    pub jwt_secret: SecretString,

    /// Lifetime of an issued session.
    #[default(time::Duration::from_secs(60 * 60 * 24))]
    #[serde(with = "humantime_serde")]
    pub session_ttl: time::Duration,

    /// `bcrypt` cost of password hashes.
    #[default(12)]
    pub password_hash_cost: u32,

    /// Lifetime of an issued one-time password.
    #[default(time::Duration::from_secs(5 * 60))]
    #[serde(with = "humantime_serde")]
    pub otp_ttl: time::Duration,

    /// Maximum duration of a single mutation, including waiting for locks.
    #[default(time::Duration::from_secs(5))]
    #[serde(with = "humantime_serde")]
    pub transaction_timeout: time::Duration,

    /// Hourly rental rates.
    pub rates: Rates,

    /// Reservation policy.
    pub policy: Policy,

    /// Service tasks configuration.
    pub tasks: Tasks,
}

impl From<Service> for service::Config {
    fn from(value: Service) -> Self {
        let Service {
            jwt_secret,
            session_ttl,
            password_hash_cost,
            otp_ttl,
            transaction_timeout,
            rates,
            policy,
            tasks: Tasks { sweep_expired_otps },
        } = value;

        let jwt_secret = jwt_secret.expose_secret().as_bytes();
        Self {
            jwt_encoding_key: jsonwebtoken::EncodingKey::from_secret(
                jwt_secret,
            ),
            jwt_decoding_key: jsonwebtoken::DecodingKey::from_secret(
                jwt_secret,
            ),
            session_ttl,
            password_hash_cost,
            otp_ttl,
            rates: rates.into(),
            policy: policy.into(),
            transaction_timeout,
            sweep_expired_otps: service::task::sweep_expired_otps::Config {
                interval: sweep_expired_otps.interval,
            },
        }
    }
}

/// Hourly rental rates per membership tier.
#[derive(Clone, Copy, Debug, Deserialize, SmartDefault)]
#[serde(default)]
pub struct Rates {
    /// Hourly rate of the `BASIC` tier.
    #[default(Decimal::TEN)]
    pub basic: Decimal,

    /// Hourly rate of the `PREMIUM` tier.
    #[default(Decimal::new(8, 0))]
    pub premium: Decimal,

    /// Hourly rate of the `VIP` tier.
    #[default(Decimal::new(5, 0))]
    pub vip: Decimal,

    /// Currency of the rates.
    #[default(Currency::Usd)]
    pub currency: Currency,
}

impl From<Rates> for billing::Rates {
    fn from(value: Rates) -> Self {
        let Rates {
            basic,
            premium,
            vip,
            currency,
        } = value;

        Self {
            basic,
            premium,
            vip,
            currency,
        }
    }
}

/// Reservation policy.
#[derive(Clone, Copy, Debug, Deserialize, SmartDefault)]
#[serde(default)]
pub struct Policy {
    /// Whether bookings starting in the past are rejected.
    #[default(true)]
    pub reject_past_bookings: bool,

    /// What happens to the billing of a completed rental.
    pub completion_billing: CompletionBilling,
}

impl From<Policy> for service::Policy {
    fn from(value: Policy) -> Self {
        let Policy {
            reject_past_bookings,
            completion_billing,
        } = value;

        Self {
            reject_past_bookings,
            completion_billing: match completion_billing {
                CompletionBilling::Settle => billing::CompletionPolicy::Settle,
                CompletionBilling::KeepPending => {
                    billing::CompletionPolicy::KeepPending
                }
            },
        }
    }
}

/// What happens to the billing of a completed rental.
#[derive(Clone, Copy, Debug, Default, Deserialize, Eq, PartialEq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CompletionBilling {
    /// Billing is marked as paid.
    Settle,

    /// Billing awaits an explicit payment confirmation.
    #[default]
    KeepPending,
}

/// Service tasks configuration.
#[derive(Clone, Copy, Debug, Deserialize, SmartDefault)]
#[serde(default)]
pub struct Tasks {
    /// `SweepExpiredOtps` task configuration.
    pub sweep_expired_otps: Task,
}

/// Service task configuration.
#[derive(Clone, Copy, Debug, Deserialize, SmartDefault)]
#[serde(default)]
pub struct Task {
    /// Task execution interval.
    #[default(time::Duration::from_secs(60))]
    #[serde(with = "humantime_serde")]
    pub interval: time::Duration,
}

/// Postgres configuration.
#[derive(Clone, Debug, Deserialize, SmartDefault)]
#[serde(default)]
pub struct Postgres {
    /// Host to connect to.
    #[default("127.0.0.1".to_owned())]
    pub host: String,

    /// Port to connect to.
    #[default(5432)]
    pub port: u16,

    /// User to connect as.
    #[default("postgres".to_owned())]
    pub user: String,

    /// Password to connect with.
    #[default("postgres".to_owned())]
    pub password: String,

    /// Database name to connect to.
    #[default("postgres".to_owned())]
    pub dbname: String,

    /// Maximum time a transaction waits for a row lock.
    #[default(time::Duration::from_secs(3))]
    #[serde(with = "humantime_serde")]
    pub lock_timeout: time::Duration,
}

impl From<Postgres> for service::infra::postgres::Config {
    fn from(value: Postgres) -> Self {
        let Postgres {
            host,
            port,
            user,
            password,
            dbname,
            lock_timeout: _,
        } = value;

        Self {
            host: Some(host),
            port: Some(port),
            user: Some(user),
            password: Some(password),
            dbname: Some(dbname),
            ..Self::default()
        }
    }
}

/// Log configuration.
#[derive(Clone, Copy, Debug, Default, Deserialize)]
#[serde(default)]
pub struct Log {
    /// Log level.
    pub level: LogLevel,
}

/// Log level.
#[derive(Clone, Copy, Debug, Default, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LogLevel {
    /// Designates very low priority, often extremely verbose, information.
    Trace,

    /// Designates lower priority information.
    Debug,

    /// Designates useful information.
    #[default]
    Info,

    /// Designates hazardous situations.
    Warn,

    /// Designates very serious errors.
    Error,
}

impl From<LogLevel> for tracing::Level {
    fn from(value: LogLevel) -> Self {
        match value {
            LogLevel::Trace => Self::TRACE,
            LogLevel::Debug => Self::DEBUG,
            LogLevel::Info => Self::INFO,
            LogLevel::Warn => Self::WARN,
            LogLevel::Error => Self::ERROR,
        }
    }
}

#[cfg(test)]
mod spec {
    use std::time::Duration;

    use config::{builder::DefaultState, ConfigBuilder, FileFormat};
    use rust_decimal::Decimal;
    use service::domain::billing;

    use super::{CompletionBilling, Config};

    fn parse(toml: &str) -> Config {
        ConfigBuilder::<DefaultState>::default()
            .add_source(config::File::from_str(toml, FileFormat::Toml))
            .build()
            .unwrap()
            .try_deserialize()
            .unwrap()
    }

    #[test]
    fn uses_defaults_for_missing_fields() {
        let conf = parse("");

        assert_eq!(conf.server.port, 8080);
        assert_eq!(conf.service.transaction_timeout, Duration::from_secs(5));
        assert_eq!(conf.service.otp_ttl, Duration::from_secs(300));
        assert!(conf.service.policy.reject_past_bookings);
        assert_eq!(
            conf.service.policy.completion_billing,
            CompletionBilling::KeepPending,
        );
        assert_eq!(conf.service.rates.basic, Decimal::TEN);
    }

    #[test]
    fn parses_service_section() {
        let conf = parse(
            r#"
            [service]
            transaction_timeout = "250ms"
            otp_ttl = "2m"

            [service.policy]
            reject_past_bookings = false
            completion_billing = "SETTLE"

            [service.rates]
            vip = "4.5"
            currency = "EUR"

            [service.tasks.sweep_expired_otps]
            interval = "30s"

            [postgres]
            lock_timeout = "1s"
            "#,
        );

        assert_eq!(conf.postgres.lock_timeout, Duration::from_secs(1));

        let svc = service::Config::from(conf.service);
        assert_eq!(svc.transaction_timeout, Duration::from_millis(250));
        assert_eq!(svc.otp_ttl, Duration::from_secs(120));
        assert!(!svc.policy.reject_past_bookings);
        assert_eq!(
            svc.policy.completion_billing,
            billing::CompletionPolicy::Settle,
        );
        assert_eq!(svc.rates.vip, Decimal::new(45, 1));
        assert_eq!(svc.rates.basic, Decimal::TEN);
        assert_eq!(svc.sweep_expired_otps.interval, Duration::from_secs(30));
    }
}
