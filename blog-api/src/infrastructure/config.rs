use std::fmt::Display;
use std::str::FromStr;
use std::time::Duration;

use anyhow::Context;
use sqlx::postgres::PgConnectOptions;

use crate::infrastructure::logging::LogSettings;

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub http: HttpSettings,
    pub database: DatabaseSettings,
    pub log: LogSettings,
}

#[derive(Debug, Clone)]
pub struct HttpSettings {
    pub host: String,
    pub port: u16,
    pub cors_enabled: bool,
    pub cors_origins: Vec<String>,
    pub request_timeout: Duration,
}

impl Default for HttpSettings {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".into(),
            port: 8080,
            cors_enabled: false,
            cors_origins: vec!["*".into()],
            request_timeout: Duration::from_secs(15),
        }
    }
}

/// Either a full connection string or the discrete `POSTGRES_*` fields.
#[derive(Clone, PartialEq, Eq)]
pub enum DatabaseSettings {
    Url(String),
    Parts {
        host: String,
        port: u16,
        user: String,
        password: String,
        database: String,
    },
}

impl std::fmt::Debug for DatabaseSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DatabaseSettings::Url(_) => f.write_str("Url(..)"),
            DatabaseSettings::Parts {
                host,
                port,
                user,
                database,
                ..
            } => f
                .debug_struct("Parts")
                .field("host", host)
                .field("port", port)
                .field("user", user)
                .field("database", database)
                .finish_non_exhaustive(),
        }
    }
}

impl DatabaseSettings {
    pub fn connect_options(&self) -> anyhow::Result<PgConnectOptions> {
        match self {
            DatabaseSettings::Url(url) => {
                PgConnectOptions::from_str(url).context("invalid DATABASE_URL")
            }
            DatabaseSettings::Parts {
                host,
                port,
                user,
                password,
                database,
            } => Ok(PgConnectOptions::new()
                .host(host)
                .port(*port)
                .username(user)
                .password(password)
                .database(database)),
        }
    }
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the configuration from a key lookup; blank values count as unset.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> anyhow::Result<Self> {
        let var = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let defaults = HttpSettings::default();

        let host = var("HOST").unwrap_or(defaults.host);
        let port = parse_or(var("PORT"), defaults.port, "PORT")?;
        let cors_enabled = parse_bool(var("ENABLE_CORS"), defaults.cors_enabled, "ENABLE_CORS")?;
        let cors_origins = var("CORS_ORIGINS")
            .unwrap_or_else(|| "*".into())
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();
        let timeout_secs = parse_or(
            var("REQUEST_TIMEOUT_SECS"),
            defaults.request_timeout.as_secs(),
            "REQUEST_TIMEOUT_SECS",
        )?;
        if timeout_secs == 0 {
            anyhow::bail!("invalid REQUEST_TIMEOUT_SECS: must be greater than zero");
        }

        let database = match var("DATABASE_URL") {
            Some(url) => DatabaseSettings::Url(url),
            None => DatabaseSettings::Parts {
                host: var("POSTGRES_HOST").unwrap_or_else(|| "localhost".into()),
                port: parse_or(var("POSTGRES_PORT"), 5432, "POSTGRES_PORT")?,
                user: var("POSTGRES_USER")
                    .ok_or_else(|| anyhow::anyhow!("DATABASE_URL or POSTGRES_USER must be set"))?,
                password: var("POSTGRES_PASSWORD").unwrap_or_default(),
                database: var("POSTGRES_DB")
                    .ok_or_else(|| anyhow::anyhow!("DATABASE_URL or POSTGRES_DB must be set"))?,
            },
        };

        let log = LogSettings {
            level: var("LOG_LEVEL").unwrap_or_else(|| "info".into()),
            text: parse_bool(var("LOG_TEXTLOGGING"), false, "LOG_TEXTLOGGING")?,
        };

        Ok(Self {
            http: HttpSettings {
                host,
                port,
                cors_enabled,
                cors_origins,
                request_timeout: Duration::from_secs(timeout_secs),
            },
            database,
            log,
        })
    }
}

fn parse_or<T>(value: Option<String>, default: T, key: &str) -> anyhow::Result<T>
where
    T: FromStr,
    T::Err: Display,
{
    match value {
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|e| anyhow::anyhow!("invalid {}: {}", key, e)),
        None => Ok(default),
    }
}

fn parse_bool(value: Option<String>, default: bool, key: &str) -> anyhow::Result<bool> {
    match value.as_deref().map(|v| v.trim().to_ascii_lowercase()) {
        None => Ok(default),
        Some(v) => match v.as_str() {
            "1" | "true" | "yes" | "on" => Ok(true),
            "0" | "false" | "no" | "off" => Ok(false),
            other => anyhow::bail!("invalid {}: {}", key, other),
        },
    }
}
