use std::env;
use std::str::FromStr;
use std::time::Duration;

use anyhow::{Context, bail};
use chrono::NaiveTime;
use dotenvy::dotenv;
use strum_macros::{AsRefStr, EnumString};
use tracing::warn;

#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumString, AsRefStr)]
#[strum(serialize_all = "lowercase")]
pub enum StoreBackend {
    Mysql,
    Memory,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub server_addr: String,
    pub jwt_secret: String,
    pub store_backend: StoreBackend,
    /// Required for the mysql backend only
    pub database_url: Option<String>,
    pub api_prefix: String,

    pub cache_ttl: Duration,
    pub cache_max_capacity: u64,

    // Office hours
    pub office_start: NaiveTime,
    pub late_grace_minutes: u32,

    pub rate_protected_per_min: u32,
    pub log_dir: String,
}

fn required(key: &str) -> anyhow::Result<String> {
    env::var(key).with_context(|| format!("{} must be set", key))
}

fn parse_or_default<T: FromStr + ToString>(key: &str, raw: Option<String>, default: T) -> T {
    match raw {
        Some(raw) => raw.trim().parse().unwrap_or_else(|_| {
            warn!(key, value = %raw, default = %default.to_string(), "Malformed config value, using default");
            default
        }),
        None => default,
    }
}

fn or_default<T: FromStr + ToString>(key: &str, default: T) -> T {
    parse_or_default(key, env::var(key).ok(), default)
}

impl Config {
    /// Log directory, readable before the rest of the configuration so the
    /// subscriber is in place when [`Config::from_env`] reports problems.
    pub fn log_dir() -> String {
        dotenv().ok();
        env::var("LOG_DIR").unwrap_or_else(|_| "logs".to_string())
    }

    pub fn from_env() -> anyhow::Result<Self> {
        let log_dir = Self::log_dir();

        let store_backend = match env::var("STORE_BACKEND") {
            Ok(raw) => StoreBackend::from_str(raw.trim())
                .with_context(|| format!("STORE_BACKEND must be mysql or memory, got {}", raw))?,
            Err(_) => StoreBackend::Mysql,
        };
        let database_url = env::var("DATABASE_URL").ok();
        if store_backend == StoreBackend::Mysql && database_url.is_none() {
            bail!("DATABASE_URL must be set when STORE_BACKEND is mysql");
        }

        let office_start = match env::var("OFFICE_START") {
            Ok(raw) => NaiveTime::parse_from_str(raw.trim(), "%H:%M")
                .with_context(|| format!("OFFICE_START must be HH:MM, got {}", raw))?,
            Err(_) => NaiveTime::from_hms_opt(9, 0, 0).context("invalid default office start")?,
        };

        Ok(Self {
            server_addr: required("SERVER_ADDR")?,
            jwt_secret: required("JWT_SECRET")?,
            store_backend,
            database_url,
            api_prefix: env::var("API_PREFIX").unwrap_or_else(|_| "/api".to_string()),

            cache_ttl: Duration::from_secs(or_default("CACHE_TTL_SECS", 300)),
            cache_max_capacity: or_default("CACHE_MAX_CAPACITY", 10_000),

            office_start,
            late_grace_minutes: or_default("LATE_GRACE_MINUTES", 15),

            rate_protected_per_min: or_default("RATE_PROTECTED_PER_MIN", 1000),
            log_dir,
        })
    }
}

#[cfg(test)]
impl Config {
    pub fn for_tests() -> Self {
        Self {
            server_addr: "127.0.0.1:0".into(),
            jwt_secret: "test-secret".into(),
            store_backend: StoreBackend::Memory,
            database_url: None,
            api_prefix: "/api".into(),
            cache_ttl: Duration::from_secs(60),
            cache_max_capacity: 1_000,
            office_start: NaiveTime::from_hms_opt(9, 0, 0).unwrap(),
            late_grace_minutes: 15,
            rate_protected_per_min: 1000,
            log_dir: "logs".into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::io::{self, Write};
    use std::sync::{Arc, Mutex};

    use super::*;

    #[test]
    fn backend_names_parse() {
        assert_eq!("mysql".parse::<StoreBackend>().unwrap(), StoreBackend::Mysql);
        assert_eq!("memory".parse::<StoreBackend>().unwrap(), StoreBackend::Memory);
        assert!("postgres".parse::<StoreBackend>().is_err());
    }

    #[derive(Clone, Default)]
    struct Captured(Arc<Mutex<Vec<u8>>>);

    impl Write for Captured {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn malformed_numbers_fall_back_with_a_warning() {
        let captured = Captured::default();
        let writer = captured.clone();
        let subscriber = tracing_subscriber::fmt()
            .with_writer(move || writer.clone())
            .with_ansi(false)
            .finish();

        let ttl = tracing::subscriber::with_default(subscriber, || {
            parse_or_default("CACHE_TTL_SECS", Some("five minutes".into()), 300u64)
        });
        assert_eq!(ttl, 300);

        let output = String::from_utf8(captured.0.lock().unwrap().clone()).unwrap();
        assert!(output.contains("Malformed config value"), "{}", output);
        assert!(output.contains("CACHE_TTL_SECS"), "{}", output);

        assert_eq!(parse_or_default("LATE_GRACE_MINUTES", Some(" 20 ".into()), 15u32), 20);
        assert_eq!(parse_or_default("LATE_GRACE_MINUTES", None, 15u32), 15);
    }
}
