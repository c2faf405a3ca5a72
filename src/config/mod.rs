use anyhow::{anyhow, Result};
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use std::fmt::Display;
use std::net::SocketAddr;
use std::ops::RangeInclusive;
use std::str::FromStr;

const ACCESS_TTL_MINUTES_RANGE: RangeInclusive<u64> = 1..=1440;
const JOB_EXPIRATION_DAYS_RANGE: RangeInclusive<i64> = 1..=3650;

/// Where accounts, follow edges, posts, notifications and jobs are kept.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StoreBackend {
    Postgres,
    Memory,
}

impl FromStr for StoreBackend {
    type Err = anyhow::Error;

    fn from_str(value: &str) -> Result<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "postgres" => Ok(Self::Postgres),
            "memory" => Ok(Self::Memory),
            other => Err(anyhow!("unknown store backend: {}", other)),
        }
    }
}

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub http_addr: String,
    pub store_backend: StoreBackend,
    pub database_url: Option<String>,
    pub db_max_connections: u32,
    pub db_connect_timeout_seconds: u64,
    pub db_idle_timeout_seconds: u64,
    pub db_max_lifetime_seconds: u64,
    pub run_migrations: bool,
    pub paseto_access_key: [u8; 32],
    pub access_ttl_minutes: u64,
    pub job_expiration_days: i64,
    pub job_sweep_interval_seconds: u64,
    pub max_body_bytes: usize,
}

impl AppConfig {
    pub fn from_env() -> Result<Self> {
        let http_addr = env_or("HTTP_ADDR", "0.0.0.0:5000");
        let _parsed_http_addr = SocketAddr::from_str(&http_addr)
            .map_err(|err| anyhow!("invalid HTTP_ADDR: {}", err))?;

        let store_backend: StoreBackend = env_or_parse("STORE_BACKEND", "postgres")?;
        let database_url = std::env::var("DATABASE_URL").ok();
        if store_backend == StoreBackend::Postgres && database_url.is_none() {
            return Err(anyhow!("missing required env var: DATABASE_URL"));
        }

        Ok(Self {
            http_addr,
            store_backend,
            database_url,
            db_max_connections: env_or_parse("DB_MAX_CONNECTIONS", "25")?,
            db_connect_timeout_seconds: env_or_parse("DB_CONNECT_TIMEOUT_SECONDS", "5")?,
            db_idle_timeout_seconds: env_or_parse("DB_IDLE_TIMEOUT_SECONDS", "300")?,
            db_max_lifetime_seconds: env_or_parse("DB_MAX_LIFETIME_SECONDS", "1800")?,
            run_migrations: env_or_parse("RUN_MIGRATIONS", "true")?,
            paseto_access_key: env_key_32("PASETO_ACCESS_KEY")?,
            access_ttl_minutes: in_range(
                "ACCESS_TTL_MINUTES",
                env_or_parse("ACCESS_TTL_MINUTES", "20")?,
                ACCESS_TTL_MINUTES_RANGE,
            )?,
            job_expiration_days: in_range(
                "JOB_EXPIRATION_DAYS",
                env_or_parse("JOB_EXPIRATION_DAYS", "30")?,
                JOB_EXPIRATION_DAYS_RANGE,
            )?,
            job_sweep_interval_seconds: env_or_parse("JOB_SWEEP_INTERVAL_SECONDS", "300")?,
            max_body_bytes: env_or_parse("MAX_BODY_BYTES", "1048576")?,
        })
    }
}

fn env_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

fn env_or_err(key: &str) -> Result<String> {
    std::env::var(key).map_err(|_| anyhow!("missing required env var: {}", key))
}

fn env_or_parse<T>(key: &str, default: &str) -> Result<T>
where
    T: FromStr,
    <T as FromStr>::Err: std::fmt::Display,
{
    let value = std::env::var(key).unwrap_or_else(|_| default.to_string());
    value
        .parse::<T>()
        .map_err(|err| anyhow!("invalid {}: {}", key, err))
}

fn in_range<T>(key: &str, value: T, range: RangeInclusive<T>) -> Result<T>
where
    T: PartialOrd + Display,
{
    if !range.contains(&value) {
        return Err(anyhow!(
            "invalid {}: {} is outside {}..={}",
            key,
            value,
            range.start(),
            range.end()
        ));
    }
    Ok(value)
}

fn env_key_32(key: &str) -> Result<[u8; 32]> {
    decode_key_32(key, &env_or_err(key)?)
}

fn decode_key_32(key: &str, value: &str) -> Result<[u8; 32]> {
    let decoded = STANDARD
        .decode(value.trim().as_bytes())
        .map_err(|err| anyhow!("invalid {}: {}", key, err))?;
    if decoded.len() != 32 {
        return Err(anyhow!("invalid {}: expected 32 bytes", key));
    }
    let mut key_bytes = [0u8; 32];
    key_bytes.copy_from_slice(&decoded);
    Ok(key_bytes)
}
