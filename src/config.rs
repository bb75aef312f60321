use std::env;

use anyhow::{Context, Result, bail};
use dotenvy::dotenv;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreBackend {
    MySql,
    Memory,
}

/// Seed account created at startup when it does not exist yet.
#[derive(Clone)]
pub struct BootstrapAdmin {
    pub login_id: String,
    pub email: String,
    pub password: String,
}

#[derive(Clone)]
pub struct Config {
    pub server_addr: String,
    pub store_backend: StoreBackend,
    pub database_url: Option<String>,
    pub jwt_secret: String,
    pub access_token_ttl: usize,
    pub refresh_token_ttl: usize,

    // Rate limiting
    pub rate_login_per_min: u32,
    pub rate_refresh_per_min: u32,
    pub rate_protected_per_min: u32,

    pub api_prefix: String,
    pub standard_work_hours: f64,
    pub log_dir: String,
    pub bootstrap_admin: Option<BootstrapAdmin>,
}

fn var_or<T>(key: &str, default: T) -> Result<T>
where
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse()
            .with_context(|| format!("{key} has an invalid value '{raw}'")),
        Err(_) => Ok(default),
    }
}

fn required(key: &str) -> Result<String> {
    env::var(key).with_context(|| format!("{key} must be set"))
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenv().ok();

        let store_backend = match env::var("STORE_BACKEND")
            .unwrap_or_else(|_| "mysql".to_string())
            .to_lowercase()
            .as_str()
        {
            "mysql" => StoreBackend::MySql,
            "memory" => StoreBackend::Memory,
            other => bail!("STORE_BACKEND must be 'mysql' or 'memory', got '{other}'"),
        };

        let database_url = match store_backend {
            StoreBackend::MySql => Some(required("DATABASE_URL")?),
            StoreBackend::Memory => env::var("DATABASE_URL").ok(),
        };

        let standard_work_hours: f64 = var_or("STANDARD_WORK_HOURS", 8.0)?;
        if !(standard_work_hours > 0.0 && standard_work_hours <= 24.0) {
            bail!("STANDARD_WORK_HOURS must be within (0, 24]");
        }

        let bootstrap_admin = match (
            env::var("BOOTSTRAP_ADMIN_LOGIN_ID"),
            env::var("BOOTSTRAP_ADMIN_EMAIL"),
            env::var("BOOTSTRAP_ADMIN_PASSWORD"),
        ) {
            (Ok(login_id), Ok(email), Ok(password)) => Some(BootstrapAdmin {
                login_id,
                email,
                password,
            }),
            _ => None,
        };

        Ok(Self {
            server_addr: required("SERVER_ADDR")?,
            store_backend,
            database_url,
            jwt_secret: required("JWT_SECRET")?,
            access_token_ttl: var_or("ACCESS_TOKEN_TTL", 900)?, // 15 min
            refresh_token_ttl: var_or("REFRESH_TOKEN_TTL", 604_800)?, // 7 days

            rate_login_per_min: var_or("RATE_LOGIN_PER_MIN", 60)?,
            rate_refresh_per_min: var_or("RATE_REFRESH_PER_MIN", 30)?,
            rate_protected_per_min: var_or("RATE_PROTECTED_PER_MIN", 1000)?,

            api_prefix: env::var("API_PREFIX").unwrap_or_else(|_| "/api".to_string()),
            standard_work_hours,
            log_dir: env::var("LOG_DIR").unwrap_or_else(|_| "logs".to_string()),
            bootstrap_admin,
        })
    }
}
