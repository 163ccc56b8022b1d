use std::{env, path::PathBuf, str::FromStr};

use anyhow::Context;
use chrono::{Duration, Utc};

/// Limits applied to one-time codes (sign-up verification and password reset).
#[derive(Debug, Clone, Copy)]
pub struct OtpPolicy {
    pub ttl: Duration,
    pub max_attempts: i32,
    pub block: Duration,
}

impl Default for OtpPolicy {
    fn default() -> Self {
        Self {
            ttl: Duration::minutes(2),
            max_attempts: 5,
            block: Duration::minutes(15),
        }
    }
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub database_url: String,
    pub host: String,
    pub port: u16,
    pub jwt_secret: String,
    pub access_token_ttl: Duration,
    pub refresh_token_ttl: Duration,
    pub otp: OtpPolicy,
    pub upload_dir: PathBuf,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds the config from any key lookup; missing optional keys fall back to defaults.
    pub fn from_lookup<F>(lookup: F) -> anyhow::Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let database_url = lookup("DATABASE_URL").context("DATABASE_URL is not set")?;
        let jwt_secret = lookup("JWT_SECRET").context("JWT_SECRET is not set")?;
        let host = lookup("APP_HOST").unwrap_or_else(|| "127.0.0.1".to_string());
        let port = parse_or(&lookup, "APP_PORT", 3000_u16)?;

        let access_token_ttl = positive_duration(
            &lookup,
            "ACCESS_TOKEN_TTL_MINUTES",
            60,
            Duration::try_minutes,
        )?;
        let refresh_token_ttl =
            positive_duration(&lookup, "REFRESH_TOKEN_TTL_DAYS", 30, Duration::try_days)?;

        let defaults = OtpPolicy::default();
        let otp = OtpPolicy {
            ttl: positive_duration(
                &lookup,
                "OTP_TTL_MINUTES",
                defaults.ttl.num_minutes(),
                Duration::try_minutes,
            )?,
            max_attempts: parse_or(&lookup, "OTP_MAX_ATTEMPTS", defaults.max_attempts)?,
            block: positive_duration(
                &lookup,
                "OTP_BLOCK_MINUTES",
                defaults.block.num_minutes(),
                Duration::try_minutes,
            )?,
        };
        if otp.max_attempts < 1 {
            anyhow::bail!("OTP_MAX_ATTEMPTS must be at least 1");
        }

        let upload_dir = lookup("UPLOAD_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from("uploads"));

        Ok(Self {
            database_url,
            host,
            port,
            jwt_secret,
            access_token_ttl,
            refresh_token_ttl,
            otp,
            upload_dir,
        })
    }
}

fn parse_or<F, T>(lookup: &F, key: &str, default: T) -> anyhow::Result<T>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match lookup(key) {
        Some(raw) => raw
            .trim()
            .parse::<T>()
            .with_context(|| format!("{key} has an invalid value: {raw}")),
        None => Ok(default),
    }
}

/// A strictly positive amount of `unit` that still yields a representable timestamp from now.
fn positive_duration<F>(
    lookup: &F,
    key: &str,
    default: i64,
    unit: fn(i64) -> Option<Duration>,
) -> anyhow::Result<Duration>
where
    F: Fn(&str) -> Option<String>,
{
    let amount = parse_or(lookup, key, default)?;
    if amount <= 0 {
        anyhow::bail!("{key} must be greater than 0, got {amount}");
    }
    unit(amount)
        .filter(|duration| Utc::now().checked_add_signed(*duration).is_some())
        .with_context(|| format!("{key} is out of range: {amount}"))
}
