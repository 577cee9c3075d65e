// Runtime configuration, read from the environment (and `.env` via dotenv).

use anyhow::{anyhow, Context};
use std::net::IpAddr;
use std::str::FromStr;
use std::time::Duration;

use crate::core::moderation::ModerationConfig;
use crate::core::rate_limit::RateLimitPolicy;

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub bind_addr: String,
    pub database_url: String,
    pub backend_url: String,
    pub backend_service_key: String,
    pub jwt_secret: String,
    pub classifier_api_key: Option<String>,
    pub report_rate_limit_max: u32,
    pub report_rate_limit_window_hours: i64,
    pub queue_default_limit: usize,
    pub backend_timeout: Duration,
    pub reconcile_interval: Duration,
    /// Peers allowed to set `X-Forwarded-For`
    pub trusted_proxies: Vec<IpAddr>,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build the config from any key lookup. Empty values count as unset.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> anyhow::Result<Self> {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let required = |key: &str| get(key).ok_or_else(|| anyhow!("{key} must be set"));

        fn parse_or<T>(raw: Option<String>, key: &str, default: T) -> anyhow::Result<T>
        where
            T: FromStr,
            T::Err: std::error::Error + Send + Sync + 'static,
        {
            match raw {
                Some(v) => v
                    .trim()
                    .parse()
                    .with_context(|| format!("{key} must be a number (got {v:?})")),
                None => Ok(default),
            }
        }

        let config = Self {
            bind_addr: get("BIND_ADDR").unwrap_or_else(|| "0.0.0.0:8080".to_string()),
            database_url: get("DATABASE_URL").unwrap_or_else(|| "data/moderation.db".to_string()),
            backend_url: required("BACKEND_URL")?,
            backend_service_key: required("BACKEND_SERVICE_KEY")?,
            jwt_secret: required("JWT_SECRET")?,
            classifier_api_key: get("CLASSIFIER_API_KEY"),
            report_rate_limit_max: parse_or(
                get("REPORT_RATE_LIMIT_MAX"),
                "REPORT_RATE_LIMIT_MAX",
                10,
            )?,
            report_rate_limit_window_hours: parse_or(
                get("REPORT_RATE_LIMIT_WINDOW_HOURS"),
                "REPORT_RATE_LIMIT_WINDOW_HOURS",
                24,
            )?,
            queue_default_limit: parse_or(get("QUEUE_DEFAULT_LIMIT"), "QUEUE_DEFAULT_LIMIT", 100)?,
            backend_timeout: Duration::from_secs(parse_or(
                get("BACKEND_TIMEOUT_SECS"),
                "BACKEND_TIMEOUT_SECS",
                10,
            )?),
            reconcile_interval: Duration::from_secs(parse_or(
                get("RECONCILE_INTERVAL_SECS"),
                "RECONCILE_INTERVAL_SECS",
                300,
            )?),
            trusted_proxies: get("TRUSTED_PROXIES")
                .map(|raw| parse_proxies(&raw))
                .transpose()?
                .unwrap_or_default(),
        };

        config.report_policy().validate()?;
        if config.queue_default_limit == 0 {
            return Err(anyhow!("QUEUE_DEFAULT_LIMIT must be at least 1"));
        }
        if config.reconcile_interval.is_zero() {
            return Err(anyhow!("RECONCILE_INTERVAL_SECS must be at least 1"));
        }

        Ok(config)
    }

    pub fn report_policy(&self) -> RateLimitPolicy {
        RateLimitPolicy::per_hours(
            self.report_rate_limit_max,
            self.report_rate_limit_window_hours,
        )
    }

    pub fn moderation(&self) -> ModerationConfig {
        ModerationConfig {
            report_limit: self.report_policy(),
            default_queue_limit: self.queue_default_limit,
            // One backend call plus the disposition write
            reconcile_grace: chrono::Duration::seconds(2 * self.backend_timeout.as_secs() as i64),
        }
    }
}

fn parse_proxies(raw: &str) -> anyhow::Result<Vec<IpAddr>> {
    raw.split(',')
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .map(|p| {
            p.parse()
                .with_context(|| format!("TRUSTED_PROXIES entry {p:?} is not an IP address"))
        })
        .collect()
}
