use crate::services::adapters::SimulationPolicy;
use service_core::config::{self as core_config, env_flag, Environment};
use service_core::error::AppError;
use std::env;
use std::time::Duration;

const DEFAULT_SESSION_TTL_MINUTES: i64 = 30;
/// One day. Larger windows are rejected at load.
pub const MAX_SESSION_TTL_MINUTES: i64 = 24 * 60;
const DEFAULT_ADAPTER_CACHE_CAPACITY: usize = 1024;

#[derive(Debug, Clone)]
pub struct AcsServiceConfig {
    pub common: core_config::Config,
    pub environment: Environment,
    pub acs: AcsSettings,
}

#[derive(Debug, Clone)]
pub struct AcsSettings {
    /// How long a vendor session is trusted after login.
    pub session_ttl_minutes: i64,
    /// Outbound request timeout. `None` keeps the HTTP client default.
    pub http_timeout_secs: Option<u64>,
    /// Reuse session-holding adapters across calls for the same configuration.
    pub adapter_cache_enabled: bool,
    /// Upper bound on cached adapters. Zero disables the cache.
    pub adapter_cache_capacity: usize,
}

impl Default for AcsSettings {
    fn default() -> Self {
        Self {
            session_ttl_minutes: DEFAULT_SESSION_TTL_MINUTES,
            http_timeout_secs: None,
            adapter_cache_enabled: true,
            adapter_cache_capacity: DEFAULT_ADAPTER_CACHE_CAPACITY,
        }
    }
}

impl AcsServiceConfig {
    pub fn load() -> Result<Self, AppError> {
        let common = core_config::Config::load()?;
        let environment = Environment::from_env();

        let session_ttl_minutes = match env::var("ACS_SESSION_TTL_MINUTES") {
            Ok(value) if !value.trim().is_empty() => {
                validate_session_ttl(parse_env("ACS_SESSION_TTL_MINUTES", &value)?)?
            }
            _ => DEFAULT_SESSION_TTL_MINUTES,
        };

        let http_timeout_secs = match env::var("ACS_HTTP_TIMEOUT_SECS") {
            Ok(value) if !value.trim().is_empty() => {
                Some(parse_env("ACS_HTTP_TIMEOUT_SECS", &value)?)
            }
            _ => None,
        };

        let adapter_cache_capacity = match env::var("ACS_ADAPTER_CACHE_CAPACITY") {
            Ok(value) if !value.trim().is_empty() => {
                parse_env("ACS_ADAPTER_CACHE_CAPACITY", &value)?
            }
            _ => DEFAULT_ADAPTER_CACHE_CAPACITY,
        };

        Ok(AcsServiceConfig {
            common,
            environment,
            acs: AcsSettings {
                session_ttl_minutes,
                http_timeout_secs,
                adapter_cache_enabled: env_flag("ACS_ADAPTER_CACHE", true),
                adapter_cache_capacity,
            },
        })
    }

    pub fn simulation_policy(&self) -> SimulationPolicy {
        SimulationPolicy::for_environment(self.environment)
    }

    pub fn session_ttl(&self) -> chrono::Duration {
        // Settings built in code skip load-time validation; clamp so this cannot panic.
        chrono::Duration::minutes(
            self.acs
                .session_ttl_minutes
                .clamp(1, MAX_SESSION_TTL_MINUTES),
        )
    }

    pub fn http_timeout(&self) -> Option<Duration> {
        self.acs.http_timeout_secs.map(Duration::from_secs)
    }
}

fn parse_env<T>(key: &str, value: &str) -> Result<T, AppError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    value.trim().parse().map_err(|e| {
        AppError::ConfigError(anyhow::anyhow!("{} has invalid value '{}': {}", key, value, e))
    })
}

fn validate_session_ttl(minutes: i64) -> Result<i64, AppError> {
    if !(1..=MAX_SESSION_TTL_MINUTES).contains(&minutes) {
        return Err(AppError::ConfigError(anyhow::anyhow!(
            "ACS_SESSION_TTL_MINUTES must be between 1 and {}, got {}",
            MAX_SESSION_TTL_MINUTES,
            minutes
        )));
    }
    Ok(minutes)
}
