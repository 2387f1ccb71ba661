use crate::app_config::{AnalysisMode, AppConfig, Environment};
use crate::ConfigError;

pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (compatible; BrandScan/1.0)";
pub const DEFAULT_OPENAI_BASE_URL: &str = "https://api.openai.com/v1";
pub const DEFAULT_RECHECK_CRON: &str = "*/30 * * * * *";

/// Load application configuration from environment variables.
///
/// Calls `dotenvy::dotenv().ok()` to load `.env` files before reading env vars.
///
/// # Errors
///
/// Returns `ConfigError` if required env vars are missing or values are invalid.
pub fn load_app_config() -> Result<AppConfig, ConfigError> {
    dotenvy::dotenv().ok();
    load_app_config_from_env()
}

/// Load application configuration from environment variables already in the process.
///
/// Unlike [`load_app_config`], this does NOT load `.env` files.
///
/// # Errors
///
/// Returns `ConfigError` if required env vars are missing or values are invalid.
pub fn load_app_config_from_env() -> Result<AppConfig, ConfigError> {
    build_app_config(|key| std::env::var(key))
}

/// Build application configuration using the provided env-var lookup function.
///
/// Decoupled from the process environment so it can be tested with a plain
/// `HashMap` lookup.
fn build_app_config<F>(lookup: F) -> Result<AppConfig, ConfigError>
where
    F: Fn(&str) -> Result<String, std::env::VarError>,
{
    use std::net::SocketAddr;

    let require = |var: &str| -> Result<String, ConfigError> {
        lookup(var).map_err(|_| ConfigError::MissingEnvVar(var.to_string()))
    };

    let or_default = |var: &str, default: &str| -> String {
        lookup(var).unwrap_or_else(|_| default.to_string())
    };

    let parse_num = |var: &str, default: &str| -> Result<u64, ConfigError> {
        let raw = or_default(var, default);
        raw.trim()
            .parse::<u64>()
            .map_err(|e| ConfigError::InvalidEnvVar {
                var: var.to_string(),
                reason: e.to_string(),
            })
    };

    let parse_u32 = |var: &str, default: &str| -> Result<u32, ConfigError> {
        let value = parse_num(var, default)?;
        u32::try_from(value).map_err(|e| ConfigError::InvalidEnvVar {
            var: var.to_string(),
            reason: e.to_string(),
        })
    };

    let parse_minutes = |var: &str, default: &str| -> Result<i64, ConfigError> {
        let value = parse_num(var, default)?;
        i64::try_from(value).map_err(|e| ConfigError::InvalidEnvVar {
            var: var.to_string(),
            reason: e.to_string(),
        })
    };

    let database_url = require("DATABASE_URL")?;
    let env = parse_environment(&or_default("BRANDSCAN_ENV", "development"))?;

    let bind_raw = or_default("BRANDSCAN_BIND_ADDR", "0.0.0.0:3000");
    let bind_addr = bind_raw
        .parse::<SocketAddr>()
        .map_err(|e| ConfigError::InvalidEnvVar {
            var: "BRANDSCAN_BIND_ADDR".to_string(),
            reason: e.to_string(),
        })?;
    let log_level = or_default("BRANDSCAN_LOG_LEVEL", "info");

    let db_max_connections = parse_u32("BRANDSCAN_DB_MAX_CONNECTIONS", "10")?;
    let db_min_connections = parse_u32("BRANDSCAN_DB_MIN_CONNECTIONS", "1")?;
    let db_acquire_timeout_secs = parse_num("BRANDSCAN_DB_ACQUIRE_TIMEOUT_SECS", "10")?;

    let fetch_timeout_secs = parse_num("BRANDSCAN_FETCH_TIMEOUT_SECS", "20")?;
    let user_agent = or_default("BRANDSCAN_USER_AGENT", DEFAULT_USER_AGENT);
    let fetch_max_attempts = parse_u32("BRANDSCAN_FETCH_MAX_ATTEMPTS", "3")?;
    if fetch_max_attempts == 0 {
        return Err(ConfigError::InvalidEnvVar {
            var: "BRANDSCAN_FETCH_MAX_ATTEMPTS".to_string(),
            reason: "must be at least 1".to_string(),
        });
    }
    let fetch_backoff_base_ms = parse_num("BRANDSCAN_FETCH_BACKOFF_BASE_MS", "1000")?;
    let search_delay_ms = parse_num("BRANDSCAN_SEARCH_DELAY_MS", "1500")?;

    let openai_api_key = lookup("OPENAI_API_KEY")
        .ok()
        .filter(|key| !key.trim().is_empty());
    let openai_base_url = or_default("BRANDSCAN_OPENAI_BASE_URL", DEFAULT_OPENAI_BASE_URL);
    let assistant_id = or_default("BRANDSCAN_ASSISTANT_ID", "");
    let analysis_mode = parse_analysis_mode(&or_default("BRANDSCAN_ANALYSIS_MODE", "deferred"))?;
    let poll_interval_secs = parse_num("BRANDSCAN_POLL_INTERVAL_SECS", "5")?;
    let max_poll_attempts = parse_u32("BRANDSCAN_MAX_POLL_ATTEMPTS", "60")?;
    let recheck_cron = or_default("BRANDSCAN_RECHECK_CRON", DEFAULT_RECHECK_CRON);
    let stale_processing_minutes = parse_minutes("BRANDSCAN_STALE_PROCESSING_MINUTES", "30")?;
    let stale_analyzing_minutes = parse_minutes("BRANDSCAN_STALE_ANALYZING_MINUTES", "120")?;

    Ok(AppConfig {
        database_url,
        env,
        bind_addr,
        log_level,
        db_max_connections,
        db_min_connections,
        db_acquire_timeout_secs,
        fetch_timeout_secs,
        user_agent,
        fetch_max_attempts,
        fetch_backoff_base_ms,
        search_delay_ms,
        openai_api_key,
        openai_base_url,
        assistant_id,
        analysis_mode,
        poll_interval_secs,
        max_poll_attempts,
        recheck_cron,
        stale_processing_minutes,
        stale_analyzing_minutes,
    })
}

/// Parse a string into an `Environment` variant.
///
/// Only `development`, `test`, and `production` are accepted.
fn parse_environment(s: &str) -> Result<Environment, ConfigError> {
    match s {
        "development" => Ok(Environment::Development),
        "test" => Ok(Environment::Test),
        "production" => Ok(Environment::Production),
        other => Err(ConfigError::InvalidEnvVar {
            var: "BRANDSCAN_ENV".to_string(),
            reason: format!("expected development, test, or production; got '{other}'"),
        }),
    }
}

fn parse_analysis_mode(s: &str) -> Result<AnalysisMode, ConfigError> {
    match s.trim().to_ascii_lowercase().as_str() {
        "inline" => Ok(AnalysisMode::Inline),
        "deferred" => Ok(AnalysisMode::Deferred),
        other => Err(ConfigError::InvalidEnvVar {
            var: "BRANDSCAN_ANALYSIS_MODE".to_string(),
            reason: format!("expected inline or deferred; got '{other}'"),
        }),
    }
}

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;
