use crate::app_config::{AppConfig, Environment};
use crate::ConfigError;

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
fn build_app_config<F>(lookup: F) -> Result<AppConfig, ConfigError>
where
    F: Fn(&str) -> Result<String, std::env::VarError>,
{
    use std::path::PathBuf;

    let require = |var: &str| -> Result<String, ConfigError> {
        lookup(var)
            .ok()
            .filter(|v| !v.trim().is_empty())
            .ok_or_else(|| ConfigError::MissingEnvVar(var.to_string()))
    };

    let or_default = |var: &str, default: &str| -> String {
        lookup(var).unwrap_or_else(|_| default.to_string())
    };

    let invalid = |var: &str, reason: String| ConfigError::InvalidEnvVar {
        var: var.to_string(),
        reason,
    };

    let parse_u32 = |var: &str, default: &str| -> Result<u32, ConfigError> {
        or_default(var, default)
            .parse::<u32>()
            .map_err(|e| invalid(var, e.to_string()))
    };

    let parse_u64 = |var: &str, default: &str| -> Result<u64, ConfigError> {
        or_default(var, default)
            .parse::<u64>()
            .map_err(|e| invalid(var, e.to_string()))
    };

    let api_base_url = require("KERBSIDE_API_BASE_URL")?;
    if !(api_base_url.starts_with("http://") || api_base_url.starts_with("https://")) {
        return Err(invalid(
            "KERBSIDE_API_BASE_URL",
            format!("expected an http(s) URL, got '{api_base_url}'"),
        ));
    }
    let api_key = lookup("KERBSIDE_API_KEY")
        .ok()
        .filter(|v| !v.trim().is_empty());

    let env = parse_environment(&or_default("KERBSIDE_ENV", "development"))?;
    let log_level = or_default("KERBSIDE_LOG_LEVEL", "info");

    let bays_path = or_default("KERBSIDE_BAYS_PATH", "/parkingbays");
    if !bays_path.starts_with('/') {
        return Err(invalid(
            "KERBSIDE_BAYS_PATH",
            format!("path must start with '/', got '{bays_path}'"),
        ));
    }
    let places_path = PathBuf::from(or_default("KERBSIDE_PLACES_PATH", "./config/places.yaml"));

    let cache_ttl_secs = parse_u64("KERBSIDE_CACHE_TTL_SECS", "300")?;
    let request_timeout_secs = parse_u64("KERBSIDE_REQUEST_TIMEOUT_SECS", "30")?;
    let user_agent = or_default("KERBSIDE_USER_AGENT", "kerbside/0.1 (parking-availability)");
    let max_retries = parse_u32("KERBSIDE_MAX_RETRIES", "3")?;
    let retry_backoff_base_ms = parse_u64("KERBSIDE_RETRY_BACKOFF_BASE_MS", "500")?;

    let nearby_radius_deg = or_default("KERBSIDE_NEARBY_RADIUS_DEG", "0.003")
        .parse::<f64>()
        .map_err(|e| invalid("KERBSIDE_NEARBY_RADIUS_DEG", e.to_string()))?;
    if !nearby_radius_deg.is_finite() || nearby_radius_deg <= 0.0 {
        return Err(invalid(
            "KERBSIDE_NEARBY_RADIUS_DEG",
            format!("must be a positive number of degrees, got {nearby_radius_deg}"),
        ));
    }

    Ok(AppConfig {
        api_base_url,
        api_key,
        env,
        log_level,
        bays_path,
        places_path,
        cache_ttl_secs,
        request_timeout_secs,
        user_agent,
        max_retries,
        retry_backoff_base_ms,
        nearby_radius_deg,
    })
}

/// Parse a string into an `Environment` variant.
///
/// # Errors
///
/// Returns `ConfigError::InvalidEnvVar` for anything other than
/// `development`, `test`, or `production`.
fn parse_environment(s: &str) -> Result<Environment, ConfigError> {
    match s.trim() {
        "development" => Ok(Environment::Development),
        "test" => Ok(Environment::Test),
        "production" => Ok(Environment::Production),
        other => Err(ConfigError::InvalidEnvVar {
            var: "KERBSIDE_ENV".to_string(),
            reason: format!("unknown environment '{other}'"),
        }),
    }
}

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;
