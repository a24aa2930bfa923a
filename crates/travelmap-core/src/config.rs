use crate::app_config::{AppConfig, Environment, ScheduleConfig};
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

fn invalid(var: &str, reason: impl ToString) -> ConfigError {
    ConfigError::InvalidEnvVar {
        var: var.to_string(),
        reason: reason.to_string(),
    }
}

/// Build application configuration using the provided env-var lookup function.
///
/// Decoupled from the process environment so tests can pass a `HashMap` lookup.
fn build_app_config<F>(lookup: F) -> Result<AppConfig, ConfigError>
where
    F: Fn(&str) -> Result<String, std::env::VarError>,
{
    use std::net::SocketAddr;
    use std::path::PathBuf;

    let require = |var: &str| -> Result<String, ConfigError> {
        lookup(var).map_err(|_| ConfigError::MissingEnvVar(var.to_string()))
    };

    let or_default = |var: &str, default: &str| -> String {
        lookup(var).unwrap_or_else(|_| default.to_string())
    };

    let parse_u32 = |var: &str, default: &str| -> Result<u32, ConfigError> {
        or_default(var, default)
            .parse::<u32>()
            .map_err(|e| invalid(var, e))
    };

    let parse_u64 = |var: &str, default: &str| -> Result<u64, ConfigError> {
        or_default(var, default)
            .parse::<u64>()
            .map_err(|e| invalid(var, e))
    };

    let parse_usize = |var: &str, default: &str| -> Result<usize, ConfigError> {
        or_default(var, default)
            .parse::<usize>()
            .map_err(|e| invalid(var, e))
    };

    let database_url = require("DATABASE_URL")?;
    let env = parse_environment(&or_default("TRAVELMAP_ENV", "development"));

    let bind_addr = or_default("TRAVELMAP_BIND_ADDR", "0.0.0.0:8080")
        .parse::<SocketAddr>()
        .map_err(|e| invalid("TRAVELMAP_BIND_ADDR", e))?;
    let log_level = or_default("TRAVELMAP_LOG_LEVEL", "info");
    let channels_path = PathBuf::from(or_default(
        "TRAVELMAP_CHANNELS_PATH",
        "./config/channels.yaml",
    ));

    let youtube_api_key = lookup("YOUTUBE_API_KEY")
        .ok()
        .filter(|key| !key.trim().is_empty());
    let youtube_base_url = or_default(
        "YOUTUBE_BASE_URL",
        "https://www.googleapis.com/youtube/v3/",
    );

    let db_max_connections = parse_u32("TRAVELMAP_DB_MAX_CONNECTIONS", "10")?;
    let db_min_connections = parse_u32("TRAVELMAP_DB_MIN_CONNECTIONS", "1")?;
    let db_acquire_timeout_secs = parse_u64("TRAVELMAP_DB_ACQUIRE_TIMEOUT_SECS", "10")?;

    let youtube_timeout_secs = parse_u64("TRAVELMAP_YOUTUBE_TIMEOUT_SECS", "30")?;
    let youtube_max_retries = parse_u32("TRAVELMAP_YOUTUBE_MAX_RETRIES", "3")?;
    let youtube_backoff_base_ms = parse_u64("TRAVELMAP_YOUTUBE_BACKOFF_BASE_MS", "1000")?;

    let collect_video_limit = parse_u32("TRAVELMAP_COLLECT_VIDEO_LIMIT", "50")?;
    let update_video_limit = parse_u32("TRAVELMAP_UPDATE_VIDEO_LIMIT", "20")?;
    if collect_video_limit == 0 {
        return Err(invalid("TRAVELMAP_COLLECT_VIDEO_LIMIT", "must be at least 1"));
    }
    if update_video_limit == 0 {
        return Err(invalid("TRAVELMAP_UPDATE_VIDEO_LIMIT", "must be at least 1"));
    }

    let home_country = parse_country_code(&or_default("TRAVELMAP_HOME_COUNTRY", "KR"))
        .ok_or_else(|| invalid("TRAVELMAP_HOME_COUNTRY", "expected a two-letter country code"))?;

    let detection_queue_capacity = parse_usize("TRAVELMAP_DETECTION_QUEUE_CAPACITY", "256")?;
    if detection_queue_capacity == 0 {
        return Err(invalid(
            "TRAVELMAP_DETECTION_QUEUE_CAPACITY",
            "must be at least 1",
        ));
    }

    let schedule = ScheduleConfig {
        collect_all: or_default("TRAVELMAP_COLLECT_CRON", "0 0 2 * * *"),
        update_all: or_default("TRAVELMAP_UPDATE_CRON", "0 0 13 * * SUN"),
        process_unprocessed: or_default("TRAVELMAP_PROCESS_CRON", "0 0 * * * *"),
    };

    Ok(AppConfig {
        database_url,
        env,
        bind_addr,
        log_level,
        channels_path,
        youtube_api_key,
        youtube_base_url,
        db_max_connections,
        db_min_connections,
        db_acquire_timeout_secs,
        youtube_timeout_secs,
        youtube_max_retries,
        youtube_backoff_base_ms,
        collect_video_limit,
        update_video_limit,
        home_country,
        detection_queue_capacity,
        schedule,
    })
}

/// Parse a string into an `Environment` variant.
///
/// Unrecognized values default to `Environment::Development`.
fn parse_environment(s: &str) -> Environment {
    match s {
        "production" => Environment::Production,
        "test" => Environment::Test,
        _ => Environment::Development,
    }
}

/// Normalizes an ISO 3166-1 alpha-2 code to upper case, rejecting anything else.
fn parse_country_code(raw: &str) -> Option<String> {
    let code = raw.trim().to_ascii_uppercase();
    (code.len() == 2 && code.bytes().all(|b| b.is_ascii_uppercase())).then_some(code)
}

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;
