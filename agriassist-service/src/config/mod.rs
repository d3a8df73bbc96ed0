use secrecy::SecretString;
use service_core::config as core_config;
use service_core::error::AppError;
use std::env;
use std::str::FromStr;
use std::time::Duration;

const DEFAULT_GEMINI_MODEL: &str = "gemini-2.0-flash";
const DEFAULT_GEMINI_API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta";
const DEFAULT_WEATHER_API_URL: &str = "https://api.openweathermap.org/data/2.5/weather";

/// 16 MiB, enough for a full-resolution phone photo.
const DEFAULT_MAX_UPLOAD_BYTES: usize = 16 * 1024 * 1024;

#[derive(Debug, Clone)]
pub struct AgriConfig {
    pub common: core_config::Config,
    pub gemini: GeminiSettings,
    pub weather: WeatherSettings,
    pub sessions: SessionSettings,
    pub http: HttpSettings,
    pub otlp_endpoint: Option<String>,
}

#[derive(Debug, Clone)]
pub struct GeminiSettings {
    /// `None` leaves the service running; model calls then fail per request.
    pub api_key: Option<SecretString>,
    pub model: String,
    pub api_base: String,
    pub timeout: Duration,
}

#[derive(Debug, Clone)]
pub struct WeatherSettings {
    /// Without a key every lookup returns the mock reading.
    pub api_key: Option<SecretString>,
    pub api_url: String,
    pub timeout: Duration,
    /// Report `weather_source` to API consumers.
    pub surface_degraded: bool,
}

#[derive(Debug, Clone)]
pub struct SessionSettings {
    /// Redis-backed sessions when set, in-process otherwise.
    pub redis_url: Option<String>,
    pub ttl_seconds: u64,
}

#[derive(Debug, Clone)]
pub struct HttpSettings {
    pub max_upload_bytes: usize,
}

impl AgriConfig {
    pub fn load() -> Result<Self, AppError> {
        // Handles .env, the configuration file, APP__*, PORT and ENVIRONMENT
        let common_config = core_config::Config::load()?;
        let is_prod = common_config.environment.is_production();

        Ok(AgriConfig {
            common: common_config,
            gemini: GeminiSettings {
                api_key: get_secret("GEMINI_API_KEY", is_prod)?,
                model: get_env("GEMINI_MODEL", DEFAULT_GEMINI_MODEL),
                api_base: get_env("GEMINI_API_BASE", DEFAULT_GEMINI_API_BASE),
                timeout: Duration::from_secs(parse_env("GEMINI_TIMEOUT_SECS", 60)?),
            },
            weather: WeatherSettings {
                api_key: get_secret("WEATHER_API_KEY", false)?,
                api_url: get_env("WEATHER_API_URL", DEFAULT_WEATHER_API_URL),
                timeout: Duration::from_secs(parse_env("WEATHER_TIMEOUT_SECS", 5)?),
                surface_degraded: parse_env("WEATHER_SURFACE_DEGRADED", false)?,
            },
            sessions: SessionSettings {
                redis_url: non_empty_env("REDIS_URL"),
                ttl_seconds: parse_env("SESSION_TTL_SECS", 86_400)?,
            },
            http: HttpSettings {
                max_upload_bytes: parse_env("MAX_UPLOAD_BYTES", DEFAULT_MAX_UPLOAD_BYTES)?,
            },
            otlp_endpoint: non_empty_env("OTLP_ENDPOINT"),
        })
    }
}

fn non_empty_env(key: &str) -> Option<String> {
    env::var(key).ok().filter(|v| !v.trim().is_empty())
}

fn get_env(key: &str, default: &str) -> String {
    non_empty_env(key).unwrap_or_else(|| default.to_string())
}

fn get_secret(key: &str, required: bool) -> Result<Option<SecretString>, AppError> {
    match non_empty_env(key) {
        Some(val) => Ok(Some(SecretString::new(val))),
        None if required => Err(AppError::ConfigError(anyhow::anyhow!(
            "{} is required in production but not set",
            key
        ))),
        None => Ok(None),
    }
}

fn parse_env<T>(key: &str, default: T) -> Result<T, AppError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match non_empty_env(key) {
        Some(raw) => raw.trim().parse().map_err(|e: T::Err| {
            AppError::ConfigError(anyhow::anyhow!("{} has invalid value '{}': {}", key, raw, e))
        }),
        None => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_env_falls_back_to_default() {
        let value: u64 = parse_env("AGRIASSIST_TEST_UNSET_NUMBER", 42).unwrap();
        assert_eq!(value, 42);
    }

    #[test]
    fn get_secret_is_optional_outside_production() {
        assert!(get_secret("AGRIASSIST_TEST_UNSET_SECRET", false)
            .unwrap()
            .is_none());
        assert!(get_secret("AGRIASSIST_TEST_UNSET_SECRET", true).is_err());
    }
}
