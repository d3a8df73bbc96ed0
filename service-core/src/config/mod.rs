use crate::error::AppError;
use config::{Config as Cfg, File};
use serde::Deserialize;
use std::env;

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default)]
    pub environment: Environment,
}

/// Only production is strict; any other name (`staging`, `local`, ...)
/// runs with development defaults.
#[derive(Debug, Deserialize, Clone, Copy, Default, PartialEq, Eq)]
#[serde(from = "String")]
pub enum Environment {
    #[default]
    Development,
    Production,
}

impl From<String> for Environment {
    fn from(name: String) -> Self {
        match name.trim().to_ascii_lowercase().as_str() {
            "production" | "prod" => Environment::Production,
            _ => Environment::Development,
        }
    }
}

impl Environment {
    pub fn is_production(self) -> bool {
        self == Environment::Production
    }

    /// Default log filter when `RUST_LOG` is not set.
    pub fn log_level(self) -> &'static str {
        match self {
            Environment::Development => "debug",
            Environment::Production => "info",
        }
    }
}

fn default_port() -> u16 {
    5000
}

impl Config {
    /// Load `.env`, an optional `configuration` file and `APP__*` variables.
    ///
    /// The bare `PORT` and `ENVIRONMENT` variables take precedence so the
    /// service runs unchanged on hosts that only inject those.
    pub fn load() -> Result<Self, AppError> {
        dotenvy::dotenv().ok();

        let config = Cfg::builder()
            .add_source(File::with_name("configuration").required(false))
            .add_source(config::Environment::with_prefix("APP").separator("__"))
            .set_override_option("port", env::var("PORT").ok())?
            .set_override_option("environment", env::var("ENVIRONMENT").ok())?
            .build()?;

        Ok(config.try_deserialize()?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn environment_accepts_short_names() {
        let env: Environment = serde_json::from_str("\"prod\"").unwrap();
        assert_eq!(env, Environment::Production);
        let env: Environment = serde_json::from_str("\"development\"").unwrap();
        assert_eq!(env, Environment::Development);
    }

    #[test]
    fn unknown_environment_names_are_not_production() {
        for name in ["staging", "test", "local", ""] {
            let env: Environment = serde_json::from_value(serde_json::json!(name)).unwrap();
            assert_eq!(env, Environment::Development, "name: {}", name);
        }
        let env: Environment = serde_json::from_str("\"PRODUCTION\"").unwrap();
        assert!(env.is_production());
    }

    #[test]
    fn layered_sources_accept_unknown_environment() {
        let config: Config = Cfg::builder()
            .set_override("environment", "staging")
            .unwrap()
            .set_override("port", "8080")
            .unwrap()
            .build()
            .unwrap()
            .try_deserialize()
            .unwrap();

        assert_eq!(config.environment, Environment::Development);
        assert_eq!(config.port, 8080);
    }

    #[test]
    fn log_level_follows_environment() {
        assert_eq!(Environment::Development.log_level(), "debug");
        assert_eq!(Environment::Production.log_level(), "info");
        assert!(!Environment::default().is_production());
    }
}
