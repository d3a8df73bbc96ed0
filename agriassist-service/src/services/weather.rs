//! Current-weather lookup against the OpenWeather API.
//!
//! Lookups never fail: without a key, or on any provider problem, the
//! static mock reading is served instead.

use crate::config::WeatherSettings;
use crate::models::{MockReason, WeatherReading, WeatherSnapshot};
use metrics::counter;
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use thiserror::Error;

#[derive(Error, Debug)]
enum LookupError {
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("response has no weather conditions")]
    MissingConditions,
}

#[derive(Clone)]
pub struct WeatherService {
    client: Client,
    api_key: Option<SecretString>,
    api_url: String,
}

impl WeatherService {
    pub fn new(settings: &WeatherSettings) -> Result<Self, reqwest::Error> {
        let client = Client::builder().timeout(settings.timeout).build()?;

        Ok(Self {
            client,
            api_key: settings.api_key.clone(),
            api_url: settings.api_url.clone(),
        })
    }

    pub fn is_configured(&self) -> bool {
        self.api_key.is_some()
    }

    pub async fn get_weather(&self, location: &str) -> WeatherReading {
        let reading = self.lookup(location).await;
        counter!("weather_lookups_total", "outcome" => lookup_outcome(&reading)).increment(1);
        reading
    }

    async fn lookup(&self, location: &str) -> WeatherReading {
        let Some(api_key) = &self.api_key else {
            return WeatherReading::mock(MockReason::Unconfigured);
        };

        match self.fetch(location, api_key).await {
            Ok(snapshot) => WeatherReading::Live(snapshot),
            Err(e) => {
                tracing::warn!(
                    location = %location,
                    error = %e,
                    "Weather API error, serving mock reading"
                );
                WeatherReading::mock(MockReason::ProviderFailure)
            }
        }
    }

    async fn fetch(
        &self,
        location: &str,
        api_key: &SecretString,
    ) -> Result<WeatherSnapshot, LookupError> {
        tracing::debug!(location = %location, "Fetching current weather");

        let response: CurrentWeather = self
            .client
            .get(&self.api_url)
            .query(&[
                ("q", location),
                ("appid", api_key.expose_secret().as_str()),
                ("units", "metric"),
            ])
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        response.into_snapshot()
    }
}

/// Label for `weather_lookups_total`.
fn lookup_outcome(reading: &WeatherReading) -> &'static str {
    match reading {
        WeatherReading::Live(_) => "live",
        WeatherReading::Mock {
            reason: MockReason::Unconfigured,
            ..
        } => "unconfigured",
        WeatherReading::Mock {
            reason: MockReason::ProviderFailure,
            ..
        } => "provider_failure",
    }
}

#[derive(Debug, Deserialize)]
struct CurrentWeather {
    main: MainReadings,
    weather: Vec<Condition>,
    wind: Wind,
}

#[derive(Debug, Deserialize)]
struct MainReadings {
    temp: f64,
    humidity: f64,
}

#[derive(Debug, Deserialize)]
struct Condition {
    description: String,
}

#[derive(Debug, Deserialize)]
struct Wind {
    speed: f64,
}

impl CurrentWeather {
    fn into_snapshot(self) -> Result<WeatherSnapshot, LookupError> {
        let description = self
            .weather
            .into_iter()
            .next()
            .ok_or(LookupError::MissingConditions)?
            .description;

        Ok(WeatherSnapshot {
            temperature: self.main.temp,
            humidity: self.main.humidity,
            description,
            wind_speed: self.wind.speed,
        })
    }
}
