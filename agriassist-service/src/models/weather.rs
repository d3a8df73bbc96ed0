//! Weather readings used as context for crop analysis.

use serde::{Serialize, Serializer};

pub const MOCK_WEATHER_NOTE: &str = "Mock data - configure WEATHER_API_KEY for live data";

/// Current conditions at a location, metric units.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WeatherSnapshot {
    /// Degrees Celsius.
    pub temperature: f64,
    /// Relative humidity, percent.
    pub humidity: f64,
    pub description: String,
    /// Metres per second.
    pub wind_speed: f64,
}

impl WeatherSnapshot {
    /// The static reading served when live data is unavailable.
    pub fn mock() -> Self {
        Self {
            temperature: 25.0,
            humidity: 65.0,
            description: "Partly cloudy".to_string(),
            wind_speed: 3.5,
        }
    }
}

/// Why a mock reading was served instead of live data.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MockReason {
    /// No provider credential configured.
    Unconfigured,
    /// The provider call failed (timeout, non-2xx, malformed body).
    ProviderFailure,
}

#[derive(Debug, Clone, PartialEq)]
pub enum WeatherReading {
    Live(WeatherSnapshot),
    Mock {
        snapshot: WeatherSnapshot,
        reason: MockReason,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum WeatherSource {
    Live,
    Mock,
}

impl WeatherReading {
    pub fn mock(reason: MockReason) -> Self {
        WeatherReading::Mock {
            snapshot: WeatherSnapshot::mock(),
            reason,
        }
    }

    pub fn snapshot(&self) -> &WeatherSnapshot {
        match self {
            WeatherReading::Live(snapshot) => snapshot,
            WeatherReading::Mock { snapshot, .. } => snapshot,
        }
    }

    pub fn source(&self) -> WeatherSource {
        match self {
            WeatherReading::Live(_) => WeatherSource::Live,
            WeatherReading::Mock { .. } => WeatherSource::Mock,
        }
    }

    pub fn is_mock(&self) -> bool {
        self.source() == WeatherSource::Mock
    }
}

/// Wire shape: the flat snapshot, plus `note` on mock readings.
impl Serialize for WeatherReading {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        #[derive(Serialize)]
        struct Wire<'a> {
            #[serde(flatten)]
            snapshot: &'a WeatherSnapshot,
            #[serde(skip_serializing_if = "Option::is_none")]
            note: Option<&'static str>,
        }

        let note = self.is_mock().then_some(MOCK_WEATHER_NOTE);
        Wire {
            snapshot: self.snapshot(),
            note,
        }
        .serialize(serializer)
    }
}
