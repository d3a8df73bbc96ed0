use super::weather::WeatherReading;
use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Serialize, Serializer};

/// Model output for a crop photo, with the context it was produced under.
#[derive(Debug, Clone, Serialize)]
pub struct CropAnalysis {
    pub analysis: String,
    pub location: String,
    pub weather_context: Option<WeatherReading>,
    #[serde(serialize_with = "iso8601")]
    pub timestamp: DateTime<Utc>,
}

fn iso8601<S: Serializer>(ts: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(&ts.to_rfc3339_opts(SecondsFormat::Micros, true))
}
