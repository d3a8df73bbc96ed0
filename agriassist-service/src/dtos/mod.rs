//! Request and response bodies of the HTTP API.

use crate::models::{CropAnalysis, CropPrice, WeatherReading, WeatherSource};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;

pub const DEFAULT_SESSION_ID: &str = "default";
pub const DEFAULT_LOCATION: &str = "Kenya";
pub const DEFAULT_LANGUAGE: &str = "en";

#[derive(Debug, Deserialize)]
pub struct ChatRequest {
    pub message: Option<String>,
    pub session_id: Option<String>,
    pub language: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ChatResponse {
    pub success: bool,
    pub response: String,
    pub session_id: String,
}

#[derive(Debug, Deserialize)]
pub struct TipsQuery {
    #[serde(default = "default_crop")]
    pub crop: String,
    #[serde(default = "default_season")]
    pub season: String,
    #[serde(default = "default_language")]
    pub language: String,
}

fn default_crop() -> String {
    "maize".to_string()
}

fn default_season() -> String {
    "current".to_string()
}

fn default_language() -> String {
    DEFAULT_LANGUAGE.to_string()
}

#[derive(Debug, Serialize)]
pub struct TipsResponse {
    pub success: bool,
    pub tips: Map<String, Value>,
    pub crop: String,
    pub season: String,
}

#[derive(Debug, Serialize)]
pub struct MarketPricesResponse {
    pub success: bool,
    pub prices: BTreeMap<&'static str, CropPrice>,
    pub last_updated: &'static str,
}

#[derive(Debug, Serialize)]
pub struct AnalyzeCropResponse {
    pub success: bool,
    pub analysis: CropAnalysis,
    pub weather: Option<WeatherReading>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub weather_source: Option<WeatherSource>,
}

#[derive(Debug, Deserialize)]
pub struct DiagnoseRequest {
    pub symptoms: Option<String>,
    pub crop: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct DiagnoseResponse {
    pub success: bool,
    pub diagnosis: Map<String, Value>,
    pub crop: String,
}

#[derive(Debug, Serialize)]
pub struct CompareCropsResponse {
    pub success: bool,
    pub comparison: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tips_query_defaults() {
        let query: TipsQuery = serde_json::from_str("{}").unwrap();
        assert_eq!(query.crop, "maize");
        assert_eq!(query.season, "current");
        assert_eq!(query.language, "en");
    }

    #[test]
    fn weather_source_is_omitted_unless_set() {
        let response = AnalyzeCropResponse {
            success: true,
            analysis: CropAnalysis {
                analysis: "ok".to_string(),
                location: String::new(),
                weather_context: None,
                timestamp: chrono::Utc::now(),
            },
            weather: None,
            weather_source: None,
        };

        let body = serde_json::to_value(&response).unwrap();
        assert!(body["weather"].is_null());
        assert!(body.get("weather_source").is_none());
    }
}
