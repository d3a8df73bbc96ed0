//! Crop photo analysis.

use crate::models::{CropAnalysis, WeatherReading};
use crate::services::advisor::{Advisor, AdvisorError, Language};
use crate::services::providers::Part;
use chrono::Utc;
use thiserror::Error;

const COMPARISON_PROMPT: &str = "\
Compare these two crop images and identify:
1. Changes in crop health
2. Disease progression or recovery
3. Growth differences
4. Recommendations based on the changes observed";

#[derive(Error, Debug)]
pub enum ImageFailure {
    #[error("{0}")]
    Decode(#[from] image::ImageError),

    #[error("Image decoding was interrupted: {0}")]
    Interrupted(#[from] tokio::task::JoinError),

    #[error(transparent)]
    Advisor(#[from] AdvisorError),
}

#[derive(Error, Debug)]
pub enum ImageAnalysisError {
    #[error("Image analysis failed: {0}")]
    Analysis(#[source] ImageFailure),

    #[error("Image comparison failed: {0}")]
    Comparison(#[source] ImageFailure),
}

/// Check that `bytes` is a readable image and tag it with its MIME type.
///
/// Decoding runs on the blocking pool; large photos take tens of
/// milliseconds.
pub async fn decode_image(bytes: Vec<u8>) -> Result<Part, ImageFailure> {
    tokio::task::spawn_blocking(move || -> Result<Part, ImageFailure> {
        let format = image::guess_format(&bytes)?;
        let decoded = image::load_from_memory_with_format(&bytes, format)?;
        tracing::debug!(
            format = ?format,
            width = decoded.width(),
            height = decoded.height(),
            "Decoded uploaded image"
        );
        Ok(Part::Image {
            mime_type: format.to_mime_type().to_string(),
            data: bytes,
        })
    })
    .await?
}

#[derive(Clone)]
pub struct ImageAnalyzer {
    advisor: Advisor,
}

impl ImageAnalyzer {
    pub fn new(advisor: Advisor) -> Self {
        Self { advisor }
    }

    pub async fn analyze_crop_disease(
        &self,
        image: Vec<u8>,
        location: &str,
        weather: Option<WeatherReading>,
        language: Language,
    ) -> Result<CropAnalysis, ImageAnalysisError> {
        let image = decode_image(image)
            .await
            .map_err(ImageAnalysisError::Analysis)?;

        let prompt = disease_prompt(location, weather.as_ref());
        let analysis = self
            .advisor
            .analyze(image, &prompt, language)
            .await
            .map_err(|e| ImageAnalysisError::Analysis(e.into()))?;

        Ok(CropAnalysis {
            analysis,
            location: location.to_string(),
            weather_context: weather,
            timestamp: Utc::now(),
        })
    }

    /// Before/after comparison of two photos; returns the model's raw text.
    pub async fn compare_crop_stages(
        &self,
        first: Vec<u8>,
        second: Vec<u8>,
    ) -> Result<String, ImageAnalysisError> {
        let (first, second) = tokio::try_join!(decode_image(first), decode_image(second))
            .map_err(ImageAnalysisError::Comparison)?;

        self.advisor
            .compare(COMPARISON_PROMPT, vec![first, second])
            .await
            .map_err(|e| ImageAnalysisError::Comparison(e.into()))
    }
}

fn disease_prompt(location: &str, weather: Option<&WeatherReading>) -> String {
    let weather_info = weather
        .map(|reading| {
            let w = reading.snapshot();
            format!(
                "\nCurrent weather in {location}:\n\
                 - Temperature: {}°C\n\
                 - Conditions: {}\n\
                 - Humidity: {}%\n",
                w.temperature, w.description, w.humidity
            )
        })
        .unwrap_or_default();

    format!(
        "Analyze this crop image for diseases, pests, and health issues.

Context:
- Location: {location}
{weather_info}
Please provide:

1. **Crop Identification**: What crop is this?

2. **Health Assessment**: Overall health status (Healthy/Mild Issues/Severe Issues)

3. **Disease/Pest Detection**:
   - Name of disease or pest (if any)
   - Confidence level (High/Medium/Low)
   - Visible symptoms

4. **Detailed Diagnosis**:
   - What's causing the problem?
   - How serious is it?
   - Will it spread?

5. **Treatment Recommendations**:
   - Immediate actions to take
   - Organic/natural solutions
   - Chemical treatments (with specific product names available in Kenya and approximate costs)
   - Application methods

6. **Prevention**:
   - How to prevent this in the future
   - Best practices for this crop

7. **Timeline**: Expected recovery time with treatment

Use simple language suitable for farmers. Be specific and actionable.
If you're uncertain, say so and suggest consulting a local agricultural officer."
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::MockReason;
    use crate::services::providers::mock::MockProvider;
    use image::{DynamicImage, ImageFormat, RgbImage};
    use std::io::Cursor;
    use std::sync::Arc;

    fn png_bytes() -> Vec<u8> {
        let mut bytes = Vec::new();
        DynamicImage::ImageRgb8(RgbImage::new(4, 4))
            .write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png)
            .unwrap();
        bytes
    }

    fn analyzer(provider: Arc<MockProvider>) -> ImageAnalyzer {
        ImageAnalyzer::new(Advisor::new(provider))
    }

    #[test]
    fn prompt_includes_weather_context() {
        let reading = WeatherReading::mock(MockReason::Unconfigured);
        let prompt = disease_prompt("Nakuru", Some(&reading));
        assert!(prompt.contains("- Location: Nakuru"));
        assert!(prompt.contains("Current weather in Nakuru:"));
        assert!(prompt.contains("- Temperature: 25°C"));
        assert!(prompt.contains("- Humidity: 65%"));
        assert!(prompt.contains("7. **Timeline**"));

        assert!(!disease_prompt("Nakuru", None).contains("Current weather"));
    }

    #[tokio::test]
    async fn analysis_wraps_model_text_with_context() {
        let provider = Arc::new(MockProvider::with_replies(["Healthy maize."]));
        let reading = WeatherReading::mock(MockReason::Unconfigured);

        let result = analyzer(provider.clone())
            .analyze_crop_disease(png_bytes(), "Kisumu", Some(reading.clone()), Language::Swahili)
            .await
            .unwrap();

        assert_eq!(result.analysis, "Healthy maize.");
        assert_eq!(result.location, "Kisumu");
        assert_eq!(result.weather_context, Some(reading));

        let requests = provider.requests();
        let request = &requests[0];
        let parts = &request.contents[0].parts;
        assert!(matches!(&parts[0], Part::Text(t) if t.starts_with("Respond in Swahili (Kiswahili). ")));
        assert!(matches!(&parts[1], Part::Image { mime_type, .. } if mime_type == "image/png"));
    }

    #[tokio::test]
    async fn undecodable_image_never_reaches_the_model() {
        let provider = Arc::new(MockProvider::new());

        let err = analyzer(provider.clone())
            .analyze_crop_disease(b"not an image".to_vec(), "Kenya", None, Language::English)
            .await
            .unwrap_err();

        assert!(err.to_string().starts_with("Image analysis failed: "));
        assert_eq!(provider.call_count(), 0);
    }

    #[tokio::test]
    async fn comparison_sends_both_images() {
        let provider = Arc::new(MockProvider::with_replies(["Recovering well."]));

        let text = analyzer(provider.clone())
            .compare_crop_stages(png_bytes(), png_bytes())
            .await
            .unwrap();

        assert_eq!(text, "Recovering well.");
        let requests = provider.requests();
        let parts = &requests[0].contents[0].parts;
        assert_eq!(parts.len(), 3);
        assert!(matches!(&parts[0], Part::Text(t) if t.starts_with("Compare these two crop images")));
    }

    #[tokio::test]
    async fn comparison_failure_names_the_operation_once() {
        let provider = Arc::new(MockProvider::failing("boom"));

        let err = analyzer(provider)
            .compare_crop_stages(png_bytes(), png_bytes())
            .await
            .unwrap_err();

        assert_eq!(err.to_string(), "Image comparison failed: API error: boom");
    }
}
