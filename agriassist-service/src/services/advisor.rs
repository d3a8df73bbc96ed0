//! Agricultural advisor on top of a generative model.
//!
//! Owns the fixed advisor persona, the language directives and the
//! best-effort JSON handling for the structured endpoints.

use crate::models::Turn;
use crate::services::providers::{
    Content, GenerateRequest, GenerationParams, GenerativeProvider, Part, ProviderError,
};
use metrics::counter;
use serde_json::{json, Map, Value};
use std::sync::Arc;
use std::time::Instant;
use thiserror::Error;

const SYSTEM_INSTRUCTION: &str = "\
You are AgriAssist AI, an expert agricultural advisor specifically designed for East African farmers,
with deep knowledge of Kenyan agriculture.

Your expertise includes:
- Common crops: Maize, beans, tea, coffee, potatoes, tomatoes, kale (sukuma wiki)
- Local diseases and pests
- Climate considerations for different regions (coastal, highlands, arid areas)
- Sustainable and affordable farming practices
- Organic solutions when possible

Guidelines:
- Use simple, clear language that farmers can understand
- Provide actionable, practical advice
- Consider cost-effectiveness (many farmers have limited resources)
- Suggest both modern and traditional solutions
- Be encouraging and supportive
- When diagnosing diseases, provide: symptoms, causes, treatment, prevention
- Include approximate costs in Kenyan Shillings when suggesting inputs";

#[derive(Error, Debug)]
pub enum AdvisorError {
    #[error("Gemini image analysis failed: {0}")]
    Analysis(#[source] ProviderError),

    #[error("Gemini chat failed: {0}")]
    Chat(#[source] ProviderError),

    #[error("Failed to get farming tips: {0}")]
    Tips(#[source] ProviderError),

    #[error("Disease diagnosis failed: {0}")]
    Diagnosis(#[source] ProviderError),

    /// Only ever surfaced through `ImageAnalysisError::Comparison`, which
    /// supplies the context.
    #[error(transparent)]
    Comparison(ProviderError),
}

/// Response language requested by the farmer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Language {
    #[default]
    English,
    Swahili,
}

impl Language {
    /// Unknown codes fall back to English.
    pub fn from_code(code: &str) -> Self {
        match code.trim().to_ascii_lowercase().as_str() {
            "sw" | "swa" | "swahili" | "kiswahili" => Language::Swahili,
            "en" | "eng" | "english" | "" => Language::English,
            other => {
                tracing::debug!(language = %other, "Unsupported language code, using English");
                Language::English
            }
        }
    }

    pub fn is_default(self) -> bool {
        self == Language::English
    }
}

/// A model answer to a request for JSON.
#[derive(Debug, Clone, PartialEq)]
pub enum ModelReply {
    /// The answer parsed as a JSON object.
    Structured(Map<String, Value>),
    /// Anything else, kept verbatim.
    Unstructured(String),
}

impl ModelReply {
    /// Accepts a JSON object, optionally wrapped in a Markdown code fence.
    pub fn parse(text: &str) -> Self {
        match serde_json::from_str::<Value>(strip_code_fence(text)) {
            Ok(Value::Object(map)) => ModelReply::Structured(map),
            _ => ModelReply::Unstructured(text.to_string()),
        }
    }

    /// Collapse into a mapping, building the fallback from the raw text.
    pub fn into_mapping<F>(self, fallback: F) -> Map<String, Value>
    where
        F: FnOnce(String) -> Map<String, Value>,
    {
        match self {
            ModelReply::Structured(map) => map,
            ModelReply::Unstructured(text) => fallback(text),
        }
    }

    /// Tips mapping; unparsed replies become `{tips: text}`.
    pub fn into_tips(self) -> Map<String, Value> {
        self.into_mapping(|text| object(json!({ "tips": text })))
    }

    /// Diagnosis mapping; unparsed replies become
    /// `{disease_name: "Unknown", diagnosis: text}`.
    pub fn into_diagnosis(self) -> Map<String, Value> {
        self.into_mapping(|text| {
            object(json!({ "disease_name": "Unknown", "diagnosis": text }))
        })
    }
}

fn object(value: Value) -> Map<String, Value> {
    match value {
        Value::Object(map) => map,
        _ => Map::new(),
    }
}

fn strip_code_fence(text: &str) -> &str {
    let trimmed = text.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    // Drop the info string (`json`) up to the first newline.
    let body = rest.split_once('\n').map_or("", |(_, body)| body);
    body.trim_end().strip_suffix("```").unwrap_or(body).trim()
}

/// Client for the advisor persona.
#[derive(Clone)]
pub struct Advisor {
    provider: Arc<dyn GenerativeProvider>,
}

impl Advisor {
    pub fn new(provider: Arc<dyn GenerativeProvider>) -> Self {
        Self { provider }
    }

    pub fn provider(&self) -> &Arc<dyn GenerativeProvider> {
        &self.provider
    }

    /// Ask about an image; returns the model's raw text.
    pub async fn analyze(
        &self,
        image: Part,
        prompt: &str,
        language: Language,
    ) -> Result<String, AdvisorError> {
        let directive = if language.is_default() {
            ""
        } else {
            "Respond in Swahili (Kiswahili). "
        };
        let contents = vec![Content::user(vec![
            Part::Text(format!("{}{}", directive, prompt)),
            image,
        ])];

        self.send("analyze", contents, GenerationParams::default())
            .await
            .map_err(AdvisorError::Analysis)
    }

    /// Continue a conversation. `history` is read, never modified.
    pub async fn chat(
        &self,
        message: &str,
        history: &[Turn],
        language: Language,
    ) -> Result<String, AdvisorError> {
        let message = if language.is_default() {
            message.to_string()
        } else {
            format!("[Respond in Swahili] {}", message)
        };

        let mut contents: Vec<Content> = history.iter().map(Content::from).collect();
        contents.push(Content::user_text(message));

        self.send("chat", contents, GenerationParams::default())
            .await
            .map_err(AdvisorError::Chat)
    }

    pub async fn get_tips(
        &self,
        crop: &str,
        season: &str,
        language: Language,
    ) -> Result<ModelReply, AdvisorError> {
        let mut prompt = format!(
            "Provide comprehensive farming tips for {crop} during the {season} season in Kenya.

Include:
1. Best planting practices
2. Watering schedule
3. Common challenges this season
4. Fertilizer recommendations (with costs)
5. Expected harvest timeline

Format as JSON with keys: planting, watering, challenges, fertilizer, harvest"
        );
        if !language.is_default() {
            prompt.push_str("\nProvide all text in Swahili.");
        }

        let text = self
            .send("tips", vec![Content::user_text(prompt)], json_params())
            .await
            .map_err(AdvisorError::Tips)?;
        Ok(ModelReply::parse(&text))
    }

    pub async fn diagnose_structured(
        &self,
        symptoms: &str,
        crop: &str,
    ) -> Result<ModelReply, AdvisorError> {
        let prompt = format!(
            r#"Diagnose the disease affecting {crop} with these symptoms: {symptoms}

Provide a structured response in JSON format:
{{
    "disease_name": "string",
    "confidence": "high/medium/low",
    "symptoms": ["list", "of", "symptoms"],
    "causes": ["list", "of", "causes"],
    "treatment": {{
        "immediate": "string",
        "organic": "string",
        "chemical": "string (with product names and costs in KES)"
    }},
    "prevention": ["list", "of", "preventive", "measures"],
    "severity": "mild/moderate/severe"
}}"#
        );

        let text = self
            .send("diagnose", vec![Content::user_text(prompt)], json_params())
            .await
            .map_err(AdvisorError::Diagnosis)?;
        Ok(ModelReply::parse(&text))
    }

    /// Send a prompt followed by several images; returns raw text.
    pub async fn compare(&self, prompt: &str, images: Vec<Part>) -> Result<String, AdvisorError> {
        let mut parts = vec![Part::Text(prompt.to_string())];
        parts.extend(images);

        self.send("compare", vec![Content::user(parts)], GenerationParams::default())
            .await
            .map_err(AdvisorError::Comparison)
    }

    async fn send(
        &self,
        operation: &'static str,
        contents: Vec<Content>,
        params: GenerationParams,
    ) -> Result<String, ProviderError> {
        let request = GenerateRequest {
            system_instruction: Some(SYSTEM_INSTRUCTION.to_string()),
            contents,
            params,
        };

        let provider = self.provider.name();
        let start = Instant::now();
        let result = self.provider.generate(&request).await;
        let elapsed = start.elapsed();

        match result {
            Ok(response) => {
                counter!("genai_requests_total", "operation" => operation, "status" => "ok")
                    .increment(1);
                counter!("genai_tokens_total", "direction" => "input")
                    .increment(response.input_tokens);
                counter!("genai_tokens_total", "direction" => "output")
                    .increment(response.output_tokens);
                tracing::debug!(
                    provider,
                    operation,
                    elapsed_ms = elapsed.as_millis() as u64,
                    "Model call completed"
                );
                Ok(response.text)
            }
            Err(e) => {
                counter!("genai_requests_total", "operation" => operation, "status" => "error")
                    .increment(1);
                tracing::warn!(provider, operation, error = %e, "Model call failed");
                Err(e)
            }
        }
    }
}

fn json_params() -> GenerationParams {
    GenerationParams { json_output: true }
}
