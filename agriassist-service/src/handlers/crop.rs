use crate::dtos::{AnalyzeCropResponse, CompareCropsResponse, DEFAULT_LOCATION};
use crate::services::Language;
use crate::startup::AppState;
use axum::{
    extract::{multipart::MultipartRejection, Multipart, State},
    Json,
};
use service_core::error::AppError;
use std::collections::HashMap;

const NO_IMAGE: &str = "No image provided";

/// All parts of a multipart form, read up front so validation happens
/// before any upstream call. File uploads and plain fields are kept apart.
#[derive(Debug, Default)]
struct UploadForm {
    files: HashMap<String, Vec<u8>>,
    fields: HashMap<String, Vec<u8>>,
}

impl UploadForm {
    async fn read(mut multipart: Multipart) -> Result<Self, AppError> {
        let mut form = Self::default();

        while let Some(field) = multipart
            .next_field()
            .await
            .map_err(|e| AppError::bad_request(e.body_text()))?
        {
            let Some(name) = field.name().map(str::to_string) else {
                continue;
            };
            let is_file = field.file_name().is_some();
            let data = field
                .bytes()
                .await
                .map_err(|e| AppError::bad_request(e.body_text()))?;
            let parts = if is_file {
                &mut form.files
            } else {
                &mut form.fields
            };
            // First occurrence wins.
            parts.entry(name).or_insert_with(|| data.to_vec());
        }

        Ok(form)
    }

    /// Non-empty contents of the file uploaded as `name`.
    fn take_file(&mut self, name: &str) -> Option<Vec<u8>> {
        self.files.remove(name).filter(|data| !data.is_empty())
    }

    fn text(&self, name: &str) -> Option<String> {
        self.fields
            .get(name)
            .map(|data| String::from_utf8_lossy(data).trim().to_string())
    }
}

pub async fn analyze_crop(
    State(state): State<AppState>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Json<AnalyzeCropResponse>, AppError> {
    let multipart = multipart.map_err(|_| AppError::bad_request(NO_IMAGE))?;
    let mut form = UploadForm::read(multipart).await?;

    let image = form
        .take_file("image")
        .ok_or_else(|| AppError::bad_request(NO_IMAGE))?;
    let location = form
        .text("location")
        .unwrap_or_else(|| DEFAULT_LOCATION.to_string());
    let language = Language::from_code(&form.text("language").unwrap_or_default());

    let weather = if location.is_empty() {
        None
    } else {
        Some(state.weather.get_weather(&location).await)
    };

    tracing::info!(
        location = %location,
        image_bytes = image.len(),
        weather = ?weather.as_ref().map(|w| w.source()),
        "Analyzing crop image"
    );

    let analysis = state
        .image_analyzer
        .analyze_crop_disease(image, &location, weather.clone(), language)
        .await?;

    let weather_source = if state.config.weather.surface_degraded {
        weather.as_ref().map(|w| w.source())
    } else {
        None
    };

    Ok(Json(AnalyzeCropResponse {
        success: true,
        analysis,
        weather,
        weather_source,
    }))
}

pub async fn compare_crops(
    State(state): State<AppState>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Json<CompareCropsResponse>, AppError> {
    const MISSING: &str = "Both image1 and image2 are required";

    let multipart = multipart.map_err(|_| AppError::bad_request(MISSING))?;
    let mut form = UploadForm::read(multipart).await?;

    let (Some(first), Some(second)) = (form.take_file("image1"), form.take_file("image2")) else {
        return Err(AppError::bad_request(MISSING));
    };

    let comparison = state
        .image_analyzer
        .compare_crop_stages(first, second)
        .await?;

    Ok(Json(CompareCropsResponse {
        success: true,
        comparison,
    }))
}
