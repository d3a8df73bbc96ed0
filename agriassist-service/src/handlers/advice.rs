use crate::dtos::{DiagnoseRequest, DiagnoseResponse, TipsQuery, TipsResponse};
use crate::services::Language;
use crate::startup::AppState;
use axum::{
    extract::{rejection::JsonRejection, Query, State},
    Json,
};
use service_core::error::AppError;

pub async fn farming_tips(
    State(state): State<AppState>,
    Query(query): Query<TipsQuery>,
) -> Result<Json<TipsResponse>, AppError> {
    let language = Language::from_code(&query.language);
    let tips = state
        .advisor
        .get_tips(&query.crop, &query.season, language)
        .await?
        .into_tips();

    Ok(Json(TipsResponse {
        success: true,
        tips,
        crop: query.crop,
        season: query.season,
    }))
}

pub async fn diagnose(
    State(state): State<AppState>,
    payload: Result<Json<DiagnoseRequest>, JsonRejection>,
) -> Result<Json<DiagnoseResponse>, AppError> {
    let Json(request) = payload.map_err(|rejection| AppError::bad_request(rejection.body_text()))?;

    let symptoms = required(request.symptoms, "No symptoms provided")?;
    let crop = required(request.crop, "No crop provided")?;

    let diagnosis = state
        .advisor
        .diagnose_structured(&symptoms, &crop)
        .await?
        .into_diagnosis();

    Ok(Json(DiagnoseResponse {
        success: true,
        diagnosis,
        crop,
    }))
}

fn required(value: Option<String>, message: &'static str) -> Result<String, AppError> {
    value
        .filter(|v| !v.trim().is_empty())
        .ok_or_else(|| AppError::bad_request(message))
}
