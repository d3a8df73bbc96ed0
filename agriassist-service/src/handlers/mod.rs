//! HTTP handlers for the `/api` routes.

pub mod advice;
pub mod chat;
pub mod crop;
pub mod health;
pub mod market;
pub mod metrics;

use crate::services::{AdvisorError, ImageAnalysisError, StoreError};
use service_core::error::AppError;

pub use advice::{diagnose, farming_tips};
pub use chat::chat;
pub use crop::{analyze_crop, compare_crops};
pub use health::{health_check, readiness_check};
pub use market::market_prices;
pub use metrics::metrics;

impl From<AdvisorError> for AppError {
    fn from(err: AdvisorError) -> Self {
        AppError::InternalError(err.into())
    }
}

impl From<ImageAnalysisError> for AppError {
    fn from(err: ImageAnalysisError) -> Self {
        AppError::InternalError(err.into())
    }
}

impl From<StoreError> for AppError {
    fn from(err: StoreError) -> Self {
        AppError::InternalError(err.into())
    }
}
