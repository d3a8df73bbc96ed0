use crate::dtos::MarketPricesResponse;
use crate::models::{self, PRICES_LAST_UPDATED};
use axum::Json;

pub async fn market_prices() -> Json<MarketPricesResponse> {
    Json(MarketPricesResponse {
        success: true,
        prices: models::market_prices(),
        last_updated: PRICES_LAST_UPDATED,
    })
}
