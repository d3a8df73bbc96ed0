//! Static market price table.
//!
//! Placeholder figures until a market data feed is wired in.

use serde::Serialize;
use std::collections::BTreeMap;

pub const PRICES_LAST_UPDATED: &str = "2025-11-22";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PriceTrend {
    Rising,
    Stable,
    Falling,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CropPrice {
    pub price: u32,
    pub unit: &'static str,
    pub trend: PriceTrend,
}

const BAG: &str = "KES/90kg bag";
const KG: &str = "KES/kg";

pub fn market_prices() -> BTreeMap<&'static str, CropPrice> {
    [
        ("maize", 3500, BAG, PriceTrend::Stable),
        ("beans", 12000, BAG, PriceTrend::Rising),
        ("tomatoes", 80, KG, PriceTrend::Falling),
        ("potatoes", 60, KG, PriceTrend::Stable),
    ]
    .into_iter()
    .map(|(crop, price, unit, trend)| (crop, CropPrice { price, unit, trend }))
    .collect()
}
