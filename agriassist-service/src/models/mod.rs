pub mod analysis;
pub mod market;
pub mod session;
pub mod weather;

pub use analysis::CropAnalysis;
pub use market::{market_prices, CropPrice, PriceTrend, PRICES_LAST_UPDATED};
pub use session::{Role, Turn};
pub use weather::{
    MockReason, WeatherReading, WeatherSnapshot, WeatherSource, MOCK_WEATHER_NOTE,
};
