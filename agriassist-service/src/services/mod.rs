pub mod advisor;
pub mod image_analyzer;
pub mod metrics;
pub mod providers;
pub mod session_store;
pub mod weather;

pub use advisor::{Advisor, AdvisorError, Language, ModelReply};
pub use image_analyzer::{ImageAnalysisError, ImageAnalyzer};
pub use metrics::{get_metrics, init_metrics};
pub use session_store::{InMemorySessionStore, RedisSessionStore, SessionStore, StoreError};
pub use weather::WeatherService;
