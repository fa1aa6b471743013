pub mod health;
pub mod recommendations;
pub mod tracking;

pub use health::health_check;
pub use recommendations::recommendations_config;
pub use tracking::tracking_config;

use crate::error::ApiError;
use uuid::Uuid;

pub(crate) fn parse_user_id(raw: &str) -> Result<Uuid, ApiError> {
    raw.trim()
        .parse::<Uuid>()
        .map_err(|_| ApiError::InvalidInput("Invalid user ID format".to_string()))
}
