use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use thiserror::Error;

/// Failures of a weather lookup, as seen by the client.
///
/// The `Display` text is the client-facing message; upstream detail carried by
/// [`WeatherError::Upstream`] is only logged.
#[derive(Debug, Error)]
pub enum WeatherError {
    #[error("Lat/lon or city name required")]
    MissingLocation,
    #[error("Server configuration error")]
    MissingApiKey,
    #[error("Server authentication error")]
    UpstreamAuth,
    #[error("City not found")]
    NotFound,
    #[error("Request timeout")]
    Timeout,
    #[error("Failed to fetch weather data")]
    Upstream(String),
}

impl WeatherError {
    pub fn status(&self) -> StatusCode {
        match self {
            Self::MissingLocation => StatusCode::BAD_REQUEST,
            Self::NotFound => StatusCode::NOT_FOUND,
            Self::Timeout => StatusCode::REQUEST_TIMEOUT,
            Self::MissingApiKey | Self::UpstreamAuth | Self::Upstream(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl IntoResponse for WeatherError {
    fn into_response(self) -> Response {
        (self.status(), Json(json!({ "error": self.to_string() }))).into_response()
    }
}
