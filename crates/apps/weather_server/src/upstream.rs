use std::time::Duration;

use reqwest::StatusCode;
use serde::Deserialize;
use tracing::{debug, error};

use crate::error::WeatherError;

/// Caller-supplied location. Either field may be blank.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct WeatherQuery {
    pub lat: Option<String>,
    pub lon: Option<String>,
    pub city: Option<String>,
}

/// Validated lookup key. A city wins over coordinates when both are given.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Location {
    City(String),
    Coords { lat: String, lon: String },
}

fn present(v: &Option<String>) -> Option<&str> {
    v.as_deref().filter(|s| !s.is_empty())
}

impl WeatherQuery {
    pub fn location(&self) -> Result<Location, WeatherError> {
        if let Some(city) = present(&self.city) {
            return Ok(Location::City(city.to_string()));
        }
        match (present(&self.lat), present(&self.lon)) {
            (Some(lat), Some(lon)) => Ok(Location::Coords {
                lat: lat.to_string(),
                lon: lon.to_string(),
            }),
            _ => Err(WeatherError::MissingLocation),
        }
    }
}

/// Current-conditions client for an OpenWeatherMap-compatible service.
#[derive(Debug, Clone)]
pub struct WeatherClient {
    http: reqwest::Client,
    base_url: String,
    timeout: Duration,
}

impl WeatherClient {
    pub fn new(http: reqwest::Client, base_url: impl Into<String>, timeout: Duration) -> Self {
        Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            timeout,
        }
    }

    pub fn endpoint(&self) -> String {
        format!("{}/data/2.5/weather", self.base_url)
    }

    /// Fetches the upstream payload unchanged. Coordinates are forwarded verbatim.
    pub async fn current(
        &self,
        location: &Location,
        api_key: &str,
    ) -> Result<serde_json::Value, WeatherError> {
        let mut query: Vec<(&str, &str)> = match location {
            Location::City(city) => vec![("q", city.as_str())],
            Location::Coords { lat, lon } => vec![("lat", lat.as_str()), ("lon", lon.as_str())],
        };
        query.push(("appid", api_key));

        let resp = self
            .http
            .get(self.endpoint())
            .query(&query)
            .timeout(self.timeout)
            .send()
            .await
            .map_err(map_transport_error)?;

        let status = resp.status();
        if !status.is_success() {
            error!(%status, ?location, "weather upstream rejected request");
            return Err(match status {
                StatusCode::UNAUTHORIZED => WeatherError::UpstreamAuth,
                StatusCode::NOT_FOUND => WeatherError::NotFound,
                other => WeatherError::Upstream(format!("upstream status {other}")),
            });
        }

        let data = resp
            .json::<serde_json::Value>()
            .await
            .map_err(map_transport_error)?;
        debug!(?location, "weather upstream answered");
        Ok(data)
    }
}

fn map_transport_error(err: reqwest::Error) -> WeatherError {
    error!("weather upstream request failed: {err}");
    if err.is_timeout() {
        WeatherError::Timeout
    } else {
        WeatherError::Upstream(err.to_string())
    }
}
