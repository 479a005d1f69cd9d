//! HTTP proxy in front of a third-party weather service.
//!
//! Holds the upstream credential server-side, validates the caller's location
//! query, maps upstream failures onto a small set of client-facing errors and
//! caps request volume per client address on `/api/*`.

pub mod config;
pub mod error;
pub mod rate_limit;
pub mod routes;
pub mod upstream;

pub use config::ServerConfig;
pub use error::WeatherError;
pub use routes::{router, AppState};
