use foundation::math::GeoPoint;
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum GeolocationError {
    #[error("geolocation is not supported by this host")]
    Unsupported,
    #[error("location permission denied")]
    PermissionDenied,
    #[error("position unavailable: {0}")]
    Unavailable(String),
    #[error("timed out waiting for a position")]
    Timeout,
}

/// Single-shot, permission-gated position lookup.
#[allow(async_fn_in_trait)]
pub trait Geolocator {
    async fn current_position(&self) -> Result<GeoPoint, GeolocationError>;
}

/// A host without a location capability.
#[derive(Debug, Default, Copy, Clone)]
pub struct NoGeolocation;

impl Geolocator for NoGeolocation {
    async fn current_position(&self) -> Result<GeoPoint, GeolocationError> {
        Err(GeolocationError::Unsupported)
    }
}

/// Always reports the same outcome; for tests and kiosk setups.
#[derive(Debug, Clone)]
pub struct FixedGeolocation(pub Result<GeoPoint, GeolocationError>);

impl Geolocator for FixedGeolocation {
    async fn current_position(&self) -> Result<GeoPoint, GeolocationError> {
        self.0.clone()
    }
}
