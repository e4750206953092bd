use async_trait::async_trait;
use thiserror::Error;

use crate::domain::location::LatLng;

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum LocationError {
    #[error("geolocation is not supported")]
    Unsupported,
    #[error("location permission denied")]
    PermissionDenied,
    #[error("position unavailable: {0}")]
    Unavailable(String),
}

/// One-shot device position lookup.
#[async_trait]
pub trait LocationProvider: Send + Sync {
    async fn current_position(&self) -> Result<LatLng, LocationError>;
}

/// Reports the same position every time; used by the headless binary.
#[derive(Debug, Clone, Copy)]
pub struct FixedLocation {
    point: LatLng,
}

impl FixedLocation {
    pub fn new(point: LatLng) -> Self {
        Self { point }
    }
}

#[async_trait]
impl LocationProvider for FixedLocation {
    async fn current_position(&self) -> Result<LatLng, LocationError> {
        Ok(self.point)
    }
}
