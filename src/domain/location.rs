use std::f64::consts::PI;

use serde::{Deserialize, Serialize};

/// Web Mercator stops being meaningful beyond this latitude.
pub const MAX_LATITUDE: f64 = 85.051_128_779_806_6;
pub const TILE_SIZE: f64 = 256.0;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LatLng {
    pub lat: f64,
    pub lng: f64,
}

impl LatLng {
    pub fn new(lat: f64, lng: f64) -> Self {
        Self { lat, lng }
    }
}

/// A location handed in by the page, optionally with a street address.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Place {
    pub lat: f64,
    pub lng: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
}

impl Place {
    pub fn new(lat: f64, lng: f64, address: Option<String>) -> Self {
        Self { lat, lng, address }
    }

    pub fn point(&self) -> LatLng {
        LatLng::new(self.lat, self.lng)
    }
}

impl From<LatLng> for Place {
    fn from(point: LatLng) -> Self {
        Self::new(point.lat, point.lng, None)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MarkerRole {
    Pickup,
    Delivery,
    Current,
}

impl MarkerRole {
    pub fn color(&self) -> &'static str {
        match self {
            Self::Pickup => "#10B981",
            Self::Delivery => "#EF4444",
            Self::Current => "#F59E0B",
        }
    }

    pub fn glyph(&self) -> &'static str {
        match self {
            Self::Pickup => "🏪",
            Self::Delivery => "🏠",
            Self::Current => "🚚",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::Pickup => "Pickup Location",
            Self::Delivery => "Delivery Location",
            Self::Current => "Current Location",
        }
    }
}

/// The up-to-three points a tracking view can show.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MarkerSet {
    pub pickup: Option<Place>,
    pub delivery: Option<Place>,
    pub current: Option<LatLng>,
}

impl MarkerSet {
    /// Present points in draw order.
    pub fn points(&self) -> Vec<(MarkerRole, LatLng)> {
        let mut points = Vec::with_capacity(3);
        if let Some(pickup) = &self.pickup {
            points.push((MarkerRole::Pickup, pickup.point()));
        }
        if let Some(delivery) = &self.delivery {
            points.push((MarkerRole::Delivery, delivery.point()));
        }
        if let Some(current) = self.current {
            points.push((MarkerRole::Current, current));
        }
        points
    }

    pub fn route(&self) -> Option<(LatLng, LatLng)> {
        match (&self.pickup, &self.delivery) {
            (Some(pickup), Some(delivery)) => Some((pickup.point(), delivery.point())),
            _ => None,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.pickup.is_none() && self.delivery.is_none() && self.current.is_none()
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LatLngBounds {
    pub south_west: LatLng,
    pub north_east: LatLng,
}

impl LatLngBounds {
    pub fn around(point: LatLng) -> Self {
        Self {
            south_west: point,
            north_east: point,
        }
    }

    /// Smallest box containing every point; `None` for an empty input.
    pub fn from_points<I>(points: I) -> Option<Self>
    where
        I: IntoIterator<Item = LatLng>,
    {
        let mut iter = points.into_iter();
        let first = iter.next()?;
        let mut bounds = Self::around(first);
        for point in iter {
            bounds.extend(point);
        }
        Some(bounds)
    }

    pub fn extend(&mut self, point: LatLng) {
        self.south_west.lat = self.south_west.lat.min(point.lat);
        self.south_west.lng = self.south_west.lng.min(point.lng);
        self.north_east.lat = self.north_east.lat.max(point.lat);
        self.north_east.lng = self.north_east.lng.max(point.lng);
    }

    pub fn contains(&self, point: LatLng) -> bool {
        point.lat >= self.south_west.lat
            && point.lat <= self.north_east.lat
            && point.lng >= self.south_west.lng
            && point.lng <= self.north_east.lng
    }
}

/// Spherical Mercator projection to pixel space at `zoom`.
pub fn project(point: LatLng, zoom: f64) -> (f64, f64) {
    let scale = TILE_SIZE * 2f64.powf(zoom);
    let lat_rad = point.lat.clamp(-MAX_LATITUDE, MAX_LATITUDE).to_radians();
    let x = (point.lng + 180.0) / 360.0 * scale;
    let y = (1.0 - (lat_rad.tan() + 1.0 / lat_rad.cos()).ln() / PI) / 2.0 * scale;
    (x, y)
}

pub fn unproject(x: f64, y: f64, zoom: f64) -> LatLng {
    let scale = TILE_SIZE * 2f64.powf(zoom);
    let lng = x / scale * 360.0 - 180.0;
    let n = PI - 2.0 * PI * y / scale;
    let lat = n.sinh().atan().to_degrees();
    LatLng::new(lat, lng)
}
