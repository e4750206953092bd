use std::sync::Arc;

use tracing::{debug, error, warn};
use url::Url;

use crate::domain::location::{LatLng, LatLngBounds, MarkerRole, MarkerSet, Place};
use crate::infra::geolocation::{LocationError, LocationProvider};
use crate::infra::scene::{LayerId, MapError, MapOptions, MapSurface, MarkerSpec, RouteSpec};

/// Siraha, Nepal.
pub const DEFAULT_CENTER: LatLng = LatLng {
    lat: 26.6586,
    lng: 86.2003,
};
pub const DEFAULT_ZOOM: u8 = 13;
pub const MAX_ZOOM: u8 = 19;
pub const FIT_PADDING_PX: u32 = 20;
pub const TILE_URL: &str = "https://{s}.tile.openstreetmap.org/{z}/{x}/{y}.png";
pub const TILE_ATTRIBUTION: &str = "© OpenStreetMap contributors";

pub const INIT_FAILED: &str = "Failed to initialize map";
pub const LOCATION_UNAVAILABLE: &str =
    "Unable to get your location. Please enable location services.";
pub const LOCATION_UNSUPPORTED: &str = "Geolocation is not supported by this browser.";

/// Receives every device position the view obtains.
pub type LocationCallback = Arc<dyn Fn(LatLng) + Send + Sync>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MapState {
    Uninitialized,
    Mounting,
    Ready,
    Error(String),
    Unmounted,
}

/// Headless delivery map: pickup, drop-off and courier markers plus a straight
/// route line, drawn onto an injected surface.
pub struct MapView<S: MapSurface> {
    surface: S,
    state: MapState,
    markers: MarkerSet,
    drawn: Vec<LayerId>,
    locator: Option<Arc<dyn LocationProvider>>,
    geolocation_supported: bool,
    on_location_update: Option<LocationCallback>,
    location_error: Option<String>,
}

impl<S: MapSurface> MapView<S> {
    pub fn new(surface: S) -> Self {
        Self {
            surface,
            state: MapState::Uninitialized,
            markers: MarkerSet::default(),
            drawn: Vec::new(),
            locator: None,
            geolocation_supported: true,
            on_location_update: None,
            location_error: None,
        }
    }

    pub fn with_locator(mut self, locator: Arc<dyn LocationProvider>) -> Self {
        self.locator = Some(locator);
        self
    }

    /// Hosts without geolocation report "not supported" even when a locator
    /// is wired in.
    pub fn with_geolocation_support(mut self, supported: bool) -> Self {
        self.geolocation_supported = supported;
        self
    }

    pub fn on_location_update(mut self, callback: LocationCallback) -> Self {
        self.on_location_update = Some(callback);
        self
    }

    pub fn state(&self) -> &MapState {
        &self.state
    }

    pub fn is_ready(&self) -> bool {
        self.state == MapState::Ready
    }

    pub fn markers(&self) -> &MarkerSet {
        &self.markers
    }

    pub fn surface(&self) -> &S {
        &self.surface
    }

    pub fn location_error(&self) -> Option<&str> {
        self.location_error.as_deref()
    }

    pub fn has_locator(&self) -> bool {
        self.geolocation_supported && self.locator.is_some()
    }

    pub fn mount(&mut self) -> Result<(), MapError> {
        match &self.state {
            MapState::Uninitialized => {}
            MapState::Error(message) => return Err(MapError::Init(message.clone())),
            _ => return Ok(()),
        }

        self.state = MapState::Mounting;
        let options = MapOptions {
            center: DEFAULT_CENTER,
            zoom: DEFAULT_ZOOM,
            max_zoom: MAX_ZOOM,
            tile_url: TILE_URL,
            attribution: TILE_ATTRIBUTION,
        };

        match self.surface.init(&options) {
            Ok(()) => {
                self.state = MapState::Ready;
                debug!("map mounted");
                Ok(())
            }
            Err(err) => {
                error!(error = %err, "error initializing map");
                self.state = MapState::Error(INIT_FAILED.to_string());
                Err(err)
            }
        }
    }

    /// Replace everything drawn with `markers`. Returns false when the view is
    /// not ready, in which case nothing is recorded.
    pub fn update_markers(&mut self, markers: MarkerSet) -> bool {
        if !self.is_ready() {
            debug!(state = ?self.state, "ignoring marker update");
            return false;
        }
        self.markers = markers;
        self.render();
        true
    }

    pub fn unmount(&mut self) {
        if self.state == MapState::Unmounted {
            return;
        }
        self.drawn.clear();
        self.surface.release();
        self.state = MapState::Unmounted;
        debug!("map unmounted");
    }

    /// Ask the locator for the device position once. Calling it again is the
    /// manual retry after a failure.
    pub async fn request_device_location(&mut self) -> Option<LatLng> {
        if self.state == MapState::Unmounted {
            return None;
        }

        let locator = match &self.locator {
            Some(locator) if self.geolocation_supported => Arc::clone(locator),
            _ => {
                self.location_error = Some(LOCATION_UNSUPPORTED.to_string());
                return None;
            }
        };

        match locator.current_position().await {
            Ok(point) => {
                // the view may have been torn down while we waited
                if self.state == MapState::Unmounted {
                    return None;
                }
                self.location_error = None;
                if let Some(callback) = &self.on_location_update {
                    callback(point);
                }
                self.markers.current = Some(point);
                if self.is_ready() {
                    self.render();
                }
                Some(point)
            }
            Err(LocationError::Unsupported) => {
                self.location_error = Some(LOCATION_UNSUPPORTED.to_string());
                None
            }
            Err(err) => {
                warn!(error = %err, "error getting location");
                self.location_error = Some(LOCATION_UNAVAILABLE.to_string());
                None
            }
        }
    }

    fn render(&mut self) {
        for id in self.drawn.drain(..) {
            self.surface.remove_layer(id);
        }

        let points = self.markers.points();
        for (role, point) in &points {
            let spec = marker_spec(*role, *point, self.address_for(*role));
            let id = self.surface.add_marker(&spec);
            self.drawn.push(id);
        }

        if let Some((from, to)) = self.markers.route() {
            let id = self.surface.add_route(&RouteSpec {
                from,
                to,
                color: "#3B82F6",
                weight: 3,
                opacity: 0.7,
                dash: "5, 10",
            });
            self.drawn.push(id);
        }

        if let Some(bounds) = LatLngBounds::from_points(points.iter().map(|(_, point)| *point)) {
            self.surface.fit_bounds(bounds, FIT_PADDING_PX);
        }
    }

    fn address_for(&self, role: MarkerRole) -> Option<&str> {
        match role {
            MarkerRole::Pickup => self.markers.pickup.as_ref()?.address.as_deref(),
            MarkerRole::Delivery => self.markers.delivery.as_ref()?.address.as_deref(),
            MarkerRole::Current => None,
        }
    }
}

fn marker_spec(role: MarkerRole, position: LatLng, address: Option<&str>) -> MarkerSpec {
    let popup_body = match role {
        MarkerRole::Current => "Live tracking position".to_string(),
        _ => address.unwrap_or_default().to_string(),
    };
    MarkerSpec {
        role,
        position,
        color: role.color(),
        glyph: role.glyph(),
        popup_title: format!("{} {}", role.glyph(), role.label()),
        popup_body,
    }
}

/// Turn-by-turn directions to `destination` in Google Maps.
pub fn navigation_url(destination: &Place) -> Result<Url, url::ParseError> {
    Url::parse_with_params(
        "https://www.google.com/maps/dir/",
        &[
            ("api", "1".to_string()),
            (
                "destination",
                format!("{},{}", destination.lat, destination.lng),
            ),
        ],
    )
}
