use std::collections::BTreeMap;

use thiserror::Error;
use tracing::debug;

use crate::domain::location::{project, unproject, LatLng, LatLngBounds, MarkerRole};

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum MapError {
    #[error("map initialisation failed: {0}")]
    Init(String),
}

pub type LayerId = u64;

#[derive(Debug, Clone, PartialEq)]
pub struct MapOptions {
    pub center: LatLng,
    pub zoom: u8,
    pub max_zoom: u8,
    pub tile_url: &'static str,
    pub attribution: &'static str,
}

#[derive(Debug, Clone, PartialEq)]
pub struct MarkerSpec {
    pub role: MarkerRole,
    pub position: LatLng,
    pub color: &'static str,
    pub glyph: &'static str,
    pub popup_title: String,
    pub popup_body: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RouteSpec {
    pub from: LatLng,
    pub to: LatLng,
    pub color: &'static str,
    pub weight: u32,
    pub opacity: f32,
    pub dash: &'static str,
}

/// A map backend the tracking view draws onto.
pub trait MapSurface: Send {
    fn init(&mut self, options: &MapOptions) -> Result<(), MapError>;

    fn add_marker(&mut self, marker: &MarkerSpec) -> LayerId;

    fn add_route(&mut self, route: &RouteSpec) -> LayerId;

    fn remove_layer(&mut self, id: LayerId);

    fn fit_bounds(&mut self, bounds: LatLngBounds, padding_px: u32);

    fn release(&mut self);
}

#[derive(Debug, Clone, PartialEq)]
pub enum Layer {
    Marker(MarkerSpec),
    Route(RouteSpec),
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Viewport {
    pub center: LatLng,
    pub zoom: u8,
}

/// In-memory map: keeps the drawn layers and computes the viewport the way a
/// slippy map would.
#[derive(Debug)]
pub struct SceneSurface {
    width_px: u32,
    height_px: u32,
    max_zoom: u8,
    layers: BTreeMap<LayerId, Layer>,
    next_id: LayerId,
    viewport: Option<Viewport>,
    initialized: bool,
    released: bool,
}

impl SceneSurface {
    pub fn new(width_px: u32, height_px: u32) -> Self {
        Self {
            width_px,
            height_px,
            max_zoom: 19,
            layers: BTreeMap::new(),
            next_id: 1,
            viewport: None,
            initialized: false,
            released: false,
        }
    }

    pub fn viewport(&self) -> Option<Viewport> {
        self.viewport
    }

    pub fn is_released(&self) -> bool {
        self.released
    }

    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    pub fn markers(&self) -> Vec<&MarkerSpec> {
        self.layers
            .values()
            .filter_map(|layer| match layer {
                Layer::Marker(marker) => Some(marker),
                Layer::Route(_) => None,
            })
            .collect()
    }

    pub fn routes(&self) -> Vec<&RouteSpec> {
        self.layers
            .values()
            .filter_map(|layer| match layer {
                Layer::Route(route) => Some(route),
                Layer::Marker(_) => None,
            })
            .collect()
    }

    pub fn layer_count(&self) -> usize {
        self.layers.len()
    }

    fn insert(&mut self, layer: Layer) -> LayerId {
        let id = self.next_id;
        self.next_id += 1;
        self.layers.insert(id, layer);
        id
    }
}

impl MapSurface for SceneSurface {
    fn init(&mut self, options: &MapOptions) -> Result<(), MapError> {
        if self.released {
            return Err(MapError::Init("surface already released".to_string()));
        }
        if self.width_px == 0 || self.height_px == 0 {
            return Err(MapError::Init("container has no size".to_string()));
        }
        self.max_zoom = options.max_zoom;
        self.viewport = Some(Viewport {
            center: options.center,
            zoom: options.zoom.min(options.max_zoom),
        });
        self.initialized = true;
        Ok(())
    }

    fn add_marker(&mut self, marker: &MarkerSpec) -> LayerId {
        self.insert(Layer::Marker(marker.clone()))
    }

    fn add_route(&mut self, route: &RouteSpec) -> LayerId {
        self.insert(Layer::Route(route.clone()))
    }

    fn remove_layer(&mut self, id: LayerId) {
        self.layers.remove(&id);
    }

    fn fit_bounds(&mut self, bounds: LatLngBounds, padding_px: u32) {
        let viewport = fit_viewport(
            bounds,
            self.width_px,
            self.height_px,
            padding_px,
            self.max_zoom,
        );
        debug!(zoom = viewport.zoom, lat = viewport.center.lat, lng = viewport.center.lng, "viewport fitted");
        self.viewport = Some(viewport);
    }

    fn release(&mut self) {
        self.layers.clear();
        self.viewport = None;
        self.initialized = false;
        self.released = true;
    }
}

/// Largest whole zoom at which `bounds` fits inside the padded container,
/// centred on the projected midpoint of the box.
pub fn fit_viewport(
    bounds: LatLngBounds,
    width_px: u32,
    height_px: u32,
    padding_px: u32,
    max_zoom: u8,
) -> Viewport {
    let (x_min, y_max) = project(bounds.south_west, 0.0);
    let (x_max, y_min) = project(bounds.north_east, 0.0);
    let center = unproject((x_min + x_max) / 2.0, (y_min + y_max) / 2.0, 0.0);

    let avail_w = (width_px as f64 - 2.0 * padding_px as f64).max(1.0);
    let avail_h = (height_px as f64 - 2.0 * padding_px as f64).max(1.0);
    let span_w = x_max - x_min;
    let span_h = y_max - y_min;

    let mut zoom = max_zoom as f64;
    if span_w > 0.0 {
        zoom = zoom.min((avail_w / span_w).log2());
    }
    if span_h > 0.0 {
        zoom = zoom.min((avail_h / span_h).log2());
    }
    let zoom = zoom.floor().clamp(0.0, max_zoom as f64) as u8;

    Viewport { center, zoom }
}
