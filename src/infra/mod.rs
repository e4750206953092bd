pub mod alerts;
pub mod api;
pub mod geolocation;
pub mod scene;
