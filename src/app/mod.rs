pub mod alerts;
pub mod map;
pub mod notifications;
pub mod tracking;
