pub mod cadence;

use anyhow::{anyhow, Result};
use std::str::FromStr;
use std::time::Duration;
use url::Url;

use crate::config::cadence::{poll_interval, Role};
use crate::domain::alert::Capabilities;
use crate::domain::location::{LatLng, MarkerSet, Place};

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub api_base_url: Url,
    pub api_token: Option<String>,
    pub user_id: i64,
    pub role: Role,
    pub poll_interval: Duration,
    pub request_timeout_seconds: u64,
    pub capabilities: Capabilities,
    pub device_location: Option<LatLng>,
    pub pickup: Option<Place>,
    pub dropoff: Option<Place>,
    pub map_width_px: u32,
    pub map_height_px: u32,
}

impl AppConfig {
    pub fn from_env() -> Result<Self> {
        let api_base_url = env_or_err("API_BASE_URL")?;
        let api_base_url =
            Url::parse(&api_base_url).map_err(|err| anyhow!("invalid API_BASE_URL: {}", err))?;
        let role = Role::from_str_lossy(&env_or("TRACKER_ROLE", "customer"));
        let interval_override = env_opt_parse::<u64>("POLL_INTERVAL_MS")?;

        let supports_geolocation = env_opt_parse::<f64>("TRACKER_LAT")?.is_some();

        Ok(Self {
            api_base_url,
            api_token: std::env::var("API_TOKEN").ok().filter(|token| !token.is_empty()),
            user_id: env_or_err("TRACKER_USER_ID")?
                .parse()
                .map_err(|err| anyhow!("invalid TRACKER_USER_ID: {}", err))?,
            role,
            poll_interval: poll_interval(role, interval_override),
            request_timeout_seconds: env_or_parse("REQUEST_TIMEOUT_SECONDS", "10")?,
            capabilities: Capabilities {
                is_mobile: env_or_parse("TRACKER_MOBILE", "false")?,
                supports_vibration: env_or_parse("TRACKER_VIBRATION", "true")?,
                supports_notifications: env_or_parse("TRACKER_NOTIFICATIONS", "true")?,
                supports_geolocation,
            },
            device_location: env_point("TRACKER_LAT", "TRACKER_LNG")?,
            pickup: env_place("PICKUP")?,
            dropoff: env_place("DROPOFF")?,
            map_width_px: env_or_parse("MAP_WIDTH_PX", "800")?,
            map_height_px: env_or_parse("MAP_HEIGHT_PX", "400")?,
        })
    }

    pub fn initial_markers(&self) -> MarkerSet {
        MarkerSet {
            pickup: self.pickup.clone(),
            delivery: self.dropoff.clone(),
            current: None,
        }
    }
}

fn env_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

fn env_or_err(key: &str) -> Result<String> {
    std::env::var(key).map_err(|_| anyhow!("missing required env var: {}", key))
}

fn env_or_parse<T>(key: &str, default: &str) -> Result<T>
where
    T: FromStr,
    <T as FromStr>::Err: std::fmt::Display,
{
    let value = std::env::var(key).unwrap_or_else(|_| default.to_string());
    value
        .parse::<T>()
        .map_err(|err| anyhow!("invalid {}: {}", key, err))
}

fn env_opt_parse<T>(key: &str) -> Result<Option<T>>
where
    T: FromStr,
    <T as FromStr>::Err: std::fmt::Display,
{
    match std::env::var(key) {
        Ok(value) if !value.is_empty() => value
            .parse::<T>()
            .map(Some)
            .map_err(|err| anyhow!("invalid {}: {}", key, err)),
        _ => Ok(None),
    }
}

fn env_point(lat_key: &str, lng_key: &str) -> Result<Option<LatLng>> {
    match (env_opt_parse::<f64>(lat_key)?, env_opt_parse::<f64>(lng_key)?) {
        (Some(lat), Some(lng)) => Ok(Some(LatLng::new(lat, lng))),
        (None, None) => Ok(None),
        _ => Err(anyhow!("{} and {} must be set together", lat_key, lng_key)),
    }
}

fn env_place(prefix: &str) -> Result<Option<Place>> {
    let point = env_point(&format!("{}_LAT", prefix), &format!("{}_LNG", prefix))?;
    Ok(point.map(|point| {
        Place::new(
            point.lat,
            point.lng,
            std::env::var(format!("{}_ADDRESS", prefix)).ok(),
        )
    }))
}
