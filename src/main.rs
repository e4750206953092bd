use std::sync::Arc;
use std::time::Duration;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use siraha_tracker::app::map::MapView;
use siraha_tracker::app::tracking::{TrackingOptions, TrackingSession};
use siraha_tracker::config::AppConfig;
use siraha_tracker::domain::alert::{AlertSettings, Permission};
use siraha_tracker::domain::location::LatLng;
use siraha_tracker::infra::alerts::TracingAlertSink;
use siraha_tracker::infra::api::HttpNotificationApi;
use siraha_tracker::infra::geolocation::FixedLocation;
use siraha_tracker::infra::scene::SceneSurface;
use siraha_tracker::jobs::notification_poller::{NotificationPoller, PollerConfig};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::from_default_env())
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = AppConfig::from_env()?;
    tracing::info!(
        api = %config.api_base_url,
        user_id = config.user_id,
        role = config.role.as_str(),
        "starting tracker"
    );

    let api = Arc::new(HttpNotificationApi::from_config(&config)?);
    let sink = Arc::new(TracingAlertSink::new(Permission::Granted));
    let poller = NotificationPoller::new(
        api,
        sink,
        PollerConfig {
            interval: config.poll_interval,
            capabilities: config.capabilities,
            permission: Permission::Default,
            settings: AlertSettings::default(),
        },
    );

    let mut map = MapView::new(SceneSurface::new(config.map_width_px, config.map_height_px))
        .with_geolocation_support(config.capabilities.supports_geolocation)
        .on_location_update(Arc::new(|point: LatLng| {
            tracing::info!(lat = point.lat, lng = point.lng, "device location");
        }));
    if let Some(point) = config.device_location {
        map = map.with_locator(Arc::new(FixedLocation::new(point)));
    }

    let mut session = TrackingSession::start(&poller, map, TrackingOptions::from_config(&config)).await;
    let permission = session.poller().request_permission().await;
    tracing::info!(permission = ?permission, "desktop notification permission");

    shutdown_signal().await;

    if let Some(viewport) = session.map().surface().viewport() {
        tracing::info!(
            lat = viewport.center.lat,
            lng = viewport.center.lng,
            zoom = viewport.zoom,
            "final map viewport"
        );
    }
    let snapshot = session.poller().snapshot().await;
    tracing::info!(
        unread = snapshot.notifications.unread_count,
        total = snapshot.notifications.notifications.len(),
        "final notification state"
    );

    session.stop();
    // let in-flight effect tasks flush their logs
    tokio::time::sleep(Duration::from_millis(50)).await;

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %err, "failed to install Ctrl+C handler");
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};
        match signal(SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(err) => {
                tracing::error!(error = %err, "failed to install SIGTERM handler");
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("shutdown signal received");
}
