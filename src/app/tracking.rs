use tracing::{info, warn};

use crate::app::map::MapView;
use crate::config::AppConfig;
use crate::domain::location::{LatLng, MarkerSet};
use crate::infra::scene::MapSurface;
use crate::jobs::notification_poller::{NotificationPoller, PollerHandle};

#[derive(Debug, Clone)]
pub struct TrackingOptions {
    pub user_id: i64,
    pub markers: MarkerSet,
}

impl TrackingOptions {
    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            user_id: config.user_id,
            markers: config.initial_markers(),
        }
    }
}

/// One open delivery dashboard: a live map plus the user's notification
/// poller. Both are torn down together.
pub struct TrackingSession<S: MapSurface> {
    map: MapView<S>,
    poller: PollerHandle,
    stopped: bool,
}

impl<S: MapSurface> TrackingSession<S> {
    /// A map that fails to mount stays in its error state; notifications keep
    /// flowing regardless.
    pub async fn start(
        poller: &NotificationPoller,
        mut map: MapView<S>,
        options: TrackingOptions,
    ) -> Self {
        if let Err(err) = map.mount() {
            warn!(error = %err, user_id = options.user_id, "tracking map unavailable");
        }
        map.update_markers(options.markers);

        let handle = poller.start(options.user_id);
        info!(
            user_id = options.user_id,
            interval_ms = poller.config().interval.as_millis() as u64,
            "tracking session started"
        );

        let mut session = Self {
            map,
            poller: handle,
            stopped: false,
        };
        if session.map.has_locator() {
            session.map.request_device_location().await;
        }
        session
    }

    pub fn map(&self) -> &MapView<S> {
        &self.map
    }

    pub fn poller(&self) -> &PollerHandle {
        &self.poller
    }

    pub fn is_active(&self) -> bool {
        !self.stopped
    }

    /// Redraw with new pickup or drop-off points, keeping the courier's last
    /// known position.
    pub fn update_markers(&mut self, mut markers: MarkerSet) -> bool {
        if self.stopped {
            return false;
        }
        if markers.current.is_none() {
            markers.current = self.map.markers().current;
        }
        self.map.update_markers(markers)
    }

    pub async fn refresh_location(&mut self) -> Option<LatLng> {
        if self.stopped {
            return None;
        }
        self.map.request_device_location().await
    }

    pub fn stop(&mut self) {
        if self.stopped {
            return;
        }
        self.stopped = true;
        self.poller.stop();
        self.map.unmount();
        info!(user_id = self.poller.user_id(), "tracking session stopped");
    }
}

impl<S: MapSurface> Drop for TrackingSession<S> {
    fn drop(&mut self) {
        self.stop();
    }
}
