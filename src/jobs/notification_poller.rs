use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use tokio::sync::{watch, Mutex};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

use crate::app::alerts::AlertDispatcher;
use crate::app::notifications::{FetchOutcome, NotificationSnapshot, NotificationStore, SyncStatus};
use crate::domain::alert::{AlertSettings, Capabilities, Permission};
use crate::domain::notification::Notification;
use crate::infra::alerts::AlertSink;
use crate::infra::api::NotificationApi;

const MIN_INTERVAL: Duration = Duration::from_millis(1);

#[derive(Debug, Clone, Copy)]
pub struct PollerConfig {
    pub interval: Duration,
    pub capabilities: Capabilities,
    pub permission: Permission,
    pub settings: AlertSettings,
}

impl Default for PollerConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(30),
            capabilities: Capabilities::default(),
            permission: Permission::Default,
            settings: AlertSettings::default(),
        }
    }
}

/// Notification state plus the permission the alerts currently run under.
#[derive(Debug, Clone, Serialize)]
pub struct SessionSnapshot {
    #[serde(flatten)]
    pub notifications: NotificationSnapshot,
    pub permission: Permission,
}

/// Builds per-session pollers around a shared API client and alert sink.
#[derive(Clone)]
pub struct NotificationPoller {
    api: Arc<dyn NotificationApi>,
    sink: Arc<dyn AlertSink>,
    config: PollerConfig,
}

impl NotificationPoller {
    pub fn new(api: Arc<dyn NotificationApi>, sink: Arc<dyn AlertSink>, config: PollerConfig) -> Self {
        Self { api, sink, config }
    }

    pub fn config(&self) -> &PollerConfig {
        &self.config
    }

    /// Fetch immediately, then once per interval until the handle is stopped
    /// or dropped.
    pub fn start(&self, user_id: i64) -> PollerHandle {
        let session = Arc::new(Session {
            user_id,
            api: Arc::clone(&self.api),
            store: Mutex::new(NotificationStore::new(user_id)),
            alerts: AlertDispatcher::new(
                Arc::clone(&self.sink),
                self.config.capabilities,
                self.config.permission,
                self.config.settings,
            ),
            running: AtomicBool::new(true),
        });

        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let task = tokio::spawn(run(
            Arc::clone(&session),
            self.config.interval,
            shutdown_rx,
        ));

        PollerHandle {
            session,
            shutdown: shutdown_tx,
            task: Some(task),
        }
    }
}

struct Session {
    user_id: i64,
    api: Arc<dyn NotificationApi>,
    store: Mutex<NotificationStore>,
    alerts: AlertDispatcher,
    running: AtomicBool,
}

impl Session {
    fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }

    async fn fetch_once(&self) -> Option<FetchOutcome> {
        if !self.is_running() {
            return None;
        }

        let seq = self.store.lock().await.begin_fetch();
        let notifications = match self.api.list_for_user(self.user_id).await {
            Ok(notifications) => notifications,
            Err(err) => {
                warn!(error = ?err, user_id = self.user_id, "error fetching notifications");
                return None;
            }
        };

        if !self.is_running() {
            debug!(user_id = self.user_id, "dropping notification response after stop");
            return None;
        }

        let outcome = self.store.lock().await.apply_fetch(seq, notifications)?;
        self.alerts.announce(&outcome.fresh);
        Some(outcome)
    }
}

async fn run(session: Arc<Session>, interval: Duration, mut shutdown: watch::Receiver<bool>) {
    info!(
        user_id = session.user_id,
        interval_ms = interval.as_millis() as u64,
        "notification poller started"
    );

    let mut ticker = tokio::time::interval(interval.max(MIN_INTERVAL));
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                session.fetch_once().await;
            }
            changed = shutdown.changed() => {
                if changed.is_err() || *shutdown.borrow() {
                    break;
                }
            }
        }
    }

    info!(user_id = session.user_id, "notification poller stopped");
}

/// A running poller. Stops its timer on `stop()` or when dropped.
pub struct PollerHandle {
    session: Arc<Session>,
    shutdown: watch::Sender<bool>,
    task: Option<JoinHandle<()>>,
}

impl PollerHandle {
    pub fn user_id(&self) -> i64 {
        self.session.user_id
    }

    pub fn is_running(&self) -> bool {
        self.session.is_running()
    }

    /// Cancel future ticks. A request already in flight completes, but its
    /// response is thrown away.
    pub fn stop(&mut self) {
        if !self.session.running.swap(false, Ordering::AcqRel) {
            return;
        }
        let _ = self.shutdown.send(true);
        self.task.take();
        debug!(user_id = self.session.user_id, "notification poller stop requested");
    }

    /// Stop and wait for the polling task to finish.
    pub async fn shutdown(mut self) {
        self.session.running.store(false, Ordering::Release);
        let _ = self.shutdown.send(true);
        if let Some(task) = self.task.take() {
            if let Err(err) = task.await {
                warn!(error = %err, "notification poller task failed");
            }
        }
    }

    /// Run one fetch-diff-alert cycle outside the timer.
    pub async fn fetch_once(&self) -> Option<FetchOutcome> {
        self.session.fetch_once().await
    }

    pub async fn snapshot(&self) -> SessionSnapshot {
        let notifications = self.session.store.lock().await.snapshot();
        SessionSnapshot {
            notifications,
            permission: self.session.alerts.permission(),
        }
    }

    pub async fn unread_count(&self) -> usize {
        self.session.store.lock().await.unread_count()
    }

    /// Flag one notification read locally, then tell the server.
    pub async fn mark_read(&self, notification_id: i64) -> Option<SyncStatus> {
        if !self.is_running() {
            return None;
        }
        if !self.session.store.lock().await.mark_read_local(notification_id) {
            return None;
        }

        let result = self.session.api.mark_read(notification_id).await;
        if let Err(err) = &result {
            warn!(error = ?err, notification_id, "error marking notification as read");
        }
        let status = self
            .session
            .store
            .lock()
            .await
            .finish_mutation(&[notification_id], result.is_ok());
        Some(status)
    }

    /// Flag every notification read locally, then issue a single request.
    pub async fn mark_all_read(&self) -> Option<SyncStatus> {
        if !self.is_running() {
            return None;
        }
        let changed = self.session.store.lock().await.mark_all_read_local();

        let result = self.session.api.mark_all_read(self.session.user_id).await;
        if let Err(err) = &result {
            warn!(error = ?err, user_id = self.session.user_id, "error marking all notifications as read");
        }
        let status = self
            .session
            .store
            .lock()
            .await
            .finish_mutation(&changed, result.is_ok());
        Some(status)
    }

    /// Remove a notification from this session only.
    pub async fn dismiss(&self, notification_id: i64) -> bool {
        if !self.is_running() {
            return false;
        }
        self.session.store.lock().await.dismiss(notification_id)
    }

    /// Accept a notification delivered outside the polling cycle.
    pub async fn ingest(&self, notification: Notification) -> bool {
        if !self.is_running() {
            return false;
        }
        let inserted = self
            .session
            .store
            .lock()
            .await
            .insert(notification.clone());
        if inserted && !notification.is_read {
            self.session.alerts.announce_pushed(&notification);
        }
        inserted
    }

    pub fn on_user_interaction(&self) -> bool {
        if !self.is_running() {
            return false;
        }
        self.session.alerts.on_user_interaction()
    }

    pub fn has_pending_sound(&self) -> bool {
        self.session.alerts.has_pending_sound()
    }

    pub async fn request_permission(&self) -> Permission {
        self.session.alerts.request_permission().await
    }

    pub fn permission(&self) -> Permission {
        self.session.alerts.permission()
    }

    pub fn update_settings(&self, settings: AlertSettings) {
        self.session.alerts.update_settings(settings);
    }

    pub fn settings(&self) -> AlertSettings {
        self.session.alerts.settings()
    }
}

impl Drop for PollerHandle {
    fn drop(&mut self) {
        self.stop();
    }
}
