use std::sync::atomic::{AtomicBool, AtomicU8, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, warn};

use crate::domain::alert::{
    AlertSettings, Capabilities, DesktopNotice, Permission, SoundCue, Toast, NOTIFICATION_ICON,
    VIBRATION_PATTERN,
};
use crate::domain::notification::Notification;
use crate::infra::alerts::AlertSink;

pub const CELEBRATION_DELAY: Duration = Duration::from_millis(500);
pub const SOUND_LOCK_HOLD: Duration = Duration::from_millis(1000);
pub const IMPORTANT_TOAST: Duration = Duration::from_millis(8000);
pub const NORMAL_TOAST: Duration = Duration::from_millis(5000);
pub const DESKTOP_AUTO_CLOSE: Duration = Duration::from_secs(5);

/// Turns newly arrived notifications into sounds, vibrations, desktop notices
/// and toasts.
pub struct AlertDispatcher {
    sink: Arc<dyn AlertSink>,
    capabilities: Capabilities,
    permission: AtomicU8,
    sound_enabled: AtomicBool,
    push_enabled: AtomicBool,
    sound_lock: Arc<AtomicBool>,
    pending_sound: AtomicBool,
}

impl AlertDispatcher {
    pub fn new(
        sink: Arc<dyn AlertSink>,
        capabilities: Capabilities,
        permission: Permission,
        settings: AlertSettings,
    ) -> Self {
        Self {
            sink,
            capabilities,
            permission: AtomicU8::new(permission_to_u8(permission)),
            sound_enabled: AtomicBool::new(settings.sound_enabled),
            push_enabled: AtomicBool::new(settings.push_enabled),
            sound_lock: Arc::new(AtomicBool::new(false)),
            pending_sound: AtomicBool::new(false),
        }
    }

    pub fn capabilities(&self) -> Capabilities {
        self.capabilities
    }

    pub fn permission(&self) -> Permission {
        permission_from_u8(self.permission.load(Ordering::Acquire))
    }

    pub fn settings(&self) -> AlertSettings {
        AlertSettings {
            sound_enabled: self.sound_enabled.load(Ordering::Acquire),
            push_enabled: self.push_enabled.load(Ordering::Acquire),
        }
    }

    pub fn update_settings(&self, settings: AlertSettings) {
        self.sound_enabled
            .store(settings.sound_enabled, Ordering::Release);
        self.push_enabled.store(settings.push_enabled, Ordering::Release);
    }

    pub fn has_pending_sound(&self) -> bool {
        self.pending_sound.load(Ordering::Acquire)
    }

    /// Alert on the newest entry of `fresh` (newest first). Effects are issued
    /// in a fixed order: sound or vibration, desktop notice, toast, then the
    /// delayed celebration chime.
    pub fn announce(&self, fresh: &[Notification]) {
        self.dispatch(fresh, false);
    }

    /// Alert on a notification pushed by the host. Clicking its desktop
    /// notice marks it read.
    pub fn announce_pushed(&self, notification: &Notification) {
        self.dispatch(std::slice::from_ref(notification), true);
    }

    fn dispatch(&self, fresh: &[Notification], click_to_read: bool) {
        let Some(latest) = fresh.first() else {
            return;
        };
        let important = latest.is_important();
        let settings = self.settings();

        debug!(
            notification_id = latest.id,
            important,
            fresh = fresh.len(),
            "announcing notification"
        );

        let played = settings.sound_enabled && self.arrival_sound(important);
        if settings.push_enabled {
            self.desktop_notice(latest, important, click_to_read);
        }
        self.toast(latest, important);

        if important && played {
            self.schedule_celebration();
        }
    }

    /// A tap or click from the user. Plays a sound held back on mobile, once.
    pub fn on_user_interaction(&self) -> bool {
        if !self.pending_sound.swap(false, Ordering::AcqRel) {
            return false;
        }
        if let Err(err) = self.sink.play_sound(&SoundCue::deferred()) {
            debug!(error = %err, "could not play pending notification sound");
        }
        true
    }

    pub async fn request_permission(&self) -> Permission {
        if !self.capabilities.supports_notifications {
            self.sink.toast(&Toast::destructive(
                "Not Supported",
                "Your browser doesn't support notifications",
            ));
            return self.permission();
        }

        match self.sink.request_permission().await {
            Ok(Permission::Granted) => {
                self.store_permission(Permission::Granted);
                self.sink.toast(&Toast::new(
                    "Notifications Enabled",
                    "You'll now receive notifications for important updates",
                    NORMAL_TOAST,
                ));
                Permission::Granted
            }
            Ok(other) => {
                self.store_permission(other);
                self.sink.toast(&Toast::destructive(
                    "Notifications Disabled",
                    "You can enable notifications in your browser settings",
                ));
                other
            }
            Err(err) => {
                warn!(error = %err, "notification permission request failed");
                self.permission()
            }
        }
    }

    /// Returns true when audio was attempted right away.
    fn arrival_sound(&self, important: bool) -> bool {
        if self.capabilities.is_mobile {
            // mobile browsers reject audio that no gesture started
            if self.capabilities.supports_vibration {
                self.sink.vibrate(&VIBRATION_PATTERN);
            }
            self.pending_sound.store(true, Ordering::Release);
            return false;
        }

        if self
            .sound_lock
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            debug!("notification sound already playing");
            return false;
        }

        if let Err(err) = self.sink.play_sound(&SoundCue::arrival(important)) {
            debug!(error = %err, "audio playback restricted, vibrating instead");
            if self.capabilities.supports_vibration {
                self.sink.vibrate(&VIBRATION_PATTERN);
            }
        }

        let lock = Arc::clone(&self.sound_lock);
        tokio::spawn(async move {
            tokio::time::sleep(SOUND_LOCK_HOLD).await;
            lock.store(false, Ordering::Release);
        });
        true
    }

    fn desktop_notice(&self, notification: &Notification, important: bool, click_to_read: bool) {
        if !self.capabilities.supports_notifications || self.permission() != Permission::Granted {
            return;
        }
        let mark_read_on_click = click_to_read.then_some(notification.id);

        let notice = if important {
            DesktopNotice {
                title: notification.title.clone(),
                body: notification.message.clone(),
                icon: NOTIFICATION_ICON,
                tag: format!("important-{}", notification.id),
                require_interaction: true,
                auto_close: None,
                mark_read_on_click,
            }
        } else {
            DesktopNotice {
                title: notification.title.clone(),
                body: notification.message.clone(),
                icon: NOTIFICATION_ICON,
                tag: format!("notification-{}", notification.id),
                require_interaction: false,
                auto_close: Some(DESKTOP_AUTO_CLOSE),
                mark_read_on_click,
            }
        };

        if let Err(err) = self.sink.show_desktop(&notice) {
            warn!(error = %err, notification_id = notification.id, "desktop notification failed");
        }
    }

    fn toast(&self, notification: &Notification, important: bool) {
        let toast = if important {
            Toast::new(
                format!("🎉 {}", notification.title),
                notification.message.clone(),
                IMPORTANT_TOAST,
            )
        } else {
            Toast::new(
                notification.title.clone(),
                notification.message.clone(),
                NORMAL_TOAST,
            )
        };
        self.sink.toast(&toast);
    }

    fn schedule_celebration(&self) {
        let sink = Arc::clone(&self.sink);
        tokio::spawn(async move {
            tokio::time::sleep(CELEBRATION_DELAY).await;
            if let Err(err) = sink.play_sound(&SoundCue::celebration()) {
                debug!(error = %err, "could not play celebratory sound");
            }
        });
    }

    fn store_permission(&self, permission: Permission) {
        self.permission
            .store(permission_to_u8(permission), Ordering::Release);
    }
}

fn permission_to_u8(permission: Permission) -> u8 {
    match permission {
        Permission::Default => 0,
        Permission::Granted => 1,
        Permission::Denied => 2,
    }
}

fn permission_from_u8(value: u8) -> Permission {
    match value {
        1 => Permission::Granted,
        2 => Permission::Denied,
        _ => Permission::Default,
    }
}
