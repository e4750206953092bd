use std::time::Duration;

use serde::{Deserialize, Serialize};

pub const NOTIFICATION_SOUND: &str = "/notification.mp3";
pub const NOTIFICATION_ICON: &str = "/favicon.ico";
pub const VIBRATION_PATTERN: [u64; 3] = [200, 100, 200];

/// What the host environment can do. Supplied by the host instead of sniffing
/// a user agent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Capabilities {
    pub is_mobile: bool,
    pub supports_vibration: bool,
    pub supports_notifications: bool,
    pub supports_geolocation: bool,
}

impl Default for Capabilities {
    fn default() -> Self {
        Self {
            is_mobile: false,
            supports_vibration: true,
            supports_notifications: true,
            supports_geolocation: true,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Permission {
    #[default]
    Default,
    Granted,
    Denied,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AlertSettings {
    pub sound_enabled: bool,
    pub push_enabled: bool,
}

impl Default for AlertSettings {
    fn default() -> Self {
        Self {
            sound_enabled: true,
            push_enabled: true,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SoundKind {
    /// The alert for a freshly arrived notification.
    Arrival,
    /// Follow-up chime for important notifications.
    Celebration,
    /// Sound held back on mobile until the user touches the page.
    Deferred,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SoundCue {
    pub asset: &'static str,
    pub volume: f32,
    pub kind: SoundKind,
}

impl SoundCue {
    pub fn arrival(important: bool) -> Self {
        Self {
            asset: NOTIFICATION_SOUND,
            volume: if important { 0.7 } else { 0.5 },
            kind: SoundKind::Arrival,
        }
    }

    pub fn celebration() -> Self {
        Self {
            asset: NOTIFICATION_SOUND,
            volume: 0.5,
            kind: SoundKind::Celebration,
        }
    }

    pub fn deferred() -> Self {
        Self {
            asset: NOTIFICATION_SOUND,
            volume: 0.5,
            kind: SoundKind::Deferred,
        }
    }
}

/// A desktop (system) notification.
#[derive(Debug, Clone, PartialEq)]
pub struct DesktopNotice {
    pub title: String,
    pub body: String,
    pub icon: &'static str,
    pub tag: String,
    pub require_interaction: bool,
    pub auto_close: Option<Duration>,
    /// Clicking the notice marks this notification read.
    pub mark_read_on_click: Option<i64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToastVariant {
    Default,
    Destructive,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Toast {
    pub title: String,
    pub description: String,
    pub duration: Duration,
    pub variant: ToastVariant,
}

impl Toast {
    pub fn new(title: impl Into<String>, description: impl Into<String>, duration: Duration) -> Self {
        Self {
            title: title.into(),
            description: description.into(),
            duration,
            variant: ToastVariant::Default,
        }
    }

    pub fn destructive(title: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            description: description.into(),
            duration: Duration::from_millis(5000),
            variant: ToastVariant::Destructive,
        }
    }
}
