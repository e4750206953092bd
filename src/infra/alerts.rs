use async_trait::async_trait;
use thiserror::Error;
use tracing::info;

use crate::domain::alert::{DesktopNotice, Permission, SoundCue, Toast};

#[derive(Debug, Error)]
pub enum AlertError {
    #[error("audio playback blocked: {0}")]
    PlaybackBlocked(String),
    #[error("desktop notifications are not supported")]
    Unsupported,
    #[error("platform error: {0}")]
    Platform(String),
}

/// Effects the host platform knows how to produce: audio, vibration, system
/// notifications and in-page toasts.
#[async_trait]
pub trait AlertSink: Send + Sync {
    fn play_sound(&self, cue: &SoundCue) -> Result<(), AlertError>;

    fn vibrate(&self, pattern: &[u64]);

    fn show_desktop(&self, notice: &DesktopNotice) -> Result<(), AlertError>;

    fn toast(&self, toast: &Toast);

    async fn request_permission(&self) -> Result<Permission, AlertError>;
}

/// Headless sink that writes every effect to the log.
#[derive(Debug, Clone)]
pub struct TracingAlertSink {
    permission: Permission,
}

impl TracingAlertSink {
    pub fn new(permission: Permission) -> Self {
        Self { permission }
    }
}

#[async_trait]
impl AlertSink for TracingAlertSink {
    fn play_sound(&self, cue: &SoundCue) -> Result<(), AlertError> {
        info!(asset = cue.asset, volume = cue.volume, kind = ?cue.kind, "sound");
        Ok(())
    }

    fn vibrate(&self, pattern: &[u64]) {
        info!(pattern = ?pattern, "vibrate");
    }

    fn show_desktop(&self, notice: &DesktopNotice) -> Result<(), AlertError> {
        info!(
            tag = %notice.tag,
            title = %notice.title,
            body = %notice.body,
            require_interaction = notice.require_interaction,
            "desktop notification"
        );
        Ok(())
    }

    fn toast(&self, toast: &Toast) {
        info!(
            title = %toast.title,
            description = %toast.description,
            duration_ms = toast.duration.as_millis() as u64,
            "toast"
        );
    }

    async fn request_permission(&self) -> Result<Permission, AlertError> {
        Ok(self.permission)
    }
}
