#![allow(dead_code)]

use std::collections::VecDeque;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use axum::extract::{Path, State};
use axum::http::{HeaderMap, StatusCode};
use axum::routing::{get, put};
use axum::{Json, Router};
use serde_json::{json, Value};
use time::format_description::well_known::Rfc3339;
use time::macros::datetime;
use tower_http::trace::TraceLayer;
use url::Url;

use siraha_tracker::domain::alert::{DesktopNotice, Permission, SoundCue, SoundKind, Toast};
use siraha_tracker::domain::notification::Notification;
use siraha_tracker::infra::alerts::{AlertError, AlertSink};
use siraha_tracker::infra::api::NotificationApi;

pub const USER_ID: i64 = 7;

// ---------------------------------------------------------------------------
// Fixtures
// ---------------------------------------------------------------------------

/// Wire-format row. `minute` orders rows: later minutes are newer.
pub fn notification_json(
    id: i64,
    user_id: i64,
    kind: &str,
    title: &str,
    message: &str,
    is_read: bool,
    minute: i64,
) -> Value {
    let created_at = (datetime!(2024-05-01 10:00 UTC) + time::Duration::minutes(minute))
        .format(&Rfc3339)
        .unwrap();
    json!({
        "id": id,
        "userId": user_id,
        "type": kind,
        "title": title,
        "message": message,
        "isRead": is_read,
        "createdAt": created_at,
    })
}

pub fn notification(id: i64, kind: &str, title: &str, message: &str, is_read: bool) -> Notification {
    serde_json::from_value(notification_json(
        id, USER_ID, kind, title, message, is_read, id,
    ))
    .unwrap()
}

pub fn unread(id: i64) -> Notification {
    notification(id, "generic", &format!("Update {}", id), "Something changed", false)
}

pub fn order_approved(id: i64) -> Notification {
    notification(
        id,
        "generic",
        "Order Approved",
        "Your store was approved",
        false,
    )
}

// ---------------------------------------------------------------------------
// RecordingAlertSink
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub enum Effect {
    Sound(SoundCue),
    Vibrate(Vec<u64>),
    Desktop(DesktopNotice),
    Toast(Toast),
}

/// Records every effect in call order.
pub struct RecordingAlertSink {
    effects: Mutex<Vec<Effect>>,
    audio_blocked: AtomicBool,
    permission_answer: Mutex<Permission>,
    permission_requests: AtomicUsize,
}

impl RecordingAlertSink {
    pub fn new() -> Arc<Self> {
        Self::answering(Permission::Granted)
    }

    pub fn answering(permission: Permission) -> Arc<Self> {
        Arc::new(Self {
            effects: Mutex::new(Vec::new()),
            audio_blocked: AtomicBool::new(false),
            permission_answer: Mutex::new(permission),
            permission_requests: AtomicUsize::new(0),
        })
    }

    pub fn block_audio(&self) {
        self.audio_blocked.store(true, Ordering::SeqCst);
    }

    pub fn effects(&self) -> Vec<Effect> {
        self.effects.lock().unwrap().clone()
    }

    pub fn clear(&self) {
        self.effects.lock().unwrap().clear();
    }

    pub fn sounds(&self) -> Vec<SoundCue> {
        self.effects()
            .into_iter()
            .filter_map(|effect| match effect {
                Effect::Sound(cue) => Some(cue),
                _ => None,
            })
            .collect()
    }

    pub fn sounds_of(&self, kind: SoundKind) -> usize {
        self.sounds().iter().filter(|cue| cue.kind == kind).count()
    }

    pub fn vibrations(&self) -> usize {
        self.effects()
            .iter()
            .filter(|effect| matches!(effect, Effect::Vibrate(_)))
            .count()
    }

    pub fn desktop(&self) -> Vec<DesktopNotice> {
        self.effects()
            .into_iter()
            .filter_map(|effect| match effect {
                Effect::Desktop(notice) => Some(notice),
                _ => None,
            })
            .collect()
    }

    pub fn toasts(&self) -> Vec<Toast> {
        self.effects()
            .into_iter()
            .filter_map(|effect| match effect {
                Effect::Toast(toast) => Some(toast),
                _ => None,
            })
            .collect()
    }

    pub fn permission_requests(&self) -> usize {
        self.permission_requests.load(Ordering::SeqCst)
    }

    fn record(&self, effect: Effect) {
        self.effects.lock().unwrap().push(effect);
    }
}

#[async_trait]
impl AlertSink for RecordingAlertSink {
    fn play_sound(&self, cue: &SoundCue) -> Result<(), AlertError> {
        if self.audio_blocked.load(Ordering::SeqCst) {
            return Err(AlertError::PlaybackBlocked("autoplay policy".to_string()));
        }
        self.record(Effect::Sound(cue.clone()));
        Ok(())
    }

    fn vibrate(&self, pattern: &[u64]) {
        self.record(Effect::Vibrate(pattern.to_vec()));
    }

    fn show_desktop(&self, notice: &DesktopNotice) -> Result<(), AlertError> {
        self.record(Effect::Desktop(notice.clone()));
        Ok(())
    }

    fn toast(&self, toast: &Toast) {
        self.record(Effect::Toast(toast.clone()));
    }

    async fn request_permission(&self) -> Result<Permission, AlertError> {
        self.permission_requests.fetch_add(1, Ordering::SeqCst);
        Ok(*self.permission_answer.lock().unwrap())
    }
}

// ---------------------------------------------------------------------------
// ScriptedApi: in-memory NotificationApi for paused-clock tests
// ---------------------------------------------------------------------------

pub struct ScriptedApi {
    rows: Mutex<Vec<Notification>>,
    list_delays: Mutex<VecDeque<Duration>>,
    failing: AtomicBool,
    pub list_calls: AtomicUsize,
    pub mark_read_calls: AtomicUsize,
    pub mark_all_read_calls: AtomicUsize,
}

impl ScriptedApi {
    pub fn new(rows: Vec<Notification>) -> Arc<Self> {
        Arc::new(Self {
            rows: Mutex::new(rows),
            list_delays: Mutex::new(VecDeque::new()),
            failing: AtomicBool::new(false),
            list_calls: AtomicUsize::new(0),
            mark_read_calls: AtomicUsize::new(0),
            mark_all_read_calls: AtomicUsize::new(0),
        })
    }

    pub fn push(&self, notification: Notification) {
        self.rows.lock().unwrap().push(notification);
    }

    pub fn set_rows(&self, rows: Vec<Notification>) {
        *self.rows.lock().unwrap() = rows;
    }

    pub fn rows(&self) -> Vec<Notification> {
        self.rows.lock().unwrap().clone()
    }

    /// The next list call answers with today's rows, but only after `delay`.
    pub fn delay_next_list(&self, delay: Duration) {
        self.list_delays.lock().unwrap().push_back(delay);
    }

    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    pub fn lists(&self) -> usize {
        self.list_calls.load(Ordering::SeqCst)
    }

    pub fn mark_reads(&self) -> usize {
        self.mark_read_calls.load(Ordering::SeqCst)
    }

    pub fn mark_all_reads(&self) -> usize {
        self.mark_all_read_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl NotificationApi for ScriptedApi {
    async fn list_for_user(&self, user_id: i64) -> Result<Vec<Notification>> {
        self.list_calls.fetch_add(1, Ordering::SeqCst);
        if self.failing.load(Ordering::SeqCst) {
            return Err(anyhow!("connection refused"));
        }
        let rows: Vec<Notification> = self
            .rows
            .lock()
            .unwrap()
            .iter()
            .filter(|n| n.user_id == user_id)
            .cloned()
            .collect();
        let delay = self.list_delays.lock().unwrap().pop_front();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        Ok(rows)
    }

    async fn mark_read(&self, notification_id: i64) -> Result<()> {
        self.mark_read_calls.fetch_add(1, Ordering::SeqCst);
        if self.failing.load(Ordering::SeqCst) {
            return Err(anyhow!("connection refused"));
        }
        for row in self.rows.lock().unwrap().iter_mut() {
            if row.id == notification_id {
                row.is_read = true;
            }
        }
        Ok(())
    }

    async fn mark_all_read(&self, user_id: i64) -> Result<()> {
        self.mark_all_read_calls.fetch_add(1, Ordering::SeqCst);
        if self.failing.load(Ordering::SeqCst) {
            return Err(anyhow!("connection refused"));
        }
        for row in self.rows.lock().unwrap().iter_mut() {
            if row.user_id == user_id {
                row.is_read = true;
            }
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// MockServer: axum app serving the marketplace notification endpoints
// ---------------------------------------------------------------------------

#[derive(Default)]
pub struct MockState {
    pub rows: Mutex<Vec<Value>>,
    pub failing: AtomicBool,
    pub list_calls: AtomicUsize,
    pub mark_read_calls: AtomicUsize,
    pub mark_all_read_calls: AtomicUsize,
    pub last_authorization: Mutex<Option<String>>,
}

pub struct MockServer {
    pub addr: SocketAddr,
    pub state: Arc<MockState>,
}

impl MockServer {
    pub async fn start(rows: Vec<Value>) -> Self {
        let state = Arc::new(MockState {
            rows: Mutex::new(rows),
            ..MockState::default()
        });

        let router = Router::new()
            .route("/api/notifications/user/:user_id", get(list_for_user))
            .route("/api/notifications/:id/read", put(mark_read))
            .route("/api/notifications/user/:user_id/read-all", put(mark_all_read))
            .layer(TraceLayer::new_for_http())
            .with_state(Arc::clone(&state));

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });

        Self { addr, state }
    }

    pub fn base_url(&self) -> Url {
        Url::parse(&format!("http://{}/", self.addr)).unwrap()
    }

    pub fn set_failing(&self, failing: bool) {
        self.state.failing.store(failing, Ordering::SeqCst);
    }

    pub fn push(&self, row: Value) {
        self.state.rows.lock().unwrap().push(row);
    }

    pub fn rows(&self) -> Vec<Value> {
        self.state.rows.lock().unwrap().clone()
    }

    pub fn lists(&self) -> usize {
        self.state.list_calls.load(Ordering::SeqCst)
    }

    pub fn mark_reads(&self) -> usize {
        self.state.mark_read_calls.load(Ordering::SeqCst)
    }

    pub fn mark_all_reads(&self) -> usize {
        self.state.mark_all_read_calls.load(Ordering::SeqCst)
    }

    pub fn last_authorization(&self) -> Option<String> {
        self.state.last_authorization.lock().unwrap().clone()
    }
}

fn remember_auth(state: &MockState, headers: &HeaderMap) {
    let value = headers
        .get("authorization")
        .and_then(|value| value.to_str().ok())
        .map(str::to_string);
    *state.last_authorization.lock().unwrap() = value;
}

async fn list_for_user(
    State(state): State<Arc<MockState>>,
    Path(_user_id): Path<i64>,
    headers: HeaderMap,
) -> Result<Json<Vec<Value>>, StatusCode> {
    state.list_calls.fetch_add(1, Ordering::SeqCst);
    remember_auth(&state, &headers);
    if state.failing.load(Ordering::SeqCst) {
        return Err(StatusCode::INTERNAL_SERVER_ERROR);
    }
    // every stored row is returned, so client-side filtering is observable
    Ok(Json(state.rows.lock().unwrap().clone()))
}

async fn mark_read(
    State(state): State<Arc<MockState>>,
    Path(id): Path<i64>,
    headers: HeaderMap,
) -> StatusCode {
    state.mark_read_calls.fetch_add(1, Ordering::SeqCst);
    remember_auth(&state, &headers);
    if state.failing.load(Ordering::SeqCst) {
        return StatusCode::INTERNAL_SERVER_ERROR;
    }
    let mut rows = state.rows.lock().unwrap();
    let Some(row) = rows.iter_mut().find(|row| row["id"] == json!(id)) else {
        return StatusCode::NOT_FOUND;
    };
    row["isRead"] = json!(true);
    StatusCode::OK
}

async fn mark_all_read(
    State(state): State<Arc<MockState>>,
    Path(user_id): Path<i64>,
    headers: HeaderMap,
) -> StatusCode {
    state.mark_all_read_calls.fetch_add(1, Ordering::SeqCst);
    remember_auth(&state, &headers);
    if state.failing.load(Ordering::SeqCst) {
        return StatusCode::INTERNAL_SERVER_ERROR;
    }
    for row in state.rows.lock().unwrap().iter_mut() {
        if row["userId"] == json!(user_id) {
            row["isRead"] = json!(true);
        }
    }
    StatusCode::OK
}

/// Poll `check` on the real clock until it holds or two seconds pass.
pub async fn eventually<F>(mut check: F) -> bool
where
    F: FnMut() -> bool,
{
    for _ in 0..200 {
        if check() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    check()
}
