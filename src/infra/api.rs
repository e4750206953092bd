use anyhow::{anyhow, Result};
use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response};
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, warn};
use url::Url;

use crate::config::AppConfig;
use crate::domain::notification::Notification;

/// The slice of the marketplace REST API the tracker talks to.
#[async_trait]
pub trait NotificationApi: Send + Sync {
    async fn list_for_user(&self, user_id: i64) -> Result<Vec<Notification>>;

    async fn mark_read(&self, notification_id: i64) -> Result<()>;

    async fn mark_all_read(&self, user_id: i64) -> Result<()>;
}

#[derive(Clone)]
pub struct HttpNotificationApi {
    client: Client,
    base_url: Url,
    token: Option<String>,
}

impl HttpNotificationApi {
    pub fn new(base_url: Url, token: Option<String>, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|err| anyhow!("failed to build http client: {}", err))?;
        Ok(Self {
            client,
            base_url,
            token,
        })
    }

    pub fn from_config(config: &AppConfig) -> Result<Self> {
        Self::new(
            config.api_base_url.clone(),
            config.api_token.clone(),
            Duration::from_secs(config.request_timeout_seconds),
        )
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}{}", self.base_url.as_str().trim_end_matches('/'), path)
    }

    fn authorize(&self, builder: RequestBuilder) -> RequestBuilder {
        match &self.token {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        }
    }

    async fn send(&self, builder: RequestBuilder, what: &str) -> Result<Response> {
        let response = self
            .authorize(builder)
            .send()
            .await
            .map_err(|err| anyhow!("{} failed: {}", what, err))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(anyhow!("{} returned {}: {}", what, status, body));
        }
        Ok(response)
    }
}

#[async_trait]
impl NotificationApi for HttpNotificationApi {
    async fn list_for_user(&self, user_id: i64) -> Result<Vec<Notification>> {
        let url = self.endpoint(&format!("/api/notifications/user/{}", user_id));
        let response = self
            .send(self.client.get(&url), "list notifications")
            .await?;

        let rows: Vec<Value> = response
            .json()
            .await
            .map_err(|err| anyhow!("invalid notification list: {}", err))?;

        let mut notifications = Vec::with_capacity(rows.len());
        for row in rows {
            match serde_json::from_value::<Notification>(row) {
                Ok(notification) => notifications.push(notification),
                Err(err) => {
                    warn!(error = %err, user_id, "skipping malformed notification");
                }
            }
        }

        debug!(user_id, count = notifications.len(), "fetched notifications");
        Ok(notifications)
    }

    async fn mark_read(&self, notification_id: i64) -> Result<()> {
        let url = self.endpoint(&format!("/api/notifications/{}/read", notification_id));
        self.send(self.client.put(&url), "mark notification read")
            .await?;
        Ok(())
    }

    async fn mark_all_read(&self, user_id: i64) -> Result<()> {
        let url = self.endpoint(&format!("/api/notifications/user/{}/read-all", user_id));
        self.send(self.client.put(&url), "mark all notifications read")
            .await?;
        Ok(())
    }
}
