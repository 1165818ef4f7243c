use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, header::HeaderMap};
use serde::{Deserialize, Serialize};

use crate::application::services::webhook::{DeliveryError, WebhookClient};

pub const REQUEST_ID_HEADER: &str = "X-Request-Id";

#[derive(Clone, Debug)]
pub struct WebhookConfig {
    pub url: String,
    pub timeout: Duration,
}

/// Posts messages as JSON to a single webhook endpoint.
pub struct HttpWebhookClient {
    http: Client,
    url: String,
    timeout: Duration,
}

impl HttpWebhookClient {
    pub fn new(config: &WebhookConfig) -> anyhow::Result<Arc<Self>> {
        let http = Client::builder()
            .user_agent("message-dispatcher/webhook")
            .timeout(config.timeout)
            .build()?;
        Ok(Arc::new(Self {
            http,
            url: config.url.clone(),
            timeout: config.timeout,
        }))
    }

    fn header_id(headers: &HeaderMap) -> Option<String> {
        headers
            .get(REQUEST_ID_HEADER)
            .and_then(|value| value.to_str().ok())
            .map(str::trim)
            .filter(|value| !value.is_empty())
            .map(str::to_string)
    }
}

#[async_trait]
impl WebhookClient for HttpWebhookClient {
    async fn deliver(
        &self,
        content: &str,
        recipient: &str,
    ) -> Result<Option<String>, DeliveryError> {
        let response = self
            .http
            .post(&self.url)
            .json(&WebhookPayload { content, recipient })
            .send()
            .await
            .map_err(|err| {
                if err.is_timeout() {
                    DeliveryError::Timeout(self.timeout)
                } else {
                    DeliveryError::Transport(err)
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(DeliveryError::Status(status.as_u16()));
        }

        if let Some(id) = Self::header_id(response.headers()) {
            return Ok(Some(id));
        }

        // The body is optional; an unreadable one still counts as delivered.
        let body = response.bytes().await.unwrap_or_default();
        Ok(serde_json::from_slice::<WebhookResponse>(&body)
            .ok()
            .and_then(|body| body.message_id)
            .filter(|id| !id.trim().is_empty()))
    }
}

#[derive(Debug, Serialize)]
struct WebhookPayload<'a> {
    content: &'a str,
    recipient: &'a str,
}

#[derive(Debug, Deserialize)]
struct WebhookResponse {
    #[serde(rename = "messageId")]
    message_id: Option<String>,
}
