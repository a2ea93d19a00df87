use std::fmt::Debug;

use async_trait::async_trait;
use reqwest::{header, Client};
use serde::Serialize;

use crate::common::errors::DeliveryError;

/// Posts one message to a chat webhook. Implementations never retry.
#[async_trait]
pub trait Notifier: Debug + Send + Sync {
    async fn send(&self, endpoint: &str, username: &str, content: &str)
        -> Result<(), DeliveryError>;
}

#[derive(Debug, Serialize)]
pub struct WebhookMessage<'a> {
    pub username: &'a str,
    pub content: &'a str,
}

#[derive(Debug, Clone)]
pub struct WebhookClient {
    client: Client,
}

impl WebhookClient {
    pub fn new(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl Notifier for WebhookClient {
    #[tracing::instrument(name = "Posting to webhook", skip(self, endpoint, content))]
    async fn send(
        &self,
        endpoint: &str,
        username: &str,
        content: &str,
    ) -> Result<(), DeliveryError> {
        let response = self
            .client
            .post(endpoint)
            .header(header::ACCEPT, "application/json")
            .header(header::CONTENT_TYPE, "application/json")
            .json(&WebhookMessage { username, content })
            .send()
            .await
            // the webhook URL embeds its token
            .map_err(|err| DeliveryError::Transport(err.without_url()))?;

        let status = response.status();
        if status.is_success() {
            return Ok(());
        }

        let body = response.text().await.unwrap_or_default();
        Err(DeliveryError::Rejected { status, body })
    }
}
