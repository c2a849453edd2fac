//! HTTP implementation of the Fastly configuration API
//!
//! Thin wrappers over the versioned-configuration endpoints. Every request
//! carries the `Fastly-Key` header and a fixed timeout; there is no retry
//! policy - a failed call aborts the enclosing action.

use async_trait::async_trait;
use std::time::Duration;

use super::types::{
    Condition, IoSettings, RequestSetting, Service, Snippet, ValidationResult, Version,
};
use super::{ApiError, FastlyApi};
use crate::config::{FastlyConfig, WebhookConfig};

/// reqwest-backed client for one Fastly service
pub struct HttpFastlyApi {
    http: reqwest::Client,
    webhook_http: reqwest::Client,
    api_url: String,
    service_id: String,
    api_token: String,
    webhooks: WebhookConfig,
}

impl HttpFastlyApi {
    /// Build a client from the Fastly and webhook configuration sections
    pub fn new(fastly: &FastlyConfig, webhooks: WebhookConfig) -> Result<Self, ApiError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(fastly.timeout_secs))
            .build()
            .map_err(|e| ApiError::Transport(format!("Failed to create HTTP client: {}", e)))?;

        let webhook_http = reqwest::Client::builder()
            .timeout(Duration::from_secs(webhooks.timeout_secs))
            .build()
            .map_err(|e| ApiError::Transport(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            http,
            webhook_http,
            api_url: fastly.api_url.trim_end_matches('/').to_string(),
            service_id: fastly.service_id.clone(),
            api_token: fastly.api_token.clone(),
            webhooks,
        })
    }

    /// Build a service-scoped endpoint URL
    fn url(&self, path: &str) -> String {
        format!("{}/service/{}/{}", self.api_url, self.service_id, path)
    }

    fn version_url(&self, version: u64, path: &str) -> String {
        self.url(&format!("version/{}/{}", version, path))
    }

    /// Map a transport-level reqwest failure to an ApiError
    fn transport_error(e: reqwest::Error) -> ApiError {
        if e.is_timeout() {
            ApiError::Transport("Request timed out".to_string())
        } else if e.is_connect() {
            ApiError::Transport(format!("Connection failed: {}", e))
        } else {
            ApiError::Transport(format!("Request failed: {}", e))
        }
    }

    /// Turn a non-success response into a Status error with the body text
    async fn status_error(response: reqwest::Response) -> ApiError {
        let status = response.status().as_u16();
        let body = response.text().await.unwrap_or_default();
        ApiError::Status { status, body }
    }

    async fn decode<T: serde::de::DeserializeOwned>(
        response: reqwest::Response,
    ) -> Result<T, ApiError> {
        response
            .json::<T>()
            .await
            .map_err(|e| ApiError::Decode(format!("Invalid JSON: {}", e)))
    }

    async fn send(&self, request: reqwest::RequestBuilder) -> Result<reqwest::Response, ApiError> {
        let response = request
            .header("Fastly-Key", &self.api_token)
            .header("Accept", "application/json")
            .send()
            .await
            .map_err(Self::transport_error)?;

        if response.status().is_success() {
            Ok(response)
        } else {
            Err(Self::status_error(response).await)
        }
    }

    /// Like `send`, but reports a missing resource as `None` instead of an error
    async fn send_allowing_not_found(
        &self,
        request: reqwest::RequestBuilder,
    ) -> Result<Option<reqwest::Response>, ApiError> {
        let response = request
            .header("Fastly-Key", &self.api_token)
            .header("Accept", "application/json")
            .send()
            .await
            .map_err(Self::transport_error)?;

        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Ok(None);
        }

        if response.status().is_success() {
            Ok(Some(response))
        } else {
            Err(Self::status_error(response).await)
        }
    }
}

/// Build the webhook message payload
///
/// Slack-style incoming-webhook document; the channel key is present only
/// when an override is configured.
fn webhook_payload(webhooks: &WebhookConfig, text: &str) -> serde_json::Value {
    let mut payload = serde_json::json!({
        "text": text,
        "username": webhooks.username,
        "icon_emoji": webhooks.icon_emoji,
    });

    if let Some(channel) = &webhooks.channel {
        payload["channel"] = serde_json::Value::String(channel.clone());
    }

    payload
}

#[async_trait]
impl FastlyApi for HttpFastlyApi {
    async fn service_details(&self) -> Result<Service, ApiError> {
        let response = self.send(self.http.get(self.url("details"))).await?;
        Self::decode(response).await
    }

    async fn clone_version(&self, version: u64) -> Result<Version, ApiError> {
        tracing::debug!(version, "Cloning service version");
        let response = self
            .send(self.http.put(self.version_url(version, "clone")))
            .await?;
        let clone: Version = Self::decode(response).await?;
        tracing::info!(from = version, draft = clone.number, "Cloned service version");
        Ok(clone)
    }

    async fn get_request_setting(
        &self,
        version: u64,
        name: &str,
    ) -> Result<Option<RequestSetting>, ApiError> {
        let url = self.version_url(version, &format!("request_settings/{}", name));
        match self.send_allowing_not_found(self.http.get(url)).await? {
            Some(response) => Ok(Some(Self::decode(response).await?)),
            None => Ok(None),
        }
    }

    async fn create_request_setting(
        &self,
        version: u64,
        setting: &RequestSetting,
    ) -> Result<RequestSetting, ApiError> {
        tracing::debug!(version, name = %setting.name, "Creating request setting");
        let response = self
            .send(
                self.http
                    .post(self.version_url(version, "request_settings"))
                    .form(setting),
            )
            .await?;
        Self::decode(response).await
    }

    async fn delete_request_setting(&self, version: u64, name: &str) -> Result<(), ApiError> {
        tracing::debug!(version, name, "Deleting request setting");
        let url = self.version_url(version, &format!("request_settings/{}", name));
        self.send(self.http.delete(url)).await?;
        Ok(())
    }

    async fn create_condition(
        &self,
        version: u64,
        condition: &Condition,
    ) -> Result<Condition, ApiError> {
        tracing::debug!(version, name = %condition.name, "Creating condition");
        let response = self
            .send(
                self.http
                    .post(self.version_url(version, "condition"))
                    .form(condition),
            )
            .await?;
        Self::decode(response).await
    }

    async fn upload_snippet(&self, version: u64, snippet: &Snippet) -> Result<(), ApiError> {
        tracing::debug!(version, name = %snippet.name, "Uploading VCL snippet");
        self.send(
            self.http
                .post(self.version_url(version, "snippet"))
                .form(snippet),
        )
        .await?;
        Ok(())
    }

    async fn has_snippet(&self, version: u64, name: &str) -> Result<bool, ApiError> {
        let url = self.version_url(version, &format!("snippet/{}", name));
        Ok(self
            .send_allowing_not_found(self.http.get(url))
            .await?
            .is_some())
    }

    async fn remove_snippet(&self, version: u64, name: &str) -> Result<(), ApiError> {
        tracing::debug!(version, name, "Removing VCL snippet");
        let url = self.version_url(version, &format!("snippet/{}", name));
        self.send(self.http.delete(url)).await?;
        Ok(())
    }

    async fn configure_image_settings(
        &self,
        version: u64,
        settings: &IoSettings,
    ) -> Result<(), ApiError> {
        tracing::debug!(version, id = %settings.data.id, "Pushing image optimizer settings");
        self.send(
            self.http
                .patch(self.version_url(version, "io_settings"))
                .json(settings)
                .header("Content-Type", "application/vnd.api+json"),
        )
        .await?;
        Ok(())
    }

    async fn validate_version(&self, version: u64) -> Result<(), ApiError> {
        let response = self
            .send(self.http.get(self.version_url(version, "validate")))
            .await?;
        let result: ValidationResult = Self::decode(response).await?;

        if result.is_ok() {
            Ok(())
        } else {
            Err(ApiError::InvalidVersion(version, result.failure_summary()))
        }
    }

    async fn activate_version(&self, version: u64) -> Result<Version, ApiError> {
        tracing::info!(version, "Activating service version");
        let response = self
            .send(self.http.put(self.version_url(version, "activate")))
            .await?;
        Self::decode(response).await
    }

    async fn send_webhook(&self, text: &str) -> Result<(), ApiError> {
        let url = self
            .webhooks
            .url
            .as_ref()
            .ok_or_else(|| ApiError::Webhook("No webhook URL configured".to_string()))?;

        let payload = webhook_payload(&self.webhooks, text);

        let response = self
            .webhook_http
            .post(url)
            .json(&payload)
            .send()
            .await
            .map_err(|e| ApiError::Webhook(e.to_string()))?;

        if response.status().is_success() {
            Ok(())
        } else {
            Err(ApiError::Webhook(format!(
                "HTTP {} response",
                response.status()
            )))
        }
    }
}
