//! Fastly configuration API client
//!
//! This module defines the seam between the push action and the remote
//! versioned-configuration service: the [`FastlyApi`] trait covers every
//! remote operation the action performs, and [`HttpFastlyApi`] is the
//! reqwest-backed implementation. Tests substitute a recording mock.

use async_trait::async_trait;
use thiserror::Error;

pub mod client;
pub mod types;

pub use client::HttpFastlyApi;
use types::{Condition, IoSettings, RequestSetting, Service, Snippet, Version};

/// Error type for remote API operations
#[derive(Error, Debug)]
pub enum ApiError {
    /// The request never completed (connection, TLS, timeout)
    #[error("Fastly request failed: {0}")]
    Transport(String),

    /// The API answered with an unexpected HTTP status
    #[error("Fastly returned HTTP {status}: {body}")]
    Status { status: u16, body: String },

    /// The response body could not be decoded
    #[error("Failed to decode Fastly response: {0}")]
    Decode(String),

    /// The remote validation check rejected the version
    #[error("Version {0} failed validation: {1}")]
    InvalidVersion(u64, String),

    /// The webhook endpoint rejected or never received the notification
    #[error("Webhook delivery failed: {0}")]
    Webhook(String),
}

/// Remote operations against the versioned-configuration service
///
/// All calls are sequential and blocking from the caller's point of view;
/// there is no retry policy at this layer. Failures surface as [`ApiError`]
/// and abort the enclosing action.
#[async_trait]
pub trait FastlyApi: Send + Sync {
    /// Fetch the service snapshot including its version list
    async fn service_details(&self) -> Result<Service, ApiError>;

    /// Clone a version into a new mutable draft
    async fn clone_version(&self, version: u64) -> Result<Version, ApiError>;

    /// Look up a request setting by name; `None` when it does not exist
    async fn get_request_setting(
        &self,
        version: u64,
        name: &str,
    ) -> Result<Option<RequestSetting>, ApiError>;

    /// Create a request setting on a version
    async fn create_request_setting(
        &self,
        version: u64,
        setting: &RequestSetting,
    ) -> Result<RequestSetting, ApiError>;

    /// Delete a request setting by name
    async fn delete_request_setting(&self, version: u64, name: &str) -> Result<(), ApiError>;

    /// Create a condition on a version
    async fn create_condition(
        &self,
        version: u64,
        condition: &Condition,
    ) -> Result<Condition, ApiError>;

    /// Upload a VCL snippet to a version
    async fn upload_snippet(&self, version: u64, snippet: &Snippet) -> Result<(), ApiError>;

    /// Check whether a snippet with the given name exists on a version
    async fn has_snippet(&self, version: u64, name: &str) -> Result<bool, ApiError>;

    /// Remove a snippet by name
    async fn remove_snippet(&self, version: u64, name: &str) -> Result<(), ApiError>;

    /// Push image optimizer default settings for a version
    async fn configure_image_settings(
        &self,
        version: u64,
        settings: &IoSettings,
    ) -> Result<(), ApiError>;

    /// Ask the remote service to validate a version's configuration
    async fn validate_version(&self, version: u64) -> Result<(), ApiError>;

    /// Activate a version, promoting it to live
    async fn activate_version(&self, version: u64) -> Result<Version, ApiError>;

    /// Send a notification message to the configured webhook channel
    async fn send_webhook(&self, text: &str) -> Result<(), ApiError>;
}
