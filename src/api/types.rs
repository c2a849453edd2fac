//! Wire types for the Fastly configuration API
//!
//! Transient records exchanged with the versioned-configuration endpoints.
//! Nothing here is persisted locally; every struct is a snapshot fetched at
//! request time or a payload built for a single mutation.

use serde::{Deserialize, Serialize};

use crate::constants::IO_SETTINGS_ID_SUFFIX;

/// A Fastly service: identifier plus its ordered version list
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Service {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub versions: Vec<Version>,
}

/// One configuration version of a service
///
/// Mutable only via the remote clone/activate operations; the `active`
/// flag comes back as `null` on never-activated drafts.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Version {
    pub number: u64,
    #[serde(default)]
    pub active: Option<bool>,
}

impl Version {
    pub fn is_active(&self) -> bool {
        self.active.unwrap_or(false)
    }
}

/// A named boolean rule attached to a version
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Condition {
    pub name: String,
    pub statement: String,
    #[serde(rename = "type")]
    pub condition_type: String,
    pub priority: u32,
}

/// A request setting referencing a condition by name
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RequestSetting {
    pub name: String,
    pub service_id: String,
    pub version: u64,
    pub request_condition: String,
}

/// A named VCL fragment inserted at a specific processing phase
///
/// `dynamic` is serialized as the string `"0"`: these snippets are
/// versioned, so they only take effect when the version is activated.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Snippet {
    pub name: String,
    #[serde(rename = "type")]
    pub snippet_type: String,
    pub dynamic: String,
    pub content: String,
    pub priority: u32,
}

/// Image optimizer default settings, JSON:API document shape
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct IoSettings {
    pub data: IoSettingsData,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct IoSettingsData {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub attributes: IoSettingsAttributes,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct IoSettingsAttributes {
    pub jpeg_quality: u8,
}

impl IoSettings {
    /// Build the settings document for a service/version pair
    ///
    /// The document id follows the `<service>-<version>-imageopto` scheme.
    pub fn new(service_id: &str, version: u64, jpeg_quality: u8) -> Self {
        Self {
            data: IoSettingsData {
                id: format!("{}-{}-{}", service_id, version, IO_SETTINGS_ID_SUFFIX),
                kind: "io_settings".to_string(),
                attributes: IoSettingsAttributes { jpeg_quality },
            },
        }
    }
}

/// Result of a remote version validation check
#[derive(Debug, Clone, Deserialize)]
pub struct ValidationResult {
    pub status: String,
    #[serde(default)]
    pub errors: Vec<String>,
    #[serde(default)]
    pub message: Option<String>,
}

impl ValidationResult {
    pub fn is_ok(&self) -> bool {
        self.status == "ok"
    }

    /// Human-readable failure summary for error reporting
    pub fn failure_summary(&self) -> String {
        if !self.errors.is_empty() {
            self.errors.join("; ")
        } else if let Some(message) = &self.message {
            message.clone()
        } else {
            "validation failed".to_string()
        }
    }
}
