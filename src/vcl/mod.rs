//! Active-version resolution
//!
//! The admin UI submits the version number it believes is active. Before
//! any mutation the service re-derives the active version from the remote
//! version list and compares the two; a mismatch means the caller's view
//! is stale and the whole action aborts before touching anything.

use crate::api::types::{Service, Version};
use crate::error::PushError;

/// Message surfaced when the caller's active version is stale
pub const MISMATCH_MESSAGE: &str = "Active versions mismatch.";

/// Resolved version numbers for a service
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VersionInfo {
    /// The version currently flagged active
    pub active_version: u64,
    /// The number the next draft would receive
    pub next_version: u64,
}

/// Scan a version list for the active version and the next draft number
pub fn determine_versions(versions: &[Version]) -> Result<VersionInfo, PushError> {
    let active_version = versions
        .iter()
        .find(|v| v.is_active())
        .map(|v| v.number)
        .ok_or_else(|| PushError::Validation("Service has no active version.".to_string()))?;

    let next_version = versions.iter().map(|v| v.number).max().unwrap_or(0) + 1;

    Ok(VersionInfo {
        active_version,
        next_version,
    })
}

/// Resolve the active version and validate it against the caller's claim
///
/// The `expected` value is the raw request parameter; anything that does
/// not parse as a version number is treated as a mismatch.
pub fn active_version(service: &Service, expected: &str) -> Result<VersionInfo, PushError> {
    let info = determine_versions(&service.versions)?;

    let expected_number: Option<u64> = expected.trim().parse().ok();
    if expected_number != Some(info.active_version) {
        return Err(PushError::Validation(MISMATCH_MESSAGE.to_string()));
    }

    Ok(info)
}
