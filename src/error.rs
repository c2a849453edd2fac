// Error types module

use std::fmt;

use crate::api::ApiError;

/// Error type for the push-image-settings action
///
/// Keeps validation failures (caller state is stale, nothing was mutated)
/// distinguishable from remote API failures (a draft version may have been
/// left behind in a partial state). Both flatten to the same in-band
/// `{"status": false, "msg": ...}` response shape at the HTTP layer.
#[derive(Debug)]
pub enum PushError {
    /// Pre-mutation validation failed (active version mismatch, no active
    /// version found)
    Validation(String),

    /// A remote call against the Fastly API or the webhook endpoint failed
    Api(ApiError),

    /// A VCL snippet template could not be loaded
    Template(String),
}

impl fmt::Display for PushError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PushError::Validation(msg) => write!(f, "{}", msg),
            PushError::Api(e) => write!(f, "{}", e),
            PushError::Template(msg) => write!(f, "Snippet template error: {}", msg),
        }
    }
}

impl std::error::Error for PushError {}

impl From<ApiError> for PushError {
    fn from(e: ApiError) -> Self {
        PushError::Api(e)
    }
}
