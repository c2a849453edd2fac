// Constants module - centralized names and default values
//
// Every remote resource this service creates on a Fastly version carries
// the imageopto prefix so it can be identified (and removed) by name.

// =============================================================================
// Derived resource names
// =============================================================================

/// Name of the request setting and its condition toggled by the push action
pub const IMAGE_OPTIMIZATION_NAME: &str = "imageopto_image_optimization";

/// VCL boolean expression attached to the request-setting condition
pub const CONDITION_STATEMENT: &str = "req.http.x-pass";

/// Condition type tag (evaluated during the request phase)
pub const CONDITION_TYPE: &str = "REQUEST";

/// Condition priority (lower evaluates first within the same type)
pub const CONDITION_PRIORITY: u32 = 5;

/// Priority for uploaded VCL snippets within their phase
pub const SNIPPET_PRIORITY: u32 = 10;

// =============================================================================
// Snippet templates
// =============================================================================

/// Default directory holding the VCL snippet templates
pub const DEFAULT_SNIPPET_PATH: &str = "vcl_snippets_image_optimizations";

/// Template file for the recv phase
pub const RECV_SNIPPET_FILE: &str = "recv.vcl";

// =============================================================================
// Fastly API defaults
// =============================================================================

/// Default Fastly API base URL
pub const DEFAULT_API_URL: &str = "https://api.fastly.com";

/// Default Fastly API request timeout in seconds
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;

// =============================================================================
// Image settings defaults
// =============================================================================

/// Default JPEG quality pushed to the image optimizer (1-100)
pub const DEFAULT_IMAGE_QUALITY: u8 = 85;

/// Suffix of the io_settings document id (`<service>-<version>-imageopto`)
pub const IO_SETTINGS_ID_SUFFIX: &str = "imageopto";

// =============================================================================
// Webhook defaults
// =============================================================================

/// Default webhook delivery timeout in seconds
pub const DEFAULT_WEBHOOK_TIMEOUT_SECS: u64 = 10;

/// Default username attached to webhook messages
pub const DEFAULT_WEBHOOK_USERNAME: &str = "fastly";

/// Default emoji attached to webhook messages
pub const DEFAULT_WEBHOOK_ICON: &str = ":airplane:";

// =============================================================================
// Server defaults
// =============================================================================

/// Default admin endpoint bind address
pub const DEFAULT_SERVER_ADDRESS: &str = "127.0.0.1";

/// Default admin endpoint port
pub const DEFAULT_SERVER_PORT: u16 = 8080;
