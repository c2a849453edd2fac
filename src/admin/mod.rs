//! Admin HTTP surface
//!
//! Routes the push-image-settings endpoint and maps action outcomes to the
//! in-band JSON contract: HTTP 200 with `{"status": true}` on success and
//! `{"status": false, "msg": ...}` on any failure.

use std::collections::HashMap;

use pingora_http::ResponseHeader;
use pingora_proxy::Session;

use crate::handler::{PushImageSettings, PushParams};

/// Path of the image-optimization toggle endpoint
pub const PUSH_IMAGE_SETTINGS_PATH: &str = "/imageopto/push";

/// Check if the path is handled by the admin module
pub fn is_handled_path(path: &str) -> bool {
    path == PUSH_IMAGE_SETTINGS_PATH
}

/// Parse an application/x-www-form-urlencoded string into key-value pairs
///
/// Used for both query strings and POST bodies; values are URL-decoded.
pub fn parse_urlencoded(input: &str) -> HashMap<String, String> {
    let mut params = HashMap::new();
    for pair in input.split('&') {
        if let Some((key, value)) = pair.split_once('=') {
            params.insert(
                key.to_string(),
                urlencoding::decode(value).unwrap_or_default().to_string(),
            );
        }
    }
    params
}

/// Handle a request to the admin endpoint
/// Returns true if the request was handled, false otherwise
pub async fn handle_request(
    session: &mut Session,
    path: &str,
    method: &str,
    params: &HashMap<String, String>,
    handler: &PushImageSettings,
) -> bool {
    if !is_handled_path(path) {
        return false;
    }

    if method != "POST" {
        let _ = send_json_response(
            session,
            405,
            serde_json::json!({
                "status": false,
                "msg": "POST required"
            }),
        )
        .await;
        return true;
    }

    let push_params = PushParams::from_query(params);

    tracing::debug!(
        active_version = %push_params.active_version,
        activate = push_params.activate,
        push_quality = push_params.push_quality,
        "Handling push image settings request"
    );

    // Action failures are reported in-band with HTTP 200, never as error
    // status codes. The admin UI reads the status field from the body.
    match handler.execute(&push_params).await {
        Ok(_) => {
            let _ = send_json_response(session, 200, serde_json::json!({"status": true})).await;
        }
        Err(e) => {
            tracing::warn!(error = %e, "Push image settings request failed");
            let _ = send_json_response(
                session,
                200,
                serde_json::json!({
                    "status": false,
                    "msg": e.to_string()
                }),
            )
            .await;
        }
    }

    true
}

/// Helper to send JSON response
pub(crate) async fn send_json_response(
    session: &mut Session,
    status: u16,
    body: serde_json::Value,
) -> pingora_core::Result<()> {
    let body_str = body.to_string();
    let mut header = ResponseHeader::build(status, None)?;
    header.insert_header("Content-Type", "application/json")?;
    header.insert_header("Content-Length", body_str.len().to_string())?;

    session
        .write_response_header(Box::new(header), false)
        .await?;
    session
        .write_response_body(Some(body_str.into()), true)
        .await?;
    Ok(())
}
