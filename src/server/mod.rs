// Server module - Pingora service for the admin endpoint
//
// Every request is answered in request_filter; nothing is ever proxied
// upstream. upstream_peer is therefore unreachable.

use async_trait::async_trait;
use pingora_core::upstreams::peer::HttpPeer;
use pingora_core::Result;
use pingora_http::RequestHeader;
use pingora_proxy::{ProxyHttp, Session};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;

use crate::admin;
use crate::api::HttpFastlyApi;
use crate::config::Config;
use crate::handler::PushImageSettings;
use crate::snippets::SnippetSource;

/// HTTP gateway serving the admin endpoint and health check
pub struct AdminGateway {
    handler: Arc<PushImageSettings>,
    /// Service start time (for uptime in /health)
    start_time: Instant,
}

impl AdminGateway {
    /// Wire the gateway from configuration
    pub fn new(config: &Config) -> std::result::Result<Self, String> {
        let api = HttpFastlyApi::new(&config.fastly, config.webhooks.clone())
            .map_err(|e| e.to_string())?;

        let handler = PushImageSettings::new(
            Arc::new(api),
            SnippetSource::from_config(&config.snippets),
            config.image.clone(),
            config.webhooks.clone(),
        );

        Ok(Self {
            handler: Arc::new(handler),
            start_time: Instant::now(),
        })
    }

    /// Extract query parameters from the request URI
    fn extract_query_params(req: &RequestHeader) -> HashMap<String, String> {
        req.uri
            .query()
            .map(admin::parse_urlencoded)
            .unwrap_or_default()
    }

    /// Whether the request carries a form-encoded body
    fn is_form_request(req: &RequestHeader) -> bool {
        req.headers
            .get("content-type")
            .and_then(|v| v.to_str().ok())
            .map(|v| v.starts_with("application/x-www-form-urlencoded"))
            .unwrap_or(false)
    }
}

#[async_trait]
impl ProxyHttp for AdminGateway {
    type CTX = ();

    fn new_ctx(&self) -> Self::CTX {}

    async fn upstream_peer(
        &self,
        _session: &mut Session,
        _ctx: &mut Self::CTX,
    ) -> Result<Box<HttpPeer>> {
        Err(pingora_core::Error::explain(
            pingora_core::ErrorType::InternalError,
            "all requests are answered locally",
        ))
    }

    async fn request_filter(&self, session: &mut Session, _ctx: &mut Self::CTX) -> Result<bool> {
        let (path, method) = {
            let req = session.req_header();
            (req.uri.path().to_string(), req.method.to_string())
        };

        if path == "/health" && method == "GET" {
            let body = serde_json::json!({
                "status": "healthy",
                "uptime_seconds": self.start_time.elapsed().as_secs(),
                "version": env!("CARGO_PKG_VERSION")
            });
            admin::send_json_response(session, 200, body).await?;
            return Ok(true);
        }

        // Parameters may arrive on the query string, in a form body, or both
        let mut params = Self::extract_query_params(session.req_header());
        if Self::is_form_request(session.req_header()) {
            match session.read_request_body().await {
                Ok(Some(body)) => {
                    if let Ok(body_str) = std::str::from_utf8(&body) {
                        params.extend(admin::parse_urlencoded(body_str));
                    }
                }
                Ok(None) => {}
                Err(e) => {
                    tracing::warn!(error = %e, "Failed to read request body");
                    admin::send_json_response(
                        session,
                        400,
                        serde_json::json!({
                            "status": false,
                            "msg": "Failed to read request body"
                        }),
                    )
                    .await?;
                    return Ok(true);
                }
            }
        }

        if admin::handle_request(session, &path, &method, &params, &self.handler).await {
            return Ok(true);
        }

        admin::send_json_response(
            session,
            404,
            serde_json::json!({
                "status": false,
                "msg": "Not found"
            }),
        )
        .await?;
        Ok(true)
    }
}
