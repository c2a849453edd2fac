//! Tests for the push-image-settings action
//!
//! A recording mock stands in for the remote API so every test can assert
//! the exact remote-call sequence an invocation produces.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;

use super::*;
use crate::api::types::{Condition, IoSettings, RequestSetting, Service, Snippet, Version};
use crate::api::{ApiError, FastlyApi};
use crate::config::{ImageConfig, WebhookConfig};

const SERVICE_ID: &str = "SU1Z0isxPaozGVKXdv0eY";
const RULE_NAME: &str = "imageopto_image_optimization";

/// One recorded remote call, with its payload where relevant
#[derive(Debug, Clone, PartialEq)]
enum Call {
    ServiceDetails,
    CloneVersion(u64),
    GetRequestSetting(u64, String),
    CreateRequestSetting(u64, RequestSetting),
    DeleteRequestSetting(u64, String),
    CreateCondition(u64, Condition),
    UploadSnippet(u64, Snippet),
    HasSnippet(u64, String),
    RemoveSnippet(u64, String),
    ConfigureImageSettings(u64, IoSettings),
    ValidateVersion(u64),
    ActivateVersion(u64),
    SendWebhook(String),
}

impl Call {
    /// Whether this call mutates remote state
    fn is_mutation(&self) -> bool {
        !matches!(
            self,
            Call::ServiceDetails
                | Call::GetRequestSetting(..)
                | Call::HasSnippet(..)
                | Call::ValidateVersion(..)
        )
    }
}

/// Recording mock of the remote API
struct MockFastlyApi {
    calls: Mutex<Vec<Call>>,
    service: Service,
    rule_exists: bool,
    existing_snippets: HashSet<String>,
    fail_validation: bool,
    fail_webhook: bool,
}

impl MockFastlyApi {
    fn new(active_version: u64) -> Self {
        let versions = (1..=active_version)
            .map(|number| Version {
                number,
                active: Some(number == active_version),
            })
            .collect();

        Self {
            calls: Mutex::new(Vec::new()),
            service: Service {
                id: SERVICE_ID.to_string(),
                name: "storefront".to_string(),
                versions,
            },
            rule_exists: false,
            existing_snippets: HashSet::new(),
            fail_validation: false,
            fail_webhook: false,
        }
    }

    fn with_rule(mut self) -> Self {
        self.rule_exists = true;
        self
    }

    fn with_existing_snippet(mut self, name: &str) -> Self {
        self.existing_snippets.insert(name.to_string());
        self
    }

    fn with_failing_validation(mut self) -> Self {
        self.fail_validation = true;
        self
    }

    fn with_failing_webhook(mut self) -> Self {
        self.fail_webhook = true;
        self
    }

    fn record(&self, call: Call) {
        self.calls.lock().push(call);
    }

    fn calls(&self) -> Vec<Call> {
        self.calls.lock().clone()
    }

    fn mutation_count(&self) -> usize {
        self.calls().iter().filter(|c| c.is_mutation()).count()
    }

    fn next_version(&self) -> u64 {
        self.service.versions.iter().map(|v| v.number).max().unwrap_or(0) + 1
    }
}

#[async_trait]
impl FastlyApi for MockFastlyApi {
    async fn service_details(&self) -> Result<Service, ApiError> {
        self.record(Call::ServiceDetails);
        Ok(self.service.clone())
    }

    async fn clone_version(&self, version: u64) -> Result<Version, ApiError> {
        self.record(Call::CloneVersion(version));
        Ok(Version {
            number: self.next_version(),
            active: None,
        })
    }

    async fn get_request_setting(
        &self,
        version: u64,
        name: &str,
    ) -> Result<Option<RequestSetting>, ApiError> {
        self.record(Call::GetRequestSetting(version, name.to_string()));
        if self.rule_exists {
            Ok(Some(RequestSetting {
                name: name.to_string(),
                service_id: SERVICE_ID.to_string(),
                version,
                request_condition: name.to_string(),
            }))
        } else {
            Ok(None)
        }
    }

    async fn create_request_setting(
        &self,
        version: u64,
        setting: &RequestSetting,
    ) -> Result<RequestSetting, ApiError> {
        self.record(Call::CreateRequestSetting(version, setting.clone()));
        Ok(setting.clone())
    }

    async fn delete_request_setting(&self, version: u64, name: &str) -> Result<(), ApiError> {
        self.record(Call::DeleteRequestSetting(version, name.to_string()));
        Ok(())
    }

    async fn create_condition(
        &self,
        version: u64,
        condition: &Condition,
    ) -> Result<Condition, ApiError> {
        self.record(Call::CreateCondition(version, condition.clone()));
        Ok(condition.clone())
    }

    async fn upload_snippet(&self, version: u64, snippet: &Snippet) -> Result<(), ApiError> {
        self.record(Call::UploadSnippet(version, snippet.clone()));
        Ok(())
    }

    async fn has_snippet(&self, version: u64, name: &str) -> Result<bool, ApiError> {
        self.record(Call::HasSnippet(version, name.to_string()));
        Ok(self.existing_snippets.contains(name))
    }

    async fn remove_snippet(&self, version: u64, name: &str) -> Result<(), ApiError> {
        self.record(Call::RemoveSnippet(version, name.to_string()));
        Ok(())
    }

    async fn configure_image_settings(
        &self,
        version: u64,
        settings: &IoSettings,
    ) -> Result<(), ApiError> {
        self.record(Call::ConfigureImageSettings(version, settings.clone()));
        Ok(())
    }

    async fn validate_version(&self, version: u64) -> Result<(), ApiError> {
        self.record(Call::ValidateVersion(version));
        if self.fail_validation {
            Err(ApiError::InvalidVersion(
                version,
                "syntax error in recv".to_string(),
            ))
        } else {
            Ok(())
        }
    }

    async fn activate_version(&self, version: u64) -> Result<Version, ApiError> {
        self.record(Call::ActivateVersion(version));
        Ok(Version {
            number: version,
            active: Some(true),
        })
    }

    async fn send_webhook(&self, text: &str) -> Result<(), ApiError> {
        self.record(Call::SendWebhook(text.to_string()));
        if self.fail_webhook {
            Err(ApiError::Webhook("HTTP 500 response".to_string()))
        } else {
            Ok(())
        }
    }
}

/// Temp directory with a single recv.vcl template
fn recv_template_dir() -> tempfile::TempDir {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(
        dir.path().join("recv.vcl"),
        "set req.http.x-fastly-imageopto-api = \"fastly; qp=*\";",
    )
    .unwrap();
    dir
}

/// Temp directory with recv.vcl and fetch.vcl templates
fn two_template_dir() -> tempfile::TempDir {
    let dir = recv_template_dir();
    std::fs::write(dir.path().join("fetch.vcl"), "set beresp.http.x-io = \"1\";").unwrap();
    dir
}

fn handler_with(
    api: Arc<MockFastlyApi>,
    dir: &tempfile::TempDir,
    file: Option<&str>,
    webhooks: WebhookConfig,
) -> PushImageSettings {
    PushImageSettings::new(
        api,
        SnippetSource::new(dir.path(), file.map(|f| f.to_string())),
        ImageConfig { quality: 85 },
        webhooks,
    )
}

fn webhooks_on() -> WebhookConfig {
    WebhookConfig {
        enabled: true,
        publish_config_changes: true,
        url: Some("https://hooks.example.com/x".to_string()),
        ..Default::default()
    }
}

fn params(active_version: &str, activate: bool, push_quality: bool) -> PushParams {
    PushParams {
        active_version: active_version.to_string(),
        activate,
        push_quality,
    }
}

#[tokio::test]
async fn test_version_mismatch_performs_no_mutations() {
    let api = Arc::new(MockFastlyApi::new(5));
    let dir = recv_template_dir();
    let handler = handler_with(Arc::clone(&api), &dir, Some("recv.vcl"), webhooks_on());

    let err = handler.execute(&params("3", true, true)).await.unwrap_err();

    assert_eq!(err.to_string(), "Active versions mismatch.");
    assert_eq!(api.mutation_count(), 0);
    assert_eq!(api.calls(), vec![Call::ServiceDetails]);
}

#[tokio::test]
async fn test_enable_path_full_sequence() {
    let api = Arc::new(MockFastlyApi::new(3));
    let dir = recv_template_dir();
    let handler = handler_with(Arc::clone(&api), &dir, Some("recv.vcl"), webhooks_on());

    let outcome = handler.execute(&params("3", true, true)).await.unwrap();
    assert_eq!(outcome, PushOutcome::Pushed { version: 4 });

    let expected_condition = Condition {
        name: RULE_NAME.to_string(),
        statement: "req.http.x-pass".to_string(),
        condition_type: "REQUEST".to_string(),
        priority: 5,
    };
    let expected_setting = RequestSetting {
        name: RULE_NAME.to_string(),
        service_id: SERVICE_ID.to_string(),
        // The payload cites the pre-clone active version even though the
        // setting is created on the clone
        version: 3,
        request_condition: RULE_NAME.to_string(),
    };
    let expected_snippet = Snippet {
        name: "imageopto_image_optimization_recv".to_string(),
        snippet_type: "recv".to_string(),
        dynamic: "0".to_string(),
        content: "set req.http.x-fastly-imageopto-api = \"fastly; qp=*\";".to_string(),
        priority: 10,
    };

    assert_eq!(
        api.calls(),
        vec![
            Call::ServiceDetails,
            Call::CloneVersion(3),
            Call::GetRequestSetting(3, RULE_NAME.to_string()),
            Call::CreateCondition(4, expected_condition),
            Call::CreateRequestSetting(4, expected_setting),
            Call::UploadSnippet(4, expected_snippet),
            Call::ConfigureImageSettings(4, IoSettings::new(SERVICE_ID, 4, 85)),
            Call::ValidateVersion(4),
            Call::ActivateVersion(4),
            Call::SendWebhook(
                "*Image optimization snippet has been pushed in Fastly version 4*".to_string()
            ),
        ]
    );
}

#[tokio::test]
async fn test_enable_without_quality_flag_skips_settings_push() {
    let api = Arc::new(MockFastlyApi::new(3));
    let dir = recv_template_dir();
    let handler = handler_with(
        Arc::clone(&api),
        &dir,
        Some("recv.vcl"),
        WebhookConfig::default(),
    );

    handler.execute(&params("3", true, false)).await.unwrap();

    assert!(!api
        .calls()
        .iter()
        .any(|c| matches!(c, Call::ConfigureImageSettings(..))));
}

#[tokio::test]
async fn test_settings_push_fires_once_per_snippet_key() {
    let api = Arc::new(MockFastlyApi::new(3));
    let dir = two_template_dir();
    let handler = handler_with(Arc::clone(&api), &dir, None, WebhookConfig::default());

    handler.execute(&params("3", false, true)).await.unwrap();

    // Two template keys (fetch, recv) mean two uploads and two settings pushes
    let uploads = api
        .calls()
        .iter()
        .filter(|c| matches!(c, Call::UploadSnippet(..)))
        .count();
    let settings_pushes = api
        .calls()
        .iter()
        .filter(|c| matches!(c, Call::ConfigureImageSettings(..)))
        .count();

    assert_eq!(uploads, 2);
    assert_eq!(settings_pushes, 2);
}

#[tokio::test]
async fn test_disable_path_removes_rule_and_existing_snippets() {
    let api = Arc::new(
        MockFastlyApi::new(3)
            .with_rule()
            .with_existing_snippet("imageopto_image_optimization_recv"),
    );
    let dir = recv_template_dir();
    let handler = handler_with(Arc::clone(&api), &dir, Some("recv.vcl"), webhooks_on());

    let outcome = handler.execute(&params("3", true, false)).await.unwrap();
    assert_eq!(outcome, PushOutcome::Removed { version: 4 });

    let calls = api.calls();
    assert!(calls.contains(&Call::DeleteRequestSetting(4, RULE_NAME.to_string())));
    assert!(calls.contains(&Call::RemoveSnippet(
        4,
        "imageopto_image_optimization_recv".to_string()
    )));
    assert!(calls.contains(&Call::SendWebhook(
        "*Image optimization snippet has been removed in Fastly version 4*".to_string()
    )));
    // The enable-branch mutations never ran
    assert!(!calls.iter().any(|c| matches!(c, Call::CreateRequestSetting(..))));
    assert!(!calls.iter().any(|c| matches!(c, Call::UploadSnippet(..))));
}

#[tokio::test]
async fn test_disable_path_skips_absent_snippets_without_error() {
    // State already disabled: the rule record lingers but snippets are gone
    let api = Arc::new(MockFastlyApi::new(3).with_rule());
    let dir = recv_template_dir();
    let handler = handler_with(
        Arc::clone(&api),
        &dir,
        Some("recv.vcl"),
        WebhookConfig::default(),
    );

    handler.execute(&params("3", false, false)).await.unwrap();

    let calls = api.calls();
    assert!(calls.contains(&Call::HasSnippet(
        4,
        "imageopto_image_optimization_recv".to_string()
    )));
    assert!(!calls.iter().any(|c| matches!(c, Call::RemoveSnippet(..))));
}

#[tokio::test]
async fn test_condition_is_created_on_disable_path_too() {
    let api = Arc::new(MockFastlyApi::new(3).with_rule());
    let dir = recv_template_dir();
    let handler = handler_with(
        Arc::clone(&api),
        &dir,
        Some("recv.vcl"),
        WebhookConfig::default(),
    );

    handler.execute(&params("3", false, false)).await.unwrap();

    assert!(api
        .calls()
        .iter()
        .any(|c| matches!(c, Call::CreateCondition(4, _))));
}

#[tokio::test]
async fn test_no_activation_without_flag() {
    let api = Arc::new(MockFastlyApi::new(3));
    let dir = recv_template_dir();
    let handler = handler_with(
        Arc::clone(&api),
        &dir,
        Some("recv.vcl"),
        WebhookConfig::default(),
    );

    handler.execute(&params("3", false, false)).await.unwrap();

    assert!(!api
        .calls()
        .iter()
        .any(|c| matches!(c, Call::ActivateVersion(_))));
    assert!(api.calls().contains(&Call::ValidateVersion(4)));
}

#[tokio::test]
async fn test_validation_failure_blocks_activation() {
    let api = Arc::new(MockFastlyApi::new(3).with_failing_validation());
    let dir = recv_template_dir();
    let handler = handler_with(Arc::clone(&api), &dir, Some("recv.vcl"), webhooks_on());

    let err = handler.execute(&params("3", true, false)).await.unwrap_err();

    assert!(matches!(err, PushError::Api(ApiError::InvalidVersion(4, _))));
    let calls = api.calls();
    assert!(!calls.iter().any(|c| matches!(c, Call::ActivateVersion(_))));
    assert!(!calls.iter().any(|c| matches!(c, Call::SendWebhook(_))));
}

#[tokio::test]
async fn test_webhook_requires_both_flags() {
    for (enabled, publish) in [(true, false), (false, true), (false, false)] {
        let api = Arc::new(MockFastlyApi::new(3));
        let dir = recv_template_dir();
        let webhooks = WebhookConfig {
            enabled,
            publish_config_changes: publish,
            url: Some("https://hooks.example.com/x".to_string()),
            ..Default::default()
        };
        let handler = handler_with(Arc::clone(&api), &dir, Some("recv.vcl"), webhooks);

        handler.execute(&params("3", false, false)).await.unwrap();

        assert!(
            !api.calls().iter().any(|c| matches!(c, Call::SendWebhook(_))),
            "webhook fired with enabled={enabled} publish={publish}"
        );
    }
}

#[tokio::test]
async fn test_webhook_fires_at_most_once_with_multiple_snippets() {
    let api = Arc::new(MockFastlyApi::new(3));
    let dir = two_template_dir();
    let handler = handler_with(Arc::clone(&api), &dir, None, webhooks_on());

    handler.execute(&params("3", false, true)).await.unwrap();

    let webhook_calls = api
        .calls()
        .iter()
        .filter(|c| matches!(c, Call::SendWebhook(_)))
        .count();
    assert_eq!(webhook_calls, 1);
}

#[tokio::test]
async fn test_webhook_failure_surfaces_as_error_after_changes_applied() {
    let api = Arc::new(MockFastlyApi::new(3).with_failing_webhook());
    let dir = recv_template_dir();
    let handler = handler_with(Arc::clone(&api), &dir, Some("recv.vcl"), webhooks_on());

    let err = handler.execute(&params("3", true, false)).await.unwrap_err();

    assert!(matches!(err, PushError::Api(ApiError::Webhook(_))));
    // Activation already happened; only the notification failed
    assert!(api.calls().contains(&Call::ActivateVersion(4)));
}

#[tokio::test]
async fn test_missing_template_aborts_before_rule_changes() {
    let api = Arc::new(MockFastlyApi::new(3));
    let dir = tempfile::tempdir().unwrap();
    let handler = handler_with(
        Arc::clone(&api),
        &dir,
        Some("recv.vcl"),
        WebhookConfig::default(),
    );

    let err = handler.execute(&params("3", true, true)).await.unwrap_err();

    assert!(matches!(err, PushError::Template(_)));
    // The clone exists but no rule/snippet mutation ran on it
    assert!(!api
        .calls()
        .iter()
        .any(|c| matches!(c, Call::CreateCondition(..) | Call::UploadSnippet(..))));
}

#[test]
fn test_push_params_flags_require_exact_true() {
    let mut query = HashMap::new();
    query.insert("active_version".to_string(), "3".to_string());
    query.insert("activate_flag".to_string(), "true".to_string());
    query.insert("image_quality_flag".to_string(), "TRUE".to_string());

    let params = PushParams::from_query(&query);
    assert_eq!(params.active_version, "3");
    assert!(params.activate);
    assert!(!params.push_quality);
}

#[test]
fn test_push_params_missing_values_default_off() {
    let params = PushParams::from_query(&HashMap::new());
    assert_eq!(params.active_version, "");
    assert!(!params.activate);
    assert!(!params.push_quality);
}

#[test]
fn test_snippet_name_derivation() {
    assert_eq!(snippet_name("recv"), "imageopto_image_optimization_recv");
    assert_eq!(snippet_name("fetch"), "imageopto_image_optimization_fetch");
}
