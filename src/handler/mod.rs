//! Push-image-settings action
//!
//! One invocation toggles the image optimization feature for the configured
//! service: it clones the active version, installs or removes the request
//! condition and VCL snippets on the clone, optionally pushes JPEG quality
//! settings, validates the clone, optionally activates it, and notifies the
//! webhook channel. The live configuration is never mutated directly - only
//! an explicit activation promotes the clone.
//!
//! There is no retry and no rollback: on failure the partially-configured
//! draft version is left behind, unactivated, for manual inspection.

use std::collections::HashMap;
use std::sync::Arc;

use crate::api::types::{Condition, IoSettings, RequestSetting, Snippet};
use crate::api::FastlyApi;
use crate::config::{ImageConfig, WebhookConfig};
use crate::constants::{
    CONDITION_PRIORITY, CONDITION_STATEMENT, CONDITION_TYPE, IMAGE_OPTIMIZATION_NAME,
    SNIPPET_PRIORITY,
};
use crate::error::PushError;
use crate::snippets::SnippetSource;
use crate::vcl;

#[cfg(test)]
mod tests;

/// Parsed request parameters for the push action
///
/// The flags are exact string comparisons against `"true"`; any other
/// value, including different casing, is treated as false. A missing
/// `active_version` becomes the empty string and fails version validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PushParams {
    pub active_version: String,
    pub activate: bool,
    pub push_quality: bool,
}

impl PushParams {
    pub fn from_query(params: &HashMap<String, String>) -> Self {
        let flag = |name: &str| params.get(name).map(|v| v == "true").unwrap_or(false);

        Self {
            active_version: params.get("active_version").cloned().unwrap_or_default(),
            activate: flag("activate_flag"),
            push_quality: flag("image_quality_flag"),
        }
    }
}

/// Which branch an invocation took
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PushOutcome {
    /// The rule did not exist: condition, rule and snippets were installed
    Pushed { version: u64 },
    /// The rule existed: it and its snippets were removed
    Removed { version: u64 },
}

impl PushOutcome {
    /// The draft version the changes landed on
    pub fn version(&self) -> u64 {
        match self {
            PushOutcome::Pushed { version } | PushOutcome::Removed { version } => *version,
        }
    }
}

/// The push-image-settings action handler
///
/// Collaborators are passed in explicitly at construction; the handler
/// itself is stateless and one instance serves every request.
pub struct PushImageSettings {
    api: Arc<dyn FastlyApi>,
    snippets: SnippetSource,
    image: ImageConfig,
    webhooks: WebhookConfig,
}

impl PushImageSettings {
    pub fn new(
        api: Arc<dyn FastlyApi>,
        snippets: SnippetSource,
        image: ImageConfig,
        webhooks: WebhookConfig,
    ) -> Self {
        Self {
            api,
            snippets,
            image,
            webhooks,
        }
    }

    /// Run the full toggle workflow
    ///
    /// Validation failures abort before any remote mutation. Once the clone
    /// exists, any later failure leaves it behind unactivated.
    pub async fn execute(&self, params: &PushParams) -> Result<PushOutcome, PushError> {
        let service = self.api.service_details().await?;
        let current = vcl::active_version(&service, &params.active_version)?;

        let clone = self.api.clone_version(current.active_version).await?;

        match self
            .apply(params, &service.id, current.active_version, clone.number)
            .await
        {
            Ok(outcome) => {
                tracing::info!(
                    draft_version = clone.number,
                    activated = params.activate,
                    outcome = ?outcome,
                    "Image optimization toggle completed"
                );
                Ok(outcome)
            }
            Err(e) => {
                tracing::warn!(
                    draft_version = clone.number,
                    error = %e,
                    "Image optimization toggle failed; draft version left unactivated"
                );
                Err(e)
            }
        }
    }

    /// Everything that happens after the clone exists
    async fn apply(
        &self,
        params: &PushParams,
        service_id: &str,
        active_version: u64,
        clone_version: u64,
    ) -> Result<PushOutcome, PushError> {
        // Rule existence is checked against the pre-clone active version
        let existing_rule = self
            .api
            .get_request_setting(active_version, IMAGE_OPTIMIZATION_NAME)
            .await?;

        let snippets = self.snippets.load()?;

        // The condition is created on every invocation, enable and disable
        // alike; the branch below decides whether anything references it.
        let condition = self
            .api
            .create_condition(
                clone_version,
                &Condition {
                    name: IMAGE_OPTIMIZATION_NAME.to_string(),
                    statement: CONDITION_STATEMENT.to_string(),
                    condition_type: CONDITION_TYPE.to_string(),
                    priority: CONDITION_PRIORITY,
                },
            )
            .await?;

        let removing = existing_rule.is_some();

        if !removing {
            let setting = RequestSetting {
                name: IMAGE_OPTIMIZATION_NAME.to_string(),
                service_id: service_id.to_string(),
                version: active_version,
                request_condition: condition.name.clone(),
            };
            self.api
                .create_request_setting(clone_version, &setting)
                .await?;

            for (key, content) in &snippets {
                let snippet = Snippet {
                    name: snippet_name(key),
                    snippet_type: key.clone(),
                    dynamic: "0".to_string(),
                    content: content.clone(),
                    priority: SNIPPET_PRIORITY,
                };
                self.api.upload_snippet(clone_version, &snippet).await?;

                // The settings push rides inside the snippet loop and fires
                // once per snippet key; downstream tooling counts on that
                // call sequence.
                if params.push_quality {
                    let settings = IoSettings::new(service_id, clone_version, self.image.quality);
                    self.api
                        .configure_image_settings(clone_version, &settings)
                        .await?;
                }
            }
        } else {
            self.api
                .delete_request_setting(clone_version, IMAGE_OPTIMIZATION_NAME)
                .await?;

            for key in snippets.keys() {
                let name = snippet_name(key);
                if self.api.has_snippet(clone_version, &name).await? {
                    self.api.remove_snippet(clone_version, &name).await?;
                }
            }
        }

        self.api.validate_version(clone_version).await?;

        if params.activate {
            self.api.activate_version(clone_version).await?;
        }

        let outcome = if removing {
            PushOutcome::Removed {
                version: clone_version,
            }
        } else {
            PushOutcome::Pushed {
                version: clone_version,
            }
        };

        if self.webhooks.enabled && self.webhooks.publish_config_changes {
            self.api.send_webhook(&webhook_text(&outcome)).await?;
        }

        Ok(outcome)
    }
}

/// Derived name for an uploaded snippet (`imageopto_image_optimization_recv`)
pub fn snippet_name(key: &str) -> String {
    format!("{}_{}", IMAGE_OPTIMIZATION_NAME, key)
}

/// Webhook message for a completed toggle
fn webhook_text(outcome: &PushOutcome) -> String {
    match outcome {
        PushOutcome::Removed { version } => format!(
            "*Image optimization snippet has been removed in Fastly version {}*",
            version
        ),
        PushOutcome::Pushed { version } => format!(
            "*Image optimization snippet has been pushed in Fastly version {}*",
            version
        ),
    }
}
