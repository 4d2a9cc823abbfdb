//! Outcome notifications.
//!
//! A finished workflow renders a chat-ready message and publishes it to the
//! notification channel. Publishing is fire-and-forget: failures are logged
//! and never change the workflow outcome.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{info, warn};

use crate::clients::{ClientResult, NotificationChannel, NotificationEnvelope};
use crate::constants::notification::{
    FAILURE_DETAIL_TYPE, FAILURE_PREFIX, SUCCESS_DETAIL_TYPE, SUCCESS_PREFIX,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    Success,
    Failure,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationEvent {
    pub kind: NotificationKind,
    pub stack_name: String,
    pub reason: Option<String>,
}

impl NotificationEvent {
    pub fn success(stack_name: impl Into<String>) -> Self {
        Self {
            kind: NotificationKind::Success,
            stack_name: stack_name.into(),
            reason: None,
        }
    }

    pub fn failure(stack_name: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            kind: NotificationKind::Failure,
            stack_name: stack_name.into(),
            reason: Some(reason.into()),
        }
    }

    /// Chat text, e.g. `:x: *StackDeleteFailed* | demo-FrontendStack`
    pub fn render(&self) -> String {
        let prefix = match self.kind {
            NotificationKind::Success => SUCCESS_PREFIX,
            NotificationKind::Failure => FAILURE_PREFIX,
        };
        format!("{prefix} {}", self.stack_name)
    }

    pub fn detail_type(&self) -> &'static str {
        match self.kind {
            NotificationKind::Success => SUCCESS_DETAIL_TYPE,
            NotificationKind::Failure => FAILURE_DETAIL_TYPE,
        }
    }

    pub fn to_envelope(&self, source: &str) -> NotificationEnvelope {
        NotificationEnvelope {
            detail_type: self.detail_type().to_string(),
            source: source.to_string(),
            detail: json!({
                "metadata": {
                    "includes_slack_notification": true,
                },
                "data": {
                    "slack": {
                        "text": self.render(),
                    },
                },
            }),
        }
    }
}

/// Publish `event`, logging instead of propagating any failure
pub async fn publish_outcome(
    channel: &dyn NotificationChannel,
    source: &str,
    event: &NotificationEvent,
) {
    let envelope = event.to_envelope(source);
    if let Err(e) = channel.publish(&envelope).await {
        warn!(
            stack_name = %event.stack_name,
            detail_type = %envelope.detail_type,
            error = %e,
            "Failed to publish deletion outcome"
        );
    }
}

/// Channel used when no event bus is configured: outcomes go to the log
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingNotifier;

#[async_trait]
impl NotificationChannel for TracingNotifier {
    async fn publish(&self, envelope: &NotificationEnvelope) -> ClientResult<()> {
        info!(
            detail_type = %envelope.detail_type,
            source = %envelope.source,
            detail = %envelope.detail,
            "NOTIFICATION"
        );
        Ok(())
    }
}
