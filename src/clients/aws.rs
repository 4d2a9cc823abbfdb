//! AWS-backed client implementations.
//!
//! CloudFormation provides the inventory, deletion and lookup traits, SQS the
//! branch-deletion queue and EventBridge the notification channel. All three
//! clients share one `SdkConfig` loaded from the standard AWS provider chain
//! with optional region and endpoint overrides.

use async_trait::async_trait;
use aws_config::{BehaviorVersion, Region, SdkConfig};
use aws_sdk_cloudformation::error::{DisplayErrorContext, ProvideErrorMetadata, SdkError};
use aws_sdk_eventbridge::types::PutEventsRequestEntry;
use aws_sdk_sqs::types::MessageSystemAttributeName;
use chrono::{DateTime, Utc};
use std::fmt::Debug;
use std::sync::Arc;
use tracing::{debug, info};

use super::errors::{ClientError, ClientResult};
use super::traits::{
    BranchDeletionQueue, NotificationChannel, NotificationEnvelope, StackDeletionRequester,
    StackExistenceChecker, StackInventory, StackPage,
};
use crate::config::{AwsConfig, ReaperConfig};
use crate::models::{QueueMessage, Stack, StackStatus, Tag};

/// Load the shared SDK configuration
pub async fn load_sdk_config(config: &AwsConfig) -> SdkConfig {
    let mut loader = aws_config::defaults(BehaviorVersion::latest());
    if let Some(region) = &config.region {
        loader = loader.region(Region::new(region.clone()));
    }
    if let Some(endpoint) = &config.endpoint_url {
        loader = loader.endpoint_url(endpoint);
    }
    loader.load().await
}

/// Map an SDK failure onto the client error taxonomy
fn client_error<E, R>(operation: &str, err: SdkError<E, R>) -> ClientError
where
    E: ProvideErrorMetadata + std::error::Error + Send + Sync + 'static,
    R: Debug,
{
    if matches!(err, SdkError::TimeoutError(_)) {
        return ClientError::timeout(operation, 0);
    }

    let message = DisplayErrorContext(&err).to_string();
    match err.code() {
        Some("Throttling" | "ThrottlingException" | "RequestThrottled") => {
            ClientError::throttled(operation, message)
        }
        _ => ClientError::service(operation, message),
    }
}

/// CloudFormation reports a missing stack as a validation error
fn is_stack_not_found<E, R>(err: &SdkError<E, R>) -> bool
where
    E: ProvideErrorMetadata,
{
    err.code() == Some("ValidationError")
        && err
            .message()
            .is_some_and(|message| message.contains("does not exist"))
}

fn convert_stack(stack: &aws_sdk_cloudformation::types::Stack) -> Option<Stack> {
    let name = stack.stack_name()?;
    let status = stack
        .stack_status()
        .and_then(|status| status.as_str().parse::<StackStatus>().ok())
        .unwrap_or(StackStatus::Unknown);
    let created = stack.creation_time()?;
    let creation_time: DateTime<Utc> =
        DateTime::from_timestamp(created.secs(), created.subsec_nanos())?;

    let tags = stack
        .tags()
        .iter()
        .filter_map(|tag| Some(Tag::new(tag.key()?, tag.value()?)))
        .collect();

    Some(Stack {
        name: name.to_string(),
        status,
        creation_time,
        tags,
    })
}

/// CloudFormation-backed inventory, deleter and existence checker
#[derive(Debug, Clone)]
pub struct AwsCloudFormationClient {
    client: aws_sdk_cloudformation::Client,
}

impl AwsCloudFormationClient {
    pub fn new(sdk_config: &SdkConfig) -> Self {
        Self {
            client: aws_sdk_cloudformation::Client::new(sdk_config),
        }
    }
}

#[async_trait]
impl StackInventory for AwsCloudFormationClient {
    async fn list_stacks_page(&self, next_token: Option<String>) -> ClientResult<StackPage> {
        let output = self
            .client
            .describe_stacks()
            .set_next_token(next_token)
            .send()
            .await
            .map_err(|e| client_error("DescribeStacks", e))?;

        let stacks: Vec<Stack> = output.stacks().iter().filter_map(convert_stack).collect();
        debug!(count = stacks.len(), "Fetched stack inventory page");

        Ok(StackPage {
            stacks,
            next_token: output.next_token().map(str::to_string),
        })
    }
}

#[async_trait]
impl StackDeletionRequester for AwsCloudFormationClient {
    async fn request_deletion(&self, stack_name: &str) -> ClientResult<()> {
        match self
            .client
            .delete_stack()
            .stack_name(stack_name)
            .send()
            .await
        {
            Ok(_) => Ok(()),
            Err(err) if is_stack_not_found(&err) => Ok(()),
            Err(err) => Err(client_error("DeleteStack", err)),
        }
    }
}

#[async_trait]
impl StackExistenceChecker for AwsCloudFormationClient {
    async fn lookup_stack(&self, stack_name: &str) -> ClientResult<Option<StackStatus>> {
        match self
            .client
            .describe_stacks()
            .stack_name(stack_name)
            .send()
            .await
        {
            Ok(output) => Ok(output.stacks().first().map(|stack| {
                stack
                    .stack_status()
                    .and_then(|status| status.as_str().parse::<StackStatus>().ok())
                    .unwrap_or(StackStatus::Unknown)
            })),
            Err(err) if is_stack_not_found(&err) => Ok(None),
            Err(err) => Err(client_error("DescribeStacks", err)),
        }
    }
}

/// SQS-backed branch-deletion queue
#[derive(Debug, Clone)]
pub struct SqsBranchDeletionQueue {
    client: aws_sdk_sqs::Client,
    queue_url: String,
    visibility_timeout: Option<i32>,
}

impl SqsBranchDeletionQueue {
    pub fn new(
        sdk_config: &SdkConfig,
        queue_url: impl Into<String>,
        visibility_timeout: Option<i32>,
    ) -> Self {
        Self {
            client: aws_sdk_sqs::Client::new(sdk_config),
            queue_url: queue_url.into(),
            visibility_timeout,
        }
    }
}

#[async_trait]
impl BranchDeletionQueue for SqsBranchDeletionQueue {
    async fn receive(
        &self,
        max_messages: i32,
        wait_seconds: i32,
    ) -> ClientResult<Vec<QueueMessage>> {
        let output = self
            .client
            .receive_message()
            .queue_url(&self.queue_url)
            .max_number_of_messages(max_messages)
            .wait_time_seconds(wait_seconds)
            .set_visibility_timeout(self.visibility_timeout)
            .message_system_attribute_names(MessageSystemAttributeName::ApproximateReceiveCount)
            .send()
            .await
            .map_err(|e| {
                ClientError::queue_operation(
                    self.queue_url.clone(),
                    "receive",
                    DisplayErrorContext(&e).to_string(),
                )
            })?;

        let messages = output
            .messages()
            .iter()
            .filter_map(|message| {
                let receipt_handle = message.receipt_handle()?.to_string();
                let receive_count = message
                    .attributes()
                    .and_then(|attrs| attrs.get(&MessageSystemAttributeName::ApproximateReceiveCount))
                    .and_then(|count| count.parse().ok())
                    .unwrap_or(1);

                Some(QueueMessage {
                    message_id: message.message_id().unwrap_or_default().to_string(),
                    receipt_handle,
                    body: message.body().unwrap_or_default().to_string(),
                    receive_count,
                })
            })
            .collect();

        Ok(messages)
    }

    async fn acknowledge(&self, receipt_handle: &str) -> ClientResult<()> {
        self.client
            .delete_message()
            .queue_url(&self.queue_url)
            .receipt_handle(receipt_handle)
            .send()
            .await
            .map_err(|e| {
                ClientError::queue_operation(
                    self.queue_url.clone(),
                    "acknowledge",
                    DisplayErrorContext(&e).to_string(),
                )
            })?;
        Ok(())
    }

    fn queue_name(&self) -> &str {
        &self.queue_url
    }
}

/// EventBridge-backed notification channel
#[derive(Debug, Clone)]
pub struct EventBridgeNotifier {
    client: aws_sdk_eventbridge::Client,
    event_bus_name: Option<String>,
}

impl EventBridgeNotifier {
    pub fn new(sdk_config: &SdkConfig, event_bus_name: Option<String>) -> Self {
        Self {
            client: aws_sdk_eventbridge::Client::new(sdk_config),
            event_bus_name,
        }
    }
}

#[async_trait]
impl NotificationChannel for EventBridgeNotifier {
    async fn publish(&self, envelope: &NotificationEnvelope) -> ClientResult<()> {
        let detail = serde_json::to_string(&envelope.detail)?;
        let entry = PutEventsRequestEntry::builder()
            .source(&envelope.source)
            .detail_type(&envelope.detail_type)
            .detail(detail)
            .set_event_bus_name(self.event_bus_name.clone())
            .build();

        let output = self
            .client
            .put_events()
            .entries(entry)
            .send()
            .await
            .map_err(|e| client_error("PutEvents", e))?;

        if output.failed_entry_count() > 0 {
            return Err(ClientError::service(
                "PutEvents",
                format!("{} entries rejected", output.failed_entry_count()),
            ));
        }
        Ok(())
    }
}

/// Provider clients wired from configuration
#[derive(Clone)]
pub struct AwsClients {
    pub cloudformation: Arc<AwsCloudFormationClient>,
    pub queue: Option<Arc<SqsBranchDeletionQueue>>,
    pub notifier: Option<Arc<EventBridgeNotifier>>,
}

impl AwsClients {
    /// Build every client the configuration asks for
    pub async fn connect(config: &ReaperConfig) -> Self {
        let sdk_config = load_sdk_config(&config.aws).await;
        info!(
            region = ?sdk_config.region().map(|r| r.as_ref().to_string()),
            "Loaded AWS configuration"
        );

        let branch = &config.policies.branch_deletion;
        let queue = branch.queue_url.as_ref().map(|url| {
            Arc::new(SqsBranchDeletionQueue::new(
                &sdk_config,
                url.clone(),
                branch.visibility_timeout_seconds,
            ))
        });

        let notifier = config.notification.enabled.then(|| {
            Arc::new(EventBridgeNotifier::new(
                &sdk_config,
                config.notification.event_bus_name.clone(),
            ))
        });

        Self {
            cloudformation: Arc::new(AwsCloudFormationClient::new(&sdk_config)),
            queue,
            notifier,
        }
    }
}
