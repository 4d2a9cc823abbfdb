//! # In-Memory Client Implementations
//!
//! In-memory stand-ins for the cloud provider used by unit and integration
//! tests, and by `stack-reaper select` dry runs against fixture inventories.
//!
//! ## Key Features
//!
//! - **Paginated inventory**: Stacks are served in pages of a configurable size
//! - **Deletion simulation**: Stacks linger in `DELETE_IN_PROGRESS` for a
//!   configurable number of polls, or never disappear at all
//! - **Visibility timeout support**: Received messages stay invisible until the
//!   timeout expires, and move to a dead-letter list past the receive limit
//! - **Failure injection**: Listing, deletion, lookup and receive failures
//! - **Call recording**: Every deletion request, lookup and acknowledgement
//!
//! ## Usage
//!
//! ```rust
//! use stack_reaper::clients::in_memory::{InMemoryCloudFormation, InMemoryQueue};
//! use stack_reaper::models::{Stack, StackStatus};
//!
//! let cloud = InMemoryCloudFormation::new(vec![Stack::new(
//!     "demo-FrontendStack",
//!     StackStatus::CreateComplete,
//!     chrono::Utc::now(),
//! )]);
//! let queue = InMemoryQueue::new("branch-deletions");
//! queue.send_branch("feature-x");
//! assert_eq!(cloud.stack_names(), vec!["demo-FrontendStack".to_string()]);
//! assert_eq!(queue.len(), 1);
//! ```

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use parking_lot::Mutex;
use std::collections::{HashMap, HashSet, VecDeque};

use super::errors::{ClientError, ClientResult};
use super::traits::{
    BranchDeletionQueue, NotificationChannel, NotificationEnvelope, StackDeletionRequester,
    StackExistenceChecker, StackInventory, StackPage,
};
use crate::models::{BranchDeletionMessage, QueueMessage, Stack, StackStatus};

#[derive(Debug, Default)]
struct CloudState {
    stacks: Vec<Stack>,
    /// Remaining polls during which a deleting stack is still reported
    pending_deletions: HashMap<String, u32>,
    stuck: HashSet<String>,
    deletion_failures: HashMap<String, ClientError>,
    lookup_failures: HashMap<String, u32>,
    listing_failure: Option<ClientError>,
    deletion_requests: Vec<String>,
    lookups: Vec<String>,
}

/// In-memory CloudFormation implementing inventory, deletion and lookup
#[derive(Debug)]
pub struct InMemoryCloudFormation {
    state: Mutex<CloudState>,
    page_size: usize,
    polls_before_gone: u32,
}

impl InMemoryCloudFormation {
    pub fn new(stacks: Vec<Stack>) -> Self {
        Self {
            state: Mutex::new(CloudState {
                stacks,
                ..CloudState::default()
            }),
            page_size: 100,
            polls_before_gone: 0,
        }
    }

    /// Serve the inventory in pages of `page_size` stacks
    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size.max(1);
        self
    }

    /// Report deleting stacks as present for `polls` lookups before they vanish
    pub fn with_polls_before_gone(mut self, polls: u32) -> Self {
        self.polls_before_gone = polls;
        self
    }

    /// The named stack accepts deletion requests but never goes away
    pub fn stuck(self, stack_name: &str) -> Self {
        self.state.lock().stuck.insert(stack_name.to_string());
        self
    }

    /// Deletion requests for the named stack fail with `error`
    pub fn fail_deletion(self, stack_name: &str, error: ClientError) -> Self {
        self.state
            .lock()
            .deletion_failures
            .insert(stack_name.to_string(), error);
        self
    }

    /// The next `times` lookups of the named stack fail with a timeout
    pub fn fail_lookups(self, stack_name: &str, times: u32) -> Self {
        self.state
            .lock()
            .lookup_failures
            .insert(stack_name.to_string(), times);
        self
    }

    /// Every inventory listing fails with `error`
    pub fn fail_listing(&self, error: ClientError) {
        self.state.lock().listing_failure = Some(error);
    }

    pub fn add_stack(&self, stack: Stack) {
        self.state.lock().stacks.push(stack);
    }

    pub fn stack_names(&self) -> Vec<String> {
        self.state
            .lock()
            .stacks
            .iter()
            .map(|stack| stack.name.clone())
            .collect()
    }

    pub fn contains(&self, stack_name: &str) -> bool {
        self.state
            .lock()
            .stacks
            .iter()
            .any(|stack| stack.name == stack_name)
    }

    /// Stack names in the order deletion was requested (with repeats)
    pub fn deletion_requests(&self) -> Vec<String> {
        self.state.lock().deletion_requests.clone()
    }

    pub fn deletion_request_count(&self, stack_name: &str) -> usize {
        self.state
            .lock()
            .deletion_requests
            .iter()
            .filter(|name| name.as_str() == stack_name)
            .count()
    }

    pub fn lookup_count(&self, stack_name: &str) -> usize {
        self.state
            .lock()
            .lookups
            .iter()
            .filter(|name| name.as_str() == stack_name)
            .count()
    }
}

#[async_trait]
impl StackInventory for InMemoryCloudFormation {
    async fn list_stacks_page(&self, next_token: Option<String>) -> ClientResult<StackPage> {
        let state = self.state.lock();
        if let Some(error) = &state.listing_failure {
            return Err(error.clone());
        }

        let offset = match next_token {
            Some(token) => token
                .parse::<usize>()
                .map_err(|e| ClientError::service("DescribeStacks", format!("bad token: {e}")))?,
            None => 0,
        };

        let end = (offset + self.page_size).min(state.stacks.len());
        let stacks = state.stacks.get(offset..end).unwrap_or_default().to_vec();
        let next_token = (end < state.stacks.len()).then(|| end.to_string());

        Ok(StackPage { stacks, next_token })
    }
}

#[async_trait]
impl StackDeletionRequester for InMemoryCloudFormation {
    async fn request_deletion(&self, stack_name: &str) -> ClientResult<()> {
        let mut state = self.state.lock();
        state.deletion_requests.push(stack_name.to_string());

        if let Some(error) = state.deletion_failures.get(stack_name) {
            return Err(error.clone());
        }

        let stuck = state.stuck.contains(stack_name);
        let Some(stack) = state.stacks.iter_mut().find(|s| s.name == stack_name) else {
            // Already gone: deletion is idempotent
            return Ok(());
        };

        if stuck {
            stack.status = StackStatus::DeleteFailed;
            return Ok(());
        }

        stack.status = StackStatus::DeleteInProgress;
        let polls = self.polls_before_gone;
        state
            .pending_deletions
            .entry(stack_name.to_string())
            .or_insert(polls);
        Ok(())
    }
}

#[async_trait]
impl StackExistenceChecker for InMemoryCloudFormation {
    async fn lookup_stack(&self, stack_name: &str) -> ClientResult<Option<StackStatus>> {
        let mut state = self.state.lock();
        state.lookups.push(stack_name.to_string());

        if let Some(remaining) = state.lookup_failures.get_mut(stack_name) {
            if *remaining > 0 {
                *remaining -= 1;
                return Err(ClientError::timeout("DescribeStacks", 30));
            }
        }

        if let Some(remaining) = state.pending_deletions.get_mut(stack_name) {
            if *remaining > 0 {
                *remaining -= 1;
                return Ok(Some(StackStatus::DeleteInProgress));
            }
            state.pending_deletions.remove(stack_name);
            state.stacks.retain(|stack| stack.name != stack_name);
            return Ok(None);
        }

        Ok(state
            .stacks
            .iter()
            .find(|stack| stack.name == stack_name)
            .map(|stack| stack.status))
    }
}

/// Message wrapper for in-memory storage with delivery metadata
#[derive(Debug, Clone)]
struct InMemoryMessage {
    id: u64,
    body: String,
    receive_count: u32,
    invisible_until: Option<DateTime<Utc>>,
    receipt_handle: Option<String>,
}

#[derive(Debug, Default)]
struct QueueState {
    messages: VecDeque<InMemoryMessage>,
    dead_letters: Vec<String>,
    acknowledged: Vec<String>,
    next_id: u64,
    receive_calls: u32,
    receive_failure: Option<ClientError>,
}

/// In-memory queue with visibility timeout and dead-letter semantics
#[derive(Debug)]
pub struct InMemoryQueue {
    name: String,
    state: Mutex<QueueState>,
    visibility_timeout: Duration,
    max_receive_count: Option<u32>,
}

impl InMemoryQueue {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            state: Mutex::new(QueueState::default()),
            visibility_timeout: Duration::zero(),
            max_receive_count: None,
        }
    }

    /// Hide received messages for `timeout` before redelivery
    pub fn with_visibility_timeout(mut self, timeout: Duration) -> Self {
        self.visibility_timeout = timeout;
        self
    }

    /// Move messages to the dead-letter list once received more than `count` times
    pub fn with_max_receive_count(mut self, count: u32) -> Self {
        self.max_receive_count = Some(count);
        self
    }

    /// Enqueue a raw body, returning its message id
    pub fn send(&self, body: impl Into<String>) -> String {
        let mut state = self.state.lock();
        let id = state.next_id;
        state.next_id += 1;
        state.messages.push_back(InMemoryMessage {
            id,
            body: body.into(),
            receive_count: 0,
            invisible_until: None,
            receipt_handle: None,
        });
        id.to_string()
    }

    /// Enqueue a branch-deletion message
    pub fn send_branch(&self, branch: &str) -> String {
        self.send(BranchDeletionMessage::new(branch).to_body())
    }

    pub fn fail_receive(&self, error: ClientError) {
        self.state.lock().receive_failure = Some(error);
    }

    /// Messages still held by the queue, visible or not
    pub fn len(&self) -> usize {
        self.state.lock().messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Bodies of the messages still held by the queue
    pub fn bodies(&self) -> Vec<String> {
        self.state
            .lock()
            .messages
            .iter()
            .map(|message| message.body.clone())
            .collect()
    }

    /// Receipt handles that were acknowledged, in order
    pub fn acknowledged(&self) -> Vec<String> {
        self.state.lock().acknowledged.clone()
    }

    pub fn dead_letters(&self) -> Vec<String> {
        self.state.lock().dead_letters.clone()
    }

    pub fn receive_calls(&self) -> u32 {
        self.state.lock().receive_calls
    }
}

#[async_trait]
impl BranchDeletionQueue for InMemoryQueue {
    async fn receive(
        &self,
        max_messages: i32,
        _wait_seconds: i32,
    ) -> ClientResult<Vec<QueueMessage>> {
        let mut state = self.state.lock();
        state.receive_calls += 1;
        if let Some(error) = &state.receive_failure {
            return Err(error.clone());
        }

        let now = Utc::now();
        let limit = usize::try_from(max_messages.max(0)).unwrap_or_default();
        let mut received = Vec::new();
        let mut dead = Vec::new();

        for message in state.messages.iter_mut() {
            if received.len() >= limit {
                break;
            }

            let is_available = message
                .invisible_until
                .map(|until| until <= now)
                .unwrap_or(true);
            if !is_available {
                continue;
            }

            if let Some(max) = self.max_receive_count {
                if message.receive_count >= max {
                    dead.push(message.id);
                    continue;
                }
            }

            message.receive_count += 1;
            message.invisible_until = Some(now + self.visibility_timeout);
            let receipt_handle = format!("{}-{}", message.id, message.receive_count);
            message.receipt_handle = Some(receipt_handle.clone());

            received.push(QueueMessage {
                message_id: message.id.to_string(),
                receipt_handle,
                body: message.body.clone(),
                receive_count: message.receive_count,
            });
        }

        for id in dead {
            if let Some(index) = state.messages.iter().position(|m| m.id == id) {
                if let Some(message) = state.messages.remove(index) {
                    state.dead_letters.push(message.body);
                }
            }
        }

        Ok(received)
    }

    async fn acknowledge(&self, receipt_handle: &str) -> ClientResult<()> {
        let mut state = self.state.lock();
        let index = state
            .messages
            .iter()
            .position(|message| message.receipt_handle.as_deref() == Some(receipt_handle))
            .ok_or_else(|| {
                ClientError::queue_operation(
                    self.name.clone(),
                    "acknowledge",
                    format!("unknown receipt handle {receipt_handle}"),
                )
            })?;

        state.messages.remove(index);
        state.acknowledged.push(receipt_handle.to_string());
        Ok(())
    }

    fn queue_name(&self) -> &str {
        &self.name
    }
}

/// Notification channel that records every envelope
#[derive(Debug, Default)]
pub struct InMemoryNotifier {
    published: Mutex<Vec<NotificationEnvelope>>,
    failing: bool,
}

impl InMemoryNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// A channel whose publishes always fail
    pub fn failing() -> Self {
        Self {
            published: Mutex::new(Vec::new()),
            failing: true,
        }
    }

    pub fn published(&self) -> Vec<NotificationEnvelope> {
        self.published.lock().clone()
    }

    /// Rendered chat texts, in publish order
    pub fn texts(&self) -> Vec<String> {
        self.published
            .lock()
            .iter()
            .filter_map(|envelope| {
                envelope
                    .detail
                    .pointer("/data/slack/text")
                    .and_then(|text| text.as_str())
                    .map(str::to_string)
            })
            .collect()
    }
}

#[async_trait]
impl NotificationChannel for InMemoryNotifier {
    async fn publish(&self, envelope: &NotificationEnvelope) -> ClientResult<()> {
        if self.failing {
            return Err(ClientError::service("PutEvents", "notification bus unavailable"));
        }
        self.published.lock().push(envelope.clone());
        Ok(())
    }
}
