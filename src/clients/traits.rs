//! Interfaces to the external collaborators.
//!
//! The policy engine and the deletion orchestrator only ever see these traits;
//! the provider-backed implementations live in `clients::aws` and the
//! in-memory ones used by tests live in `clients::in_memory`.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::errors::ClientResult;
use crate::models::{QueueMessage, Stack, StackStatus};

/// One page of the stack inventory
#[derive(Debug, Clone, Default)]
pub struct StackPage {
    pub stacks: Vec<Stack>,
    pub next_token: Option<String>,
}

/// Lists every stack visible to the account, possibly across several pages
#[async_trait]
pub trait StackInventory: Send + Sync {
    async fn list_stacks_page(&self, next_token: Option<String>) -> ClientResult<StackPage>;
}

/// Walk every inventory page and expose them as one sequence
pub async fn list_all_stacks(inventory: &dyn StackInventory) -> ClientResult<Vec<Stack>> {
    let mut stacks = Vec::new();
    let mut next_token = None;

    loop {
        let page = inventory.list_stacks_page(next_token).await?;
        stacks.extend(page.stacks);

        match page.next_token {
            Some(token) => next_token = Some(token),
            None => break,
        }
    }

    Ok(stacks)
}

/// Requests deletion of a stack by name
///
/// Implementations must be idempotent: asking to delete a stack that is
/// already deleting or no longer exists is not an error.
#[async_trait]
pub trait StackDeletionRequester: Send + Sync {
    async fn request_deletion(&self, stack_name: &str) -> ClientResult<()>;
}

/// Looks up the current status of a stack by name
///
/// `Ok(None)` is the expected "not found" answer for a deleted stack; errors
/// are reserved for failures of the lookup itself.
#[async_trait]
pub trait StackExistenceChecker: Send + Sync {
    async fn lookup_stack(&self, stack_name: &str) -> ClientResult<Option<StackStatus>>;
}

/// At-least-once queue of branch-deletion messages
#[async_trait]
pub trait BranchDeletionQueue: Send + Sync {
    /// Receive up to `max_messages` messages, waiting at most `wait_seconds`
    async fn receive(&self, max_messages: i32, wait_seconds: i32)
        -> ClientResult<Vec<QueueMessage>>;

    /// Remove a delivered message from the queue
    async fn acknowledge(&self, receipt_handle: &str) -> ClientResult<()>;

    /// Queue identifier used in logs
    fn queue_name(&self) -> &str;
}

/// Event published to the notification channel
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NotificationEnvelope {
    pub detail_type: String,
    pub source: String,
    pub detail: serde_json::Value,
}

/// Fire-and-forget notification channel
#[async_trait]
pub trait NotificationChannel: Send + Sync {
    async fn publish(&self, envelope: &NotificationEnvelope) -> ClientResult<()>;
}
