//! Branch-deletion policy.
//!
//! Drains the branch-deletion queue and correlates each reported branch with
//! the `branch` tag of the inventory. A message is acknowledged only once
//! nothing is left to do for it: protected branches and matched branches stay
//! on the queue, so the provider redelivers them on later ticks until either
//! the matching stacks are gone or the message is dead-lettered.

use serde::Serialize;
use std::collections::HashSet;
use tracing::{debug, info, instrument, warn};

use super::tags;
use super::PolicyKind;
use crate::clients::{BranchDeletionQueue, ClientResult};
use crate::config::BranchDeletionConfig;
use crate::logging::log_policy_decision;
use crate::models::{BranchDeletionMessage, QueueMessage, Stack};

/// What one drain of the queue did
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct BranchDrainReport {
    pub messages_received: usize,
    pub acknowledged: usize,
    pub protected_skipped: usize,
    pub unparseable: usize,
    /// Messages left on the queue because stacks still match their branch
    pub retained: usize,
}

#[derive(Debug)]
enum MessageDisposition {
    Acknowledge,
    Retain(Vec<Stack>),
    Protected,
    Unparseable,
}

pub struct BranchDeletionPolicy<'a> {
    config: &'a BranchDeletionConfig,
    branch_tag: &'a str,
    queue: &'a dyn BranchDeletionQueue,
}

impl<'a> BranchDeletionPolicy<'a> {
    pub fn new(
        config: &'a BranchDeletionConfig,
        branch_tag: &'a str,
        queue: &'a dyn BranchDeletionQueue,
    ) -> Self {
        Self {
            config,
            branch_tag,
            queue,
        }
    }

    /// Drain up to `max_batches` receives and select stacks of deleted branches
    ///
    /// `stacks` is the full inventory. Any stack still carrying the branch tag
    /// keeps its message on the queue, but only settled stacks are selected;
    /// a stack mid-update is picked up on a later tick.
    ///
    /// Receive failures propagate; acknowledgement failures are only logged
    /// because the message will simply be seen again.
    #[instrument(skip_all, fields(queue = %self.queue.queue_name()))]
    pub async fn select(&self, stacks: &[Stack]) -> ClientResult<(Vec<Stack>, BranchDrainReport)> {
        let mut selected = Vec::new();
        let mut report = BranchDrainReport::default();
        let mut seen = HashSet::new();

        for batch in 0..self.config.max_batches {
            let messages = self
                .queue
                .receive(self.config.batch_size, self.config.wait_seconds)
                .await?;
            debug!(batch, received = messages.len(), "Received branch-deletion batch");

            if messages.is_empty() {
                break;
            }

            let mut fresh = 0;
            for message in messages {
                if !seen.insert(message.message_id.clone()) {
                    continue;
                }
                fresh += 1;
                report.messages_received += 1;

                match self.evaluate(&message, stacks) {
                    MessageDisposition::Acknowledge => {
                        match self.queue.acknowledge(&message.receipt_handle).await {
                            Ok(()) => report.acknowledged += 1,
                            Err(e) => warn!(
                                receipt_handle = %message.receipt_handle,
                                error = %e,
                                "Failed to acknowledge branch-deletion message"
                            ),
                        }
                    }
                    MessageDisposition::Retain(matches) => {
                        report.retained += 1;
                        self.warn_if_near_dead_letter(&message);
                        selected.extend(matches);
                    }
                    MessageDisposition::Protected => {
                        report.protected_skipped += 1;
                        self.warn_if_near_dead_letter(&message);
                    }
                    MessageDisposition::Unparseable => {
                        report.unparseable += 1;
                        self.warn_if_near_dead_letter(&message);
                    }
                }
            }

            // Only redeliveries of messages already handled this drain
            if fresh == 0 {
                break;
            }
        }

        info!(
            received = report.messages_received,
            acknowledged = report.acknowledged,
            retained = report.retained,
            protected = report.protected_skipped,
            unparseable = report.unparseable,
            selected = selected.len(),
            "Branch-deletion queue drained"
        );

        Ok((selected, report))
    }

    fn evaluate(&self, message: &QueueMessage, stacks: &[Stack]) -> MessageDisposition {
        let parsed = match BranchDeletionMessage::from_body(&message.body) {
            Ok(parsed) => parsed,
            Err(e) => {
                warn!(
                    message_id = %message.message_id,
                    error = %e,
                    "Unparseable branch-deletion message, leaving it for the dead-letter queue"
                );
                return MessageDisposition::Unparseable;
            }
        };

        if self.config.is_protected(&parsed.branch) {
            debug!(branch = %parsed.branch, "Ignoring protected branch");
            return MessageDisposition::Protected;
        }

        let remaining: Vec<&Stack> = stacks
            .iter()
            .filter(|stack| {
                !stack.status.is_deleted()
                    && tags::branch(stack, self.branch_tag) == Some(parsed.branch.as_str())
            })
            .collect();

        if remaining.is_empty() {
            debug!(branch = %parsed.branch, "No stacks left for deleted branch");
            return MessageDisposition::Acknowledge;
        }

        let mut matches = Vec::new();
        for stack in remaining {
            let settled = stack.is_ok_to_touch();
            log_policy_decision(
                PolicyKind::BranchDeletion.as_str(),
                &stack.name,
                settled,
                Some(&format!("branch {}, status {}", parsed.branch, stack.status)),
            );
            if settled {
                matches.push(stack.clone());
            }
        }
        MessageDisposition::Retain(matches)
    }

    fn warn_if_near_dead_letter(&self, message: &QueueMessage) {
        let max = self.config.max_receive_count;
        if max > 0 && message.receive_count >= max.saturating_sub(1) {
            warn!(
                message_id = %message.message_id,
                receive_count = message.receive_count,
                max_receive_count = max,
                "Branch-deletion message is about to be dead-lettered"
            );
        }
    }
}
