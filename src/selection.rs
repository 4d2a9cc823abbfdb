//! # Selection Coordinator
//!
//! Runs every enabled eligibility policy against one freshly listed
//! inventory snapshot and merges the results into a [`DeletionCandidateSet`]
//! keyed by stack name. Only settled stacks are ever selected; the branch
//! policy also sees transitional stacks so their queue messages are kept.
//!
//! Selection fails closed: if the inventory cannot be listed, or the
//! branch-deletion queue cannot be read, the error propagates and no
//! deletions are attempted this tick.

use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{info, instrument};

use crate::clients::{list_all_stacks, BranchDeletionQueue, StackInventory};
use crate::clock::Clock;
use crate::config::ReaperConfig;
use crate::error::Result;
use crate::models::Stack;
use crate::policy::{
    BranchDeletionPolicy, BranchDrainReport, PolicyKind, QuietWindow, QuietWindowPolicy,
    TimeToLivePolicy,
};

/// A stack chosen for deletion and the policies that chose it
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Candidate {
    pub stack: Stack,
    pub reasons: Vec<PolicyKind>,
}

/// Stacks selected for deletion, deduplicated by name
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct DeletionCandidateSet {
    candidates: BTreeMap<String, Candidate>,
}

impl DeletionCandidateSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record that `reason` selected `stack`; repeats merge into one entry
    pub fn insert(&mut self, stack: Stack, reason: PolicyKind) {
        let candidate = self
            .candidates
            .entry(stack.name.clone())
            .or_insert_with(|| Candidate {
                stack,
                reasons: Vec::new(),
            });
        if !candidate.reasons.contains(&reason) {
            candidate.reasons.push(reason);
        }
    }

    pub fn extend(&mut self, stacks: impl IntoIterator<Item = Stack>, reason: PolicyKind) {
        for stack in stacks {
            self.insert(stack, reason);
        }
    }

    pub fn len(&self) -> usize {
        self.candidates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.candidates.is_empty()
    }

    pub fn contains(&self, stack_name: &str) -> bool {
        self.candidates.contains_key(stack_name)
    }

    pub fn get(&self, stack_name: &str) -> Option<&Candidate> {
        self.candidates.get(stack_name)
    }

    pub fn names(&self) -> Vec<String> {
        self.candidates.keys().cloned().collect()
    }

    pub fn candidates(&self) -> impl Iterator<Item = &Candidate> {
        self.candidates.values()
    }

    pub fn count_for(&self, reason: PolicyKind) -> usize {
        self.candidates
            .values()
            .filter(|candidate| candidate.reasons.contains(&reason))
            .count()
    }
}

/// Selection result plus what the queue drain did
#[derive(Debug, Clone, Default, Serialize)]
pub struct SelectionOutcome {
    pub candidates: DeletionCandidateSet,
    pub inventory_size: usize,
    pub eligible_size: usize,
    pub branch_drain: Option<BranchDrainReport>,
}

pub struct SelectionCoordinator {
    config: Arc<ReaperConfig>,
    inventory: Arc<dyn StackInventory>,
    queue: Option<Arc<dyn BranchDeletionQueue>>,
    clock: Arc<dyn Clock>,
}

impl SelectionCoordinator {
    pub fn new(
        config: Arc<ReaperConfig>,
        inventory: Arc<dyn StackInventory>,
        queue: Option<Arc<dyn BranchDeletionQueue>>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            config,
            inventory,
            queue,
            clock,
        }
    }

    #[instrument(skip_all)]
    pub async fn select(&self) -> Result<SelectionOutcome> {
        let inventory = list_all_stacks(self.inventory.as_ref()).await?;
        let inventory_size = inventory.len();
        let stacks: Vec<Stack> = inventory
            .iter()
            .filter(|stack| stack.is_ok_to_touch())
            .cloned()
            .collect();

        let now = self.clock.now();
        let policies = &self.config.policies;
        let tag_keys = &self.config.tags;
        let mut candidates = DeletionCandidateSet::new();

        if policies.time_to_live.enabled {
            let policy = TimeToLivePolicy::new(&tag_keys.time_to_live_hours);
            candidates.extend(policy.select(&stacks, now), PolicyKind::TimeToLive);
        }

        if policies.quiet_window.enabled {
            let window = QuietWindow::from_config(&policies.quiet_window)?;
            let policy = QuietWindowPolicy::new(
                window,
                &tag_keys.turn_off_on_friday_night,
                &tag_keys.affirmative_value,
            );
            candidates.extend(policy.select(&stacks, now), PolicyKind::QuietWindow);
        }

        let mut branch_drain = None;
        if policies.branch_deletion.enabled {
            if let Some(queue) = &self.queue {
                let policy = BranchDeletionPolicy::new(
                    &policies.branch_deletion,
                    &tag_keys.branch,
                    queue.as_ref(),
                );
                let (selected, report) = policy.select(&inventory).await?;
                candidates.extend(selected, PolicyKind::BranchDeletion);
                branch_drain = Some(report);
            }
        }

        info!(
            inventory = inventory_size,
            eligible = stacks.len(),
            selected = candidates.len(),
            time_to_live = candidates.count_for(PolicyKind::TimeToLive),
            quiet_window = candidates.count_for(PolicyKind::QuietWindow),
            branch_deletion = candidates.count_for(PolicyKind::BranchDeletion),
            "Selection complete"
        );

        Ok(SelectionOutcome {
            candidates,
            inventory_size,
            eligible_size: stacks.len(),
            branch_drain,
        })
    }
}
