//! # Models
//!
//! Read-only views of the external world fetched once per tick: stacks with
//! their lifecycle status and tags, and messages drained from the
//! branch-deletion queue.

pub mod message;
pub mod stack;

pub use message::{BranchDeletionMessage, QueueMessage};
pub use stack::{Stack, StackStatus, Tag};
