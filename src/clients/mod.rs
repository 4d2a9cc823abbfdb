//! # Cloud Provider Clients
//!
//! Async trait seams for every external collaborator plus two families of
//! implementations: AWS SDK-backed clients (feature `aws`) and in-memory
//! clients with failure injection for tests and dry runs.

#[cfg(feature = "aws")]
pub mod aws;
pub mod errors;
pub mod in_memory;
pub mod traits;

pub use errors::{ClientError, ClientResult};
pub use traits::{
    list_all_stacks, BranchDeletionQueue, NotificationChannel, NotificationEnvelope,
    StackDeletionRequester, StackExistenceChecker, StackInventory, StackPage,
};
