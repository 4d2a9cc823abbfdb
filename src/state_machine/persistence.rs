//! Workflow checkpoints.
//!
//! The orchestrator saves a workflow after every transition and removes it at
//! a terminal state, so a restarted reaper resumes outstanding deletions
//! instead of starting them over.

use async_trait::async_trait;
use dashmap::DashMap;
use std::path::{Path, PathBuf};
use tracing::warn;

use super::deletion_workflow::DeletionWorkflow;
use super::errors::{StateMachineError, StateMachineResult};

#[async_trait]
pub trait CheckpointStore: Send + Sync {
    async fn save(&self, workflow: &DeletionWorkflow) -> StateMachineResult<()>;

    async fn remove(&self, stack_name: &str) -> StateMachineResult<()>;

    /// Every outstanding checkpoint
    async fn load_all(&self) -> StateMachineResult<Vec<DeletionWorkflow>>;
}

/// Process-local checkpoints
#[derive(Debug, Default)]
pub struct InMemoryCheckpointStore {
    workflows: DashMap<String, DeletionWorkflow>,
}

impl InMemoryCheckpointStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, stack_name: &str) -> Option<DeletionWorkflow> {
        self.workflows.get(stack_name).map(|entry| entry.clone())
    }

    pub fn len(&self) -> usize {
        self.workflows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.workflows.is_empty()
    }
}

#[async_trait]
impl CheckpointStore for InMemoryCheckpointStore {
    async fn save(&self, workflow: &DeletionWorkflow) -> StateMachineResult<()> {
        self.workflows
            .insert(workflow.stack_name.clone(), workflow.clone());
        Ok(())
    }

    async fn remove(&self, stack_name: &str) -> StateMachineResult<()> {
        self.workflows.remove(stack_name);
        Ok(())
    }

    async fn load_all(&self) -> StateMachineResult<Vec<DeletionWorkflow>> {
        Ok(self
            .workflows
            .iter()
            .map(|entry| entry.value().clone())
            .collect())
    }
}

/// One JSON file per stack under a directory
#[derive(Debug, Clone)]
pub struct FileCheckpointStore {
    directory: PathBuf,
}

impl FileCheckpointStore {
    /// Create the store, creating `directory` if needed
    pub async fn open(directory: impl Into<PathBuf>) -> StateMachineResult<Self> {
        let directory = directory.into();
        tokio::fs::create_dir_all(&directory)
            .await
            .map_err(|e| StateMachineError::persistence(directory.display().to_string(), e))?;
        Ok(Self { directory })
    }

    pub fn directory(&self) -> &Path {
        &self.directory
    }

    fn path_for(&self, stack_name: &str) -> PathBuf {
        self.directory.join(format!("{stack_name}.json"))
    }
}

#[async_trait]
impl CheckpointStore for FileCheckpointStore {
    async fn save(&self, workflow: &DeletionWorkflow) -> StateMachineResult<()> {
        let body = serde_json::to_vec_pretty(workflow)?;
        let target = self.path_for(&workflow.stack_name);
        let staging = self
            .directory
            .join(format!(".{}.json.tmp", workflow.stack_name));

        tokio::fs::write(&staging, body)
            .await
            .map_err(|e| StateMachineError::persistence(&workflow.stack_name, e))?;
        tokio::fs::rename(&staging, &target)
            .await
            .map_err(|e| StateMachineError::persistence(&workflow.stack_name, e))?;
        Ok(())
    }

    async fn remove(&self, stack_name: &str) -> StateMachineResult<()> {
        match tokio::fs::remove_file(self.path_for(stack_name)).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(StateMachineError::persistence(stack_name, e)),
        }
    }

    async fn load_all(&self) -> StateMachineResult<Vec<DeletionWorkflow>> {
        let dir_label = self.directory.display().to_string();
        let mut entries = tokio::fs::read_dir(&self.directory)
            .await
            .map_err(|e| StateMachineError::persistence(&dir_label, e))?;

        let mut workflows = Vec::new();
        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|e| StateMachineError::persistence(&dir_label, e))?
        {
            let path = entry.path();
            let is_checkpoint = path.extension().is_some_and(|ext| ext == "json")
                && !entry.file_name().to_string_lossy().starts_with('.');
            if !is_checkpoint {
                continue;
            }

            let body = tokio::fs::read(&path)
                .await
                .map_err(|e| StateMachineError::persistence(path.display().to_string(), e))?;
            match serde_json::from_slice::<DeletionWorkflow>(&body) {
                Ok(workflow) => workflows.push(workflow),
                Err(e) => warn!(
                    path = %path.display(),
                    error = %e,
                    "Skipping unreadable workflow checkpoint"
                ),
            }
        }

        Ok(workflows)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state_machine::{DeletionEvent, DeletionState, RetryCounter};
    use tempfile::TempDir;

    fn waiting(name: &str) -> DeletionWorkflow {
        DeletionWorkflow::new(name, RetryCounter::default())
            .apply(&DeletionEvent::Begin)
            .and_then(|wf| wf.apply(&DeletionEvent::CounterAdvanced))
            .and_then(|wf| {
                wf.apply(&DeletionEvent::DeleteAccepted {
                    resume_at: chrono::Utc::now(),
                })
            })
            .unwrap()
    }

    #[tokio::test]
    async fn test_in_memory_store_save_and_remove() {
        let store = InMemoryCheckpointStore::new();
        store.save(&waiting("a")).await.unwrap();
        store.save(&waiting("b")).await.unwrap();
        assert_eq!(store.len(), 2);

        store.remove("a").await.unwrap();
        assert!(store.get("a").is_none());
        assert_eq!(store.load_all().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_file_store_survives_reopen() {
        let dir = TempDir::new().unwrap();
        let store = FileCheckpointStore::open(dir.path()).await.unwrap();
        store.save(&waiting("demo-FrontendStack")).await.unwrap();

        let reopened = FileCheckpointStore::open(dir.path()).await.unwrap();
        let loaded = reopened.load_all().await.unwrap();
        assert_eq!(loaded.len(), 1);
        assert_eq!(loaded[0].stack_name, "demo-FrontendStack");
        assert!(matches!(loaded[0].state, DeletionState::Wait { .. }));
    }

    #[tokio::test]
    async fn test_file_store_overwrites_and_removes() {
        let dir = TempDir::new().unwrap();
        let store = FileCheckpointStore::open(dir.path().join("checkpoints"))
            .await
            .unwrap();

        let first = waiting("demo");
        store.save(&first).await.unwrap();
        let second = first.apply(&DeletionEvent::WaitElapsed).unwrap();
        store.save(&second).await.unwrap();

        let loaded = store.load_all().await.unwrap();
        assert_eq!(loaded, vec![second]);

        store.remove("demo").await.unwrap();
        store.remove("demo").await.unwrap();
        assert!(store.load_all().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_file_store_skips_corrupt_files() {
        let dir = TempDir::new().unwrap();
        let store = FileCheckpointStore::open(dir.path()).await.unwrap();
        tokio::fs::write(dir.path().join("broken.json"), b"{not json")
            .await
            .unwrap();
        store.save(&waiting("fine")).await.unwrap();

        let loaded = store.load_all().await.unwrap();
        assert_eq!(loaded.len(), 1);
        assert_eq!(loaded[0].stack_name, "fine");
    }
}
