use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// CloudFormation stack lifecycle states
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum StackStatus {
    CreateInProgress,
    CreateFailed,
    CreateComplete,
    RollbackInProgress,
    RollbackFailed,
    RollbackComplete,
    DeleteInProgress,
    DeleteFailed,
    DeleteComplete,
    UpdateInProgress,
    UpdateCompleteCleanupInProgress,
    UpdateComplete,
    UpdateFailed,
    UpdateRollbackInProgress,
    UpdateRollbackFailed,
    UpdateRollbackCompleteCleanupInProgress,
    UpdateRollbackComplete,
    ReviewInProgress,
    ImportInProgress,
    ImportComplete,
    ImportRollbackInProgress,
    ImportRollbackFailed,
    ImportRollbackComplete,
    /// Reported by the provider but not known to this build
    Unknown,
}

impl StackStatus {
    /// Statuses in which a stack is settled and may be deleted.
    ///
    /// Every `*_IN_PROGRESS` state is excluded, as is `DELETE_COMPLETE`.
    pub fn is_ok_to_touch(&self) -> bool {
        matches!(
            self,
            Self::CreateFailed
                | Self::CreateComplete
                | Self::RollbackFailed
                | Self::RollbackComplete
                | Self::DeleteFailed
                | Self::UpdateComplete
                | Self::UpdateFailed
                | Self::UpdateRollbackFailed
                | Self::UpdateRollbackComplete
                | Self::ImportComplete
                | Self::ImportRollbackFailed
                | Self::ImportRollbackComplete
        )
    }

    /// Check if the stack has finished deleting
    pub fn is_deleted(&self) -> bool {
        matches!(self, Self::DeleteComplete)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::CreateInProgress => "CREATE_IN_PROGRESS",
            Self::CreateFailed => "CREATE_FAILED",
            Self::CreateComplete => "CREATE_COMPLETE",
            Self::RollbackInProgress => "ROLLBACK_IN_PROGRESS",
            Self::RollbackFailed => "ROLLBACK_FAILED",
            Self::RollbackComplete => "ROLLBACK_COMPLETE",
            Self::DeleteInProgress => "DELETE_IN_PROGRESS",
            Self::DeleteFailed => "DELETE_FAILED",
            Self::DeleteComplete => "DELETE_COMPLETE",
            Self::UpdateInProgress => "UPDATE_IN_PROGRESS",
            Self::UpdateCompleteCleanupInProgress => "UPDATE_COMPLETE_CLEANUP_IN_PROGRESS",
            Self::UpdateComplete => "UPDATE_COMPLETE",
            Self::UpdateFailed => "UPDATE_FAILED",
            Self::UpdateRollbackInProgress => "UPDATE_ROLLBACK_IN_PROGRESS",
            Self::UpdateRollbackFailed => "UPDATE_ROLLBACK_FAILED",
            Self::UpdateRollbackCompleteCleanupInProgress => {
                "UPDATE_ROLLBACK_COMPLETE_CLEANUP_IN_PROGRESS"
            }
            Self::UpdateRollbackComplete => "UPDATE_ROLLBACK_COMPLETE",
            Self::ReviewInProgress => "REVIEW_IN_PROGRESS",
            Self::ImportInProgress => "IMPORT_IN_PROGRESS",
            Self::ImportComplete => "IMPORT_COMPLETE",
            Self::ImportRollbackInProgress => "IMPORT_ROLLBACK_IN_PROGRESS",
            Self::ImportRollbackFailed => "IMPORT_ROLLBACK_FAILED",
            Self::ImportRollbackComplete => "IMPORT_ROLLBACK_COMPLETE",
            Self::Unknown => "UNKNOWN",
        }
    }
}

impl fmt::Display for StackStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for StackStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "CREATE_IN_PROGRESS" => Ok(Self::CreateInProgress),
            "CREATE_FAILED" => Ok(Self::CreateFailed),
            "CREATE_COMPLETE" => Ok(Self::CreateComplete),
            "ROLLBACK_IN_PROGRESS" => Ok(Self::RollbackInProgress),
            "ROLLBACK_FAILED" => Ok(Self::RollbackFailed),
            "ROLLBACK_COMPLETE" => Ok(Self::RollbackComplete),
            "DELETE_IN_PROGRESS" => Ok(Self::DeleteInProgress),
            "DELETE_FAILED" => Ok(Self::DeleteFailed),
            "DELETE_COMPLETE" => Ok(Self::DeleteComplete),
            "UPDATE_IN_PROGRESS" => Ok(Self::UpdateInProgress),
            "UPDATE_COMPLETE_CLEANUP_IN_PROGRESS" => Ok(Self::UpdateCompleteCleanupInProgress),
            "UPDATE_COMPLETE" => Ok(Self::UpdateComplete),
            "UPDATE_FAILED" => Ok(Self::UpdateFailed),
            "UPDATE_ROLLBACK_IN_PROGRESS" => Ok(Self::UpdateRollbackInProgress),
            "UPDATE_ROLLBACK_FAILED" => Ok(Self::UpdateRollbackFailed),
            "UPDATE_ROLLBACK_COMPLETE_CLEANUP_IN_PROGRESS" => {
                Ok(Self::UpdateRollbackCompleteCleanupInProgress)
            }
            "UPDATE_ROLLBACK_COMPLETE" => Ok(Self::UpdateRollbackComplete),
            "REVIEW_IN_PROGRESS" => Ok(Self::ReviewInProgress),
            "IMPORT_IN_PROGRESS" => Ok(Self::ImportInProgress),
            "IMPORT_COMPLETE" => Ok(Self::ImportComplete),
            "IMPORT_ROLLBACK_IN_PROGRESS" => Ok(Self::ImportRollbackInProgress),
            "IMPORT_ROLLBACK_FAILED" => Ok(Self::ImportRollbackFailed),
            "IMPORT_ROLLBACK_COMPLETE" => Ok(Self::ImportRollbackComplete),
            _ => Err(format!("Invalid stack status: {s}")),
        }
    }
}

/// Key/value label attached to a stack
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tag {
    pub key: String,
    pub value: String,
}

impl Tag {
    pub fn new(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
        }
    }
}

/// Snapshot of a provisioned stack as reported by the inventory
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Stack {
    pub name: String,
    pub status: StackStatus,
    pub creation_time: DateTime<Utc>,
    #[serde(default)]
    pub tags: Vec<Tag>,
}

impl Stack {
    pub fn new(name: impl Into<String>, status: StackStatus, creation_time: DateTime<Utc>) -> Self {
        Self {
            name: name.into(),
            status,
            creation_time,
            tags: Vec::new(),
        }
    }

    /// Builder-style helper used by inventories and tests
    pub fn with_tag(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.tags.push(Tag::new(key, value));
        self
    }

    /// First tag whose key matches, if any
    pub fn tag(&self, key: &str) -> Option<&Tag> {
        self.tags.iter().find(|tag| tag.key == key)
    }

    /// Value of the first tag whose key matches, if any
    pub fn tag_value(&self, key: &str) -> Option<&str> {
        self.tag(key).map(|tag| tag.value.as_str())
    }

    pub fn is_ok_to_touch(&self) -> bool {
        self.status.is_ok_to_touch()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn stack() -> Stack {
        Stack::new(
            "igvfd-IGVF-246-DeployDevelopment-PostgresStack",
            StackStatus::CreateComplete,
            Utc.with_ymd_and_hms(2022, 8, 29, 21, 44, 28).unwrap(),
        )
        .with_tag("environment", "demo")
        .with_tag("branch", "IGVF-246-remove-uuid")
        .with_tag("time-to-live-hours", "72")
    }

    #[test]
    fn test_tag_lookup_returns_first_match() {
        let stack = stack().with_tag("time-to-live-hours", "1");
        let tag = stack.tag("time-to-live-hours").unwrap();
        assert_eq!(tag.value, "72");
        assert_eq!(stack.tag_value("branch"), Some("IGVF-246-remove-uuid"));
    }

    #[test]
    fn test_tag_lookup_missing_key() {
        assert!(stack().tag("turn-off-on-friday-night").is_none());

        let mut bare = stack();
        bare.tags.clear();
        assert!(bare.tag("branch").is_none());
    }

    #[test]
    fn test_ok_to_touch_excludes_transitional_states() {
        assert!(StackStatus::CreateComplete.is_ok_to_touch());
        assert!(StackStatus::DeleteFailed.is_ok_to_touch());
        assert!(StackStatus::UpdateRollbackComplete.is_ok_to_touch());
        assert!(!StackStatus::CreateInProgress.is_ok_to_touch());
        assert!(!StackStatus::DeleteInProgress.is_ok_to_touch());
        assert!(!StackStatus::DeleteComplete.is_ok_to_touch());
        assert!(!StackStatus::UpdateCompleteCleanupInProgress.is_ok_to_touch());
        assert!(!StackStatus::ReviewInProgress.is_ok_to_touch());
        assert!(!StackStatus::Unknown.is_ok_to_touch());
    }

    #[test]
    fn test_status_string_conversion() {
        assert_eq!(StackStatus::UpdateComplete.to_string(), "UPDATE_COMPLETE");
        assert_eq!(
            "IMPORT_ROLLBACK_COMPLETE".parse::<StackStatus>().unwrap(),
            StackStatus::ImportRollbackComplete
        );
        assert!("NOT_A_STATUS".parse::<StackStatus>().is_err());
    }

    #[test]
    fn test_status_serde_matches_provider_spelling() {
        let json = serde_json::to_string(&StackStatus::RollbackComplete).unwrap();
        assert_eq!(json, "\"ROLLBACK_COMPLETE\"");

        let parsed: StackStatus = serde_json::from_str("\"DELETE_FAILED\"").unwrap();
        assert_eq!(parsed, StackStatus::DeleteFailed);
    }
}
