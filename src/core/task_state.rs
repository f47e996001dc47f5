//! Task lifecycle state and diagnostic snapshot

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::StartParameters;
use crate::notifications::StatusIndicator;

/// Lifecycle state of the background task
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskState {
    /// No background task, no indicator
    #[default]
    Stopped,
    /// Background task promoted, indicator visible
    Running,
}

impl TaskState {
    pub fn is_running(&self) -> bool {
        matches!(self, TaskState::Running)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            TaskState::Stopped => "stopped",
            TaskState::Running => "running",
        }
    }
}

impl std::fmt::Display for TaskState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What the task declares to the OS about being restarted after it is killed.
///
/// Configured through `BridgeSettings::restart_policy`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RestartPolicy {
    /// Recreate the task and redeliver the last start intent
    RedeliverLastIntent,
    /// Leave the task dead until explicitly started again
    NotSticky,
}

/// Point-in-time view of the task manager, for diagnostics
#[derive(Debug, Clone, Serialize)]
pub struct TaskSnapshot {
    pub state: TaskState,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub parameters: Option<StartParameters>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub indicator: Option<StatusIndicator>,

    /// When the task last entered `Running`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub running_since: Option<DateTime<Utc>>,

    /// Number of OS-driven restarts after a reclaim
    pub restarts: u32,
}

impl TaskSnapshot {
    /// The status indicator invariant: an indicator exists iff running
    pub fn is_consistent(&self) -> bool {
        self.indicator.is_some() == self.state.is_running()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_initial_state_is_stopped() {
        assert_eq!(TaskState::default(), TaskState::Stopped);
        assert!(!TaskState::default().is_running());
    }

    #[test]
    fn test_state_display() {
        assert_eq!(TaskState::Running.to_string(), "running");
        assert_eq!(
            serde_json::to_string(&TaskState::Stopped).unwrap(),
            "\"stopped\""
        );
    }

    #[test]
    fn test_snapshot_consistency() {
        let snapshot = TaskSnapshot {
            state: TaskState::Running,
            parameters: None,
            indicator: None,
            running_since: None,
            restarts: 0,
        };
        assert!(!snapshot.is_consistent());

        let stopped = TaskSnapshot {
            state: TaskState::Stopped,
            ..snapshot
        };
        assert!(stopped.is_consistent());
    }
}
