//! OS-facing collaborators
//!
//! The task manager never talks to the operating system directly. Whatever
//! hosts it supplies implementations of these traits.

use thiserror::Error;

use crate::core::StartParameters;
use crate::notifications::{EntryPoint, StatusIndicator, StatusIndicatorChannel};

/// Errors reported by the hosting OS
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PlatformError {
    /// The OS refused to run the task as a protected background task
    #[error("background start denied: {reason}")]
    Denied { reason: String },

    /// The facility could not be reached or failed internally
    #[error("platform unavailable: {0}")]
    Unavailable(String),
}

impl PlatformError {
    pub fn denied(reason: impl Into<String>) -> Self {
        PlatformError::Denied {
            reason: reason.into(),
        }
    }
}

/// Which start path the OS is asked to use
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StartMode {
    /// Elevated-priority start that must be followed by a visible indicator
    Elevated,
    /// Regular background start on platforms without the elevated path
    Regular,
}

/// Request to run the task as a long-lived, visibly indicated background task
#[derive(Debug, Clone, Copy)]
pub struct PromoteRequest<'a> {
    pub task_id: u32,
    pub indicator: &'a StatusIndicator,
    /// Payload the OS keeps for redelivery on a sticky restart
    pub intent: &'a StartParameters,
    pub mode: StartMode,
}

/// Task-hosting facility
pub trait TaskHost: Send + Sync {
    /// Promote the task and attach the indicator.
    ///
    /// Promoting an already promoted task replaces its indicator in place.
    fn promote(&self, request: &PromoteRequest<'_>) -> Result<(), PlatformError>;

    /// Stop the background task entirely
    fn demote(&self, task_id: u32) -> Result<(), PlatformError>;

    /// Remove the indicator attached to a task
    fn clear_indicator(&self, task_id: u32) -> Result<(), PlatformError>;
}

/// Status indicator channel registry
pub trait ChannelRegistry: Send + Sync {
    /// Register a channel; a no-op when one with the same id exists
    fn register_channel_if_absent(
        &self,
        channel: &StatusIndicatorChannel,
    ) -> Result<(), PlatformError>;
}

/// Resolves the caller's primary UI entry point
pub trait EntryPointResolver: Send + Sync {
    fn main_entry_point(&self) -> EntryPoint;
}

/// Everything the task manager needs from its host
pub trait Platform: TaskHost + ChannelRegistry + EntryPointResolver {}

impl<T> Platform for T where T: TaskHost + ChannelRegistry + EntryPointResolver {}
