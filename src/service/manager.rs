//! Background task manager
//!
//! Two-state lifecycle (`Stopped`, `Running`) for the background task. All
//! mutations go through one mutex so the indicator slot always agrees with the
//! state, whether the transition comes from the command bridge or from an OS
//! callback thread. `state()` reads an atomic mirror and never blocks.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::core::{RestartPolicy, StartParameters, TaskSnapshot, TaskState};
use crate::host::{Platform, PlatformError, PromoteRequest, StartMode};
use crate::notifications::{StatusIndicator, StatusIndicatorChannel};
use crate::settings::{BridgeSettings, Capabilities};

/// Errors surfaced by task transitions
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TaskError {
    /// The OS refused to promote the task
    #[error("platform denied background start: {reason}")]
    PlatformDenied { reason: String },

    /// The indicator channel could not be registered
    #[error("status indicator channel registration failed: {0}")]
    ChannelRegistration(#[source] PlatformError),

    /// Any other platform failure
    #[error(transparent)]
    Platform(PlatformError),
}

impl TaskError {
    /// Stable error code reported across the command channel
    pub fn code(&self) -> &'static str {
        match self {
            TaskError::PlatformDenied { .. } => "PLATFORM_DENIED",
            TaskError::ChannelRegistration(_) => "CHANNEL_REGISTRATION_FAILED",
            TaskError::Platform(_) => "PLATFORM_UNAVAILABLE",
        }
    }
}

impl From<PlatformError> for TaskError {
    fn from(err: PlatformError) -> Self {
        match err {
            PlatformError::Denied { reason } => TaskError::PlatformDenied { reason },
            other => TaskError::Platform(other),
        }
    }
}

/// Identifiers and capabilities fixed for the manager's lifetime
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskConfig {
    pub task_id: u32,
    pub channel: StatusIndicatorChannel,
    pub capabilities: Capabilities,
    /// Declared to the OS from the start and reclaim callbacks
    pub restart_policy: RestartPolicy,
}

impl From<&BridgeSettings> for TaskConfig {
    fn from(settings: &BridgeSettings) -> Self {
        Self {
            task_id: settings.task_id,
            channel: settings.indicator_channel.clone(),
            capabilities: settings.resolve_capabilities(),
            restart_policy: settings.restart_policy,
        }
    }
}

impl Default for TaskConfig {
    fn default() -> Self {
        Self::from(&BridgeSettings::default())
    }
}

#[derive(Debug, Default)]
struct Inner {
    state: TaskState,
    parameters: Option<StartParameters>,
    indicator: Option<StatusIndicator>,
    channel_registered: bool,
    running_since: Option<DateTime<Utc>>,
    /// Set by a reclaim while running, consumed by the next start command
    pending_restart: bool,
    restarts: u32,
}

/// Owns the background task lifecycle and its status indicator
pub struct TaskManager {
    config: TaskConfig,
    platform: Arc<dyn Platform>,
    running: AtomicBool,
    inner: Mutex<Inner>,
}

impl TaskManager {
    pub fn new(config: TaskConfig, platform: Arc<dyn Platform>) -> Self {
        Self {
            config,
            platform,
            running: AtomicBool::new(false),
            inner: Mutex::new(Inner::default()),
        }
    }

    pub fn from_settings(settings: &BridgeSettings, platform: Arc<dyn Platform>) -> Self {
        Self::new(TaskConfig::from(settings), platform)
    }

    pub fn task_id(&self) -> u32 {
        self.config.task_id
    }

    pub fn config(&self) -> &TaskConfig {
        &self.config
    }

    /// Current state, read without taking the transition lock
    pub fn state(&self) -> TaskState {
        if self.running.load(Ordering::Acquire) {
            TaskState::Running
        } else {
            TaskState::Stopped
        }
    }

    pub fn is_running(&self) -> bool {
        self.state().is_running()
    }

    /// Indicator currently owned by the task, if any
    pub fn indicator(&self) -> Option<StatusIndicator> {
        self.lock().indicator.clone()
    }

    pub fn parameters(&self) -> Option<StartParameters> {
        self.lock().parameters.clone()
    }

    pub fn snapshot(&self) -> TaskSnapshot {
        let inner = self.lock();
        TaskSnapshot {
            state: inner.state,
            parameters: inner.parameters.clone(),
            indicator: inner.indicator.clone(),
            running_since: inner.running_since,
            restarts: inner.restarts,
        }
    }

    /// Register the indicator channel if this manager has not done so yet
    pub fn ensure_channel(&self) -> Result<(), TaskError> {
        let mut inner = self.lock();
        self.ensure_channel_locked(&mut inner)
    }

    /// Start the task, or re-render its indicator when already running
    pub fn start(&self, params: StartParameters) -> Result<(), TaskError> {
        let mut inner = self.lock();
        self.enter_running(&mut inner, params)
    }

    /// Stop the task. Stopping a stopped task is a no-op.
    ///
    /// The manager ends `Stopped` even when the platform reports a teardown
    /// failure; the failure is still returned.
    pub fn stop(&self) -> Result<(), TaskError> {
        let mut inner = self.lock();
        if !inner.state.is_running() {
            tracing::debug!(task_id = self.config.task_id, "Stop requested while stopped");
            return Ok(());
        }

        let task_id = self.config.task_id;
        let cleared = self.platform.clear_indicator(task_id);
        let demoted = self.platform.demote(task_id);
        self.reset(&mut inner);

        cleared.and(demoted).map_err(|e| {
            tracing::warn!(task_id, "Background task teardown failed: {}", e);
            TaskError::from(e)
        })?;

        tracing::info!(task_id, "Background task stopped");
        Ok(())
    }

    /// OS start callback, including redelivery after a reclaim.
    ///
    /// `None` means the OS had no intent to deliver; defaults are used.
    pub fn on_start_command(
        &self,
        intent: Option<StartParameters>,
    ) -> Result<RestartPolicy, TaskError> {
        let mut inner = self.lock();
        let restarting = std::mem::take(&mut inner.pending_restart);
        self.enter_running(&mut inner, intent.unwrap_or_default())?;

        if restarting {
            inner.restarts += 1;
            tracing::info!(
                task_id = self.config.task_id,
                restarts = inner.restarts,
                "Background task restarted after reclaim"
            );
        }
        Ok(self.config.restart_policy)
    }

    /// OS destroy callback. Always clears the indicator; errors are logged.
    pub fn on_destroy(&self) {
        let mut inner = self.lock();
        let task_id = self.config.task_id;
        if let Err(e) = self.platform.clear_indicator(task_id) {
            tracing::warn!(task_id, "Failed to clear status indicator on destroy: {}", e);
        }
        self.reset(&mut inner);
        tracing::info!(task_id, "Background task destroyed");
    }

    /// OS reclaimed the task's process for resources.
    ///
    /// The indicator died with the process. With the default policy the OS
    /// recreates the task and redelivers its last intent.
    pub fn on_system_reclaim(&self) -> RestartPolicy {
        let mut inner = self.lock();
        let was_running = inner.state.is_running();
        self.reset(&mut inner);
        inner.pending_restart =
            was_running && self.config.restart_policy == RestartPolicy::RedeliverLastIntent;
        tracing::info!(
            task_id = self.config.task_id,
            restart = inner.pending_restart,
            "Background task reclaimed by the system"
        );
        self.config.restart_policy
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn start_mode(&self) -> StartMode {
        if self.config.capabilities.elevated_background_start {
            StartMode::Elevated
        } else {
            StartMode::Regular
        }
    }

    fn ensure_channel_locked(&self, inner: &mut Inner) -> Result<(), TaskError> {
        if inner.channel_registered {
            return Ok(());
        }
        self.platform
            .register_channel_if_absent(&self.config.channel)
            .map_err(TaskError::ChannelRegistration)?;
        inner.channel_registered = true;
        tracing::debug!(channel = %self.config.channel.id, "Status indicator channel registered");
        Ok(())
    }

    fn enter_running(&self, inner: &mut Inner, params: StartParameters) -> Result<(), TaskError> {
        let task_id = self.config.task_id;
        let was_running = inner.state.is_running();

        if let Err(e) = self.ensure_channel_locked(inner) {
            self.abort_start(inner, was_running);
            return Err(e);
        }

        let indicator = StatusIndicator::render(
            task_id,
            &self.config.channel,
            &params,
            self.platform.main_entry_point(),
        );
        let request = PromoteRequest {
            task_id,
            indicator: &indicator,
            intent: &params,
            mode: self.start_mode(),
        };

        if let Err(e) = self.platform.promote(&request) {
            tracing::warn!(task_id, mode = ?request.mode, "Background start rejected: {}", e);
            self.abort_start(inner, was_running);
            return Err(e.into());
        }

        if was_running {
            tracing::debug!(task_id, title = %params.title, "Status indicator updated");
        } else {
            inner.running_since = Some(Utc::now());
            tracing::info!(task_id, mode = ?request.mode, title = %params.title, "Background task started");
        }
        inner.state = TaskState::Running;
        inner.pending_restart = false;
        inner.parameters = Some(params);
        inner.indicator = Some(indicator);
        self.running.store(true, Ordering::Release);
        Ok(())
    }

    /// Leave the task stopped with nothing visible after a failed start
    fn abort_start(&self, inner: &mut Inner, was_running: bool) {
        if was_running {
            let task_id = self.config.task_id;
            if let Err(e) = self.platform.clear_indicator(task_id) {
                tracing::warn!(task_id, "Clearing indicator after failed update failed: {}", e);
            }
            if let Err(e) = self.platform.demote(task_id) {
                tracing::warn!(task_id, "Demote after failed update failed: {}", e);
            }
        }
        self.reset(inner);
    }

    fn reset(&self, inner: &mut Inner) {
        inner.state = TaskState::Stopped;
        inner.parameters = None;
        inner.indicator = None;
        inner.running_since = None;
        inner.pending_restart = false;
        self.running.store(false, Ordering::Release);
    }
}

impl std::fmt::Debug for TaskManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TaskManager")
            .field("config", &self.config)
            .field("state", &self.state())
            .finish()
    }
}
