//! In-memory platform
//!
//! Models the OS bookkeeping a real host performs: registered channels,
//! visible indicators, promoted tasks and the last delivered start intent kept
//! for sticky restarts. Used for tests and for hosts that want to dry-run the
//! bridge.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

use super::platform::{
    ChannelRegistry, EntryPointResolver, PlatformError, PromoteRequest, StartMode, TaskHost,
};
use crate::core::{RestartPolicy, StartParameters};
use crate::notifications::{EntryPoint, StatusIndicator, StatusIndicatorChannel};
use crate::service::{TaskError, TaskManager};

#[derive(Debug, Default)]
struct PlatformState {
    channels: HashMap<String, StatusIndicatorChannel>,
    channel_requests: usize,
    indicators: HashMap<u32, StatusIndicator>,
    promoted: HashMap<u32, StartMode>,
    last_intents: HashMap<u32, StartParameters>,
    promote_requests: usize,
    deny_reason: Option<String>,
    fail_teardown: bool,
}

/// Simulated OS host
#[derive(Debug)]
pub struct InMemoryPlatform {
    entry_point: EntryPoint,
    state: Mutex<PlatformState>,
}

impl InMemoryPlatform {
    pub fn new() -> Self {
        Self::with_entry_point(EntryPoint::new("main"))
    }

    pub fn with_entry_point(entry_point: EntryPoint) -> Self {
        Self {
            entry_point,
            state: Mutex::new(PlatformState::default()),
        }
    }

    fn lock(&self) -> MutexGuard<'_, PlatformState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Deny every subsequent promotion with the given reason
    pub fn deny_promotions(&self, reason: impl Into<String>) {
        self.lock().deny_reason = Some(reason.into());
    }

    /// Accept promotions again
    pub fn allow_promotions(&self) {
        self.lock().deny_reason = None;
    }

    /// Make demote and indicator removal fail
    pub fn fail_teardown(&self, fail: bool) {
        self.lock().fail_teardown = fail;
    }

    /// Indicator currently visible for a task
    pub fn indicator(&self, task_id: u32) -> Option<StatusIndicator> {
        self.lock().indicators.get(&task_id).cloned()
    }

    pub fn visible_indicators(&self) -> usize {
        self.lock().indicators.len()
    }

    pub fn is_promoted(&self, task_id: u32) -> bool {
        self.lock().promoted.contains_key(&task_id)
    }

    pub fn start_mode(&self, task_id: u32) -> Option<StartMode> {
        self.lock().promoted.get(&task_id).copied()
    }

    pub fn channel(&self, id: &str) -> Option<StatusIndicatorChannel> {
        self.lock().channels.get(id).cloned()
    }

    /// Number of channel registration calls, including deduplicated ones
    pub fn channel_requests(&self) -> usize {
        self.lock().channel_requests
    }

    pub fn promote_requests(&self) -> usize {
        self.lock().promote_requests
    }

    /// Intent the OS would redeliver if the task were restarted
    pub fn last_intent(&self, task_id: u32) -> Option<StartParameters> {
        self.lock().last_intents.get(&task_id).cloned()
    }

    /// Reclaim the task's process for resources, then restart it the way the
    /// OS does for a sticky task.
    ///
    /// Returns `Ok(None)` when the task was not promoted and so nothing is
    /// restarted, otherwise the policy the manager declared.
    pub fn reclaim(&self, manager: &TaskManager) -> Result<Option<RestartPolicy>, TaskError> {
        match self.kill(manager) {
            Some(policy) => self.redeliver(manager, policy).map(Some),
            None => Ok(None),
        }
    }

    /// First half of [`reclaim`](Self::reclaim): kill the task's process.
    ///
    /// Returns the declared policy when the task was promoted.
    pub fn kill(&self, manager: &TaskManager) -> Option<RestartPolicy> {
        let task_id = manager.task_id();
        let was_promoted = {
            let mut state = self.lock();
            state.indicators.remove(&task_id);
            state.promoted.remove(&task_id).is_some()
        };

        let policy = manager.on_system_reclaim();
        was_promoted.then_some(policy)
    }

    /// Second half of [`reclaim`](Self::reclaim): act on the declared policy.
    pub fn redeliver(
        &self,
        manager: &TaskManager,
        policy: RestartPolicy,
    ) -> Result<RestartPolicy, TaskError> {
        let task_id = manager.task_id();
        match policy {
            RestartPolicy::RedeliverLastIntent => {
                // Read now, not at kill time, so a start in between wins
                let intent = self.last_intent(task_id);
                tracing::debug!(task_id, redelivered = intent.is_some(), "Restarting reclaimed task");
                manager.on_start_command(intent)
            }
            RestartPolicy::NotSticky => {
                self.lock().last_intents.remove(&task_id);
                Ok(policy)
            }
        }
    }

    /// Destroy the task explicitly. The OS forgets it, so a later reclaim
    /// restarts nothing.
    pub fn destroy(&self, manager: &TaskManager) {
        let task_id = manager.task_id();
        {
            let mut state = self.lock();
            state.promoted.remove(&task_id);
            state.last_intents.remove(&task_id);
        }
        manager.on_destroy();
    }
}

impl Default for InMemoryPlatform {
    fn default() -> Self {
        Self::new()
    }
}

impl TaskHost for InMemoryPlatform {
    fn promote(&self, request: &PromoteRequest<'_>) -> Result<(), PlatformError> {
        let mut state = self.lock();
        state.promote_requests += 1;

        if let Some(reason) = &state.deny_reason {
            return Err(PlatformError::denied(reason.clone()));
        }
        if !state.channels.contains_key(&request.indicator.channel_id) {
            return Err(PlatformError::Unavailable(format!(
                "channel '{}' is not registered",
                request.indicator.channel_id
            )));
        }

        state
            .indicators
            .insert(request.task_id, request.indicator.clone());
        state.promoted.insert(request.task_id, request.mode);
        state
            .last_intents
            .insert(request.task_id, request.intent.clone());
        Ok(())
    }

    fn demote(&self, task_id: u32) -> Result<(), PlatformError> {
        let mut state = self.lock();
        if state.fail_teardown {
            return Err(PlatformError::Unavailable("demote failed".to_string()));
        }
        state.promoted.remove(&task_id);
        state.indicators.remove(&task_id);
        // Explicitly stopped tasks are not restarted
        state.last_intents.remove(&task_id);
        Ok(())
    }

    fn clear_indicator(&self, task_id: u32) -> Result<(), PlatformError> {
        let mut state = self.lock();
        if state.fail_teardown {
            return Err(PlatformError::Unavailable(
                "indicator removal failed".to_string(),
            ));
        }
        state.indicators.remove(&task_id);
        Ok(())
    }
}

impl ChannelRegistry for InMemoryPlatform {
    fn register_channel_if_absent(
        &self,
        channel: &StatusIndicatorChannel,
    ) -> Result<(), PlatformError> {
        let mut state = self.lock();
        state.channel_requests += 1;
        state
            .channels
            .entry(channel.id.clone())
            .or_insert_with(|| channel.clone());
        Ok(())
    }
}

impl EntryPointResolver for InMemoryPlatform {
    fn main_entry_point(&self) -> EntryPoint {
        self.entry_point.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn indicator(channel: &StatusIndicatorChannel, params: &StartParameters) -> StatusIndicator {
        StatusIndicator::render(9, channel, params, EntryPoint::new("main"))
    }

    #[test]
    fn test_channel_registration_deduplicates() {
        let platform = InMemoryPlatform::new();
        let channel = StatusIndicatorChannel::default();
        let renamed = StatusIndicatorChannel {
            name: "Other".to_string(),
            ..channel.clone()
        };

        platform.register_channel_if_absent(&channel).unwrap();
        platform.register_channel_if_absent(&renamed).unwrap();

        assert_eq!(platform.channel_requests(), 2);
        assert_eq!(platform.channel(&channel.id).unwrap().name, channel.name);
    }

    #[test]
    fn test_promote_requires_channel() {
        let platform = InMemoryPlatform::new();
        let channel = StatusIndicatorChannel::default();
        let params = StartParameters::default();
        let indicator = indicator(&channel, &params);
        let request = PromoteRequest {
            task_id: 9,
            indicator: &indicator,
            intent: &params,
            mode: StartMode::Elevated,
        };

        assert!(matches!(
            platform.promote(&request),
            Err(PlatformError::Unavailable(_))
        ));

        platform.register_channel_if_absent(&channel).unwrap();
        platform.promote(&request).unwrap();
        assert!(platform.is_promoted(9));
        assert_eq!(platform.start_mode(9), Some(StartMode::Elevated));
        assert_eq!(platform.last_intent(9), Some(params));
    }

    #[test]
    fn test_demote_forgets_intent() {
        let platform = InMemoryPlatform::new();
        let channel = StatusIndicatorChannel::default();
        let params = StartParameters::default();
        let indicator = indicator(&channel, &params);
        platform.register_channel_if_absent(&channel).unwrap();
        platform
            .promote(&PromoteRequest {
                task_id: 9,
                indicator: &indicator,
                intent: &params,
                mode: StartMode::Regular,
            })
            .unwrap();

        platform.demote(9).unwrap();
        assert!(!platform.is_promoted(9));
        assert!(platform.indicator(9).is_none());
        assert!(platform.last_intent(9).is_none());
    }

    #[test]
    fn test_denied_promotion() {
        let platform = InMemoryPlatform::new();
        platform.deny_promotions("quota exhausted");
        let channel = StatusIndicatorChannel::default();
        let params = StartParameters::default();
        let indicator = indicator(&channel, &params);
        platform.register_channel_if_absent(&channel).unwrap();

        let err = platform
            .promote(&PromoteRequest {
                task_id: 9,
                indicator: &indicator,
                intent: &params,
                mode: StartMode::Elevated,
            })
            .unwrap_err();
        assert_eq!(err, PlatformError::denied("quota exhausted"));
        assert_eq!(platform.visible_indicators(), 0);
    }
}
