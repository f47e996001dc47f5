//! Command bridge
//!
//! Name-keyed request/response channel between a caller and the task
//! manager. The host owns a [`Messenger`]; attaching a [`CommandBridge`]
//! registers it under the configured method channel, and detaching removes it
//! so no further commands reach the manager.

pub mod commands;

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use serde::Serialize;
use serde_json::Value;

use crate::service::TaskManager;
use commands::Command;

/// Outcome of a method call
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum MethodResult {
    Success { value: Value },
    Error { code: String, message: String },
    /// The method name is not supported; distinct from a failure
    NotImplemented,
}

impl MethodResult {
    pub fn success(value: impl Into<Value>) -> Self {
        MethodResult::Success {
            value: value.into(),
        }
    }

    pub fn error(code: impl Into<String>, message: impl Into<String>) -> Self {
        MethodResult::Error {
            code: code.into(),
            message: message.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, MethodResult::Success { .. })
    }

    pub fn is_not_implemented(&self) -> bool {
        matches!(self, MethodResult::NotImplemented)
    }

    /// JSON envelope for hosts that carry replies across a process boundary
    pub fn to_json(&self) -> Value {
        serde_json::to_value(self).unwrap_or(Value::Null)
    }
}

/// Receives method calls delivered on a channel
pub trait MethodHandler: Send + Sync {
    fn on_method_call(&self, method: &str, args: &Value) -> MethodResult;
}

/// Host-side dispatcher of method calls to registered handlers
#[derive(Default)]
pub struct Messenger {
    handlers: Mutex<HashMap<String, Arc<dyn MethodHandler>>>,
}

impl Messenger {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, Arc<dyn MethodHandler>>> {
        self.handlers.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Register a handler, replacing any previous one on the channel
    pub fn set_handler(&self, channel: impl Into<String>, handler: Arc<dyn MethodHandler>) {
        self.lock().insert(channel.into(), handler);
    }

    /// Remove the handler on a channel, but only if it is `handler`
    pub fn remove_handler(&self, channel: &str, handler: &Arc<dyn MethodHandler>) -> bool {
        let mut handlers = self.lock();
        match handlers.get(channel) {
            Some(current) if Arc::ptr_eq(current, handler) => {
                handlers.remove(channel);
                true
            }
            _ => false,
        }
    }

    pub fn has_handler(&self, channel: &str) -> bool {
        self.lock().contains_key(channel)
    }

    /// Deliver a method call. A channel without a handler answers
    /// `NotImplemented`.
    pub fn invoke(&self, channel: &str, method: &str, args: &Value) -> MethodResult {
        let handler = self.lock().get(channel).cloned();
        match handler {
            Some(handler) => handler.on_method_call(method, args),
            None => {
                tracing::debug!(channel, method, "No handler registered");
                MethodResult::NotImplemented
            }
        }
    }
}

impl std::fmt::Debug for Messenger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let channels: Vec<String> = self.lock().keys().cloned().collect();
        f.debug_struct("Messenger").field("channels", &channels).finish()
    }
}

/// Translates method calls into task manager actions
#[derive(Debug, Clone)]
pub struct CommandBridge {
    manager: Arc<TaskManager>,
}

impl CommandBridge {
    pub fn new(manager: Arc<TaskManager>) -> Self {
        Self { manager }
    }

    pub fn manager(&self) -> &Arc<TaskManager> {
        &self.manager
    }

    pub fn handle(&self, method: &str, args: &Value) -> MethodResult {
        match Command::parse(method, args) {
            Some(command) => {
                tracing::debug!(command = command.name(), "Handling bridge command");
                commands::execute(&self.manager, command)
            }
            None => {
                tracing::debug!(method, "Unsupported bridge command");
                MethodResult::NotImplemented
            }
        }
    }

    /// Register the bridge on `channel` and eagerly register the status
    /// indicator channel.
    pub fn attach(
        self,
        messenger: Arc<Messenger>,
        channel: impl Into<String>,
    ) -> AttachedBridge {
        let channel = channel.into();
        if let Err(e) = self.manager.ensure_channel() {
            // Retried on the first start
            tracing::warn!("Status indicator channel not registered on attach: {}", e);
        }

        let handler: Arc<dyn MethodHandler> = Arc::new(self);
        messenger.set_handler(channel.clone(), handler.clone());
        tracing::info!(channel = %channel, "Command bridge attached");

        AttachedBridge {
            messenger,
            channel,
            handler,
        }
    }
}

impl MethodHandler for CommandBridge {
    fn on_method_call(&self, method: &str, args: &Value) -> MethodResult {
        self.handle(method, args)
    }
}

/// A bridge registered on a messenger. Dropping it detaches the bridge.
pub struct AttachedBridge {
    messenger: Arc<Messenger>,
    channel: String,
    handler: Arc<dyn MethodHandler>,
}

impl AttachedBridge {
    pub fn channel(&self) -> &str {
        &self.channel
    }

    /// Unregister the bridge from its messenger
    pub fn detach(self) {}
}

impl Drop for AttachedBridge {
    fn drop(&mut self) {
        if self.messenger.remove_handler(&self.channel, &self.handler) {
            tracing::info!(channel = %self.channel, "Command bridge detached");
        }
    }
}

impl std::fmt::Debug for AttachedBridge {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AttachedBridge")
            .field("channel", &self.channel)
            .finish()
    }
}
