//! bglocation - command bridge and lifecycle manager for a persistent
//! background location task
//!
//! - Command bridge for `startForegroundService` / `stopForegroundService`
//! - Two-state task manager that keeps the mandatory status indicator in step
//!   with the task state
//! - OS collaborators (task host, channel registry, entry point resolver) as
//!   traits, with an in-memory implementation
//!
//! ```
//! use std::sync::Arc;
//!
//! use bglocation::bridge::{CommandBridge, Messenger};
//! use bglocation::host::InMemoryPlatform;
//! use bglocation::service::TaskManager;
//! use bglocation::settings::BridgeSettings;
//!
//! let settings = BridgeSettings::default();
//! let platform = Arc::new(InMemoryPlatform::new());
//! let manager = Arc::new(TaskManager::from_settings(&settings, platform.clone()));
//! let messenger = Arc::new(Messenger::new());
//! let _bridge = CommandBridge::new(manager.clone())
//!     .attach(messenger.clone(), settings.method_channel.clone());
//!
//! let reply = messenger.invoke(
//!     &settings.method_channel,
//!     "startForegroundService",
//!     &serde_json::json!({"title": "Trip"}),
//! );
//! assert!(reply.is_success());
//! assert!(manager.is_running());
//! ```

pub mod bridge;
pub mod core;
pub mod host;
pub mod logging;
pub mod notifications;
pub mod service;
pub mod settings;

pub use bridge::{AttachedBridge, CommandBridge, Messenger, MethodHandler, MethodResult};
pub use crate::core::{RestartPolicy, StartParameters, TaskSnapshot, TaskState};
pub use host::{InMemoryPlatform, Platform, PlatformError};
pub use notifications::{StatusIndicator, StatusIndicatorChannel};
pub use service::{TaskConfig, TaskError, TaskManager};
pub use settings::{BridgeSettings, Capabilities};
