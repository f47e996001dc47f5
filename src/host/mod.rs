//! Host module for the OS collaborators the task manager runs against

pub mod memory;
pub mod platform;

pub use memory::InMemoryPlatform;
pub use platform::{
    ChannelRegistry, EntryPointResolver, Platform, PlatformError, PromoteRequest, StartMode,
    TaskHost,
};
