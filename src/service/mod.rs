//! Background task service

mod manager;

pub use manager::{TaskConfig, TaskError, TaskManager};
