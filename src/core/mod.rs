//! Core data models

mod start_params;
mod task_state;

pub use start_params::*;
pub use task_state::*;
