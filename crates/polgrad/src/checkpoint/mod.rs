//! Checkpoint system for resumable training.

mod manager;
mod state;

pub use manager::{CheckpointConfig, CheckpointManager};
pub use state::{Checkpointable, CheckpointMetrics, CheckpointState};
