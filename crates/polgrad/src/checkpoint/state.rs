//! Checkpoint state and trait definitions.

use crate::Result;
use serde::{Deserialize, Serialize};

/// Trait for components that can be checkpointed.
pub trait Checkpointable {
    /// Serialize the component's state to bytes.
    fn save_state(&self) -> Result<Vec<u8>>;

    /// Restore the component's state from bytes.
    fn load_state(&mut self, data: &[u8]) -> Result<()>;
}

/// Training metrics snapshot for checkpoints.
#[derive(Serialize, Deserialize, Clone, Debug, Default)]
pub struct CheckpointMetrics {
    /// Mean episode return at checkpoint time
    pub mean_return: f64,
    /// Latest policy-gradient loss
    pub last_loss: f64,
}

/// Complete training checkpoint state.
///
/// Contains everything needed to resume a REINFORCE run from a checkpoint.
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct CheckpointState {
    /// Optimizer update count
    pub updates: u64,
    /// Total episodes collected
    pub episodes: u64,
    /// Serialized policy weights
    pub policy_weights: Vec<u8>,
    /// Training metrics at checkpoint time
    pub metrics: CheckpointMetrics,
    /// Timestamp when checkpoint was created (unix seconds)
    pub timestamp: String,
    /// polgrad version
    pub version: String,
}

impl CheckpointState {
    /// Create a new checkpoint state.
    pub fn new(
        updates: u64,
        episodes: u64,
        policy_weights: Vec<u8>,
        metrics: CheckpointMetrics,
    ) -> Self {
        Self {
            updates,
            episodes,
            policy_weights,
            metrics,
            timestamp: unix_timestamp(),
            version: crate::VERSION.to_string(),
        }
    }
}

/// Get current timestamp as unix seconds.
fn unix_timestamp() -> String {
    use std::time::{SystemTime, UNIX_EPOCH};
    let duration = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default();
    format!("{}", duration.as_secs())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_checkpoint_state_creation() {
        let metrics = CheckpointMetrics {
            mean_return: 100.0,
            last_loss: 0.5,
        };

        let state = CheckpointState::new(10, 5000, vec![1, 2, 3], metrics);

        assert_eq!(state.updates, 10);
        assert_eq!(state.episodes, 5000);
        assert_eq!(state.policy_weights, vec![1, 2, 3]);
        assert_eq!(state.metrics.mean_return, 100.0);
        assert_eq!(state.version, crate::VERSION);
    }

    #[test]
    fn test_checkpoint_state_serialization() {
        let state = CheckpointState::new(5, 1000, vec![1, 2, 3], CheckpointMetrics::default());

        let json = serde_json::to_string(&state).unwrap();
        let restored: CheckpointState = serde_json::from_str(&json).unwrap();

        assert_eq!(state.updates, restored.updates);
        assert_eq!(state.episodes, restored.episodes);
        assert_eq!(state.policy_weights, restored.policy_weights);
    }
}
