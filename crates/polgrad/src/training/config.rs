//! Model and trainer configuration.

use serde::{Deserialize, Serialize};
use tch::Device;

/// Configuration shared by the encoder and the policy network.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ModelConfig {
    /// Observation vector width fed to the encoder
    pub input_size: i64,
    /// Per-step state vector width fed to the policy
    pub state_size: i64,
    /// Number of orthogonal action dimensions, last one reserved as the no-op
    pub num_actions: i64,
    /// Numeric bound for sampled action values
    pub act_lim: f64,
    /// Hidden size; also the context vector width
    pub hidden_size: i64,
    /// Number of stacked recurrent layers
    pub num_layers: i64,
    /// Dropout probability between layers, in [0, 1)
    pub dropout: f64,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            input_size: 8,
            state_size: 8,
            num_actions: 4,
            act_lim: 1.0,
            hidden_size: 128,
            num_layers: 2,
            dropout: 0.85,
        }
    }
}

impl ModelConfig {
    pub fn with_input_size(mut self, input_size: i64) -> Self {
        self.input_size = input_size;
        self
    }

    pub fn with_state_size(mut self, state_size: i64) -> Self {
        self.state_size = state_size;
        self
    }

    pub fn with_num_actions(mut self, num_actions: i64) -> Self {
        self.num_actions = num_actions;
        self
    }

    pub fn with_act_lim(mut self, act_lim: f64) -> Self {
        self.act_lim = act_lim;
        self
    }

    pub fn with_hidden_size(mut self, hidden_size: i64) -> Self {
        self.hidden_size = hidden_size;
        self
    }

    pub fn with_num_layers(mut self, num_layers: i64) -> Self {
        self.num_layers = num_layers;
        self
    }

    pub fn with_dropout(mut self, dropout: f64) -> Self {
        self.dropout = dropout;
        self
    }
}

/// Configuration for the REINFORCE trainer
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct TrainConfig {
    // Training
    /// Total episodes to train
    pub total_episodes: u64,
    /// Episodes collected per optimizer update
    pub episodes_per_batch: usize,
    /// Hard cap on episode length
    pub max_episode_len: usize,

    // Policy-gradient hyperparameters
    /// Learning rate
    pub learning_rate: f64,
    /// Discount factor
    pub gamma: f64,
    /// Element-wise gradient clamp magnitude
    pub grad_clip: f64,

    // Checkpointing
    /// Checkpoint interval (updates)
    pub checkpoint_interval: u64,
    /// Data directory for checkpoints
    pub data_dir: String,

    // Device
    /// Device both networks and the optimizer step run on.
    /// One explicit device for everything; no per-component defaults.
    #[serde(skip, default = "default_device")]
    pub device: Device,

    // Random seed
    pub seed: u64,
}

fn default_device() -> Device {
    Device::Cpu
}

impl Default for TrainConfig {
    fn default() -> Self {
        Self {
            total_episodes: 10_000,
            episodes_per_batch: 8,
            max_episode_len: 64,

            learning_rate: 0.0003,
            gamma: 0.999,
            grad_clip: 1.0,

            checkpoint_interval: 100,
            data_dir: "checkpoints".to_string(),

            device: Device::Cpu,
            seed: 42,
        }
    }
}

impl TrainConfig {
    /// Create config for CUDA device
    pub fn cuda(mut self) -> Self {
        self.device = Device::Cuda(0);
        self
    }

    /// Set total episodes
    pub fn with_episodes(mut self, episodes: u64) -> Self {
        self.total_episodes = episodes;
        self
    }

    /// Set learning rate
    pub fn with_lr(mut self, lr: f64) -> Self {
        self.learning_rate = lr;
        self
    }

    /// Set discount factor
    pub fn with_gamma(mut self, gamma: f64) -> Self {
        self.gamma = gamma;
        self
    }

    /// Number of optimizer updates implied by the episode budget.
    pub fn num_updates(&self) -> u64 {
        self.total_episodes / self.episodes_per_batch.max(1) as u64
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builders() {
        let config = TrainConfig::default()
            .with_episodes(100)
            .with_lr(0.01)
            .with_gamma(0.5);
        assert_eq!(config.total_episodes, 100);
        assert_eq!(config.learning_rate, 0.01);
        assert_eq!(config.gamma, 0.5);
    }

    #[test]
    fn test_num_updates_follows_episode_budget() {
        let config = TrainConfig {
            total_episodes: 20,
            episodes_per_batch: 2,
            ..TrainConfig::default()
        };
        assert_eq!(config.num_updates(), 10);

        // A zero batch size must not divide by zero.
        let degenerate = TrainConfig {
            total_episodes: 20,
            episodes_per_batch: 0,
            ..TrainConfig::default()
        };
        assert_eq!(degenerate.num_updates(), 20);
    }

    #[test]
    fn test_config_roundtrips_through_json() {
        let config = TrainConfig::default().with_episodes(7);
        let json = serde_json::to_string(&config).unwrap();
        let restored: TrainConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(restored.total_episodes, 7);
        assert_eq!(restored.gamma, config.gamma);
    }
}
