//! Training system for reward-to-go REINFORCE.
//!
//! Provides:
//! - `Trajectory` - per-episode (log-prob, reward) storage
//! - `optimize_model` - one policy-gradient update
//! - `ReinforceTrainer` - rollout loop against an `Environment`

mod config;
mod reinforce;
mod trainer;
mod trajectory;

pub use config::{ModelConfig, TrainConfig};
pub use reinforce::{clip_gradients, optimize_model, policy_gradient_loss};
pub use trainer::{Environment, EpisodeStart, ReinforceTrainer, Transition};
pub use trajectory::{reward_to_go, Trajectory};
