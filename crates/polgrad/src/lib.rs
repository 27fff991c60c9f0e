//! # polgrad
//!
//! Recurrent policy-gradient training in Rust.
//!
//! ## Overview
//!
//! polgrad provides:
//! - An `Encoder` that compresses an observation sequence into a context vector
//! - A `PolicyNet` that, seeded with that context, autoregressively emits a
//!   hybrid discrete/continuous action per step together with its log-probability
//! - A reward-to-go REINFORCE update (`optimize_model`)
//! - A `ReinforceTrainer` that drives rollouts against an `Environment`
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use polgrad::prelude::*;
//! use tch::Device;
//!
//! let model = ModelConfig::default();
//! let encoder = Encoder::new(&model, Device::Cpu);
//! let policy = PolicyNet::new(&model, Device::Cpu);
//!
//! // Encode a warm-up sequence, seed the recurrent state, then step.
//! let context = encoder.forward(&observations, None)?;
//! let mut state = policy.reset_state(&context)?;
//! let (step, next_state) = policy.step(&env_state, &state)?;
//! ```

pub mod checkpoint;
pub mod log;
pub mod policy;
pub mod training;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::policy::{Encoder, PolicyNet, PolicyStep, RecurrentState};
    pub use crate::training::{
        optimize_model, reward_to_go, Environment, EpisodeStart, ModelConfig, ReinforceTrainer,
        TrainConfig, Trajectory, Transition,
    };

    // Checkpoint exports
    pub use crate::checkpoint::{Checkpointable, CheckpointConfig, CheckpointManager};

    // Logging exports
    pub use crate::log::{CompositeLogger, ConsoleLogger, MetricLogger, NoOpLogger};
}

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Error types for the library
#[derive(Debug, thiserror::Error)]
pub enum PolicyError {
    #[error("Shape mismatch: expected {expected:?}, got {actual:?}")]
    ShapeMismatch {
        expected: Vec<i64>,
        actual: Vec<i64>,
    },

    #[error("Missing gradient: log-probabilities are detached from the graph")]
    MissingGradient,

    #[error("State lifecycle error: {0}")]
    StateLifecycle(String),

    #[error("Training error: {0}")]
    Training(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerdeError(#[from] serde_json::Error),

    #[error("Tensor error: {0}")]
    TensorError(#[from] tch::TchError),
}

pub type Result<T> = core::result::Result<T, PolicyError>;
