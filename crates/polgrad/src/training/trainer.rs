//! REINFORCE rollout driver.

use super::config::{ModelConfig, TrainConfig};
use super::reinforce::optimize_model;
use super::trajectory::Trajectory;
use crate::checkpoint::{
    CheckpointConfig, CheckpointManager, CheckpointMetrics, CheckpointState, Checkpointable,
};
use crate::log::{ConsoleLogger, MetricLogger};
use crate::policy::{Encoder, PolicyNet, PolicyStep};
use crate::Result;
use indicatif::{ProgressBar, ProgressStyle};
use std::collections::HashMap;
use std::time::Instant;
use tch::{nn, nn::OptimizerConfig, Tensor};

/// Warm-up observations plus the first per-step state vector for one episode.
pub struct EpisodeStart {
    /// Observation sequence for the encoder, shape (batch, seq_len, input_size)
    pub observations: Tensor,
    /// Initial state vector for the policy, shape (batch, state_size)
    pub state: Tensor,
}

/// Result of applying one action in the environment.
pub struct Transition {
    /// Next state vector, shape (batch, state_size)
    pub state: Tensor,
    /// Scalar reward for the step
    pub reward: f32,
    /// Whether the episode reached a terminal transition
    pub done: bool,
}

/// Environment boundary for episode rollout.
///
/// The trainer honors the rollout contract: `reset` is called exactly once
/// per episode before any policy step, and `step` is never called after a
/// terminal transition without an intervening reset.
pub trait Environment {
    /// Start a new episode.
    fn reset(&mut self, seed: Option<u64>) -> EpisodeStart;

    /// Apply the sampled action and advance one step.
    fn step(&mut self, action: &PolicyStep) -> Transition;
}

/// Monte-Carlo policy-gradient trainer.
///
/// Collects a batch of episodes from the environment, then applies one
/// reward-to-go REINFORCE update to the policy's parameters. The encoder
/// participates in the forward graph but only the policy is optimized.
pub struct ReinforceTrainer<E: Environment> {
    /// Configuration
    config: TrainConfig,
    /// Environment
    env: E,
    /// Context encoder
    encoder: Encoder,
    /// Policy network
    policy: PolicyNet,
    /// Optimizer over the policy's parameters
    optimizer: nn::Optimizer,
    /// Episodes collected so far
    episodes: u64,
    /// Optimizer updates applied so far
    updates: u64,
    /// Start time
    start_time: Instant,
    /// Metric logger
    logger: Box<dyn MetricLogger>,
    /// Progress bar
    progress: Option<ProgressBar>,
    /// Checkpoint manager
    checkpoints: Option<CheckpointManager>,
    /// Latest mean episode return
    pub mean_return: f64,
    /// Latest loss value
    pub last_loss: f64,
}

impl<E: Environment> ReinforceTrainer<E> {
    /// Create a new trainer.
    pub fn new(env: E, model: &ModelConfig, config: TrainConfig) -> Result<Self> {
        tch::manual_seed(config.seed as i64);

        let encoder = Encoder::new(model, config.device);
        let policy = PolicyNet::new(model, config.device);
        let optimizer = nn::Adam::default().build(policy.var_store(), config.learning_rate)?;

        tracing::info!(
            parameters = policy.num_parameters(),
            planned_updates = config.num_updates(),
            "Initialized REINFORCE trainer"
        );

        let progress = if config.total_episodes > 0 {
            let pb = ProgressBar::new(config.total_episodes);
            pb.set_style(
                ProgressStyle::default_bar()
                    .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({eta}) {msg}")
                    .unwrap()
                    .progress_chars("#>-"),
            );
            Some(pb)
        } else {
            None
        };

        Ok(Self {
            config,
            env,
            encoder,
            policy,
            optimizer,
            episodes: 0,
            updates: 0,
            start_time: Instant::now(),
            logger: Box::new(ConsoleLogger::new()),
            progress,
            checkpoints: None,
            mean_return: 0.0,
            last_loss: 0.0,
        })
    }

    /// Replace the default console logger.
    pub fn with_logger(mut self, logger: Box<dyn MetricLogger>) -> Self {
        self.logger = logger;
        self
    }

    /// Enable checkpointing.
    pub fn with_checkpoints(mut self, config: CheckpointConfig) -> Self {
        self.checkpoints = Some(CheckpointManager::new(config));
        self
    }

    /// Disable the progress bar (useful under test harnesses).
    pub fn without_progress(mut self) -> Self {
        self.progress = None;
        self
    }

    /// Roll out one full episode and collect its trajectory.
    ///
    /// Resets the environment, encodes the warm-up observations into a
    /// context vector, seeds the policy's recurrent state once, then steps
    /// until the episode terminates or hits the length cap.
    pub fn collect_episode(&mut self) -> Result<Trajectory> {
        let seed = self.config.seed.wrapping_add(self.episodes);
        let start = self.env.reset(Some(seed));

        let context = self.encoder.forward(&start.observations, None)?;
        let mut rec = self.policy.reset_state(&context)?;
        let mut state = start.state;
        let mut trajectory = Trajectory::new();

        for _ in 0..self.config.max_episode_len {
            let (step, next_rec) = self.policy.step(&state, &rec)?;
            let transition = self.env.step(&step);
            trajectory.push(step.log_prob.squeeze(), transition.reward);
            rec = next_rec;
            state = transition.state;
            if transition.done {
                break;
            }
        }

        self.episodes += 1;
        Ok(trajectory)
    }

    /// Run the training loop until the episode budget is exhausted.
    pub fn train(&mut self) -> Result<()> {
        while self.episodes < self.config.total_episodes {
            let mut batch = Vec::with_capacity(self.config.episodes_per_batch);
            for _ in 0..self.config.episodes_per_batch {
                batch.push(self.collect_episode()?);
            }

            let variables = self.policy.var_store().trainable_variables();
            let loss = optimize_model(
                &mut self.optimizer,
                &variables,
                &batch,
                self.config.gamma,
                self.config.grad_clip,
            )?;
            self.updates += 1;
            self.last_loss = loss;
            self.mean_return = batch.iter().map(|t| t.total_reward() as f64).sum::<f64>()
                / batch.len() as f64;

            let mut metrics = HashMap::new();
            metrics.insert("loss".to_string(), loss);
            metrics.insert("mean_return".to_string(), self.mean_return);
            metrics.insert("episodes".to_string(), self.episodes as f64);
            self.logger.log_metrics(&metrics, self.updates);

            if let Some(ref pb) = self.progress {
                pb.set_position(self.episodes.min(self.config.total_episodes));
                let eps = self.episodes as f64 / self.start_time.elapsed().as_secs_f64();
                pb.set_message(format!(
                    "Loss: {:.4} Return: {:.2} EPS: {:.2}",
                    loss, self.mean_return, eps
                ));
            } else if self.updates % 10 == 0 {
                tracing::info!(
                    episodes = self.episodes,
                    updates = self.updates,
                    loss,
                    mean_return = self.mean_return,
                    "Training progress"
                );
            }

            if self.config.checkpoint_interval > 0
                && self.updates % self.config.checkpoint_interval == 0
            {
                if let Some(mut manager) = self.checkpoints.take() {
                    manager.save(self, self.updates, self.mean_return)?;
                    self.checkpoints = Some(manager);
                }
            }
        }

        if let Some(ref pb) = self.progress {
            pb.finish_with_message("training complete");
        }
        self.logger
            .log_scalar("final_mean_return", self.mean_return, self.updates);
        self.logger.close();
        Ok(())
    }

    /// Episodes collected so far.
    pub fn episodes(&self) -> u64 {
        self.episodes
    }

    /// Optimizer updates applied so far.
    pub fn updates(&self) -> u64 {
        self.updates
    }

    /// The trained policy.
    pub fn policy(&self) -> &PolicyNet {
        &self.policy
    }

    /// The context encoder.
    pub fn encoder(&self) -> &Encoder {
        &self.encoder
    }
}

impl<E: Environment> Checkpointable for ReinforceTrainer<E> {
    fn save_state(&self) -> Result<Vec<u8>> {
        let mut weights = Vec::new();
        self.policy.var_store().save_to_stream(&mut weights)?;

        let metrics = CheckpointMetrics {
            mean_return: self.mean_return,
            last_loss: self.last_loss,
        };
        let state = CheckpointState::new(self.updates, self.episodes, weights, metrics);
        Ok(serde_json::to_vec(&state)?)
    }

    fn load_state(&mut self, data: &[u8]) -> Result<()> {
        let state: CheckpointState = serde_json::from_slice(data)?;

        self.policy
            .var_store_mut()
            .load_from_stream(std::io::Cursor::new(&state.policy_weights))?;
        self.updates = state.updates;
        self.episodes = state.episodes;
        self.mean_return = state.metrics.mean_return;
        self.last_loss = state.metrics.last_loss;
        Ok(())
    }
}
