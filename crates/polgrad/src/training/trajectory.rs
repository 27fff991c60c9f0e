//! Per-episode trajectory storage.

use tch::Tensor;

/// Discounted sum of future rewards from each timestep onward.
///
/// `rtg[t] = reward[t] + gamma * rtg[t + 1]`, with `rtg[len] = 0`.
pub fn reward_to_go(rewards: &[f32], gamma: f64) -> Vec<f32> {
    let mut rtg = vec![0.0f32; rewards.len()];
    let mut running = 0.0f64;
    for (i, &reward) in rewards.iter().enumerate().rev() {
        running = reward as f64 + gamma * running;
        rtg[i] = running as f32;
    }
    rtg
}

/// Ordered (log-probability, reward) pairs for one episode.
///
/// Log-probabilities are kept as scalar tensors so the computation graph
/// stays attached until the optimizer step consumes them. Episode lengths may
/// vary across a batch.
#[derive(Default)]
pub struct Trajectory {
    log_probs: Vec<Tensor>,
    rewards: Vec<f32>,
}

impl Trajectory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one step. `log_prob` must be a scalar (0-dim) tensor.
    pub fn push(&mut self, log_prob: Tensor, reward: f32) {
        self.log_probs.push(log_prob);
        self.rewards.push(reward);
    }

    pub fn len(&self) -> usize {
        self.rewards.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rewards.is_empty()
    }

    pub fn rewards(&self) -> &[f32] {
        &self.rewards
    }

    /// Undiscounted episode return.
    pub fn total_reward(&self) -> f32 {
        self.rewards.iter().sum()
    }

    /// Stack the per-step log-probabilities into one (len,) tensor.
    pub fn stacked_log_probs(&self) -> Tensor {
        Tensor::stack(&self.log_probs, 0)
    }

    /// Reward-to-go sequence for this episode.
    pub fn reward_to_go(&self, gamma: f64) -> Vec<f32> {
        reward_to_go(&self.rewards, gamma)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reward_to_go_exact() {
        // rtg[2] = 1, rtg[1] = 1 + 0.5 * 1 = 1.5, rtg[0] = 1 + 0.5 * 1.5 = 1.75
        let rtg = reward_to_go(&[1.0, 1.0, 1.0], 0.5);
        assert_eq!(rtg, vec![1.75, 1.5, 1.0]);
    }

    #[test]
    fn test_reward_to_go_empty() {
        assert!(reward_to_go(&[], 0.9).is_empty());
    }

    #[test]
    fn test_reward_to_go_single_step() {
        assert_eq!(reward_to_go(&[3.0], 0.9), vec![3.0]);
    }

    #[test]
    fn test_trajectory_accumulates() {
        let mut traj = Trajectory::new();
        assert!(traj.is_empty());
        traj.push(Tensor::from(-0.5f64), 1.0);
        traj.push(Tensor::from(-1.0f64), 2.0);
        assert_eq!(traj.len(), 2);
        assert_eq!(traj.total_reward(), 3.0);
        assert_eq!(traj.stacked_log_probs().size(), [2]);
        assert_eq!(traj.reward_to_go(1.0), vec![3.0, 2.0]);
    }
}
