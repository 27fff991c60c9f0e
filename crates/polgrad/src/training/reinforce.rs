//! Reward-to-go REINFORCE update.

use super::trajectory::Trajectory;
use crate::{PolicyError, Result};
use tch::{nn, Kind, Tensor};

/// Policy-gradient loss over a batch of episodes.
///
/// Each episode contributes `-sum_t log_prob[t] * rtg[t]`; the loss is the
/// mean contribution. Negated because training performs gradient descent
/// toward a policy-gradient ascent direction.
///
/// Every episode's log-probabilities must still be attached to the graph;
/// a detached tensor would make the update a silent no-op, so it is rejected
/// here with [`PolicyError::MissingGradient`].
pub fn policy_gradient_loss(batch: &[Trajectory], gamma: f64) -> Result<Tensor> {
    let mut loss: Option<Tensor> = None;

    for trajectory in batch {
        if trajectory.is_empty() {
            return Err(PolicyError::Training("empty trajectory in batch".into()));
        }

        let log_probs = trajectory.stacked_log_probs();
        if !log_probs.requires_grad() {
            return Err(PolicyError::MissingGradient);
        }

        let rtg = Tensor::from_slice(&trajectory.reward_to_go(gamma)).to_device(log_probs.device());
        let contribution = -(log_probs * rtg).sum(Kind::Float);
        loss = Some(match loss {
            Some(total) => total + contribution,
            None => contribution,
        });
    }

    let loss = loss.ok_or_else(|| PolicyError::Training("empty batch".into()))?;
    Ok(loss / batch.len() as f64)
}

/// Clamp every defined gradient element to `[-limit, limit]`.
pub fn clip_gradients(variables: &[Tensor], limit: f64) {
    for var in variables {
        let mut grad = var.grad();
        if grad.defined() {
            let _ = grad.clamp_(-limit, limit);
        }
    }
}

/// Apply one reward-to-go policy-gradient update.
///
/// Clears previous gradients, backpropagates the batch loss, clamps each
/// gradient element to `[-grad_clip, grad_clip]`, then steps the optimizer.
/// `variables` are the trainable parameters the optimizer manages. Returns
/// the scalar loss value for metric logging.
pub fn optimize_model(
    optimizer: &mut nn::Optimizer,
    variables: &[Tensor],
    batch: &[Trajectory],
    gamma: f64,
    grad_clip: f64,
) -> Result<f64> {
    let loss = policy_gradient_loss(batch, gamma)?;

    optimizer.zero_grad();
    loss.backward();
    clip_gradients(variables, grad_clip);
    optimizer.step();

    Ok(loss.double_value(&[]))
}
