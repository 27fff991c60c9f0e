//! Probability distributions for hybrid action sampling.

use tch::{Kind, Tensor};

/// Categorical distribution over mutually exclusive options, sampled as a
/// one-hot indicator vector.
pub struct OneHotCategorical {
    logits: Tensor,
}

impl OneHotCategorical {
    pub fn new(logits: Tensor) -> Self {
        Self { logits }
    }

    /// Sample a one-hot decision vector, shape (batch, num_options).
    pub fn sample(&self) -> Tensor {
        let num_options = *self.logits.size().last().unwrap_or(&1);
        self.logits
            .softmax(-1, Kind::Float)
            .multinomial(1, true)
            .squeeze_dim(-1)
            .one_hot(num_options)
            .to_kind(Kind::Float)
    }

    /// Log-probability of a one-hot sample, shape (batch,).
    pub fn log_prob(&self, one_hot: &Tensor) -> Tensor {
        let log_probs = self.logits.log_softmax(-1, Kind::Float);
        (log_probs * one_hot).sum_dim_intlist([-1i64].as_slice(), false, Kind::Float)
    }
}

/// Independent Normal distributions, one per action dimension.
///
/// `log_prob` is elementwise (no reduction) so the caller can mask out the
/// single active dimension before reducing.
pub struct DiagNormal {
    mean: Tensor,
    std: Tensor,
}

impl DiagNormal {
    pub fn new(mean: Tensor, std: Tensor) -> Self {
        Self { mean, std }
    }

    /// Sample values, shape matches `mean`. The sample is detached; gradients
    /// reach the parameters only through `log_prob`.
    pub fn sample(&self) -> Tensor {
        let noise = Tensor::randn_like(&self.mean);
        (&self.mean + noise * &self.std).detach()
    }

    /// Elementwise log-probability of `values`, shape matches `mean`.
    pub fn log_prob(&self, values: &Tensor) -> Tensor {
        let var = self.std.pow_tensor_scalar(2.0);
        let log_std = self.std.log();

        let log_2pi = (2.0 * std::f64::consts::PI).ln();
        let log_2pi_tensor = Tensor::from(log_2pi).to_device(self.mean.device());
        let sq_diff = (values - &self.mean).pow_tensor_scalar(2.0);
        (sq_diff / (var + 1e-8) + log_std * 2.0 + log_2pi_tensor) * -0.5
    }
}
