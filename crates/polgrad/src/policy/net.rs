//! Recurrent policy network with hybrid discrete/continuous actions.

use super::distribution::{DiagNormal, OneHotCategorical};
use crate::training::ModelConfig;
use crate::{PolicyError, Result};
use tch::{nn, nn::Module, Device, Kind, Tensor};

/// One stacked LSTM cell. Gates are computed from two linear projections so
/// a single step can run without materializing a sequence.
struct LstmCell {
    ih: nn::Linear,
    hh: nn::Linear,
}

impl LstmCell {
    fn new(path: nn::Path, input_size: i64, hidden_size: i64) -> Self {
        Self {
            ih: nn::linear(&path / "ih", input_size, 4 * hidden_size, Default::default()),
            hh: nn::linear(&path / "hh", hidden_size, 4 * hidden_size, Default::default()),
        }
    }

    /// One step: (input, (h, c)) -> (h', c'). Gate order matches torch: i, f, g, o.
    fn step(&self, input: &Tensor, h: &Tensor, c: &Tensor) -> (Tensor, Tensor) {
        let gates = self.ih.forward(input) + self.hh.forward(h);
        let chunks = gates.chunk(4, 1);
        let input_gate = chunks[0].sigmoid();
        let forget_gate = chunks[1].sigmoid();
        let cell_gate = chunks[2].tanh();
        let output_gate = chunks[3].sigmoid();
        let new_c = forget_gate * c + input_gate * cell_gate;
        let new_h = output_gate * new_c.tanh();
        (new_h, new_c)
    }
}

/// Per-layer recurrent memory for one episode.
///
/// Created by [`PolicyNet::reset_state`] once per episode and threaded
/// through every [`PolicyNet::step`] call by the rollout driver. Holding the
/// state outside the network removes hidden-state aliasing between episodes.
#[derive(Debug)]
pub struct RecurrentState {
    h: Vec<Tensor>,
    c: Vec<Tensor>,
}

impl RecurrentState {
    /// Hidden state of the given layer, shape (batch, hidden_size).
    pub fn hidden(&self, layer: usize) -> &Tensor {
        &self.h[layer]
    }

    /// Cell state of the given layer, shape (batch, hidden_size).
    pub fn cell(&self, layer: usize) -> &Tensor {
        &self.c[layer]
    }

    pub fn num_layers(&self) -> usize {
        self.h.len()
    }

    fn batch_size(&self) -> i64 {
        self.h[0].size()[0]
    }
}

/// Output of one policy step, each tensor per batch element.
#[derive(Debug)]
pub struct PolicyStep {
    /// One-hot decision over the action dimensions, shape (batch, num_actions)
    pub decision: Tensor,
    /// Selected action value scaled by the action limit, shape (batch,)
    pub action: Tensor,
    /// Total log-probability of the step (decision + value), shape (batch,)
    pub log_prob: Tensor,
}

/// Recurrent policy over an orthogonal action space.
///
/// The agent first decides which dimension to act on (one-hot categorical
/// over `num_actions`, last dimension reserved as an explicit no-op) and then
/// samples a numeric magnitude for that dimension from a Normal distribution.
/// The last dimension carries a fixed value 0.0 with log-probability 0.0.
pub struct PolicyNet {
    /// Variable store
    vs: nn::VarStore,
    /// Stacked LSTM cells
    cells: Vec<LstmCell>,
    /// Head producing decision logits
    fc_decision: nn::Linear,
    /// Head producing per-dimension value means
    fc_values_mean: nn::Linear,
    /// Head producing per-dimension value log standard deviations
    fc_values_logstd: nn::Linear,
    /// Expected per-step state vector width
    state_size: i64,
    /// Number of action dimensions (including the no-op)
    num_actions: i64,
    /// Numeric bound applied to sampled action values
    act_lim: f64,
    /// Hidden size (must match the encoder's context width)
    hidden_size: i64,
    /// Device
    device: Device,
}

impl PolicyNet {
    /// Create a new policy network on the given device.
    pub fn new(config: &ModelConfig, device: Device) -> Self {
        assert!(config.num_layers >= 1, "policy needs at least one layer");
        assert!(config.num_actions >= 1, "need at least the no-op dimension");

        let vs = nn::VarStore::new(device);
        let root = vs.root();

        let mut cells = Vec::with_capacity(config.num_layers as usize);
        cells.push(LstmCell::new(
            &root / "cell_0",
            config.state_size,
            config.hidden_size,
        ));
        for i in 1..config.num_layers {
            cells.push(LstmCell::new(
                &root / format!("cell_{}", i),
                config.hidden_size,
                config.hidden_size,
            ));
        }

        let fc_decision = nn::linear(
            &root / "decision",
            config.hidden_size,
            config.num_actions,
            Default::default(),
        );
        let fc_values_mean = nn::linear(
            &root / "values_mean",
            config.hidden_size,
            config.num_actions,
            Default::default(),
        );
        let fc_values_logstd = nn::linear(
            &root / "values_logstd",
            config.hidden_size,
            config.num_actions,
            Default::default(),
        );

        Self {
            vs,
            cells,
            fc_decision,
            fc_values_mean,
            fc_values_logstd,
            state_size: config.state_size,
            num_actions: config.num_actions,
            act_lim: config.act_lim,
            hidden_size: config.hidden_size,
            device,
        }
    }

    /// Initialize recurrent memory from a context vector, shape (batch, hidden_size).
    ///
    /// Layer 0's hidden state is seeded with the context; every other hidden
    /// entry and all cell entries start at zero. Call exactly once per
    /// episode, before any step.
    pub fn reset_state(&self, context: &Tensor) -> Result<RecurrentState> {
        let size = context.size();
        if size.len() != 2 || size[1] != self.hidden_size {
            return Err(PolicyError::ShapeMismatch {
                expected: vec![-1, self.hidden_size],
                actual: size,
            });
        }

        let batch = size[0];
        let num_layers = self.cells.len();
        let mut h = Vec::with_capacity(num_layers);
        let mut c = Vec::with_capacity(num_layers);

        h.push(context.to_device(self.device));
        for _ in 1..num_layers {
            h.push(Tensor::zeros(
                [batch, self.hidden_size],
                (Kind::Float, self.device),
            ));
        }
        for _ in 0..num_layers {
            c.push(Tensor::zeros(
                [batch, self.hidden_size],
                (Kind::Float, self.device),
            ));
        }

        Ok(RecurrentState { h, c })
    }

    /// Run one policy step on the current state vector, shape (batch, state_size).
    ///
    /// Returns the sampled step output and the successor recurrent state.
    /// Every layer's recurrent carry is layer 0's previous (h, c) pair: the
    /// stack shares one memory slot rather than each layer tracking its own,
    /// so deeper layers are driven entirely by layer 0's history. Layer
    /// i >= 1 consumes layer i-1's fresh hidden output as its input.
    pub fn step(&self, state: &Tensor, rec: &RecurrentState) -> Result<(PolicyStep, RecurrentState)> {
        let size = state.size();
        if size.len() != 2 || size[1] != self.state_size {
            return Err(PolicyError::ShapeMismatch {
                expected: vec![-1, self.state_size],
                actual: size,
            });
        }
        if rec.num_layers() != self.cells.len() {
            return Err(PolicyError::StateLifecycle(format!(
                "recurrent state has {} layers, policy has {}",
                rec.num_layers(),
                self.cells.len()
            )));
        }
        if rec.batch_size() != size[0] {
            return Err(PolicyError::StateLifecycle(format!(
                "recurrent state batch {} does not match input batch {}",
                rec.batch_size(),
                size[0]
            )));
        }

        let state = state.to_device(self.device);
        let batch = size[0];

        // Shared carry: layer 0's previous hidden/cell pair.
        let (h0, c0) = (&rec.h[0], &rec.c[0]);

        let mut new_h = Vec::with_capacity(self.cells.len());
        let mut new_c = Vec::with_capacity(self.cells.len());

        let (mut layer_out, cell_out) = self.cells[0].step(&state, h0, c0);
        new_h.push(layer_out.shallow_clone());
        new_c.push(cell_out);
        for cell in &self.cells[1..] {
            let (h_i, c_i) = cell.step(&layer_out, h0, c0);
            layer_out = h_i.shallow_clone();
            new_h.push(h_i);
            new_c.push(c_i);
        }

        let decision_logits = self.fc_decision.forward(&layer_out);
        let values_mean = self.fc_values_mean.forward(&layer_out);
        let values_std = self.fc_values_logstd.forward(&layer_out).exp();

        // Which dimension to act on.
        let decision_dist = OneHotCategorical::new(decision_logits);
        let decision = decision_dist.sample();
        let decision_log_prob = decision_dist.log_prob(&decision);

        // Value magnitudes for the continuous dimensions, batched over all of
        // them at once; the active one is selected by the one-hot mask below.
        let k = self.num_actions;
        let value_dist = DiagNormal::new(
            values_mean.narrow(1, 0, k - 1),
            values_std.narrow(1, 0, k - 1),
        );
        let sampled_values = value_dist.sample();
        let sampled_log_probs = value_dist.log_prob(&sampled_values);

        // The last dimension is the explicit no-op: value 0.0, log-prob 0.0.
        let noop = Tensor::zeros([batch, 1], (Kind::Float, self.device));
        let action_values = Tensor::cat(&[sampled_values, noop.shallow_clone()], 1);
        let action_log_probs = Tensor::cat(&[sampled_log_probs, noop], 1);

        let action = (&action_values * &decision).sum_dim_intlist(
            [-1i64].as_slice(),
            false,
            Kind::Float,
        ) * self.act_lim;
        let value_log_prob = (&action_log_probs * &decision).sum_dim_intlist(
            [-1i64].as_slice(),
            false,
            Kind::Float,
        );

        // Chain rule: P(dimension) * P(value | dimension).
        let log_prob = decision_log_prob + value_log_prob;

        let step = PolicyStep {
            decision,
            action,
            log_prob,
        };
        Ok((step, RecurrentState { h: new_h, c: new_c }))
    }

    /// Number of action dimensions (including the no-op).
    pub fn num_actions(&self) -> i64 {
        self.num_actions
    }

    /// Get variable store
    pub fn var_store(&self) -> &nn::VarStore {
        &self.vs
    }

    /// Get mutable variable store
    pub fn var_store_mut(&mut self) -> &mut nn::VarStore {
        &mut self.vs
    }

    /// Get number of parameters
    pub fn num_parameters(&self) -> usize {
        self.vs
            .trainable_variables()
            .iter()
            .map(|t| t.numel())
            .sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> ModelConfig {
        ModelConfig::default()
            .with_state_size(5)
            .with_num_actions(3)
            .with_hidden_size(16)
    }

    fn context(policy: &PolicyNet, batch: i64) -> Tensor {
        Tensor::randn([batch, policy.hidden_size], (Kind::Float, Device::Cpu))
    }

    #[test]
    fn test_decision_is_one_hot() {
        let policy = PolicyNet::new(&config(), Device::Cpu);
        let ctx = context(&policy, 4);
        let rec = policy.reset_state(&ctx).unwrap();
        let state = Tensor::randn([4, 5], (Kind::Float, Device::Cpu));

        let (step, _) = policy.step(&state, &rec).unwrap();
        assert_eq!(step.decision.size(), [4, 3]);
        assert_eq!(step.action.size(), [4]);
        assert_eq!(step.log_prob.size(), [4]);

        let row_sums = step
            .decision
            .sum_dim_intlist([-1i64].as_slice(), false, Kind::Float);
        assert!(row_sums.allclose(&Tensor::ones([4], (Kind::Float, Device::Cpu)), 1e-6, 1e-6, false));
    }

    #[test]
    fn test_noop_dimension_has_zero_value_and_log_prob() {
        tch::manual_seed(3);
        let policy = PolicyNet::new(&config(), Device::Cpu);
        let ctx = context(&policy, 1);
        let mut rec = policy.reset_state(&ctx).unwrap();
        let state = Tensor::randn([1, 5], (Kind::Float, Device::Cpu));

        let mut saw_noop = false;
        for _ in 0..64 {
            let (step, next) = policy.step(&state, &rec).unwrap();
            rec = next;
            let picked_noop = step.decision.double_value(&[0, 2]) > 0.5;
            if picked_noop {
                saw_noop = true;
                assert_eq!(step.action.double_value(&[0]), 0.0);
                // Value contribution is 0, so the total collapses to the
                // decision log-prob, which is never positive.
                assert!(step.log_prob.double_value(&[0]) <= 0.0);
            }
        }
        assert!(saw_noop, "no-op dimension never sampled in 64 steps");
    }

    #[test]
    fn test_single_action_policy_is_pure_noop() {
        let cfg = config().with_num_actions(1);
        let policy = PolicyNet::new(&cfg, Device::Cpu);
        let ctx = context(&policy, 2);
        let rec = policy.reset_state(&ctx).unwrap();
        let state = Tensor::randn([2, 5], (Kind::Float, Device::Cpu));

        let (step, _) = policy.step(&state, &rec).unwrap();
        // Only the no-op exists: its probability is 1, so both the action
        // value and the total log-prob are exactly zero.
        assert!(step.action.abs().max().double_value(&[]) < 1e-6);
        assert!(step.log_prob.abs().max().double_value(&[]) < 1e-6);
    }

    #[test]
    fn test_num_parameters_counts_cells_and_heads() {
        let policy = PolicyNet::new(&config(), Device::Cpu);
        // Two cells (ih: 5*64+64 and 16*64+64, hh: 16*64+64 each) plus three
        // 16 -> 3 heads at 51 parameters apiece.
        assert_eq!(policy.num_parameters(), 384 + 1088 + 1088 + 1088 + 153);
    }

    #[test]
    fn test_reset_is_idempotent() {
        let policy = PolicyNet::new(&config(), Device::Cpu);
        let ctx = context(&policy, 2);

        let a = policy.reset_state(&ctx).unwrap();
        let b = policy.reset_state(&ctx).unwrap();
        assert_eq!(a.num_layers(), b.num_layers());
        for layer in 0..a.num_layers() {
            assert!(a.hidden(layer).equal(b.hidden(layer)));
            assert!(a.cell(layer).equal(b.cell(layer)));
        }
    }

    #[test]
    fn test_reset_seeds_only_layer_zero() {
        let policy = PolicyNet::new(&config(), Device::Cpu);
        let ctx = context(&policy, 2);
        let rec = policy.reset_state(&ctx).unwrap();

        assert!(rec.hidden(0).equal(&ctx));
        for layer in 1..rec.num_layers() {
            assert_eq!(rec.hidden(layer).abs().sum(Kind::Float).double_value(&[]), 0.0);
        }
        for layer in 0..rec.num_layers() {
            assert_eq!(rec.cell(layer).abs().sum(Kind::Float).double_value(&[]), 0.0);
        }
    }

    #[test]
    fn test_step_log_prob_tracks_gradients() {
        let policy = PolicyNet::new(&config(), Device::Cpu);
        let ctx = context(&policy, 1);
        let rec = policy.reset_state(&ctx).unwrap();
        let state = Tensor::randn([1, 5], (Kind::Float, Device::Cpu));

        let (step, _) = policy.step(&state, &rec).unwrap();
        assert!(step.log_prob.requires_grad());
    }

    #[test]
    fn test_rejects_bad_state_vector() {
        let policy = PolicyNet::new(&config(), Device::Cpu);
        let ctx = context(&policy, 1);
        let rec = policy.reset_state(&ctx).unwrap();
        let state = Tensor::randn([1, 9], (Kind::Float, Device::Cpu));
        let err = policy.step(&state, &rec).unwrap_err();
        assert!(matches!(err, PolicyError::ShapeMismatch { .. }));
    }

    #[test]
    fn test_rejects_mismatched_recurrent_state() {
        let policy = PolicyNet::new(&config(), Device::Cpu);
        let ctx = context(&policy, 2);
        let rec = policy.reset_state(&ctx).unwrap();
        // Batch 3 input against a batch 2 state.
        let state = Tensor::randn([3, 5], (Kind::Float, Device::Cpu));
        let err = policy.step(&state, &rec).unwrap_err();
        assert!(matches!(err, PolicyError::StateLifecycle(_)));
    }

    #[test]
    fn test_rejects_bad_context() {
        let policy = PolicyNet::new(&config(), Device::Cpu);
        let ctx = Tensor::randn([2, 7], (Kind::Float, Device::Cpu));
        let err = policy.reset_state(&ctx).unwrap_err();
        assert!(matches!(err, PolicyError::ShapeMismatch { .. }));
    }
}
