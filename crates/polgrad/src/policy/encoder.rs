//! Context encoder over observation sequences.

use crate::training::ModelConfig;
use crate::{PolicyError, Result};
use tch::{nn, nn::RNN, Device, Tensor};

/// Multi-layer LSTM that compresses a batch of observation sequences into one
/// context vector per batch element.
///
/// Stateless across calls: each forward runs the whole sequence and returns
/// only the final layer's final-timestep hidden output.
pub struct Encoder {
    /// LSTM over the observation sequence
    lstm: nn::LSTM,
    /// Variable store
    vs: nn::VarStore,
    /// Expected trailing input dimension
    input_size: i64,
    /// Context vector width (matches PolicyNet's hidden size)
    hidden_size: i64,
    /// Number of stacked layers
    num_layers: i64,
    /// Device
    device: Device,
}

impl Encoder {
    /// Create a new encoder on the given device.
    pub fn new(config: &ModelConfig, device: Device) -> Self {
        assert!(config.num_layers >= 1, "encoder needs at least one layer");
        assert!(
            (0.0..1.0).contains(&config.dropout),
            "dropout must be in [0, 1)"
        );

        let vs = nn::VarStore::new(device);
        let root = vs.root();

        let rnn_config = nn::RNNConfig {
            num_layers: config.num_layers,
            dropout: config.dropout,
            ..Default::default()
        };
        let lstm = nn::lstm(
            &root / "encoder",
            config.input_size,
            config.hidden_size,
            rnn_config,
        );

        Self {
            lstm,
            vs,
            input_size: config.input_size,
            hidden_size: config.hidden_size,
            num_layers: config.num_layers,
            device,
        }
    }

    /// Run the sequence and return the context vector, shape (batch, hidden_size).
    ///
    /// `input` must have shape (batch, seq_len, input_size). An optional
    /// initial recurrent state can be supplied; by default the LSTM starts
    /// from zeros.
    pub fn forward(&self, input: &Tensor, state: Option<&nn::LSTMState>) -> Result<Tensor> {
        let size = input.size();
        if size.len() != 3 || size[2] != self.input_size {
            return Err(PolicyError::ShapeMismatch {
                expected: vec![-1, -1, self.input_size],
                actual: size,
            });
        }

        let input = input.to_device(self.device);
        let (_, final_state) = match state {
            Some(s) => self.lstm.seq_init(&input, s),
            None => self.lstm.seq(&input),
        };

        // h has shape (num_layers, batch, hidden); keep the last layer only.
        Ok(final_state.h().select(0, self.num_layers - 1))
    }

    /// Context vector width.
    pub fn hidden_size(&self) -> i64 {
        self.hidden_size
    }

    /// Get variable store
    pub fn var_store(&self) -> &nn::VarStore {
        &self.vs
    }

    /// Get mutable variable store
    pub fn var_store_mut(&mut self) -> &mut nn::VarStore {
        &mut self.vs
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tch::Kind;

    fn config() -> ModelConfig {
        ModelConfig::default()
            .with_input_size(6)
            .with_hidden_size(32)
            .with_dropout(0.0)
    }

    #[test]
    fn test_output_shape_ignores_seq_len() {
        let encoder = Encoder::new(&config(), Device::Cpu);
        for seq_len in [1, 4, 17] {
            let obs = Tensor::randn([3, seq_len, 6], (Kind::Float, Device::Cpu));
            let context = encoder.forward(&obs, None).unwrap();
            assert_eq!(context.size(), [3, 32]);
        }
    }

    #[test]
    fn test_rejects_wrong_trailing_dim() {
        let encoder = Encoder::new(&config(), Device::Cpu);
        let obs = Tensor::randn([3, 4, 7], (Kind::Float, Device::Cpu));
        let err = encoder.forward(&obs, None).unwrap_err();
        assert!(matches!(err, PolicyError::ShapeMismatch { .. }));
    }

    #[test]
    fn test_rejects_wrong_rank() {
        let encoder = Encoder::new(&config(), Device::Cpu);
        let obs = Tensor::randn([3, 6], (Kind::Float, Device::Cpu));
        let err = encoder.forward(&obs, None).unwrap_err();
        assert!(matches!(err, PolicyError::ShapeMismatch { .. }));
    }

    #[test]
    fn test_stateless_across_calls() {
        let encoder = Encoder::new(&config(), Device::Cpu);
        tch::manual_seed(7);
        let obs = Tensor::randn([2, 5, 6], (Kind::Float, Device::Cpu));
        let a = encoder.forward(&obs, None).unwrap();
        let b = encoder.forward(&obs, None).unwrap();
        assert!(a.allclose(&b, 1e-6, 1e-6, false));
    }
}
