//! Layer configuration.

use burn::tensor::backend::Backend;
use serde::{Deserialize, Serialize};

use crate::activation::Activation;
use crate::error::{LstmError, LstmResult};
use crate::params::num_params;
use crate::rnn::GravesLstm;

fn default_gate_activation() -> Activation {
    Activation::Sigmoid
}

/// Configuration of a [`GravesLstm`] layer.
///
/// ```rust
/// use burn::backend::NdArray;
/// use graves_lstm::activation::Activation;
/// use graves_lstm::config::LstmConfig;
/// use graves_lstm::rnn::GravesLstm;
///
/// let config = LstmConfig::new(13, 17)
///     .with_gate_activation(Activation::HardSigmoid)
///     .with_tbptt_backward_length(20);
/// let lstm: GravesLstm<NdArray<f32>> = config.init().unwrap();
/// assert_eq!(lstm.hidden_size(), 17);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LstmConfig {
    /// Number of input features.
    pub input_size: usize,
    /// Number of LSTM units.
    pub hidden_size: usize,
    /// Activation of the forget, input and output gates.
    #[serde(default = "default_gate_activation")]
    pub gate_activation: Activation,
    /// Activation of the input modulation block and the cell state.
    #[serde(default)]
    pub activation: Activation,
    /// Number of trailing timesteps the backward pass visits; all of them when `None`.
    #[serde(default)]
    pub tbptt_backward_length: Option<usize>,
}

impl LstmConfig {
    pub fn new(input_size: usize, hidden_size: usize) -> Self {
        Self {
            input_size,
            hidden_size,
            gate_activation: default_gate_activation(),
            activation: Activation::default(),
            tbptt_backward_length: None,
        }
    }

    pub fn with_gate_activation(mut self, gate_activation: Activation) -> Self {
        self.gate_activation = gate_activation;
        self
    }

    pub fn with_activation(mut self, activation: Activation) -> Self {
        self.activation = activation;
        self
    }

    /// Selects the gate activation by registry name, e.g. `"hardsigmoid"`.
    pub fn with_gate_activation_fn(self, name: &str) -> LstmResult<Self> {
        Ok(self.with_gate_activation(name.parse()?))
    }

    /// Selects the cell activation by registry name, e.g. `"tanh"`.
    pub fn with_activation_fn(self, name: &str) -> LstmResult<Self> {
        Ok(self.with_activation(name.parse()?))
    }

    pub fn with_tbptt_backward_length(mut self, length: usize) -> Self {
        self.tbptt_backward_length = Some(length);
        self
    }

    /// Number of learnable scalars of a layer built from this configuration.
    pub fn num_params(&self) -> usize {
        num_params(self.input_size, self.hidden_size)
    }

    pub fn validate(&self) -> LstmResult<()> {
        if self.input_size == 0 || self.hidden_size == 0 {
            return Err(LstmError::InvalidConfig(format!(
                "input_size and hidden_size must be positive, got {} and {}",
                self.input_size, self.hidden_size
            )));
        }
        if self.tbptt_backward_length == Some(0) {
            return Err(LstmError::InvalidConfig(
                "tbptt_backward_length must be positive".to_string(),
            ));
        }
        if !self.gate_activation.is_bounded_gate() {
            log::warn!(
                "gate activation '{}' is not bounded to [0, 1]; gates may amplify instead of gate",
                self.gate_activation
            );
        }
        Ok(())
    }

    pub fn init<B: Backend>(&self) -> LstmResult<GravesLstm<B>> {
        GravesLstm::new(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use burn::backend::NdArray;

    type TestBackend = NdArray<f32>;

    #[test]
    fn test_defaults() {
        let config = LstmConfig::new(13, 17);
        assert_eq!(config.gate_activation, Activation::Sigmoid);
        assert_eq!(config.activation, Activation::Tanh);
        assert_eq!(config.tbptt_backward_length, None);
        assert_eq!(config.num_params(), 13 * 68 + 17 * 71 + 68);
    }

    #[test]
    fn test_activation_by_name() {
        let config = LstmConfig::new(2, 2)
            .with_gate_activation_fn("hardsigmoid")
            .unwrap()
            .with_activation_fn("softsign")
            .unwrap();
        assert_eq!(config.gate_activation, Activation::HardSigmoid);
        assert_eq!(config.activation, Activation::Softsign);

        let err = LstmConfig::new(2, 2).with_gate_activation_fn("cube").unwrap_err();
        assert_eq!(err, LstmError::UnknownActivation("cube".to_string()));
    }

    #[test]
    fn test_validate_rejects_zero_sizes() {
        assert!(LstmConfig::new(0, 4).validate().is_err());
        assert!(LstmConfig::new(4, 0).init::<TestBackend>().is_err());
        assert!(LstmConfig::new(4, 4)
            .with_tbptt_backward_length(0)
            .validate()
            .is_err());
    }

    #[test]
    fn test_serde_round_trip() {
        let config = LstmConfig::new(3, 5)
            .with_gate_activation(Activation::HardSigmoid)
            .with_tbptt_backward_length(10);

        let json = serde_json::to_string(&config).unwrap();
        assert!(json.contains("\"hardsigmoid\""));
        let restored: LstmConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(restored, config);
    }

    #[test]
    fn test_serde_fills_defaults() {
        let restored: LstmConfig =
            serde_json::from_str(r#"{"input_size": 2, "hidden_size": 3}"#).unwrap();
        assert_eq!(restored, LstmConfig::new(2, 3));
    }
}
