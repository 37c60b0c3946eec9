//! Element-wise activation functions used by the LSTM gates and cell.
//!
//! The engine is configured with two independent activations: a bounded *gate*
//! activation (sigmoid family) and a *cell/output* activation (tanh family).
//! Both are resolved once into an [`Activation`] value, so the hot path is a
//! plain `match` per tensor op rather than a name lookup.

use std::fmt;
use std::str::FromStr;

use burn::tensor::activation;
use burn::tensor::backend::Backend;
use burn::tensor::Tensor;
use serde::{Deserialize, Serialize};

use crate::error::LstmError;

const LECUN_SCALE: f32 = 1.7159;
const LECUN_SLOPE: f32 = 0.666;
const HARD_SIGMOID_SLOPE: f32 = 0.2;
const HARD_SIGMOID_LIMIT: f32 = 2.5;

/// Activation function selector.
///
/// Every variant provides a forward map and its derivative, both taking the
/// pre-activation tensor.
///
/// # Example
///
/// ```rust
/// use burn::backend::NdArray;
/// use burn::tensor::Tensor;
/// use graves_lstm::activation::Activation;
///
/// type Backend = NdArray<f32>;
/// let device = Default::default();
///
/// let act: Activation = "hardsigmoid".parse().unwrap();
/// let x = Tensor::<Backend, 1>::from_floats([0.0, 1.0, -1.0], &device);
/// let y = act.forward(x);
/// assert_eq!(y.dims(), [3]);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Activation {
    /// `1 / (1 + exp(-x))`
    Sigmoid,
    /// `clamp(0.2 * x + 0.5, 0, 1)`
    HardSigmoid,
    /// `tanh(x)`
    Tanh,
    /// `x / (1 + |x|)`
    Softsign,
    /// `max(x, 0)`
    Relu,
    /// `x`
    Identity,
    /// LeCun's scaled tanh, `1.7159 * tanh(0.666 * x)`.
    ///
    /// Approximates the identity near the origin with an output range of
    /// roughly `[-1.7159, 1.7159]`.
    LeCunTanh,
}

impl Activation {
    /// All registered activations, in registry order.
    pub const ALL: [Activation; 7] = [
        Activation::Sigmoid,
        Activation::HardSigmoid,
        Activation::Tanh,
        Activation::Softsign,
        Activation::Relu,
        Activation::Identity,
        Activation::LeCunTanh,
    ];

    /// Registry name, as accepted by [`FromStr`].
    pub fn name(&self) -> &'static str {
        match self {
            Activation::Sigmoid => "sigmoid",
            Activation::HardSigmoid => "hardsigmoid",
            Activation::Tanh => "tanh",
            Activation::Softsign => "softsign",
            Activation::Relu => "relu",
            Activation::Identity => "identity",
            Activation::LeCunTanh => "lecuntanh",
        }
    }

    /// Whether the output range is a subset of `[0, 1]`, which is what a gate needs.
    pub fn is_bounded_gate(&self) -> bool {
        matches!(self, Activation::Sigmoid | Activation::HardSigmoid)
    }

    /// Applies the activation element-wise.
    pub fn forward<B: Backend, const D: usize>(&self, x: Tensor<B, D>) -> Tensor<B, D> {
        match self {
            Activation::Sigmoid => activation::sigmoid(x),
            Activation::HardSigmoid => x
                .mul_scalar(HARD_SIGMOID_SLOPE)
                .add_scalar(0.5)
                .clamp(0.0, 1.0),
            Activation::Tanh => x.tanh(),
            Activation::Softsign => {
                let denom = x.clone().abs().add_scalar(1.0);
                x / denom
            }
            Activation::Relu => activation::relu(x),
            Activation::Identity => x,
            Activation::LeCunTanh => x.mul_scalar(LECUN_SLOPE).tanh().mul_scalar(LECUN_SCALE),
        }
    }

    /// Derivative `f'(x)` evaluated at the pre-activation `x`.
    pub fn derivative<B: Backend, const D: usize>(&self, x: Tensor<B, D>) -> Tensor<B, D> {
        match self {
            Activation::Sigmoid => {
                let s = activation::sigmoid(x);
                s.clone() * s.neg().add_scalar(1.0)
            }
            Activation::HardSigmoid => {
                let inside = x.clone().greater_elem(-HARD_SIGMOID_LIMIT).float()
                    * x.lower_elem(HARD_SIGMOID_LIMIT).float();
                inside.mul_scalar(HARD_SIGMOID_SLOPE)
            }
            Activation::Tanh => one_minus_square(x.tanh()),
            Activation::Softsign => {
                let denom = x.abs().add_scalar(1.0);
                (denom.clone() * denom).recip()
            }
            Activation::Relu => x.greater_elem(0.0).float(),
            Activation::Identity => x.ones_like(),
            Activation::LeCunTanh => {
                one_minus_square(x.mul_scalar(LECUN_SLOPE).tanh()).mul_scalar(LECUN_SCALE * LECUN_SLOPE)
            }
        }
    }
}

fn one_minus_square<B: Backend, const D: usize>(t: Tensor<B, D>) -> Tensor<B, D> {
    (t.clone() * t).neg().add_scalar(1.0)
}

impl Default for Activation {
    fn default() -> Self {
        Activation::Tanh
    }
}

impl fmt::Display for Activation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Activation {
    type Err = LstmError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let key = s.trim().to_ascii_lowercase().replace('_', "");
        Activation::ALL
            .into_iter()
            .find(|act| act.name() == key)
            .ok_or_else(|| LstmError::UnknownActivation(s.to_string()))
    }
}
