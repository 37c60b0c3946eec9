//! # Graves LSTM
//!
//! Peephole LSTM layer (Graves, 2013) with an explicit forward pass and
//! backpropagation through time, built on the Burn tensor API.
//!
//! ## Features
//!
//! - **Peephole connections**: forget, input and output gates see the cell state
//! - **Explicit BPTT**: gradients for every parameter, the input and the initial state
//! - **Truncated BPTT**: limit the backward pass to the trailing timesteps
//! - **Streaming inference**: stateful single-chunk stepping
//! - **Updaters**: Adam, AMSGrad and Padam with explicit state
//!
//! ## Quick Start
//!
//! ```rust
//! use burn::backend::NdArray;
//! use burn::tensor::Tensor;
//! use graves_lstm::prelude::*;
//!
//! type Backend = NdArray<f32>;
//! let device = Default::default();
//!
//! let mut lstm = LstmConfig::new(3, 5).init::<Backend>().unwrap();
//! let params = LstmParams::<Backend>::zeros(3, 5, &device);
//!
//! // [batch, input_size, time_steps]
//! let input = Tensor::<Backend, 3>::ones([2, 3, 4], &device);
//! let (output, _state) = lstm.forward(input, &params, true).unwrap();
//! assert_eq!(output.dims(), [2, 5, 4]);
//!
//! let epsilon = Tensor::<Backend, 3>::ones([2, 5, 4], &device);
//! let grads = lstm.backward(epsilon, &params).unwrap();
//! assert_eq!(grads.recurrent_weights.dims(), [5, 23]);
//! ```
//!
//! ## Parameter layout
//!
//! Gate blocks are ordered input modulation, forget, output, input. The
//! recurrent matrix carries three trailing peephole columns:
//!
//! | Tensor | Shape |
//! |--------|-------|
//! | input weights | `[input_size, 4H]` |
//! | recurrent weights | `[H, 4H + 3]` |
//! | bias | `[1, 4H]` |

pub mod activation;
pub mod cells;
pub mod config;
pub mod error;
pub mod params;
pub mod rnn;
pub mod updater;

pub mod prelude {
    pub use crate::activation::Activation;
    pub use crate::cells::{GravesLstmCell, LstmState};
    pub use crate::config::LstmConfig;
    pub use crate::error::{LstmError, LstmResult};
    pub use crate::params::{Gate, LstmGradients, LstmParams, ParamKind};
    pub use crate::rnn::{ForwardCache, GravesLstm};
    pub use crate::updater::{Adam, AmsGrad, BoundUpdater, Padam, ParamUpdaters, UpdaterConfig};
}
