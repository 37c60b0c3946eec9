//! # Sequence processing and backpropagation through time
//!
//! [`GravesLstm`] runs the cell over a whole sequence, optionally retaining a
//! [`ForwardCache`] that a single later [`GravesLstm::backward`] call consumes.
//! The free functions [`forward_pass`] and [`backward_pass`] expose the same
//! engine without the layer's bookkeeping.
//!
//! ## Tensor Shapes
//!
//! Time is the last axis.
//!
//! | Tensor | Shape |
//! |--------|-------|
//! | input `X` | `[batch, input_size, time_steps]` |
//! | output / `epsilon` | `[batch, hidden_size, time_steps]` |
//! | input gradient `dX` | `[batch, input_size, time_steps]` |
//!
//! ## Stateful inference
//!
//! ```ignore
//! let mut lstm = LstmConfig::new(4, 8).init::<Backend>()?;
//! let y1 = lstm.rnn_time_step(chunk1, &params)?;
//! let y2 = lstm.rnn_time_step(chunk2, &params)?; // continues from chunk1
//! lstm.rnn_clear_previous_state();
//! ```

pub mod cache;
pub mod lstm;

pub use cache::ForwardCache;
pub use lstm::{backward_pass, forward_pass, ForwardOutput, GravesLstm};
