//! # Single-timestep LSTM cell
//!
//! [`GravesLstmCell`] computes one step of the peephole LSTM. Sequence
//! processing, caching and backpropagation through time live in
//! [`crate::rnn`].
//!
//! ## Step equations
//!
//! ```text
//! a_t = act(x_t Wa + h_{t-1} Ra + ba)
//! f_t = gate(x_t Wf + h_{t-1} Rf + pf ⊙ c_{t-1} + bf)
//! i_t = gate(x_t Wi + h_{t-1} Ri + pi ⊙ c_{t-1} + bi)
//! c_t = f_t ⊙ c_{t-1} + i_t ⊙ a_t
//! o_t = gate(x_t Wo + h_{t-1} Ro + po ⊙ c_t + bo)
//! h_t = o_t ⊙ act(c_t)
//! ```
//!
//! The output gate peephole sees the *current* cell state.
//!
//! ## Tensor Shapes
//!
//! | Tensor | Shape | Description |
//! |--------|-------|-------------|
//! | `input` | `[batch, input_size]` | Input features at one timestep |
//! | `state.hidden` | `[batch, hidden_size]` | Previous output |
//! | `state.cell` | `[batch, hidden_size]` | Previous cell state |

pub mod lstm_cell;

pub(crate) use lstm_cell::CellWeights;
pub use lstm_cell::{
    gate_activations, GateValues, GravesLstmCell, LstmState, PeepholeGradients, StepGradients,
    StepRecord,
};
