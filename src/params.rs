//! Parameter layout for the peephole LSTM.
//!
//! | Tensor | Shape | Layout |
//! |--------|-------|--------|
//! | input weights `W` | `[input_size, 4H]` | four gate blocks |
//! | recurrent weights `RW` | `[H, 4H + 3]` | four gate blocks, then 3 peephole columns |
//! | bias `b` | `[1, 4H]` | four gate blocks |
//!
//! Gate blocks are ordered as [`Gate::ORDER`]: input modulation, forget,
//! output, input. The peephole columns are forget (`4H`), output (`4H + 1`)
//! and input (`4H + 2`).

use std::ops::Range;

use burn::tensor::backend::Backend;
use burn::tensor::Tensor;
use ndarray::Array2;

use crate::cells::LstmState;
use crate::error::{ensure_shape, LstmError, LstmResult};

/// Number of peephole columns appended to the recurrent weights.
pub const PEEPHOLE_COLUMNS: usize = 3;

/// One of the four gate blocks sharing the `4H` columns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Gate {
    /// Candidate cell input, squashed by the cell activation.
    InputModulation,
    Forget,
    Output,
    Input,
}

impl Gate {
    /// Column-block order shared by the forward and backward passes.
    pub const ORDER: [Gate; 4] = [Gate::InputModulation, Gate::Forget, Gate::Output, Gate::Input];

    pub fn block_index(&self) -> usize {
        match self {
            Gate::InputModulation => 0,
            Gate::Forget => 1,
            Gate::Output => 2,
            Gate::Input => 3,
        }
    }

    /// Columns of this gate inside `W`, `b` and the first `4H` columns of `RW`.
    pub fn columns(&self, hidden_size: usize) -> Range<usize> {
        let start = self.block_index() * hidden_size;
        start..start + hidden_size
    }

    /// Peephole column of this gate inside `RW`, if the gate has one.
    pub fn peephole_column(&self, hidden_size: usize) -> Option<usize> {
        match self {
            Gate::InputModulation => None,
            Gate::Forget => Some(4 * hidden_size),
            Gate::Output => Some(4 * hidden_size + 1),
            Gate::Input => Some(4 * hidden_size + 2),
        }
    }
}

/// Identifies one of the three learnable tensors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ParamKind {
    InputWeights,
    RecurrentWeights,
    Bias,
}

impl ParamKind {
    pub const ALL: [ParamKind; 3] = [ParamKind::InputWeights, ParamKind::RecurrentWeights, ParamKind::Bias];

    /// Short parameter key (`W`, `RW`, `b`).
    pub fn key(&self) -> &'static str {
        match self {
            ParamKind::InputWeights => "W",
            ParamKind::RecurrentWeights => "RW",
            ParamKind::Bias => "b",
        }
    }

    /// Expected shape for the given layer sizes.
    pub fn shape(&self, input_size: usize, hidden_size: usize) -> [usize; 2] {
        match self {
            ParamKind::InputWeights => [input_size, 4 * hidden_size],
            ParamKind::RecurrentWeights => [hidden_size, 4 * hidden_size + PEEPHOLE_COLUMNS],
            ParamKind::Bias => [1, 4 * hidden_size],
        }
    }
}

/// Total number of learnable scalars for a layer.
pub fn num_params(input_size: usize, hidden_size: usize) -> usize {
    ParamKind::ALL
        .iter()
        .map(|kind| kind.shape(input_size, hidden_size).iter().product::<usize>())
        .sum()
}

/// Learnable tensors of one LSTM layer.
///
/// The engine only ever borrows these; initialization and updates belong to
/// the caller.
#[derive(Debug, Clone)]
pub struct LstmParams<B: Backend> {
    input_weights: Tensor<B, 2>,
    recurrent_weights: Tensor<B, 2>,
    bias: Tensor<B, 2>,
}

impl<B: Backend> LstmParams<B> {
    /// Wraps caller-owned tensors, checking that their shapes agree.
    ///
    /// The hidden size is taken from the recurrent weights' row count.
    pub fn new(
        input_weights: Tensor<B, 2>,
        recurrent_weights: Tensor<B, 2>,
        bias: Tensor<B, 2>,
    ) -> LstmResult<Self> {
        let [hidden_size, _] = recurrent_weights.dims();
        let [input_size, _] = input_weights.dims();
        if hidden_size == 0 || input_size == 0 {
            return Err(LstmError::InvalidConfig(
                "input and hidden sizes must be positive".to_string(),
            ));
        }

        let params = Self {
            input_weights,
            recurrent_weights,
            bias,
        };
        params.validate(input_size, hidden_size)?;
        Ok(params)
    }

    /// All-zero parameters, mostly useful as a starting point for tests.
    pub fn zeros(input_size: usize, hidden_size: usize, device: &B::Device) -> Self {
        Self {
            input_weights: Tensor::zeros(ParamKind::InputWeights.shape(input_size, hidden_size), device),
            recurrent_weights: Tensor::zeros(
                ParamKind::RecurrentWeights.shape(input_size, hidden_size),
                device,
            ),
            bias: Tensor::zeros(ParamKind::Bias.shape(input_size, hidden_size), device),
        }
    }

    /// Builds parameters from row-major `ndarray` matrices.
    pub fn from_arrays(
        input_weights: &Array2<f32>,
        recurrent_weights: &Array2<f32>,
        bias: &Array2<f32>,
        device: &B::Device,
    ) -> LstmResult<Self> {
        Self::new(
            array_to_tensor(input_weights, device),
            array_to_tensor(recurrent_weights, device),
            array_to_tensor(bias, device),
        )
    }

    /// Checks every tensor against the layout for `input_size` x `hidden_size`.
    pub fn validate(&self, input_size: usize, hidden_size: usize) -> LstmResult<()> {
        for kind in ParamKind::ALL {
            ensure_shape(
                kind_label(kind),
                &kind.shape(input_size, hidden_size),
                &self.get(kind).dims(),
            )?;
        }
        Ok(())
    }

    pub fn input_size(&self) -> usize {
        self.input_weights.dims()[0]
    }

    pub fn hidden_size(&self) -> usize {
        self.recurrent_weights.dims()[0]
    }

    pub fn input_weights(&self) -> &Tensor<B, 2> {
        &self.input_weights
    }

    pub fn recurrent_weights(&self) -> &Tensor<B, 2> {
        &self.recurrent_weights
    }

    pub fn bias(&self) -> &Tensor<B, 2> {
        &self.bias
    }

    pub fn get(&self, kind: ParamKind) -> &Tensor<B, 2> {
        match kind {
            ParamKind::InputWeights => &self.input_weights,
            ParamKind::RecurrentWeights => &self.recurrent_weights,
            ParamKind::Bias => &self.bias,
        }
    }

    /// Replaces one tensor, keeping the layout intact.
    pub fn set(&mut self, kind: ParamKind, value: Tensor<B, 2>) -> LstmResult<()> {
        let expected = kind.shape(self.input_size(), self.hidden_size());
        ensure_shape(kind_label(kind), &expected, &value.dims())?;
        match kind {
            ParamKind::InputWeights => self.input_weights = value,
            ParamKind::RecurrentWeights => self.recurrent_weights = value,
            ParamKind::Bias => self.bias = value,
        }
        Ok(())
    }

    pub fn into_parts(self) -> (Tensor<B, 2>, Tensor<B, 2>, Tensor<B, 2>) {
        (self.input_weights, self.recurrent_weights, self.bias)
    }

    /// First `4H` columns of the recurrent weights: `[H, 4H]`.
    pub(crate) fn recurrent_gate_weights(&self) -> Tensor<B, 2> {
        let hidden = self.hidden_size();
        self.recurrent_weights.clone().slice([0..hidden, 0..4 * hidden])
    }

    /// Peephole weights of `gate` as a row vector `[1, H]` for broadcasting.
    ///
    /// The input modulation block has no peephole and yields zeros.
    pub(crate) fn peephole(&self, gate: Gate) -> Tensor<B, 2> {
        let hidden = self.hidden_size();
        match gate.peephole_column(hidden) {
            Some(col) => self
                .recurrent_weights
                .clone()
                .slice([0..hidden, col..col + 1])
                .transpose(),
            None => Tensor::zeros([1, hidden], &self.recurrent_weights.device()),
        }
    }
}

fn kind_label(kind: ParamKind) -> &'static str {
    match kind {
        ParamKind::InputWeights => "input weights",
        ParamKind::RecurrentWeights => "recurrent weights",
        ParamKind::Bias => "bias",
    }
}

fn array_to_tensor<B: Backend>(array: &Array2<f32>, device: &B::Device) -> Tensor<B, 2> {
    let (rows, cols) = array.dim();
    let data: Vec<f32> = array.iter().copied().collect();
    Tensor::<B, 1>::from_floats(data.as_slice(), device).reshape([rows, cols])
}

/// Gradients produced by one backward pass.
///
/// Parameter gradients have exactly the shapes of the matching
/// [`LstmParams`] tensors; `input` has the shape of the forward input.
#[derive(Debug, Clone)]
pub struct LstmGradients<B: Backend> {
    /// `[input_size, 4H]`
    pub input_weights: Tensor<B, 2>,
    /// `[H, 4H + 3]`, peephole columns included.
    pub recurrent_weights: Tensor<B, 2>,
    /// `[1, 4H]`
    pub bias: Tensor<B, 2>,
    /// Gradient for the previous layer, `[batch, input_size, time_steps]`.
    pub input: Tensor<B, 3>,
    /// Gradient with respect to the carry state entering the first visited
    /// timestep; the sequence's initial state unless the pass was truncated.
    pub initial_state: LstmState<B>,
}

impl<B: Backend> LstmGradients<B> {
    pub fn get(&self, kind: ParamKind) -> &Tensor<B, 2> {
        match kind {
            ParamKind::InputWeights => &self.input_weights,
            ParamKind::RecurrentWeights => &self.recurrent_weights,
            ParamKind::Bias => &self.bias,
        }
    }

    pub(crate) fn replace(&mut self, kind: ParamKind, value: Tensor<B, 2>) {
        match kind {
            ParamKind::InputWeights => self.input_weights = value,
            ParamKind::RecurrentWeights => self.recurrent_weights = value,
            ParamKind::Bias => self.bias = value,
        }
    }
}
