//! Per-timestep cache retained by a forward pass for backpropagation.

use burn::tensor::backend::Backend;
use burn::tensor::Tensor;

use crate::cells::{LstmState, StepRecord};
use crate::error::{ensure_shape, LstmResult};

/// Arena of [`StepRecord`]s indexed by timestep.
///
/// Produced by a forward pass that retains its intermediates and consumed by
/// exactly one backward pass.
#[derive(Debug, Clone)]
pub struct ForwardCache<B: Backend> {
    records: Vec<StepRecord<B>>,
    batch_size: usize,
    input_size: usize,
    hidden_size: usize,
}

impl<B: Backend> ForwardCache<B> {
    pub(crate) fn new(
        records: Vec<StepRecord<B>>,
        batch_size: usize,
        input_size: usize,
        hidden_size: usize,
    ) -> Self {
        Self {
            records,
            batch_size,
            input_size,
            hidden_size,
        }
    }

    pub fn time_steps(&self) -> usize {
        self.records.len()
    }

    pub fn batch_size(&self) -> usize {
        self.batch_size
    }

    pub fn input_size(&self) -> usize {
        self.input_size
    }

    pub fn hidden_size(&self) -> usize {
        self.hidden_size
    }

    pub fn records(&self) -> &[StepRecord<B>] {
        &self.records
    }

    pub fn record(&self, t: usize) -> Option<&StepRecord<B>> {
        self.records.get(t)
    }

    /// Hidden output `h_t` as its own `[batch, H]` tensor.
    pub fn output_at(&self, t: usize) -> Option<Tensor<B, 2>> {
        self.records.get(t).map(|record| record.hidden.clone())
    }

    /// Every timestep's output, individually addressable.
    pub fn outputs(&self) -> Vec<Tensor<B, 2>> {
        self.records.iter().map(|record| record.hidden.clone()).collect()
    }

    /// The carry state the sequence started from.
    pub fn initial_state(&self) -> Option<LstmState<B>> {
        self.records.first().map(|record| record.prev.clone())
    }

    /// The carry state after the last timestep.
    pub fn final_state(&self) -> Option<LstmState<B>> {
        self.records.last().map(StepRecord::state)
    }

    /// Checks an output gradient against the cached dimensions.
    pub fn validate_epsilon(&self, epsilon: &Tensor<B, 3>) -> LstmResult<()> {
        ensure_shape(
            "output gradient",
            &[self.batch_size, self.hidden_size, self.time_steps()],
            &epsilon.dims(),
        )
    }
}
