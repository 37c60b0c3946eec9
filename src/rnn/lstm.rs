//! Graves (peephole) LSTM layer
//!
//! Sequence processing, retained-cache bookkeeping and backpropagation through
//! time around the single-step [`GravesLstmCell`].

use std::time::Instant;

use burn::tensor::backend::Backend;
use burn::tensor::Tensor;

use crate::cells::{CellWeights, GravesLstmCell, LstmState, StepRecord};
use crate::config::LstmConfig;
use crate::error::{ensure_shape, LstmError, LstmResult};
use crate::params::{LstmGradients, LstmParams};
use crate::rnn::ForwardCache;

/// Result of [`forward_pass`].
#[derive(Debug, Clone)]
pub struct ForwardOutput<B: Backend> {
    /// `[batch, hidden_size, time_steps]`
    pub output: Tensor<B, 3>,
    /// Carry state after the last timestep.
    pub final_state: LstmState<B>,
    /// Present only when the intermediates were retained.
    pub cache: Option<ForwardCache<B>>,
}

/// Runs the recursion over every timestep of `input`.
///
/// # Arguments
/// * `cell` - Activations of the layer
/// * `input` - Tensor of shape `[batch, input_size, time_steps]`
/// * `params` - Layer parameters (read only)
/// * `initial_state` - Carry state at `t = -1`, zeros when `None`
/// * `retain_cache` - Keep every [`StepRecord`] for a following backward pass
///
/// Both settings of `retain_cache` run the same step computation, so the
/// cached per-step outputs equal the slices of the stacked output exactly.
pub fn forward_pass<B: Backend>(
    cell: &GravesLstmCell,
    input: Tensor<B, 3>,
    params: &LstmParams<B>,
    initial_state: Option<LstmState<B>>,
    retain_cache: bool,
) -> LstmResult<ForwardOutput<B>> {
    let [batch_size, input_size, time_steps] = input.dims();
    let hidden_size = params.hidden_size();

    ensure_shape(
        "input",
        &[batch_size, params.input_size(), time_steps],
        &[batch_size, input_size, time_steps],
    )?;
    if batch_size == 0 || time_steps == 0 {
        return Err(LstmError::InvalidConfig(format!(
            "input must hold at least one example and one timestep, got {:?}",
            input.dims()
        )));
    }
    if let Some(state) = &initial_state {
        validate_state(state, batch_size, hidden_size)?;
    }

    let started = if log::log_enabled!(log::Level::Debug) { Some(Instant::now()) } else { None };

    let device = input.device();
    let weights = CellWeights::new(params);
    let mut state =
        initial_state.unwrap_or_else(|| LstmState::zeros(batch_size, hidden_size, &device));

    let mut outputs: Vec<Tensor<B, 2>> = Vec::with_capacity(time_steps);
    let mut records: Vec<StepRecord<B>> =
        Vec::with_capacity(if retain_cache { time_steps } else { 0 });

    for t in 0..time_steps {
        // input[batch, features, t] -> [batch, features]
        let step_input = input.clone().narrow(2, t, 1).squeeze::<2>(2);

        let record = cell.step(step_input, state, &weights);
        state = record.state();
        outputs.push(record.hidden.clone());

        if retain_cache {
            records.push(record);
        }
        log::trace!("graves_lstm::forward step {}/{}", t + 1, time_steps);
    }

    let output: Tensor<B, 3> = Tensor::stack(outputs, 2);
    let cache = retain_cache
        .then(|| ForwardCache::new(records, batch_size, input_size, hidden_size));

    if let Some(t) = started {
        log::debug!(
            "[perf] graves_lstm::forward {:?}->{:?} retain={} {:.3}ms",
            [batch_size, input_size, time_steps],
            output.dims(),
            retain_cache,
            t.elapsed().as_secs_f64() * 1000.0
        );
    }

    Ok(ForwardOutput {
        output,
        final_state: state,
        cache,
    })
}

/// Backpropagation through time over a retained cache.
///
/// # Arguments
/// * `cell` - Must be the cell that produced `cache`
/// * `cache` - Records of the forward pass
/// * `epsilon` - Gradient on every `h_t`, `[batch, hidden_size, time_steps]`
/// * `params` - The parameters used in the forward pass
/// * `backward_length` - Visit only this many trailing timesteps (truncated BPTT)
///
/// Parameter gradients are summed over the visited timesteps. Input gradient
/// slices of unvisited timesteps are zero.
pub fn backward_pass<B: Backend>(
    cell: &GravesLstmCell,
    cache: &ForwardCache<B>,
    epsilon: Tensor<B, 3>,
    params: &LstmParams<B>,
    backward_length: Option<usize>,
) -> LstmResult<LstmGradients<B>> {
    cache.validate_epsilon(&epsilon)?;
    params.validate(cache.input_size(), cache.hidden_size())?;

    let started = if log::log_enabled!(log::Level::Debug) { Some(Instant::now()) } else { None };

    let batch_size = cache.batch_size();
    let input_size = cache.input_size();
    let hidden_size = cache.hidden_size();
    let time_steps = cache.time_steps();
    let gate_size = 4 * hidden_size;
    let device = epsilon.device();
    let weights = CellWeights::new(params);

    let mut grad_input_weights = Tensor::<B, 2>::zeros([input_size, gate_size], &device);
    let mut grad_recurrent_gates = Tensor::<B, 2>::zeros([hidden_size, gate_size], &device);
    let mut grad_bias = Tensor::<B, 2>::zeros([1, gate_size], &device);
    let mut grad_peephole_forget = Tensor::<B, 2>::zeros([1, hidden_size], &device);
    let mut grad_peephole_output = Tensor::<B, 2>::zeros([1, hidden_size], &device);
    let mut grad_peephole_input = Tensor::<B, 2>::zeros([1, hidden_size], &device);

    let mut grad_inputs: Vec<Tensor<B, 2>> = (0..time_steps)
        .map(|_| Tensor::zeros([batch_size, input_size], &device))
        .collect();

    let mut grad_hidden_next = Tensor::<B, 2>::zeros([batch_size, hidden_size], &device);
    let mut grad_cell_next = Tensor::<B, 2>::zeros([batch_size, hidden_size], &device);

    let first = backward_length.map_or(0, |len| time_steps.saturating_sub(len));

    for (t, record) in cache.records().iter().enumerate().skip(first).rev() {
        let epsilon_t = epsilon.clone().narrow(2, t, 1).squeeze::<2>(2);

        let step = cell.backward_step(record, epsilon_t + grad_hidden_next, grad_cell_next, &weights);

        grad_input_weights =
            grad_input_weights + record.input.clone().transpose().matmul(step.gates.clone());
        grad_recurrent_gates =
            grad_recurrent_gates + record.prev.hidden.clone().transpose().matmul(step.gates.clone());
        grad_bias = grad_bias + step.gates.sum_dim(0);
        grad_peephole_forget = grad_peephole_forget + step.peephole.forget;
        grad_peephole_output = grad_peephole_output + step.peephole.output;
        grad_peephole_input = grad_peephole_input + step.peephole.input;

        grad_inputs[t] = step.input;
        grad_hidden_next = step.prev.hidden;
        grad_cell_next = step.prev.cell;

        log::trace!("graves_lstm::backward step {}", t);
    }

    // Peephole columns follow the gate blocks as forget, output, input.
    let recurrent_weights = Tensor::cat(
        vec![
            grad_recurrent_gates,
            grad_peephole_forget.transpose(),
            grad_peephole_output.transpose(),
            grad_peephole_input.transpose(),
        ],
        1,
    );

    let input: Tensor<B, 3> = Tensor::stack(grad_inputs, 2);

    if let Some(t) = started {
        log::debug!(
            "[perf] graves_lstm::backward steps={}..{} {:.3}ms",
            first,
            time_steps,
            t.elapsed().as_secs_f64() * 1000.0
        );
    }

    Ok(LstmGradients {
        input_weights: grad_input_weights,
        recurrent_weights,
        bias: grad_bias,
        input,
        initial_state: LstmState::new(grad_hidden_next, grad_cell_next),
    })
}

fn validate_state<B: Backend>(
    state: &LstmState<B>,
    batch_size: usize,
    hidden_size: usize,
) -> LstmResult<()> {
    ensure_shape("hidden state", &[batch_size, hidden_size], &state.hidden.dims())?;
    ensure_shape("cell state", &[batch_size, hidden_size], &state.cell.dims())
}

/// Graves LSTM layer
///
/// Holds the configuration of one layer, the cache of the last forward pass
/// that asked for one, and the carry state used by [`GravesLstm::rnn_time_step`].
/// Parameters are never stored; every call borrows them.
///
/// # Type Parameters
/// * `B` - The backend type
#[derive(Debug)]
pub struct GravesLstm<B: Backend> {
    cell: GravesLstmCell,
    input_size: usize,
    hidden_size: usize,
    tbptt_backward_length: Option<usize>,
    cache: Option<ForwardCache<B>>,
    state: Option<LstmState<B>>,
}

impl<B: Backend> GravesLstm<B> {
    /// Create a layer from a validated configuration
    pub fn new(config: &LstmConfig) -> LstmResult<Self> {
        config.validate()?;
        Ok(Self {
            cell: GravesLstmCell::new(config.gate_activation, config.activation),
            input_size: config.input_size,
            hidden_size: config.hidden_size,
            tbptt_backward_length: config.tbptt_backward_length,
            cache: None,
            state: None,
        })
    }

    pub fn input_size(&self) -> usize {
        self.input_size
    }

    pub fn hidden_size(&self) -> usize {
        self.hidden_size
    }

    pub fn cell(&self) -> &GravesLstmCell {
        &self.cell
    }

    pub fn tbptt_backward_length(&self) -> Option<usize> {
        self.tbptt_backward_length
    }

    /// Cache of the last forward pass, if it retained one and no backward pass consumed it.
    pub fn cache(&self) -> Option<&ForwardCache<B>> {
        self.cache.as_ref()
    }

    /// Forward pass through the layer, starting from a zero carry state
    ///
    /// # Arguments
    /// * `input` - Input tensor of shape `[batch, input_size, time_steps]`
    /// * `params` - Layer parameters
    /// * `retain_cache` - Keep the intermediates for [`GravesLstm::backward`]
    ///
    /// # Returns
    /// Tuple of (output, final_state) where:
    /// - output: `[batch, hidden_size, time_steps]`
    /// - final_state: carry state after the last timestep
    pub fn forward(
        &mut self,
        input: Tensor<B, 3>,
        params: &LstmParams<B>,
        retain_cache: bool,
    ) -> LstmResult<(Tensor<B, 3>, LstmState<B>)> {
        self.forward_with_state(input, params, None, retain_cache)
    }

    /// Forward pass continuing from an explicit carry state.
    ///
    /// Any previously retained cache is dropped, whether or not this call retains a new one.
    pub fn forward_with_state(
        &mut self,
        input: Tensor<B, 3>,
        params: &LstmParams<B>,
        initial_state: Option<LstmState<B>>,
        retain_cache: bool,
    ) -> LstmResult<(Tensor<B, 3>, LstmState<B>)> {
        params.validate(self.input_size, self.hidden_size)?;

        let out = forward_pass(&self.cell, input, params, initial_state, retain_cache)?;
        self.cache = out.cache;
        Ok((out.output, out.final_state))
    }

    /// Backpropagation through time over the cache of the last forward pass.
    ///
    /// The cache is consumed; a second call without another retaining forward
    /// pass fails with [`LstmError::NoCachedForwardPass`]. On a validation
    /// error the cache is left in place.
    pub fn backward(
        &mut self,
        epsilon: Tensor<B, 3>,
        params: &LstmParams<B>,
    ) -> LstmResult<LstmGradients<B>> {
        let cache = self.cache.as_ref().ok_or(LstmError::NoCachedForwardPass)?;
        cache.validate_epsilon(&epsilon)?;
        params.validate(self.input_size, self.hidden_size)?;

        let cache = self.cache.take().ok_or(LstmError::NoCachedForwardPass)?;
        backward_pass(&self.cell, &cache, epsilon, params, self.tbptt_backward_length)
    }

    /// Streaming inference: continues from the stored carry state and stores the new one.
    ///
    /// Does not touch the backpropagation cache.
    pub fn rnn_time_step(
        &mut self,
        input: Tensor<B, 3>,
        params: &LstmParams<B>,
    ) -> LstmResult<Tensor<B, 3>> {
        params.validate(self.input_size, self.hidden_size)?;

        let out = forward_pass(&self.cell, input, params, self.state.clone(), false)?;
        self.state = Some(out.final_state);
        Ok(out.output)
    }

    /// Carry state stored by [`GravesLstm::rnn_time_step`].
    pub fn rnn_get_previous_state(&self) -> Option<&LstmState<B>> {
        self.state.as_ref()
    }

    pub fn rnn_set_previous_state(&mut self, state: LstmState<B>) -> LstmResult<()> {
        validate_state(&state, state.batch_size(), self.hidden_size)?;
        self.state = Some(state);
        Ok(())
    }

    pub fn rnn_clear_previous_state(&mut self) {
        self.state = None;
    }
}
