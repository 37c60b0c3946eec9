use burn::tensor::backend::Backend;
use burn::tensor::Tensor;

use crate::activation::Activation;
use crate::params::{Gate, LstmParams};

/// Carry state passed from one timestep to the next.
///
/// Both tensors have shape `[batch_size, hidden_size]`.
#[derive(Debug, Clone)]
pub struct LstmState<B: Backend> {
    pub hidden: Tensor<B, 2>,
    pub cell: Tensor<B, 2>,
}

impl<B: Backend> LstmState<B> {
    pub fn new(hidden: Tensor<B, 2>, cell: Tensor<B, 2>) -> Self {
        Self { hidden, cell }
    }

    /// The state a sequence starts from when none is supplied.
    pub fn zeros(batch_size: usize, hidden_size: usize, device: &B::Device) -> Self {
        Self {
            hidden: Tensor::zeros([batch_size, hidden_size], device),
            cell: Tensor::zeros([batch_size, hidden_size], device),
        }
    }

    pub fn batch_size(&self) -> usize {
        self.hidden.dims()[0]
    }

    pub fn hidden_size(&self) -> usize {
        self.hidden.dims()[1]
    }
}

/// Pre-activation and activation of one gate block, both `[batch, H]`.
#[derive(Debug, Clone)]
pub struct GateValues<B: Backend> {
    pub pre: Tensor<B, 2>,
    pub act: Tensor<B, 2>,
}

/// Everything one timestep computed that the backward pass needs again.
#[derive(Debug, Clone)]
pub struct StepRecord<B: Backend> {
    /// `x_t`, `[batch, input_size]`
    pub input: Tensor<B, 2>,
    /// `(h_{t-1}, c_{t-1})`
    pub prev: LstmState<B>,
    pub modulation: GateValues<B>,
    pub forget: GateValues<B>,
    pub output: GateValues<B>,
    pub input_gate: GateValues<B>,
    /// `c_t`
    pub cell: Tensor<B, 2>,
    /// `outAct(c_t)`
    pub cell_activation: Tensor<B, 2>,
    /// `h_t`
    pub hidden: Tensor<B, 2>,
}

impl<B: Backend> StepRecord<B> {
    /// The carry state this step hands to the next one.
    pub fn state(&self) -> LstmState<B> {
        LstmState::new(self.hidden.clone(), self.cell.clone())
    }

    fn gate(&self, gate: Gate) -> &GateValues<B> {
        match gate {
            Gate::InputModulation => &self.modulation,
            Gate::Forget => &self.forget,
            Gate::Output => &self.output,
            Gate::Input => &self.input_gate,
        }
    }
}

/// Peephole weight gradients of one step, each `[1, H]`.
#[derive(Debug, Clone)]
pub struct PeepholeGradients<B: Backend> {
    pub forget: Tensor<B, 2>,
    pub output: Tensor<B, 2>,
    pub input: Tensor<B, 2>,
}

/// Result of differentiating one timestep.
#[derive(Debug, Clone)]
pub struct StepGradients<B: Backend> {
    /// Pre-activation gradients in [`Gate::ORDER`] layout, `[batch, 4H]`.
    pub gates: Tensor<B, 2>,
    pub peephole: PeepholeGradients<B>,
    /// Gradients flowing into `(h_{t-1}, c_{t-1})`.
    pub prev: LstmState<B>,
    /// Gradient with respect to `x_t`, `[batch, input_size]`.
    pub input: Tensor<B, 2>,
}

/// Parameter views prepared once per forward or backward call.
#[derive(Debug, Clone)]
pub(crate) struct CellWeights<B: Backend> {
    hidden_size: usize,
    input: Tensor<B, 2>,
    recurrent: Tensor<B, 2>,
    bias: Tensor<B, 2>,
    peephole_forget: Tensor<B, 2>,
    peephole_output: Tensor<B, 2>,
    peephole_input: Tensor<B, 2>,
}

impl<B: Backend> CellWeights<B> {
    pub(crate) fn new(params: &LstmParams<B>) -> Self {
        Self {
            hidden_size: params.hidden_size(),
            input: params.input_weights().clone(),
            recurrent: params.recurrent_gate_weights(),
            bias: params.bias().clone(),
            peephole_forget: params.peephole(Gate::Forget),
            peephole_output: params.peephole(Gate::Output),
            peephole_input: params.peephole(Gate::Input),
        }
    }
}

/// Single timestep of the Graves peephole LSTM
///
/// Implements, with `σ` the gate activation and `g` the cell activation:
/// - a = g(x W_a + h W'_a + b_a)
/// - f = σ(x W_f + h W'_f + b_f + c ⊙ p_f)
/// - i = σ(x W_i + h W'_i + b_i + c ⊙ p_i)
/// - c' = f ⊙ c + i ⊙ a
/// - o = σ(x W_o + h W'_o + b_o + c' ⊙ p_o)
/// - h' = o ⊙ g(c')
///
/// The output gate peeks at the *new* cell state, the forget and input gates
/// at the previous one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GravesLstmCell {
    gate_activation: Activation,
    activation: Activation,
}

impl Default for GravesLstmCell {
    fn default() -> Self {
        Self::new(Activation::Sigmoid, Activation::Tanh)
    }
}

impl GravesLstmCell {
    /// Create a cell from its two activations.
    ///
    /// # Arguments
    /// * `gate_activation` - Applied to the forget, input and output gates
    /// * `activation` - Applied to the input modulation block and the cell state
    pub fn new(gate_activation: Activation, activation: Activation) -> Self {
        Self {
            gate_activation,
            activation,
        }
    }

    pub fn gate_activation(&self) -> Activation {
        self.gate_activation
    }

    pub fn activation(&self) -> Activation {
        self.activation
    }

    /// Perform a forward pass through the cell
    ///
    /// # Arguments
    /// * `input` - Input tensor of shape `[batch_size, input_size]`
    /// * `state` - Previous carry state
    /// * `params` - Layer parameters
    ///
    /// # Returns
    /// The new carry state
    pub fn forward<B: Backend>(
        &self,
        input: Tensor<B, 2>,
        state: LstmState<B>,
        params: &LstmParams<B>,
    ) -> LstmState<B> {
        self.step(input, state, &CellWeights::new(params)).state()
    }

    pub(crate) fn step<B: Backend>(
        &self,
        input: Tensor<B, 2>,
        prev: LstmState<B>,
        weights: &CellWeights<B>,
    ) -> StepRecord<B> {
        let hidden = weights.hidden_size;

        let z = input.clone().matmul(weights.input.clone())
            + prev.hidden.clone().matmul(weights.recurrent.clone())
            + weights.bias.clone();
        let [batch, _] = z.dims();
        let block = |gate: Gate| z.clone().slice([0..batch, gate.columns(hidden)]);

        let modulation = self.activate(block(Gate::InputModulation), self.activation);
        let forget = self.activate(
            block(Gate::Forget) + prev.cell.clone() * weights.peephole_forget.clone(),
            self.gate_activation,
        );
        let input_gate = self.activate(
            block(Gate::Input) + prev.cell.clone() * weights.peephole_input.clone(),
            self.gate_activation,
        );

        let cell = forget.act.clone() * prev.cell.clone() + input_gate.act.clone() * modulation.act.clone();

        let output = self.activate(
            block(Gate::Output) + cell.clone() * weights.peephole_output.clone(),
            self.gate_activation,
        );

        let cell_activation = self.activation.forward(cell.clone());
        let hidden = output.act.clone() * cell_activation.clone();

        StepRecord {
            input,
            prev,
            modulation,
            forget,
            output,
            input_gate,
            cell,
            cell_activation,
            hidden,
        }
    }

    fn activate<B: Backend>(&self, pre: Tensor<B, 2>, activation: Activation) -> GateValues<B> {
        let act = activation.forward(pre.clone());
        GateValues { pre, act }
    }

    /// Differentiates one step.
    ///
    /// * `grad_hidden` - total gradient on `h_t` (output gradient plus the
    ///   recurrent contribution from `t + 1`)
    /// * `grad_cell_next` - gradient on `c_t` arriving from `t + 1`
    pub(crate) fn backward_step<B: Backend>(
        &self,
        record: &StepRecord<B>,
        grad_hidden: Tensor<B, 2>,
        grad_cell_next: Tensor<B, 2>,
        weights: &CellWeights<B>,
    ) -> StepGradients<B> {
        let gate_act = self.gate_activation;
        let act = self.activation;

        let grad_output_act = grad_hidden.clone() * record.cell_activation.clone();
        let dz_output = grad_output_act * gate_act.derivative(record.output.pre.clone());

        let grad_cell = grad_hidden * record.output.act.clone() * act.derivative(record.cell.clone())
            + dz_output.clone() * weights.peephole_output.clone()
            + grad_cell_next;

        let dz_forget =
            grad_cell.clone() * record.prev.cell.clone() * gate_act.derivative(record.forget.pre.clone());
        let dz_input = grad_cell.clone()
            * record.modulation.act.clone()
            * gate_act.derivative(record.input_gate.pre.clone());
        let dz_modulation = grad_cell.clone()
            * record.input_gate.act.clone()
            * act.derivative(record.modulation.pre.clone());

        // c_{t-1} reaches c_t directly and through both peepholes.
        let grad_cell_prev = grad_cell * record.forget.act.clone()
            + dz_forget.clone() * weights.peephole_forget.clone()
            + dz_input.clone() * weights.peephole_input.clone();

        let peephole = PeepholeGradients {
            forget: (dz_forget.clone() * record.prev.cell.clone()).sum_dim(0),
            output: (dz_output.clone() * record.cell.clone()).sum_dim(0),
            input: (dz_input.clone() * record.prev.cell.clone()).sum_dim(0),
        };

        let blocks = Gate::ORDER
            .iter()
            .map(|gate| match gate {
                Gate::InputModulation => dz_modulation.clone(),
                Gate::Forget => dz_forget.clone(),
                Gate::Output => dz_output.clone(),
                Gate::Input => dz_input.clone(),
            })
            .collect();
        let gates = Tensor::cat(blocks, 1);

        let grad_hidden_prev = gates.clone().matmul(weights.recurrent.clone().transpose());
        let input = gates.clone().matmul(weights.input.clone().transpose());

        StepGradients {
            gates,
            peephole,
            prev: LstmState::new(grad_hidden_prev, grad_cell_prev),
            input,
        }
    }
}

/// Gate activations of a record, in [`Gate::ORDER`] layout.
pub fn gate_activations<B: Backend>(record: &StepRecord<B>) -> Tensor<B, 2> {
    let blocks = Gate::ORDER
        .iter()
        .map(|gate| record.gate(*gate).act.clone())
        .collect();
    Tensor::cat(blocks, 1)
}
