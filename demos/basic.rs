//! Basic usage of the Graves LSTM layer
//!
//! Runs a forward pass, inspects the retained cache and computes gradients
//! for a constant output gradient.

use burn::backend::NdArray;
use burn::tensor::{Distribution, Tensor};
use graves_lstm::prelude::*;

fn main() -> LstmResult<()> {
    println!("=== Graves LSTM Basic Example ===\n");

    type Backend = NdArray<f32>;
    let device = Default::default();

    let (input_size, hidden_size, batch_size, time_steps) = (13, 17, 10, 7);
    let config = LstmConfig::new(input_size, hidden_size);
    let mut lstm = config.init::<Backend>()?;

    let params = LstmParams::new(
        Tensor::random(
            ParamKind::InputWeights.shape(input_size, hidden_size),
            Distribution::Uniform(-0.1, 0.1),
            &device,
        ),
        Tensor::random(
            ParamKind::RecurrentWeights.shape(input_size, hidden_size),
            Distribution::Uniform(-0.1, 0.1),
            &device,
        ),
        Tensor::zeros(ParamKind::Bias.shape(input_size, hidden_size), &device),
    )?;

    println!("Created layer:");
    println!("  Input size:  {}", input_size);
    println!("  Hidden size: {}", hidden_size);
    println!("  Gate / cell activation: {} / {}", config.gate_activation, config.activation);
    println!("  Parameters:  {}", config.num_params());
    println!();

    // [batch, features, time]
    let input = Tensor::<Backend, 3>::random(
        [batch_size, input_size, time_steps],
        Distribution::Uniform(-1.0, 1.0),
        &device,
    );

    let (output, state) = lstm.forward(input, &params, true)?;
    println!("Forward pass:");
    println!("  Output shape:      {:?}", output.dims());
    println!("  Final hidden:      {:?}", state.hidden.dims());
    if let Some(cache) = lstm.cache() {
        println!("  Cached timesteps:  {}", cache.time_steps());
    }
    println!();

    let epsilon = Tensor::<Backend, 3>::ones([batch_size, hidden_size, time_steps], &device);
    let grads = lstm.backward(epsilon, &params)?;

    println!("Backward pass:");
    for kind in ParamKind::ALL {
        println!("  d{:<3} {:?}", kind.key(), grads.get(kind).dims());
    }
    println!("  dX   {:?}", grads.input.dims());

    println!("\n=== Example completed successfully! ===");
    Ok(())
}
