//! Training Demo - fitting a delayed copy of the input
//!
//! Gradients come from the layer's own backward pass; the updater turns them
//! into parameter steps. Set `RUST_LOG=debug` to see per-pass timings.

use burn::backend::NdArray;
use burn::tensor::{Distribution, Tensor};
use graves_lstm::prelude::*;

type Backend = NdArray<f32>;

fn main() -> LstmResult<()> {
    env_logger::init();
    println!("=== Graves LSTM Training Example ===\n");

    let device = Default::default();
    let (input_size, hidden_size, batch_size, time_steps) = (1, 8, 4, 12);
    let epochs = 200;

    let config = LstmConfig::new(input_size, hidden_size)
        .with_gate_activation(Activation::HardSigmoid)
        .with_tbptt_backward_length(8);
    let mut lstm = config.init::<Backend>()?;

    let mut params = LstmParams::new(
        Tensor::random(
            ParamKind::InputWeights.shape(input_size, hidden_size),
            Distribution::Uniform(-0.2, 0.2),
            &device,
        ),
        Tensor::random(
            ParamKind::RecurrentWeights.shape(input_size, hidden_size),
            Distribution::Uniform(-0.2, 0.2),
            &device,
        ),
        Tensor::zeros(ParamKind::Bias.shape(input_size, hidden_size), &device),
    )?;
    let mut updaters =
        ParamUpdaters::<Backend, _>::for_layer(Padam::new(0.05, 0.125), input_size, hidden_size, &device)?;

    println!("Training setup:");
    println!("  Layer:   {} -> {} (hardsigmoid gates)", input_size, hidden_size);
    println!("  Updater: Padam");
    println!("  Task:    every unit reproduces the input one step later");
    println!();

    let input = Tensor::<Backend, 3>::random(
        [batch_size, input_size, time_steps],
        Distribution::Uniform(-0.5, 0.5),
        &device,
    );
    let delayed = Tensor::cat(
        vec![
            Tensor::zeros([batch_size, input_size, 1], &device),
            input.clone().narrow(2, 0, time_steps - 1),
        ],
        2,
    );
    let target = delayed.repeat_dim(1, hidden_size);
    let count = (batch_size * hidden_size * time_steps) as f32;

    for epoch in 0..epochs {
        let (output, _) = lstm.forward(input.clone(), &params, true)?;
        let diff = output - target.clone();
        let loss = (diff.clone() * diff.clone()).sum().into_scalar() / count;

        let mut grads = lstm.backward(diff.mul_scalar(2.0 / count), &params)?;
        updaters.apply_all(&mut grads, epoch, epoch)?;
        for kind in ParamKind::ALL {
            params.set(kind, params.get(kind).clone() - grads.get(kind).clone())?;
        }

        if epoch % 20 == 0 || epoch == epochs - 1 {
            println!("  epoch {:>3}  mse {:.6}", epoch, loss);
        }
    }

    println!("\n=== Training completed ===");
    Ok(())
}
