//! Streaming inference with a stored carry state
//!
//! Feeds a sequence one timestep at a time through `rnn_time_step` and checks
//! it against a single full-sequence forward pass.

use burn::backend::NdArray;
use burn::tensor::{Distribution, Tensor};
use graves_lstm::prelude::*;

type Backend = NdArray<f32>;

fn main() -> LstmResult<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let device = Default::default();
    let (input_size, hidden_size, batch_size, time_steps) = (3, 6, 2, 10);

    let mut lstm = LstmConfig::new(input_size, hidden_size).init::<Backend>()?;
    let params = LstmParams::new(
        Tensor::random(
            ParamKind::InputWeights.shape(input_size, hidden_size),
            Distribution::Default,
            &device,
        ),
        Tensor::random(
            ParamKind::RecurrentWeights.shape(input_size, hidden_size),
            Distribution::Default,
            &device,
        ),
        Tensor::zeros(ParamKind::Bias.shape(input_size, hidden_size), &device),
    )?;

    let input = Tensor::<Backend, 3>::random(
        [batch_size, input_size, time_steps],
        Distribution::Uniform(-1.0, 1.0),
        &device,
    );
    let (full, _) = lstm.forward(input.clone(), &params, false)?;

    let mut max_diff = 0.0f32;
    for t in 0..time_steps {
        let step = lstm.rnn_time_step(input.clone().narrow(2, t, 1), &params)?;
        let expected = full.clone().narrow(2, t, 1);
        let diff = (step - expected).abs().max().into_scalar();
        max_diff = max_diff.max(diff);
        log::info!("t={} max |streamed - full| = {:e}", t, diff);
    }

    println!("Streamed {} timesteps, max deviation {:e}", time_steps, max_diff);

    lstm.rnn_clear_previous_state();
    println!("State cleared: {}", lstm.rnn_get_previous_state().is_none());
    Ok(())
}
