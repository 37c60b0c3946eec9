//! Layer-level tests: shapes, cached outputs, prefix behavior

use burn::backend::NdArray;
use burn::tensor::Tensor;
use graves_lstm::prelude::*;
use graves_lstm::rnn::forward_pass;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

type Backend = NdArray<f32>;

fn random_tensor<const D: usize>(rng: &mut StdRng, shape: [usize; D], scale: f32) -> Tensor<Backend, D> {
    let device = Default::default();
    let numel: usize = shape.iter().product();
    let values: Vec<f32> = (0..numel).map(|_| rng.gen_range(-scale..scale)).collect();
    Tensor::<Backend, 1>::from_floats(values.as_slice(), &device).reshape(shape)
}

fn random_params(rng: &mut StdRng, input_size: usize, hidden_size: usize) -> LstmParams<Backend> {
    LstmParams::new(
        random_tensor(rng, ParamKind::InputWeights.shape(input_size, hidden_size), 0.5),
        random_tensor(rng, ParamKind::RecurrentWeights.shape(input_size, hidden_size), 0.5),
        random_tensor(rng, ParamKind::Bias.shape(input_size, hidden_size), 0.5),
    )
    .unwrap()
}

fn values<const D: usize>(t: Tensor<Backend, D>) -> Vec<f32> {
    t.into_data().to_vec::<f32>().unwrap()
}

#[test]
fn test_reference_scenario_shapes() {
    let device = Default::default();
    let mut rng = StdRng::seed_from_u64(12345);
    let (n_in, hidden, batch, steps) = (13, 17, 10, 7);

    let mut lstm = LstmConfig::new(n_in, hidden).init::<Backend>().unwrap();
    let params = random_params(&mut rng, n_in, hidden);
    let input = random_tensor(&mut rng, [batch, n_in, steps], 1.0);

    let (output, state) = lstm.forward(input, &params, true).unwrap();
    assert_eq!(output.dims(), [batch, hidden, steps]);
    assert_eq!(state.hidden.dims(), [batch, hidden]);
    assert_eq!(state.cell.dims(), [batch, hidden]);

    let epsilon = Tensor::<Backend, 3>::ones([batch, hidden, steps], &device);
    let grads = lstm.backward(epsilon, &params).unwrap();

    assert_eq!(grads.input_weights.dims(), [13, 68]);
    assert_eq!(grads.recurrent_weights.dims(), [17, 71]);
    assert_eq!(grads.bias.dims(), [1, 68]);
    assert_eq!(grads.input.dims(), [10, 13, 7]);
    assert_eq!(grads.initial_state.hidden.dims(), [10, 17]);
}

#[test]
fn test_degenerate_sizes() {
    let device = Default::default();
    let mut rng = StdRng::seed_from_u64(7);
    let (n_in, hidden) = (3, 4);
    let params = random_params(&mut rng, n_in, hidden);

    for (batch, steps) in [(1, 5), (6, 1), (1, 1)] {
        let mut lstm = LstmConfig::new(n_in, hidden).init::<Backend>().unwrap();
        let input = random_tensor(&mut rng, [batch, n_in, steps], 1.0);

        let (output, _) = lstm.forward(input, &params, true).unwrap();
        assert_eq!(output.dims(), [batch, hidden, steps]);

        let epsilon = Tensor::<Backend, 3>::ones([batch, hidden, steps], &device);
        let grads = lstm.backward(epsilon, &params).unwrap();
        assert_eq!(grads.input_weights.dims(), [n_in, 4 * hidden]);
        assert_eq!(grads.recurrent_weights.dims(), [hidden, 4 * hidden + 3]);
        assert_eq!(grads.bias.dims(), [1, 4 * hidden]);
        assert_eq!(grads.input.dims(), [batch, n_in, steps]);
        assert!(values(grads.input).iter().all(|v| v.is_finite()));
    }
}

#[test]
fn test_cached_outputs_match_stacked_output() {
    let mut rng = StdRng::seed_from_u64(99);
    let (n_in, hidden, batch, steps) = (5, 6, 3, 8);
    let params = random_params(&mut rng, n_in, hidden);
    let input = random_tensor(&mut rng, [batch, n_in, steps], 1.0);
    let cell = GravesLstmCell::default();

    let retained = forward_pass(&cell, input.clone(), &params, None, true).unwrap();
    let plain = forward_pass(&cell, input, &params, None, false).unwrap();
    let cache = retained.cache.unwrap();
    assert!(plain.cache.is_none());
    assert_eq!(cache.time_steps(), steps);

    assert_eq!(values(retained.output.clone()), values(plain.output));
    for t in 0..steps {
        let slice = retained.output.clone().narrow(2, t, 1).squeeze::<2>(2);
        assert_eq!(values(cache.output_at(t).unwrap()), values(slice), "timestep {}", t);
    }
}

#[test]
fn test_prefix_invariance() {
    let device = Default::default();
    let mut rng = StdRng::seed_from_u64(2024);
    let (n_in, hidden, batch) = (4, 5, 2);
    let (short_steps, long_steps) = (3, 6);
    let params = random_params(&mut rng, n_in, hidden);

    let short = random_tensor(&mut rng, [batch, n_in, short_steps], 1.0);
    let padding = Tensor::<Backend, 3>::zeros([batch, n_in, long_steps - short_steps], &device);
    let long = Tensor::cat(vec![short.clone(), padding], 2);

    let mut lstm = LstmConfig::new(n_in, hidden).init::<Backend>().unwrap();
    let (short_out, _) = lstm.forward(short, &params, false).unwrap();
    let (long_out, _) = lstm.forward(long, &params, false).unwrap();

    assert_eq!(long_out.dims(), [batch, hidden, long_steps]);
    assert_eq!(values(short_out), values(long_out.narrow(2, 0, short_steps)));
}

#[test]
fn test_streaming_matches_full_sequence() {
    let mut rng = StdRng::seed_from_u64(5);
    let (n_in, hidden, batch, steps) = (3, 4, 2, 6);
    let params = random_params(&mut rng, n_in, hidden);
    let input = random_tensor(&mut rng, [batch, n_in, steps], 1.0);

    let mut lstm = LstmConfig::new(n_in, hidden).init::<Backend>().unwrap();
    let (full, _) = lstm.forward(input.clone(), &params, false).unwrap();

    let mut streamed = Vec::new();
    for t in 0..steps {
        streamed.push(lstm.rnn_time_step(input.clone().narrow(2, t, 1), &params).unwrap());
    }
    let streamed = Tensor::cat(streamed, 2);

    let full = values(full);
    let streamed = values(streamed);
    for (a, b) in full.iter().zip(streamed.iter()) {
        assert!((a - b).abs() < 1e-6, "{} vs {}", a, b);
    }

    lstm.rnn_clear_previous_state();
    assert!(lstm.rnn_get_previous_state().is_none());
}

#[test]
fn test_truncated_backward_only_touches_trailing_steps() {
    let device = Default::default();
    let mut rng = StdRng::seed_from_u64(31);
    let (n_in, hidden, batch, steps, kept) = (3, 4, 2, 6, 2);
    let params = random_params(&mut rng, n_in, hidden);
    let input = random_tensor(&mut rng, [batch, n_in, steps], 1.0);

    let mut lstm = LstmConfig::new(n_in, hidden)
        .with_tbptt_backward_length(kept)
        .init::<Backend>()
        .unwrap();
    lstm.forward(input, &params, true).unwrap();
    let epsilon = Tensor::<Backend, 3>::ones([batch, hidden, steps], &device);
    let grads = lstm.backward(epsilon, &params).unwrap();

    let early = values(grads.input.clone().narrow(2, 0, steps - kept));
    assert!(early.iter().all(|v| *v == 0.0));
    let late = values(grads.input.narrow(2, steps - kept, kept));
    assert!(late.iter().any(|v| *v != 0.0));
}

#[test]
fn test_backward_consumes_cache() {
    let device = Default::default();
    let mut rng = StdRng::seed_from_u64(1);
    let params = random_params(&mut rng, 2, 3);
    let mut lstm = LstmConfig::new(2, 3).init::<Backend>().unwrap();

    lstm.forward(random_tensor(&mut rng, [1, 2, 4], 1.0), &params, true).unwrap();
    let epsilon = Tensor::<Backend, 3>::ones([1, 3, 4], &device);
    lstm.backward(epsilon.clone(), &params).unwrap();

    assert_eq!(
        lstm.backward(epsilon, &params).unwrap_err(),
        LstmError::NoCachedForwardPass
    );
}
