//! Finite-difference checks of the backward pass
//!
//! The loss is `sum(output * r)` for a fixed random `r`, so the gradient
//! flowing into the output is exactly `r`.

use burn::backend::NdArray;
use burn::tensor::Tensor;
use graves_lstm::prelude::*;
use graves_lstm::rnn::{backward_pass, forward_pass};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

type Backend = NdArray<f64>;

const STEP: f64 = 1e-6;
const TOLERANCE: f64 = 1e-5;

struct Problem {
    cell: GravesLstmCell,
    params: LstmParams<Backend>,
    input: Tensor<Backend, 3>,
    initial: LstmState<Backend>,
    weights: Tensor<Backend, 3>,
}

fn random_values(rng: &mut StdRng, numel: usize, scale: f64) -> Vec<f64> {
    (0..numel).map(|_| rng.gen_range(-scale..scale)).collect()
}

fn tensor<const D: usize>(values: &[f64], shape: [usize; D]) -> Tensor<Backend, D> {
    let device = Default::default();
    Tensor::<Backend, 1>::from_floats(values, &device).reshape(shape)
}

fn random_tensor<const D: usize>(rng: &mut StdRng, shape: [usize; D], scale: f64) -> Tensor<Backend, D> {
    let numel = shape.iter().product();
    tensor(&random_values(rng, numel, scale), shape)
}

fn values<const D: usize>(t: Tensor<Backend, D>) -> Vec<f64> {
    t.into_data().to_vec::<f64>().unwrap()
}

fn problem(seed: u64, cell: GravesLstmCell) -> Problem {
    let mut rng = StdRng::seed_from_u64(seed);
    let (n_in, hidden, batch, steps) = (2, 3, 2, 4);

    let params = LstmParams::new(
        random_tensor(&mut rng, ParamKind::InputWeights.shape(n_in, hidden), 0.6),
        random_tensor(&mut rng, ParamKind::RecurrentWeights.shape(n_in, hidden), 0.6),
        random_tensor(&mut rng, ParamKind::Bias.shape(n_in, hidden), 0.6),
    )
    .unwrap();
    let input = random_tensor(&mut rng, [batch, n_in, steps], 1.0);
    let initial = LstmState::new(
        random_tensor(&mut rng, [batch, hidden], 0.8),
        random_tensor(&mut rng, [batch, hidden], 0.8),
    );
    let weights = random_tensor(&mut rng, [batch, hidden, steps], 1.0);

    Problem {
        cell,
        params,
        input,
        initial,
        weights,
    }
}

fn loss(
    p: &Problem,
    params: &LstmParams<Backend>,
    input: Tensor<Backend, 3>,
    initial: LstmState<Backend>,
) -> f64 {
    let out = forward_pass(&p.cell, input, params, Some(initial), false).unwrap();
    (out.output * p.weights.clone()).sum().into_scalar()
}

fn analytic(p: &Problem) -> LstmGradients<Backend> {
    let out = forward_pass(&p.cell, p.input.clone(), &p.params, Some(p.initial.clone()), true).unwrap();
    let cache = out.cache.unwrap();
    backward_pass(&p.cell, &cache, p.weights.clone(), &p.params, None).unwrap()
}

/// Central difference of `f` around every element of `base`.
fn numeric<const D: usize>(base: &Tensor<Backend, D>, f: impl Fn(Tensor<Backend, D>) -> f64) -> Vec<f64> {
    let shape = base.dims();
    let original = values(base.clone());
    (0..original.len())
        .map(|i| {
            let mut plus = original.clone();
            plus[i] += STEP;
            let mut minus = original.clone();
            minus[i] -= STEP;
            (f(tensor(&plus, shape)) - f(tensor(&minus, shape))) / (2.0 * STEP)
        })
        .collect()
}

fn assert_close(what: &str, analytic: &[f64], numeric: &[f64]) {
    assert_eq!(analytic.len(), numeric.len(), "{}: length", what);
    for (i, (a, n)) in analytic.iter().zip(numeric.iter()).enumerate() {
        let scale = a.abs().max(n.abs()).max(1.0);
        assert!(
            (a - n).abs() / scale < TOLERANCE,
            "{}[{}]: analytic {} vs numeric {}",
            what,
            i,
            a,
            n
        );
    }
}

fn check_params(p: &Problem) {
    let grads = analytic(p);

    for kind in ParamKind::ALL {
        let numeric = numeric(p.params.get(kind), |perturbed| {
            let mut params = p.params.clone();
            params.set(kind, perturbed).unwrap();
            loss(p, &params, p.input.clone(), p.initial.clone())
        });
        assert_close(kind.key(), &values(grads.get(kind).clone()), &numeric);
    }
}

#[test]
fn test_parameter_gradients() {
    check_params(&problem(42, GravesLstmCell::default()));
}

#[test]
fn test_parameter_gradients_softsign() {
    check_params(&problem(
        43,
        GravesLstmCell::new(Activation::Sigmoid, Activation::Softsign),
    ));
}

#[test]
fn test_peephole_columns() {
    let p = problem(7, GravesLstmCell::default());
    let grads = analytic(&p);
    let hidden = p.params.hidden_size();

    let numeric = numeric(p.params.recurrent_weights(), |perturbed| {
        let mut params = p.params.clone();
        params.set(ParamKind::RecurrentWeights, perturbed).unwrap();
        loss(&p, &params, p.input.clone(), p.initial.clone())
    });
    let analytic = values(grads.recurrent_weights);
    let width = 4 * hidden + 3;

    for gate in [Gate::Forget, Gate::Output, Gate::Input] {
        let column = gate.peephole_column(hidden).unwrap();
        let a: Vec<f64> = (0..hidden).map(|row| analytic[row * width + column]).collect();
        let n: Vec<f64> = (0..hidden).map(|row| numeric[row * width + column]).collect();
        assert!(n.iter().any(|v| v.abs() > 1e-6), "{:?} peephole has no effect", gate);
        assert_close(&format!("{:?} peephole", gate), &a, &n);
    }
}

#[test]
fn test_input_gradient() {
    let p = problem(11, GravesLstmCell::default());
    let grads = analytic(&p);

    let numeric = numeric(&p.input, |perturbed| {
        loss(&p, &p.params, perturbed, p.initial.clone())
    });
    assert_close("dX", &values(grads.input), &numeric);
}

#[test]
fn test_initial_state_gradient() {
    let p = problem(13, GravesLstmCell::default());
    let grads = analytic(&p);

    let numeric_hidden = numeric(&p.initial.hidden, |perturbed| {
        loss(&p, &p.params, p.input.clone(), LstmState::new(perturbed, p.initial.cell.clone()))
    });
    let numeric_cell = numeric(&p.initial.cell, |perturbed| {
        loss(&p, &p.params, p.input.clone(), LstmState::new(p.initial.hidden.clone(), perturbed))
    });

    assert_close("dh0", &values(grads.initial_state.hidden), &numeric_hidden);
    assert_close("dc0", &values(grads.initial_state.cell), &numeric_cell);
}
