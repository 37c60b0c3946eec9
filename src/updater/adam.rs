//! Adam-family updaters: Adam, AMSGrad and Padam.

use burn::tensor::backend::Backend;
use burn::tensor::Tensor;
use serde::{Deserialize, Serialize};

use super::{BoundUpdater, UpdaterConfig};
use crate::error::{ensure_shape, LstmResult};

pub const DEFAULT_LEARNING_RATE: f64 = 1e-3;
pub const DEFAULT_BETA1: f64 = 0.9;
pub const DEFAULT_BETA2: f64 = 0.999;
pub const DEFAULT_EPSILON: f64 = 1e-8;
pub const DEFAULT_PADAM_PARTIAL: f64 = 1.0 / 8.0;

/// Hyper-parameters shared by the whole family.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Moments {
    pub learning_rate: f64,
    pub beta1: f64,
    pub beta2: f64,
    pub epsilon: f64,
}

impl Default for Moments {
    fn default() -> Self {
        Self {
            learning_rate: DEFAULT_LEARNING_RATE,
            beta1: DEFAULT_BETA1,
            beta2: DEFAULT_BETA2,
            epsilon: DEFAULT_EPSILON,
        }
    }
}

impl Moments {
    /// Bias-corrected step size for a zero-based iteration.
    ///
    /// Falls back to `epsilon` when the correction degenerates.
    fn step_size(&self, iteration: usize) -> f64 {
        let t = iteration as i32 + 1;
        let beta1_t = self.beta1.powi(t);
        let beta2_t = self.beta2.powi(t);
        let alpha = self.learning_rate * (1.0 - beta2_t).sqrt() / (1.0 - beta1_t);
        if alpha.is_nan() || alpha == 0.0 {
            self.epsilon
        } else {
            alpha
        }
    }

    /// `m = β1 m + (1 - β1) g`, `v = β2 v + (1 - β2) g²`
    fn accumulate<B: Backend>(
        &self,
        m: Tensor<B, 2>,
        v: Tensor<B, 2>,
        gradient: Tensor<B, 2>,
    ) -> (Tensor<B, 2>, Tensor<B, 2>) {
        let m = m.mul_scalar(self.beta1) + gradient.clone().mul_scalar(1.0 - self.beta1);
        let v = v.mul_scalar(self.beta2) + (gradient.clone() * gradient).mul_scalar(1.0 - self.beta2);
        (m, v)
    }
}

/// Splits a flat state view into `N` consecutive tensors of `shape`.
fn split_view<B: Backend, const N: usize>(
    view: Tensor<B, 1>,
    shape: [usize; 2],
) -> LstmResult<[Tensor<B, 2>; N]> {
    let numel = shape[0] * shape[1];
    ensure_shape("updater state view", &[N * numel], &view.dims())?;
    Ok(std::array::from_fn(|p| {
        view.clone().narrow(0, p * numel, numel).reshape(shape)
    }))
}

/// Adam (Kingma & Ba, 2014).
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Adam {
    pub moments: Moments,
}

impl Adam {
    pub fn new(learning_rate: f64) -> Self {
        Self {
            moments: Moments {
                learning_rate,
                ..Moments::default()
            },
        }
    }

    pub fn with_betas(mut self, beta1: f64, beta2: f64) -> Self {
        self.moments.beta1 = beta1;
        self.moments.beta2 = beta2;
        self
    }

    pub fn with_epsilon(mut self, epsilon: f64) -> Self {
        self.moments.epsilon = epsilon;
        self
    }
}

/// Bound Adam state for one parameter tensor.
#[derive(Debug, Clone)]
pub struct AdamUpdater<B: Backend> {
    moments: Moments,
    shape: [usize; 2],
    m: Tensor<B, 2>,
    v: Tensor<B, 2>,
}

impl UpdaterConfig for Adam {
    type Updater<B: Backend> = AdamUpdater<B>;

    fn state_size(&self, num_params: usize) -> usize {
        2 * num_params
    }

    fn initialize_from_view<B: Backend>(
        &self,
        state_view: Tensor<B, 1>,
        shape: [usize; 2],
    ) -> LstmResult<AdamUpdater<B>> {
        let [m, v] = split_view::<B, 2>(state_view, shape)?;
        Ok(AdamUpdater {
            moments: self.moments,
            shape,
            m,
            v,
        })
    }
}

impl<B: Backend> BoundUpdater<B> for AdamUpdater<B> {
    fn shape(&self) -> [usize; 2] {
        self.shape
    }

    fn apply(&mut self, gradient: Tensor<B, 2>, iteration: usize, _epoch: usize) -> LstmResult<Tensor<B, 2>> {
        ensure_shape("gradient", &self.shape, &gradient.dims())?;

        let (m, v) = self.moments.accumulate(self.m.clone(), self.v.clone(), gradient);
        self.m = m;
        self.v = v;

        let alpha = self.moments.step_size(iteration);
        let denom = self.v.clone().sqrt().add_scalar(self.moments.epsilon);
        Ok((self.m.clone() / denom).mul_scalar(alpha))
    }
}

/// AMSGrad (Reddi et al., 2018): Adam with a non-decreasing second moment.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct AmsGrad {
    pub moments: Moments,
}

impl AmsGrad {
    pub fn new(learning_rate: f64) -> Self {
        Self {
            moments: Moments {
                learning_rate,
                ..Moments::default()
            },
        }
    }

    pub fn with_betas(mut self, beta1: f64, beta2: f64) -> Self {
        self.moments.beta1 = beta1;
        self.moments.beta2 = beta2;
        self
    }

    pub fn with_epsilon(mut self, epsilon: f64) -> Self {
        self.moments.epsilon = epsilon;
        self
    }
}

/// Padam (Chen & Gu, 2018): AMSGrad with a partially adaptive exponent.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Padam {
    pub moments: Moments,
    /// Exponent applied to the second moment, expected in `(0, 1/2]`.
    pub partial: f64,
}

impl Default for Padam {
    fn default() -> Self {
        Self {
            moments: Moments::default(),
            partial: DEFAULT_PADAM_PARTIAL,
        }
    }
}

impl Padam {
    pub fn new(learning_rate: f64, partial: f64) -> Self {
        Self {
            moments: Moments {
                learning_rate,
                ..Moments::default()
            },
            partial,
        }
    }

    pub fn with_betas(mut self, beta1: f64, beta2: f64) -> Self {
        self.moments.beta1 = beta1;
        self.moments.beta2 = beta2;
        self
    }

    pub fn with_epsilon(mut self, epsilon: f64) -> Self {
        self.moments.epsilon = epsilon;
        self
    }
}

/// Bound AMSGrad / Padam state for one parameter tensor.
#[derive(Debug, Clone)]
pub struct AmsGradUpdater<B: Backend> {
    moments: Moments,
    /// `None` for AMSGrad (square root), the Padam exponent otherwise.
    partial: Option<f64>,
    shape: [usize; 2],
    m: Tensor<B, 2>,
    v: Tensor<B, 2>,
    v_hat: Tensor<B, 2>,
}

fn initialize_amsgrad<B: Backend>(
    moments: Moments,
    partial: Option<f64>,
    state_view: Tensor<B, 1>,
    shape: [usize; 2],
) -> LstmResult<AmsGradUpdater<B>> {
    let [m, v, v_hat] = split_view::<B, 3>(state_view, shape)?;
    Ok(AmsGradUpdater {
        moments,
        partial,
        shape,
        m,
        v,
        v_hat,
    })
}

impl UpdaterConfig for AmsGrad {
    type Updater<B: Backend> = AmsGradUpdater<B>;

    fn state_size(&self, num_params: usize) -> usize {
        3 * num_params
    }

    fn initialize_from_view<B: Backend>(
        &self,
        state_view: Tensor<B, 1>,
        shape: [usize; 2],
    ) -> LstmResult<AmsGradUpdater<B>> {
        initialize_amsgrad(self.moments, None, state_view, shape)
    }
}

impl UpdaterConfig for Padam {
    type Updater<B: Backend> = AmsGradUpdater<B>;

    fn state_size(&self, num_params: usize) -> usize {
        3 * num_params
    }

    fn initialize_from_view<B: Backend>(
        &self,
        state_view: Tensor<B, 1>,
        shape: [usize; 2],
    ) -> LstmResult<AmsGradUpdater<B>> {
        if self.partial <= 0.0 || self.partial > 0.5 {
            log::warn!(
                "Padam partial parameter {} should be within (0, 1/2] to ensure convergence",
                self.partial
            );
        }
        initialize_amsgrad(self.moments, Some(self.partial), state_view, shape)
    }
}

impl<B: Backend> BoundUpdater<B> for AmsGradUpdater<B> {
    fn shape(&self) -> [usize; 2] {
        self.shape
    }

    fn apply(&mut self, gradient: Tensor<B, 2>, iteration: usize, _epoch: usize) -> LstmResult<Tensor<B, 2>> {
        ensure_shape("gradient", &self.shape, &gradient.dims())?;

        let (m, v) = self.moments.accumulate(self.m.clone(), self.v.clone(), gradient);
        self.m = m;
        self.v = v;
        self.v_hat = self.v_hat.clone().max_pair(self.v.clone());

        let alpha = self.moments.step_size(iteration);
        let scaled = match self.partial {
            Some(p) => self.v_hat.clone().powf_scalar(p),
            None => self.v_hat.clone().sqrt(),
        };
        let denom = scaled.add_scalar(self.moments.epsilon);
        Ok((self.m.clone() / denom).mul_scalar(alpha))
    }
}
