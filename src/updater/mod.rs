//! Gradient updaters.
//!
//! Updaters are two-phase: an [`UpdaterConfig`] is bound once to a parameter
//! shape (and optionally an existing state view), which yields a
//! [`BoundUpdater`] that transforms raw gradients into parameter updates.

pub mod adam;

use std::collections::BTreeMap;

use burn::tensor::backend::Backend;
use burn::tensor::Tensor;

use crate::error::{ensure_shape, LstmError, LstmResult};
use crate::params::{LstmGradients, ParamKind};

pub use adam::{Adam, AdamUpdater, AmsGrad, AmsGradUpdater, Moments, Padam};

/// An updater bound to the state of one parameter tensor.
pub trait BoundUpdater<B: Backend> {
    /// Shape of the parameter this updater was initialized for.
    fn shape(&self) -> [usize; 2];

    /// Updates the internal state and returns the transformed gradient.
    ///
    /// `iteration` is zero-based.
    fn apply(&mut self, gradient: Tensor<B, 2>, iteration: usize, epoch: usize) -> LstmResult<Tensor<B, 2>>;
}

/// Hyper-parameters of an updater, not yet bound to a parameter.
pub trait UpdaterConfig {
    type Updater<B: Backend>: BoundUpdater<B>;

    /// Number of state scalars needed for a parameter of `num_params` scalars.
    fn state_size(&self, num_params: usize) -> usize;

    /// Binds to a parameter of `shape`, reading the initial state from `state_view`.
    fn initialize_from_view<B: Backend>(
        &self,
        state_view: Tensor<B, 1>,
        shape: [usize; 2],
    ) -> LstmResult<Self::Updater<B>>;

    /// Binds to a parameter of `shape` with zeroed state.
    fn initialize<B: Backend>(&self, shape: [usize; 2], device: &B::Device) -> LstmResult<Self::Updater<B>> {
        let view = Tensor::zeros([self.state_size(shape[0] * shape[1])], device);
        self.initialize_from_view(view, shape)
    }
}

/// One bound updater per [`ParamKind`] of a layer.
pub struct ParamUpdaters<B: Backend, U: UpdaterConfig> {
    config: U,
    updaters: BTreeMap<ParamKind, U::Updater<B>>,
}

impl<B: Backend, U: UpdaterConfig> ParamUpdaters<B, U> {
    /// Creates an empty set; every kind must be initialized before use.
    pub fn new(config: U) -> Self {
        Self {
            config,
            updaters: BTreeMap::new(),
        }
    }

    /// Creates a set with every kind bound to zeroed state.
    pub fn for_layer(config: U, input_size: usize, hidden_size: usize, device: &B::Device) -> LstmResult<Self> {
        let mut updaters = Self::new(config);
        for kind in ParamKind::ALL {
            updaters.initialize(kind, kind.shape(input_size, hidden_size), device)?;
        }
        Ok(updaters)
    }

    pub fn config(&self) -> &U {
        &self.config
    }

    pub fn initialize(&mut self, kind: ParamKind, shape: [usize; 2], device: &B::Device) -> LstmResult<()> {
        let updater = self.config.initialize(shape, device)?;
        self.updaters.insert(kind, updater);
        Ok(())
    }

    pub fn initialize_from_view(&mut self, kind: ParamKind, state_view: Tensor<B, 1>, shape: [usize; 2]) -> LstmResult<()> {
        let updater = self.config.initialize_from_view(state_view, shape)?;
        self.updaters.insert(kind, updater);
        Ok(())
    }

    pub fn is_initialized(&self, kind: ParamKind) -> bool {
        self.updaters.contains_key(&kind)
    }

    pub fn apply(
        &mut self,
        kind: ParamKind,
        gradient: Tensor<B, 2>,
        iteration: usize,
        epoch: usize,
    ) -> LstmResult<Tensor<B, 2>> {
        let updater = self
            .updaters
            .get_mut(&kind)
            .ok_or_else(|| LstmError::NotInitialized(kind.key().to_string()))?;
        updater.apply(gradient, iteration, epoch)
    }

    /// Transforms the three parameter gradients in place.
    ///
    /// Nothing is updated unless every kind has been initialized and every
    /// gradient has the bound shape.
    pub fn apply_all(&mut self, gradients: &mut LstmGradients<B>, iteration: usize, epoch: usize) -> LstmResult<()> {
        for kind in ParamKind::ALL {
            let updater = self
                .updaters
                .get(&kind)
                .ok_or_else(|| LstmError::NotInitialized(kind.key().to_string()))?;
            ensure_shape("gradient", &updater.shape(), &gradients.get(kind).dims())?;
        }
        for kind in ParamKind::ALL {
            let update = self.apply(kind, gradients.get(kind).clone(), iteration, epoch)?;
            gradients.replace(kind, update);
        }
        Ok(())
    }
}
