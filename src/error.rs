//! Error type shared by the engine, the parameter layout and the updaters.

use thiserror::Error;

pub type LstmResult<T> = Result<T, LstmError>;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LstmError {
    #[error("Shape mismatch for {what}: expected {expected:?}, got {got:?}")]
    ShapeMismatch {
        what: &'static str,
        expected: Vec<usize>,
        got: Vec<usize>,
    },

    #[error("Unknown activation function: {0}")]
    UnknownActivation(String),

    #[error("Backward pass requested without a cached forward pass")]
    NoCachedForwardPass,

    #[error("Updater has not been initialized for {0}")]
    NotInitialized(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

impl LstmError {
    pub(crate) fn shape(what: &'static str, expected: &[usize], got: &[usize]) -> Self {
        LstmError::ShapeMismatch {
            what,
            expected: expected.to_vec(),
            got: got.to_vec(),
        }
    }
}

/// Fails with [`LstmError::ShapeMismatch`] unless `got == expected`.
pub(crate) fn ensure_shape(what: &'static str, expected: &[usize], got: &[usize]) -> LstmResult<()> {
    if expected == got {
        Ok(())
    } else {
        Err(LstmError::shape(what, expected, got))
    }
}
