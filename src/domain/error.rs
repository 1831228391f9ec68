// ============================================================
// Layer 3 — Model Errors
// ============================================================
// Typed failures of the model core. The application layer
// wraps these in anyhow with extra context; tests match on
// the variants directly.

use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum ModelError {
    /// A configuration value is invalid (checked at construction)
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// Input tensor shape disagrees with the configured shape
    #[error("shape mismatch in {what}: expected {expected}, got {actual}")]
    ShapeMismatch {
        what:     &'static str,
        expected: usize,
        actual:   usize,
    },

    /// Empty batch or zero-length sequence
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// Loss became NaN or infinite
    #[error("training diverged at epoch {epoch}, step {step}: loss = {loss}")]
    Divergence {
        epoch: usize,
        step:  usize,
        loss:  f64,
    },

    /// Snapshot could not be encoded or decoded
    #[error("snapshot error: {0}")]
    Snapshot(String),
}

pub type ModelResult<T> = std::result::Result<T, ModelError>;
