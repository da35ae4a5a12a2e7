//! Error taxonomy for the characteristics engine
//!
//! Fatal input/consistency errors abort the current top-level operation.
//! Per-point numeric issues (a mesh point that fails to converge, an invalid
//! interpolation span) are handled locally by the caller and surface as
//! warnings plus NaN entries, never as a process abort.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum MachineError {
    /// Malformed or unsupported input detected before any expensive work.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// Parameter sets being interpolated do not share a current grid.
    #[error("current range conflict: parameter sets do not share the same current grid")]
    CurrentRangeConflict,

    /// Loss reference speeds differ between parameter sets being interpolated.
    #[error("losses speed conflict: loss reference speeds differ between parameter sets")]
    LossesSpeedConflict,

    /// Parameter set matches none of the known machine shapes.
    #[error("unsupported machine type: parameter set matches no known machine shape")]
    UnsupportedMachineType,

    /// An iterative solve exceeded its iteration bound.
    #[error("no convergence while solving {context}")]
    NonConvergence { context: &'static str },

    /// The external field solver reported an unrecoverable run failure.
    #[error("field solver failure: {0}")]
    Solver(String),
}

pub type Result<T> = std::result::Result<T, MachineError>;
