//! Shared foundation for the machine characteristics engine
//!
//! This crate provides:
//! - The error taxonomy used across all crates
//! - A diagnostics sink for recoverable warning paths
//! - Coordinate and current transforms (Park, beta/i1, skin effect)
//! - Harmonic (fundamental) extraction from sampled waveforms
//! - The field-solver abstraction and its input/output types

pub mod diag;
pub mod error;
pub mod harmonics;
pub mod numeric;
pub mod solver;
pub mod transforms;

pub use diag::{CollectingDiagnostics, Diagnostics, LogDiagnostics};
pub use error::{MachineError, Result};
pub use solver::{
    ExcitationMode, FieldSolver, MachineGeometry, OperatingCondition, SliceLosses, SliceSolution,
    SliceSpec, WindingSpec,
};
