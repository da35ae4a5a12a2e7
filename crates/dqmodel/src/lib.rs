//! Equivalent-circuit machine models from solver-derived parameter sets
//!
//! This crate provides:
//! - The validated "eecpars" schema (dq flux-linkage and loss tables)
//! - Temperature / excitation-current interpolation of parameter sets
//! - Per-unit conversion
//! - The three machine model variants (PM/reluctance, externally excited
//!   synchronous, induction) behind a single classification entry point

pub mod im;
pub mod interp;
pub mod machine;
pub mod params;
pub mod per_unit;
pub mod pm;
pub mod sm;

pub use im::{ImOperatingPoint, InductionMachine};
pub use interp::{interpolate_tables, InterpKey};
pub use machine::{create_machine, CharCurve, MachineModel};
pub use params::{CurrentGrid, DqTable, EecParams, InductionParams, LossTables};
pub use per_unit::{per_unit_eec, per_unit_table, PerUnitBase};
pub use pm::PmRelMachine;
pub use sm::SynchronousMachine;
