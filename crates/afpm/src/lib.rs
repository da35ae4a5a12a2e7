//! Axial-flux machine aggregation
//!
//! Models a 3-D axial-flux machine as independent radial slices handed to
//! an external field solver, then recombines the per-slice results into
//! machine-level torque, EMF, flux linkages and losses.

pub mod aggregate;
pub mod topology;

pub use aggregate::{winding_resistance, AfpmAggregator, AggregatedLosses, AggregatedResult};
pub use topology::{arm_lengths, pole_widths, AfmType};
