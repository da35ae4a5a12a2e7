//! Speed-torque / efficiency-map generation
//!
//! Builds a (speed, torque) operating mesh from a machine model's driving
//! and braking envelopes and evaluates currents, voltage, losses and
//! efficiency at every mesh point.

pub mod map;
pub mod mesh;

pub use map::{efficiency_losses_map, efficiency_losses_map_from_eec, EfficiencyMap};
pub use mesh::{generate_mesh, MeshSettings};

#[cfg(test)]
pub(crate) mod testutil;
