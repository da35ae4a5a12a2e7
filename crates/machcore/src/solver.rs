//! Field-solver abstraction
//!
//! The core never runs the finite-element solver itself. It describes one
//! radial slice of the machine plus an operating condition and consumes the
//! per-step force/flux/loss arrays the solver returns. Dispatch (single
//! process, multiprocess, cluster) is entirely the collaborator's concern;
//! from here it is a blocking call per (slice, condition) pair.

use crate::error::Result;
use serde::{Deserialize, Serialize};

/// Stator winding description used for resistance and copper-loss
/// computation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WindingSpec {
    /// Number of phases m.
    pub num_phases: usize,
    /// Winding layers per slot.
    pub num_layers: u32,
    /// Wires per coil side.
    pub num_wires: u32,
    /// Parallel coil groups.
    pub num_par_wdgs: u32,
    /// Slot width in m.
    pub slot_width: f64,
    /// Slot height in m.
    pub slot_height: f64,
    /// Copper fill factor of the slot.
    pub cufilfact: f64,
    /// Wire conductivity in 1/(Ohm m).
    pub conductivity: f64,
}

impl Default for WindingSpec {
    fn default() -> Self {
        WindingSpec {
            num_phases: 3,
            num_layers: 2,
            num_wires: 10,
            num_par_wdgs: 1,
            slot_width: 8e-3,
            slot_height: 20e-3,
            cufilfact: 0.4,
            conductivity: 56e6,
        }
    }
}

/// Geometry of an axial-flux machine as seen by the aggregator.
///
/// `afm_type` is the raw topology tag from the input deck; it is validated
/// against the recognized tags before any solver call is issued.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MachineGeometry {
    pub afm_type: String,
    /// Outer diameter in m.
    pub outer_diam: f64,
    /// Inner diameter in m.
    pub inner_diam: f64,
    /// Number of poles.
    pub poles: u32,
    /// Airgap in m.
    pub airgap: f64,
    /// Total number of stator slots.
    pub num_slots: u32,
    /// Number of slots in the simulated segment.
    pub num_slots_sim: u32,
    pub winding: WindingSpec,
}

/// Whether a run characterizes flux alignment (zero current) or load
/// behavior.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ExcitationMode {
    NoLoad,
    Load,
}

/// One operating condition handed to the solver.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OperatingCondition {
    pub mode: ExcitationMode,
    /// Shaft speed in rev/s.
    pub speed: f64,
    /// Phase current amplitude in A (zero for no-load runs).
    pub current: f64,
    /// Current angle in degrees.
    pub beta_deg: f64,
    /// Magnet temperature in degrees C.
    pub magnet_temp: f64,
    /// Per-phase excitation angles in degrees. Left unset by the caller and
    /// filled in by the aggregator from the no-load pass; this is the sole
    /// mutation of input state the core performs.
    pub current_angles: Option<Vec<f64>>,
}

impl OperatingCondition {
    pub fn no_load(speed: f64, magnet_temp: f64) -> Self {
        OperatingCondition {
            mode: ExcitationMode::NoLoad,
            speed,
            current: 0.0,
            beta_deg: 0.0,
            magnet_temp,
            current_angles: None,
        }
    }
}

/// One radial slice of the axial-flux machine, simulated as an independent
/// 2-D linear machine.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct SliceSpec {
    /// Pole width at the slice diameter in m.
    pub pole_width: f64,
    /// Radial arm length assigned to the slice in m.
    pub arm_length: f64,
    /// Linear speed of the slice in m/s.
    pub linear_speed: f64,
}

/// Per-component loss breakdown of one slice run.
///
/// `winding` is absent in no-load runs, which have no copper losses.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SliceLosses {
    pub stator_teeth: f64,
    pub stator_yoke: f64,
    pub rotor: f64,
    pub magnet: f64,
    pub winding: Option<f64>,
}

/// Raw per-step solver output for one slice.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SliceSolution {
    /// Rotor displacement per step in m, spanning one electrical period
    /// (two pole widths).
    pub displ: Vec<f64>,
    /// Tangential force per step in N.
    pub force: Vec<f64>,
    /// Induced voltage per phase per step in V.
    pub voltage: Vec<Vec<f64>>,
    /// Phase current waveform per step in A.
    pub current: Vec<Vec<f64>>,
    /// Phase angles of the current fundamentals in degrees.
    pub current_angles: Vec<f64>,
    pub losses: SliceLosses,
    /// Fundamental electrical frequency in Hz.
    pub freq: f64,
    /// Load angle reported by the solver in degrees.
    pub beta_deg: f64,
}

/// The external solver contract: one blocking evaluation per distinct
/// (slice, operating condition) pair. Results are not cached here.
pub trait FieldSolver {
    fn solve(
        &mut self,
        geometry: &MachineGeometry,
        slice: &SliceSpec,
        condition: &OperatingCondition,
    ) -> Result<SliceSolution>;
}
