//! Parameter-set schema ("eecpars")
//!
//! A parameter set is the result of field-solver characterization runs: dq
//! flux linkages and loss components tabulated over a current grid, possibly
//! at several temperatures or excitation currents. Shapes are validated once
//! at construction instead of ad hoc at each use site.

use machcore::error::{MachineError, Result};
use ndarray::Array2;
use serde::{Deserialize, Serialize};

/// Current grid of a flux/loss table, in one of the two equivalent
/// representations produced by parameter identification.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum CurrentGrid {
    /// Rows indexed by current angle beta in degrees, columns by current
    /// amplitude i1 in A (rms).
    BetaI1 { beta: Vec<f64>, i1: Vec<f64> },
    /// Rows indexed by direct-axis current id, columns by quadrature-axis
    /// current iq, both in A.
    IdIq { id: Vec<f64>, iq: Vec<f64> },
}

impl CurrentGrid {
    pub fn shape(&self) -> (usize, usize) {
        match self {
            CurrentGrid::BetaI1 { beta, i1 } => (beta.len(), i1.len()),
            CurrentGrid::IdIq { id, iq } => (id.len(), iq.len()),
        }
    }

    /// Row and column axis values, representation-agnostic.
    pub fn axes(&self) -> (&[f64], &[f64]) {
        match self {
            CurrentGrid::BetaI1 { beta, i1 } => (beta, i1),
            CurrentGrid::IdIq { id, iq } => (id, iq),
        }
    }

    /// Tolerance-based equality of two grids (same representation, same
    /// axis values).
    pub fn approx_eq(&self, other: &CurrentGrid, tol: f64) -> bool {
        let same_kind = matches!(
            (self, other),
            (CurrentGrid::BetaI1 { .. }, CurrentGrid::BetaI1 { .. })
                | (CurrentGrid::IdIq { .. }, CurrentGrid::IdIq { .. })
        );
        if !same_kind || self.shape() != other.shape() {
            return false;
        }
        let (r0, c0) = self.axes();
        let (r1, c1) = other.axes();
        let close = |a: &[f64], b: &[f64]| {
            a.iter()
                .zip(b)
                .all(|(&x, &y)| (x - y).abs() <= tol * x.abs().max(y.abs()).max(1.0))
        };
        close(r0, r1) && close(c0, c1)
    }
}

/// Loss components tabulated over the current grid, all referenced to one
/// characterization speed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LossTables {
    pub styoke_hyst: Array2<f64>,
    pub styoke_eddy: Array2<f64>,
    pub stteeth_hyst: Array2<f64>,
    pub stteeth_eddy: Array2<f64>,
    pub rotor_hyst: Array2<f64>,
    pub rotor_eddy: Array2<f64>,
    pub magnet: Array2<f64>,
    /// Reference speed of the loss characterization in rev/s.
    pub speed: f64,
    /// Hysteresis frequency exponent.
    pub hf: f64,
    /// Eddy-current frequency exponent.
    pub ef: f64,
}

impl LossTables {
    pub fn components(&self) -> [&Array2<f64>; 7] {
        [
            &self.styoke_hyst,
            &self.styoke_eddy,
            &self.stteeth_hyst,
            &self.stteeth_eddy,
            &self.rotor_hyst,
            &self.rotor_eddy,
            &self.magnet,
        ]
    }

    fn validate(&self, shape: (usize, usize)) -> Result<()> {
        for table in self.components() {
            if table.dim() != shape {
                return Err(MachineError::InvalidInput(format!(
                    "loss table shape {:?} does not match current grid {:?}",
                    table.dim(),
                    shape
                )));
            }
        }
        Ok(())
    }
}

/// One dq flux-linkage table at a single temperature and/or excitation
/// current.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DqTable {
    pub temperature: Option<f64>,
    /// Excitation current in A for externally excited machines.
    pub ex_current: Option<f64>,
    pub grid: CurrentGrid,
    pub psid: Array2<f64>,
    pub psiq: Array2<f64>,
    pub losses: Option<LossTables>,
}

impl DqTable {
    pub fn new(
        grid: CurrentGrid,
        psid: Array2<f64>,
        psiq: Array2<f64>,
        losses: Option<LossTables>,
    ) -> Result<Self> {
        let table = DqTable {
            temperature: None,
            ex_current: None,
            grid,
            psid,
            psiq,
            losses,
        };
        table.validate()?;
        Ok(table)
    }

    pub fn with_temperature(mut self, temperature: f64) -> Self {
        self.temperature = Some(temperature);
        self
    }

    pub fn with_ex_current(mut self, ex_current: f64) -> Self {
        self.ex_current = Some(ex_current);
        self
    }

    pub fn validate(&self) -> Result<()> {
        let shape = self.grid.shape();
        if shape.0 < 2 || shape.1 < 2 {
            return Err(MachineError::InvalidInput(format!(
                "current grid needs at least 2 samples per axis, got {shape:?}"
            )));
        }
        if self.psid.dim() != shape || self.psiq.dim() != shape {
            return Err(MachineError::InvalidInput(format!(
                "flux table shapes {:?}/{:?} do not match current grid {:?}",
                self.psid.dim(),
                self.psiq.dim(),
                shape
            )));
        }
        if let Some(losses) = &self.losses {
            losses.validate(shape)?;
        }
        Ok(())
    }
}

/// Equivalent-circuit parameters of an induction machine (inverse-gamma
/// model, rotor quantities referred to the stator).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InductionParams {
    /// Rotor resistance in Ohm at 20 C.
    pub r2: f64,
    /// Stator leakage inductance in H.
    pub lsigma1: f64,
    /// Rotor leakage inductance in H.
    pub lsigma2: f64,
    /// Main (magnetizing) inductance in H.
    pub lh: f64,
    /// Rated magnetizing flux in Vs (rms).
    pub psiref: f64,
    /// Iron-loss resistance in Ohm.
    pub rfe: f64,
}

/// Complete machine parameter bundle derived from characterization runs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EecParams {
    /// Number of phases.
    pub m: usize,
    /// Pole pairs.
    pub p: u32,
    /// Stator resistance in Ohm at 20 C.
    pub r1: f64,
    /// Stator leakage inductance in H.
    pub ls1: f64,
    /// Skin-effect conductor height parameter.
    pub zeta1: f64,
    /// End-winding to slot length ratio for the skin-effect correction.
    pub gam: f64,
    /// Conductor layers for the skin-effect correction.
    pub nh: u32,
    /// Excitation winding resistance in Ohm (externally excited machines).
    pub rex: Option<f64>,
    /// Flux/loss tables; empty for induction machines.
    pub ldq: Vec<DqTable>,
    /// Equivalent-circuit parameters; present only for induction machines.
    pub im: Option<InductionParams>,
    /// Bearing friction coefficient.
    pub kfric_b: f64,
    /// Rotor mass in kg.
    pub rotor_mass: f64,
}

impl EecParams {
    /// Validate the bundle shape once, at the classification boundary.
    pub fn validate(&self) -> Result<()> {
        if self.m == 0 || self.p == 0 {
            return Err(MachineError::InvalidInput(
                "phase count and pole pairs must be non-zero".into(),
            ));
        }
        for table in &self.ldq {
            table.validate()?;
        }
        if let Some(first) = self.ldq.first() {
            let shape = first.grid.shape();
            if self.ldq.iter().any(|t| t.grid.shape() != shape) {
                return Err(MachineError::InvalidInput(
                    "flux tables must share the same current-grid shape across variants".into(),
                ));
            }
            let with_ex = self.ldq.iter().filter(|t| t.ex_current.is_some()).count();
            if with_ex != 0 && with_ex != self.ldq.len() {
                return Err(MachineError::InvalidInput(
                    "excitation-current axis must be present on all tables or none".into(),
                ));
            }
        }
        Ok(())
    }
}
