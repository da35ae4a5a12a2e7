//! Efficiency and loss evaluation over the operating mesh
//!
//! Every mesh point is solved with the machine model's constrained current
//! solver (or the equivalent-circuit relation for induction machines). A
//! point whose solve does not converge is kept as a NaN entry instead of
//! aborting the map.

use crate::mesh::{generate_mesh, MeshSettings};
use dqmodel::{create_machine, EecParams, MachineModel};
use machcore::diag::Diagnostics;
use machcore::error::{MachineError, Result};
use machcore::transforms::beta_i1;
use serde::{Deserialize, Serialize};
use std::f64::consts::PI;

/// Flattened per-mesh-point arrays of the efficiency map.
///
/// `torque` and `pmech` are net of friction; `losses` is the total loss
/// including friction.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EfficiencyMap {
    /// Speed in rev/s.
    pub n: Vec<f64>,
    /// Net torque in Nm.
    pub torque: Vec<f64>,
    pub iq: Vec<f64>,
    pub id: Vec<f64>,
    /// Phase current in A (rms).
    pub i1: Vec<f64>,
    /// Phase voltage in V (rms).
    pub u1: Vec<f64>,
    /// Mechanical power in W.
    pub pmech: Vec<f64>,
    pub eta: Vec<f64>,
    pub plfe1: Vec<f64>,
    pub plfe2: Vec<f64>,
    pub plmag: Vec<f64>,
    pub plcu1: Vec<f64>,
    pub plcu2: Vec<f64>,
    pub plfric: Vec<f64>,
    /// Total losses in W.
    pub losses: Vec<f64>,
}

/// Electrical solution of one mesh point before the friction bookkeeping.
struct PointSolution {
    iq: f64,
    id: f64,
    i1: f64,
    u1: f64,
    plfe1: f64,
    plfe2: f64,
    plmag: f64,
    plcu1: f64,
    plcu2: f64,
}

impl PointSolution {
    fn nan() -> Self {
        PointSolution {
            iq: f64::NAN,
            id: f64::NAN,
            i1: f64::NAN,
            u1: f64::NAN,
            plfe1: f64::NAN,
            plfe2: f64::NAN,
            plmag: f64::NAN,
            plcu1: f64::NAN,
            plcu2: f64::NAN,
        }
    }
}

fn solve_point(
    machine: &MachineModel,
    n: f64,
    torque: f64,
    u1max: f64,
) -> Result<PointSolution> {
    match machine {
        MachineModel::PmRel(m) => {
            let w1 = 2.0 * PI * n * m.p as f64;
            let (iq, id) = m.iqd_torque_umax(torque, w1, u1max)?;
            let f1 = n * m.p as f64;
            Ok(PointSolution {
                iq,
                id,
                i1: beta_i1(iq, id).1,
                u1: m.u1_rms(w1, iq, id),
                plfe1: m.iqd_plfe1(iq, id, f1),
                plfe2: m.iqd_plfe2(iq, id, f1),
                plmag: m.iqd_plmag(iq, id, f1),
                plcu1: m.iqd_plcu1(iq, id, w1),
                plcu2: m.iqd_plcu2(iq, id),
            })
        }
        MachineModel::SynchronousExcited(m) => {
            let w1 = 2.0 * PI * n * m.p as f64;
            let (iq, id, iex) = m.iqd_iex_torque_umax(torque, w1, u1max)?;
            let f1 = n * m.p as f64;
            Ok(PointSolution {
                iq,
                id,
                i1: beta_i1(iq, id).1,
                u1: m.u1_rms(w1, iq, id, iex),
                plfe1: m.iqd_plfe1(iq, id, iex, f1),
                plfe2: m.iqd_plfe2(iq, id, iex, f1),
                plmag: 0.0,
                plcu1: m.iqd_plcu1(iq, id, w1),
                plcu2: m.plcu2(iex),
            })
        }
        MachineModel::Induction(m) => {
            let op = m.operating_point(u1max, torque, 2.0 * PI * n)?;
            Ok(PointSolution {
                iq: 0.0,
                id: 0.0,
                i1: op.i1.norm(),
                u1: op.u1.norm(),
                plfe1: op.plfe1,
                plfe2: 0.0,
                plmag: 0.0,
                plcu1: op.plcu1,
                plcu2: op.plcu2,
            })
        }
    }
}

/// Efficiency of one mesh point from its mechanical power and total loss.
/// A sign conflict between mechanical and total power (the zero crossing)
/// yields exactly 0.
fn efficiency(pmech: f64, ploss: f64) -> f64 {
    if !pmech.is_finite() || !ploss.is_finite() {
        return f64::NAN;
    }
    let p1 = pmech + ploss;
    if (p1 <= 0.0 && pmech >= 0.0) || (p1 >= 0.0 && pmech <= 0.0) {
        0.0
    } else if p1.abs() > pmech.abs() {
        pmech / p1
    } else {
        p1 / pmech
    }
}

/// Build the efficiency/loss map of a machine model.
///
/// `t_start` is the driving torque the envelopes are generated for, `n_max`
/// the speed bound and `u1max` the phase voltage limit (rms). The braking
/// envelope is attempted for every machine; when it cannot be generated the
/// map covers driving operation only.
pub fn efficiency_losses_map(
    machine: &MachineModel,
    u1max: f64,
    t_start: f64,
    n_max: f64,
    settings: &MeshSettings,
    diag: &dyn Diagnostics,
) -> Result<EfficiencyMap> {
    let drive = machine.characteristics(t_start.abs(), n_max, u1max)?;
    let drive_nmax = drive.n.iter().cloned().fold(f64::MIN, f64::max);
    let brake = match machine.characteristics(-t_start.abs(), drive_nmax, u1max) {
        Ok(curve) => Some(curve),
        Err(e) => {
            diag.warn(&format!("no braking envelope: {e}"));
            None
        }
    };
    let mesh = generate_mesh(&drive, brake.as_ref(), settings, diag);
    if mesh.is_empty() {
        return Err(MachineError::InvalidInput(
            "empty operating mesh, envelopes too narrow for the requested density".into(),
        ));
    }

    // friction torque from the bearing coefficient, proportional to rotor
    // mass
    let tfric = machine.kfric_b() * machine.rotor_mass() * 30e-3 / PI;

    let mut map = EfficiencyMap::default();
    for &(n, t) in &mesh {
        let point = match solve_point(machine, n, t, u1max) {
            Ok(point) => point,
            Err(MachineError::NonConvergence { context }) => {
                diag.warn(&format!(
                    "no solution at {n} 1/s, {t} Nm ({context}), point marked NaN"
                ));
                PointSolution::nan()
            }
            Err(e) => return Err(e),
        };
        let t_net = t - tfric;
        let plfric = 2.0 * PI * n * tfric;
        let pmech = 2.0 * PI * n * t_net;
        let ploss = point.plfe1 + point.plfe2 + point.plmag + point.plcu1 + point.plcu2 + plfric;

        map.n.push(n);
        map.torque.push(t_net);
        map.iq.push(point.iq);
        map.id.push(point.id);
        map.i1.push(point.i1);
        map.u1.push(point.u1);
        map.pmech.push(pmech);
        map.eta.push(efficiency(pmech, ploss));
        map.plfe1.push(point.plfe1);
        map.plfe2.push(point.plfe2);
        map.plmag.push(point.plmag);
        map.plcu1.push(point.plcu1);
        map.plcu2.push(point.plcu2);
        map.plfric.push(plfric);
        map.losses.push(ploss);
    }
    Ok(map)
}

/// Convenience entry: classify the parameter bundle at the working
/// temperatures, then build the map.
pub fn efficiency_losses_map_from_eec(
    eec: &EecParams,
    u1max: f64,
    t_start: f64,
    temp: &(f64, f64),
    n_max: f64,
    settings: &MeshSettings,
    diag: &dyn Diagnostics,
) -> Result<EfficiencyMap> {
    let machine = create_machine(eec, temp, diag)?;
    efficiency_losses_map(&machine, u1max, t_start, n_max, settings, diag)
}
