//! Permanent-magnet / reluctance machine model
//!
//! Wraps one interpolated dq flux-linkage table and answers the model
//! queries the map generator needs: torque from currents, voltage from
//! currents and speed, the minimum-current (MTPA) solve for a torque target
//! and the voltage-limited (field-weakening) solve. All iterative solves are
//! bounded and fail with `NonConvergence` instead of looping.

use crate::machine::CharCurve;
use crate::params::{CurrentGrid, DqTable, EecParams, LossTables};
use machcore::error::{MachineError, Result};
use machcore::numeric::{bisect, linspace};
use machcore::transforms::{iqd, skin_resistance};
use ndarray::Array2;
use std::f64::consts::PI;

const MTPA_BETA_SAMPLES: usize = 37;
const WEAKEN_SCAN_STEPS: usize = 120;
const MAX_ITER: usize = 60;
const CHAR_SPEED_SAMPLES: usize = 40;

/// Clamped bilinear interpolation over a (row, column) table.
pub(crate) fn bilinear(rows: &[f64], cols: &[f64], table: &Array2<f64>, x: f64, y: f64) -> f64 {
    let (r, tr) = locate(rows, x);
    let (c, tc) = locate(cols, y);
    let v00 = table[[r, c]];
    let v01 = table[[r, c + 1]];
    let v10 = table[[r + 1, c]];
    let v11 = table[[r + 1, c + 1]];
    v00 * (1.0 - tr) * (1.0 - tc) + v01 * (1.0 - tr) * tc + v10 * tr * (1.0 - tc) + v11 * tr * tc
}

fn locate(axis: &[f64], x: f64) -> (usize, f64) {
    let last = axis.len() - 1;
    if x <= axis[0] {
        return (0, 0.0);
    }
    if x >= axis[last] {
        return (last - 1, 1.0);
    }
    let i = axis.iter().rposition(|&a| a <= x).unwrap_or(0).min(last - 1);
    let t = (x - axis[i]) / (axis[i + 1] - axis[i]);
    (i, t)
}

/// Query position of dq currents on a characterized grid. Braking
/// (negative iq) mirrors the motoring quadrant.
pub(crate) fn grid_query(grid: &CurrentGrid, iq: f64, id: f64) -> (f64, f64) {
    match grid {
        CurrentGrid::BetaI1 { .. } => {
            let beta = id.atan2(iq.abs()).to_degrees();
            let i1 = id.hypot(iq) / 2.0_f64.sqrt();
            (beta, i1)
        }
        CurrentGrid::IdIq { .. } => (id, iq.abs()),
    }
}

/// Flux-linkage lookup seam shared by the PM and the externally excited
/// synchronous model (which fixes the excitation current first).
pub(crate) trait FluxModel {
    /// Flux linkages (psid, psiq) at the given dq currents.
    fn psi(&self, iq: f64, id: f64) -> (f64, f64);
    /// Largest characterized current amplitude.
    fn i1_max(&self) -> f64;
    /// Characterized current-angle range in radians.
    fn beta_limits(&self) -> (f64, f64);
}

/// Electrical constants entering the voltage and torque equations.
#[derive(Debug, Clone, Copy)]
pub(crate) struct Electrical {
    pub m: usize,
    pub p: u32,
    /// Temperature-corrected stator resistance.
    pub r1: f64,
    pub ls1: f64,
}

pub(crate) fn torque_iqd(model: &dyn FluxModel, e: &Electrical, iq: f64, id: f64) -> f64 {
    let (psid, psiq) = model.psi(iq, id);
    e.m as f64 / 2.0 * e.p as f64 * (psid * iq - psiq * id)
}

pub(crate) fn uqd(model: &dyn FluxModel, e: &Electrical, w1: f64, iq: f64, id: f64) -> (f64, f64) {
    let (psid, psiq) = model.psi(iq, id);
    (
        e.r1 * id - w1 * (psiq + e.ls1 * iq),
        e.r1 * iq + w1 * (psid + e.ls1 * id),
    )
}

pub(crate) fn u1_rms(model: &dyn FluxModel, e: &Electrical, w1: f64, iq: f64, id: f64) -> f64 {
    let (ud, uq) = uqd(model, e, w1, iq, id);
    ud.hypot(uq) / 2.0_f64.sqrt()
}

/// Current amplitude reaching `tq` (positive) at angle `beta`, if the
/// characterized range can deliver it.
fn solve_i1_for_torque(model: &dyn FluxModel, e: &Electrical, beta: f64, tq: f64) -> Option<f64> {
    let torque_at = |i1: f64| {
        let (iq, id) = iqd(beta, i1);
        torque_iqd(model, e, iq, id)
    };
    if torque_at(model.i1_max()) < tq {
        return None;
    }
    bisect(
        |i1| torque_at(i1) - tq,
        0.0,
        model.i1_max(),
        1e-9 * model.i1_max(),
        MAX_ITER,
        "torque current solve",
    )
    .ok()
}

/// Minimum-current (MTPA) dq currents for a signed torque target.
///
/// The solve runs in the motoring quadrant; braking mirrors the sign of iq.
pub(crate) fn mtpa(model: &dyn FluxModel, e: &Electrical, torque: f64) -> Result<(f64, f64)> {
    if torque == 0.0 {
        return Ok((0.0, 0.0));
    }
    let tq = torque.abs();
    let (beta_min, beta_max) = model.beta_limits();
    let mut best: Option<(f64, f64)> = None;
    for beta in linspace(beta_min, beta_max, MTPA_BETA_SAMPLES) {
        if let Some(i1) = solve_i1_for_torque(model, e, beta, tq) {
            if best.map_or(true, |(_, bi1)| i1 < bi1) {
                best = Some((beta, i1));
            }
        }
    }
    let (beta, i1) = best.ok_or(MachineError::NonConvergence {
        context: "mtpa current solve",
    })?;
    let (iq, id) = iqd(beta, i1);
    Ok((torque.signum() * iq, id))
}

/// dq currents reaching the torque target at a voltage limit.
///
/// If the MTPA point violates the limit, walk the current angle toward the
/// negative-id end of the characterized range (field weakening) until the
/// voltage constraint holds, then refine against the boundary.
pub(crate) fn iqd_torque_umax(
    model: &dyn FluxModel,
    e: &Electrical,
    torque: f64,
    w1: f64,
    u1max: f64,
) -> Result<(f64, f64)> {
    let (iq, id) = mtpa(model, e, torque)?;
    if u1_rms(model, e, w1, iq, id) <= u1max {
        return Ok((iq, id));
    }
    let sign = torque.signum();
    let tq = torque.abs();
    let (beta_min, _) = model.beta_limits();
    let beta_mtpa = id.atan2(iq.abs());

    // find the first weakened angle satisfying the voltage limit; the
    // voltage is evaluated at the signed iq so the braking boundary sees
    // the r1*iq term with its real sign
    let point_at = |beta: f64| -> Option<(f64, f64, f64)> {
        let i1 = solve_i1_for_torque(model, e, beta, tq)?;
        let (q, d) = iqd(beta, i1);
        let q = sign * q;
        Some((q, d, u1_rms(model, e, w1, q, d)))
    };
    let betas = linspace(beta_mtpa, beta_min, WEAKEN_SCAN_STEPS);
    let mut bracket = None;
    for k in 1..betas.len() {
        if let Some((_, _, u)) = point_at(betas[k]) {
            if u <= u1max {
                bracket = Some((betas[k - 1], betas[k]));
                break;
            }
        }
    }
    let (mut hi, mut lo) = bracket.ok_or(MachineError::NonConvergence {
        context: "field weakening",
    })?;
    // bisect onto the voltage boundary; lo stays feasible
    for _ in 0..MAX_ITER {
        let mid = 0.5 * (lo + hi);
        match point_at(mid) {
            Some((_, _, u)) if u <= u1max => lo = mid,
            _ => hi = mid,
        }
    }
    let (q, d, _) = point_at(lo).ok_or(MachineError::NonConvergence {
        context: "field weakening",
    })?;
    Ok((q, d))
}

/// Speed-torque envelope over speed samples up to `n_max`.
///
/// `feasible(t, w1)` reports whether the signed torque `t` can be delivered
/// at stator angular frequency `w1`. Where the requested torque is out of
/// reach the achievable maximum is bracketed by bisection; the curve ends at
/// the speed where no torque is left.
pub(crate) fn envelope(
    p: u32,
    t_req: f64,
    n_max: f64,
    feasible: impl Fn(f64, f64) -> bool,
) -> Result<CharCurve> {
    let mut curve = CharCurve {
        n: Vec::new(),
        torque: Vec::new(),
    };
    let sign = t_req.signum();
    let t_abs = t_req.abs();
    let t_eps = 1e-3 * t_abs;
    for n in linspace(n_max / CHAR_SPEED_SAMPLES as f64, n_max, CHAR_SPEED_SAMPLES) {
        let w1 = 2.0 * PI * n * p as f64;
        let feasible = |t: f64| feasible(sign * t, w1);
        if feasible(t_abs) {
            curve.n.push(n);
            curve.torque.push(t_req);
            continue;
        }
        if !feasible(t_eps) {
            // voltage limit leaves no torque at this speed: the envelope ends
            break;
        }
        let (mut lo, mut hi) = (t_eps, t_abs);
        for _ in 0..MAX_ITER {
            let mid = 0.5 * (lo + hi);
            if feasible(mid) {
                lo = mid;
            } else {
                hi = mid;
            }
        }
        curve.n.push(n);
        curve.torque.push(sign * lo);
    }
    if curve.n.len() < 2 {
        return Err(MachineError::NonConvergence {
            context: "speed-torque envelope",
        });
    }
    Ok(curve)
}

/// Speed-torque envelope at a voltage limit, generic over the flux model.
pub(crate) fn characteristics(
    model: &dyn FluxModel,
    e: &Electrical,
    t_req: f64,
    n_max: f64,
    u1max: f64,
) -> Result<CharCurve> {
    envelope(e.p, t_req, n_max, |t, w1| {
        iqd_torque_umax(model, e, t, w1, u1max).is_ok()
    })
}

/// Permanent-magnet / reluctance machine built from one dq table
/// interpolated at the working temperature.
#[derive(Debug, Clone)]
pub struct PmRelMachine {
    pub m: usize,
    pub p: u32,
    pub r1: f64,
    pub ls1: f64,
    /// Stator winding temperature in degrees C.
    pub tcu1: f64,
    pub zeta1: f64,
    pub gam: f64,
    pub nh: u32,
    pub kfric_b: f64,
    pub rotor_mass: f64,
    table: DqTable,
}

impl PmRelMachine {
    pub fn new(eec: &EecParams, table: DqTable, tcu1: f64) -> Result<Self> {
        table.validate()?;
        Ok(PmRelMachine {
            m: eec.m,
            p: eec.p,
            r1: eec.r1,
            ls1: eec.ls1,
            tcu1,
            zeta1: eec.zeta1,
            gam: eec.gam,
            nh: eec.nh,
            kfric_b: eec.kfric_b,
            rotor_mass: eec.rotor_mass,
            table,
        })
    }

    fn electrical(&self) -> Electrical {
        Electrical {
            m: self.m,
            p: self.p,
            r1: self.rstat(0.0),
            ls1: self.ls1,
        }
    }

    /// Temperature- and skin-effect corrected stator resistance.
    pub fn rstat(&self, w1: f64) -> f64 {
        skin_resistance(self.r1, w1, self.tcu1, self.zeta1, self.gam, self.nh)
    }

    pub fn psi(&self, iq: f64, id: f64) -> (f64, f64) {
        FluxModel::psi(self, iq, id)
    }

    pub fn torque_iqd(&self, iq: f64, id: f64) -> f64 {
        torque_iqd(self, &self.electrical(), iq, id)
    }

    pub fn uqd(&self, w1: f64, iq: f64, id: f64) -> (f64, f64) {
        uqd(self, &self.electrical(), w1, iq, id)
    }

    pub fn u1_rms(&self, w1: f64, iq: f64, id: f64) -> f64 {
        u1_rms(self, &self.electrical(), w1, iq, id)
    }

    /// Minimum-current dq currents delivering the torque target.
    pub fn iqd_torque(&self, torque: f64) -> Result<(f64, f64)> {
        mtpa(self, &self.electrical(), torque)
    }

    /// dq currents delivering the torque target within the voltage limit.
    pub fn iqd_torque_umax(&self, torque: f64, w1: f64, u1max: f64) -> Result<(f64, f64)> {
        iqd_torque_umax(self, &self.electrical(), torque, w1, u1max)
    }

    /// Speed-torque envelope at the voltage limit (braking for negative
    /// `t_req`).
    pub fn characteristics(&self, t_req: f64, n_max: f64, u1max: f64) -> Result<CharCurve> {
        characteristics(self, &self.electrical(), t_req, n_max, u1max)
    }

    fn losses(&self) -> Option<&LossTables> {
        self.table.losses.as_ref()
    }

    fn loss_at(&self, pick: impl Fn(&LossTables) -> &Array2<f64>, iq: f64, id: f64) -> f64 {
        match self.losses() {
            Some(losses) => {
                let (rows, cols) = self.table.grid.axes();
                let (x, y) = grid_query(&self.table.grid, iq, id);
                bilinear(rows, cols, pick(losses), x, y)
            }
            None => 0.0,
        }
    }

    fn freq_scales(&self, f1: f64) -> (f64, f64) {
        match self.losses() {
            Some(losses) => {
                let fo = losses.speed * self.p as f64;
                ((f1 / fo).powf(losses.hf), (f1 / fo).powf(losses.ef))
            }
            None => (0.0, 0.0),
        }
    }

    /// Stator iron losses at dq currents and fundamental frequency f1.
    pub fn iqd_plfe1(&self, iq: f64, id: f64, f1: f64) -> f64 {
        let (kh, ke) = self.freq_scales(f1);
        let hyst = self.loss_at(|l| &l.styoke_hyst, iq, id) + self.loss_at(|l| &l.stteeth_hyst, iq, id);
        let eddy = self.loss_at(|l| &l.styoke_eddy, iq, id) + self.loss_at(|l| &l.stteeth_eddy, iq, id);
        hyst * kh + eddy * ke
    }

    /// Rotor iron losses.
    pub fn iqd_plfe2(&self, iq: f64, id: f64, f1: f64) -> f64 {
        let (kh, ke) = self.freq_scales(f1);
        self.loss_at(|l| &l.rotor_hyst, iq, id) * kh + self.loss_at(|l| &l.rotor_eddy, iq, id) * ke
    }

    /// Magnet losses.
    pub fn iqd_plmag(&self, iq: f64, id: f64, f1: f64) -> f64 {
        let (_, ke) = self.freq_scales(f1);
        self.loss_at(|l| &l.magnet, iq, id) * ke
    }

    /// Stator copper losses at angular frequency w1.
    pub fn iqd_plcu1(&self, iq: f64, id: f64, w1: f64) -> f64 {
        self.m as f64 / 2.0 * (iq * iq + id * id) * self.rstat(w1)
    }

    /// Rotor copper losses (none for a PM rotor).
    pub fn iqd_plcu2(&self, _iq: f64, _id: f64) -> f64 {
        0.0
    }
}

impl FluxModel for PmRelMachine {
    fn psi(&self, iq: f64, id: f64) -> (f64, f64) {
        let (rows, cols) = self.table.grid.axes();
        let (x, y) = grid_query(&self.table.grid, iq, id);
        let psid = bilinear(rows, cols, &self.table.psid, x, y);
        let psiq = bilinear(rows, cols, &self.table.psiq, x, y);
        // braking mirrors the motoring quadrant
        if iq < 0.0 { (psid, -psiq) } else { (psid, psiq) }
    }

    fn i1_max(&self) -> f64 {
        match &self.table.grid {
            CurrentGrid::BetaI1 { i1, .. } => *i1.last().unwrap_or(&0.0),
            CurrentGrid::IdIq { id, iq } => {
                let idm = id.iter().fold(0.0_f64, |a, &b| a.max(b.abs()));
                let iqm = iq.iter().fold(0.0_f64, |a, &b| a.max(b.abs()));
                idm.hypot(iqm) / 2.0_f64.sqrt()
            }
        }
    }

    fn beta_limits(&self) -> (f64, f64) {
        match &self.table.grid {
            CurrentGrid::BetaI1 { beta, .. } => (
                beta.first().unwrap_or(&-90.0).to_radians(),
                beta.last().unwrap_or(&0.0).to_radians(),
            ),
            CurrentGrid::IdIq { .. } => (-PI / 2.0, 0.0),
        }
    }
}
