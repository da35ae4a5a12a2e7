//! Externally excited synchronous machine model
//!
//! Flux-linkage tables are characterized at several excitation currents;
//! lookups blend the two bracketing tables linearly in iex. Torque solves
//! scan the characterized excitation range and pick the copper-loss optimum
//! among the feasible candidates.

use crate::machine::CharCurve;
use crate::params::{DqTable, EecParams, LossTables};
use crate::pm::{
    bilinear, envelope, grid_query, iqd_torque_umax, mtpa, torque_iqd, u1_rms, uqd, Electrical,
    FluxModel,
};
use machcore::error::{MachineError, Result};
use machcore::numeric::linspace;
use machcore::transforms::{skin_resistance, KTH, TREF};
use ndarray::Array2;
use std::f64::consts::PI;

const IEX_SAMPLES: usize = 15;

/// Externally excited synchronous machine built from flux tables at
/// several excitation currents.
#[derive(Debug, Clone)]
pub struct SynchronousMachine {
    pub m: usize,
    pub p: u32,
    pub r1: f64,
    pub ls1: f64,
    /// Stator winding temperature in degrees C.
    pub tcu1: f64,
    /// Excitation winding temperature in degrees C.
    pub tcu2: f64,
    pub zeta1: f64,
    pub gam: f64,
    pub nh: u32,
    /// Excitation winding resistance in Ohm at 20 C.
    pub rex: f64,
    pub kfric_b: f64,
    pub rotor_mass: f64,
    /// Flux tables sorted by excitation current.
    tables: Vec<(f64, DqTable)>,
}

/// One excitation current pinned, so the dq solves from the PM model apply.
struct ExcitedFlux<'a> {
    machine: &'a SynchronousMachine,
    iex: f64,
}

impl FluxModel for ExcitedFlux<'_> {
    fn psi(&self, iq: f64, id: f64) -> (f64, f64) {
        self.machine.psi(iq, id, self.iex)
    }

    fn i1_max(&self) -> f64 {
        self.machine.i1_max()
    }

    fn beta_limits(&self) -> (f64, f64) {
        match &self.machine.tables[0].1.grid {
            crate::params::CurrentGrid::BetaI1 { beta, .. } => (
                beta.first().unwrap_or(&-90.0).to_radians(),
                beta.last().unwrap_or(&0.0).to_radians(),
            ),
            crate::params::CurrentGrid::IdIq { .. } => (-PI / 2.0, 0.0),
        }
    }
}

impl SynchronousMachine {
    /// Build from a parameter bundle; every flux table must carry an
    /// excitation current.
    pub fn new(eec: &EecParams, tcu1: f64, tcu2: f64) -> Result<Self> {
        let rex = eec.rex.ok_or_else(|| {
            MachineError::InvalidInput(
                "externally excited machine needs an excitation winding resistance".into(),
            )
        })?;
        let mut tables = Vec::with_capacity(eec.ldq.len());
        for table in &eec.ldq {
            table.validate()?;
            let iex = table.ex_current.ok_or_else(|| {
                MachineError::InvalidInput(
                    "flux table without excitation current in an excited-machine bundle".into(),
                )
            })?;
            tables.push((iex, table.clone()));
        }
        if tables.is_empty() {
            return Err(MachineError::InvalidInput(
                "excited-machine bundle carries no flux tables".into(),
            ));
        }
        tables.sort_by(|a, b| a.0.total_cmp(&b.0));
        Ok(SynchronousMachine {
            m: eec.m,
            p: eec.p,
            r1: eec.r1,
            ls1: eec.ls1,
            tcu1,
            tcu2,
            zeta1: eec.zeta1,
            gam: eec.gam,
            nh: eec.nh,
            rex,
            kfric_b: eec.kfric_b,
            rotor_mass: eec.rotor_mass,
            tables,
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

    /// Temperature-corrected excitation winding resistance (DC).
    pub fn rexc(&self) -> f64 {
        self.rex * (1.0 + KTH * (self.tcu2 - TREF))
    }

    fn ex_range(&self) -> (f64, f64) {
        (self.tables[0].0, self.tables[self.tables.len() - 1].0)
    }

    fn i1_max(&self) -> f64 {
        match &self.tables[0].1.grid {
            crate::params::CurrentGrid::BetaI1 { i1, .. } => *i1.last().unwrap_or(&0.0),
            crate::params::CurrentGrid::IdIq { id, iq } => {
                let idm = id.iter().fold(0.0_f64, |a, &b| a.max(b.abs()));
                let iqm = iq.iter().fold(0.0_f64, |a, &b| a.max(b.abs()));
                idm.hypot(iqm) / 2.0_f64.sqrt()
            }
        }
    }

    /// Linear blend weight between the two tables bracketing `iex`,
    /// clamped to the characterized range.
    fn bracket(&self, iex: f64) -> (usize, usize, f64) {
        let last = self.tables.len() - 1;
        if last == 0 || iex <= self.tables[0].0 {
            return (0, 0, 0.0);
        }
        if iex >= self.tables[last].0 {
            return (last, last, 0.0);
        }
        let i = self
            .tables
            .iter()
            .rposition(|(ex, _)| *ex <= iex)
            .unwrap_or(0)
            .min(last - 1);
        let (lo, hi) = (self.tables[i].0, self.tables[i + 1].0);
        (i, i + 1, (iex - lo) / (hi - lo))
    }

    fn blended(&self, iex: f64, f: impl Fn(&DqTable) -> f64) -> f64 {
        let (lo, hi, w) = self.bracket(iex);
        (1.0 - w) * f(&self.tables[lo].1) + w * f(&self.tables[hi].1)
    }

    /// Flux linkages (psid, psiq) at dq currents and excitation current.
    pub fn psi(&self, iq: f64, id: f64, iex: f64) -> (f64, f64) {
        let at = |pick: fn(&DqTable) -> &Array2<f64>| {
            self.blended(iex, |t| {
                let (rows, cols) = t.grid.axes();
                let (x, y) = grid_query(&t.grid, iq, id);
                bilinear(rows, cols, pick(t), x, y)
            })
        };
        let psid = at(|t| &t.psid);
        let psiq = at(|t| &t.psiq);
        if iq < 0.0 { (psid, -psiq) } else { (psid, psiq) }
    }

    pub fn torque_iqd(&self, iq: f64, id: f64, iex: f64) -> f64 {
        let flux = ExcitedFlux { machine: self, iex };
        torque_iqd(&flux, &self.electrical(), iq, id)
    }

    pub fn uqd(&self, w1: f64, iq: f64, id: f64, iex: f64) -> (f64, f64) {
        let flux = ExcitedFlux { machine: self, iex };
        uqd(&flux, &self.electrical(), w1, iq, id)
    }

    pub fn u1_rms(&self, w1: f64, iq: f64, id: f64, iex: f64) -> f64 {
        let flux = ExcitedFlux { machine: self, iex };
        u1_rms(&flux, &self.electrical(), w1, iq, id)
    }

    fn total_cu_loss(&self, iq: f64, id: f64, iex: f64, w1: f64) -> f64 {
        self.iqd_plcu1(iq, id, w1) + self.plcu2(iex)
    }

    /// Currents (iq, id, iex) delivering the torque target with the least
    /// total copper loss.
    pub fn iqd_iex_torque(&self, torque: f64) -> Result<(f64, f64, f64)> {
        let (ex_min, ex_max) = self.ex_range();
        let e = self.electrical();
        let mut best: Option<(f64, (f64, f64, f64))> = None;
        for iex in linspace(ex_min, ex_max, IEX_SAMPLES) {
            let flux = ExcitedFlux { machine: self, iex };
            if let Ok((iq, id)) = mtpa(&flux, &e, torque) {
                let loss = self.total_cu_loss(iq, id, iex, 0.0);
                if best.map_or(true, |(bl, _)| loss < bl) {
                    best = Some((loss, (iq, id, iex)));
                }
            }
        }
        best.map(|(_, pt)| pt).ok_or(MachineError::NonConvergence {
            context: "excited-machine torque solve",
        })
    }

    /// Currents (iq, id, iex) delivering the torque target within the
    /// voltage limit, minimizing total copper loss.
    pub fn iqd_iex_torque_umax(
        &self,
        torque: f64,
        w1: f64,
        u1max: f64,
    ) -> Result<(f64, f64, f64)> {
        let (ex_min, ex_max) = self.ex_range();
        let e = self.electrical();
        let mut best: Option<(f64, (f64, f64, f64))> = None;
        for iex in linspace(ex_min, ex_max, IEX_SAMPLES) {
            let flux = ExcitedFlux { machine: self, iex };
            if let Ok((iq, id)) = iqd_torque_umax(&flux, &e, torque, w1, u1max) {
                let loss = self.total_cu_loss(iq, id, iex, w1);
                if best.map_or(true, |(bl, _)| loss < bl) {
                    best = Some((loss, (iq, id, iex)));
                }
            }
        }
        best.map(|(_, pt)| pt).ok_or(MachineError::NonConvergence {
            context: "excited-machine voltage-limited solve",
        })
    }

    /// Speed-torque envelope at the voltage limit.
    pub fn characteristics(&self, t_req: f64, n_max: f64, u1max: f64) -> Result<CharCurve> {
        envelope(self.p, t_req, n_max, |t, w1| {
            self.iqd_iex_torque_umax(t, w1, u1max).is_ok()
        })
    }

    fn freq_scales(&self, f1: f64) -> (f64, f64) {
        match &self.tables[0].1.losses {
            Some(losses) => {
                let fo = losses.speed * self.p as f64;
                ((f1 / fo).powf(losses.hf), (f1 / fo).powf(losses.ef))
            }
            None => (0.0, 0.0),
        }
    }

    fn loss_at(
        &self,
        pick: impl Fn(&LossTables) -> &Array2<f64> + Copy,
        iq: f64,
        id: f64,
        iex: f64,
    ) -> f64 {
        self.blended(iex, |t| match &t.losses {
            Some(losses) => {
                let (rows, cols) = t.grid.axes();
                let (x, y) = grid_query(&t.grid, iq, id);
                bilinear(rows, cols, pick(losses), x, y)
            }
            None => 0.0,
        })
    }

    /// Stator iron losses at the operating point and frequency f1.
    pub fn iqd_plfe1(&self, iq: f64, id: f64, iex: f64, f1: f64) -> f64 {
        let (kh, ke) = self.freq_scales(f1);
        let hyst = self.loss_at(|l| &l.styoke_hyst, iq, id, iex)
            + self.loss_at(|l| &l.stteeth_hyst, iq, id, iex);
        let eddy = self.loss_at(|l| &l.styoke_eddy, iq, id, iex)
            + self.loss_at(|l| &l.stteeth_eddy, iq, id, iex);
        hyst * kh + eddy * ke
    }

    /// Rotor iron losses.
    pub fn iqd_plfe2(&self, iq: f64, id: f64, iex: f64, f1: f64) -> f64 {
        let (kh, ke) = self.freq_scales(f1);
        self.loss_at(|l| &l.rotor_hyst, iq, id, iex) * kh
            + self.loss_at(|l| &l.rotor_eddy, iq, id, iex) * ke
    }

    /// Stator copper losses at angular frequency w1.
    pub fn iqd_plcu1(&self, iq: f64, id: f64, w1: f64) -> f64 {
        self.m as f64 / 2.0 * (iq * iq + id * id) * self.rstat(w1)
    }

    /// Excitation winding losses (DC).
    pub fn plcu2(&self, iex: f64) -> f64 {
        self.rexc() * iex * iex
    }
}
