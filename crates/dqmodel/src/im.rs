//! Induction machine model (inverse-gamma equivalent circuit)
//!
//! Rotor quantities are referred to the stator; phasors are complex with
//! the magnetizing flux on the real axis. Torque control picks the slip
//! frequency for the requested torque at a given flux, and the flux is
//! reduced iteratively when the voltage limit binds (field weakening).

use crate::machine::CharCurve;
use crate::params::EecParams;
use crate::pm::envelope;
use machcore::error::{MachineError, Result};
use machcore::numeric::bisect;
use machcore::transforms::{skin_resistance, KTH, TREF};
use nalgebra::Complex;

const WEAKEN_ITER: usize = 30;

/// Steady-state solution of the equivalent circuit at one load point.
#[derive(Debug, Clone, Copy)]
pub struct ImOperatingPoint {
    /// Stator angular frequency in rad/s.
    pub w1: f64,
    /// Slip angular frequency in rad/s (negative when braking).
    pub w2: f64,
    /// Magnetizing flux in Vs (rms).
    pub psi: f64,
    /// Air-gap torque in Nm.
    pub torque: f64,
    /// Stator phase voltage phasor in V (rms).
    pub u1: Complex<f64>,
    /// Stator phase current phasor in A (rms).
    pub i1: Complex<f64>,
    /// Rotor current phasor in A (rms), referred to the stator.
    pub i2: Complex<f64>,
    /// Stator iron losses in W.
    pub plfe1: f64,
    /// Stator copper losses in W.
    pub plcu1: f64,
    /// Rotor copper losses in W.
    pub plcu2: f64,
}

/// Induction machine from inverse-gamma equivalent-circuit parameters.
#[derive(Debug, Clone)]
pub struct InductionMachine {
    pub m: usize,
    pub p: u32,
    pub r1: f64,
    pub r2: f64,
    pub lsigma1: f64,
    pub lsigma2: f64,
    pub lh: f64,
    pub psiref: f64,
    pub rfe: f64,
    /// Stator winding temperature in degrees C.
    pub tcu1: f64,
    /// Rotor cage temperature in degrees C.
    pub tcu2: f64,
    pub zeta1: f64,
    pub gam: f64,
    pub nh: u32,
    pub kfric_b: f64,
    pub rotor_mass: f64,
}

impl InductionMachine {
    pub fn new(eec: &EecParams, tcu1: f64, tcu2: f64) -> Result<Self> {
        let im = eec.im.as_ref().ok_or_else(|| {
            MachineError::InvalidInput(
                "induction machine needs equivalent-circuit parameters".into(),
            )
        })?;
        if im.lh <= 0.0 || im.lsigma2 <= 0.0 || im.r2 <= 0.0 {
            return Err(MachineError::InvalidInput(
                "induction-machine inductances and rotor resistance must be positive".into(),
            ));
        }
        Ok(InductionMachine {
            m: eec.m,
            p: eec.p,
            r1: eec.r1,
            r2: im.r2,
            lsigma1: im.lsigma1,
            lsigma2: im.lsigma2,
            lh: im.lh,
            psiref: im.psiref,
            rfe: im.rfe,
            tcu1,
            tcu2,
            zeta1: eec.zeta1,
            gam: eec.gam,
            nh: eec.nh,
            kfric_b: eec.kfric_b,
            rotor_mass: eec.rotor_mass,
        })
    }

    /// Temperature- and skin-effect corrected stator resistance.
    pub fn rstat(&self, w1: f64) -> f64 {
        skin_resistance(self.r1, w1, self.tcu1, self.zeta1, self.gam, self.nh)
    }

    /// Temperature-corrected rotor resistance.
    pub fn rrot(&self) -> f64 {
        self.r2 * (1.0 + KTH * (self.tcu2 - TREF))
    }

    /// Breakdown slip frequency in rad/s.
    pub fn w2_breakdown(&self) -> f64 {
        self.rrot() / self.lsigma2
    }

    /// Air-gap torque at slip frequency w2 and magnetizing flux psi (rms).
    pub fn torque(&self, w2: f64, psi: f64) -> f64 {
        let r2 = self.rrot();
        let x = w2 * self.lsigma2;
        self.m as f64 * self.p as f64 * psi * psi * w2 * r2 / (r2 * r2 + x * x)
    }

    /// Rotor current phasor at slip frequency and flux.
    fn i2(&self, w2: f64, psi: f64) -> Complex<f64> {
        let j = Complex::new(0.0, 1.0);
        -j * w2 * psi / Complex::new(self.rrot(), w2 * self.lsigma2)
    }

    /// Slip frequency below breakdown delivering the torque magnitude, at
    /// the given flux.
    fn w2_torque(&self, tq: f64, psi: f64) -> Result<f64> {
        let w2b = self.w2_breakdown();
        if self.torque(w2b, psi) < tq {
            return Err(MachineError::NonConvergence {
                context: "slip solve beyond breakdown torque",
            });
        }
        bisect(
            |w2| self.torque(w2, psi) - tq,
            0.0,
            w2b,
            1e-12 * w2b,
            80,
            "slip solve",
        )
    }

    /// Steady-state operating point for a signed load torque at mechanical
    /// angular speed `wm` (rad/s), within the stator voltage limit.
    ///
    /// The magnetizing flux starts at the rated value and is scaled down
    /// until the voltage limit holds.
    pub fn operating_point(&self, u1max: f64, tload: f64, wm: f64) -> Result<ImOperatingPoint> {
        let sign = if tload < 0.0 { -1.0 } else { 1.0 };
        let tq = tload.abs();
        let mut psi = self.psiref;
        let mut op = self.solve_at(tq, sign, wm, psi)?;
        for _ in 0..WEAKEN_ITER {
            let u = op.u1.norm();
            if u <= u1max * (1.0 + 1e-6) {
                return Ok(op);
            }
            psi *= u1max / u;
            op = self.solve_at(tq, sign, wm, psi)?;
        }
        Err(MachineError::NonConvergence {
            context: "induction-machine flux weakening",
        })
    }

    fn solve_at(&self, tq: f64, sign: f64, wm: f64, psi: f64) -> Result<ImOperatingPoint> {
        let w2 = sign * self.w2_torque(tq, psi)?;
        let w1 = wm * self.p as f64 + w2;
        let j = Complex::new(0.0, 1.0);
        let i2 = self.i2(w2, psi);
        let i1 = Complex::new(psi / self.lh, 0.0) + i2;
        let rstat = self.rstat(w1);
        let u1 = j * w1 * psi + Complex::new(rstat, w1 * self.lsigma1) * i1;
        let mf = self.m as f64;
        Ok(ImOperatingPoint {
            w1,
            w2,
            psi,
            torque: self.torque(w2, psi),
            u1,
            i1,
            i2,
            plfe1: mf * (w1 * psi).powi(2) / self.rfe,
            plcu1: mf * i1.norm_sqr() * rstat,
            plcu2: mf * i2.norm_sqr() * self.rrot(),
        })
    }

    /// Speed-torque envelope at the voltage limit.
    pub fn characteristics(&self, t_req: f64, n_max: f64, u1max: f64) -> Result<CharCurve> {
        let p = self.p as f64;
        envelope(self.p, t_req, n_max, |t, w1| {
            self.operating_point(u1max, t, w1 / p).is_ok()
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::params::test_support::pm_eec;
    use crate::params::InductionParams;
    use approx::assert_relative_eq;
    use std::f64::consts::PI;

    fn machine() -> InductionMachine {
        let mut eec = pm_eec(vec![]);
        eec.p = 2;
        eec.im = Some(InductionParams {
            r2: 0.03,
            lsigma1: 1e-4,
            lsigma2: 1.5e-4,
            lh: 5e-3,
            psiref: 0.5,
            rfe: 500.0,
        });
        InductionMachine::new(&eec, 20.0, 20.0).unwrap()
    }

    #[test]
    fn test_torque_peaks_at_breakdown_slip() {
        let im = machine();
        let w2b = im.w2_breakdown();
        let tb = im.torque(w2b, 0.5);
        assert!(im.torque(0.5 * w2b, 0.5) < tb);
        assert!(im.torque(1.5 * w2b, 0.5) < tb);
        // closed form at breakdown: m*p*psi^2/(2*lsigma2)
        assert_relative_eq!(tb, 6.0 * 0.25 / (2.0 * 1.5e-4), max_relative = 1e-9);
    }

    #[test]
    fn test_operating_point_delivers_torque() {
        let im = machine();
        let op = im.operating_point(230.0, 40.0, 2.0 * PI * 25.0).unwrap();
        assert_relative_eq!(op.torque, 40.0, max_relative = 1e-6);
        assert_relative_eq!(op.psi, 0.5, max_relative = 1e-9);
        assert!(op.u1.norm() <= 230.0);
        assert!(op.w2 > 0.0);
    }

    #[test]
    fn test_flux_weakening_above_base_speed() {
        let im = machine();
        let op = im.operating_point(230.0, 40.0, 2.0 * PI * 50.0).unwrap();
        assert!(op.psi < im.psiref);
        assert!(op.u1.norm() <= 230.0 * (1.0 + 1e-5));
        assert_relative_eq!(op.torque, 40.0, max_relative = 1e-6);
    }

    #[test]
    fn test_braking_uses_negative_slip() {
        let im = machine();
        let op = im.operating_point(230.0, -40.0, 2.0 * PI * 25.0).unwrap();
        assert!(op.w2 < 0.0);
        assert_relative_eq!(op.torque, -40.0, max_relative = 1e-6);
    }

    #[test]
    fn test_rotor_loss_slip_relation() {
        let im = machine();
        let op = im.operating_point(230.0, 40.0, 2.0 * PI * 25.0).unwrap();
        // air-gap power split: plcu2 = w2/p * torque at small slip
        let pgap_slip = op.w2 / 2.0 * op.torque;
        assert_relative_eq!(op.plcu2, pgap_slip, max_relative = 0.05);
    }

    #[test]
    fn test_characteristics_torque_never_increases() {
        let im = machine();
        let curve = im.characteristics(40.0, 60.0, 160.0).unwrap();
        assert!(curve.n.len() >= 2);
        assert_relative_eq!(curve.torque[0], 40.0);
        for k in 1..curve.torque.len() {
            assert!(curve.torque[k] <= curve.torque[k - 1] + 1e-9);
        }
    }

    #[test]
    fn test_missing_circuit_parameters_rejected() {
        let eec = pm_eec(vec![]);
        assert!(matches!(
            InductionMachine::new(&eec, 20.0, 20.0),
            Err(MachineError::InvalidInput(_))
        ));
    }
}
