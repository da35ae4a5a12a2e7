//! Machine classification
//!
//! One entry point turns a validated parameter bundle into the matching
//! model: flux tables with an excitation-current axis mean an externally
//! excited synchronous machine, plain flux tables a PM/reluctance machine
//! (interpolated to the magnet working temperature), and equivalent-circuit
//! parameters without flux tables an induction machine.

use crate::im::InductionMachine;
use crate::interp::{interpolate_tables, InterpKey};
use crate::params::EecParams;
use crate::pm::PmRelMachine;
use crate::sm::SynchronousMachine;
use machcore::diag::Diagnostics;
use machcore::error::{MachineError, Result};
use serde::{Deserialize, Serialize};

/// Speed-torque curve: speeds in rev/s with the deliverable torque at each.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CharCurve {
    pub n: Vec<f64>,
    pub torque: Vec<f64>,
}

/// The machine model variants behind one classification entry point.
#[derive(Debug, Clone)]
pub enum MachineModel {
    PmRel(PmRelMachine),
    SynchronousExcited(SynchronousMachine),
    Induction(InductionMachine),
}

/// Build the machine model matching a parameter bundle.
///
/// `temp` carries the working temperatures: stator winding first, then the
/// rotor side (magnet, excitation winding or rotor cage).
pub fn create_machine(
    eec: &EecParams,
    temp: &(f64, f64),
    diag: &dyn Diagnostics,
) -> Result<MachineModel> {
    eec.validate()?;
    let (tcu1, tcu2) = *temp;
    if !eec.ldq.is_empty() {
        if eec.ldq[0].ex_current.is_some() {
            let sm = SynchronousMachine::new(eec, tcu1, tcu2)?;
            return Ok(MachineModel::SynchronousExcited(sm));
        }
        let table = if eec.ldq.len() > 1 {
            interpolate_tables(&eec.ldq, InterpKey::Temperature, tcu2)?
        } else {
            diag.warn(&format!(
                "single flux table, no temperature interpolation (magnet temperature {tcu2} C ignored)"
            ));
            eec.ldq[0].clone()
        };
        return Ok(MachineModel::PmRel(PmRelMachine::new(eec, table, tcu1)?));
    }
    if eec.im.is_some() {
        return Ok(MachineModel::Induction(InductionMachine::new(
            eec, tcu1, tcu2,
        )?));
    }
    Err(MachineError::UnsupportedMachineType)
}

impl MachineModel {
    pub fn pole_pairs(&self) -> u32 {
        match self {
            MachineModel::PmRel(m) => m.p,
            MachineModel::SynchronousExcited(m) => m.p,
            MachineModel::Induction(m) => m.p,
        }
    }

    pub fn kfric_b(&self) -> f64 {
        match self {
            MachineModel::PmRel(m) => m.kfric_b,
            MachineModel::SynchronousExcited(m) => m.kfric_b,
            MachineModel::Induction(m) => m.kfric_b,
        }
    }

    pub fn rotor_mass(&self) -> f64 {
        match self {
            MachineModel::PmRel(m) => m.rotor_mass,
            MachineModel::SynchronousExcited(m) => m.rotor_mass,
            MachineModel::Induction(m) => m.rotor_mass,
        }
    }

    /// Speed-torque envelope at the voltage limit, whichever the variant.
    pub fn characteristics(&self, t_req: f64, n_max: f64, u1max: f64) -> Result<CharCurve> {
        match self {
            MachineModel::PmRel(m) => m.characteristics(t_req, n_max, u1max),
            MachineModel::SynchronousExcited(m) => m.characteristics(t_req, n_max, u1max),
            MachineModel::Induction(m) => m.characteristics(t_req, n_max, u1max),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::params::test_support::{linear_pm_table, pm_eec};
    use crate::params::InductionParams;
    use machcore::diag::CollectingDiagnostics;

    #[test]
    fn test_plain_flux_tables_make_a_pm_machine() {
        let t20 = linear_pm_table(0.1, 1e-3, 2e-3, false).with_temperature(20.0);
        let t80 = linear_pm_table(0.09, 1e-3, 2e-3, false).with_temperature(80.0);
        let eec = pm_eec(vec![t20, t80]);
        let diag = CollectingDiagnostics::default();
        let model = create_machine(&eec, &(20.0, 50.0), &diag).unwrap();
        assert!(matches!(model, MachineModel::PmRel(_)));
        assert!(diag.warnings().is_empty());
    }

    #[test]
    fn test_single_table_warns_about_missing_interpolation() {
        let eec = pm_eec(vec![linear_pm_table(0.1, 1e-3, 2e-3, false)]);
        let diag = CollectingDiagnostics::default();
        let model = create_machine(&eec, &(20.0, 90.0), &diag).unwrap();
        assert!(matches!(model, MachineModel::PmRel(_)));
        assert_eq!(diag.warnings().len(), 1);
    }

    #[test]
    fn test_excitation_axis_makes_an_excited_machine() {
        let t5 = linear_pm_table(0.1, 1e-3, 2e-3, false).with_ex_current(5.0);
        let t10 = linear_pm_table(0.2, 1e-3, 2e-3, false).with_ex_current(10.0);
        let mut eec = pm_eec(vec![t5, t10]);
        eec.rex = Some(2.0);
        let diag = CollectingDiagnostics::default();
        let model = create_machine(&eec, &(20.0, 20.0), &diag).unwrap();
        assert!(matches!(model, MachineModel::SynchronousExcited(_)));
    }

    #[test]
    fn test_circuit_parameters_make_an_induction_machine() {
        let mut eec = pm_eec(vec![]);
        eec.im = Some(InductionParams {
            r2: 0.03,
            lsigma1: 1e-4,
            lsigma2: 1.5e-4,
            lh: 5e-3,
            psiref: 0.5,
            rfe: 500.0,
        });
        let diag = CollectingDiagnostics::default();
        let model = create_machine(&eec, &(20.0, 20.0), &diag).unwrap();
        assert!(matches!(model, MachineModel::Induction(_)));
    }

    #[test]
    fn test_empty_bundle_is_unsupported() {
        let eec = pm_eec(vec![]);
        let diag = CollectingDiagnostics::default();
        assert!(matches!(
            create_machine(&eec, &(20.0, 20.0), &diag),
            Err(MachineError::UnsupportedMachineType)
        ));
    }
}
