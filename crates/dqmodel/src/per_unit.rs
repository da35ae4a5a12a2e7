//! Per-unit conversion of parameter sets
//!
//! Normalizes flux by the reference flux `U_ref / w_ref`, power by
//! `3 * U_ref * I_ref` and currents by `I_ref`, producing a dimensionless
//! table suitable for comparing machines of different ratings.

use crate::params::{CurrentGrid, DqTable, EecParams, LossTables};
use machcore::error::{MachineError, Result};
use std::f64::consts::PI;

/// Reference quantities for the per-unit system.
#[derive(Debug, Clone, Copy)]
pub struct PerUnitBase {
    /// Reference speed in rev/s.
    pub speed: f64,
    /// Reference phase voltage in V (rms).
    pub voltage: f64,
    /// Reference phase current in A (rms).
    pub current: f64,
}

/// Convert one dq table to per-unit quantities.
pub fn per_unit_table(table: &DqTable, p: u32, base: &PerUnitBase) -> DqTable {
    let wr = 2.0 * PI * base.speed * p as f64;
    let psir = base.voltage / wr;
    let sr = 3.0 * base.voltage * base.current;

    let grid = match &table.grid {
        CurrentGrid::BetaI1 { beta, i1 } => CurrentGrid::BetaI1 {
            beta: beta.clone(),
            i1: i1.iter().map(|&i| i / base.current).collect(),
        },
        CurrentGrid::IdIq { id, iq } => CurrentGrid::IdIq {
            id: id
                .iter()
                .map(|&i| i / base.current * 2.0_f64.sqrt())
                .collect(),
            iq: iq
                .iter()
                .map(|&i| i / base.current * 2.0_f64.sqrt())
                .collect(),
        },
    };

    let losses = table.losses.as_ref().map(|l| LossTables {
        styoke_hyst: &l.styoke_hyst / sr,
        styoke_eddy: &l.styoke_eddy / sr,
        stteeth_hyst: &l.stteeth_hyst / sr,
        stteeth_eddy: &l.stteeth_eddy / sr,
        rotor_hyst: &l.rotor_hyst / sr,
        rotor_eddy: &l.rotor_eddy / sr,
        magnet: &l.magnet / sr,
        speed: p as f64 * l.speed / wr,
        hf: l.hf,
        ef: l.ef,
    });

    DqTable {
        temperature: table.temperature,
        ex_current: table.ex_current,
        grid,
        psid: &table.psid / psir,
        psiq: &table.psiq / psir,
        losses,
    }
}

/// Convert all flux tables of a parameter bundle to per-unit quantities.
///
/// A bundle without any current-grid representation (no flux tables) cannot
/// be normalized this way.
pub fn per_unit_eec(eec: &EecParams, base: &PerUnitBase) -> Result<Vec<DqTable>> {
    if eec.ldq.is_empty() {
        return Err(MachineError::InvalidInput(
            "per-unit conversion needs a dq current representation, none present".into(),
        ));
    }
    Ok(eec
        .ldq
        .iter()
        .map(|t| per_unit_table(t, eec.p, base))
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::params::test_support::{linear_pm_table, pm_eec};
    use approx::assert_relative_eq;

    const BASE: PerUnitBase = PerUnitBase {
        speed: 50.0,
        voltage: 230.0,
        current: 100.0,
    };

    #[test]
    fn test_flux_and_current_scaling() {
        let table = linear_pm_table(0.12, 1e-3, 2e-3, true);
        let pu = per_unit_table(&table, 4, &BASE);
        let wr = 2.0 * PI * BASE.speed * 4.0;
        assert_relative_eq!(
            pu.psid[[0, 3]],
            table.psid[[0, 3]] / (BASE.voltage / wr),
            max_relative = 1e-12
        );
        if let (CurrentGrid::BetaI1 { i1: pu_i1, .. }, CurrentGrid::BetaI1 { i1, .. }) =
            (&pu.grid, &table.grid)
        {
            assert_relative_eq!(pu_i1[4], i1[4] / BASE.current, max_relative = 1e-12);
        } else {
            panic!("representation changed");
        }
    }

    #[test]
    fn test_loss_scaling_and_speed() {
        let table = linear_pm_table(0.12, 1e-3, 2e-3, true);
        let pu = per_unit_table(&table, 4, &BASE);
        let sr = 3.0 * BASE.voltage * BASE.current;
        let losses = pu.losses.unwrap();
        assert_relative_eq!(losses.magnet[[0, 0]], 12.0 / sr, max_relative = 1e-12);
        let wr = 2.0 * PI * BASE.speed * 4.0;
        assert_relative_eq!(losses.speed, 4.0 * 50.0 / wr, max_relative = 1e-12);
        // frequency exponents are unchanged
        assert_relative_eq!(losses.hf, 1.0);
        assert_relative_eq!(losses.ef, 2.0);
    }

    #[test]
    fn test_eec_without_tables_rejected() {
        let mut eec = pm_eec(vec![]);
        eec.im = None;
        let res = per_unit_eec(&eec, &BASE);
        assert!(matches!(res, Err(MachineError::InvalidInput(_))));
    }
}
