//! Temperature / excitation-current interpolation of parameter sets
//!
//! Given a list of tables characterized at different temperatures (or
//! excitation currents) over one shared current grid, fit every flux and
//! loss entry across the key axis and evaluate at a target key value. With
//! more than two samples a degree-2 least-squares (smoothing) fit is used;
//! with two or fewer, linear interpolation with extrapolation.

use crate::params::{DqTable, LossTables};
use machcore::error::{MachineError, Result};
use nalgebra::{Matrix3, Vector3};
use ndarray::Array2;

const GRID_TOL: f64 = 1e-8;

/// Key axis to interpolate on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InterpKey {
    Temperature,
    ExcitationCurrent,
}

impl InterpKey {
    fn value(&self, table: &DqTable) -> Option<f64> {
        match self {
            InterpKey::Temperature => table.temperature,
            InterpKey::ExcitationCurrent => table.ex_current,
        }
    }

    fn name(&self) -> &'static str {
        match self {
            InterpKey::Temperature => "temperature",
            InterpKey::ExcitationCurrent => "ex_current",
        }
    }
}

/// Interpolate a list of parameter tables at `target` along `key`.
///
/// Fails with `CurrentRangeConflict` when the tables do not share one
/// current grid and with `LossesSpeedConflict` when their loss reference
/// speeds disagree (losses are speed-normalized, so a speed mismatch
/// invalidates the fit).
pub fn interpolate_tables(tables: &[DqTable], key: InterpKey, target: f64) -> Result<DqTable> {
    if tables.is_empty() {
        return Err(MachineError::InvalidInput(
            "no parameter tables to interpolate".into(),
        ));
    }
    for table in tables {
        table.validate()?;
        if key.value(table).is_none() {
            return Err(MachineError::InvalidInput(format!(
                "parameter table lacks a {} value to interpolate on",
                key.name()
            )));
        }
    }
    let first = &tables[0];
    if tables[1..]
        .iter()
        .any(|t| !t.grid.approx_eq(&first.grid, GRID_TOL))
    {
        return Err(MachineError::CurrentRangeConflict);
    }

    let all_losses = tables.iter().all(|t| t.losses.is_some());
    if all_losses {
        let speeds: Vec<f64> = tables
            .iter()
            .map(|t| t.losses.as_ref().map(|l| l.speed).unwrap_or(0.0))
            .collect();
        let max = speeds.iter().cloned().fold(f64::MIN, f64::max);
        let min = speeds.iter().cloned().fold(f64::MAX, f64::min);
        let mean = speeds.iter().sum::<f64>() / speeds.len() as f64;
        if mean != 0.0 && (max - min) / mean > 1e-3 {
            return Err(MachineError::LossesSpeedConflict);
        }
    }

    let mut order: Vec<usize> = (0..tables.len()).collect();
    order.sort_by(|&a, &b| {
        let ka = key.value(&tables[a]).unwrap_or(f64::NAN);
        let kb = key.value(&tables[b]).unwrap_or(f64::NAN);
        ka.partial_cmp(&kb).unwrap_or(std::cmp::Ordering::Equal)
    });
    let x: Vec<f64> = order
        .iter()
        .map(|&i| key.value(&tables[i]).unwrap_or(f64::NAN))
        .collect();

    let fit_tables = |pick: &dyn Fn(&DqTable) -> &Array2<f64>| -> Array2<f64> {
        let stack: Vec<&Array2<f64>> = order.iter().map(|&i| pick(&tables[i])).collect();
        fit_stack(&x, &stack, target)
    };

    let psid = fit_tables(&|t| &t.psid);
    let psiq = fit_tables(&|t| &t.psiq);

    let loss_sets: Option<Vec<&LossTables>> =
        order.iter().map(|&i| tables[i].losses.as_ref()).collect();
    // reference speed and frequency exponents carry over from the first
    // input set
    let losses = loss_sets.zip(first.losses.as_ref()).map(|(sets, reference)| {
        let fit_loss = |pick: &dyn Fn(&LossTables) -> &Array2<f64>| -> Array2<f64> {
            let stack: Vec<&Array2<f64>> = sets.iter().map(|l| pick(l)).collect();
            fit_stack(&x, &stack, target)
        };
        LossTables {
            styoke_hyst: fit_loss(&|l| &l.styoke_hyst),
            styoke_eddy: fit_loss(&|l| &l.styoke_eddy),
            stteeth_hyst: fit_loss(&|l| &l.stteeth_hyst),
            stteeth_eddy: fit_loss(&|l| &l.stteeth_eddy),
            rotor_hyst: fit_loss(&|l| &l.rotor_hyst),
            rotor_eddy: fit_loss(&|l| &l.rotor_eddy),
            magnet: fit_loss(&|l| &l.magnet),
            speed: reference.speed,
            hf: reference.hf,
            ef: reference.ef,
        }
    });

    let mut out = DqTable {
        temperature: first.temperature,
        ex_current: first.ex_current,
        grid: first.grid.clone(),
        psid,
        psiq,
        losses,
    };
    match key {
        InterpKey::Temperature => out.temperature = Some(target),
        InterpKey::ExcitationCurrent => out.ex_current = Some(target),
    }
    Ok(out)
}

/// Fit every grid point of a table stack across the key axis.
fn fit_stack(x: &[f64], stack: &[&Array2<f64>], target: f64) -> Array2<f64> {
    let shape = stack[0].dim();
    let mut out = Array2::zeros(shape);
    let mut y = vec![0.0; x.len()];
    for r in 0..shape.0 {
        for c in 0..shape.1 {
            for (k, table) in stack.iter().enumerate() {
                y[k] = table[[r, c]];
            }
            out[[r, c]] = fit_across(x, &y, target);
        }
    }
    out
}

/// One-dimensional fit across the key axis at a single grid point.
fn fit_across(x: &[f64], y: &[f64], target: f64) -> f64 {
    match x.len() {
        1 => y[0],
        2 => {
            let t = (target - x[0]) / (x[1] - x[0]);
            y[0] + t * (y[1] - y[0])
        }
        _ => quad_fit(x, y, target),
    }
}

/// Degree-2 least-squares fit evaluated at `target`. Falls back to the
/// nearest-segment linear fit when the normal equations are singular
/// (e.g. duplicate key values).
fn quad_fit(x: &[f64], y: &[f64], target: f64) -> f64 {
    let n = x.len() as f64;
    let (mut s1, mut s2, mut s3, mut s4) = (0.0, 0.0, 0.0, 0.0);
    let (mut t0, mut t1, mut t2) = (0.0, 0.0, 0.0);
    for (&xi, &yi) in x.iter().zip(y) {
        let x2 = xi * xi;
        s1 += xi;
        s2 += x2;
        s3 += x2 * xi;
        s4 += x2 * x2;
        t0 += yi;
        t1 += xi * yi;
        t2 += x2 * yi;
    }
    let a = Matrix3::new(n, s1, s2, s1, s2, s3, s2, s3, s4);
    let b = Vector3::new(t0, t1, t2);
    match a.lu().solve(&b) {
        Some(c) => c[0] + c[1] * target + c[2] * target * target,
        None => {
            let t = (target - x[0]) / (x[x.len() - 1] - x[0]);
            y[0] + t * (y[y.len() - 1] - y[0])
        }
    }
}
