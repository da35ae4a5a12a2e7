//! Small numeric helpers shared by the model and map crates.

use crate::error::{MachineError, Result};

/// `n` evenly spaced samples from `a` to `b` inclusive.
pub fn linspace(a: f64, b: f64, n: usize) -> Vec<f64> {
    match n {
        0 => Vec::new(),
        1 => vec![a],
        _ => (0..n)
            .map(|k| a + (b - a) * k as f64 / (n - 1) as f64)
            .collect(),
    }
}

/// Piecewise-linear interpolation of `(xs, ys)` at `x`, extrapolating from
/// the end segments. `xs` must be strictly increasing with at least two
/// samples.
pub fn interp1(xs: &[f64], ys: &[f64], x: f64) -> Result<f64> {
    if xs.len() != ys.len() || xs.len() < 2 {
        return Err(MachineError::InvalidInput(format!(
            "interp1 needs matching sample slices of length >= 2, got {} and {}",
            xs.len(),
            ys.len()
        )));
    }
    let mut i = match xs.iter().position(|&xk| x < xk) {
        Some(0) => 0,
        Some(k) => k - 1,
        None => xs.len() - 2,
    };
    if i > xs.len() - 2 {
        i = xs.len() - 2;
    }
    let t = (x - xs[i]) / (xs[i + 1] - xs[i]);
    Ok(ys[i] + t * (ys[i + 1] - ys[i]))
}

/// Bounded bisection root solve of `f` on `[lo, hi]`.
///
/// The bracket must straddle a sign change. Fails with `NonConvergence`
/// identifying `context` when the bracket is invalid or the iteration bound
/// is exhausted before reaching `tol`.
pub fn bisect<F: Fn(f64) -> f64>(
    f: F,
    mut lo: f64,
    mut hi: f64,
    tol: f64,
    max_iter: usize,
    context: &'static str,
) -> Result<f64> {
    let mut flo = f(lo);
    let fhi = f(hi);
    if flo == 0.0 {
        return Ok(lo);
    }
    if fhi == 0.0 {
        return Ok(hi);
    }
    if !flo.is_finite() || !fhi.is_finite() || flo.signum() == fhi.signum() {
        return Err(MachineError::NonConvergence { context });
    }
    for _ in 0..max_iter {
        let mid = 0.5 * (lo + hi);
        let fmid = f(mid);
        if fmid == 0.0 || (hi - lo).abs() < tol {
            return Ok(mid);
        }
        if fmid.signum() == flo.signum() {
            lo = mid;
            flo = fmid;
        } else {
            hi = mid;
        }
    }
    Err(MachineError::NonConvergence { context })
}
