//! Space-phasor and current transforms
//!
//! Park / inverse Park projections, the (beta, i1) <-> (iq, id) current
//! representations, and the skin-effect resistance correction used when
//! evaluating copper losses at operating frequency.

use crate::error::{MachineError, Result};
use nalgebra::{SMatrix, Vector2};
use ndarray::Array2;
use std::f64::consts::PI;

/// Temperature coefficient of resistance for copper.
pub const KTH: f64 = 0.0039;
/// Reference temperature of resistance in degrees C.
pub const TREF: f64 = 20.0;

/// Park transformation matrix T so that `(q, d) = T * abc`.
pub fn park(angle: f64) -> SMatrix<f64, 2, 3> {
    let (a, b, c) = (angle, angle - 2.0 * PI / 3.0, angle + 2.0 * PI / 3.0);
    SMatrix::<f64, 2, 3>::new(
        -a.cos(),
        -b.cos(),
        -c.cos(),
        a.sin(),
        b.sin(),
        c.sin(),
    ) * (2.0 / 3.0)
}

/// Inverse Park transformation matrix K so that `abc = K * (q, d)`.
pub fn inverse_park(angle: f64) -> SMatrix<f64, 3, 2> {
    let (a, b, c) = (angle, angle - 2.0 * PI / 3.0, angle + 2.0 * PI / 3.0);
    SMatrix::<f64, 3, 2>::new(
        -a.cos(),
        a.sin(),
        -b.cos(),
        b.sin(),
        -c.cos(),
        c.sin(),
    )
}

/// Convert a dq vector to the abc reference frame at a single rotation angle.
pub fn dq_to_abc(angle: f64, q: f64, d: f64) -> [f64; 3] {
    let abc = inverse_park(angle) * Vector2::new(q, d);
    [abc[0], abc[1], abc[2]]
}

/// Convert a fixed dq vector to abc waveforms over an array of angles.
///
/// Returns an array of shape `(3, angles.len())`.
pub fn dq_to_abc_fixed(angles: &[f64], q: f64, d: f64) -> Array2<f64> {
    let mut out = Array2::zeros((3, angles.len()));
    for (k, &a) in angles.iter().enumerate() {
        let abc = dq_to_abc(a, q, d);
        for ph in 0..3 {
            out[[ph, k]] = abc[ph];
        }
    }
    out
}

/// Convert elementwise dq samples to abc waveforms.
///
/// All three slices must have the same length.
pub fn dq_to_abc_series(angles: &[f64], q: &[f64], d: &[f64]) -> Result<Array2<f64>> {
    if angles.len() != q.len() || angles.len() != d.len() {
        return Err(MachineError::InvalidInput(format!(
            "dq_to_abc_series length mismatch: {} angles, {} q, {} d",
            angles.len(),
            q.len(),
            d.len()
        )));
    }
    let mut out = Array2::zeros((3, angles.len()));
    for k in 0..angles.len() {
        let abc = dq_to_abc(angles[k], q[k], d[k]);
        for ph in 0..3 {
            out[[ph, k]] = abc[ph];
        }
    }
    Ok(out)
}

/// Return the angle and amplitude of a dq current pair.
///
/// `beta = atan2(id, iq)`, `i1 = |(id, iq)| / sqrt(2)` (rms amplitude).
pub fn beta_i1(iq: f64, id: f64) -> (f64, f64) {
    (id.atan2(iq), id.hypot(iq) / 2.0_f64.sqrt())
}

/// Return the (iq, id) currents of an angle/amplitude pair.
pub fn iqd(beta: f64, i1: f64) -> (f64, f64) {
    let amp = 2.0_f64.sqrt() * i1;
    (amp * beta.cos(), amp * beta.sin())
}

/// Skin-effect resistance factor of a conductor stack with `nl` layers.
pub fn kskinr(xi: f64, nl: u32) -> f64 {
    let xi2 = 2.0 * xi;
    let nl2 = (nl * nl) as f64;
    xi * ((xi2.sinh() + xi2.sin()) / (xi2.cosh() - xi2.cos()))
        + (nl2 - 1.0) / 3.0 * xi2 * ((xi.sinh() - xi.sin()) / (xi.cosh() + xi.cos()))
}

/// Skin-effect inductance factor of a conductor stack with `nl` layers.
pub fn kskinl(xi: f64, nl: u32) -> f64 {
    let xi2 = 2.0 * xi;
    let nl2 = (nl * nl) as f64;
    3.0 / (nl2 * xi2) * (xi2.sinh() - xi2.sin()) / (xi2.cosh() - xi2.cos())
        + (nl2 - 1.0) / (nl2 * xi) * (xi.sinh() + xi.sin()) / (xi.cosh() + xi.cos())
}

/// Normalized skin depth parameter at angular frequency `w` and temperature
/// `temp`. The 50 Hz reference and the copper temperature coefficient follow
/// the conductor characterization convention.
fn skin_xi(w: f64, temp: f64, zeta: f64) -> f64 {
    zeta * (w.abs() / (2.0 * PI) / (50.0 * (1.0 + KTH * (temp - TREF)))).sqrt()
}

/// Temperature- and skin-effect corrected winding resistance.
///
/// `r0` is the DC resistance at [`TREF`], `zeta` the conductor height in
/// units of skin depth at 50 Hz / 20 C, `gam` the end-winding to slot length
/// ratio and `nh` the number of conductor layers. For vanishing frequency the
/// correction factor is exactly 1.
pub fn skin_resistance(r0: f64, w: f64, temp: f64, zeta: f64, gam: f64, nh: u32) -> f64 {
    let xi = skin_xi(w, temp, zeta);
    let k = if xi < 1e-12 {
        1.0
    } else {
        (gam + kskinr(xi, nh)) / (1.0 + gam)
    };
    r0 * (1.0 + KTH * (temp - TREF)) * k
}

/// Elementwise [`skin_resistance`] over a slice of angular frequencies.
pub fn skin_resistance_slice(
    r0: f64,
    w: &[f64],
    temp: f64,
    zeta: f64,
    gam: f64,
    nh: u32,
) -> Vec<f64> {
    w.iter()
        .map(|&wk| skin_resistance(r0, wk, temp, zeta, gam, nh))
        .collect()
}

/// DC resistance of a winding from turn count and wire geometry.
///
/// `turns` number of turns, `turn_length` wire length of one turn in m,
/// `wire_diam` wire diameter in m, `sigma` conductivity in 1/(Ohm m).
pub fn wire_resistance(turns: f64, turn_length: f64, wire_diam: f64, sigma: f64) -> f64 {
    let area = PI * wire_diam * wire_diam / 4.0;
    turns * turn_length / sigma / area
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_park_inverse_park_is_identity() {
        for angle in [0.0, 0.3, PI / 2.0, 2.1, -1.7] {
            let prod = park(angle) * inverse_park(angle);
            assert_relative_eq!(prod[(0, 0)], 1.0, epsilon = 1e-12);
            assert_relative_eq!(prod[(1, 1)], 1.0, epsilon = 1e-12);
            assert!(prod[(0, 1)].abs() < 1e-12);
            assert!(prod[(1, 0)].abs() < 1e-12);
        }
    }

    #[test]
    fn test_beta_i1_iqd_round_trip() {
        for &beta in &[-3.0, -PI / 2.0, -0.4, 0.0, 0.9, PI / 2.0, 3.1] {
            for &i1 in &[0.0, 1.0, 7.5, 120.0] {
                let (iq, id) = iqd(beta, i1);
                let (b, i) = beta_i1(iq, id);
                assert_relative_eq!(i, i1, epsilon = 1e-9);
                if i1 > 0.0 {
                    assert_relative_eq!(b, beta, epsilon = 1e-9);
                }
            }
        }
    }

    #[test]
    fn test_iqd_magnitude_is_sqrt2_i1() {
        for &beta in &[-1.2, 0.0, 0.7] {
            let (iq, id) = iqd(beta, 10.0);
            assert_relative_eq!(iq.hypot(id), 2.0_f64.sqrt() * 10.0, epsilon = 1e-12);
        }
    }

    #[test]
    fn test_beta_i1_pure_q_current() {
        // symmetric 3-phase set with iq=10, id=0
        let (beta, i1) = beta_i1(10.0, 0.0);
        assert_relative_eq!(beta, 0.0, epsilon = 1e-12);
        assert_relative_eq!(i1, 10.0 / 2.0_f64.sqrt(), epsilon = 1e-9);
    }

    #[test]
    fn test_skin_resistance_continuous_at_zero_frequency() {
        let r0 = 0.05;
        let at_zero = skin_resistance(r0, 0.0, 80.0, 1.0, 0.5, 2);
        let near_zero = skin_resistance(r0, 1e-13, 80.0, 1.0, 0.5, 2);
        assert_relative_eq!(near_zero, at_zero, max_relative = 1e-6);
    }

    #[test]
    fn test_skin_resistance_grows_with_frequency() {
        let r0 = 0.05;
        let low = skin_resistance(r0, 2.0 * PI * 50.0, 20.0, 1.5, 0.5, 4);
        let high = skin_resistance(r0, 2.0 * PI * 800.0, 20.0, 1.5, 0.5, 4);
        assert!(high > low);
        assert!(low >= r0);
    }

    #[test]
    fn test_skin_resistance_slice_elementwise() {
        let w = [0.0, 100.0, 1000.0];
        let rs = skin_resistance_slice(0.1, &w, 60.0, 1.0, 0.3, 2);
        assert_eq!(rs.len(), 3);
        for (k, &wk) in w.iter().enumerate() {
            assert_relative_eq!(rs[k], skin_resistance(0.1, wk, 60.0, 1.0, 0.3, 2));
        }
    }

    #[test]
    fn test_dq_to_abc_fixed_broadcasts_single_pair() {
        let angles = [0.0, 0.5, 1.0, 2.0];
        let out = dq_to_abc_fixed(&angles, 3.0, -1.0);
        assert_eq!(out.shape(), &[3, 4]);
        for (k, &a) in angles.iter().enumerate() {
            let single = dq_to_abc(a, 3.0, -1.0);
            for ph in 0..3 {
                assert_relative_eq!(out[[ph, k]], single[ph], epsilon = 1e-12);
            }
        }
    }

    #[test]
    fn test_dq_to_abc_series_rejects_length_mismatch() {
        let res = dq_to_abc_series(&[0.0, 1.0], &[1.0], &[0.0, 0.0]);
        assert!(matches!(res, Err(MachineError::InvalidInput(_))));
    }

    #[test]
    fn test_abc_sums_to_zero() {
        let abc = dq_to_abc(0.73, 5.0, -2.0);
        assert!((abc[0] + abc[1] + abc[2]).abs() < 1e-12);
    }

    #[test]
    fn test_wire_resistance() {
        // 100 turns of 1 m, 1 mm diameter copper
        let r = wire_resistance(100.0, 1.0, 1e-3, 56e6);
        assert_relative_eq!(r, 100.0 / 56e6 / (PI * 0.25e-6), max_relative = 1e-12);
    }
}
