//! Mesh generation over the (speed, torque) operating region
//!
//! The mesh spans the area under the driving speed-torque envelope and, if
//! a braking envelope exists, the area above it. Torque samples per speed
//! are allocated proportionally to the local torque span and cluster in two
//! bands on either side of zero torque, so the no-load region is sampled
//! explicitly.

use dqmodel::CharCurve;
use machcore::diag::Diagnostics;
use machcore::numeric::{interp1, linspace};

/// Mesh density and the zero-torque band split.
///
/// `zero_band` is the fraction of the extreme torque at which the two
/// sample bands stop short of zero.
#[derive(Debug, Clone, Copy)]
pub struct MeshSettings {
    pub speed_points: usize,
    pub torque_points: usize,
    pub zero_band: f64,
}

impl Default for MeshSettings {
    fn default() -> Self {
        MeshSettings {
            speed_points: 50,
            torque_points: 40,
            zero_band: 0.015,
        }
    }
}

/// Build the (speed, torque) mesh from the driving envelope and an optional
/// braking envelope. Speed samples with a numerically invalid torque span
/// are logged and skipped.
pub fn generate_mesh(
    drive: &CharCurve,
    brake: Option<&CharCurve>,
    settings: &MeshSettings,
    diag: &dyn Diagnostics,
) -> Vec<(f64, f64)> {
    let drive_nmax = drive.n.iter().cloned().fold(f64::MIN, f64::max);
    let tmax = drive.torque.iter().cloned().fold(f64::MIN, f64::max);
    let (nmax, tmin, tnum) = match brake {
        Some(b) => {
            let brake_nmax = b.n.iter().cloned().fold(f64::MIN, f64::max);
            let tmin = b.torque.iter().cloned().fold(f64::MAX, f64::min);
            // 1% margin keeps every mesh speed inside both envelopes
            (
                0.99 * drive_nmax.min(brake_nmax),
                tmin,
                settings.torque_points / 2,
            )
        }
        None => (drive_nmax, 0.0, settings.torque_points),
    };

    let mut mesh = Vec::new();
    for nx in linspace(1.0_f64.min(nmax), nmax, settings.speed_points) {
        let t1 = match interp1(&drive.n, &drive.torque, nx) {
            Ok(t) => t,
            Err(_) => {
                diag.warn(&format!("driving envelope not interpolable at {nx} 1/s"));
                continue;
            }
        };
        let t0 = match brake {
            Some(b) => match interp1(&b.n, &b.torque, nx) {
                Ok(t) => t,
                Err(_) => {
                    diag.warn(&format!("braking envelope not interpolable at {nx} 1/s"));
                    continue;
                }
            },
            None => 0.0,
        };
        if !t0.is_finite() || !t1.is_finite() {
            diag.warn(&format!(
                "invalid torque span [{t0}, {t1}] at {nx} 1/s, speed sample skipped"
            ));
            continue;
        }
        let npnts = ((t1 - t0) / (tmax - tmin) * settings.torque_points as f64).round();
        if npnts > 2.0 {
            for t in linspace(t0, settings.zero_band * tmin, tnum) {
                mesh.push((nx, t));
            }
            for t in linspace(settings.zero_band * tmax, t1, tnum) {
                mesh.push((nx, t));
            }
        }
    }
    mesh
}
