//! Fundamental extraction from sampled waveforms
//!
//! The aggregator derives EMF amplitude and phase from the fundamental of
//! the induced-voltage waveform sampled over one electrical period.

use crate::error::{MachineError, Result};
use serde::{Deserialize, Serialize};
use std::f64::consts::PI;

/// Amplitude and phase of the fundamental of a sampled waveform.
///
/// Phase is expressed so that the waveform is approximately
/// `amplitude * cos(theta - phase)` with `theta` running 0..2pi over the
/// sample window.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Fundamental {
    pub amplitude: f64,
    pub phase: f64,
}

/// DFT projection of `values` onto the fundamental, assuming the samples
/// cover exactly one period with uniform spacing.
pub fn fundamental(values: &[f64]) -> Result<Fundamental> {
    if values.len() < 4 {
        return Err(MachineError::InvalidInput(format!(
            "fundamental extraction needs at least 4 samples per period, got {}",
            values.len()
        )));
    }
    let n = values.len() as f64;
    let mut a = 0.0;
    let mut b = 0.0;
    for (k, &v) in values.iter().enumerate() {
        let theta = 2.0 * PI * k as f64 / n;
        a += v * theta.cos();
        b += v * theta.sin();
    }
    a *= 2.0 / n;
    b *= 2.0 / n;
    Ok(Fundamental {
        amplitude: a.hypot(b),
        phase: b.atan2(a),
    })
}
