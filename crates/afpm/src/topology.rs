//! Axial-flux topology tags and radial slicing
//!
//! An axial-flux machine is cut into radial slices, each simulated as an
//! independent 2-D linear machine. The slicing uses trapezoidal arm-length
//! weights (half-interval arms at the radial edges) so that integrating the
//! per-length slice quantities over the radius recombines the full machine.

use machcore::error::{MachineError, Result};
use std::f64::consts::PI;

/// Recognized stator/rotor arrangements.
///
/// The `half` variants simulate one of two active sides and double the
/// scale factor; the `all` variants model both sides directly.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AfmType {
    /// 1 stator, 1 rotor.
    S1R1,
    /// 1 stator, 2 rotors, one half simulated.
    S1R2,
    /// 1 stator, 2 rotors, all simulated.
    S1R2All,
    /// 2 stators, 1 rotor, one half simulated.
    S2R1,
    /// 2 stators, 1 rotor, all simulated.
    S2R1All,
}

impl AfmType {
    /// Parse the topology tag of an input deck. Unknown tags are an input
    /// error, raised before any solver call is issued.
    pub fn from_tag(tag: &str) -> Result<AfmType> {
        match tag {
            "S1R1" => Ok(AfmType::S1R1),
            "S1R2" => Ok(AfmType::S1R2),
            "S1R2_all" => Ok(AfmType::S1R2All),
            "S2R1" => Ok(AfmType::S2R1),
            "S2R1_all" => Ok(AfmType::S2R1All),
            _ => Err(MachineError::InvalidInput(format!(
                "unknown axial-flux machine type {tag:?}"
            ))),
        }
    }

    /// Scale from the simulated segment to the full machine. The simulation
    /// covers `num_slots_sim` of `num_slots` slots, and for the half-model
    /// topologies only one of two active sides.
    pub fn scale_factor(&self, num_slots: u32, num_slots_sim: u32) -> f64 {
        let segments = num_slots as f64 / num_slots_sim as f64;
        match self {
            AfmType::S2R1 | AfmType::S1R2 => 2.0 * segments,
            _ => segments,
        }
    }
}

/// Radial arm length per slice. With more than two slices the edge slices
/// carry half-interval arms; with two or fewer the whole radial span
/// collapses into one slice.
pub fn arm_lengths(outer_diam: f64, inner_diam: f64, num_slices: usize) -> Vec<f64> {
    let d = outer_diam - inner_diam;
    if num_slices > 2 {
        let h = d / (2 * (num_slices - 1)) as f64;
        let mut arms = vec![h; num_slices];
        arms[0] = h / 2.0;
        arms[num_slices - 1] = h / 2.0;
        arms
    } else {
        vec![d]
    }
}

/// Pole width at each slice diameter. Slice diameters run evenly from the
/// inner to the outer diameter; with two or fewer slices a single slice at
/// the mean diameter is used.
pub fn pole_widths(outer_diam: f64, inner_diam: f64, poles: u32, num_slices: usize) -> Vec<f64> {
    if num_slices > 2 {
        let d = outer_diam - inner_diam;
        (0..num_slices)
            .map(|i| PI * (inner_diam + d * i as f64 / (num_slices - 1) as f64) / poles as f64)
            .collect()
    } else {
        vec![PI * (outer_diam + inner_diam) / 2.0 / poles as f64]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_unknown_tag_rejected() {
        assert!(AfmType::from_tag("S3R1").is_err());
        assert_eq!(AfmType::from_tag("S1R2_all").unwrap(), AfmType::S1R2All);
    }

    #[test]
    fn test_scale_factor_doubles_for_half_models() {
        assert_relative_eq!(AfmType::S1R1.scale_factor(12, 3), 4.0);
        assert_relative_eq!(AfmType::S2R1.scale_factor(12, 3), 8.0);
        assert_relative_eq!(AfmType::S2R1All.scale_factor(12, 3), 4.0);
    }

    #[test]
    fn test_arm_lengths_sum_to_radial_span() {
        let arms = arm_lengths(0.28, 0.18, 5);
        assert_relative_eq!(arms.iter().sum::<f64>(), 0.05, epsilon = 1e-12);
        assert_relative_eq!(arms[0], arms[4]);
        assert_relative_eq!(arms[1], 2.0 * arms[0]);
    }

    #[test]
    fn test_few_slices_collapse_to_one() {
        assert_eq!(arm_lengths(0.28, 0.18, 2), vec![0.28 - 0.18]);
        let pw = pole_widths(0.28, 0.18, 10, 1);
        assert_eq!(pw.len(), 1);
        assert_relative_eq!(pw[0], PI * 0.23 / 10.0, epsilon = 1e-12);
    }

    #[test]
    fn test_pole_widths_follow_slice_diameters() {
        let pw = pole_widths(0.28, 0.18, 10, 3);
        assert_relative_eq!(pw[0], PI * 0.18 / 10.0, epsilon = 1e-12);
        assert_relative_eq!(pw[1], PI * 0.23 / 10.0, epsilon = 1e-12);
        assert_relative_eq!(pw[2], PI * 0.28 / 10.0, epsilon = 1e-12);
    }
}
