//! Multi-slice aggregation of axial-flux solver runs
//!
//! Runs the external field solver once per radial slice, scales the
//! per-slice linear-machine quantities to the full machine and recombines
//! them by radial quadrature. A loaded simulation is preceded by a no-load
//! reference pass: its current angles fix the excitation alignment of the
//! loaded pass, and its EMF fundamental provides the magnet flux linkage
//! that the load-angle decomposition is referenced against.

use crate::topology::{arm_lengths, pole_widths, AfmType};
use machcore::diag::Diagnostics;
use machcore::error::{MachineError, Result};
use machcore::harmonics::fundamental;
use machcore::solver::{
    ExcitationMode, FieldSolver, MachineGeometry, OperatingCondition, SliceSolution, SliceSpec,
};
use serde::{Deserialize, Serialize};
use std::f64::consts::PI;

/// Loss totals of the recombined machine, in W.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct AggregatedLosses {
    /// Stator iron (teeth plus yoke).
    pub plfe1: f64,
    /// Rotor iron.
    pub plfe2: f64,
    /// Magnet.
    pub plmag: f64,
    /// Stator copper.
    pub plcu: f64,
}

/// Recombined result of one aggregation run.
///
/// The flux decomposition (`gamma`, `psid`, `psiq`, `id`, `iq`) is relative
/// to the no-load reference; for a plain no-load run it degenerates to
/// `psid = psim`, `psiq = 0`. `ld`/`lq` stay unset when the corresponding
/// current component is exactly zero.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AggregatedResult {
    /// Rotor position per step in mechanical degrees.
    pub pos_deg: Vec<f64>,
    /// Torque per step in Nm.
    pub torque: Vec<f64>,
    /// Induced voltage per phase per step in V.
    pub emf: Vec<Vec<f64>>,
    /// Fundamental EMF amplitude in V.
    pub emf_amp: f64,
    /// Fundamental EMF phase in rad.
    pub emf_angle: f64,
    /// Fundamental electrical frequency in Hz.
    pub freq: f64,
    /// Phase current waveforms in A.
    pub currents: Vec<Vec<f64>>,
    /// Winding DC resistance per phase in Ohm.
    pub r1: f64,
    /// Phase current in A (rms).
    pub i1: f64,
    pub losses: AggregatedLosses,
    /// Load angle in degrees.
    pub beta_deg: f64,
    /// Flux-linkage angle relative to the no-load EMF in rad.
    pub gamma: f64,
    pub psid: f64,
    pub psiq: f64,
    pub psim: f64,
    pub id: f64,
    pub iq: f64,
    pub ld: Option<f64>,
    pub lq: Option<f64>,
}

/// Winding DC resistance per phase from the mean-turn-length estimate.
pub fn winding_resistance(geometry: &MachineGeometry) -> f64 {
    let w = &geometry.winding;
    let q = geometry.num_slots as f64;
    let g = w.num_par_wdgs as f64;
    let turns =
        q * w.num_layers as f64 * w.num_wires as f64 / (2.0 * w.num_phases as f64 * g);
    let aw = w.slot_width * w.slot_height * w.cufilfact / (w.num_wires * w.num_layers) as f64;
    let lt = 2.4
        * ((geometry.outer_diam - geometry.inner_diam)
            + PI / q * (geometry.outer_diam + geometry.inner_diam)
            + 16e-3);
    turns * lt / w.conductivity / aw / g
}

fn trapz(x: &[f64], y: &[f64]) -> f64 {
    x.windows(2)
        .zip(y.windows(2))
        .map(|(xs, ys)| 0.5 * (ys[0] + ys[1]) * (xs[1] - xs[0]))
        .sum()
}

/// Radial recombination of one per-slice, per-step table. With two or fewer
/// slices there is no radial continuum; the single scaled row is taken
/// directly.
fn integrate_steps(radii: &[f64], rows: &[Vec<f64>]) -> Vec<f64> {
    if radii.len() > 2 {
        let n = rows[0].len();
        (0..n)
            .map(|k| {
                let column: Vec<f64> = rows.iter().map(|row| row[k]).collect();
                trapz(radii, &column)
            })
            .collect()
    } else {
        rows[0].clone()
    }
}

fn integrate_scalar(radii: &[f64], vals: &[f64]) -> f64 {
    if radii.len() > 2 {
        trapz(radii, vals)
    } else {
        vals[0]
    }
}

/// Axial-flux multi-slice aggregator.
#[derive(Debug, Clone, Copy)]
pub struct AfpmAggregator {
    pub num_slices: usize,
}

impl AfpmAggregator {
    pub fn new(num_slices: usize) -> Self {
        AfpmAggregator { num_slices }
    }

    fn slices(&self, geometry: &MachineGeometry, speed: f64) -> Vec<SliceSpec> {
        let arms = arm_lengths(geometry.outer_diam, geometry.inner_diam, self.num_slices);
        let widths = pole_widths(
            geometry.outer_diam,
            geometry.inner_diam,
            geometry.poles,
            self.num_slices,
        );
        arms.iter()
            .zip(&widths)
            .map(|(&arm, &pw)| SliceSpec {
                pole_width: pw,
                arm_length: arm,
                linear_speed: speed * geometry.poles as f64 * pw,
            })
            .collect()
    }

    fn solve_all(
        &self,
        solver: &mut dyn FieldSolver,
        geometry: &MachineGeometry,
        slices: &[SliceSpec],
        condition: &OperatingCondition,
    ) -> Result<Vec<SliceSolution>> {
        slices
            .iter()
            .map(|slice| solver.solve(geometry, slice, condition))
            .collect()
    }

    /// Run the aggregation: no-load reference pass (unless the condition
    /// already is one), loaded pass with the derived current angles, then
    /// recombination and flux decomposition.
    pub fn run(
        &self,
        solver: &mut dyn FieldSolver,
        geometry: &MachineGeometry,
        condition: &OperatingCondition,
        diag: &dyn Diagnostics,
    ) -> Result<AggregatedResult> {
        let afm = AfmType::from_tag(&geometry.afm_type)?;
        validate_geometry(geometry, self.num_slices)?;
        let slices = self.slices(geometry, condition.speed);

        if condition.mode == ExcitationMode::NoLoad {
            let sols = self.solve_all(solver, geometry, &slices, condition)?;
            let mut agg = process(afm, geometry, &slices, &sols, ExcitationMode::NoLoad, diag)?;
            let w1 = 2.0 * PI * agg.freq;
            if w1 > 0.0 {
                agg.psim = agg.emf_amp / w1;
                agg.psid = agg.psim;
            } else {
                diag.warn("zero fundamental frequency, no flux linkage derived");
            }
            return Ok(agg);
        }

        let nl_condition = OperatingCondition::no_load(condition.speed, condition.magnet_temp);
        let nl_sols = self.solve_all(solver, geometry, &slices, &nl_condition)?;
        let nl = process(
            afm,
            geometry,
            &slices,
            &nl_sols,
            ExcitationMode::NoLoad,
            diag,
        )?;

        let mut loaded = condition.clone();
        if loaded.current_angles.is_none() {
            let angles = nl_sols[0].current_angles.clone();
            diag.info(&format!("current angles from no-load pass: {angles:?}"));
            loaded.current_angles = Some(angles);
        }
        let sols = self.solve_all(solver, geometry, &slices, &loaded)?;
        let mut agg = process(afm, geometry, &slices, &sols, ExcitationMode::Load, diag)?;

        let w1 = 2.0 * PI * agg.freq;
        if w1 <= 0.0 {
            return Err(MachineError::InvalidInput(
                "loaded run reported a zero fundamental frequency".into(),
            ));
        }
        agg.gamma = -(agg.emf_angle - nl.emf_angle);
        agg.psid = agg.gamma.cos() * agg.emf_amp / w1;
        agg.psiq = -agg.gamma.sin() * agg.emf_amp / w1;
        agg.psim = nl.emf_amp / w1;
        agg.beta_deg = sols[0].beta_deg;
        let beta = agg.beta_deg.to_radians();
        agg.id = 2.0_f64.sqrt() * agg.i1 * beta.sin();
        agg.iq = 2.0_f64.sqrt() * agg.i1 * beta.cos();
        if agg.id != 0.0 {
            agg.ld = Some((agg.psid - agg.psim) / agg.id);
        }
        if agg.iq != 0.0 {
            agg.lq = Some(agg.psiq / agg.iq);
        }
        Ok(agg)
    }
}

fn validate_geometry(geometry: &MachineGeometry, num_slices: usize) -> Result<()> {
    if geometry.inner_diam <= 0.0 || geometry.outer_diam <= geometry.inner_diam {
        return Err(MachineError::InvalidInput(format!(
            "diameters must satisfy 0 < inner < outer, got {} / {}",
            geometry.inner_diam, geometry.outer_diam
        )));
    }
    if geometry.poles == 0 || geometry.num_slots == 0 || geometry.num_slots_sim == 0 {
        return Err(MachineError::InvalidInput(
            "pole and slot counts must be non-zero".into(),
        ));
    }
    if num_slices == 0 {
        return Err(MachineError::InvalidInput(
            "at least one radial slice is required".into(),
        ));
    }
    Ok(())
}

/// Scale per-slice quantities to the full machine and recombine radially.
fn process(
    afm: AfmType,
    geometry: &MachineGeometry,
    slices: &[SliceSpec],
    sols: &[SliceSolution],
    mode: ExcitationMode,
    diag: &dyn Diagnostics,
) -> Result<AggregatedResult> {
    let scale = afm.scale_factor(geometry.num_slots, geometry.num_slots_sim);
    let radii: Vec<f64> = slices
        .iter()
        .map(|s| s.pole_width * geometry.poles as f64 / (2.0 * PI))
        .collect();
    let n = sols
        .iter()
        .map(|s| s.displ.len())
        .min()
        .unwrap_or(0);
    if n < 4 {
        return Err(MachineError::InvalidInput(format!(
            "solver returned {n} steps, need at least 4 per electrical period"
        )));
    }
    let m = geometry.winding.num_phases;
    for sol in sols {
        if sol.voltage.len() != m || sol.current.len() != m {
            return Err(MachineError::InvalidInput(format!(
                "solver returned {} phases, winding has {m}",
                sol.voltage.len()
            )));
        }
    }

    let pos_deg: Vec<f64> = sols[0].displ[..n]
        .iter()
        .map(|d| d / radii[0] * 180.0 / PI)
        .collect();

    let torque_rows: Vec<Vec<f64>> = sols
        .iter()
        .zip(slices)
        .zip(&radii)
        .map(|((sol, slice), &r)| {
            sol.force[..n]
                .iter()
                .map(|fx| r * scale * fx / slice.arm_length)
                .collect()
        })
        .collect();
    let torque = integrate_steps(&radii, &torque_rows);

    let emf: Vec<Vec<f64>> = (0..m)
        .map(|phase| {
            let rows: Vec<Vec<f64>> = sols
                .iter()
                .zip(slices)
                .map(|(sol, slice)| {
                    sol.voltage[phase][..n]
                        .iter()
                        .map(|u| scale * u / slice.arm_length)
                        .collect()
                })
                .collect();
            integrate_steps(&radii, &rows)
        })
        .collect();
    let emf_fund = fundamental(&emf[0])?;

    let loss_density = |pick: &dyn Fn(&SliceSolution) -> f64| -> f64 {
        let vals: Vec<f64> = sols
            .iter()
            .zip(slices)
            .map(|(sol, slice)| scale * pick(sol) / slice.arm_length)
            .collect();
        integrate_scalar(&radii, &vals)
    };
    let plfe1 = loss_density(&|s| s.losses.stator_teeth + s.losses.stator_yoke);
    let plfe2 = loss_density(&|s| s.losses.rotor);
    let plmag = loss_density(&|s| s.losses.magnet);

    let currents: Vec<Vec<f64>> = sols[0].current.iter().map(|c| c[..n].to_vec()).collect();
    let i1 = currents
        .iter()
        .map(|c| c.iter().cloned().fold(f64::MIN, f64::max))
        .sum::<f64>()
        / m as f64
        / 2.0_f64.sqrt();
    let r1 = winding_resistance(geometry);

    let plcu = if sols.iter().all(|s| s.losses.winding.is_some()) {
        let vals: Vec<f64> = sols
            .iter()
            .zip(slices)
            .map(|(sol, slice)| {
                scale * sol.losses.winding.unwrap_or(0.0) / slice.arm_length
            })
            .collect();
        integrate_scalar(&radii, &vals)
    } else if mode == ExcitationMode::Load {
        diag.warn("winding losses missing from a loaded run, using i1^2*r1 estimate");
        m as f64 * i1 * i1 * r1
    } else {
        0.0
    };

    Ok(AggregatedResult {
        pos_deg,
        torque,
        emf,
        emf_amp: emf_fund.amplitude,
        emf_angle: emf_fund.phase,
        freq: sols[0].freq,
        currents,
        r1,
        i1,
        losses: AggregatedLosses {
            plfe1,
            plfe2,
            plmag,
            plcu,
        },
        ..AggregatedResult::default()
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use machcore::diag::CollectingDiagnostics;
    use machcore::solver::{SliceLosses, WindingSpec};

    const STEPS: usize = 90;
    const FREQ: f64 = 100.0;

    /// Geometry with mean radius exactly 1 m, so single-slice torque scaling
    /// is easy to read off.
    fn geometry(afm_type: &str) -> MachineGeometry {
        MachineGeometry {
            afm_type: afm_type.to_string(),
            outer_diam: 2.2,
            inner_diam: 1.8,
            poles: 10,
            airgap: 2e-3,
            num_slots: 12,
            num_slots_sim: 12,
            winding: WindingSpec::default(),
        }
    }

    /// Scripted solver: cosine EMF waveforms with configurable amplitude and
    /// phase per mode, plus a call log.
    struct MockSolver {
        noload_amp: f64,
        load_amp: f64,
        load_phase: f64,
        load_current_amp: f64,
        load_beta_deg: f64,
        winding_loss: Option<f64>,
        calls: Vec<OperatingCondition>,
    }

    impl MockSolver {
        fn new() -> Self {
            MockSolver {
                noload_amp: 50.0,
                load_amp: 80.0,
                load_phase: 0.2,
                load_current_amp: 100.0 * 2.0_f64.sqrt(),
                load_beta_deg: -30.0,
                winding_loss: Some(40.0),
                calls: Vec::new(),
            }
        }

        fn wave(amp: f64, phase: f64) -> Vec<f64> {
            (0..STEPS)
                .map(|k| amp * (2.0 * PI * k as f64 / STEPS as f64 - phase).cos())
                .collect()
        }
    }

    impl FieldSolver for MockSolver {
        fn solve(
            &mut self,
            _geometry: &MachineGeometry,
            slice: &SliceSpec,
            condition: &OperatingCondition,
        ) -> machcore::error::Result<SliceSolution> {
            self.calls.push(condition.clone());
            let noload = condition.mode == ExcitationMode::NoLoad;
            let (amp, phase) = if noload {
                (self.noload_amp, 0.0)
            } else {
                (self.load_amp, self.load_phase)
            };
            let i_amp = if noload { 0.0 } else { self.load_current_amp };
            let displ: Vec<f64> = (0..STEPS)
                .map(|k| 2.0 * slice.pole_width * k as f64 / STEPS as f64)
                .collect();
            Ok(SliceSolution {
                displ,
                force: (0..STEPS).map(|k| 10.0 + (k % 2) as f64 * 2.0).collect(),
                voltage: (0..3)
                    .map(|ph| Self::wave(amp, phase + ph as f64 * 2.0 * PI / 3.0))
                    .collect(),
                current: (0..3)
                    .map(|ph| Self::wave(i_amp, ph as f64 * 2.0 * PI / 3.0))
                    .collect(),
                current_angles: vec![90.0, 210.0, 330.0],
                losses: SliceLosses {
                    stator_teeth: 25.0,
                    stator_yoke: 30.0,
                    rotor: 8.0,
                    magnet: 12.0,
                    winding: if noload { None } else { self.winding_loss },
                },
                freq: FREQ,
                beta_deg: self.load_beta_deg,
            })
        }
    }

    #[test]
    fn test_unknown_machine_type_fails_before_any_solver_call() {
        let mut solver = MockSolver::new();
        let diag = CollectingDiagnostics::new();
        let res = AfpmAggregator::new(3).run(
            &mut solver,
            &geometry("S3R3"),
            &OperatingCondition::no_load(50.0, 20.0),
            &diag,
        );
        assert!(matches!(res, Err(MachineError::InvalidInput(_))));
        assert_eq!(solver.calls.len(), 0);
    }

    #[test]
    fn test_single_slice_scales_without_quadrature() {
        let mut solver = MockSolver::new();
        let diag = CollectingDiagnostics::new();
        let agg = AfpmAggregator::new(1)
            .run(
                &mut solver,
                &geometry("S1R1"),
                &OperatingCondition::no_load(50.0, 20.0),
                &diag,
            )
            .unwrap();
        // mean radius 1.0, arm length 0.4, scale factor 1: torque is the
        // scaled force row taken directly
        let arm = 2.2 - 1.8;
        assert_relative_eq!(agg.torque[0], 10.0 / arm, epsilon = 1e-12);
        assert_relative_eq!(agg.torque[1], 12.0 / arm, epsilon = 1e-12);
        // no-load run: magnet flux only
        let w1 = 2.0 * PI * FREQ;
        assert_relative_eq!(agg.psim, 50.0 / arm / w1, max_relative = 1e-9);
        assert_relative_eq!(agg.psid, agg.psim);
        assert_relative_eq!(agg.psiq, 0.0);
        assert_relative_eq!(agg.losses.plcu, 0.0);
        assert!(agg.ld.is_none() && agg.lq.is_none());
    }

    #[test]
    fn test_half_model_doubles_scale() {
        let mut solver = MockSolver::new();
        let diag = CollectingDiagnostics::new();
        let agg = AfpmAggregator::new(1)
            .run(
                &mut solver,
                &geometry("S2R1"),
                &OperatingCondition::no_load(50.0, 20.0),
                &diag,
            )
            .unwrap();
        assert_relative_eq!(agg.torque[0], 2.0 * 10.0 / 0.4, epsilon = 1e-12);
    }

    fn load_condition() -> OperatingCondition {
        OperatingCondition {
            mode: ExcitationMode::Load,
            speed: 50.0,
            current: 100.0 * 2.0_f64.sqrt(),
            beta_deg: -30.0,
            magnet_temp: 20.0,
            current_angles: None,
        }
    }

    #[test]
    fn test_loaded_run_feeds_back_noload_current_angles() {
        let mut solver = MockSolver::new();
        let diag = CollectingDiagnostics::new();
        AfpmAggregator::new(1)
            .run(&mut solver, &geometry("S1R1"), &load_condition(), &diag)
            .unwrap();
        // one no-load pass, then one loaded pass with the derived angles
        assert_eq!(solver.calls.len(), 2);
        assert_eq!(solver.calls[0].mode, ExcitationMode::NoLoad);
        assert_eq!(solver.calls[1].mode, ExcitationMode::Load);
        assert_eq!(
            solver.calls[1].current_angles,
            Some(vec![90.0, 210.0, 330.0])
        );
    }

    #[test]
    fn test_preset_current_angles_are_kept() {
        let mut solver = MockSolver::new();
        let diag = CollectingDiagnostics::new();
        let mut condition = load_condition();
        condition.current_angles = Some(vec![1.0, 2.0, 3.0]);
        AfpmAggregator::new(1)
            .run(&mut solver, &geometry("S1R1"), &condition, &diag)
            .unwrap();
        assert_eq!(solver.calls[1].current_angles, Some(vec![1.0, 2.0, 3.0]));
    }

    #[test]
    fn test_flux_decomposition_against_noload_reference() {
        let mut solver = MockSolver::new();
        let diag = CollectingDiagnostics::new();
        let agg = AfpmAggregator::new(1)
            .run(&mut solver, &geometry("S1R1"), &load_condition(), &diag)
            .unwrap();
        let arm = 0.4;
        let w1 = 2.0 * PI * FREQ;
        assert_relative_eq!(agg.gamma, -0.2, epsilon = 1e-9);
        assert_relative_eq!(
            agg.psid,
            0.2_f64.cos() * 80.0 / arm / w1,
            max_relative = 1e-9
        );
        assert_relative_eq!(
            agg.psiq,
            0.2_f64.sin() * 80.0 / arm / w1,
            max_relative = 1e-9
        );
        assert_relative_eq!(agg.psim, 50.0 / arm / w1, max_relative = 1e-9);
        assert_relative_eq!(agg.i1, 100.0, max_relative = 1e-9);
        assert_relative_eq!(agg.beta_deg, -30.0);
        assert_relative_eq!(agg.id, 2.0_f64.sqrt() * 100.0 * (-0.5), max_relative = 1e-9);
        let ld = agg.ld.unwrap();
        assert_relative_eq!(ld, (agg.psid - agg.psim) / agg.id, max_relative = 1e-12);
        let lq = agg.lq.unwrap();
        assert_relative_eq!(lq, agg.psiq / agg.iq, max_relative = 1e-12);
    }

    #[test]
    fn test_inductances_unset_at_zero_current_components() {
        let mut solver = MockSolver::new();
        solver.load_beta_deg = 0.0; // id = 0
        let diag = CollectingDiagnostics::new();
        let agg = AfpmAggregator::new(1)
            .run(&mut solver, &geometry("S1R1"), &load_condition(), &diag)
            .unwrap();
        assert!(agg.ld.is_none());
        assert!(agg.lq.is_some());
    }

    #[test]
    fn test_missing_winding_losses_fall_back_with_warning() {
        let mut solver = MockSolver::new();
        solver.winding_loss = None;
        let diag = CollectingDiagnostics::new();
        let agg = AfpmAggregator::new(1)
            .run(&mut solver, &geometry("S1R1"), &load_condition(), &diag)
            .unwrap();
        assert_eq!(diag.warnings().len(), 1);
        assert_relative_eq!(
            agg.losses.plcu,
            3.0 * 100.0 * 100.0 * agg.r1,
            max_relative = 1e-9
        );
    }

    #[test]
    fn test_multi_slice_quadrature_matches_uniform_density() {
        // uniform scaled force density over the radius: the quadrature must
        // reproduce density * radial span
        let mut solver = MockSolver::new();
        let diag = CollectingDiagnostics::new();
        let geo = geometry("S1R1");
        let agg = AfpmAggregator::new(5)
            .run(
                &mut solver,
                &geo,
                &OperatingCondition::no_load(50.0, 20.0),
                &diag,
            )
            .unwrap();
        // per-slice density at step 0: r * 10 / arm; arms are the
        // trapezoidal half-span weights, so density = 10 * r / arm varies
        // with r. Check against a direct trapezoid over the slice radii.
        let radii: Vec<f64> = pole_widths(2.2, 1.8, 10, 5)
            .iter()
            .map(|pw| pw * 10.0 / (2.0 * PI))
            .collect();
        let arms = arm_lengths(2.2, 1.8, 5);
        let density: Vec<f64> = radii
            .iter()
            .zip(&arms)
            .map(|(r, arm)| r * 10.0 / arm)
            .collect();
        let expected = trapz(&radii, &density);
        assert_relative_eq!(agg.torque[0], expected, max_relative = 1e-12);
    }
}
