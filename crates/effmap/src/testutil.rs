//! Synthetic parameter bundles shared by the map tests.

use dqmodel::{CurrentGrid, DqTable, EecParams, InductionParams, LossTables};
use machcore::transforms::iqd;
use ndarray::Array2;

/// Linear PM flux table: psid = psim + ld*id, psiq = lq*iq over a
/// (beta, i1) grid with flat loss tables.
fn linear_table(psim: f64, ld: f64, lq: f64) -> DqTable {
    let beta: Vec<f64> = vec![-90.0, -75.0, -60.0, -45.0, -30.0, -15.0, 0.0];
    let i1: Vec<f64> = vec![0.0, 25.0, 50.0, 75.0, 100.0, 125.0, 150.0];
    let shape = (beta.len(), i1.len());
    let mut psid = Array2::zeros(shape);
    let mut psiq = Array2::zeros(shape);
    for (r, &b) in beta.iter().enumerate() {
        for (c, &amp) in i1.iter().enumerate() {
            let (iq, id) = iqd(b.to_radians(), amp);
            psid[[r, c]] = psim + ld * id;
            psiq[[r, c]] = lq * iq;
        }
    }
    let flat = |v: f64| Array2::from_elem(shape, v);
    let losses = LossTables {
        styoke_hyst: flat(30.0),
        styoke_eddy: flat(20.0),
        stteeth_hyst: flat(25.0),
        stteeth_eddy: flat(15.0),
        rotor_hyst: flat(5.0),
        rotor_eddy: flat(8.0),
        magnet: flat(12.0),
        speed: 50.0,
        hf: 1.0,
        ef: 2.0,
    };
    DqTable::new(CurrentGrid::BetaI1 { beta, i1 }, psid, psiq, Some(losses)).unwrap()
}

fn base_eec(ldq: Vec<DqTable>) -> EecParams {
    EecParams {
        m: 3,
        p: 4,
        r1: 0.05,
        ls1: 1e-4,
        zeta1: 0.0,
        gam: 0.0,
        nh: 1,
        rex: None,
        ldq,
        im: None,
        kfric_b: 1.0,
        rotor_mass: 20.0,
    }
}

/// PM bundle with flux tables at two magnet temperatures.
pub fn pm_eec_two_temps() -> EecParams {
    base_eec(vec![
        linear_table(0.1, 1e-3, 2e-3).with_temperature(20.0),
        linear_table(0.092, 1e-3, 2e-3).with_temperature(100.0),
    ])
}

/// Induction-machine bundle (no flux tables).
pub fn induction_eec() -> EecParams {
    let mut eec = base_eec(vec![]);
    eec.p = 2;
    eec.im = Some(InductionParams {
        r2: 0.03,
        lsigma1: 1e-4,
        lsigma2: 1.5e-4,
        lh: 5e-3,
        psiref: 0.5,
        rfe: 500.0,
    });
    eec
}
