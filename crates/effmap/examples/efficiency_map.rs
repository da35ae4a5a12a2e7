//! Builds the efficiency map of a small synthetic PM machine and prints it
//! as JSON.
//!
//! Run with `cargo run --example efficiency_map`.

use dqmodel::{CurrentGrid, DqTable, EecParams, LossTables};
use effmap::{efficiency_losses_map_from_eec, MeshSettings};
use machcore::diag::LogDiagnostics;
use machcore::transforms::iqd;
use ndarray::Array2;

fn flux_table(psim: f64, ld: f64, lq: f64, temperature: f64) -> DqTable {
    let beta: Vec<f64> = (0..7).map(|k| -90.0 + 15.0 * k as f64).collect();
    let i1: Vec<f64> = (0..7).map(|k| 25.0 * k as f64).collect();
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
    DqTable::new(CurrentGrid::BetaI1 { beta, i1 }, psid, psiq, Some(losses))
        .expect("consistent table shapes")
        .with_temperature(temperature)
}

fn main() {
    simplelog::TermLogger::init(
        simplelog::LevelFilter::Info,
        simplelog::Config::default(),
        simplelog::TerminalMode::Mixed,
        simplelog::ColorChoice::Auto,
    )
    .expect("logger init");

    let eec = EecParams {
        m: 3,
        p: 4,
        r1: 0.05,
        ls1: 1e-4,
        zeta1: 0.0,
        gam: 0.0,
        nh: 1,
        rex: None,
        ldq: vec![
            flux_table(0.100, 1e-3, 2e-3, 20.0),
            flux_table(0.092, 1e-3, 2e-3, 100.0),
        ],
        im: None,
        kfric_b: 1.0,
        rotor_mass: 20.0,
    };

    let map = efficiency_losses_map_from_eec(
        &eec,
        65.0,  // phase voltage limit, V rms
        50.0,  // driving torque, Nm
        &(20.0, 60.0),
        50.0,  // speed bound, rev/s
        &MeshSettings::default(),
        &LogDiagnostics,
    )
    .expect("map generation");

    println!("{}", serde_json::to_string_pretty(&map).expect("serializable map"));
}
