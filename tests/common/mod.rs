#![allow(dead_code)]

use acnet::core::sensor::SensorConfig;
use acnet::nn::NetworkRepository;

/// Network text with zero weights: every output is the middle of its range
pub fn constant_network(inputs: &[(f64, f64)], outputs: &[(f64, f64)], hidden: usize) -> String {
    let mut text = String::from("synthetic network\n#\n");
    text.push_str(&format!("{}\n", inputs.len()));
    for (lo, hi) in inputs {
        text.push_str(&format!("{} {}\n", lo, hi));
    }
    text.push_str(&format!("{}\n", outputs.len()));
    for (lo, hi) in outputs {
        text.push_str(&format!("{} {}\n", lo, hi));
    }
    text.push_str("$\n");
    text.push_str(&format!("#planes=3 {} {} {}\n", inputs.len(), hidden, outputs.len()));

    let zeros = |n: usize| vec!["0.0"; n].join(" ");
    text.push_str(&format!("bias 1 {}\n{}\n", hidden, zeros(hidden)));
    text.push_str(&format!("bias 2 {}\n{}\n", outputs.len(), zeros(outputs.len())));
    text.push_str(&format!("wgt 1 {} {}\n", hidden, inputs.len()));
    for _ in 0..hidden {
        text.push_str(&format!("{}\n", zeros(inputs.len())));
    }
    text.push_str(&format!("wgt 2 {} {}\n", outputs.len(), hidden));
    for _ in 0..outputs.len() {
        text.push_str(&format!("{}\n", zeros(hidden)));
    }
    text
}

/// Training bounds of the 14 VIIRS atmosphere network inputs
pub fn atmosphere_bounds() -> Vec<(f64, f64)> {
    let mut bounds = vec![
        (0.0, 80.0),     // sun zenith
        (-1.0, 1.0),     // x
        (-1.0, 1.0),     // y
        (0.0, 1.0),      // z
        (0.0, 36.0),     // temperature
        (0.0, 43.0),     // salinity
        (800.0, 1100.0), // pressure
    ];
    bounds.extend(std::iter::repeat((-7.0, 0.0)).take(7));
    bounds
}

/// Training bounds of the 11 VIIRS IOP network inputs
pub fn iop_bounds() -> Vec<(f64, f64)> {
    let mut bounds = vec![
        (0.0, 80.0),  // sun zenith
        (0.0, 70.0),  // view zenith
        (0.0, 180.0), // azimuth difference
        (0.0, 36.0),  // temperature
        (0.0, 43.0),  // salinity
    ];
    bounds.extend(std::iter::repeat((-10.0, 0.0)).take(6));
    bounds
}

/// log(rw) produced by the synthetic rtosa->rw network
pub const LOG_RW: f64 = -4.0;
/// log(rtosa) produced by the synthetic auto-associative network
pub const LOG_RTOSA_OUT: f64 = -2.7;
/// log(iop) produced by the synthetic IOP network
pub const LOG_IOP: f64 = -1.5;

/// Repository holding synthetic networks under the VIIRS resource paths
pub fn viirs_repository_with(iop_inputs: &[(f64, f64)]) -> NetworkRepository {
    let sensor = SensorConfig::viirs();
    let mut repo = NetworkRepository::in_memory();
    repo.register(
        &sensor.networks.rtosa_rw,
        constant_network(&atmosphere_bounds(), &[(LOG_RW - 2.0, LOG_RW + 2.0); 7], 4),
    );
    repo.register(
        &sensor.networks.rtosa_aann,
        constant_network(&atmosphere_bounds(), &[(LOG_RTOSA_OUT - 0.5, LOG_RTOSA_OUT + 0.5); 7], 3),
    );
    repo.register(
        &sensor.networks.rw_iop,
        constant_network(iop_inputs, &[(LOG_IOP - 1.0, LOG_IOP + 1.0); 5], 4),
    );
    repo
}

pub fn viirs_repository() -> NetworkRepository {
    viirs_repository_with(&iop_bounds())
}

pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}
