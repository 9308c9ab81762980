mod common;

use acnet::core::flags::{InversionFlags, FLAG_INDEX_RHOW_OOR, FLAG_INDEX_RTOSA_OOR, FLAG_INDEX_RTOSA_OOS};
use acnet::core::geometry::{correct_gas_absorption, ViewGeometry};
use acnet::core::pipeline::{InversionParams, PixelInverter};
use acnet::core::sensor::SensorConfig;
use acnet::nn::NetworkRepository;
use acnet::types::{AcError, AngleSet, PixelObservation};
use approx::assert_relative_eq;
use common::*;

const TOA: [f64; 7] = [0.092, 0.081, 0.069, 0.055, 0.041, 0.035, 0.029];

fn nominal_observation() -> PixelObservation {
    PixelObservation {
        toa_reflectance: TOA.to_vec(),
        angles: AngleSet::new(30.0, 100.0, 5.0, 110.0),
        altitude: 0.0,
        time_mjd: 5651.5,
        latitude: 54.0,
        longitude: 10.0,
        valid: true,
    }
}

fn viirs_inverter(repo: &NetworkRepository) -> PixelInverter {
    PixelInverter::from_repository(SensorConfig::viirs(), InversionParams::default(), repo).unwrap()
}

#[test]
fn test_viirs_end_to_end() {
    init_logging();
    let inverter = viirs_inverter(&viirs_repository());
    let mut workspace = inverter.workspace();
    let obs = nominal_observation();

    let result = inverter.invert(&mut workspace, &obs, 330.0, 1013.0);

    assert_eq!(result.rw.len(), 7);
    assert_eq!(result.iops.len(), 5);
    for rw in &result.rw {
        assert_relative_eq!(*rw, LOG_RW.exp(), max_relative = 1e-12);
    }
    for iop in &result.iops {
        assert_relative_eq!(*iop, LOG_IOP.exp(), max_relative = 1e-12);
    }

    // TOSA input is the ozone-corrected TOA
    let geometry = ViewGeometry::from_angles(&obs.angles);
    let expected_rtosa = correct_gas_absorption(&TOA, &SensorConfig::viirs().absorb_ozone, 330.0, 0.0, &geometry);
    for (actual, expected) in result.rtosa_in.iter().zip(&expected_rtosa) {
        assert_relative_eq!(*actual, *expected, max_relative = 1e-12);
    }

    let ratios: Vec<f64> = expected_rtosa.iter().map(|r| LOG_RTOSA_OUT.exp() / r).collect();
    let ratio_min = ratios.iter().cloned().fold(f64::INFINITY, f64::min);
    let ratio_max = ratios.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
    assert_relative_eq!(result.rtosa_ratio_min, ratio_min, max_relative = 1e-12);
    assert_relative_eq!(result.rtosa_ratio_max, ratio_max, max_relative = 1e-12);

    let flags = InversionFlags::from_bits(result.flags);
    assert!(flags.valid());
    assert_eq!(flags.tosa_out_of_scope(), ratio_min < 0.95 || ratio_max > 1.05);
    assert!(!flags.tosa_out_of_range());
    assert!(!flags.rhow_out_of_range());
}

#[test]
fn test_atmosphere_input_above_bound_sets_only_tosa_oor() {
    let inverter = viirs_inverter(&viirs_repository());
    let mut workspace = inverter.workspace();
    let obs = nominal_observation();

    let baseline = inverter.invert(&mut workspace, &obs, 330.0, 1013.0);
    // pressure input max is 1100
    let outside = inverter.invert(&mut workspace, &obs, 330.0, 1101.0);

    assert_eq!(baseline.flags ^ outside.flags, 1 << FLAG_INDEX_RTOSA_OOR);
}

#[test]
fn test_iop_input_above_bound_sets_only_rhow_oor() {
    let mut narrow = iop_bounds();
    // log(rw) = -4 is max + 1 for the first reflectance input
    narrow[5] = (-10.0, LOG_RW - 1.0);

    let inside = viirs_inverter(&viirs_repository());
    let outside = viirs_inverter(&viirs_repository_with(&narrow));
    let obs = nominal_observation();

    let a = inside.invert(&mut inside.workspace(), &obs, 330.0, 1013.0);
    let b = outside.invert(&mut outside.workspace(), &obs, 330.0, 1013.0);
    assert_eq!(a.flags ^ b.flags, 1 << FLAG_INDEX_RHOW_OOR);
}

#[test]
fn test_out_of_scope_thresholds() {
    let repo = viirs_repository();
    let loose = PixelInverter::from_repository(
        SensorConfig::viirs(),
        InversionParams {
            tosa_ratio_thresholds: [0.0, 100.0],
            ..InversionParams::default()
        },
        &repo,
    )
    .unwrap();
    let tight = PixelInverter::from_repository(
        SensorConfig::viirs(),
        InversionParams {
            tosa_ratio_thresholds: [0.999, 1.001],
            ..InversionParams::default()
        },
        &repo,
    )
    .unwrap();
    let obs = nominal_observation();

    let loose_flags = InversionFlags::from_bits(loose.invert(&mut loose.workspace(), &obs, 330.0, 1013.0).flags);
    let tight_flags = InversionFlags::from_bits(tight.invert(&mut tight.workspace(), &obs, 330.0, 1013.0).flags);
    assert!(!loose_flags.is_set(FLAG_INDEX_RTOSA_OOS));
    assert!(tight_flags.is_set(FLAG_INDEX_RTOSA_OOS));
}

#[test]
fn test_invalid_pixel_short_circuits() {
    let inverter = viirs_inverter(&viirs_repository());
    let mut workspace = inverter.workspace();

    let mut masked = nominal_observation();
    masked.valid = false;
    let mut nan_sample = nominal_observation();
    nan_sample.toa_reflectance[3] = f64::NAN;
    let mut night = nominal_observation();
    night.angles.sun_zenith = 95.0;
    let mut zero_toa = nominal_observation();
    zero_toa.toa_reflectance[0] = 0.0;

    for obs in [masked, nan_sample, night, zero_toa] {
        let result = inverter.invert(&mut workspace, &obs, 330.0, 1013.0);
        assert_eq!(result.flags, 0);
        assert!(result.rw.iter().all(|v| v.is_nan()));
        assert!(result.iops.iter().all(|v| v.is_nan()));
        assert!(result.rtosa_ratio_min.is_nan());
    }
}

#[test]
fn test_repeated_inversion_is_bit_identical() {
    let inverter = viirs_inverter(&viirs_repository());
    let mut workspace = inverter.workspace();
    let obs = nominal_observation();

    let first = inverter.invert(&mut workspace, &obs, 330.0, 1013.0);
    let second = inverter.invert(&mut workspace, &obs, 330.0, 1013.0);
    let bits = |v: &[f64]| v.iter().map(|x| x.to_bits()).collect::<Vec<_>>();

    assert_eq!(bits(&first.rw), bits(&second.rw));
    assert_eq!(bits(&first.iops), bits(&second.iops));
    assert_eq!(bits(&first.rtosa_out), bits(&second.rtosa_out));
    assert_eq!(first.rtosa_ratio_min.to_bits(), second.rtosa_ratio_min.to_bits());
    assert_eq!(first.flags, second.flags);
}

#[test]
fn test_high_altitude_changes_only_pressure_input() {
    let inverter = viirs_inverter(&viirs_repository());
    let mut workspace = inverter.workspace();
    let mut obs = nominal_observation();
    obs.altitude = 1000.0;

    // 1013 * exp(-0.125) = 894 is still inside the pressure training range
    let result = inverter.invert(&mut workspace, &obs, 330.0, 1013.0);
    assert!(InversionFlags::from_bits(result.flags).valid());
    assert!(!InversionFlags::from_bits(result.flags).tosa_out_of_range());

    // 1013 * exp(-0.5) = 614 is below it
    obs.altitude = 4000.0;
    let result = inverter.invert(&mut workspace, &obs, 330.0, 1013.0);
    assert!(InversionFlags::from_bits(result.flags).tosa_out_of_range());
}

#[test]
fn test_mismatched_network_is_rejected() {
    let sensor = SensorConfig::viirs();
    let mut repo = viirs_repository();
    repo.register(
        &sensor.networks.rw_iop,
        constant_network(&iop_bounds()[..10], &[(0.0, 1.0); 5], 2),
    );
    let result = PixelInverter::from_repository(sensor, InversionParams::default(), &repo);
    assert!(matches!(result, Err(AcError::Configuration(_))));
}

#[test]
fn test_missing_network_is_fatal() {
    let repo = NetworkRepository::in_memory();
    let result = PixelInverter::from_repository(SensorConfig::viirs(), InversionParams::default(), &repo);
    assert!(matches!(result, Err(AcError::ResourceLoad(_))));
}
