mod common;

use approx::assert_abs_diff_eq;
use ndarray::{Array2, Array3};
use thon_core::error::CtfError;
use thon_core::radial::{radial_average, PolarGrid, RadialProfile};
use thon_core::spectrum::PowerSpectrum;

fn mean_abs_diff(a: &RadialProfile, b: &RadialProfile, lo: usize, hi: usize) -> f64 {
    (lo..hi)
        .map(|i| (a.values[i] - b.values[i]).abs())
        .sum::<f64>()
        / (hi - lo) as f64
}

#[test]
fn test_constant_spectrum_gives_constant_profile() {
    let spectrum = PowerSpectrum::new(Array2::from_elem((64, 64), 1.0f32), 2.0).unwrap();
    let params = common::synthetic_params(20000.0, 400.0, 45.0);
    let profile = radial_average(&spectrum, &params).unwrap();
    assert_eq!(profile.len(), 32);
    for &v in &profile.values {
        assert_abs_diff_eq!(v, 1.0, epsilon = 1e-9);
    }
    assert_abs_diff_eq!(profile.step, 1.0 / 128.0, epsilon = 1e-15);
}

#[test]
fn test_zero_deviation_ignores_angle() {
    let params = common::synthetic_params(20000.0, 0.0, 0.0);
    let spectrum = common::synthetic_spectrum(&params, 128);
    let grid = PolarGrid::new(&spectrum).unwrap();
    let a = grid.average(20000.0, 0.0, 0.0);
    let b = grid.average(20000.0, 0.0, 1.1);
    assert_eq!(a, b);
}

#[test]
fn test_correction_realigns_astigmatic_rings() {
    let astigmatic = common::synthetic_params(20000.0, 500.0, 30.0);
    let round = common::synthetic_params(20000.0, 0.0, 0.0);
    let reference = radial_average(&common::synthetic_spectrum(&round, 256), &round).unwrap();

    let grid = PolarGrid::new(&common::synthetic_spectrum(&astigmatic, 256)).unwrap();
    let corrected = grid.average_for(&astigmatic);
    let uncorrected = grid.average(20000.0, 0.0, 0.0);

    let good = mean_abs_diff(&corrected, &reference, 20, 110);
    let bad = mean_abs_diff(&uncorrected, &reference, 20, 110);
    assert!(
        good < 0.5 * bad,
        "corrected diff {good} should be well below uncorrected {bad}"
    );
}

#[test]
fn test_volume_is_averaged_isotropically() {
    let volume = Array3::from_elem((8, 8, 8), 2.0f32);
    let spectrum = PowerSpectrum::from_volume(volume, 1.5).unwrap();
    let grid = PolarGrid::new(&spectrum).unwrap();
    let profile = grid.average(20000.0, 800.0, 0.4);
    assert_eq!(profile.len(), 4);
    for &v in &profile.values {
        assert_abs_diff_eq!(v, 2.0, epsilon = 1e-9);
    }
}

#[test]
fn test_emptied_spectrum_is_rejected() {
    let mut spectrum = PowerSpectrum::new(Array2::from_elem((16, 16), 1.0f32), 2.0).unwrap();
    spectrum.data = Array3::zeros((0, 0, 0));
    let params = common::synthetic_params(20000.0, 0.0, 0.0);
    assert!(matches!(
        radial_average(&spectrum, &params),
        Err(CtfError::EmptySpectrum)
    ));
}

#[test]
fn test_spectrum_validation() {
    assert!(matches!(
        PowerSpectrum::new(Array2::zeros((0, 0)), 2.0),
        Err(CtfError::EmptySpectrum)
    ));
    assert!(matches!(
        PowerSpectrum::new(Array2::zeros((1, 8)), 2.0),
        Err(CtfError::InvalidDimensions { .. })
    ));
    assert!(matches!(
        PowerSpectrum::new(Array2::zeros((8, 8)), 0.0),
        Err(CtfError::InvalidSampling(_))
    ));
}

#[test]
fn test_profile_bin_range() {
    let profile = common::profile_from(128, 1.0 / 563.2, |_| 1.0);
    let (lo, hi) = profile.bin_range(20.0, 5.0);
    assert_eq!(lo, 28);
    assert_eq!(hi, 112);
    assert_eq!(profile.bin(1.0), 127);
    let (lo, hi) = profile.bin_range(5.0, 20.0);
    assert!(lo <= hi);
}
