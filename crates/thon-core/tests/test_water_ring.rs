mod common;

use approx::assert_abs_diff_eq;
use ndarray::Array2;
use thon_core::estimate::water_ring::{
    fit_water_ring, fit_water_ring_ellipse, water_ring_index, WaterRingBands,
};
use thon_core::fit::SimplexSettings;
use thon_core::radial::PolarGrid;
use thon_core::spectrum::PowerSpectrum;

const RING: f64 = 1.0 / 3.8;

fn ring_profile() -> thon_core::radial::RadialProfile {
    common::profile_from(200, 0.0025, |s| {
        let d = (s - RING) / 0.012;
        1.0 + 0.5 * (-0.5 * d * d).exp()
    })
}

/// 256x256 spectrum at 1 A/pixel with a ring at `RING + ellipticity*cos(2(theta - angle))`.
fn elliptical_ring_spectrum(ellipticity: f64, angle_deg: f64) -> PowerSpectrum {
    let size = 256;
    let angle = angle_deg.to_radians();
    let data = Array2::from_shape_fn((size, size), |(y, x)| {
        let dx = x as f64 - (size / 2) as f64;
        let dy = y as f64 - (size / 2) as f64;
        let s = dx.hypot(dy) / size as f64;
        let theta = dy.atan2(dx);
        let location = RING + ellipticity * (2.0 * (theta - angle)).cos();
        let d = (s - location) / 0.012;
        (1.0 + 0.5 * (-0.5 * d * d).exp()) as f32
    });
    PowerSpectrum::new(data, 1.0).unwrap()
}

#[test]
fn test_flat_profile_has_no_ring() {
    let profile = common::profile_from(200, 0.0025, |_| 1.0);
    assert_abs_diff_eq!(
        water_ring_index(&profile, &WaterRingBands::default()),
        0.0,
        epsilon = 1e-12
    );
}

#[test]
fn test_ring_raises_index() {
    let index = water_ring_index(&ring_profile(), &WaterRingBands::default());
    assert!(index > 0.05, "index {index}");
}

#[test]
fn test_uncovered_bands_give_zero() {
    let profile = common::profile_from(50, 0.0025, |s| 1.0 + s);
    assert_eq!(water_ring_index(&profile, &WaterRingBands::default()), 0.0);
    assert!(
        fit_water_ring(&profile, &WaterRingBands::default(), &SimplexSettings::default())
            .is_none()
    );
}

#[test]
fn test_fit_locates_ring() {
    let fit = fit_water_ring(
        &ring_profile(),
        &WaterRingBands::default(),
        &SimplexSettings::default(),
    )
    .unwrap();
    assert_abs_diff_eq!(fit.location, RING, epsilon = 0.005);
    assert_abs_diff_eq!(fit.resolution(), 3.8, epsilon = 0.1);
    assert!(fit.amplitude > 0.35 && fit.amplitude < 0.65);
    assert!(fit.residual < 0.05);
}

#[test]
fn test_ellipse_recovers_distortion() {
    let grid = PolarGrid::new(&elliptical_ring_spectrum(0.008, 20.0)).unwrap();
    let fit = fit_water_ring_ellipse(&grid, &WaterRingBands::default(), &SimplexSettings::default())
        .unwrap();
    assert_abs_diff_eq!(fit.ring.location, RING, epsilon = 0.003);
    assert_abs_diff_eq!(fit.ellipticity, 0.008, epsilon = 0.003);
    assert_abs_diff_eq!(fit.angle.to_degrees(), 20.0, epsilon = 5.0);
    assert!(fit.ring.amplitude > 0.3 && fit.ring.amplitude < 0.7);
}

#[test]
fn test_round_ring_has_no_ellipticity() {
    let grid = PolarGrid::new(&elliptical_ring_spectrum(0.0, 0.0)).unwrap();
    let fit = fit_water_ring_ellipse(&grid, &WaterRingBands::default(), &SimplexSettings::default())
        .unwrap();
    assert_abs_diff_eq!(fit.ring.location, RING, epsilon = 0.003);
    assert!(fit.ellipticity < 0.002, "ellipticity {}", fit.ellipticity);
}

#[test]
fn test_ellipse_needs_ring_band() {
    let data = Array2::from_elem((64, 64), 1.0_f32);
    let grid = PolarGrid::new(&PowerSpectrum::new(data, 4.0).unwrap()).unwrap();
    assert!(
        fit_water_ring_ellipse(&grid, &WaterRingBands::default(), &SimplexSettings::default())
            .is_none()
    );
}
