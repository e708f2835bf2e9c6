mod common;

use std::f64::consts::FRAC_PI_2;

use thon_core::estimate::astigmatism::{astigmatism_measure, fit_astigmatism, AstigmatismSettings};
use thon_core::radial::PolarGrid;

#[test]
fn test_measure_peaks_at_true_astigmatism() {
    let truth = common::synthetic_params(20000.0, 500.0, 30.0);
    let grid = PolarGrid::new(&common::synthetic_spectrum(&truth, 256)).unwrap();
    let angle = truth.astigmatism_angle;

    let at_truth = astigmatism_measure(&grid, &truth, 500.0, angle, 20.0, 5.0);
    let round = astigmatism_measure(&grid, &truth, 0.0, angle, 20.0, 5.0);
    let crossed = astigmatism_measure(&grid, &truth, 500.0, angle + FRAC_PI_2, 20.0, 5.0);

    assert!(at_truth > round, "{at_truth} <= {round}");
    assert!(at_truth > crossed, "{at_truth} <= {crossed}");
}

#[test]
fn test_refiner_recovers_astigmatism() {
    let truth = common::synthetic_params(20000.0, 500.0, 30.0);
    let grid = PolarGrid::new(&common::synthetic_spectrum(&truth, 256)).unwrap();
    let start = truth.clone().with_astigmatism(0.0, 0.0);

    let estimate = fit_astigmatism(&grid, &start, 20.0, 5.0, &AstigmatismSettings::default());
    assert!(
        (400.0..=600.0).contains(&estimate.deviation),
        "deviation {}",
        estimate.deviation
    );
    let angle = estimate.angle.to_degrees();
    assert!((27.0..=33.0).contains(&angle), "angle {angle}");
    assert!(estimate.iterations >= 1);
}

#[test]
fn test_refiner_on_round_spectrum_keeps_angle_normalized() {
    let truth = common::synthetic_params(20000.0, 0.0, 0.0);
    let grid = PolarGrid::new(&common::synthetic_spectrum(&truth, 128)).unwrap();
    let settings = AstigmatismSettings {
        max_iterations: 5,
        ..AstigmatismSettings::default()
    };
    let estimate = fit_astigmatism(&grid, &truth, 20.0, 5.0, &settings);
    assert!(estimate.angle > -FRAC_PI_2 && estimate.angle <= FRAC_PI_2);
    assert!(estimate.deviation >= 0.0);
    assert!(estimate.iterations <= 5);
}

#[test]
fn test_refiner_stops_on_negligible_gain() {
    let truth = common::synthetic_params(20000.0, 500.0, 30.0);
    let grid = PolarGrid::new(&common::synthetic_spectrum(&truth, 256)).unwrap();
    let start = truth.clone().with_astigmatism(0.0, 0.0);

    // Any first improvement is below a huge relative threshold.
    let settings = AstigmatismSettings {
        threshold: 1e9,
        ..AstigmatismSettings::default()
    };
    let estimate = fit_astigmatism(&grid, &start, 20.0, 5.0, &settings);
    assert_eq!(estimate.iterations, 1);
    assert!(estimate.deviation > 0.0);
    assert!(estimate.measure > astigmatism_measure(&grid, &start, 0.0, 0.0, 20.0, 5.0));
}

#[test]
fn test_refiner_keeps_converged_start() {
    let truth = common::synthetic_params(20000.0, 500.0, 30.0);
    let grid = PolarGrid::new(&common::synthetic_spectrum(&truth, 256)).unwrap();

    let estimate = fit_astigmatism(&grid, &truth, 20.0, 5.0, &AstigmatismSettings::default());
    assert!(
        (400.0..=600.0).contains(&estimate.deviation),
        "deviation {}",
        estimate.deviation
    );
    let angle = estimate.angle.to_degrees();
    assert!((27.0..=33.0).contains(&angle), "angle {angle}");
    assert!(estimate.iterations <= AstigmatismSettings::default().max_iterations);
}
