mod common;

use approx::assert_abs_diff_eq;
use thon_core::ctf::{Baseline, BaselineCurve, BaselineFamily, CtfParams};
use thon_core::estimate::baseline::{baseline_samples, fit_baseline, BaselineSettings};
use thon_core::fit::SimplexSettings;

const POLY: [f64; 5] = [1.2, -3.0, 8.0, -10.0, 5.0];

fn poly(s: f64) -> f64 {
    BaselineCurve::Polynomial(POLY).evaluate(s)
}

fn fit_poly_for_defocus(defocus: f64) {
    let profile = common::profile_from(128, 1.0 / 563.2, poly);
    let params = CtfParams::new(common::microscope(), defocus);
    let estimate = fit_baseline(
        &profile,
        &params,
        20.0,
        5.0,
        &BaselineSettings::default(),
        &SimplexSettings::default(),
    )
    .unwrap();
    assert_eq!(estimate.baseline.family(), BaselineFamily::Polynomial);
    assert!(estimate.baseline.bump.is_none());
    assert!(estimate.samples >= 5);
    for s in [0.06, 0.1, 0.15, 0.19] {
        assert_abs_diff_eq!(estimate.baseline.evaluate(s), poly(s), epsilon = 1e-6);
    }
    assert!(estimate.residual < 1e-6);
}

#[test]
fn test_polynomial_from_zero_anchors() {
    fit_poly_for_defocus(20000.0);
}

#[test]
fn test_polynomial_without_enough_zeros() {
    let params = CtfParams::new(common::microscope(), 3000.0);
    let zeros: Vec<f64> = params
        .zeros(0.2)
        .into_iter()
        .filter(|&z| z >= 0.05)
        .collect();
    assert!(zeros.len() < 4);
    fit_poly_for_defocus(3000.0);
}

#[test]
fn test_anchor_points_sit_at_zeros() {
    let params = common::synthetic_params(20000.0, 0.0, 0.0);
    let profile = common::model_profile(&params, 512, 0.25 / 512.0);
    let (x, y) = baseline_samples(&profile, &params, 20.0, 5.0);
    assert!(x.len() >= 10);
    assert!(x.windows(2).all(|w| w[0] < w[1]));
    for (&s, &v) in x.iter().zip(&y) {
        assert!(s >= 0.045 && s <= 0.205, "anchor at {s}");
        assert!((v - params.baseline.evaluate(s)).abs() < 0.01);
    }
}

#[test]
fn test_double_gaussian_family() {
    let params = common::synthetic_params(20000.0, 0.0, 0.0);
    let profile = common::model_profile(&params, 512, 0.25 / 512.0);
    let settings = BaselineSettings {
        family: BaselineFamily::DoubleGaussian,
        ..BaselineSettings::default()
    };
    let seed = params.clone().with_baseline(Baseline::default());
    let estimate = fit_baseline(
        &profile,
        &seed,
        20.0,
        5.0,
        &settings,
        &SimplexSettings::default(),
    )
    .unwrap();
    assert_eq!(estimate.baseline.family(), BaselineFamily::DoubleGaussian);
    assert!(estimate.residual < 0.02, "residual {}", estimate.residual);
    for s in [0.08, 0.12, 0.16] {
        assert_abs_diff_eq!(
            estimate.baseline.evaluate(s),
            params.baseline.evaluate(s),
            epsilon = 0.03
        );
    }
}

#[test]
fn test_eman_family() {
    let truth = BaselineCurve::Eman([0.2, 1.5, -2.0, -20.0]);
    let profile = common::profile_from(128, 1.0 / 563.2, |s| truth.evaluate(s));
    let params = CtfParams::new(common::microscope(), 20000.0);
    let settings = BaselineSettings {
        family: BaselineFamily::Eman,
        ..BaselineSettings::default()
    };
    let estimate = fit_baseline(
        &profile,
        &params,
        20.0,
        5.0,
        &settings,
        &SimplexSettings::default(),
    )
    .unwrap();
    assert_eq!(estimate.baseline.family(), BaselineFamily::Eman);
    assert!(estimate.residual < 1e-3, "residual {}", estimate.residual);
    for s in [0.06, 0.1, 0.15, 0.19] {
        assert_abs_diff_eq!(estimate.baseline.evaluate(s), truth.evaluate(s), epsilon = 1e-3);
    }
}

#[test]
fn test_bump_over_water_ring() {
    let curve = BaselineCurve::Polynomial([1.0, -2.0, 1.5, 0.0, 0.0]);
    let truth = |s: f64| {
        let d = s - 0.265;
        curve.evaluate(s) + 0.3 * (-3000.0 * d * d).exp()
    };
    let profile = common::profile_from(200, 0.002, truth);
    let params = CtfParams::new(common::microscope(), 20000.0);
    let settings = BaselineSettings {
        bump: true,
        ..BaselineSettings::default()
    };

    let estimate = fit_baseline(
        &profile,
        &params,
        20.0,
        2.6,
        &settings,
        &SimplexSettings::default(),
    )
    .unwrap();
    let bump = estimate.baseline.bump.expect("bump fitted");
    assert!(
        (0.255..=0.275).contains(&bump.location),
        "location {}",
        bump.location
    );
    assert!(bump.amplitude > 0.15 && bump.amplitude < 0.45);

    let without = fit_baseline(
        &profile,
        &params,
        20.0,
        5.0,
        &settings,
        &SimplexSettings::default(),
    )
    .unwrap();
    assert!(without.baseline.bump.is_none());
}

#[test]
fn test_empty_profile_yields_nothing() {
    let profile = common::profile_from(0, 0.01, |_| 1.0);
    let params = CtfParams::new(common::microscope(), 20000.0);
    assert!(fit_baseline(
        &profile,
        &params,
        20.0,
        5.0,
        &BaselineSettings::default(),
        &SimplexSettings::default(),
    )
    .is_none());
}
