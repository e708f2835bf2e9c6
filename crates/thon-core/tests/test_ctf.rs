mod common;

use std::f64::consts::{FRAC_PI_2, PI};

use thon_core::ctf::{
    clamp_defocus, normalize_angle, Baseline, BaselineCurve, Bump, CtfParams, Envelope,
    EnvelopeFamily, Microscope,
};

#[test]
fn test_zeros_are_roots_of_the_ctf() {
    let params = CtfParams::new(common::microscope(), 20000.0);
    let zeros = params.zeros(0.25);
    assert!(zeros.len() > 10, "expected many zeros, got {}", zeros.len());
    for (n, &z) in zeros.iter().enumerate() {
        let phase = params.phase_for_defocus(z * z, 20000.0);
        assert!(
            (phase + (n + 1) as f64 * PI).abs() < 1e-9,
            "zero {n} at {z} has phase {phase}"
        );
    }
    assert!(zeros.windows(2).all(|w| w[0] < w[1]));
    assert!(zeros.iter().all(|&z| z <= 0.25));
}

#[test]
fn test_zeros_without_spherical_aberration() {
    let microscope = Microscope {
        cs: 0.0,
        ..Microscope::default()
    };
    let params = CtfParams::new(microscope, 10000.0);
    let lambda = params.wavelength();
    let zeros = params.zeros(0.3);
    for (n, &z) in zeros.iter().enumerate() {
        let expected = (((n + 1) as f64 * PI - 0.07) / (PI * lambda * 10000.0)).sqrt();
        assert!((z - expected).abs() < 1e-12);
    }
}

#[test]
fn test_no_zeros_for_nonpositive_defocus() {
    let params = CtfParams::new(common::microscope(), 0.0);
    assert!(params.zeros(0.5).is_empty());
    assert!(params.maxima(0.5).is_empty());
}

#[test]
fn test_maxima_between_zeros() {
    let params = CtfParams::new(common::microscope(), 15000.0);
    let zeros = params.zeros(0.2);
    let maxima = params.maxima(0.2);
    assert_eq!(maxima.len(), zeros.len());
    assert!((maxima[0] - 0.75 * zeros[0]).abs() < 1e-15);
    assert!((maxima[1] - 0.5 * (zeros[0] + zeros[1])).abs() < 1e-15);
}

#[test]
fn test_defocus_along_axes() {
    let params = CtfParams::new(common::microscope(), 20000.0).with_astigmatism(500.0, 0.3);
    assert!((params.defocus_at(0.3) - 20500.0).abs() < 1e-9);
    assert!((params.defocus_at(0.3 + FRAC_PI_2) - 19500.0).abs() < 1e-9);
}

#[test]
fn test_negative_deviation_rotates_axis() {
    let params = CtfParams::new(common::microscope(), 20000.0).with_astigmatism(-300.0, 0.2);
    assert_eq!(params.defocus_deviation, 300.0);
    assert!((params.astigmatism_angle - normalize_angle(0.2 + FRAC_PI_2)).abs() < 1e-12);
    assert!(params.astigmatism_angle > -FRAC_PI_2 && params.astigmatism_angle <= FRAC_PI_2);
}

#[test]
fn test_ctf_at_origin_is_amplitude_contrast() {
    let params = CtfParams::new(common::microscope(), 20000.0);
    assert!((params.calculate(0.0, 0.0) + 0.07_f64.sin()).abs() < 1e-12);
}

#[test]
fn test_clamp_defocus() {
    assert_eq!(clamp_defocus(-5.0), 1.0);
    assert_eq!(clamp_defocus(3e5), 2e5);
    assert_eq!(clamp_defocus(12345.0), 12345.0);
}

#[test]
fn test_baseline_equation_string() {
    let baseline = Baseline::new(BaselineCurve::Eman([0.5, 2.0, -3.0, -10.0]));
    assert_eq!(baseline.to_string(), "0.5000 + 2.000*exp(-3.000*sqrt(s) + -10.00*s^2)");

    let with_bump = Baseline::default().with_bump(Some(Bump {
        amplitude: 0.1,
        location: 0.265,
        sharpness: -1000.0,
    }));
    assert!(with_bump.to_string().ends_with("+ 0.1000*exp(-1000*(s-0.2650)^2)"));
}

#[test]
fn test_envelope_family_round_trip() {
    for family in [
        EnvelopeFamily::Gaussian,
        EnvelopeFamily::GaussianWithConstant,
        EnvelopeFamily::DoubleGaussian,
        EnvelopeFamily::DoubleGaussianWithConstant,
    ] {
        let env = Envelope::from_general(family, [0.1, 1.0, -20.0, 0.3, -200.0]);
        assert_eq!(env.family(), family);
    }
}

#[test]
fn test_params_serde_roundtrip() {
    let params = common::synthetic_params(18000.0, 250.0, 15.0);
    let json = serde_json::to_string(&params).unwrap();
    let restored: CtfParams = serde_json::from_str(&json).unwrap();
    assert_eq!(restored, params);

    let text = toml::to_string_pretty(&params).unwrap();
    let restored: CtfParams = toml::from_str(&text).unwrap();
    assert_eq!(restored, params);
}
