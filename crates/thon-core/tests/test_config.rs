mod common;

use thon_core::ctf::{BaselineFamily, EnvelopeFamily};
use thon_core::pipeline::config::FitConfig;
use thon_core::pipeline::FitStage;

#[test]
fn test_default_config() {
    let config = FitConfig::default();
    assert_eq!(config.resolution.lores, 20.0);
    assert_eq!(config.resolution.hires, 5.0);
    assert_eq!(config.microscope.voltage, 300000.0);
    assert_eq!(config.baseline.family, BaselineFamily::Polynomial);
    assert_eq!(
        config.envelope.family,
        EnvelopeFamily::DoubleGaussianWithConstant
    );
    assert_eq!(config.iteration.max_rounds, 10);
    assert!(config.astigmatism.enabled);
    assert!(config.validate().is_ok());
}

#[test]
fn test_toml_roundtrip() {
    let mut config = FitConfig::default();
    config.resolution.hires = 3.5;
    config.baseline.family = BaselineFamily::Eman;
    config.baseline.bump = true;
    config.envelope.family = EnvelopeFamily::Gaussian;
    config.simplex.seed = 7;

    let text = toml::to_string_pretty(&config).unwrap();
    let restored: FitConfig = toml::from_str(&text).unwrap();
    assert_eq!(restored, config);
}

#[test]
fn test_partial_toml_fills_defaults() {
    let text = r#"
[resolution]
hires = 4.0

[baseline]
family = "double_gaussian"

[iteration]
keep_curves = true
"#;
    let config: FitConfig = toml::from_str(text).unwrap();
    assert_eq!(config.resolution.hires, 4.0);
    assert_eq!(config.resolution.lores, 20.0);
    assert_eq!(config.baseline.family, BaselineFamily::DoubleGaussian);
    assert!(!config.baseline.bump);
    assert!(config.iteration.keep_curves);
    assert_eq!(config.iteration.max_rounds, 10);
    assert_eq!(config.defocus, FitConfig::default().defocus);
}

#[test]
fn test_json_roundtrip() {
    let config = FitConfig::default();
    let json = serde_json::to_string(&config).unwrap();
    let restored: FitConfig = serde_json::from_str(&json).unwrap();
    assert_eq!(restored, config);
}

#[test]
fn test_validate_rejects_bad_defocus_search() {
    let mut config = FitConfig::default();
    config.defocus.start = 5e5;
    config.defocus.end = 6e5;
    assert!(config.validate().is_err());

    let mut config = FitConfig::default();
    config.defocus.divisor = 1.0;
    assert!(config.validate().is_err());
}

#[test]
fn test_seed_uses_config_microscope() {
    let mut config = FitConfig::default();
    config.microscope.voltage = 200000.0;
    let seed = config.seed(12000.0);
    assert_eq!(seed.microscope.voltage, 200000.0);
    assert_eq!(seed.defocus_average, 12000.0);
    assert_eq!(seed.defocus_deviation, 0.0);
}

#[test]
fn test_stage_names() {
    assert_eq!(FitStage::DefocusCoarse.to_string(), "Searching defocus");
    assert_eq!(FitStage::Converged.to_string(), "Converged");
    assert_eq!(BaselineFamily::Eman.to_string(), "EMAN");
    assert_eq!(
        EnvelopeFamily::GaussianWithConstant.to_string(),
        "gaussian + constant"
    );
}
