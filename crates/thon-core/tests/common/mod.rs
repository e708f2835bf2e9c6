#![allow(dead_code)]

use thon_core::ctf::{Baseline, BaselineCurve, CtfParams, Envelope, Microscope};
use thon_core::pipeline::config::FitConfig;
use thon_core::radial::RadialProfile;
use thon_core::simulate::simulate_spectrum;
use thon_core::spectrum::PowerSpectrum;

/// Pixel size used by most synthetic spectra (A/pixel).
pub const SAMPLING: f64 = 2.2;

/// 300 kV, Cs = 2.7 mm, 0.07 rad amplitude contrast.
pub fn microscope() -> Microscope {
    Microscope::default()
}

/// Parameters with a smooth decaying background and a Gaussian envelope.
pub fn synthetic_params(defocus: f64, deviation: f64, angle_deg: f64) -> CtfParams {
    CtfParams::new(microscope(), defocus)
        .with_astigmatism(deviation, angle_deg.to_radians())
        .with_baseline(Baseline::new(BaselineCurve::DoubleGaussian([
            0.2, 1.0, -40.0, 0.0, -100.0,
        ])))
        .with_envelope(Envelope::Gaussian([0.6, -15.0]))
}

/// Square noise-free spectrum for `params`.
pub fn synthetic_spectrum(params: &CtfParams, size: usize) -> PowerSpectrum {
    simulate_spectrum(params, size, size, SAMPLING).unwrap()
}

/// 1D profile of `n` bins of width `step` built from `f(s)`.
pub fn profile_from<F: Fn(f64) -> f64>(n: usize, step: f64, f: F) -> RadialProfile {
    RadialProfile::new((0..n).map(|i| f(i as f64 * step)).collect(), step)
}

/// Profile `baseline + envelope * ctf^2` of the average defocus in `params`.
pub fn model_profile(params: &CtfParams, n: usize, step: f64) -> RadialProfile {
    let ctf2 = params.ctf2_curve(n, step);
    profile_from(n, step, |s| {
        let i = (s / step).round() as usize;
        params.baseline.evaluate(s) + params.envelope.evaluate(s) * ctf2[i]
    })
}

/// Default fit configuration with a 20-5 A resolution range.
pub fn fit_config() -> FitConfig {
    FitConfig::default()
}
