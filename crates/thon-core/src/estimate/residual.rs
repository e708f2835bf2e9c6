use tracing::debug;

use crate::ctf::CtfParams;
use crate::radial::RadialProfile;

/// Relative residual of the full model `baseline + envelope * ctf^2` against
/// `profile` over the resolution range:
/// `sqrt(sum((b + e*c2 - p)^2) / sum((b + e)^2))`. Lower is better.
pub fn fit_residual(profile: &RadialProfile, params: &CtfParams, lores: f64, hires: f64) -> f64 {
    let (lo, hi) = profile.bin_range(lores, hires);
    if profile.is_empty() {
        return 0.0;
    }
    let mut num = 0.0;
    let mut den = 0.0;
    for i in lo..=hi {
        let s = profile.frequency(i);
        let b = params.baseline.evaluate(s);
        let e = params.envelope.evaluate(s);
        let c2 = params
            .phase_for_defocus(s * s, params.defocus_average)
            .sin()
            .powi(2);
        num += (b + e * c2 - profile.values[i]).powi(2);
        den += (b + e).powi(2);
    }
    if den <= 0.0 {
        debug!("Model is zero over the fit range");
        return 0.0;
    }
    (num / den).sqrt()
}
