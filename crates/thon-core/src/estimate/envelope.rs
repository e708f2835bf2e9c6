use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::consts::MIN_ENVELOPE_ZEROS;
use crate::ctf::{CtfParams, Envelope, EnvelopeFamily};
use crate::fit::{fit_polynomial, Simplex, SimplexSettings};
use crate::radial::RadialProfile;

use super::{kernel_half_width, window_max};

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EnvelopeSettings {
    pub family: EnvelopeFamily,
}

#[derive(Clone, Debug, PartialEq)]
pub struct EnvelopeEstimate {
    pub envelope: Envelope,
    /// Relative RMS residual against the envelope samples.
    pub residual: f64,
    pub samples: usize,
}

/// Fit the decay envelope of the CTF oscillation in `profile`, using the
/// baseline already in `params`.
///
/// Samples are the peak heights above the baseline between successive CTF
/// zeros. Returns `None` when there are fewer than five zeros or too few
/// usable samples.
pub fn fit_envelope(
    profile: &RadialProfile,
    params: &CtfParams,
    lores: f64,
    hires: f64,
    settings: &EnvelopeSettings,
    simplex: &SimplexSettings,
) -> Option<EnvelopeEstimate> {
    let (x, y) = envelope_samples(profile, params, lores, hires);
    let family = settings.family;
    let active = active_coefficients(family);
    if x.len() < 3 {
        debug!(samples = x.len(), "Too few envelope samples");
        return None;
    }

    let vmax = y.iter().cloned().fold(0.0_f64, f64::max);
    let (amplitude, decay) = log_linear_start(&x, &y);
    let start = [
        0.0,
        amplitude.clamp(0.0, 5.0 * vmax),
        decay,
        0.1 * amplitude.clamp(0.0, 5.0 * vmax),
        10.0 * decay,
    ];
    let bounds = [
        (0.0, vmax),
        (0.0, 5.0 * vmax),
        (-1e3, -0.1),
        (0.0, 5.0 * vmax),
        (-1e4, -0.1),
    ];

    let mut solver = Simplex::new(active.iter().map(|&i| start[i]).collect(), simplex)
        .with_bounds(&active.iter().map(|&i| bounds[i]).collect::<Vec<_>>());
    let expand = |p: &[f64]| {
        let mut c = [0.0; 5];
        for (&i, &v) in active.iter().zip(p) {
            c[i] = v;
        }
        c
    };
    let residual = solver.run(&|p: &[f64]| {
        let env = Envelope::from_general(family, expand(p));
        relative_rms(&x, &y, |s| env.evaluate(s))
    });
    let envelope = Envelope::from_general(family, expand(solver.params()));

    debug!(family = %family, residual, samples = x.len(), "Envelope fitted");
    Some(EnvelopeEstimate {
        envelope,
        residual,
        samples: x.len(),
    })
}

/// Envelope samples `(s, peak above baseline)` at the midpoints between
/// successive zeros inside the resolution range, taking the largest excess
/// within a small kernel around each midpoint.
pub fn envelope_samples(
    profile: &RadialProfile,
    params: &CtfParams,
    lores: f64,
    hires: f64,
) -> (Vec<f64>, Vec<f64>) {
    let nyquist = profile.frequency(profile.len().saturating_sub(1));
    let zeros = params.zeros(nyquist);
    let mut x = Vec::new();
    let mut y = Vec::new();
    if zeros.len() < MIN_ENVELOPE_ZEROS {
        return (x, y);
    }
    let excess: Vec<f64> = profile
        .iter()
        .map(|(s, v)| v - params.baseline.evaluate(s))
        .collect();
    let k = kernel_half_width(profile.len(), 1);
    for pair in zeros.windows(2) {
        let mid = 0.5 * (pair[0] + pair[1]);
        if mid < 1.0 / lores || mid > 1.0 / hires {
            continue;
        }
        if let Some((_, peak)) = window_max(&excess, profile.bin(mid), k) {
            if peak.is_finite() && peak > 0.0 {
                x.push(mid);
                y.push(peak);
            }
        }
    }
    (x, y)
}

/// Indices into the general five-term form that a family fits.
fn active_coefficients(family: EnvelopeFamily) -> Vec<usize> {
    match family {
        EnvelopeFamily::Gaussian => vec![1, 2],
        EnvelopeFamily::GaussianWithConstant => vec![0, 1, 2],
        EnvelopeFamily::DoubleGaussian => vec![1, 2, 3, 4],
        EnvelopeFamily::DoubleGaussianWithConstant => vec![0, 1, 2, 3, 4],
    }
}

/// Starting amplitude and decay from a straight line fit of `ln(y)` against `s^2`.
fn log_linear_start(x: &[f64], y: &[f64]) -> (f64, f64) {
    let s2: Vec<f64> = x.iter().map(|s| s * s).collect();
    let ln: Vec<f64> = y.iter().map(|v| v.max(f64::MIN_POSITIVE).ln()).collect();
    match fit_polynomial(&s2, &ln, 1) {
        Ok(fit) => (
            fit.coefficients[0].exp(),
            fit.coefficients[1].clamp(-1e3, -0.1),
        ),
        Err(_) => (y.first().copied().unwrap_or(1.0), -10.0),
    }
}

/// RMS of `1 - model/y`, so every sample weighs the same regardless of its
/// magnitude.
fn relative_rms<F: Fn(f64) -> f64>(x: &[f64], y: &[f64], model: F) -> f64 {
    let mut ss = 0.0;
    let mut n = 0usize;
    for (&xi, &yi) in x.iter().zip(y) {
        if yi > 0.0 {
            ss += (1.0 - model(xi) / yi).powi(2);
            n += 1;
        }
    }
    if n == 0 {
        0.0
    } else {
        (ss / n as f64).sqrt()
    }
}
