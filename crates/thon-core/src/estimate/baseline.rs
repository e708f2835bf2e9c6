use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::consts::{BUMP_BAND, BUMP_FLANK, BUMP_HIRES_LIMIT, DEFAULT_BUMP_LOCATION, MIN_BASELINE_ZEROS};
use crate::ctf::{Baseline, BaselineCurve, BaselineFamily, Bump, CtfParams};
use crate::fit::{fit_polynomial, moving_average, Simplex, SimplexSettings};
use crate::radial::RadialProfile;

use super::{kernel_half_width, window_min};

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BaselineSettings {
    pub family: BaselineFamily,
    /// Model the water ring with a Gaussian bump (only when hires < 3 A).
    pub bump: bool,
    /// Starting location of the bump (1/A).
    pub bump_location: f64,
}

impl Default for BaselineSettings {
    fn default() -> Self {
        Self {
            family: BaselineFamily::Polynomial,
            bump: false,
            bump_location: DEFAULT_BUMP_LOCATION,
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct BaselineEstimate {
    pub baseline: Baseline,
    /// RMS residual of the curve against the anchor points.
    pub residual: f64,
    /// Number of anchor points used.
    pub samples: usize,
}

/// Fit the smooth background of `profile`.
///
/// Anchor points are the profile minima near the CTF zeros inside the
/// resolution range when there are enough zeros, otherwise the minima of
/// the profile after removing a moving average. Returns `None` when there
/// are too few anchor points to fit anything.
pub fn fit_baseline(
    profile: &RadialProfile,
    params: &CtfParams,
    lores: f64,
    hires: f64,
    settings: &BaselineSettings,
    simplex: &SimplexSettings,
) -> Option<BaselineEstimate> {
    let (x, mut y) = baseline_samples(profile, params, lores, hires);
    if x.len() < 2 {
        debug!(samples = x.len(), "Too few baseline anchor points");
        return None;
    }

    let bump = if settings.bump && hires <= BUMP_HIRES_LIMIT {
        fit_bump(&x, &y, settings.bump_location, simplex)
    } else {
        None
    };
    if let Some(bump) = bump {
        for (yi, &xi) in y.iter_mut().zip(&x) {
            *yi -= bump.evaluate(xi);
        }
    }

    let (curve, residual) = match settings.family {
        BaselineFamily::Polynomial => {
            let fit = fit_polynomial(&x, &y, 4).ok()?;
            let mut c = [0.0; 5];
            c.copy_from_slice(&fit.coefficients[..5]);
            (BaselineCurve::Polynomial(c), fit.residual)
        }
        BaselineFamily::DoubleGaussian => fit_double_gaussian(&x, &y, simplex),
        BaselineFamily::Eman => fit_eman(&x, &y, simplex),
    };

    debug!(family = %settings.family, residual, samples = x.len(), "Baseline fitted");
    Some(BaselineEstimate {
        baseline: Baseline::new(curve).with_bump(bump),
        residual,
        samples: x.len(),
    })
}

/// Anchor points `(s, intensity)` for the baseline fit.
pub fn baseline_samples(
    profile: &RadialProfile,
    params: &CtfParams,
    lores: f64,
    hires: f64,
) -> (Vec<f64>, Vec<f64>) {
    let values = &profile.values;
    let n = values.len();
    let mut x = Vec::new();
    let mut y = Vec::new();
    if n == 0 {
        return (x, y);
    }

    let zeros: Vec<f64> = params
        .zeros(1.0 / hires)
        .into_iter()
        .filter(|&z| z >= 1.0 / lores)
        .collect();

    if zeros.len() >= MIN_BASELINE_ZEROS {
        let k = kernel_half_width(n, 1);
        let mut last = None;
        for z in zeros {
            if let Some((j, v)) = window_min(values, profile.bin(z), k) {
                if last != Some(j) {
                    x.push(profile.frequency(j));
                    y.push(v);
                    last = Some(j);
                }
            }
        }
    } else {
        let (lo, hi) = profile.bin_range(lores, hires);
        let smooth = moving_average(values, (n / 10).max(3));
        let width = ((hi - lo) / 10).max(1);
        let mut start = lo;
        while start <= hi {
            let end = (start + width).min(hi + 1);
            let best = (start..end).min_by(|&a, &b| {
                (values[a] - smooth[a]).total_cmp(&(values[b] - smooth[b]))
            });
            if let Some(j) = best {
                x.push(profile.frequency(j));
                y.push(values[j]);
            }
            start = end;
        }
    }
    (x, y)
}

fn rms<F: Fn(f64) -> f64>(x: &[f64], y: &[f64], model: F) -> f64 {
    if x.is_empty() {
        return 0.0;
    }
    let ss: f64 = x.iter().zip(y).map(|(&xi, &yi)| (model(xi) - yi).powi(2)).sum();
    (ss / x.len() as f64).sqrt()
}

fn extent(y: &[f64]) -> (f64, f64) {
    y.iter()
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &v| (lo.min(v), hi.max(v)))
}

fn fit_double_gaussian(x: &[f64], y: &[f64], settings: &SimplexSettings) -> (BaselineCurve, f64) {
    let (ymin, ymax) = extent(y);
    let ymax = ymax.max(0.0);
    let drop = (y[0] - ymin).max(0.0);
    let mut simplex = Simplex::new(
        vec![ymin.max(0.0), 0.9 * drop, -20.0, 0.1 * drop, -200.0],
        settings,
    )
    .with_bounds(&[
        (0.0, ymax),
        (0.0, 10.0 * ymax),
        (-1e3, 0.0),
        (0.0, 10.0 * ymax),
        (-1e4, 0.0),
    ]);
    let residual = simplex.run(&|p: &[f64]| {
        rms(x, y, |s| {
            let s2 = s * s;
            p[0] + p[1] * (p[2] * s2).exp() + p[3] * (p[4] * s2).exp()
        })
    });
    let p = simplex.params();
    (
        BaselineCurve::DoubleGaussian([p[0], p[1], p[2], p[3], p[4]]),
        residual,
    )
}

fn fit_eman(x: &[f64], y: &[f64], settings: &SimplexSettings) -> (BaselineCurve, f64) {
    let (ymin, ymax) = extent(y);
    let ymax = ymax.max(0.0);
    let mut simplex = Simplex::new(vec![ymin.max(0.0), (ymax - ymin).max(0.0), 0.0, -10.0], settings)
        .with_bounds(&[
            (0.0, 2.0 * ymax),
            (0.0, 1e3 * ymax),
            (-100.0, 100.0),
            (-100.0, 0.0),
        ]);
    let residual = simplex.run(&|p: &[f64]| {
        rms(x, y, |s| p[0] + p[1] * (p[2] * s.sqrt() + p[3] * s * s).exp())
    });
    let p = simplex.params();
    (BaselineCurve::Eman([p[0], p[1], p[2], p[3]]), residual)
}

/// Gaussian bump over the water ring band, measured against a straight
/// line through the flanking anchor points.
fn fit_bump(x: &[f64], y: &[f64], location: f64, settings: &SimplexSettings) -> Option<Bump> {
    let [band_lo, band_hi] = BUMP_BAND;
    let (mut fx, mut fy, mut rx, mut ry) = (Vec::new(), Vec::new(), Vec::new(), Vec::new());
    for (&xi, &yi) in x.iter().zip(y) {
        if (band_lo..=band_hi).contains(&xi) {
            rx.push(xi);
            ry.push(yi);
        } else if xi >= band_lo - BUMP_FLANK && xi <= band_hi + BUMP_FLANK {
            fx.push(xi);
            fy.push(yi);
        }
    }
    if fx.len() < 2 || rx.len() < 3 {
        debug!(flank = fx.len(), band = rx.len(), "Too few points for baseline bump");
        return None;
    }

    let trend = fit_polynomial(&fx, &fy, 1).ok()?;
    let excess: Vec<f64> = rx.iter().zip(&ry).map(|(&xi, &yi)| yi - trend.evaluate(xi)).collect();
    let peak = excess.iter().cloned().fold(0.0_f64, f64::max);
    if peak <= 0.0 {
        return None;
    }

    let mut simplex = Simplex::new(vec![peak, location, -1000.0], settings).with_bounds(&[
        (0.0, 2.0 * peak),
        (band_lo, band_hi),
        (-1e4, -100.0),
    ]);
    simplex.run(&|p: &[f64]| {
        let bump = Bump {
            amplitude: p[0],
            location: p[1],
            sharpness: p[2],
        };
        rms(&rx, &excess, |s| bump.evaluate(s))
    });
    let p = simplex.params();
    Some(Bump {
        amplitude: p[0],
        location: p[1],
        sharpness: p[2],
    })
}
