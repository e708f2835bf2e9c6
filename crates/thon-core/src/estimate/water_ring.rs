use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::consts::{DEFAULT_BUMP_LOCATION, DEFAULT_WATER_RING_BANDS, EPSILON};
use crate::ctf::normalize_angle;
use crate::fit::{fit_polynomial, PolynomialFit, Simplex, SimplexSettings};
use crate::radial::{PolarGrid, RadialProfile};

/// Spatial frequency bands (1/A) for the water ring index: background from
/// `low..ring_low` and `ring_high..high`, ring from `ring_low..=ring_high`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WaterRingBands {
    pub low: f64,
    pub ring_low: f64,
    pub ring_high: f64,
    pub high: f64,
}

impl Default for WaterRingBands {
    fn default() -> Self {
        let [low, ring_low, ring_high, high] = DEFAULT_WATER_RING_BANDS;
        Self {
            low,
            ring_low,
            ring_high,
            high,
        }
    }
}

/// Mean intensity in the ring band relative to the mean of the flanking
/// bands, minus one. Zero for a featureless profile.
pub fn water_ring_index(profile: &RadialProfile, bands: &WaterRingBands) -> f64 {
    let (mut ring, mut nring) = (0.0, 0usize);
    let (mut background, mut nback) = (0.0, 0usize);
    for (s, v) in profile.iter() {
        if (s > bands.low && s < bands.ring_low) || (s > bands.ring_high && s < bands.high) {
            background += v;
            nback += 1;
        } else if s >= bands.ring_low && s <= bands.ring_high {
            ring += v;
            nring += 1;
        }
    }
    if nring == 0 || nback == 0 || background <= 0.0 {
        debug!(nring, nback, "Water ring bands not covered by the profile");
        return 0.0;
    }
    (ring / nring as f64) / (background / nback as f64) - 1.0
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct WaterRingFit {
    /// Peak height above the local background.
    pub amplitude: f64,
    /// Spatial frequency of the peak (1/A).
    pub location: f64,
    /// Gaussian sigma of the ring (1/A).
    pub width: f64,
    pub residual: f64,
}

impl WaterRingFit {
    /// Resolution of the ring (A).
    pub fn resolution(&self) -> f64 {
        1.0 / self.location
    }
}

/// Fit a Gaussian ring on top of a quadratic background between `bands.low`
/// and `bands.high`. The background is fitted to the flanks first, then the
/// Gaussian to what is left in the ring band.
pub fn fit_water_ring(
    profile: &RadialProfile,
    bands: &WaterRingBands,
    settings: &SimplexSettings,
) -> Option<WaterRingFit> {
    let background = flank_background(profile, bands)?;
    let (rx, excess): (Vec<f64>, Vec<f64>) = profile
        .iter()
        .filter(|&(s, _)| s >= bands.ring_low && s <= bands.ring_high)
        .map(|(s, v)| (s, v - background.evaluate(s)))
        .unzip();
    if rx.len() < 3 {
        return None;
    }
    let peak = excess.iter().cloned().fold(0.0_f64, f64::max);
    if peak <= 0.0 {
        return None;
    }

    let span = bands.ring_high - bands.ring_low;
    let mut solver = Simplex::new(vec![peak, DEFAULT_BUMP_LOCATION, 0.1 * span], settings)
        .with_bounds(&[
            (0.0, 2.0 * peak),
            (bands.ring_low, bands.ring_high),
            (0.01 * span, span),
        ]);
    let residual = solver.run(&|p: &[f64]| {
        let ss: f64 = rx
            .iter()
            .zip(&excess)
            .map(|(&s, &e)| (ring(p[0], p[1], p[2], s) - e).powi(2))
            .sum();
        (ss / rx.len() as f64).sqrt()
    });
    let p = solver.params();
    Some(WaterRingFit {
        amplitude: p[0],
        location: p[1],
        width: p[2],
        residual,
    })
}

/// Water ring fitted on the 2D spectrum, with its location varying with the
/// polar angle as `location + ellipticity*cos(2(theta - angle))`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct WaterRingEllipse {
    pub ring: WaterRingFit,
    /// Half the difference between the largest and smallest ring frequency
    /// (1/A).
    pub ellipticity: f64,
    /// Direction of the largest ring frequency, in (-pi/2, pi/2].
    pub angle: f64,
}

/// Fit an elliptical water ring to every pixel of the ring band.
///
/// The isotropic fit on the plain radial average seeds the ring, and the
/// flank background of that average is removed from each pixel before the
/// 2D fit.
pub fn fit_water_ring_ellipse(
    grid: &PolarGrid,
    bands: &WaterRingBands,
    settings: &SimplexSettings,
) -> Option<WaterRingEllipse> {
    let profile = grid.average(0.0, 0.0, 0.0);
    let seed = fit_water_ring(&profile, bands, settings)?;
    let background = flank_background(&profile, bands)?;
    let pixels: Vec<(f64, f64, f64, f64)> = grid
        .band(bands.ring_low, bands.ring_high)
        .map(|(s, c2, s2, v)| (s, c2, s2, v - background.evaluate(s)))
        .collect();
    if pixels.len() < 5 {
        return None;
    }

    // Bounds stay close to the isotropic seed.
    let span = bands.ring_high - bands.ring_low;
    let shift = 0.1 * span;
    let distortion = 0.2 * span;
    let mut solver = Simplex::new(
        vec![seed.amplitude, seed.location, seed.width, 0.0, 0.0],
        settings,
    )
    .with_bounds(&[
        (0.0, 2.0 * seed.amplitude.max(EPSILON)),
        (
            (seed.location - shift).max(bands.ring_low),
            (seed.location + shift).min(bands.ring_high),
        ),
        (0.5 * seed.width, 2.0 * seed.width),
        (-distortion, distortion),
        (-distortion, distortion),
    ]);
    let residual = solver.run(&|p: &[f64]| {
        let ss: f64 = pixels
            .iter()
            .map(|&(s, c2, s2, e)| {
                let location = p[1] + p[3] * c2 + p[4] * s2;
                (ring(p[0], location, p[2], s) - e).powi(2)
            })
            .sum();
        (ss / pixels.len() as f64).sqrt()
    });
    let p = solver.params();
    let fit = WaterRingEllipse {
        ring: WaterRingFit {
            amplitude: p[0],
            location: p[1],
            width: p[2],
            residual,
        },
        ellipticity: p[3].hypot(p[4]),
        angle: normalize_angle(0.5 * p[4].atan2(p[3])),
    };
    debug!(
        location = fit.ring.location,
        ellipticity = fit.ellipticity,
        angle_deg = fit.angle.to_degrees(),
        residual,
        "Water ring ellipse fitted"
    );
    Some(fit)
}

fn ring(amplitude: f64, location: f64, width: f64, s: f64) -> f64 {
    let d = (s - location) / width;
    amplitude * (-0.5 * d * d).exp()
}

/// Quadratic through the profile on both flanks of the ring band.
fn flank_background(profile: &RadialProfile, bands: &WaterRingBands) -> Option<PolynomialFit> {
    let (fx, fy): (Vec<f64>, Vec<f64>) = profile
        .iter()
        .filter(|&(s, _)| {
            (s > bands.low && s < bands.ring_low) || (s > bands.ring_high && s < bands.high)
        })
        .unzip();
    if fx.len() < 3 {
        return None;
    }
    fit_polynomial(&fx, &fy, 2).ok()
}
