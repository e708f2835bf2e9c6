use std::f64::consts::PI;

use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::consts::{
    ASTIGMATISM_NYQUIST_FRACTION, ASTIGMATISM_WINDOW_SHRINK, DEFAULT_ANGLE_FAN,
    DEFAULT_ASTIGMATISM_ITERATIONS, DEFAULT_DEVIATION_STEP, DEFAULT_FOM_THRESHOLD,
    DEVIATION_NUDGE, DEVIATION_STEP_GROWTH, DEVIATION_TOLERANCE, EPSILON,
};
use crate::ctf::{normalize_angle, CtfParams};
use crate::radial::PolarGrid;

use super::{kernel_half_width, window_max, window_min};

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AstigmatismSettings {
    pub enabled: bool,
    pub max_iterations: usize,
    /// Number of angles evaluated around the current best angle.
    pub angle_fan: usize,
    /// Initial deviation step (A).
    pub deviation_step: f64,
    /// Relative gain in the measure at or below which the refinement stops.
    pub threshold: f64,
}

impl Default for AstigmatismSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            max_iterations: DEFAULT_ASTIGMATISM_ITERATIONS,
            angle_fan: DEFAULT_ANGLE_FAN,
            deviation_step: DEFAULT_DEVIATION_STEP,
            threshold: DEFAULT_FOM_THRESHOLD,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct AstigmatismEstimate {
    pub deviation: f64,
    /// Normalized into (-pi/2, pi/2].
    pub angle: f64,
    pub measure: f64,
    pub iterations: usize,
}

/// Ring sharpness of the spectrum when averaged under the astigmatism model
/// `(deviation, angle)`.
///
/// For every pair of successive zeros of the average-defocus CTF whose
/// midpoint lies in the resolution range, the baseline-subtracted profile
/// minima near both zeros and the maximum near the midpoint are taken; the
/// measure is the radius-weighted mean of `max - (min1 + min2)/2`.
pub fn astigmatism_measure(
    grid: &PolarGrid,
    params: &CtfParams,
    deviation: f64,
    angle: f64,
    lores: f64,
    hires: f64,
) -> f64 {
    let profile = grid.average(params.defocus_average, deviation, angle);
    let n = profile.len();
    if n < 3 {
        return 0.0;
    }
    let values: Vec<f64> = profile
        .iter()
        .map(|(s, v)| v - params.baseline.evaluate(s))
        .collect();

    let k = kernel_half_width(n, 2);
    let nyquist = profile.frequency(n);
    let zeros = params.zeros(ASTIGMATISM_NYQUIST_FRACTION * nyquist);
    let ilo = profile.bin(1.0 / lores);
    let ihi = profile.bin(1.0 / hires);

    let (mut sum, mut weight) = (0.0, 0.0);
    for pair in zeros.windows(2) {
        let im = profile.bin(0.5 * (pair[0] + pair[1]));
        if im < ilo || im > ihi {
            continue;
        }
        let b1 = window_min(&values, profile.bin(pair[0]), k);
        let b2 = window_min(&values, profile.bin(pair[1]), k);
        let m = window_max(&values, im, k);
        if let (Some((_, b1)), Some((_, b2)), Some((_, m))) = (b1, b2, m) {
            sum += im as f64 * (m - 0.5 * (b1 + b2));
            weight += im as f64;
        }
    }
    if weight > 0.0 {
        sum / weight
    } else {
        0.0
    }
}

/// Jointly refine the defocus deviation and astigmatism angle.
///
/// A running trial deviation starts from the input deviation (or one step
/// when the input is round). Every iteration scores a fan of angles centred
/// on the best angle at the trial deviation and one step either side of it,
/// all candidates in parallel. When the best deviation differs from the trial
/// one, the trial deviation moves two thirds of the way towards it.
/// Otherwise the angular window is halved and the deviation step doubled.
/// Stops at the iteration cap or once the last improvement of the measure is
/// below `settings.threshold` relative to the measure it replaced.
pub fn fit_astigmatism(
    grid: &PolarGrid,
    params: &CtfParams,
    lores: f64,
    hires: f64,
    settings: &AstigmatismSettings,
) -> AstigmatismEstimate {
    let fan = settings.angle_fan.max(1);
    let measure = |deviation: f64, angle: f64| {
        astigmatism_measure(grid, params, deviation, angle, lores, hires)
    };

    let input_deviation = params.defocus_deviation.max(0.0);
    let mut best = AstigmatismEstimate {
        deviation: input_deviation,
        angle: params.astigmatism_angle,
        measure: measure(input_deviation, params.astigmatism_angle),
        iterations: 0,
    };
    let mut trial = if input_deviation > 0.0 {
        input_deviation
    } else {
        settings.deviation_step
    };
    let mut window = PI;
    let mut step = settings.deviation_step;
    let mut gain = f64::INFINITY;

    for iteration in 1..=settings.max_iterations {
        if gain <= settings.threshold {
            break;
        }
        let mut candidates = Vec::with_capacity(3 * fan);
        for deviation in [trial - step, trial, trial + step] {
            if deviation < 0.0 {
                continue;
            }
            if deviation == 0.0 {
                candidates.push((0.0, best.angle));
                continue;
            }
            for j in 0..fan {
                let offset = (j as f64 - (fan - 1) as f64 / 2.0) * window / fan as f64;
                candidates.push((deviation, best.angle + offset));
            }
        }

        let scores: Vec<f64> = candidates
            .par_iter()
            .map(|&(deviation, angle)| measure(deviation, angle))
            .collect();

        let top = scores
            .iter()
            .enumerate()
            .fold(None, |acc: Option<(usize, f64)>, (i, &v)| match acc {
                Some((_, bv)) if bv >= v => acc,
                _ => Some((i, v)),
            });

        best.iterations = iteration;
        if let Some((i, score)) = top.filter(|&(_, score)| score > best.measure) {
            gain = relative_gain(score, best.measure);
            let (deviation, angle) = candidates[i];
            best.deviation = deviation;
            best.angle = angle;
            best.measure = score;
        }

        let shift = best.deviation - trial;
        if shift.abs() < DEVIATION_TOLERANCE {
            window /= ASTIGMATISM_WINDOW_SHRINK;
            step *= DEVIATION_STEP_GROWTH;
        } else {
            trial += shift / DEVIATION_NUDGE;
        }
        debug!(
            iteration,
            trial,
            step,
            deviation = best.deviation,
            angle_deg = best.angle.to_degrees(),
            measure = best.measure,
            "Astigmatism iteration"
        );
    }

    best.angle = normalize_angle(best.angle);
    best
}

fn relative_gain(score: f64, previous: f64) -> f64 {
    if previous.abs() > EPSILON {
        (score - previous) / previous.abs()
    } else {
        f64::INFINITY
    }
}
