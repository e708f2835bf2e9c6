//! Box-constrained Nelder-Mead simplex minimizer.
//!
//! The simplex starts from the caller's parameter vector plus `n` random
//! vertices inside the box, so a run is fully determined by the seed. When
//! the simplex collapses (the spread of objective values falls below the
//! relative tolerance) it is respawned around the best vertex a limited
//! number of times, which lets it escape shallow local minima.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::consts::{
    DEFAULT_SEED, DEFAULT_SIMPLEX_CYCLES, DEFAULT_SIMPLEX_RESTARTS, DEFAULT_SIMPLEX_TOLERANCE,
};

/// A scalar function to minimize over a parameter vector.
pub trait Objective {
    fn evaluate(&self, params: &[f64]) -> f64;
}

impl<F> Objective for F
where
    F: Fn(&[f64]) -> f64,
{
    fn evaluate(&self, params: &[f64]) -> f64 {
        self(params)
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimplexSettings {
    /// Maximum number of simplex steps.
    pub max_cycles: usize,
    /// Relative spread of objective values at which the simplex is collapsed.
    pub tolerance: f64,
    /// How many times a collapsed simplex may be respawned.
    pub restarts: usize,
    /// Seed for the random vertices.
    pub seed: u64,
}

impl Default for SimplexSettings {
    fn default() -> Self {
        Self {
            max_cycles: DEFAULT_SIMPLEX_CYCLES,
            tolerance: DEFAULT_SIMPLEX_TOLERANCE,
            restarts: DEFAULT_SIMPLEX_RESTARTS,
            seed: DEFAULT_SEED,
        }
    }
}

const REFLECT: f64 = 1.0;
const EXPAND: f64 = 2.0;
const CONTRACT: f64 = 0.5;
const SHRINK: f64 = 0.5;

/// One minimization session.
#[derive(Clone, Debug)]
pub struct Simplex {
    params: Vec<f64>,
    lower: Vec<f64>,
    upper: Vec<f64>,
    settings: SimplexSettings,
}

impl Simplex {
    /// Unconstrained session starting at `initial`.
    pub fn new(initial: Vec<f64>, settings: &SimplexSettings) -> Self {
        let n = initial.len();
        Self {
            params: initial,
            lower: vec![f64::NEG_INFINITY; n],
            upper: vec![f64::INFINITY; n],
            settings: settings.clone(),
        }
    }

    /// Constrain parameter `index` to `[lo, hi]`.
    pub fn with_limits(mut self, index: usize, lo: f64, hi: f64) -> Self {
        let (lo, hi) = if lo <= hi { (lo, hi) } else { (hi, lo) };
        self.lower[index] = lo;
        self.upper[index] = hi;
        self
    }

    /// Constrain every parameter, in order.
    pub fn with_bounds(mut self, bounds: &[(f64, f64)]) -> Self {
        for (i, &(lo, hi)) in bounds.iter().enumerate().take(self.params.len()) {
            self = self.with_limits(i, lo, hi);
        }
        self
    }

    pub fn params(&self) -> &[f64] {
        &self.params
    }

    pub fn into_params(self) -> Vec<f64> {
        self.params
    }

    /// Minimize `objective`, leaving the best vertex in `params()` and
    /// returning its objective value.
    pub fn run(&mut self, objective: &impl Objective) -> f64 {
        let n = self.params.len();
        let eval = |p: &[f64]| {
            let v = objective.evaluate(p);
            if v.is_nan() {
                f64::INFINITY
            } else {
                v
            }
        };

        let start = self.clamp(self.params.clone());
        if n == 0 {
            self.params = start;
            return eval(&self.params);
        }

        let mut rng = StdRng::seed_from_u64(self.settings.seed);
        let mut points = Vec::with_capacity(n + 1);
        points.push(start.clone());
        for _ in 0..n {
            points.push(self.spawn(&start, 1.0, &mut rng));
        }
        let mut values: Vec<f64> = points.iter().map(|p| eval(p)).collect();

        let tolerance = self.settings.tolerance;
        let mut restarts_left = self.settings.restarts;
        let mut restart_best = f64::INFINITY;
        let mut cycles = 0;

        loop {
            let (ilo, inhi, ihi) = rank(&values);
            let (flo, fhi) = (values[ilo], values[ihi]);

            let spread = 2.0 * (fhi - flo).abs();
            let scale = tolerance * (fhi.abs() + flo.abs()) + f64::MIN_POSITIVE;
            if spread <= scale || (!fhi.is_finite() && !flo.is_finite()) {
                let improved = restart_best - flo > tolerance * flo.abs();
                if restarts_left > 0 && improved && cycles < self.settings.max_cycles {
                    restarts_left -= 1;
                    restart_best = flo;
                    let best = points[ilo].clone();
                    for (j, point) in points.iter_mut().enumerate() {
                        if j != ilo {
                            *point = self.spawn(&best, 0.5, &mut rng);
                            values[j] = eval(point);
                        }
                    }
                    continue;
                }
                break;
            }
            if cycles >= self.settings.max_cycles {
                break;
            }
            cycles += 1;

            let centroid = centroid_without(&points, ihi);
            let reflected = self.along(&centroid, &points[ihi], -REFLECT);
            let fr = eval(&reflected);

            if fr < flo {
                let expanded = self.along(&centroid, &points[ihi], -EXPAND);
                let fe = eval(&expanded);
                if fe < fr {
                    points[ihi] = expanded;
                    values[ihi] = fe;
                } else {
                    points[ihi] = reflected;
                    values[ihi] = fr;
                }
            } else if fr < values[inhi] {
                points[ihi] = reflected;
                values[ihi] = fr;
            } else {
                let (base, fbase) = if fr < fhi {
                    (reflected, fr)
                } else {
                    (points[ihi].clone(), fhi)
                };
                let contracted = self.along(&centroid, &base, CONTRACT);
                let fc = eval(&contracted);
                if fc < fbase {
                    points[ihi] = contracted;
                    values[ihi] = fc;
                } else {
                    let best = points[ilo].clone();
                    for (j, point) in points.iter_mut().enumerate() {
                        if j != ilo {
                            let shrunk = best
                                .iter()
                                .zip(point.iter())
                                .map(|(b, p)| b + SHRINK * (p - b))
                                .collect();
                            *point = self.clamp(shrunk);
                            values[j] = eval(point);
                        }
                    }
                }
            }
        }

        let (ilo, _, _) = rank(&values);
        debug!(cycles, residual = values[ilo], "Simplex finished");
        self.params = points.swap_remove(ilo);
        values[ilo]
    }

    /// `centroid + t * (point - centroid)`, clamped into the box.
    fn along(&self, centroid: &[f64], point: &[f64], t: f64) -> Vec<f64> {
        let p = centroid
            .iter()
            .zip(point)
            .map(|(c, p)| c + t * (p - c))
            .collect();
        self.clamp(p)
    }

    fn clamp(&self, mut p: Vec<f64>) -> Vec<f64> {
        for ((v, lo), hi) in p.iter_mut().zip(&self.lower).zip(&self.upper) {
            *v = v.clamp(*lo, *hi);
        }
        p
    }

    /// Random vertex near `center`. Bounded parameters are drawn from the
    /// middle half of the box (scaled by `spread`), unbounded ones are
    /// perturbed relative to their magnitude.
    fn spawn(&self, center: &[f64], spread: f64, rng: &mut StdRng) -> Vec<f64> {
        let p = center
            .iter()
            .zip(self.lower.iter().zip(&self.upper))
            .map(|(&c, (&lo, &hi))| {
                let r: f64 = rng.gen();
                if lo.is_finite() && hi.is_finite() {
                    if spread >= 1.0 {
                        lo + (hi - lo) * (0.25 + 0.5 * r)
                    } else {
                        c + (hi - lo) * spread * 0.5 * (r - 0.5)
                    }
                } else {
                    let step = if c != 0.0 { 0.5 * c.abs() } else { 0.1 };
                    c + spread * step * (2.0 * r - 1.0)
                }
            })
            .collect();
        self.clamp(p)
    }
}

/// Indices of the lowest, second highest and highest values.
fn rank(values: &[f64]) -> (usize, usize, usize) {
    let mut order: Vec<usize> = (0..values.len()).collect();
    order.sort_by(|&a, &b| values[a].total_cmp(&values[b]));
    let n = order.len();
    (order[0], order[n.saturating_sub(2)], order[n - 1])
}

fn centroid_without(points: &[Vec<f64>], skip: usize) -> Vec<f64> {
    let n = points[0].len();
    let m = (points.len() - 1) as f64;
    let mut c = vec![0.0; n];
    for (j, p) in points.iter().enumerate() {
        if j == skip {
            continue;
        }
        for (ci, pi) in c.iter_mut().zip(p) {
            *ci += pi / m;
        }
    }
    c
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rank_orders_extremes() {
        let (lo, nhi, hi) = rank(&[3.0, 1.0, 5.0, 4.0]);
        assert_eq!((lo, nhi, hi), (1, 3, 2));
    }

    #[test]
    fn test_centroid_skips_worst() {
        let points = vec![vec![0.0, 0.0], vec![2.0, 0.0], vec![100.0, 100.0]];
        assert_eq!(centroid_without(&points, 2), vec![1.0, 0.0]);
    }
}
