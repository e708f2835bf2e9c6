use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::consts::{
    DEFAULT_DEFOCUS_INCREMENT, DEFAULT_INCREMENT_DIVISOR, DEFAULT_MIN_DEFOCUS_INCREMENT,
    DEFOCUS_MAX, DEFOCUS_SEARCH_FLOOR, EPSILON, MAX_SEARCH_LORES, TREND_ORDER,
};
use crate::ctf::CtfParams;
use crate::error::{CtfError, Result};
use crate::fit::moving_polynomial;
use crate::radial::RadialProfile;

/// Bounds and schedule of the coarse-to-fine defocus search (A).
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DefocusSearch {
    pub start: f64,
    pub end: f64,
    /// Step of the first, coarsest pass.
    pub increment: f64,
    /// The search stops once the step falls below this.
    pub min_increment: f64,
    /// Step reduction between passes.
    pub divisor: f64,
}

impl Default for DefocusSearch {
    fn default() -> Self {
        Self {
            start: DEFOCUS_SEARCH_FLOOR,
            end: DEFOCUS_MAX,
            increment: DEFAULT_DEFOCUS_INCREMENT,
            min_increment: DEFAULT_MIN_DEFOCUS_INCREMENT,
            divisor: DEFAULT_INCREMENT_DIVISOR,
        }
    }
}

impl DefocusSearch {
    /// Search window `average/factor .. average*factor`, keeping this
    /// search's schedule. The coarse step is `average/factor` capped at this
    /// search's increment, and the grid is aligned so it passes through
    /// `average`.
    pub fn around(&self, average: f64, factor: f64) -> Self {
        let increment = (average / factor).min(self.increment);
        let below = ((average - average / factor) / increment).floor();
        Self {
            start: average - below * increment,
            end: average * factor,
            increment,
            ..self.clone()
        }
    }

    /// Clamp the bounds to the plausible defocus range and check they still
    /// describe a search.
    pub fn clamped(&self) -> Result<Self> {
        let start = self.start.max(DEFOCUS_SEARCH_FLOOR);
        let end = self.end.min(DEFOCUS_MAX);
        if !(start < end) {
            return Err(CtfError::InvalidRange(format!(
                "defocus search {} .. {}",
                self.start, self.end
            )));
        }
        if !(self.increment > 0.0 && self.min_increment > 0.0 && self.divisor > 1.0) {
            return Err(CtfError::InvalidRange(format!(
                "defocus increment {} (min {}, divisor {})",
                self.increment, self.min_increment, self.divisor
            )));
        }
        Ok(Self {
            start,
            end,
            ..self.clone()
        })
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct DefocusEstimate {
    pub defocus: f64,
    /// Normalized correlation of the best candidate, in [-1, 1]. Stays at -1
    /// when no candidate correlated at all.
    pub fom: f64,
}

/// Find the average defocus whose CTF^2 best correlates with the
/// background-flattened profile.
///
/// The profile is divided by a local quadratic trend, and every candidate is
/// scored by the normalized correlation of `ctf^2 - 0.5` with the flattened
/// profile over the resolution range. The grid is refined around the best
/// candidate until the step drops below `search.min_increment`.
pub fn find_defocus(
    profile: &RadialProfile,
    params: &CtfParams,
    search: &DefocusSearch,
    lores: f64,
    hires: f64,
) -> Result<DefocusEstimate> {
    let search = search.clamped()?;
    let fallback = if (search.start..=search.end).contains(&params.defocus_average) {
        params.defocus_average
    } else {
        0.5 * (search.start + search.end)
    };
    let mut best = DefocusEstimate {
        defocus: fallback,
        fom: -1.0,
    };
    if profile.len() < 3 {
        warn!(bins = profile.len(), "Profile too short for defocus search");
        return Ok(best);
    }

    let lores = if lores < hires || lores > MAX_SEARCH_LORES {
        MAX_SEARCH_LORES
    } else {
        lores
    };
    let (lo, hi) = profile.bin_range(lores, hires);
    let flat = flatten(&profile.values, lo);

    let mut increment = search.increment;
    let (mut ds, mut de) = (search.start, search.end);
    loop {
        let mut defocus = ds;
        while defocus <= de {
            let fom = correlation(profile, params, &flat, defocus, lo, hi);
            if fom > best.fom {
                best = DefocusEstimate { defocus, fom };
            }
            defocus += increment;
        }
        debug!(increment, defocus = best.defocus, fom = best.fom, "Defocus pass");
        ds = (best.defocus - 2.0 * increment).max(search.start);
        de = (best.defocus + 2.0 * increment).min(search.end);
        increment /= search.divisor;
        if increment < search.min_increment {
            break;
        }
    }
    Ok(best)
}

/// `profile/trend - 1`, with the bins below `lo` replaced by the value at `lo`
/// so the low-frequency peak does not drag the trend.
fn flatten(values: &[f64], lo: usize) -> Vec<f64> {
    let n = values.len();
    let mut v = values.to_vec();
    let floor = v[lo.min(n - 1)];
    for x in v.iter_mut().take(lo) {
        *x = floor;
    }
    let trend = moving_polynomial(TREND_ORDER, &v, (n / 5).max(3));
    v.iter()
        .zip(&trend)
        .map(|(&p, &t)| if t.abs() > EPSILON { p / t - 1.0 } else { 0.0 })
        .collect()
}

fn correlation(
    profile: &RadialProfile,
    params: &CtfParams,
    flat: &[f64],
    defocus: f64,
    lo: usize,
    hi: usize,
) -> f64 {
    let (mut cr, mut cc, mut rr) = (0.0, 0.0, 0.0);
    for (i, &r) in flat.iter().enumerate().take(hi + 1).skip(lo) {
        let s = profile.frequency(i);
        let c = params.phase_for_defocus(s * s, defocus).sin().powi(2) - 0.5;
        cr += c * r;
        cc += c * c;
        rr += r * r;
    }
    let den = (cc * rr).sqrt();
    if den > EPSILON {
        cr / den
    } else {
        0.0
    }
}
