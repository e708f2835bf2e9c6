use crate::ctf::CtfParams;
use crate::error::{CtfError, Result};
use crate::spectrum::PowerSpectrum;

/// Rotational average of a power spectrum: `values[i]` is the intensity at
/// spatial frequency `i * step`.
#[derive(Clone, Debug, PartialEq)]
pub struct RadialProfile {
    pub values: Vec<f64>,
    /// Spatial frequency per bin (1/A).
    pub step: f64,
}

impl RadialProfile {
    pub fn new(values: Vec<f64>, step: f64) -> Self {
        Self { values, step }
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Spatial frequency of bin `i` (1/A).
    pub fn frequency(&self, i: usize) -> f64 {
        i as f64 * self.step
    }

    /// Fractional bin position of spatial frequency `s`.
    pub fn position(&self, s: f64) -> f64 {
        s / self.step
    }

    /// Nearest bin to spatial frequency `s`, clamped to the profile.
    pub fn bin(&self, s: f64) -> usize {
        let last = self.len().saturating_sub(1);
        ((self.position(s) + 0.5).max(0.0) as usize).min(last)
    }

    /// Inclusive bin range covering resolutions `lores` to `hires` (A).
    pub fn bin_range(&self, lores: f64, hires: f64) -> (usize, usize) {
        let last = self.len().saturating_sub(1);
        let lo = (self.position(1.0 / lores).max(0.0) as usize).min(last);
        let hi = (self.position(1.0 / hires).max(0.0) as usize).min(last);
        (lo, hi.max(lo))
    }

    /// `(spatial frequency, intensity)` pairs.
    pub fn iter(&self) -> impl Iterator<Item = (f64, f64)> + '_ {
        self.values
            .iter()
            .enumerate()
            .map(|(i, &v)| (self.frequency(i), v))
    }
}

/// Pixel with its polar coordinates precomputed, so that repeated averages
/// under different astigmatism models only need a square root per pixel.
#[derive(Clone, Copy, Debug)]
struct PolarSample {
    radius: f64,
    /// cos(2*theta) and sin(2*theta) of the pixel's polar angle.
    cos2: f64,
    sin2: f64,
    value: f64,
}

/// The pixels of a power spectrum that fall inside the profile radius, in
/// polar form.
#[derive(Clone, Debug)]
pub struct PolarGrid {
    samples: Vec<PolarSample>,
    nrad: usize,
    step: f64,
    isotropic: bool,
}

impl PolarGrid {
    pub fn new(spectrum: &PowerSpectrum) -> Result<Self> {
        if spectrum.data.is_empty() {
            return Err(CtfError::EmptySpectrum);
        }
        let (nz, ny, nx) = spectrum.data.dim();
        let nrad = nx / 2;
        if nrad < 2 {
            return Err(CtfError::InvalidDimensions {
                width: nx,
                height: ny,
            });
        }
        let yscale = nx as f64 / ny as f64;
        let zscale = nx as f64 / nz as f64;
        let [ox, oy, oz] = spectrum.origin;
        let limit = nrad as f64;

        let mut samples = Vec::with_capacity(nx * ny);
        for ((z, y, x), &v) in spectrum.data.indexed_iter() {
            let dx = x as f64 - ox;
            let dy = (y as f64 - oy) * yscale;
            let dz = if nz > 1 { (z as f64 - oz) * zscale } else { 0.0 };
            let r2 = dx * dx + dy * dy + dz * dz;
            let radius = r2.sqrt();
            if radius >= limit {
                continue;
            }
            let rxy2 = dx * dx + dy * dy;
            let (cos2, sin2) = if rxy2 > 0.0 {
                ((dx * dx - dy * dy) / rxy2, 2.0 * dx * dy / rxy2)
            } else {
                (1.0, 0.0)
            };
            samples.push(PolarSample {
                radius,
                cos2,
                sin2,
                value: v as f64,
            });
        }

        Ok(Self {
            samples,
            nrad,
            step: spectrum.frequency_step(),
            isotropic: nz > 1,
        })
    }

    /// Number of bins in the profiles produced by this grid.
    pub fn len(&self) -> usize {
        self.nrad
    }

    pub fn is_empty(&self) -> bool {
        self.nrad == 0
    }

    pub fn step(&self) -> f64 {
        self.step
    }

    /// Pixels whose spatial frequency lies in `lo..=hi` (1/A), as
    /// `(s, cos(2*theta), sin(2*theta), value)`.
    pub fn band(&self, lo: f64, hi: f64) -> impl Iterator<Item = (f64, f64, f64, f64)> + '_ {
        self.samples.iter().filter_map(move |p| {
            let s = p.radius * self.step;
            (s >= lo && s <= hi).then_some((s, p.cos2, p.sin2, p.value))
        })
    }

    /// Radial average with every pixel's radius rescaled to where it would
    /// lie for the average defocus.
    ///
    /// Along direction theta the defocus is `avg + dev*cos(2(theta - angle))`
    /// so the radius is scaled by `sqrt(smax2*cos^2 + smin2*sin^2)` with
    /// `smax2 = 1 + dev/avg` and `smin2 = 1 - dev/avg`. Volumes are averaged
    /// isotropically.
    pub fn average(&self, defocus_average: f64, deviation: f64, angle: f64) -> RadialProfile {
        let ratio = if !self.isotropic && defocus_average.abs() > 1.0 {
            deviation / defocus_average
        } else {
            0.0
        };
        let (ca, sa) = ((2.0 * angle).cos(), (2.0 * angle).sin());

        let n = self.nrad;
        let mut sum = vec![0.0; n];
        let mut weight = vec![0.0; n];
        for p in &self.samples {
            let radius = if ratio == 0.0 {
                p.radius
            } else {
                let dr = 1.0 + ratio * (p.cos2 * ca + p.sin2 * sa);
                if dr >= 0.0 {
                    p.radius * dr.sqrt()
                } else {
                    p.radius
                }
            };
            let i = radius as usize;
            if i + 1 < n {
                let frac = radius - i as f64;
                sum[i] += (1.0 - frac) * p.value;
                weight[i] += 1.0 - frac;
                sum[i + 1] += frac * p.value;
                weight[i + 1] += frac;
            }
        }

        let mut values = Vec::with_capacity(n);
        for i in 0..n {
            let v = if weight[i] > 0.0 {
                sum[i] / weight[i]
            } else {
                values.last().copied().unwrap_or(0.0)
            };
            values.push(v);
        }

        RadialProfile::new(values, self.step)
    }

    /// Radial average under the astigmatism model in `params`.
    pub fn average_for(&self, params: &CtfParams) -> RadialProfile {
        self.average(
            params.defocus_average,
            params.defocus_deviation,
            params.astigmatism_angle,
        )
    }
}

/// Astigmatism-corrected radial average of `spectrum` under `params`.
///
/// Fails if the spectrum holds no data.
pub fn radial_average(spectrum: &PowerSpectrum, params: &CtfParams) -> Result<RadialProfile> {
    Ok(PolarGrid::new(spectrum)?.average_for(params))
}
